//! Proc flags: per-cast event masks that arm `ProcTrigger` aura effects.

use std::collections::BTreeMap;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::unit::UnitId;

bitflags! {
    /// Combat events a unit took part in during one cast.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ProcFlags: u32 {
        /// Successfully cast a spell.
        const CAST = 1 << 0;
        /// Dealt damage.
        const DEAL_DAMAGE = 1 << 1;
        /// Took damage.
        const TAKE_DAMAGE = 1 << 2;
        /// Healed someone.
        const DEAL_HEAL = 1 << 3;
        /// Was healed.
        const TAKE_HEAL = 1 << 4;
        /// Landed a critical hit.
        const CRIT = 1 << 5;
        /// Was hit critically.
        const BE_CRIT = 1 << 6;
        /// Missed or was dodged.
        const MISS = 1 << 7;
        /// Dodged an attack.
        const DODGE = 1 << 8;
        /// Blocked an attack.
        const BLOCK = 1 << 9;
        /// Had an attack blocked.
        const BE_BLOCKED = 1 << 10;
        /// Landed a killing blow.
        const KILL = 1 << 11;
        /// Died.
        const DIE = 1 << 12;
    }
}

/// Accumulated procs of one unit, with the unit on the other side of the
/// latest event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcRecord {
    /// Union of the unit's events.
    pub flags: ProcFlags,
    /// The opposing unit of the most recent event, if any.
    pub counterpart: Option<UnitId>,
}

/// Proc masks of every unit touched by a cast, in unit-id order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcMasks {
    records: BTreeMap<UnitId, ProcRecord>,
}

impl ProcMasks {
    /// Records `flags` for `unit`.
    pub fn add(&mut self, unit: UnitId, flags: ProcFlags, counterpart: Option<UnitId>) {
        if flags.is_empty() {
            return;
        }
        let record = self.records.entry(unit).or_default();
        record.flags |= flags;
        if counterpart.is_some() {
            record.counterpart = counterpart;
        }
    }

    /// Flags recorded for `unit`.
    #[must_use]
    pub fn flags(&self, unit: UnitId) -> ProcFlags {
        self.records
            .get(&unit)
            .map_or(ProcFlags::empty(), |record| record.flags)
    }

    /// Iterates over the recorded units.
    pub fn iter(&self) -> impl Iterator<Item = (UnitId, &ProcRecord)> {
        self.records.iter().map(|(id, record)| (*id, record))
    }

    /// Returns `true` when nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_accumulate_per_unit() {
        let mut masks = ProcMasks::default();
        let a = UnitId::new(1);
        let b = UnitId::new(2);
        masks.add(a, ProcFlags::DEAL_DAMAGE, Some(b));
        masks.add(a, ProcFlags::CRIT, None);
        masks.add(b, ProcFlags::empty(), Some(a));

        assert_eq!(masks.flags(a), ProcFlags::DEAL_DAMAGE | ProcFlags::CRIT);
        assert_eq!(masks.flags(b), ProcFlags::empty());
        assert_eq!(masks.iter().next().map(|(_, r)| r.counterpart), Some(Some(b)));
    }
}
