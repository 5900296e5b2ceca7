//! Per-unit aura storage and stacking resolution.
//!
//! A unit holds three independent slot groups (positive, negative, passive).
//! When a new aura arrives, [`AuraSlots::check`] decides between:
//!
//! | existing conflict       | priority      | result                       |
//! |-------------------------|---------------|------------------------------|
//! | none, group has room    | -             | `Add`                        |
//! | none, group full        | -             | `Invalid`                    |
//! | yes                     | new higher    | `Replace`                    |
//! | yes                     | new lower     | `Invalid`                    |
//! | same id, multi-wrap > 1 | equal         | `Wrap`                       |
//! | yes                     | equal         | `Replace`                    |
//!
//! A conflict is an aura with the same id or the same stack group. Auras
//! already registered for removal never conflict but still hold their slot.

use serde::{Deserialize, Serialize};

use crate::unit::{AttributeKind, AuraState, Mechanic, UnitState};

use super::{Aura, AuraEffect, AuraEntry, AuraGroup, AuraPhase, RemoveMode};

/// Outcome of a stacking check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuraAddResult {
    /// Appended to its slot group.
    Add,
    /// Displaced a conflicting aura.
    Replace,
    /// Increased the stack count of the existing aura.
    Wrap,
    /// Rejected.
    Invalid,
}

impl AuraAddResult {
    /// Returns `true` unless the aura was rejected.
    #[must_use]
    pub const fn is_applied(self) -> bool {
        !matches!(self, Self::Invalid)
    }
}

/// The three aura slot groups of one unit.
#[derive(Debug, Clone, Default)]
pub struct AuraSlots {
    groups: [Vec<Aura>; 3],
}

const fn group_index(group: AuraGroup) -> usize {
    match group {
        AuraGroup::Positive => 0,
        AuraGroup::Negative => 1,
        AuraGroup::Passive => 2,
    }
}

impl AuraSlots {
    /// Empty slot groups.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of auras held in a group, including suspended and registered ones.
    #[must_use]
    pub fn count(&self, group: AuraGroup) -> usize {
        self.groups[group_index(group)].len()
    }

    /// Total number of auras held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.iter().map(Vec::len).sum()
    }

    /// Returns `true` when no aura is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All held auras.
    pub fn iter(&self) -> impl Iterator<Item = &Aura> {
        self.groups.iter().flatten()
    }

    /// Auras currently producing effects.
    pub fn iter_active(&self) -> impl Iterator<Item = &Aura> {
        self.iter().filter(|aura| aura.is_active())
    }

    /// Mutable access to every held aura.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Aura> {
        self.groups.iter_mut().flatten()
    }

    /// Slot of `aura_id`. A re-applied aura can sit next to its old instance
    /// awaiting the purge; the live instance wins.
    fn locate(&self, aura_id: u32) -> Option<(usize, usize)> {
        let mut registered = None;
        for (g, auras) in self.groups.iter().enumerate() {
            for (i, aura) in auras.iter().enumerate() {
                if aura.id() != aura_id {
                    continue;
                }
                if aura.phase() != AuraPhase::Registered {
                    return Some((g, i));
                }
                if registered.is_none() {
                    registered = Some((g, i));
                }
            }
        }
        registered
    }

    /// Finds an aura by id.
    #[must_use]
    pub fn find(&self, aura_id: u32) -> Option<&Aura> {
        self.locate(aura_id).map(|(g, i)| &self.groups[g][i])
    }

    /// Finds an aura by id, mutably.
    pub fn find_mut(&mut self, aura_id: u32) -> Option<&mut Aura> {
        self.locate(aura_id).map(|(g, i)| &mut self.groups[g][i])
    }

    /// Returns `true` when an active aura with this id is held.
    #[must_use]
    pub fn has_active(&self, aura_id: u32) -> bool {
        self.iter_active().any(|aura| aura.id() == aura_id)
    }

    /// Ids of the auras in a group, in slot order.
    #[must_use]
    pub fn ids(&self, group: AuraGroup) -> Vec<u32> {
        self.groups[group_index(group)].iter().map(Aura::id).collect()
    }

    fn conflict(&self, entry: &AuraEntry) -> Option<(usize, usize)> {
        self.groups.iter().enumerate().find_map(|(g, auras)| {
            auras
                .iter()
                .position(|aura| {
                    aura.phase() != AuraPhase::Registered && aura.entry().conflicts_with(entry)
                })
                .map(|i| (g, i))
        })
    }

    /// Decides how `entry` would stack without changing anything.
    #[must_use]
    pub fn check(&self, entry: &AuraEntry) -> AuraAddResult {
        let target = group_index(entry.group);
        let has_room = |freed: Option<usize>| {
            let held = self.groups[target].len();
            let held = if freed == Some(target) { held - 1 } else { held };
            held < entry.group.capacity()
        };

        let Some((g, i)) = self.conflict(entry) else {
            return if has_room(None) {
                AuraAddResult::Add
            } else {
                AuraAddResult::Invalid
            };
        };

        let existing = &self.groups[g][i];
        let replace = if has_room(Some(g)) {
            AuraAddResult::Replace
        } else {
            AuraAddResult::Invalid
        };
        match entry.effect_priority.cmp(&existing.entry().effect_priority) {
            std::cmp::Ordering::Greater => replace,
            std::cmp::Ordering::Less => AuraAddResult::Invalid,
            std::cmp::Ordering::Equal => {
                if entry.multi_wrap > 1 && existing.id() == entry.id {
                    AuraAddResult::Wrap
                } else {
                    replace
                }
            }
        }
    }

    /// Stacks `aura` into the slots.
    ///
    /// Returns the stacking result and, on `Replace`, the displaced aura so
    /// the caller can fire its removal effects.
    pub fn add(&mut self, aura: Aura) -> (AuraAddResult, Option<Aura>) {
        let result = self.check(aura.entry());
        match result {
            AuraAddResult::Add => {
                self.groups[group_index(aura.entry().group)].push(aura);
                (result, None)
            }
            AuraAddResult::Replace => {
                let displaced = self
                    .conflict(aura.entry())
                    .map(|(g, i)| self.groups[g].remove(i));
                self.groups[group_index(aura.entry().group)].push(aura);
                (result, displaced)
            }
            AuraAddResult::Wrap => {
                if let Some((g, i)) = self.conflict(aura.entry()) {
                    self.groups[g][i].wrap_up(aura.caster(), aura.caster_attack());
                }
                (result, None)
            }
            AuraAddResult::Invalid => (result, None),
        }
    }

    /// Removes an aura by id.
    ///
    /// Full-removal causes release the slot and return the aura. Transient
    /// causes keep it in place: `Registered` marks it for the next purge and
    /// `Hangup` suspends it.
    pub fn remove(&mut self, aura_id: u32, mode: RemoveMode) -> Option<Aura> {
        if mode.is_full_removal() {
            return self
                .locate(aura_id)
                .map(|(g, i)| self.groups[g].remove(i));
        }
        if let Some(aura) = self.find_mut(aura_id) {
            aura.set_phase(match mode {
                RemoveMode::Hangup => AuraPhase::Hangup,
                _ => AuraPhase::Registered,
            });
        }
        None
    }

    /// Takes every aura registered for removal out of the slots.
    pub fn take_registered(&mut self) -> Vec<Aura> {
        let mut taken = Vec::new();
        for group in &mut self.groups {
            let (registered, kept): (Vec<_>, Vec<_>) = std::mem::take(group)
                .into_iter()
                .partition(|aura| aura.phase() == AuraPhase::Registered);
            *group = kept;
            taken.extend(registered);
        }
        taken
    }

    /// Active auras of `group` matching a dispel mechanic filter (empty matches all).
    #[must_use]
    pub fn dispellable(&self, group: AuraGroup, mechanic: Mechanic) -> Vec<u32> {
        self.groups[group_index(group)]
            .iter()
            .filter(|aura| aura.is_active())
            .filter(|aura| mechanic.is_empty() || aura.entry().mechanic.intersects(mechanic))
            .map(Aura::id)
            .collect()
    }

    // -------------------------------------------------------------------------
    // Effect aggregation
    // -------------------------------------------------------------------------

    fn active_effects(&self) -> impl Iterator<Item = (&Aura, &AuraEffect)> {
        self.iter_active()
            .flat_map(|aura| aura.entry().effects.iter().map(move |effect| (aura, effect)))
    }

    /// Sum of attribute modifiers, scaled by stack count.
    #[must_use]
    pub fn attribute_modifier(&self, kind: AttributeKind) -> i32 {
        self.active_effects()
            .filter_map(|(aura, effect)| match effect {
                AuraEffect::ModifyAttribute { attribute, value } if *attribute == kind => {
                    Some(value.saturating_mul(i32::from(aura.wrap())))
                }
                _ => None,
            })
            .fold(0, i32::saturating_add)
    }

    /// Union of unit states set by active auras.
    #[must_use]
    pub fn unit_states(&self) -> UnitState {
        self.active_effects()
            .filter_map(|(_, effect)| match effect {
                AuraEffect::SetState { state } => Some(*state),
                _ => None,
            })
            .fold(UnitState::empty(), |acc, state| acc | state)
    }

    /// Union of aura-state markers set by active auras.
    #[must_use]
    pub fn aura_states(&self) -> AuraState {
        self.active_effects()
            .filter_map(|(_, effect)| match effect {
                AuraEffect::SetAuraState { state } => Some(*state),
                _ => None,
            })
            .fold(AuraState::empty(), |acc, state| acc | state)
    }

    /// Union of mechanic immunities granted by active auras.
    #[must_use]
    pub fn mechanic_immunity(&self) -> Mechanic {
        self.active_effects()
            .filter_map(|(_, effect)| match effect {
                AuraEffect::MechanicImmunity { mechanic } => Some(*mechanic),
                _ => None,
            })
            .fold(Mechanic::empty(), |acc, mechanic| acc | mechanic)
    }

    /// The caster of the first active aura setting `state`, used to resolve
    /// taunts back to the taunting unit.
    #[must_use]
    pub fn state_source(&self, state: UnitState) -> Option<crate::unit::UnitId> {
        self.active_effects().find_map(|(aura, effect)| match effect {
            AuraEffect::SetState { state: set } if set.intersects(state) => Some(aura.caster()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::aura::AuraCastType;
    use crate::unit::UnitId;

    fn entry(id: u32, group: AuraGroup) -> AuraEntry {
        let mut entry = AuraEntry::new(id, AuraCastType::Persist, group);
        entry.duration_ms = 5000;
        entry
    }

    fn aura(entry: &AuraEntry) -> Aura {
        Aura::new(Arc::new(entry.clone()), UnitId::new(1), 100)
    }

    mod stacking_tests {
        use super::*;

        #[test]
        fn first_application_adds() {
            let mut slots = AuraSlots::new();
            let (result, displaced) = slots.add(aura(&entry(1, AuraGroup::Positive)));
            assert_eq!(result, AuraAddResult::Add);
            assert!(displaced.is_none());
            assert_eq!(slots.count(AuraGroup::Positive), 1);
        }

        #[test]
        fn same_aura_twice_replaces_to_single_instance() {
            let mut slots = AuraSlots::new();
            let e = entry(1, AuraGroup::Negative);
            slots.add(aura(&e));
            let (result, displaced) = slots.add(aura(&e));
            assert_eq!(result, AuraAddResult::Replace);
            assert_eq!(displaced.map(|a| a.id()), Some(1));
            assert_eq!(slots.len(), 1);
        }

        #[test]
        fn multi_wrap_increments_up_to_limit() {
            let mut slots = AuraSlots::new();
            let mut e = entry(1, AuraGroup::Negative);
            e.multi_wrap = 3;
            for _ in 0..5 {
                slots.add(aura(&e));
            }
            assert_eq!(slots.len(), 1);
            assert_eq!(slots.find(1).unwrap().wrap(), 3);
            assert_eq!(slots.check(&e), AuraAddResult::Wrap);
        }

        #[test]
        fn higher_priority_replaces_stack_group_sibling() {
            let mut slots = AuraSlots::new();
            let mut weak = entry(1, AuraGroup::Positive);
            weak.stack_group = Some(7);
            let mut strong = entry(2, AuraGroup::Positive);
            strong.stack_group = Some(7);
            strong.effect_priority = 5;

            slots.add(aura(&weak));
            let (result, displaced) = slots.add(aura(&strong));
            assert_eq!(result, AuraAddResult::Replace);
            assert_eq!(displaced.unwrap().id(), 1);
            assert_eq!(slots.ids(AuraGroup::Positive), vec![2]);

            assert_eq!(slots.check(&weak), AuraAddResult::Invalid);
        }

        #[test]
        fn full_group_rejects_new_auras() {
            let mut slots = AuraSlots::new();
            for id in 0..8 {
                assert_eq!(slots.add(aura(&entry(id, AuraGroup::Positive))).0, AuraAddResult::Add);
            }
            assert_eq!(
                slots.add(aura(&entry(99, AuraGroup::Positive))).0,
                AuraAddResult::Invalid
            );
            // Other groups have their own capacity.
            assert_eq!(
                slots.add(aura(&entry(99, AuraGroup::Negative))).0,
                AuraAddResult::Add
            );
        }

        #[test]
        fn replace_in_full_group_is_allowed() {
            let mut slots = AuraSlots::new();
            for id in 0..8 {
                slots.add(aura(&entry(id, AuraGroup::Positive)));
            }
            assert_eq!(slots.check(&entry(3, AuraGroup::Positive)), AuraAddResult::Replace);
        }
    }

    mod removal_tests {
        use super::*;

        #[test]
        fn full_removal_releases_slot() {
            let mut slots = AuraSlots::new();
            slots.add(aura(&entry(1, AuraGroup::Positive)));
            let removed = slots.remove(1, RemoveMode::Dispel);
            assert!(removed.is_some());
            assert!(slots.is_empty());
        }

        #[test]
        fn transient_removal_keeps_slot() {
            let mut slots = AuraSlots::new();
            slots.add(aura(&entry(1, AuraGroup::Passive)));
            slots.add(aura(&entry(2, AuraGroup::Passive)));

            assert!(slots.remove(1, RemoveMode::Hangup).is_none());
            assert!(slots.remove(2, RemoveMode::Registered).is_none());
            assert_eq!(slots.count(AuraGroup::Passive), 2);
            assert_eq!(slots.iter_active().count(), 0);

            let purged = slots.take_registered();
            assert_eq!(purged.len(), 1);
            assert_eq!(slots.ids(AuraGroup::Passive), vec![1]);
            assert!(!slots.has_active(1));
        }

        #[test]
        fn registered_aura_does_not_block_reapplication() {
            let mut slots = AuraSlots::new();
            let e = entry(1, AuraGroup::Negative);
            slots.add(aura(&e));
            slots.remove(1, RemoveMode::Registered);
            assert_eq!(slots.check(&e), AuraAddResult::Add);
        }

        #[test]
        fn dispel_takes_the_live_instance_over_the_registered_one() {
            let mut slots = AuraSlots::new();
            let e = entry(1, AuraGroup::Negative);
            slots.add(Aura::new(Arc::new(e.clone()), UnitId::new(1), 100));
            slots.remove(1, RemoveMode::Registered);
            let (result, _) = slots.add(Aura::new(Arc::new(e), UnitId::new(2), 100));
            assert_eq!(result, AuraAddResult::Add);
            assert_eq!(slots.len(), 2);

            assert_eq!(slots.find(1).map(Aura::caster), Some(UnitId::new(2)));
            assert!(slots.find_mut(1).is_some_and(|aura| aura.is_active()));

            let removed = slots.remove(1, RemoveMode::Dispel).unwrap();
            assert_eq!(removed.caster(), UnitId::new(2));
            assert!(removed.is_active());
            assert!(!slots.has_active(1));

            let purged = slots.take_registered();
            assert_eq!(purged.len(), 1);
            assert_eq!(purged[0].caster(), UnitId::new(1));
            assert!(slots.is_empty());
        }
    }

    mod aggregation_tests {
        use super::*;

        #[test]
        fn attribute_modifiers_scale_with_wrap() {
            let mut slots = AuraSlots::new();
            let mut e = entry(1, AuraGroup::Positive);
            e.multi_wrap = 5;
            e.effects = vec![AuraEffect::ModifyAttribute {
                attribute: AttributeKind::Attack,
                value: 10,
            }];
            slots.add(aura(&e));
            slots.add(aura(&e));
            assert_eq!(slots.attribute_modifier(AttributeKind::Attack), 20);
            assert_eq!(slots.attribute_modifier(AttributeKind::Hit), 0);
        }

        #[test]
        fn suspended_auras_contribute_nothing() {
            let mut slots = AuraSlots::new();
            let mut e = entry(1, AuraGroup::Passive);
            e.effects = vec![AuraEffect::SetState {
                state: UnitState::POISON,
            }];
            slots.add(aura(&e));
            assert!(slots.unit_states().contains(UnitState::POISON));
            slots.remove(1, RemoveMode::Hangup);
            assert!(slots.unit_states().is_empty());
        }

        #[test]
        fn taunt_source_is_the_caster() {
            let mut slots = AuraSlots::new();
            let mut e = entry(1, AuraGroup::Negative);
            e.effects = vec![AuraEffect::SetState {
                state: UnitState::TAUNT,
            }];
            slots.add(Aura::new(Arc::new(e), UnitId::new(42), 0));
            assert_eq!(slots.state_source(UnitState::TAUNT), Some(UnitId::new(42)));
        }
    }
}
