//! Static aura definitions.

use serde::{Deserialize, Serialize};

use crate::spell::ProcFlags;
use crate::unit::{AttributeKind, AuraState, Mechanic, UnitState};

use super::RemoveMode;

/// Maximum number of effect slots on one aura.
pub const AURA_EFFECT_SLOTS: usize = 3;

/// How an aura spends its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuraCastType {
    /// Fires its periodic effects every `interval_ms`.
    Interval,
    /// Holds its effects for the whole duration.
    Persist,
    /// Lasts for a number of proc triggers (`effect_times`).
    CountLimited,
}

/// Slot group an aura occupies. Each group has its own capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuraGroup {
    /// Buffs.
    Positive,
    /// Debuffs.
    Negative,
    /// Innate auras from the unit entry.
    Passive,
}

impl AuraGroup {
    /// All groups, in slot order.
    pub const ALL: [Self; 3] = [Self::Positive, Self::Negative, Self::Passive];

    /// Maximum number of auras the group holds.
    #[must_use]
    pub const fn capacity(self) -> usize {
        match self {
            Self::Positive | Self::Negative => 8,
            Self::Passive => 16,
        }
    }
}

/// One effect slot of an aura.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuraEffect {
    /// Adds `value` (times the wrap count) to an attribute.
    ModifyAttribute {
        /// Attribute to modify.
        attribute: AttributeKind,
        /// Amount per stack.
        value: i32,
    },
    /// Damages the owner every interval.
    PeriodicDamage {
        /// Flat amount per stack.
        base: i32,
        /// Caster attack ratio in 1/10000.
        #[serde(default)]
        attack_ratio: i32,
    },
    /// Heals the owner every interval.
    PeriodicHeal {
        /// Flat amount per stack.
        base: i32,
        /// Caster attack ratio in 1/10000.
        #[serde(default)]
        attack_ratio: i32,
    },
    /// Places unit states on the owner.
    SetState {
        /// States to set.
        state: UnitState,
    },
    /// Places aura-state markers on the owner.
    SetAuraState {
        /// Markers to set.
        state: AuraState,
    },
    /// Makes the owner immune to effect mechanics.
    MechanicImmunity {
        /// Mechanics ignored.
        mechanic: Mechanic,
    },
    /// Casts `spell` when the owner's proc events intersect `procs`.
    ProcTrigger {
        /// Events that arm the trigger.
        procs: ProcFlags,
        /// Spell cast by the owner.
        spell: u32,
        /// Chance on the 1/10000 scale.
        chance: i32,
    },
}

/// Spell cast when an aura is removed for a given cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveEffect {
    /// Removal cause that fires the spell.
    pub cause: RemoveMode,
    /// Spell cast by the aura's caster at the former owner.
    pub spell: u32,
}

fn default_multi_wrap() -> u8 {
    1
}

/// Read-only definition of an aura, keyed by `id` in the content tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuraEntry {
    /// Aura id.
    pub id: u32,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Lifetime model.
    pub cast_type: AuraCastType,
    /// Slot group.
    pub group: AuraGroup,
    /// Total lifetime; 0 lasts until removed.
    #[serde(default)]
    pub duration_ms: u32,
    /// Period of interval effects.
    #[serde(default)]
    pub interval_ms: u32,
    /// Proc triggers allowed for count-limited auras.
    #[serde(default)]
    pub effect_times: u32,
    /// Maximum stack count; 1 disables wrapping.
    #[serde(default = "default_multi_wrap")]
    pub multi_wrap: u8,
    /// Stacking priority against conflicting auras.
    #[serde(default)]
    pub effect_priority: i32,
    /// Auras sharing a stack group displace each other by priority.
    #[serde(default)]
    pub stack_group: Option<u32>,
    /// Mechanic, for immunities and dispel filters.
    #[serde(default)]
    pub mechanic: Mechanic,
    /// Effect slots (at most [`AURA_EFFECT_SLOTS`]).
    #[serde(default)]
    pub effects: Vec<AuraEffect>,
    /// Spells fired when the aura is removed for specific causes.
    #[serde(default)]
    pub remove_effects: Vec<RemoveEffect>,
}

impl AuraEntry {
    /// Minimal entry without effects.
    #[must_use]
    pub fn new(id: u32, cast_type: AuraCastType, group: AuraGroup) -> Self {
        Self {
            id,
            name: String::new(),
            cast_type,
            group,
            duration_ms: 0,
            interval_ms: 0,
            effect_times: 0,
            multi_wrap: default_multi_wrap(),
            effect_priority: 0,
            stack_group: None,
            mechanic: Mechanic::empty(),
            effects: Vec::new(),
            remove_effects: Vec::new(),
        }
    }

    /// Returns `true` when the two entries compete for the same stack.
    #[must_use]
    pub fn conflicts_with(&self, other: &AuraEntry) -> bool {
        self.id == other.id || (self.stack_group.is_some() && self.stack_group == other.stack_group)
    }

    /// Spells the removal table fires for `cause`.
    pub fn remove_spells(&self, cause: RemoveMode) -> impl Iterator<Item = u32> + '_ {
        self.remove_effects
            .iter()
            .filter(move |effect| effect.cause == cause)
            .map(|effect| effect.spell)
    }

    /// Every spell id this entry references, for content validation.
    pub fn referenced_spells(&self) -> impl Iterator<Item = u32> + '_ {
        self.effects
            .iter()
            .filter_map(|effect| match effect {
                AuraEffect::ProcTrigger { spell, .. } => Some(*spell),
                _ => None,
            })
            .chain(self.remove_effects.iter().map(|effect| effect.spell))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_id_conflicts() {
        let a = AuraEntry::new(1, AuraCastType::Persist, AuraGroup::Positive);
        let b = AuraEntry::new(1, AuraCastType::Persist, AuraGroup::Positive);
        assert!(a.conflicts_with(&b));
    }

    #[test]
    fn stack_group_conflicts_across_ids() {
        let mut a = AuraEntry::new(1, AuraCastType::Persist, AuraGroup::Positive);
        let mut b = AuraEntry::new(2, AuraCastType::Persist, AuraGroup::Positive);
        assert!(!a.conflicts_with(&b));
        a.stack_group = Some(9);
        b.stack_group = Some(9);
        assert!(a.conflicts_with(&b));
    }

    #[test]
    fn remove_spells_filter_by_cause() {
        let mut entry = AuraEntry::new(1, AuraCastType::Persist, AuraGroup::Negative);
        entry.remove_effects = vec![
            RemoveEffect {
                cause: RemoveMode::Dispel,
                spell: 40,
            },
            RemoveEffect {
                cause: RemoveMode::Default,
                spell: 41,
            },
        ];
        assert_eq!(entry.remove_spells(RemoveMode::Dispel).collect::<Vec<_>>(), vec![40]);
        assert_eq!(entry.remove_spells(RemoveMode::Cancel).count(), 0);
    }

    #[test]
    fn deserializes_tagged_effects() {
        let json = r#"{
            "id": 5, "cast_type": "interval", "group": "negative",
            "duration_ms": 3000, "interval_ms": 1000,
            "effects": [{"type": "periodic_damage", "base": 20}]
        }"#;
        let entry: AuraEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.multi_wrap, 1);
        assert_eq!(
            entry.effects[0],
            AuraEffect::PeriodicDamage {
                base: 20,
                attack_ratio: 0
            }
        );
    }
}
