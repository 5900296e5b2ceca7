//! Static spell definitions.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::unit::{AuraState, Mechanic, RaceMask, UnitState};

use super::condition::TargetCondition;

/// Maximum number of effect slots on one spell.
pub const SPELL_EFFECT_SLOTS: usize = 3;

/// Damage school. Decides which damage/resist percentages apply and which
/// caster state locks the spell out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpellSchool {
    /// Weapon skills, locked out by `DISARM`.
    Physical,
    /// Spells, locked out by `SILENCE`.
    Magic,
}

impl SpellSchool {
    /// Caster state that forbids casting spells of this school.
    #[must_use]
    pub const fn lockout(self) -> UnitState {
        match self {
            Self::Physical => UnitState::DISARM,
            Self::Magic => UnitState::SILENCE,
        }
    }
}

bitflags! {
    /// Behaviour switches of a spell.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct SpellFlags: u32 {
        /// Never misses.
        const GUARANTEED_HIT = 1 << 0;
        /// Never crits.
        const NO_CRIT = 1 << 1;
        /// Cannot be blocked.
        const NO_BLOCK = 1 << 2;
        /// Melee skill; subject to chaos and taunt redirection.
        const MELEE = 1 << 3;
        /// Blocked hits let the target answer with its beat-back spell.
        const ALLOW_BEAT_BACK = 1 << 4;
        /// The caster may be one of its own targets.
        const INCLUDE_SELF = 1 << 5;
        /// Dead units are valid targets.
        const ALLOW_DEAD_TARGET = 1 << 6;
    }
}

/// Which side a spell may target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetCamp {
    /// Opposing camp only.
    Enemy,
    /// Own camp only.
    Friend,
    /// Either camp; the selector decides.
    #[default]
    Any,
}

/// Target-selection policy id, resolved through the selector registry.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectTarget(pub u16);

impl SelectTarget {
    /// The caster itself.
    pub const SELF: Self = Self(1);
    /// Closest valid enemy.
    pub const NEAREST_ENEMY: Self = Self(2);
    /// Valid friend with the lowest hp percentage.
    pub const LOWEST_HP_FRIEND: Self = Self(3);
    /// Every valid enemy.
    pub const ALL_ENEMIES: Self = Self(4);
    /// Every valid friend.
    pub const ALL_FRIENDS: Self = Self(5);
    /// One valid enemy at random.
    pub const RANDOM_ENEMY: Self = Self(6);
    /// Valid enemy with the lowest hp percentage.
    pub const LOWEST_HP_ENEMY: Self = Self(7);
    /// The target named by the caller.
    pub const EXPLICIT: Self = Self(8);
    /// Valid enemy with the lowest unit id.
    pub const FRONT_ENEMY: Self = Self(9);
}

impl fmt::Debug for SelectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SelectTarget({})", self.0)
    }
}

/// Effect id, resolved through the effect registry.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffectType(pub u16);

impl EffectType {
    /// School damage scaled by caster attack.
    pub const SCHOOL_DAMAGE: Self = Self(1);
    /// Heal scaled by caster attack.
    pub const HEAL: Self = Self(2);
    /// Applies the aura named by `param`.
    pub const APPLY_AURA: Self = Self(3);
    /// Removes up to `amount` auras (0 for all) matching the mechanic in `param`.
    pub const DISPEL: Self = Self(4);
    /// Drains target energy.
    pub const PLACATE: Self = Self(5);
    /// Grants target energy.
    pub const ENRAGE: Self = Self(6);
    /// Evens out caster and target hit points.
    pub const AVERAGE_HP: Self = Self(7);
    /// Casts the spell named by `param` at the target.
    pub const TRIGGER_SPELL: Self = Self(8);
}

impl fmt::Debug for EffectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EffectType({})", self.0)
    }
}

/// One effect slot of a spell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectSlot {
    /// Effect to run.
    pub effect: EffectType,
    /// Per-target gate evaluated before the effect.
    #[serde(default)]
    pub condition: TargetCondition,
    /// Targets immune to this mechanic skip the slot.
    #[serde(default)]
    pub mechanic: Mechanic,
    /// Flat amount.
    #[serde(default)]
    pub amount: i32,
    /// Caster attack ratio in 1/10000.
    #[serde(default)]
    pub attack_ratio: i32,
    /// Effect-specific id or mask (aura id, spell id, dispel mechanic).
    #[serde(default)]
    pub param: u32,
}

impl EffectSlot {
    /// Unconditional slot with no scaling.
    #[must_use]
    pub fn new(effect: EffectType) -> Self {
        Self {
            effect,
            condition: TargetCondition::Always,
            mechanic: Mechanic::empty(),
            amount: 0,
            attack_ratio: 0,
            param: 0,
        }
    }

    /// Builder-style flat amount.
    #[must_use]
    pub fn with_amount(mut self, amount: i32) -> Self {
        self.amount = amount;
        self
    }

    /// Builder-style attack ratio.
    #[must_use]
    pub fn with_ratio(mut self, attack_ratio: i32) -> Self {
        self.attack_ratio = attack_ratio;
        self
    }

    /// Builder-style parameter.
    #[must_use]
    pub fn with_param(mut self, param: u32) -> Self {
        self.param = param;
        self
    }

    /// Builder-style condition.
    #[must_use]
    pub fn with_condition(mut self, condition: TargetCondition) -> Self {
        self.condition = condition;
        self
    }

    /// Flat amount plus the attack-scaled part.
    #[must_use]
    pub fn scaled_amount(&self, attack: i32) -> i64 {
        i64::from(self.amount) + i64::from(attack) * i64::from(self.attack_ratio) / 10_000
    }
}

fn default_max_targets() -> u8 {
    1
}

/// Read-only definition of a spell, keyed by `id` in the content tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellEntry {
    /// Spell id.
    pub id: u32,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Damage school.
    pub school: SpellSchool,
    /// Target-selection policy.
    pub select_target: SelectTarget,
    /// Maximum number of targets; 0 keeps every candidate.
    #[serde(default = "default_max_targets")]
    pub max_targets: u8,
    /// Side the targets must be on.
    #[serde(default)]
    pub target_camp: TargetCamp,
    /// Races the targets must belong to (empty admits all).
    #[serde(default)]
    pub target_race: RaceMask,
    /// Target states that exclude a unit.
    #[serde(default)]
    pub target_state_forbid: UnitState,
    /// Caster states that forbid the cast.
    #[serde(default)]
    pub caster_state_forbid: UnitState,
    /// Aura-state markers the caster must hold.
    #[serde(default)]
    pub caster_aura_require: AuraState,
    /// Aura-state markers the caster must not hold.
    #[serde(default)]
    pub caster_aura_forbid: AuraState,
    /// Added to the hit chance.
    #[serde(default)]
    pub hit_mod: i32,
    /// Added to the crit chance.
    #[serde(default)]
    pub crit_mod: i32,
    /// Subtracted from the target's block chance.
    #[serde(default)]
    pub broken_mod: i32,
    /// Behaviour switches.
    #[serde(default)]
    pub flags: SpellFlags,
    /// Cooldown started on a successful regular cast.
    #[serde(default)]
    pub cooldown_ms: u32,
    /// Energy paid on a successful regular cast.
    #[serde(default)]
    pub energy_cost: i32,
    /// Spell cast after this one resolves.
    #[serde(default)]
    pub trigger_spell: Option<u32>,
    /// Chance of the trigger spell on the 1/10000 scale.
    #[serde(default)]
    pub trigger_chance: i32,
    /// Effect slots (at most [`SPELL_EFFECT_SLOTS`]).
    #[serde(default)]
    pub effects: Vec<EffectSlot>,
}

impl SpellEntry {
    /// Minimal single-target spell without effects.
    #[must_use]
    pub fn new(id: u32, school: SpellSchool, select_target: SelectTarget) -> Self {
        Self {
            id,
            name: String::new(),
            school,
            select_target,
            max_targets: default_max_targets(),
            target_camp: TargetCamp::Any,
            target_race: RaceMask::empty(),
            target_state_forbid: UnitState::empty(),
            caster_state_forbid: UnitState::empty(),
            caster_aura_require: AuraState::empty(),
            caster_aura_forbid: AuraState::empty(),
            hit_mod: 0,
            crit_mod: 0,
            broken_mod: 0,
            flags: SpellFlags::empty(),
            cooldown_ms: 0,
            energy_cost: 0,
            trigger_spell: None,
            trigger_chance: 0,
            effects: Vec::new(),
        }
    }

    /// Builder-style effect slot.
    #[must_use]
    pub fn with_effect(mut self, slot: EffectSlot) -> Self {
        self.effects.push(slot);
        self
    }

    /// Builder-style flags.
    #[must_use]
    pub fn with_flags(mut self, flags: SpellFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Returns `true` when the flag is set.
    #[must_use]
    pub fn has(&self, flag: SpellFlags) -> bool {
        self.flags.contains(flag)
    }

    /// Spell ids referenced by this entry, for content validation.
    pub fn referenced_spells(&self) -> impl Iterator<Item = u32> + '_ {
        self.trigger_spell.into_iter().chain(
            self.effects
                .iter()
                .filter(|slot| slot.effect == EffectType::TRIGGER_SPELL)
                .map(|slot| slot.param),
        )
    }

    /// Aura ids referenced by this entry, for content validation.
    pub fn referenced_auras(&self) -> impl Iterator<Item = u32> + '_ {
        self.effects
            .iter()
            .filter(|slot| slot.effect == EffectType::APPLY_AURA)
            .map(|slot| slot.param)
    }
}
