//! Per-target gates on spell effect slots.

use serde::{Deserialize, Serialize};

use crate::rng::RollSource;
use crate::unit::{AuraState, RaceMask, Unit, UnitState, UnitTag};

/// Condition a target must meet for an effect slot to run.
///
/// Hp thresholds and chances are on the 1/10000 scale.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetCondition {
    /// Always passes.
    #[default]
    Always,
    /// The target is the caster.
    IsSelf,
    /// The target is not the caster.
    NotSelf,
    /// The caster holds any of the states.
    CasterInState {
        /// States tested.
        state: UnitState,
    },
    /// The caster holds none of the states.
    CasterNotInState {
        /// States tested.
        state: UnitState,
    },
    /// The target holds any of the states.
    TargetInState {
        /// States tested.
        state: UnitState,
    },
    /// The target holds none of the states.
    TargetNotInState {
        /// States tested.
        state: UnitState,
    },
    /// Target hp percentage is at or above the threshold.
    TargetHpAbove {
        /// Threshold.
        pct: i32,
    },
    /// Target hp percentage is below the threshold.
    TargetHpBelow {
        /// Threshold.
        pct: i32,
    },
    /// Caster hp percentage is at or above the threshold.
    CasterHpAbove {
        /// Threshold.
        pct: i32,
    },
    /// Caster hp percentage is below the threshold.
    CasterHpBelow {
        /// Threshold.
        pct: i32,
    },
    /// The target's race is in the mask.
    TargetRaceIn {
        /// Races admitted.
        races: RaceMask,
    },
    /// The target's race is not in the mask.
    TargetRaceNotIn {
        /// Races refused.
        races: RaceMask,
    },
    /// Random chance, adjusted by the caster's level lead and the target's race.
    Chance {
        /// Base chance.
        chance: i32,
        /// Added per level the caster has over the target (negative when behind).
        #[serde(default)]
        per_level: i32,
        /// Races that receive `race_bonus`.
        #[serde(default)]
        races: RaceMask,
        /// Added when the target's race is in `races`.
        #[serde(default)]
        race_bonus: i32,
    },
    /// The target holds an active aura.
    TargetHasAura {
        /// Aura id.
        aura: u32,
    },
    /// The target does not hold the aura.
    TargetLacksAura {
        /// Aura id.
        aura: u32,
    },
    /// The caster holds an active aura.
    CasterHasAura {
        /// Aura id.
        aura: u32,
    },
    /// The caster does not hold the aura.
    CasterLacksAura {
        /// Aura id.
        aura: u32,
    },
    /// The target carries any of the aura-state markers.
    TargetAuraState {
        /// Markers tested.
        state: AuraState,
    },
    /// The caster carries any of the aura-state markers.
    CasterAuraState {
        /// Markers tested.
        state: AuraState,
    },
    /// The target is a hero.
    TargetIsHero,
    /// The target is a creature.
    TargetIsCreature,
}

impl TargetCondition {
    /// Evaluates the condition. Only `Chance` consumes a roll.
    pub fn evaluate(&self, caster: &Unit, target: &Unit, rng: &mut dyn RollSource) -> bool {
        match *self {
            Self::Always => true,
            Self::IsSelf => caster.id() == target.id(),
            Self::NotSelf => caster.id() != target.id(),
            Self::CasterInState { state } => caster.state().intersects(state),
            Self::CasterNotInState { state } => !caster.state().intersects(state),
            Self::TargetInState { state } => target.state().intersects(state),
            Self::TargetNotInState { state } => !target.state().intersects(state),
            Self::TargetHpAbove { pct } => target.hp_pct() >= pct,
            Self::TargetHpBelow { pct } => target.hp_pct() < pct,
            Self::CasterHpAbove { pct } => caster.hp_pct() >= pct,
            Self::CasterHpBelow { pct } => caster.hp_pct() < pct,
            Self::TargetRaceIn { races } => races.contains(target.race().mask()),
            Self::TargetRaceNotIn { races } => !races.contains(target.race().mask()),
            Self::Chance {
                chance,
                per_level,
                races,
                race_bonus,
            } => {
                let lead = i32::from(caster.level()) - i32::from(target.level());
                let mut value = chance.saturating_add(lead.saturating_mul(per_level));
                if races.contains(target.race().mask()) {
                    value = value.saturating_add(race_bonus);
                }
                rng.roll() <= value
            }
            Self::TargetHasAura { aura } => target.auras().has_active(aura),
            Self::TargetLacksAura { aura } => !target.auras().has_active(aura),
            Self::CasterHasAura { aura } => caster.auras().has_active(aura),
            Self::CasterLacksAura { aura } => !caster.auras().has_active(aura),
            Self::TargetAuraState { state } => target.aura_state().intersects(state),
            Self::CasterAuraState { state } => caster.aura_state().intersects(state),
            Self::TargetIsHero => target.tag() == UnitTag::Hero,
            Self::TargetIsCreature => target.tag() == UnitTag::Creature,
        }
    }
}
