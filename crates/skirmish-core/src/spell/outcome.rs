//! Hit, crit and block chances and the per-target outcome roll.
//!
//! Chances are on the 1/10000 scale; a roll on `[1, 10000]` succeeds when
//! `roll <= chance`.

use crate::rng::{RollSource, ROLL_MAX};
use crate::unit::{AttributeKind, Unit, UnitState};

use super::damage::HitFlags;
use super::entry::{SpellEntry, SpellFlags};
use super::CastMode;

/// Lowest hit chance against an enemy.
pub const HIT_MIN: i32 = 2000;

/// Highest hit chance against an enemy.
pub const HIT_MAX: i32 = 9500;

/// Highest crit or block chance.
pub const CHANCE_CAP: i32 = 9000;

/// Above this value, crit and block chances are halved toward it.
pub const SOFT_CAP: i32 = 5000;

fn soften(value: i32) -> i32 {
    if value > SOFT_CAP {
        value / 2 + SOFT_CAP / 2
    } else {
        value
    }
}

/// Hit chance of an attack with `hit` rating against `dodge`.
///
/// `v = (hit − dodge + hit_mod) / 2 + 2500`, clamped to
/// `[HIT_MIN, HIT_MAX]`. Friendly targets are always hit.
#[must_use]
pub fn hit_chance(hit: i32, dodge: i32, hit_mod: i32, friendly: bool) -> i32 {
    if friendly {
        return ROLL_MAX;
    }
    let value = hit.saturating_sub(dodge).saturating_add(hit_mod);
    (value.div_euclid(2) + 2500).clamp(HIT_MIN, HIT_MAX)
}

/// Crit chance: `crit − resilience (enemies only) + crit_mod`, softened
/// above 5000 and clamped to `[0, CHANCE_CAP]`.
#[must_use]
pub fn crit_chance(crit: i32, resilience: i32, crit_mod: i32, friendly: bool) -> i32 {
    let resist = if friendly { 0 } else { resilience };
    soften(crit.saturating_sub(resist).saturating_add(crit_mod)).clamp(0, CHANCE_CAP)
}

/// Block chance: `block − broken − broken_mod`, softened above 5000 and
/// clamped to `[0, CHANCE_CAP]`. Friendly targets never block.
#[must_use]
pub fn block_chance(block: i32, broken: i32, broken_mod: i32, friendly: bool) -> i32 {
    if friendly {
        return 0;
    }
    soften(block.saturating_sub(broken).saturating_sub(broken_mod)).clamp(0, CHANCE_CAP)
}

/// The three chances of one cast against one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chances {
    /// Hit chance; `ROLL_MAX` for guaranteed hits.
    pub hit: i32,
    /// Crit chance.
    pub crit: i32,
    /// Block chance.
    pub block: i32,
}

impl Chances {
    /// Chances of `entry` cast by `caster` at `target` in `mode`.
    #[must_use]
    pub fn of(caster: &Unit, target: &Unit, entry: &SpellEntry, mode: CastMode) -> Self {
        let friendly = caster.is_friend_of(target);
        let beat_back = mode == CastMode::BeatBack;

        let hit = if beat_back || entry.has(SpellFlags::GUARANTEED_HIT) {
            ROLL_MAX
        } else {
            hit_chance(
                caster.attribute(AttributeKind::Hit),
                target.attribute(AttributeKind::Dodge),
                entry.hit_mod,
                friendly,
            )
        };
        let crit = if beat_back || entry.has(SpellFlags::NO_CRIT) {
            0
        } else {
            crit_chance(
                caster.attribute(AttributeKind::Crit),
                target.attribute(AttributeKind::Resilience),
                entry.crit_mod,
                friendly,
            )
        };
        let block = if beat_back || entry.has(SpellFlags::NO_BLOCK) {
            0
        } else {
            block_chance(
                target.attribute(AttributeKind::Block),
                caster.attribute(AttributeKind::Broken),
                entry.broken_mod,
                friendly,
            )
        };
        Self { hit, crit, block }
    }
}

/// Rolls the outcome of `entry` against `target`.
///
/// Immune enemies short-circuit to `IMMUNE`. A failed hit is a `DODGE` when
/// the target has positive dodge and a `MISS` otherwise; a landed hit then
/// rolls crit and block, each only when its chance is positive.
pub fn roll_outcome(
    rng: &mut dyn RollSource,
    caster: &Unit,
    target: &Unit,
    entry: &SpellEntry,
    mode: CastMode,
) -> HitFlags {
    if !caster.is_friend_of(target) && target.state().contains(UnitState::IMMUNE) {
        return HitFlags::IMMUNE;
    }
    let chances = Chances::of(caster, target, entry, mode);

    if chances.hit < ROLL_MAX && rng.roll() > chances.hit {
        return if target.attribute(AttributeKind::Dodge) > 0 {
            HitFlags::DODGE
        } else {
            HitFlags::MISS
        };
    }

    let mut flags = HitFlags::empty();
    if chances.crit > 0 && rng.roll() <= chances.crit {
        flags |= HitFlags::CRITICAL;
    }
    if chances.block > 0 && rng.roll() <= chances.block {
        flags |= HitFlags::BLOCK;
    }
    flags
}
