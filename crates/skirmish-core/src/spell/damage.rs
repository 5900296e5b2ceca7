//! Damage and heal magnitude.
//!
//! All percentages use the 1/10000 scale. Damage is computed in this order:
//!
//! 1. `base + caster DamageBonus − target DamageReduce`, floored at 0
//! 2. percentage sum: PvP bonus, school bonus minus school resist, race
//!    bonus, scene modifier and level suppression, floored at −7000
//! 3. `amount × (10000 + pct) / 10000`
//! 4. critical multiplier `max(1.0, 1.7 + CritIncrement / 10000)`
//! 5. block halves the amount
//! 6. the result never drops below 5% of the caster's attack
//!
//! Heals follow the same shape with heal bonuses, then the target's
//! `INJURY` (no healing) and `POISON` (a quarter) states as the last step.

use bitflags::bitflags;
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::unit::{AttributeKind, Unit, UnitId, UnitState};

use super::entry::SpellSchool;
use super::proc::ProcFlags;

/// Lowest total percentage modifier.
pub const PCT_FLOOR: i32 = -7000;

/// Base critical multiplier (170%).
pub const CRIT_BASE_MULTIPLIER: i32 = 17_000;

/// Percentage lost per level the target has over the caster.
pub const LEVEL_SUPPRESSION_STEP: i32 = 300;

/// Cap of the level suppression penalty.
pub const LEVEL_SUPPRESSION_CAP: i32 = 3000;

/// Minimum damage as a percentage of caster attack.
pub const MIN_DAMAGE_ATTACK_PCT: i64 = 5;

bitflags! {
    /// Outcome flags of one spell against one target.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct HitFlags: u8 {
        /// Plain miss.
        const MISS = 1 << 0;
        /// Target dodged.
        const DODGE = 1 << 1;
        /// Target blocked; damage halved.
        const BLOCK = 1 << 2;
        /// Critical hit.
        const CRITICAL = 1 << 3;
        /// Target was immune.
        const IMMUNE = 1 << 4;
    }
}

impl HitFlags {
    /// Returns `true` when the effects land.
    #[must_use]
    pub fn landed(self) -> bool {
        !self.intersects(Self::MISS | Self::DODGE | Self::IMMUNE)
    }
}

/// What a [`DamageInfo`] changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageKind {
    /// Hit point loss.
    Damage,
    /// Hit point gain.
    Heal,
    /// Energy drained.
    Placate,
    /// Energy granted.
    Enrage,
    /// Hit points evened out between caster and target.
    AverageHp,
}

/// Origin of a [`DamageInfo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageSource {
    /// A spell effect.
    Spell(u32),
    /// A periodic aura pulse.
    Aura(u32),
}

/// Scene-wide modifiers from the scene entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneModifiers {
    /// Whether hero-versus-hero damage gets the PvP bonus.
    pub pvp: bool,
    /// Added to every damage percentage.
    pub damage_pct: i32,
    /// Added to every heal percentage.
    pub heal_pct: i32,
}

/// One magnitude change produced during resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageInfo {
    /// Acting unit.
    pub caster: UnitId,
    /// Affected unit.
    pub target: UnitId,
    /// Caster position at resolution time.
    pub caster_position: Vec2,
    /// Target position at resolution time.
    pub target_position: Vec2,
    /// Spell or aura behind the change.
    pub source: DamageSource,
    /// Kind of change.
    pub kind: DamageKind,
    /// Computed magnitude; after application, the amount actually applied.
    pub amount: i64,
    /// Outcome flags.
    pub flags: HitFlags,
    /// Procs raised on the caster.
    pub caster_procs: ProcFlags,
    /// Procs raised on the target.
    pub target_procs: ProcFlags,
}

impl DamageInfo {
    /// Empty record between two units.
    #[must_use]
    pub fn new(caster: &Unit, target: &Unit, source: DamageSource, kind: DamageKind) -> Self {
        Self {
            caster: caster.id(),
            target: target.id(),
            caster_position: caster.position(),
            target_position: target.position(),
            source,
            kind,
            amount: 0,
            flags: HitFlags::empty(),
            caster_procs: ProcFlags::empty(),
            target_procs: ProcFlags::empty(),
        }
    }
}

// =============================================================================
// Arithmetic
// =============================================================================

/// Scales `amount` by `pct` (1/10000), flooring `pct` at [`PCT_FLOOR`].
#[must_use]
pub fn apply_pct(amount: i64, pct: i32) -> i64 {
    amount.saturating_mul(10_000 + i64::from(pct.max(PCT_FLOOR))) / 10_000
}

/// Applies the critical multiplier `max(1.0, 1.7 + increment/10000)`.
#[must_use]
pub fn apply_crit(amount: i64, crit_increment: i32) -> i64 {
    let multiplier = CRIT_BASE_MULTIPLIER.saturating_add(crit_increment).max(10_000);
    amount.saturating_mul(i64::from(multiplier)) / 10_000
}

/// Percentage penalty when the target outlevels the caster.
#[must_use]
pub fn level_suppression(caster_level: u16, target_level: u16) -> i32 {
    if target_level <= caster_level {
        return 0;
    }
    let gap = i32::from(target_level - caster_level);
    -(gap.saturating_mul(LEVEL_SUPPRESSION_STEP)).min(LEVEL_SUPPRESSION_CAP)
}

/// Minimum damage a caster with `attack` deals.
#[must_use]
pub fn min_damage(attack: i32) -> i64 {
    i64::from(attack.max(0)) * MIN_DAMAGE_ATTACK_PCT / 100
}

/// Injury cancels heals; poison cuts them to a quarter.
#[must_use]
pub fn heal_state_penalty(amount: i64, target_state: UnitState) -> i64 {
    if target_state.contains(UnitState::INJURY) {
        0
    } else if target_state.contains(UnitState::POISON) {
        amount / 4
    } else {
        amount
    }
}

fn school_pct(caster: &Unit, target: &Unit, school: SpellSchool) -> i32 {
    let (bonus, resist) = match school {
        SpellSchool::Physical => (
            AttributeKind::PhysicalDamagePct,
            AttributeKind::PhysicalResistPct,
        ),
        SpellSchool::Magic => (AttributeKind::MagicDamagePct, AttributeKind::MagicResistPct),
    };
    caster.attribute(bonus).saturating_sub(target.attribute(resist))
}

/// Final damage of a landed hit.
#[must_use]
pub fn calc_damage(
    caster: &Unit,
    target: &Unit,
    school: SpellSchool,
    base: i64,
    flags: HitFlags,
    modifiers: &SceneModifiers,
) -> i64 {
    let mut amount = base
        .saturating_add(i64::from(caster.attribute(AttributeKind::DamageBonus)))
        .saturating_sub(i64::from(target.attribute(AttributeKind::DamageReduce)))
        .max(0);

    let pvp = if modifiers.pvp && caster.is_hero() && target.is_hero() {
        caster.attribute(AttributeKind::PvpDamagePct)
    } else {
        0
    };
    let pct = [
        school_pct(caster, target, school),
        caster.attribute(AttributeKind::damage_vs(target.race())),
        modifiers.damage_pct,
        level_suppression(caster.level(), target.level()),
    ]
    .into_iter()
    .fold(pvp, i32::saturating_add);
    amount = apply_pct(amount, pct);

    if flags.contains(HitFlags::CRITICAL) {
        amount = apply_crit(amount, caster.attribute(AttributeKind::CritIncrement));
    }
    if flags.contains(HitFlags::BLOCK) {
        amount /= 2;
    }
    amount.max(min_damage(caster.attribute(AttributeKind::Attack)))
}

/// Final heal of a landed heal.
#[must_use]
pub fn calc_heal(
    caster: &Unit,
    target: &Unit,
    base: i64,
    flags: HitFlags,
    modifiers: &SceneModifiers,
) -> i64 {
    let amount = base
        .max(0)
        .saturating_add(i64::from(caster.attribute(AttributeKind::HealBonus)))
        .saturating_add(i64::from(target.attribute(AttributeKind::HealTakenBonus)));
    let pct = caster
        .attribute(AttributeKind::HealPct)
        .saturating_add(target.attribute(AttributeKind::HealTakenPct))
        .saturating_add(modifiers.heal_pct);
    let mut amount = apply_pct(amount.max(0), pct);

    if flags.contains(HitFlags::CRITICAL) {
        amount = apply_crit(amount, caster.attribute(AttributeKind::CritIncrement));
    }
    heal_state_penalty(amount, target.state())
}
