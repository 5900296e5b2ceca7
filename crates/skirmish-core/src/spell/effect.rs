//! Spell effects and the effect registry.
//!
//! Each [`EffectSlot`] names an [`EffectType`]; the [`EffectRegistry`] maps
//! the id to an [`EffectFn`] that applies the slot to one target. Effects run
//! only for targets whose outcome roll landed.

use std::collections::HashMap;

use crate::aura::{self, AuraGroup, RemoveMode};
use crate::combat_log::CombatEvent;
use crate::error::CastError;
use crate::unit::{AttributeKind, Mechanic, UnitId};

use super::damage::{calc_damage, calc_heal, DamageInfo, DamageKind, DamageSource, HitFlags};
use super::entry::{EffectSlot, EffectType, SpellEntry};
use super::proc::{ProcFlags, ProcMasks};
use super::{cast_chained, CastContext, CastMode};

/// One effect slot applied to one target.
#[derive(Debug)]
pub struct EffectCall<'s> {
    /// Casting unit.
    pub caster: UnitId,
    /// Affected unit.
    pub target: UnitId,
    /// Spell being resolved.
    pub spell: &'s SpellEntry,
    /// Slot being applied.
    pub slot: &'s EffectSlot,
    /// Outcome of the target's roll.
    pub flags: HitFlags,
    /// Proc masks of the running cast.
    pub procs: &'s mut ProcMasks,
}

impl EffectCall<'_> {
    fn record(&mut self, info: &DamageInfo) {
        self.procs
            .add(info.caster, info.caster_procs, Some(info.target));
        self.procs
            .add(info.target, info.target_procs, Some(info.caster));
    }
}

/// An effect implementation.
pub type EffectFn = fn(&mut CastContext<'_>, &mut EffectCall<'_>) -> Result<(), CastError>;

// =============================================================================
// Application helpers
// =============================================================================

/// Removes `info.amount` hit points from the target.
///
/// Updates battle statistics, raises damage/kill procs on `info`, logs the
/// hit and runs death handling. `info.amount` becomes the amount actually
/// removed. Returns `true` when the damage killed the target.
///
/// # Errors
///
/// Propagates engine errors.
pub fn apply_damage(ctx: &mut CastContext<'_>, info: &mut DamageInfo) -> Result<bool, CastError> {
    let (dealt, killed) = ctx.field.require_mut(info.target)?.take_damage(info.amount);
    info.amount = dealt;
    if dealt > 0 {
        info.caster_procs |= ProcFlags::DEAL_DAMAGE;
        info.target_procs |= ProcFlags::TAKE_DAMAGE;
    }

    let stats = ctx.field.require_mut(info.caster)?.stats_mut();
    stats.damage_dealt += dealt;
    if killed {
        stats.kills += 1;
        info.caster_procs |= ProcFlags::KILL;
        info.target_procs |= ProcFlags::DIE;
    }
    ctx.log.push(CombatEvent::Hit(info.clone()));

    if killed {
        ctx.log.push(CombatEvent::Death {
            unit: info.target,
            killer: info.caster,
        });
        aura::handle_death(ctx, info.target)?;
    }
    Ok(killed)
}

/// Restores `info.amount` hit points to the target.
///
/// `info.amount` becomes the effective heal. Returns it.
///
/// # Errors
///
/// Propagates engine errors.
pub fn apply_heal(ctx: &mut CastContext<'_>, info: &mut DamageInfo) -> Result<i64, CastError> {
    let healed = ctx.field.require_mut(info.target)?.heal(info.amount);
    info.amount = healed;
    info.caster_procs |= ProcFlags::DEAL_HEAL;
    info.target_procs |= ProcFlags::TAKE_HEAL;
    ctx.field.require_mut(info.caster)?.stats_mut().healing_done += healed;
    ctx.log.push(CombatEvent::Hit(info.clone()));
    Ok(healed)
}

fn crit_procs(info: &mut DamageInfo) {
    if info.flags.contains(HitFlags::CRITICAL) {
        info.caster_procs |= ProcFlags::CRIT;
        info.target_procs |= ProcFlags::BE_CRIT;
    }
}

// =============================================================================
// Built-in effects
// =============================================================================

fn school_damage(ctx: &mut CastContext<'_>, call: &mut EffectCall<'_>) -> Result<(), CastError> {
    let caster = ctx.field.require(call.caster)?;
    let target = ctx.field.require(call.target)?;
    let base = call.slot.scaled_amount(caster.attribute(AttributeKind::Attack));

    let mut info = DamageInfo::new(caster, target, DamageSource::Spell(call.spell.id), DamageKind::Damage);
    info.flags = call.flags;
    info.amount = calc_damage(caster, target, call.spell.school, base, call.flags, &ctx.modifiers);
    crit_procs(&mut info);

    apply_damage(ctx, &mut info)?;
    call.record(&info);
    Ok(())
}

fn heal(ctx: &mut CastContext<'_>, call: &mut EffectCall<'_>) -> Result<(), CastError> {
    let caster = ctx.field.require(call.caster)?;
    let target = ctx.field.require(call.target)?;
    let base = call.slot.scaled_amount(caster.attribute(AttributeKind::Attack));

    let mut info = DamageInfo::new(caster, target, DamageSource::Spell(call.spell.id), DamageKind::Heal);
    info.flags = call.flags;
    info.amount = calc_heal(caster, target, base, call.flags, &ctx.modifiers);
    crit_procs(&mut info);

    apply_heal(ctx, &mut info)?;
    call.record(&info);
    Ok(())
}

fn apply_aura(ctx: &mut CastContext<'_>, call: &mut EffectCall<'_>) -> Result<(), CastError> {
    aura::apply_aura(ctx, call.caster, call.target, call.slot.param)?;
    Ok(())
}

fn dispel(ctx: &mut CastContext<'_>, call: &mut EffectCall<'_>) -> Result<(), CastError> {
    let caster = ctx.field.require(call.caster)?;
    let target = ctx.field.require(call.target)?;
    let group = if caster.is_friend_of(target) {
        AuraGroup::Negative
    } else {
        AuraGroup::Positive
    };
    let mut auras = target
        .auras()
        .dispellable(group, Mechanic::from_bits_truncate(call.slot.param));
    if let Ok(limit) = usize::try_from(call.slot.amount) {
        if limit > 0 {
            auras.truncate(limit);
        }
    }
    for aura in auras {
        aura::remove_aura(ctx, call.target, aura, RemoveMode::Dispel)?;
    }
    Ok(())
}

fn energy_change(
    ctx: &mut CastContext<'_>,
    call: &mut EffectCall<'_>,
    kind: DamageKind,
) -> Result<(), CastError> {
    let caster = ctx.field.require(call.caster)?;
    let target = ctx.field.require(call.target)?;
    let amount = i32::try_from(call.slot.scaled_amount(caster.attribute(AttributeKind::Attack)))
        .unwrap_or(i32::MAX)
        .max(0);
    let mut info = DamageInfo::new(caster, target, DamageSource::Spell(call.spell.id), kind);
    info.flags = call.flags;

    let delta = if kind == DamageKind::Placate { -amount } else { amount };
    let applied = ctx.field.require_mut(call.target)?.add_energy(delta);
    info.amount = i64::from(applied.abs());
    ctx.log.push(CombatEvent::Hit(info));
    Ok(())
}

fn placate(ctx: &mut CastContext<'_>, call: &mut EffectCall<'_>) -> Result<(), CastError> {
    energy_change(ctx, call, DamageKind::Placate)
}

fn enrage(ctx: &mut CastContext<'_>, call: &mut EffectCall<'_>) -> Result<(), CastError> {
    energy_change(ctx, call, DamageKind::Enrage)
}

fn average_hp(ctx: &mut CastContext<'_>, call: &mut EffectCall<'_>) -> Result<(), CastError> {
    let caster = ctx.field.require(call.caster)?;
    let target = ctx.field.require(call.target)?;
    if !caster.is_alive() || !target.is_alive() {
        return Ok(());
    }
    let average = (caster.hp() + target.hp()) / 2;
    let mut info = DamageInfo::new(caster, target, DamageSource::Spell(call.spell.id), DamageKind::AverageHp);
    info.flags = call.flags;
    info.amount = average;

    ctx.field.require_mut(call.caster)?.set_hp(average);
    ctx.field.require_mut(call.target)?.set_hp(average);
    ctx.log.push(CombatEvent::Hit(info));
    Ok(())
}

fn trigger_spell(ctx: &mut CastContext<'_>, call: &mut EffectCall<'_>) -> Result<(), CastError> {
    cast_chained(
        ctx,
        call.caster,
        call.slot.param,
        Some(call.target),
        CastMode::Triggered,
    )
}

// =============================================================================
// Registry
// =============================================================================

/// Effect id to implementation table.
#[derive(Debug, Clone, Default)]
pub struct EffectRegistry {
    effects: HashMap<EffectType, EffectFn>,
}

impl EffectRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in effect.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(EffectType::SCHOOL_DAMAGE, school_damage);
        registry.register(EffectType::HEAL, heal);
        registry.register(EffectType::APPLY_AURA, apply_aura);
        registry.register(EffectType::DISPEL, dispel);
        registry.register(EffectType::PLACATE, placate);
        registry.register(EffectType::ENRAGE, enrage);
        registry.register(EffectType::AVERAGE_HP, average_hp);
        registry.register(EffectType::TRIGGER_SPELL, trigger_spell);
        registry
    }

    /// Registers (or replaces) an effect.
    pub fn register(&mut self, effect: EffectType, handler: EffectFn) {
        self.effects.insert(effect, handler);
    }

    /// Looks an effect up.
    #[must_use]
    pub fn get(&self, effect: EffectType) -> Option<EffectFn> {
        self.effects.get(&effect).copied()
    }

    /// Returns `true` when the effect is registered.
    #[must_use]
    pub fn contains(&self, effect: EffectType) -> bool {
        self.effects.contains_key(&effect)
    }
}
