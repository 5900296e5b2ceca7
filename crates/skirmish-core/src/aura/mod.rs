//! Aura module: buffs, debuffs and passives attached to units.
//!
//! This module provides:
//! - [`AuraEntry`]: the static definition (lifetime model, group, effects)
//! - [`Aura`]: one live instance on one owner
//! - [`AuraSlots`]: the owner's three slot groups and the stacking rules
//! - context operations that need the whole battlefield: applying, removing,
//!   ticking, death handling and proc dispatch
//!
//! # Lifecycle
//!
//! ```text
//! Applied ──(first interval pulse)──> Effecting ──(expiry)──> Registered ──(purge)──> removed
//!    │                                    │
//!    └──────────(owner dies, passive)─────┴──> Hangup
//! ```
//!
//! Full removals (`Default`, `Replace`, `Cancel`, `Dispel`, `Consume`,
//! `Delete`, `Interrupt`, `Destroy`) release the slot at once and fire the
//! entry's removal-effect spells for that cause. `Registered` defers the
//! release to the end of the owner's update; `Hangup` suspends the aura
//! while its owner is dead.

pub mod entry;
pub mod slots;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::combat_log::CombatEvent;
use crate::error::CastError;
use crate::spell::damage::{heal_state_penalty, DamageInfo, DamageKind, DamageSource};
use crate::spell::effect::{apply_damage, apply_heal};
use crate::spell::proc::ProcMasks;
use crate::spell::{cast_chained, CastContext, CastMode};
use crate::unit::{AttributeKind, UnitId, UnitState};

pub use entry::{AuraCastType, AuraEffect, AuraEntry, AuraGroup, RemoveEffect, AURA_EFFECT_SLOTS};
pub use slots::{AuraAddResult, AuraSlots};

/// Why an aura is leaving its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoveMode {
    /// Natural expiry.
    Default,
    /// Displaced by a stronger or refreshed aura.
    Replace,
    /// Cancelled by its owner.
    Cancel,
    /// Stripped by a dispel effect.
    Dispel,
    /// Count-limited charges ran out.
    Consume,
    /// Deleted by content logic.
    Delete,
    /// Interrupted by a state change.
    Interrupt,
    /// Destroyed because its owner died.
    Destroy,
    /// Marked for removal at the end of the owner's update.
    Registered,
    /// Suspended while the owner is dead.
    Hangup,
}

impl RemoveMode {
    /// Returns `true` when the cause releases the slot immediately.
    #[must_use]
    pub const fn is_full_removal(self) -> bool {
        !matches!(self, Self::Registered | Self::Hangup)
    }
}

/// Lifecycle phase of an aura instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuraPhase {
    /// Attached, no periodic pulse yet.
    Applied,
    /// At least one periodic pulse has fired.
    Effecting,
    /// Awaiting the deferred purge.
    Registered,
    /// Suspended while the owner is dead.
    Hangup,
}

/// A live aura on one owner.
#[derive(Debug, Clone)]
pub struct Aura {
    entry: Arc<AuraEntry>,
    caster: UnitId,
    caster_attack: i32,
    elapsed_ms: u32,
    duration_ms: u32,
    next_tick_ms: u32,
    wrap: u8,
    effect_times_left: u32,
    phase: AuraPhase,
}

impl Aura {
    /// Fresh instance with one stack, snapshotting the caster's attack.
    #[must_use]
    pub fn new(entry: Arc<AuraEntry>, caster: UnitId, caster_attack: i32) -> Self {
        Self {
            duration_ms: entry.duration_ms,
            next_tick_ms: entry.interval_ms,
            effect_times_left: entry.effect_times,
            entry,
            caster,
            caster_attack,
            elapsed_ms: 0,
            wrap: 1,
            phase: AuraPhase::Applied,
        }
    }

    /// Aura id.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.entry.id
    }

    /// Static definition.
    #[must_use]
    pub fn entry(&self) -> &AuraEntry {
        &self.entry
    }

    /// The unit that applied the aura (or its latest stack).
    #[must_use]
    pub const fn caster(&self) -> UnitId {
        self.caster
    }

    /// Caster attack captured when the aura (or its latest stack) landed.
    #[must_use]
    pub const fn caster_attack(&self) -> i32 {
        self.caster_attack
    }

    /// Current stack count.
    #[must_use]
    pub const fn wrap(&self) -> u8 {
        self.wrap
    }

    /// Time since the aura landed or was last refreshed.
    #[must_use]
    pub const fn elapsed_ms(&self) -> u32 {
        self.elapsed_ms
    }

    /// Remaining lifetime, `None` for auras without a duration.
    #[must_use]
    pub fn remaining_ms(&self) -> Option<u32> {
        (self.duration_ms > 0).then(|| self.duration_ms.saturating_sub(self.elapsed_ms))
    }

    /// Proc charges left on a count-limited aura.
    #[must_use]
    pub const fn effect_times_left(&self) -> u32 {
        self.effect_times_left
    }

    /// Lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> AuraPhase {
        self.phase
    }

    pub(crate) fn set_phase(&mut self, phase: AuraPhase) {
        self.phase = phase;
    }

    /// Returns `true` while the aura contributes its effects.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.phase, AuraPhase::Applied | AuraPhase::Effecting)
    }

    /// Adds a stack (up to the entry's limit) and restarts the lifetime.
    pub fn wrap_up(&mut self, caster: UnitId, caster_attack: i32) {
        self.wrap = self.wrap.saturating_add(1).min(self.entry.multi_wrap.max(1));
        self.caster = caster;
        self.caster_attack = caster_attack;
        self.elapsed_ms = 0;
        self.next_tick_ms = self.entry.interval_ms;
        self.effect_times_left = self.entry.effect_times;
    }

    /// Advances the aura clock. Returns how many interval pulses came due.
    pub fn advance(&mut self, dt_ms: u32) -> u32 {
        if !self.is_active() {
            return 0;
        }
        self.elapsed_ms = self.elapsed_ms.saturating_add(dt_ms);

        let interval = self.entry.interval_ms;
        let mut pulses = 0;
        if self.entry.cast_type == AuraCastType::Interval && interval > 0 {
            while self.next_tick_ms <= self.elapsed_ms
                && (self.duration_ms == 0 || self.next_tick_ms <= self.duration_ms)
            {
                pulses += 1;
                self.next_tick_ms = self.next_tick_ms.saturating_add(interval);
            }
        }
        if pulses > 0 {
            self.phase = AuraPhase::Effecting;
        }
        pulses
    }

    /// Spends one proc charge. Returns `true` when the charges ran out.
    pub fn consume(&mut self) -> bool {
        if self.entry.cast_type != AuraCastType::CountLimited || self.entry.effect_times == 0 {
            return false;
        }
        self.effect_times_left = self.effect_times_left.saturating_sub(1);
        self.effect_times_left == 0
    }

    /// Returns `true` once the lifetime is over.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.duration_ms > 0 && self.elapsed_ms >= self.duration_ms
    }

    /// Per-stack periodic amount scaled by the stack count.
    #[must_use]
    pub fn periodic_amount(&self, base: i32, attack_ratio: i32) -> i64 {
        let per_stack = i64::from(base) + i64::from(self.caster_attack) * i64::from(attack_ratio) / 10_000;
        per_stack.max(0) * i64::from(self.wrap)
    }
}

// =============================================================================
// Context operations
// =============================================================================

/// Applies `aura_id` from `caster` to `owner` following the stacking rules.
///
/// Dead owners and owners immune to the aura's mechanic reject it as
/// `Invalid`. A displaced aura fires its `Replace` removal effects.
///
/// # Errors
///
/// Returns [`CastError::UnknownAura`] for ids missing from the content tables
/// and engine errors for unregistered units.
pub fn apply_aura(
    ctx: &mut CastContext<'_>,
    caster: UnitId,
    owner: UnitId,
    aura_id: u32,
) -> Result<AuraAddResult, CastError> {
    let content = ctx.content;
    let entry = content
        .aura(aura_id)
        .cloned()
        .ok_or(CastError::UnknownAura(aura_id))?;
    let caster_attack = ctx.field.require(caster)?.attribute(AttributeKind::Attack);

    let target = ctx.field.require_mut(owner)?;
    if !target.is_alive() || target.mechanic_immunity().intersects(entry.mechanic) {
        trace!(%owner, aura = aura_id, "aura rejected");
        return Ok(AuraAddResult::Invalid);
    }

    let (result, displaced) = target
        .auras_mut()
        .add(Aura::new(entry, caster, caster_attack));
    ctx.log.push(CombatEvent::AuraApplied {
        owner,
        caster,
        aura: aura_id,
        result,
    });

    if let Some(old) = displaced {
        ctx.log.push(CombatEvent::AuraRemoved {
            owner,
            aura: old.id(),
            mode: RemoveMode::Replace,
        });
        fire_remove_effects(ctx, owner, &old, RemoveMode::Replace)?;
    }
    Ok(result)
}

/// Removes an aura from `owner`.
///
/// Returns `true` when the aura was held. Full-removal causes fire the
/// matching removal-effect spells.
///
/// # Errors
///
/// Propagates engine errors from the removal-effect casts.
pub fn remove_aura(
    ctx: &mut CastContext<'_>,
    owner: UnitId,
    aura_id: u32,
    mode: RemoveMode,
) -> Result<bool, CastError> {
    let slots = ctx.field.require_mut(owner)?.auras_mut();
    if slots.find(aura_id).is_none() {
        return Ok(false);
    }
    if let Some(aura) = slots.remove(aura_id, mode) {
        ctx.log.push(CombatEvent::AuraRemoved {
            owner,
            aura: aura_id,
            mode,
        });
        fire_remove_effects(ctx, owner, &aura, mode)?;
    }
    Ok(true)
}

fn fire_remove_effects(
    ctx: &mut CastContext<'_>,
    owner: UnitId,
    aura: &Aura,
    cause: RemoveMode,
) -> Result<(), CastError> {
    let spells: Vec<u32> = aura.entry().remove_spells(cause).collect();
    for spell in spells {
        cast_chained(ctx, aura.caster(), spell, Some(owner), CastMode::Triggered)?;
    }
    Ok(())
}

struct Pulse {
    caster: UnitId,
    aura: u32,
    kind: DamageKind,
    amount: i64,
}

/// Advances every aura on `owner` by `dt_ms`.
///
/// Interval pulses apply their periodic damage and heals; expired auras are
/// registered for the purge at the end of the owner's update.
///
/// # Errors
///
/// Propagates engine errors.
pub fn update_auras(ctx: &mut CastContext<'_>, owner: UnitId, dt_ms: u32) -> Result<(), CastError> {
    let unit = ctx.field.require_mut(owner)?;
    if !unit.is_alive() {
        return Ok(());
    }

    let mut pulses = Vec::new();
    for aura in unit.auras_mut().iter_mut() {
        let count = aura.advance(dt_ms);
        for _ in 0..count {
            for effect in &aura.entry().effects {
                let (kind, amount) = match *effect {
                    AuraEffect::PeriodicDamage { base, attack_ratio } => {
                        (DamageKind::Damage, aura.periodic_amount(base, attack_ratio))
                    }
                    AuraEffect::PeriodicHeal { base, attack_ratio } => {
                        (DamageKind::Heal, aura.periodic_amount(base, attack_ratio))
                    }
                    _ => continue,
                };
                pulses.push(Pulse {
                    caster: aura.caster(),
                    aura: aura.id(),
                    kind,
                    amount,
                });
            }
        }
        if aura.is_active() && aura.is_expired() {
            aura.set_phase(AuraPhase::Registered);
        }
    }

    for pulse in pulses {
        let caster = ctx.field.require(pulse.caster)?;
        let target = ctx.field.require(owner)?;
        if !target.is_alive() {
            break;
        }
        let mut info = DamageInfo::new(caster, target, DamageSource::Aura(pulse.aura), pulse.kind);
        match pulse.kind {
            DamageKind::Heal => {
                info.amount = heal_state_penalty(pulse.amount, target.state());
                apply_heal(ctx, &mut info)?;
            }
            _ => {
                if target.state().contains(UnitState::IMMUNE) && !caster.is_friend_of(target) {
                    continue;
                }
                info.amount = pulse.amount;
                apply_damage(ctx, &mut info)?;
            }
        }
    }
    Ok(())
}

/// Releases every aura registered for removal on `owner`, firing their
/// `Default` removal effects.
///
/// # Errors
///
/// Propagates engine errors.
pub fn purge_registered(ctx: &mut CastContext<'_>, owner: UnitId) -> Result<(), CastError> {
    let purged = ctx.field.require_mut(owner)?.auras_mut().take_registered();
    for aura in purged {
        ctx.log.push(CombatEvent::AuraRemoved {
            owner,
            aura: aura.id(),
            mode: RemoveMode::Default,
        });
        fire_remove_effects(ctx, owner, &aura, RemoveMode::Default)?;
    }
    Ok(())
}

/// Aura bookkeeping for a unit that just died: buffs and debuffs are
/// destroyed, passives hang up.
///
/// # Errors
///
/// Propagates engine errors.
pub fn handle_death(ctx: &mut CastContext<'_>, unit: UnitId) -> Result<(), CastError> {
    let slots = ctx.field.require(unit)?.auras();
    let destroyed: Vec<u32> = slots
        .ids(AuraGroup::Positive)
        .into_iter()
        .chain(slots.ids(AuraGroup::Negative))
        .collect();
    let passives: Vec<u32> = slots
        .iter_active()
        .filter(|aura| aura.entry().group == AuraGroup::Passive)
        .map(Aura::id)
        .collect();

    for aura in destroyed {
        remove_aura(ctx, unit, aura, RemoveMode::Destroy)?;
    }
    let slots = ctx.field.require_mut(unit)?.auras_mut();
    for aura in passives {
        slots.remove(aura, RemoveMode::Hangup);
    }
    Ok(())
}

/// Fires the `ProcTrigger` aura effects armed by the proc masks of a cast.
///
/// Each matching trigger rolls its chance and casts its spell at the unit's
/// counterpart. Count-limited auras spend a charge per firing and are removed
/// with `Consume` when they run dry.
///
/// # Errors
///
/// Propagates engine errors.
pub fn dispatch_procs(ctx: &mut CastContext<'_>, procs: &ProcMasks) -> Result<(), CastError> {
    for (unit_id, record) in procs.iter() {
        let unit = ctx.field.require(unit_id)?;
        if !unit.is_alive() {
            continue;
        }
        let triggers: Vec<(u32, u32, i32)> = unit
            .auras()
            .iter_active()
            .flat_map(|aura| {
                aura.entry().effects.iter().filter_map(move |effect| match *effect {
                    AuraEffect::ProcTrigger { procs, spell, chance }
                        if procs.intersects(record.flags) =>
                    {
                        Some((aura.id(), spell, chance))
                    }
                    _ => None,
                })
            })
            .collect();

        for (aura_id, spell, chance) in triggers {
            if ctx.rng.roll() > chance {
                continue;
            }
            trace!(unit = %unit_id, aura = aura_id, spell, "proc fired");
            cast_chained(ctx, unit_id, spell, record.counterpart, CastMode::Triggered)?;

            let exhausted = ctx
                .field
                .require_mut(unit_id)?
                .auras_mut()
                .find_mut(aura_id)
                .is_some_and(Aura::consume);
            if exhausted {
                remove_aura(ctx, unit_id, aura_id, RemoveMode::Consume)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spell::proc::ProcFlags;
    use crate::tests::helpers::{attrs, Fixture};
    use crate::unit::{Camp, Mechanic};

    fn entry(id: u32, cast_type: AuraCastType, group: AuraGroup) -> AuraEntry {
        AuraEntry::new(id, cast_type, group)
    }

    mod instance_tests {
        use super::*;

        #[test]
        fn interval_pulses_follow_elapsed_time() {
            let mut e = entry(1, AuraCastType::Interval, AuraGroup::Negative);
            e.duration_ms = 3000;
            e.interval_ms = 1000;
            let mut aura = Aura::new(Arc::new(e), UnitId::new(0), 100);

            assert_eq!(aura.advance(600), 0);
            assert_eq!(aura.phase(), AuraPhase::Applied);
            assert_eq!(aura.advance(600), 1);
            assert_eq!(aura.phase(), AuraPhase::Effecting);
            assert_eq!(aura.advance(2000), 2);
            assert!(aura.is_expired());
            assert_eq!(aura.advance(1000), 0);
        }

        #[test]
        fn persist_auras_never_pulse() {
            let mut e = entry(1, AuraCastType::Persist, AuraGroup::Positive);
            e.interval_ms = 100;
            let mut aura = Aura::new(Arc::new(e), UnitId::new(0), 0);
            assert_eq!(aura.advance(1000), 0);
            assert!(!aura.is_expired());
            assert_eq!(aura.remaining_ms(), None);
        }

        #[test]
        fn periodic_amount_scales_with_attack_and_wrap() {
            let mut e = entry(1, AuraCastType::Interval, AuraGroup::Negative);
            e.multi_wrap = 3;
            let mut aura = Aura::new(Arc::new(e), UnitId::new(0), 1000);
            assert_eq!(aura.periodic_amount(10, 5000), 510);
            aura.wrap_up(UnitId::new(0), 1000);
            assert_eq!(aura.periodic_amount(10, 5000), 1020);
        }

        #[test]
        fn count_limited_charges_run_out() {
            let mut e = entry(1, AuraCastType::CountLimited, AuraGroup::Positive);
            e.effect_times = 2;
            let mut aura = Aura::new(Arc::new(e), UnitId::new(0), 0);
            assert!(!aura.consume());
            assert!(aura.consume());
            assert_eq!(aura.effect_times_left(), 0);
        }

        #[test]
        fn remove_modes_classify() {
            assert!(RemoveMode::Dispel.is_full_removal());
            assert!(RemoveMode::Destroy.is_full_removal());
            assert!(!RemoveMode::Registered.is_full_removal());
            assert!(!RemoveMode::Hangup.is_full_removal());
        }
    }

    mod context_tests {
        use super::*;

        #[test]
        fn periodic_damage_ticks_and_expires() {
            let mut fx = Fixture::new();
            let mut dot = entry(50, AuraCastType::Interval, AuraGroup::Negative);
            dot.duration_ms = 1000;
            dot.interval_ms = 500;
            dot.effects = vec![AuraEffect::PeriodicDamage {
                base: 30,
                attack_ratio: 0,
            }];
            fx.content.insert_aura(dot);
            let a = fx.spawn(Camp::Attacker, attrs(1000, 100));
            let d = fx.spawn(Camp::Defender, attrs(1000, 100));

            let mut ctx = fx.ctx();
            assert_eq!(apply_aura(&mut ctx, a, d, 50), Ok(AuraAddResult::Add));
            update_auras(&mut ctx, d, 500).unwrap();
            update_auras(&mut ctx, d, 500).unwrap();
            purge_registered(&mut ctx, d).unwrap();
            drop(ctx);

            assert_eq!(fx.unit(d).hp(), 940);
            assert_eq!(fx.unit(a).stats().damage_dealt, 60);
            assert!(fx.unit(d).auras().is_empty());
        }

        #[test]
        fn mechanic_immunity_rejects_aura() {
            let mut fx = Fixture::new();
            let mut stun = entry(60, AuraCastType::Persist, AuraGroup::Negative);
            stun.mechanic = Mechanic::STUN;
            let mut ward = entry(61, AuraCastType::Persist, AuraGroup::Positive);
            ward.effects = vec![AuraEffect::MechanicImmunity {
                mechanic: Mechanic::STUN,
            }];
            fx.content.insert_aura(stun);
            fx.content.insert_aura(ward);
            let a = fx.spawn(Camp::Attacker, attrs(100, 10));
            let d = fx.spawn(Camp::Defender, attrs(100, 10));

            let mut ctx = fx.ctx();
            apply_aura(&mut ctx, d, d, 61).unwrap();
            assert_eq!(apply_aura(&mut ctx, a, d, 60), Ok(AuraAddResult::Invalid));
        }

        #[test]
        fn unknown_aura_is_an_error() {
            let mut fx = Fixture::new();
            let a = fx.spawn(Camp::Attacker, attrs(100, 10));
            let mut ctx = fx.ctx();
            assert_eq!(apply_aura(&mut ctx, a, a, 999), Err(CastError::UnknownAura(999)));
        }

        #[test]
        fn death_destroys_buffs_and_hangs_passives() {
            let mut fx = Fixture::new();
            fx.content
                .insert_aura(entry(70, AuraCastType::Persist, AuraGroup::Positive));
            fx.content
                .insert_aura(entry(71, AuraCastType::Persist, AuraGroup::Passive));
            let a = fx.spawn(Camp::Attacker, attrs(100, 10));

            let mut ctx = fx.ctx();
            apply_aura(&mut ctx, a, a, 70).unwrap();
            apply_aura(&mut ctx, a, a, 71).unwrap();
            ctx.field.require_mut(a).unwrap().take_damage(100);
            handle_death(&mut ctx, a).unwrap();
            drop(ctx);

            let slots = fx.unit(a).auras();
            assert!(slots.find(70).is_none());
            assert_eq!(slots.find(71).map(Aura::phase), Some(AuraPhase::Hangup));
        }

        #[test]
        fn dispel_removal_casts_mapped_spell() {
            let mut fx = Fixture::new();
            let mut curse = entry(80, AuraCastType::Persist, AuraGroup::Negative);
            curse.remove_effects = vec![RemoveEffect {
                cause: RemoveMode::Dispel,
                spell: crate::tests::helpers::STRIKE,
            }];
            fx.content.insert_aura(curse);
            let a = fx.spawn(Camp::Attacker, attrs(1000, 100));
            let d = fx.spawn(Camp::Defender, attrs(1000, 100));

            let mut ctx = fx.ctx();
            apply_aura(&mut ctx, a, d, 80).unwrap();
            assert_eq!(remove_aura(&mut ctx, d, 80, RemoveMode::Dispel), Ok(true));
            assert_eq!(remove_aura(&mut ctx, d, 80, RemoveMode::Dispel), Ok(false));
            drop(ctx);

            assert!(fx.unit(d).hp() < 1000);
        }

        #[test]
        fn count_limited_proc_consumes_charges() {
            let mut fx = Fixture::new();
            let mut riposte = entry(90, AuraCastType::CountLimited, AuraGroup::Positive);
            riposte.effect_times = 1;
            riposte.effects = vec![AuraEffect::ProcTrigger {
                procs: ProcFlags::TAKE_DAMAGE,
                spell: crate::tests::helpers::STRIKE,
                chance: 10_000,
            }];
            fx.content.insert_aura(riposte);
            let a = fx.spawn(Camp::Attacker, attrs(1000, 100));
            let d = fx.spawn(Camp::Defender, attrs(1000, 100));

            let mut ctx = fx.ctx();
            apply_aura(&mut ctx, d, d, 90).unwrap();
            let mut procs = ProcMasks::default();
            procs.add(d, ProcFlags::TAKE_DAMAGE, Some(a));
            dispatch_procs(&mut ctx, &procs).unwrap();
            drop(ctx);

            assert!(fx.unit(a).hp() < 1000);
            assert!(fx.unit(d).auras().find(90).is_none());
        }
    }
}
