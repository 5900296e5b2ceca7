//! Spell module: the per-cast resolution pipeline.
//!
//! A [`Spell`] is one transient cast of a [`SpellEntry`] by one caster.
//! [`cast_spell`] drives it through a fixed pipeline:
//!
//! 1. **CanCast**: liveness, cooldown, caster state, aura-state markers,
//!    energy, and the explicit target when the policy is `EXPLICIT`
//! 2. **FindTarget**: chaos/taunt redirection for melee skills, otherwise
//!    the registered selector, truncated to the target limit
//! 3. **Pay**: energy, cooldown and the `CAST` proc (regular casts only pay)
//! 4. **Outcome roll**: hit/dodge/miss/immune, crit and block per target
//! 5. **CalcEffect**: every effect slot on every landed target, gated by the
//!    slot's mechanic and [`TargetCondition`](condition::TargetCondition)
//! 6. **Trigger**: the entry's trigger spell on a successful chance roll
//! 7. **Beat-back**: blockers answer with their beat-back spell
//! 8. **Proc dispatch**: `ProcTrigger` auras armed by the cast fire
//!
//! Steps 1 and 2 have no side effects, so a failed cast leaves the scene
//! untouched. Nested casts (triggers, beat-backs, procs, removal effects)
//! are bounded by [`MAX_CAST_DEPTH`].
//!
//! # Architecture
//!
//! The pipeline borrows the whole scene through a [`CastContext`]. Spells
//! never hold references to units; they look units up by [`UnitId`] at each
//! step, so effects can freely mutate any unit in between.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut ctx = CastContext::new(&mut field, &mut rng, &content, &registry, modifiers, &mut log);
//! match cast_spell(&mut ctx, caster, 1001, None, CastMode::Normal) {
//!     Ok(report) => println!("hit {} targets", report.targets.len()),
//!     Err(err) => println!("cast skipped: {err}"),
//! }
//! ```

pub mod condition;
pub mod damage;
pub mod effect;
pub mod entry;
pub mod outcome;
pub mod proc;
pub mod target;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aura;
use crate::battlefield::Battlefield;
use crate::combat_log::{CombatEvent, CombatLog};
use crate::content::{ContentError, ContentTables};
use crate::error::{CastError, EngineError};
use crate::rng::RollSource;
use crate::unit::{Unit, UnitId, UnitState};

pub use damage::{DamageInfo, DamageKind, HitFlags, SceneModifiers};
pub use effect::{EffectCall, EffectFn, EffectRegistry};
pub use entry::{EffectSlot, EffectType, SelectTarget, SpellEntry, SpellFlags, SpellSchool, TargetCamp};
pub use proc::{ProcFlags, ProcMasks};
pub use target::{admits_state, is_target_valid, Selection, SelectorFn, TargetSelectorRegistry};

/// Deepest allowed chain of nested casts.
pub const MAX_CAST_DEPTH: u8 = 4;

/// How a cast was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CastMode {
    /// Chosen by the caster's rotation; pays cost and cooldown.
    Normal,
    /// Fired by another spell, a proc or an aura removal; free.
    Triggered,
    /// Counter-attack after a block; free, guaranteed, never crits or beats back.
    BeatBack,
}

/// Selector and effect tables used by the pipeline.
#[derive(Debug, Clone, Default)]
pub struct SpellRegistry {
    /// Target-selection policies.
    pub selectors: TargetSelectorRegistry,
    /// Effect implementations.
    pub effects: EffectRegistry,
}

impl SpellRegistry {
    /// Registry with every built-in selector and effect.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            selectors: TargetSelectorRegistry::standard(),
            effects: EffectRegistry::standard(),
        }
    }

    /// Checks that every spell in `content` only uses registered policies
    /// and effects.
    ///
    /// # Errors
    ///
    /// Returns the first unregistered selector or effect found.
    pub fn validate(&self, content: &ContentTables) -> Result<(), ContentError> {
        for spell in content.spells() {
            if !self.selectors.contains(spell.select_target) {
                return Err(ContentError::UnregisteredSelector {
                    spell: spell.id,
                    policy: spell.select_target.0,
                });
            }
            if let Some(slot) = spell
                .effects
                .iter()
                .find(|slot| !self.effects.contains(slot.effect))
            {
                return Err(ContentError::UnregisteredEffect {
                    spell: spell.id,
                    effect: slot.effect.0,
                });
            }
        }
        Ok(())
    }
}

/// Everything a cast may read or mutate: the scene's units, its RNG,
/// content, registries, modifiers and combat log.
pub struct CastContext<'a> {
    /// The scene's units.
    pub field: &'a mut Battlefield,
    /// The scene's roll source.
    pub rng: &'a mut dyn RollSource,
    /// Static content.
    pub content: &'a ContentTables,
    /// Selector and effect tables.
    pub registry: &'a SpellRegistry,
    /// Scene-wide damage and heal modifiers.
    pub modifiers: SceneModifiers,
    /// Event sink.
    pub log: &'a mut CombatLog,
    depth: u8,
}

impl<'a> CastContext<'a> {
    /// Context for top-level casts.
    #[must_use]
    pub fn new(
        field: &'a mut Battlefield,
        rng: &'a mut dyn RollSource,
        content: &'a ContentTables,
        registry: &'a SpellRegistry,
        modifiers: SceneModifiers,
        log: &'a mut CombatLog,
    ) -> Self {
        Self {
            field,
            rng,
            content,
            registry,
            modifiers,
            log,
            depth: 0,
        }
    }

    /// Nesting level of the cast currently resolving (0 outside any cast).
    #[must_use]
    pub const fn depth(&self) -> u8 {
        self.depth
    }
}

/// Summary of a resolved cast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CastReport {
    /// Spell id.
    pub spell: u32,
    /// Casting unit.
    pub caster: UnitId,
    /// Targets with their outcome flags, in selection order.
    pub targets: Vec<(UnitId, HitFlags)>,
    /// Units that answered with a beat-back spell.
    pub beat_backs: Vec<UnitId>,
}

/// One cast in flight.
#[derive(Debug, Clone)]
pub struct Spell {
    caster: UnitId,
    entry: Arc<SpellEntry>,
    mode: CastMode,
    explicit: Option<UnitId>,
    targets: Vec<UnitId>,
    outcomes: Vec<(UnitId, HitFlags)>,
    beat_back: Vec<UnitId>,
    procs: ProcMasks,
}

impl Spell {
    /// Prepares a cast; nothing is checked until [`resolve`](Self::resolve).
    #[must_use]
    pub fn new(caster: UnitId, entry: Arc<SpellEntry>, mode: CastMode, explicit: Option<UnitId>) -> Self {
        Self {
            caster,
            entry,
            mode,
            explicit,
            targets: Vec::new(),
            outcomes: Vec::new(),
            beat_back: Vec::new(),
            procs: ProcMasks::default(),
        }
    }

    /// Spell id.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.entry.id
    }

    /// Targets found by [`find_target`](Self::find_target).
    #[must_use]
    pub fn targets(&self) -> &[UnitId] {
        &self.targets
    }

    // -------------------------------------------------------------------------
    // CanCast
    // -------------------------------------------------------------------------

    /// Checks whether the caster may cast right now.
    ///
    /// Regular casts always forbid `DEAD`, `STUN` and the school lockout
    /// (`SILENCE` for magic, `DISARM` for physical) and check cooldown and
    /// energy. Triggered and beat-back casts only check liveness and the
    /// entry's own forbidden states. Aura-state requirements apply to all.
    ///
    /// # Errors
    ///
    /// Returns the first failed check. Never mutates anything.
    pub fn can_cast(&self, ctx: &CastContext<'_>) -> Result<(), CastError> {
        let entry = &*self.entry;
        let spell = entry.id;
        let caster = ctx.field.require(self.caster)?;
        if !caster.is_alive() {
            return Err(CastError::CasterStateLimit {
                spell,
                state: UnitState::DEAD,
            });
        }

        let mut forbid = entry.caster_state_forbid;
        if self.mode == CastMode::Normal {
            let remaining_ms = caster.cooldown(spell);
            if remaining_ms > 0 {
                return Err(CastError::Cooldown { spell, remaining_ms });
            }
            forbid |= UnitState::STUN | entry.school.lockout();
        }
        let blocked = caster.state() & forbid;
        if !blocked.is_empty() {
            return Err(CastError::CasterStateLimit {
                spell,
                state: blocked,
            });
        }

        let markers = caster.aura_state();
        if !markers.contains(entry.caster_aura_require) || markers.intersects(entry.caster_aura_forbid) {
            return Err(CastError::CasterAuraStateLimit {
                spell,
                state: markers,
            });
        }

        if self.mode == CastMode::Normal && caster.energy() < entry.energy_cost {
            return Err(CastError::CasterCostLimit {
                spell,
                cost: entry.energy_cost,
                available: caster.energy(),
            });
        }

        if entry.select_target == SelectTarget::EXPLICIT {
            let target_id = self.explicit.ok_or(CastError::TargetNotExist { spell })?;
            let target = ctx
                .field
                .get(target_id)
                .ok_or(CastError::TargetNotExist { spell })?;
            Self::check_explicit(caster, target, entry)?;
        }
        Ok(())
    }

    fn check_explicit(caster: &Unit, target: &Unit, entry: &SpellEntry) -> Result<(), CastError> {
        let mut forbid = entry.target_state_forbid;
        if caster.state().contains(UnitState::ANTI_STEALTH) {
            forbid.remove(UnitState::STEALTH);
        }
        let blocked = target.state() & forbid;
        if !blocked.is_empty() {
            return Err(CastError::TargetStateLimit {
                spell: entry.id,
                target: target.id(),
                state: blocked,
            });
        }
        if !is_target_valid(caster, target, entry) {
            return Err(CastError::TargetInvalid {
                spell: entry.id,
                target: target.id(),
            });
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // FindTarget
    // -------------------------------------------------------------------------

    /// Resolves the target set.
    ///
    /// A melee skill cast under `CHAOS` hits a random living unit other than
    /// the caster, friend or foe; under `TAUNT` it hits the living taunter.
    /// Both overrides still honor the race mask and forbidden target states,
    /// and a taunter the skill cannot target falls back to the selector.
    /// Everything else goes through the registered selector.
    ///
    /// # Errors
    ///
    /// Returns [`CastError::TargetNotExist`] for an empty result and an
    /// engine error for an unregistered policy.
    pub fn find_target(&mut self, ctx: &mut CastContext<'_>) -> Result<(), CastError> {
        let entry = &*self.entry;
        let caster = ctx.field.require(self.caster)?;
        let state = caster.state();
        let melee = entry.has(SpellFlags::MELEE);

        let taunter = (melee && state.contains(UnitState::TAUNT))
            .then(|| caster.auras().state_source(UnitState::TAUNT))
            .flatten()
            .filter(|id| {
                ctx.field
                    .get(*id)
                    .is_some_and(|unit| unit.is_alive() && is_target_valid(caster, unit, entry))
            });

        let mut targets = if melee && state.contains(UnitState::CHAOS) {
            let pool: Vec<UnitId> = ctx
                .field
                .iter()
                .filter(|unit| {
                    unit.is_alive() && unit.id() != caster.id() && admits_state(caster, unit, entry)
                })
                .map(Unit::id)
                .collect();
            if pool.is_empty() {
                pool
            } else {
                vec![pool[ctx.rng.pick(pool.len())]]
            }
        } else if let Some(taunter) = taunter {
            vec![taunter]
        } else {
            let selector = ctx.registry.selectors.get(entry.select_target).ok_or_else(|| {
                EngineError::CorruptRegistry(format!("no selector for {:?}", entry.select_target))
            })?;
            let selection = Selection {
                field: ctx.field,
                caster,
                entry,
                explicit: self.explicit,
            };
            selector(selection, &mut *ctx.rng)
        };

        if entry.max_targets > 0 {
            targets.truncate(usize::from(entry.max_targets));
        }
        if targets.is_empty() {
            return Err(CastError::TargetNotExist { spell: entry.id });
        }
        self.targets = targets;
        Ok(())
    }

    fn pay(&mut self, ctx: &mut CastContext<'_>) -> Result<(), CastError> {
        let caster = ctx.field.require_mut(self.caster)?;
        if self.mode == CastMode::Normal {
            caster.add_energy(-self.entry.energy_cost);
            caster.start_cooldown(self.entry.id, self.entry.cooldown_ms);
        }
        caster.stats_mut().casts += 1;
        self.procs
            .add(self.caster, ProcFlags::CAST, self.targets.first().copied());
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Outcome roll
    // -------------------------------------------------------------------------

    /// Rolls the outcome against every target and records miss, dodge and
    /// block procs. Blocked hits of a beat-back capable spell queue the
    /// blocker for a counter-attack.
    ///
    /// # Errors
    ///
    /// Propagates engine errors.
    pub fn cal_spell_result(&mut self, ctx: &mut CastContext<'_>) -> Result<(), CastError> {
        let entry = &*self.entry;
        for &target_id in &self.targets {
            let caster = ctx.field.require(self.caster)?;
            let target = ctx.field.require(target_id)?;
            let flags = outcome::roll_outcome(ctx.rng, caster, target, entry, self.mode);

            if flags.intersects(HitFlags::MISS | HitFlags::DODGE) {
                self.procs.add(self.caster, ProcFlags::MISS, Some(target_id));
            }
            if flags.contains(HitFlags::DODGE) {
                self.procs.add(target_id, ProcFlags::DODGE, Some(self.caster));
            }
            if flags.contains(HitFlags::BLOCK) {
                self.procs.add(target_id, ProcFlags::BLOCK, Some(self.caster));
                self.procs
                    .add(self.caster, ProcFlags::BE_BLOCKED, Some(target_id));
                if entry.has(SpellFlags::ALLOW_BEAT_BACK)
                    && self.mode != CastMode::BeatBack
                    && target.entry().beat_back_spell.is_some()
                {
                    self.beat_back.push(target_id);
                }
            }
            self.outcomes.push((target_id, flags));
        }

        ctx.log.push(CombatEvent::Cast {
            caster: self.caster,
            spell: entry.id,
            mode: self.mode,
            targets: self.outcomes.clone(),
        });
        Ok(())
    }

    // -------------------------------------------------------------------------
    // CalcEffect
    // -------------------------------------------------------------------------

    /// Runs every effect slot against every landed target.
    ///
    /// A slot is skipped when the target is immune to its mechanic or fails
    /// its condition. Non-fatal effect failures are logged and skipped.
    ///
    /// # Errors
    ///
    /// Propagates engine errors.
    pub fn calc_effect(&mut self, ctx: &mut CastContext<'_>) -> Result<(), CastError> {
        let entry = Arc::clone(&self.entry);
        for &(target_id, flags) in &self.outcomes {
            if !flags.landed() {
                continue;
            }
            for slot in &entry.effects {
                let caster = ctx.field.require(self.caster)?;
                let target = ctx.field.require(target_id)?;
                if !target.is_alive() && !entry.has(SpellFlags::ALLOW_DEAD_TARGET) {
                    break;
                }
                if target.mechanic_immunity().intersects(slot.mechanic) {
                    continue;
                }
                if !slot.condition.evaluate(caster, target, ctx.rng) {
                    continue;
                }

                let handler = ctx.registry.effects.get(slot.effect).ok_or_else(|| {
                    EngineError::CorruptRegistry(format!("no effect for {:?}", slot.effect))
                })?;
                let mut call = EffectCall {
                    caster: self.caster,
                    target: target_id,
                    spell: &entry,
                    slot,
                    flags,
                    procs: &mut self.procs,
                };
                match handler(ctx, &mut call) {
                    Ok(()) => {}
                    Err(CastError::Engine(err)) => return Err(err.into()),
                    Err(err) => debug!(spell = entry.id, target = %target_id, %err, "effect skipped"),
                }
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Propagation
    // -------------------------------------------------------------------------

    fn trigger(&self, ctx: &mut CastContext<'_>) -> Result<(), CastError> {
        let Some(trigger) = self.entry.trigger_spell else {
            return Ok(());
        };
        if ctx.rng.roll() <= self.entry.trigger_chance {
            cast_chained(
                ctx,
                self.caster,
                trigger,
                self.targets.first().copied(),
                CastMode::Triggered,
            )?;
        }
        Ok(())
    }

    /// Lets every queued blocker answer the caster with its beat-back spell.
    ///
    /// # Errors
    ///
    /// Propagates engine errors.
    pub fn cast_beat_back_spell(&mut self, ctx: &mut CastContext<'_>) -> Result<(), CastError> {
        for &blocker in &self.beat_back {
            let Some(spell) = ctx.field.require(blocker)?.entry().beat_back_spell else {
                continue;
            };
            cast_chained(ctx, blocker, spell, Some(self.caster), CastMode::BeatBack)?;
        }
        Ok(())
    }

    /// Runs the whole pipeline.
    ///
    /// # Errors
    ///
    /// Returns the [`CastError`] of a failed check, or an engine error from
    /// any later step.
    pub fn resolve(mut self, ctx: &mut CastContext<'_>) -> Result<CastReport, CastError> {
        self.can_cast(ctx)?;
        self.find_target(ctx)?;
        self.pay(ctx)?;
        self.cal_spell_result(ctx)?;
        self.calc_effect(ctx)?;
        self.trigger(ctx)?;
        self.cast_beat_back_spell(ctx)?;
        aura::dispatch_procs(ctx, &self.procs)?;

        Ok(CastReport {
            spell: self.entry.id,
            caster: self.caster,
            targets: self.outcomes,
            beat_backs: self.beat_back,
        })
    }
}

/// Casts `spell` from `caster`.
///
/// `explicit` names the target for the `EXPLICIT` policy and is ignored by
/// other policies.
///
/// # Errors
///
/// Returns [`CastError::UnknownSpell`] for ids missing from the content,
/// [`CastError::DepthExceeded`] past [`MAX_CAST_DEPTH`] nested casts, and
/// any pipeline failure.
pub fn cast_spell(
    ctx: &mut CastContext<'_>,
    caster: UnitId,
    spell: u32,
    explicit: Option<UnitId>,
    mode: CastMode,
) -> Result<CastReport, CastError> {
    let content = ctx.content;
    let entry = content
        .spell(spell)
        .cloned()
        .ok_or(CastError::UnknownSpell(spell))?;
    if ctx.depth >= MAX_CAST_DEPTH {
        return Err(CastError::DepthExceeded { spell });
    }

    ctx.depth += 1;
    let result = Spell::new(caster, entry, mode, explicit).resolve(ctx);
    ctx.depth -= 1;
    result
}

/// Casts a follow-up spell. Ordinary cast failures are logged and dropped;
/// only engine errors propagate.
pub(crate) fn cast_chained(
    ctx: &mut CastContext<'_>,
    caster: UnitId,
    spell: u32,
    explicit: Option<UnitId>,
    mode: CastMode,
) -> Result<(), CastError> {
    match cast_spell(ctx, caster, spell, explicit, mode) {
        Ok(_) => Ok(()),
        Err(CastError::Engine(err)) => Err(err.into()),
        Err(err) => {
            debug!(%caster, spell, ?mode, %err, "chained cast skipped");
            Ok(())
        }
    }
}
