//! Per-tick unit update.

use tracing::{debug, trace};

use crate::aura;
use crate::error::{CastError, EngineError};
use crate::spell::{cast_spell, CastContext, CastMode};
use crate::unit::UnitId;

/// Keeps engine errors, logs and drops everything else.
fn fatal_only<T>(result: Result<T, CastError>) -> Result<(), EngineError> {
    match result {
        Ok(_) => Ok(()),
        Err(CastError::Engine(err)) => Err(err),
        Err(err) => {
            debug!(%err, "aura bookkeeping skipped");
            Ok(())
        }
    }
}

/// Updates one unit for one tick.
///
/// A living unit ticks its auras, then its cooldowns and energy, then tries
/// its skill rotation in order and casts the first spell that resolves.
/// Deferred aura removals are purged last. A dead unit only purges.
///
/// # Errors
///
/// Returns the engine error that ends the scene.
pub fn update_unit(ctx: &mut CastContext<'_>, id: UnitId, dt_ms: u32) -> Result<(), EngineError> {
    if ctx.field.require(id)?.is_alive() {
        fatal_only(aura::update_auras(ctx, id, dt_ms))?;
    }

    let unit = ctx.field.require_mut(id)?;
    if unit.is_alive() {
        unit.update(dt_ms);
        let rotation: Vec<u32> = unit.entry().rotation().collect();
        for spell in rotation {
            match cast_spell(ctx, id, spell, None, CastMode::Normal) {
                Ok(report) => {
                    trace!(unit = %id, spell, targets = report.targets.len(), "cast");
                    break;
                }
                Err(CastError::Engine(err)) => return Err(err),
                Err(err) => trace!(unit = %id, spell, %err, "cast skipped"),
            }
        }
    }

    fatal_only(aura::purge_registered(ctx, id))
}
