//! Error taxonomy for scene creation, spell casting and fatal engine faults.
//!
//! - [`SceneError`]: validation and capacity failures surfaced to whoever asked
//!   for a scene. Nothing is registered when one of these is returned.
//! - [`CastError`]: per-cast failures. The offending cast is skipped and the
//!   tick loop carries on.
//! - [`EngineError`]: internal invariant violations. They end the affected
//!   scene in the `Errored` state and never reach other scenes.

use thiserror::Error;

use crate::scene::{SceneId, SceneType};
use crate::unit::{AuraState, UnitId, UnitState};

/// Failures returned synchronously by scene creation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    /// The raw scene type is outside the enumerated range.
    #[error("unknown scene type {0}")]
    UnknownSceneType(u8),

    /// The scene type is valid but the content tables have no entry for it.
    #[error("no scene entry configured for {0}")]
    InvalidSceneEntry(SceneType),

    /// The process already runs the configured maximum number of scenes.
    #[error("scene capacity exceeded ({limit} live scenes)")]
    SceneCapacityExceeded {
        /// Configured maximum.
        limit: usize,
    },

    /// A live scene is already registered under this id.
    #[error("scene {0} is already running")]
    DuplicateScene(SceneId),

    /// A roster references a unit type missing from the content tables.
    #[error("unknown unit type {0}")]
    UnknownUnitEntry(u32),

    /// The combined rosters exceed the per-scene unit limit.
    #[error("roster of {count} units exceeds the limit of {limit}")]
    TooManyUnits {
        /// Units requested.
        count: usize,
        /// Configured maximum.
        limit: usize,
    },

    /// The manager is draining and accepts no new scenes.
    #[error("scene manager is shutting down")]
    ShuttingDown,
}

/// Why a single cast was abandoned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CastError {
    /// The spell is still cooling down.
    #[error("spell {spell} on cooldown for {remaining_ms}ms")]
    Cooldown {
        /// Spell id.
        spell: u32,
        /// Time left before the spell is ready.
        remaining_ms: u32,
    },

    /// The caster holds a state that forbids this cast.
    #[error("caster state {state:?} forbids spell {spell}")]
    CasterStateLimit {
        /// Spell id.
        spell: u32,
        /// The offending state bits.
        state: UnitState,
    },

    /// The caster lacks a required aura-state marker or holds a forbidden one.
    #[error("caster aura state {state:?} forbids spell {spell}")]
    CasterAuraStateLimit {
        /// Spell id.
        spell: u32,
        /// The caster's markers at the time of the cast.
        state: AuraState,
    },

    /// The caster cannot pay the energy cost.
    #[error("spell {spell} costs {cost} energy, caster has {available}")]
    CasterCostLimit {
        /// Spell id.
        spell: u32,
        /// Required energy.
        cost: i32,
        /// Energy on hand.
        available: i32,
    },

    /// No usable target was found.
    #[error("spell {spell} found no target")]
    TargetNotExist {
        /// Spell id.
        spell: u32,
    },

    /// The explicit target fails the spell's target filters.
    #[error("unit {target} is not a valid target for spell {spell}")]
    TargetInvalid {
        /// Spell id.
        spell: u32,
        /// Rejected target.
        target: UnitId,
    },

    /// The explicit target holds a state the spell refuses.
    #[error("target {target} state {state:?} forbids spell {spell}")]
    TargetStateLimit {
        /// Spell id.
        spell: u32,
        /// Rejected target.
        target: UnitId,
        /// The offending state bits.
        state: UnitState,
    },

    /// The spell id is not in the content tables.
    #[error("unknown spell {0}")]
    UnknownSpell(u32),

    /// An effect references an aura id that is not in the content tables.
    #[error("unknown aura {0}")]
    UnknownAura(u32),

    /// Trigger chains went deeper than allowed.
    #[error("spell {spell} exceeded the trigger depth limit")]
    DepthExceeded {
        /// Spell id.
        spell: u32,
    },

    /// A fatal engine fault surfaced during resolution.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl CastError {
    /// Returns the engine fault carried by this error, if any.
    #[must_use]
    pub fn into_engine(self) -> Option<EngineError> {
        match self {
            Self::Engine(err) => Some(err),
            _ => None,
        }
    }
}

/// Internal invariant violations that terminate a scene.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A unit id referenced during resolution is not registered.
    #[error("unit {0} missing from the scene registry")]
    UnitMissing(UnitId),

    /// The unit registry disagrees with itself.
    #[error("corrupted unit registry: {0}")]
    CorruptRegistry(String),

    /// The scene task stopped abnormally.
    #[error("scene task aborted: {0}")]
    TaskAborted(String),
}
