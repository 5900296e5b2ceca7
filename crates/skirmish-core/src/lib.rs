//! # Skirmish Core
//!
//! Scene and spell resolution core for Skirmish battles.
//!
//! This crate runs battle instances ("scenes") between two rosters of units,
//! ticking them at a fixed cadence and resolving every skill cast through a
//! strict pipeline: cast validation, target selection, outcome roll,
//! damage/heal computation, aura application and proc/trigger propagation.
//!
//! ## Architecture
//!
//! - **Units** ([`unit`]): heroes and creatures built from frozen attribute snapshots
//! - **Auras** ([`aura`]): timed or count-limited buffs/debuffs with stacking rules
//! - **Spells** ([`spell`]): the per-cast resolution pipeline and its lookup tables
//! - **Scenes** ([`scene`]): tick loops, end conditions and the [`SceneManager`]
//!
//! Every scene owns its own [`rng::SceneRng`], so a scene replayed from the
//! same seed and rosters produces the same battle.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use skirmish_core::{ContentTables, EngineConfig, SceneManager, SpellRegistry};
//!
//! let content = Arc::new(ContentTables::from_file(file)?);
//! let manager = SceneManager::new(EngineConfig::default(), content, Arc::new(SpellRegistry::standard()));
//! let handle = manager.create_scene(request)?;
//! let result = handle.result().await;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod aura;
pub mod battlefield;
pub mod combat_log;
pub mod config;
pub mod content;
pub mod error;
pub mod rng;
pub mod scene;
pub mod spell;
pub mod unit;

pub use battlefield::Battlefield;
pub use combat_log::{CombatEvent, CombatLog};
pub use config::EngineConfig;
pub use content::{ContentError, ContentFile, ContentTables};
pub use error::{CastError, EngineError, SceneError};
pub use rng::{RollSource, SceneRng};
pub use scene::{
    Scene, SceneHandle, SceneId, SceneManager, SceneOutcome, SceneRequest, SceneResult,
    SceneState, SceneType,
};
pub use spell::{cast_spell, CastContext, CastMode, SpellRegistry};
pub use unit::{Camp, Unit, UnitId, UnitSnapshot, UnitTag};

#[cfg(test)]
mod tests;
