//! # Skirmish Service
//!
//! The `StartCombat` boundary around [`skirmish_core`]: configuration and
//! content loading, tracing bootstrap, and a [`CombatService`] that runs one
//! battle per call under a request timeout.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use skirmish_service::{CombatService, ServiceConfig};
//!
//! let config = ServiceConfig::load(Some(Path::new("service.json")))?;
//! let service = CombatService::from_config(&config)?;
//! let reply = service.start_combat(request).await?;
//! println!("attacker won: {}", reply.result.attacker_win);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod logging;
pub mod service;

pub use config::ServiceConfig;
pub use error::ServiceError;
pub use logging::init_tracing;
pub use service::{load_content, CombatReply, CombatService, StartCombat};
