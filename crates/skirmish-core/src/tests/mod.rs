//! Crate-level scene tests.
//!
//! - `determinism.rs`: same seed and rosters replay the same battle
//! - `integration.rs`: full battles through the scene loop and the manager
//! - `helpers.rs`: standard content, the cast [`helpers::Fixture`] and request builders

pub mod helpers;
