//! Engine configuration.
//!
//! [`EngineConfig`] bounds the scene manager and sets the default timing of
//! every scene. All fields have defaults, so an empty JSON object is a valid
//! configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a scene picks its RNG seed when the request carries none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedPolicy {
    /// Seed from the scene id, so the same request replays the same battle.
    #[default]
    SceneId,
    /// Seed from OS entropy.
    Random,
}

const fn default_max_scenes() -> usize {
    5000
}

const fn default_max_units() -> usize {
    40
}

const fn default_tick_period() -> u64 {
    200
}

const fn default_max_battle() -> u64 {
    90_000
}

const fn default_log_events() -> bool {
    true
}

/// Limits and timing shared by every scene of a process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of concurrently live scenes.
    #[serde(default = "default_max_scenes")]
    pub max_scenes: usize,
    /// Maximum units (both camps) in one scene.
    #[serde(default = "default_max_units")]
    pub max_units_per_scene: usize,
    /// Tick cadence in milliseconds.
    #[serde(default = "default_tick_period")]
    pub tick_period_ms: u64,
    /// Battle duration limit used when the scene entry sets none.
    #[serde(default = "default_max_battle")]
    pub max_battle_ms: u64,
    /// Whether scenes record a combat log.
    #[serde(default = "default_log_events")]
    pub log_events: bool,
    /// Seed selection for requests without an explicit seed.
    #[serde(default)]
    pub seed_policy: SeedPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_scenes: default_max_scenes(),
            max_units_per_scene: default_max_units(),
            tick_period_ms: default_tick_period(),
            max_battle_ms: default_max_battle(),
            log_events: default_log_events(),
            seed_policy: SeedPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Checks that every bound is usable.
    ///
    /// # Errors
    ///
    /// Returns the first zero-valued bound.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_scenes == 0 {
            return Err(ConfigError::Zero("max_scenes"));
        }
        if self.max_units_per_scene == 0 {
            return Err(ConfigError::Zero("max_units_per_scene"));
        }
        if self.tick_period_ms == 0 {
            return Err(ConfigError::Zero("tick_period_ms"));
        }
        if self.max_battle_ms < self.tick_period_ms {
            return Err(ConfigError::BattleShorterThanTick {
                max_battle_ms: self.max_battle_ms,
                tick_period_ms: self.tick_period_ms,
            });
        }
        Ok(())
    }
}

/// Invalid configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A bound that must be positive is zero.
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    /// The battle limit would end every scene before its first tick.
    #[error("max_battle_ms ({max_battle_ms}) is shorter than one tick ({tick_period_ms}ms)")]
    BattleShorterThanTick {
        /// Configured battle limit.
        max_battle_ms: u64,
        /// Configured tick period.
        tick_period_ms: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_uses_defaults() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.max_scenes, 5000);
        assert_eq!(config.max_units_per_scene, 40);
        assert_eq!(config.tick_period_ms, 200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_bounds_are_rejected() {
        let config = EngineConfig {
            max_scenes: 0,
            ..EngineConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::Zero("max_scenes")));

        let config = EngineConfig {
            tick_period_ms: 500,
            max_battle_ms: 100,
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BattleShorterThanTick { .. })
        ));
    }

    #[test]
    fn seed_policy_parses() {
        let config: EngineConfig = serde_json::from_str(r#"{"seed_policy":"random"}"#).unwrap();
        assert_eq!(config.seed_policy, SeedPolicy::Random);
    }
}
