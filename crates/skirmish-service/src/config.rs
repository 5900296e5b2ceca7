//! Service configuration.
//!
//! A [`ServiceConfig`] is read from an optional JSON file and then patched by
//! `SKIRMISH_*` environment variables:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `SKIRMISH_MAX_SCENES` | `engine.max_scenes` |
//! | `SKIRMISH_MAX_UNITS_PER_SCENE` | `engine.max_units_per_scene` |
//! | `SKIRMISH_TICK_PERIOD_MS` | `engine.tick_period_ms` |
//! | `SKIRMISH_MAX_BATTLE_MS` | `engine.max_battle_ms` |
//! | `SKIRMISH_LOG_EVENTS` | `engine.log_events` |
//! | `SKIRMISH_SEED_POLICY` | `engine.seed_policy` (`scene_id` or `random`) |
//! | `SKIRMISH_REQUEST_TIMEOUT_MS` | `request_timeout_ms` |
//! | `SKIRMISH_CONTENT_PATH` | `content_path` |

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use skirmish_core::config::SeedPolicy;
use skirmish_core::EngineConfig;

use crate::error::ServiceError;

const fn default_request_timeout() -> u64 {
    120_000
}

/// Configuration of a [`CombatService`](crate::CombatService).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Engine limits and timing.
    #[serde(default)]
    pub engine: EngineConfig,
    /// How long `start_combat` waits for a result before cancelling.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
    /// JSON content file loaded at startup.
    #[serde(default)]
    pub content_path: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            request_timeout_ms: default_request_timeout(),
            content_path: None,
        }
    }
}

impl ServiceConfig {
    /// Reads `path` (defaults when `None`), applies the process environment
    /// and validates the result.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] for an unreadable or malformed file, a bad
    /// override or an invalid engine configuration.
    pub fn load(path: Option<&Path>) -> Result<Self, ServiceError> {
        let mut config = match path {
            Some(path) => read_json(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `SKIRMISH_*` overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidOverride`] for a value that does not
    /// parse.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ServiceError> {
        let engine = &mut self.engine;
        override_with(&lookup, "SKIRMISH_MAX_SCENES", &mut engine.max_scenes)?;
        override_with(
            &lookup,
            "SKIRMISH_MAX_UNITS_PER_SCENE",
            &mut engine.max_units_per_scene,
        )?;
        override_with(&lookup, "SKIRMISH_TICK_PERIOD_MS", &mut engine.tick_period_ms)?;
        override_with(&lookup, "SKIRMISH_MAX_BATTLE_MS", &mut engine.max_battle_ms)?;
        override_with(&lookup, "SKIRMISH_LOG_EVENTS", &mut engine.log_events)?;
        if let Some(value) = lookup("SKIRMISH_SEED_POLICY") {
            engine.seed_policy = match value.as_str() {
                "scene_id" => SeedPolicy::SceneId,
                "random" => SeedPolicy::Random,
                _ => {
                    return Err(ServiceError::InvalidOverride {
                        key: "SKIRMISH_SEED_POLICY",
                        value,
                    })
                }
            };
        }
        override_with(
            &lookup,
            "SKIRMISH_REQUEST_TIMEOUT_MS",
            &mut self.request_timeout_ms,
        )?;
        if let Some(path) = lookup("SKIRMISH_CONTENT_PATH") {
            self.content_path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    /// Checks the engine bounds and the request timeout.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value.
    pub fn validate(&self) -> Result<(), ServiceError> {
        self.engine.validate()?;
        if self.request_timeout_ms == 0 {
            return Err(ServiceError::InvalidOverride {
                key: "request_timeout_ms",
                value: "0".into(),
            });
        }
        Ok(())
    }

    /// Request timeout as a [`Duration`].
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn override_with<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    field: &mut T,
) -> Result<(), ServiceError> {
    if let Some(value) = lookup(key) {
        *field = value
            .trim()
            .parse()
            .map_err(|_| ServiceError::InvalidOverride { key, value })?;
    }
    Ok(())
}

/// Reads and deserializes a JSON file.
pub(crate) fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ServiceError> {
    let text = std::fs::read_to_string(path).map_err(|source| ServiceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ServiceError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_file() {
        let config = ServiceConfig::default();
        assert_eq!(config.request_timeout_ms, 120_000);
        assert_eq!(config.engine, EngineConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn file_fields_fall_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"engine": {{"max_scenes": 12}}, "content_path": "content.json"}}"#).unwrap();

        let config: ServiceConfig = read_json(file.path()).unwrap();
        assert_eq!(config.engine.max_scenes, 12);
        assert_eq!(config.engine.tick_period_ms, 200);
        assert_eq!(config.request_timeout_ms, 120_000);
        assert_eq!(config.content_path, Some(PathBuf::from("content.json")));
    }

    #[test]
    fn overrides_patch_fields() {
        let mut config = ServiceConfig::default();
        config
            .apply_overrides(env(&[
                ("SKIRMISH_MAX_SCENES", "7"),
                ("SKIRMISH_TICK_PERIOD_MS", " 100 "),
                ("SKIRMISH_LOG_EVENTS", "false"),
                ("SKIRMISH_SEED_POLICY", "random"),
                ("SKIRMISH_REQUEST_TIMEOUT_MS", "500"),
                ("SKIRMISH_CONTENT_PATH", "/srv/content.json"),
            ]))
            .unwrap();
        assert_eq!(config.engine.max_scenes, 7);
        assert_eq!(config.engine.tick_period_ms, 100);
        assert!(!config.engine.log_events);
        assert_eq!(config.engine.seed_policy, SeedPolicy::Random);
        assert_eq!(config.request_timeout(), Duration::from_millis(500));
        assert_eq!(config.content_path, Some(PathBuf::from("/srv/content.json")));
    }

    #[test]
    fn bad_override_names_the_variable() {
        let mut config = ServiceConfig::default();
        let err = config
            .apply_overrides(env(&[("SKIRMISH_MAX_SCENES", "lots")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::InvalidOverride { key: "SKIRMISH_MAX_SCENES", ref value } if value == "lots"
        ));

        let err = config
            .apply_overrides(env(&[("SKIRMISH_SEED_POLICY", "dice")]))
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidOverride { key: "SKIRMISH_SEED_POLICY", .. }));
    }

    #[test]
    fn invalid_engine_bounds_fail_validation() {
        let mut config = ServiceConfig::default();
        config.engine.tick_period_ms = 0;
        assert!(matches!(config.validate(), Err(ServiceError::Config(_))));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = read_json::<ServiceConfig>(Path::new("/nonexistent/service.json")).unwrap_err();
        assert!(matches!(err, ServiceError::Io { .. }));
    }
}
