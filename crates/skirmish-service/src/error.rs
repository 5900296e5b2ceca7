//! Service error types.

use std::path::PathBuf;

use skirmish_core::config::ConfigError;
use skirmish_core::{ContentError, SceneError, SceneId};
use thiserror::Error;

/// Everything that can fail at the service boundary.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A configuration or content file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A configuration, content or battle file is not valid JSON for its type.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// An environment override could not be parsed.
    #[error("invalid value {value:?} for {key}")]
    InvalidOverride {
        /// Environment variable name.
        key: &'static str,
        /// Rejected value.
        value: String,
    },

    /// No content file was configured.
    #[error("no content path configured")]
    MissingContent,

    /// Engine configuration rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Content tables rejected.
    #[error(transparent)]
    Content(#[from] ContentError),

    /// Scene creation rejected.
    #[error(transparent)]
    Scene(#[from] SceneError),

    /// The scene did not publish a result in time and was cancelled.
    #[error("scene {scene} did not finish within {timeout_ms} ms")]
    Timeout {
        /// Cancelled scene.
        scene: SceneId,
        /// Request timeout that elapsed.
        timeout_ms: u64,
    },
}
