//! The `StartCombat` operation.
//!
//! [`CombatService`] owns one [`SceneManager`] per process. Each call creates
//! a scene, waits for its result under the request timeout and returns it
//! together with the caller's identifiers. A call that times out cancels its
//! scene, so no battle outlives the request that started it.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use skirmish_core::{
    ContentFile, ContentTables, SceneId, SceneManager, SceneRequest, SceneResult, SpellRegistry,
    UnitSnapshot,
};
use tracing::{info, instrument, warn};

use crate::config::{read_json, ServiceConfig};
use crate::error::ServiceError;

// =============================================================================
// Messages
// =============================================================================

/// Request to run one battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartCombat {
    /// Scene id, unique among live scenes.
    pub scene_id: u64,
    /// Raw scene type.
    pub scene_type: u8,
    /// Attacking roster owner.
    pub attacker_id: u64,
    /// Defending roster owner.
    pub defender_id: u64,
    /// Attacking roster.
    pub attacker_units: Vec<UnitSnapshot>,
    /// Defending roster.
    pub defender_units: Vec<UnitSnapshot>,
    /// Optional RNG seed for replays.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl From<StartCombat> for SceneRequest {
    fn from(request: StartCombat) -> Self {
        Self {
            id: SceneId::new(request.scene_id),
            scene_type: request.scene_type,
            attacker_id: request.attacker_id,
            defender_id: request.defender_id,
            attackers: request.attacker_units,
            defenders: request.defender_units,
            seed: request.seed,
        }
    }
}

/// Reply to [`StartCombat`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatReply {
    /// Scene id from the request.
    pub scene_id: u64,
    /// Attacking roster owner from the request.
    pub attacker_id: u64,
    /// Defending roster owner from the request.
    pub defender_id: u64,
    /// Battle result.
    pub result: SceneResult,
}

// =============================================================================
// Content
// =============================================================================

/// Loads and validates a JSON content file against `registry`.
///
/// # Errors
///
/// Returns [`ServiceError`] for an unreadable or malformed file, invalid
/// tables, or a selector or effect id `registry` does not know.
pub fn load_content(path: &Path, registry: &SpellRegistry) -> Result<ContentTables, ServiceError> {
    let file: ContentFile = read_json(path)?;
    let tables = ContentTables::from_file(file)?;
    registry.validate(&tables)?;
    info!(
        path = %path.display(),
        spells = tables.spells().count(),
        "content loaded"
    );
    Ok(tables)
}

// =============================================================================
// Service
// =============================================================================

/// Runs battles on behalf of callers.
#[derive(Debug, Clone)]
pub struct CombatService {
    manager: SceneManager,
    request_timeout: Duration,
}

impl CombatService {
    /// Builds a service over already loaded content.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] for an invalid configuration or content the
    /// standard registry cannot resolve.
    pub fn new(config: &ServiceConfig, content: Arc<ContentTables>) -> Result<Self, ServiceError> {
        config.validate()?;
        let registry = SpellRegistry::standard();
        registry.validate(&content)?;
        Ok(Self {
            manager: SceneManager::new(config.engine.clone(), content, Arc::new(registry)),
            request_timeout: config.request_timeout(),
        })
    }

    /// Builds a service, loading content from `config.content_path`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::MissingContent`] without a content path, and
    /// any loading or validation error.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let path = config
            .content_path
            .as_deref()
            .ok_or(ServiceError::MissingContent)?;
        let content = load_content(path, &SpellRegistry::standard())?;
        Self::new(config, Arc::new(content))
    }

    /// The underlying scene manager.
    #[must_use]
    pub fn manager(&self) -> &SceneManager {
        &self.manager
    }

    /// Runs one battle and waits for its result.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Scene`] at once when the scene cannot be
    /// created, and [`ServiceError::Timeout`] after cancelling a scene that
    /// did not finish within the request timeout.
    #[instrument(skip_all, fields(scene = request.scene_id, kind = request.scene_type))]
    pub async fn start_combat(&self, request: StartCombat) -> Result<CombatReply, ServiceError> {
        let (scene_id, attacker_id, defender_id) =
            (request.scene_id, request.attacker_id, request.defender_id);
        let handle = self.manager.create_scene(request.into())?;

        match tokio::time::timeout(self.request_timeout, handle.result()).await {
            Ok(result) => {
                info!(
                    outcome = ?result.outcome,
                    attacker_win = result.attacker_win,
                    ticks = result.ticks,
                    "combat finished"
                );
                Ok(CombatReply {
                    scene_id,
                    attacker_id,
                    defender_id,
                    result: SceneResult::clone(&result),
                })
            }
            Err(_) => {
                handle.cancel();
                let timeout_ms = u64::try_from(self.request_timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(timeout_ms, "combat timed out, scene cancelled");
                Err(ServiceError::Timeout {
                    scene: handle.id(),
                    timeout_ms,
                })
            }
        }
    }

    /// Rejects new battles and waits for running ones to be cancelled.
    pub async fn shutdown(&self) {
        self.manager.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use skirmish_core::{SceneError, SceneOutcome};

    use super::*;

    const DEMO_CONTENT: &str = include_str!("../../../demos/content.json");
    const DEMO_BATTLE: &str = include_str!("../../../demos/battle.json");

    fn content() -> Arc<ContentTables> {
        let file: ContentFile = serde_json::from_str(DEMO_CONTENT).unwrap();
        Arc::new(ContentTables::from_file(file).unwrap())
    }

    fn battle(scene_id: u64) -> StartCombat {
        let mut request: StartCombat = serde_json::from_str(DEMO_BATTLE).unwrap();
        request.scene_id = scene_id;
        request
    }

    fn service(config: &ServiceConfig) -> CombatService {
        CombatService::new(config, content()).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn demo_battle_completes() {
        let service = service(&ServiceConfig::default());
        let reply = service.start_combat(battle(1)).await.unwrap();
        assert_eq!(reply.scene_id, 1);
        assert_eq!(reply.attacker_id, reply.result.meta.attacker_id);
        assert!(matches!(
            reply.result.outcome,
            SceneOutcome::Victory(_) | SceneOutcome::TimedOut
        ));
        assert!(!reply.result.events.is_empty());
        assert_eq!(service.manager().live_scenes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn seeded_requests_replay() {
        let service = service(&ServiceConfig::default());
        let mut first = battle(1);
        first.seed = Some(99);
        let mut second = battle(2);
        second.seed = Some(99);

        let a = service.start_combat(first).await.unwrap().result;
        let b = service.start_combat(second).await.unwrap().result;
        assert_eq!(a.outcome, b.outcome);
        assert_eq!(a.events, b.events);
        assert_eq!(a.units, b.units);
    }

    #[tokio::test(start_paused = true)]
    async fn creation_errors_return_at_once() {
        let service = service(&ServiceConfig::default());
        let mut request = battle(1);
        request.scene_type = 42;
        let err = service.start_combat(request).await.unwrap_err();
        assert!(matches!(err, ServiceError::Scene(SceneError::UnknownSceneType(42))));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_cancels_the_scene() {
        let config = ServiceConfig {
            request_timeout_ms: 1000,
            ..ServiceConfig::default()
        };
        let service = service(&config);
        let err = service.start_combat(battle(3)).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Timeout { timeout_ms: 1000, .. }
        ));

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(service.manager().live_scenes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_rejects_new_battles() {
        let service = service(&ServiceConfig::default());
        service.shutdown().await;
        let err = service.start_combat(battle(1)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Scene(SceneError::ShuttingDown)));
    }

    #[test]
    fn from_config_requires_content() {
        let err = CombatService::from_config(&ServiceConfig::default()).unwrap_err();
        assert!(matches!(err, ServiceError::MissingContent));
    }

    #[test]
    fn load_content_reads_demo_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DEMO_CONTENT.as_bytes()).unwrap();
        let tables = load_content(file.path(), &SpellRegistry::standard()).unwrap();
        assert!(tables.spells().count() >= 5);
    }

    #[test]
    fn load_content_rejects_dangling_references() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"units": [{{"id": 1, "tag": "creature", "normal_attack": 404}}]}}"#
        )
        .unwrap();
        let err = load_content(file.path(), &SpellRegistry::standard()).unwrap_err();
        assert!(matches!(err, ServiceError::Content(_)));
    }
}
