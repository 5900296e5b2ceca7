//! Scene manager: creates, indexes, bounds and supervises every live scene
//! of a process.
//!
//! # Architecture
//!
//! - The index is a `RwLock<HashMap<SceneId, SceneHandle>>`; the lock is
//!   never held across an await.
//! - Each scene runs as its own tokio task, awaited by a supervisor task.
//!   The supervisor turns panics into `Errored` results, removes the scene
//!   from the index and then publishes the result.
//! - Every supervisor holds a clone of the drain sender. [`SceneManager::shutdown`]
//!   drops the manager's own sender and waits for the channel to close.
//!
//! # Example
//!
//! ```rust,ignore
//! let manager = SceneManager::new(EngineConfig::default(), Arc::new(content), Arc::new(SpellRegistry::standard()));
//! let handle = manager.create_scene(request)?;
//! let result = handle.result().await;
//! manager.shutdown().await;
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::sync::{mpsc, watch};
use tracing::{info, info_span, warn, Instrument};

use crate::config::EngineConfig;
use crate::content::ContentTables;
use crate::error::{EngineError, SceneError};
use crate::spell::SpellRegistry;

use super::handle::SceneHandle;
use super::result::{SceneOutcome, SceneResult};
use super::{Scene, SceneId, SceneRequest};

struct ManagerInner {
    config: EngineConfig,
    content: Arc<ContentTables>,
    registry: Arc<SpellRegistry>,
    scenes: RwLock<HashMap<SceneId, SceneHandle>>,
    shutting_down: AtomicBool,
    drain_tx: Mutex<Option<mpsc::Sender<()>>>,
    drain_rx: tokio::sync::Mutex<mpsc::Receiver<()>>,
}

impl ManagerInner {
    fn remove(&self, id: SceneId) {
        self.scenes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }
}

/// Process-wide registry of running scenes.
#[derive(Clone)]
pub struct SceneManager {
    inner: Arc<ManagerInner>,
}

impl std::fmt::Debug for SceneManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneManager")
            .field("config", &self.inner.config)
            .field("live_scenes", &self.live_scenes())
            .finish_non_exhaustive()
    }
}

impl SceneManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new(config: EngineConfig, content: Arc<ContentTables>, registry: Arc<SpellRegistry>) -> Self {
        let (drain_tx, drain_rx) = mpsc::channel(1);
        Self {
            inner: Arc::new(ManagerInner {
                config,
                content,
                registry,
                scenes: RwLock::new(HashMap::new()),
                shutting_down: AtomicBool::new(false),
                drain_tx: Mutex::new(Some(drain_tx)),
                drain_rx: tokio::sync::Mutex::new(drain_rx),
            }),
        }
    }

    /// Engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Validates the request, registers the scene and spawns its tick loop.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns the [`SceneError`] of the first failed check. Nothing is
    /// registered or spawned on failure.
    pub fn create_scene(&self, request: SceneRequest) -> Result<SceneHandle, SceneError> {
        let inner = &self.inner;
        let scene = Scene::new(
            request,
            &inner.config,
            Arc::clone(&inner.content),
            Arc::clone(&inner.registry),
        )?;
        let meta = scene.meta();

        let drain = inner
            .drain_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(SceneError::ShuttingDown)?;

        let (handle, cancel) = {
            let mut scenes = inner.scenes.write().unwrap_or_else(PoisonError::into_inner);
            if inner.shutting_down.load(Ordering::Acquire) {
                return Err(SceneError::ShuttingDown);
            }
            if scenes.contains_key(&meta.scene_id) {
                return Err(SceneError::DuplicateScene(meta.scene_id));
            }
            if scenes.len() >= inner.config.max_scenes {
                return Err(SceneError::SceneCapacityExceeded {
                    limit: inner.config.max_scenes,
                });
            }
            let (handle, cancel) = SceneHandle::new(meta);
            scenes.insert(meta.scene_id, handle.clone());
            (handle, cancel)
        };

        let span = info_span!("scene", id = %meta.scene_id, kind = %meta.scene_type);
        tokio::spawn(
            supervise(Arc::clone(inner), scene, handle.clone(), cancel, drain).instrument(span),
        );
        Ok(handle)
    }

    /// Looks a live scene up.
    #[must_use]
    pub fn get_scene(&self, id: SceneId) -> Option<SceneHandle> {
        self.inner
            .scenes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    /// Number of live scenes.
    #[must_use]
    pub fn live_scenes(&self) -> usize {
        self.inner
            .scenes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` once [`shutdown`](Self::shutdown) was called.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.inner.shutting_down.load(Ordering::Acquire)
    }

    /// Rejects new scenes, cancels every running one and waits until all
    /// scene tasks have finished.
    pub async fn shutdown(&self) {
        let inner = &self.inner;
        drop(
            inner
                .drain_tx
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        );
        let live: Vec<SceneHandle> = {
            let scenes = inner.scenes.write().unwrap_or_else(PoisonError::into_inner);
            inner.shutting_down.store(true, Ordering::Release);
            scenes.values().cloned().collect()
        };
        info!(live = live.len(), "scene manager draining");
        for handle in &live {
            handle.cancel();
        }

        let mut drained = inner.drain_rx.lock().await;
        while drained.recv().await.is_some() {}
        info!("scene manager drained");
    }
}

async fn supervise(
    inner: Arc<ManagerInner>,
    scene: Scene,
    handle: SceneHandle,
    cancel: watch::Receiver<bool>,
    _drain: mpsc::Sender<()>,
) {
    let meta = handle.meta();
    handle.mark_running();

    let task = tokio::spawn(scene.run(cancel).in_current_span());
    let result = match task.await {
        Ok(result) => result,
        Err(err) => {
            let reason = EngineError::TaskAborted(err.to_string());
            warn!(error = %reason, "scene task failed");
            SceneResult::errored(meta, reason.to_string())
        }
    };
    if let SceneOutcome::Errored(reason) = &result.outcome {
        warn!(%reason, "scene ended with an error");
    }

    inner.remove(meta.scene_id);
    handle.publish(result);
}
