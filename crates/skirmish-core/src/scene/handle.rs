//! Shared handle to a live or finished scene.
//!
//! A [`SceneHandle`] is what the manager's index stores and what callers get
//! back from `create_scene`. It carries:
//! - the scene's identity and lifecycle [`SceneState`]
//! - the write-once result slot (a `watch` channel holding
//!   `Option<Arc<SceneResult>>`)
//! - the cancellation switch read by the tick loop
//!
//! Cloning is cheap; every clone observes the same scene.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use super::result::{SceneMeta, SceneOutcome, SceneResult};
use super::SceneId;

/// Lifecycle state of a scene. Terminal states never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SceneState {
    /// Registered, tick loop not started.
    Created = 0,
    /// Tick loop running.
    Running = 1,
    /// Ended by its objective or duration limit.
    Completed = 2,
    /// Ended by cancellation.
    Cancelled = 3,
    /// Ended by an engine error or task failure.
    Errored = 4,
}

impl SceneState {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Created,
            1 => Self::Running,
            2 => Self::Completed,
            3 => Self::Cancelled,
            _ => Self::Errored,
        }
    }

    /// Returns `true` for `Completed`, `Cancelled` and `Errored`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Errored)
    }

    /// Terminal state matching an outcome.
    #[must_use]
    pub const fn of(outcome: &SceneOutcome) -> Self {
        match outcome {
            SceneOutcome::Victory(_) | SceneOutcome::TimedOut => Self::Completed,
            SceneOutcome::Cancelled => Self::Cancelled,
            SceneOutcome::Errored(_) => Self::Errored,
        }
    }
}

#[derive(Debug)]
struct Inner {
    meta: SceneMeta,
    state: AtomicU8,
    result: watch::Sender<Option<Arc<SceneResult>>>,
    cancel: watch::Sender<bool>,
}

/// Cheaply clonable reference to one scene.
#[derive(Debug, Clone)]
pub struct SceneHandle {
    inner: Arc<Inner>,
}

impl SceneHandle {
    /// Creates a handle in the `Created` state, returning the receiver the
    /// tick loop watches for cancellation.
    #[must_use]
    pub fn new(meta: SceneMeta) -> (Self, watch::Receiver<bool>) {
        let (result, _) = watch::channel(None);
        let (cancel, cancel_rx) = watch::channel(false);
        let handle = Self {
            inner: Arc::new(Inner {
                meta,
                state: AtomicU8::new(SceneState::Created as u8),
                result,
                cancel,
            }),
        };
        (handle, cancel_rx)
    }

    /// Scene id.
    #[must_use]
    pub fn id(&self) -> SceneId {
        self.inner.meta.scene_id
    }

    /// Scene identity.
    #[must_use]
    pub fn meta(&self) -> SceneMeta {
        self.inner.meta
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SceneState {
        SceneState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    /// Moves `Created` to `Running`; no effect in any other state.
    pub(crate) fn mark_running(&self) {
        let _ = self.inner.state.compare_exchange(
            SceneState::Created as u8,
            SceneState::Running as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Asks the tick loop to stop. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancel.send_if_modified(|cancelled| {
            if *cancelled {
                false
            } else {
                *cancelled = true;
                true
            }
        });
    }

    /// Returns `true` once cancellation was requested.
    #[must_use]
    pub fn is_cancel_requested(&self) -> bool {
        *self.inner.cancel.borrow()
    }

    /// The result, if already published.
    #[must_use]
    pub fn try_result(&self) -> Option<Arc<SceneResult>> {
        self.inner.result.borrow().clone()
    }

    /// Waits for the result. Safe to call before the scene starts and after
    /// it finished; every call returns the same `Arc`.
    pub async fn result(&self) -> Arc<SceneResult> {
        let mut rx = self.inner.result.subscribe();
        loop {
            if let Some(result) = rx.borrow_and_update().clone() {
                return result;
            }
            if rx.changed().await.is_err() {
                return Arc::new(SceneResult::errored(self.meta(), "result channel closed"));
            }
        }
    }

    /// Stores the result if none was stored yet and moves the state to the
    /// matching terminal state. Returns `false` when a result already exists.
    pub(crate) fn publish(&self, result: SceneResult) -> bool {
        let state = SceneState::of(&result.outcome);
        let published = self.inner.result.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(Arc::new(result));
            true
        });
        if published {
            self.inner.state.store(state as u8, Ordering::Release);
        }
        published
    }
}
