//! Combat log: the ordered record of what happened in a scene.
//!
//! Resolution code pushes a [`CombatEvent`] for every cast, hit, aura change
//! and death. The scene stamps each event with its battle clock and hands the
//! list back with the [`SceneResult`](crate::scene::SceneResult), so a caller
//! can replay or render the fight.
//!
//! Logging can be switched off per scene (`log_events = false`); pushes are
//! then dropped.
//!
//! # Example
//!
//! ```
//! use skirmish_core::combat_log::{CombatEvent, CombatLog};
//! use skirmish_core::unit::UnitId;
//!
//! let mut log = CombatLog::new(true);
//! log.set_time(400);
//! log.push(CombatEvent::Death { unit: UnitId::new(3), killer: UnitId::new(0) });
//!
//! assert_eq!(log.len(), 1);
//! assert_eq!(log.events()[0].at_ms, 400);
//! ```

use serde::{Deserialize, Serialize};

use crate::aura::{AuraAddResult, RemoveMode};
use crate::spell::damage::{DamageInfo, HitFlags};
use crate::spell::CastMode;
use crate::unit::UnitId;

/// Something that happened during resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CombatEvent {
    /// A spell resolved its outcome roll.
    Cast {
        /// Casting unit.
        caster: UnitId,
        /// Spell id.
        spell: u32,
        /// How the cast was started.
        mode: CastMode,
        /// Targets with their outcome flags.
        targets: Vec<(UnitId, HitFlags)>,
    },
    /// Damage, heal or energy change applied to a unit.
    Hit(DamageInfo),
    /// An aura was offered to a unit.
    AuraApplied {
        /// Unit receiving the aura.
        owner: UnitId,
        /// Unit that applied it.
        caster: UnitId,
        /// Aura id.
        aura: u32,
        /// Stacking outcome.
        result: AuraAddResult,
    },
    /// An aura left a unit.
    AuraRemoved {
        /// Unit that held the aura.
        owner: UnitId,
        /// Aura id.
        aura: u32,
        /// Why it was removed.
        mode: RemoveMode,
    },
    /// A unit died.
    Death {
        /// Dead unit.
        unit: UnitId,
        /// Unit credited with the kill.
        killer: UnitId,
    },
}

/// A [`CombatEvent`] stamped with the battle clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedEvent {
    /// Battle time in milliseconds.
    pub at_ms: u64,
    /// The event.
    #[serde(flatten)]
    pub event: CombatEvent,
}

/// Append-only event list of one scene.
#[derive(Debug, Clone, Default)]
pub struct CombatLog {
    enabled: bool,
    now_ms: u64,
    events: Vec<LoggedEvent>,
}

impl CombatLog {
    /// Creates a log; a disabled log drops every push.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            now_ms: 0,
            events: Vec::new(),
        }
    }

    /// Sets the timestamp given to subsequent events.
    pub fn set_time(&mut self, now_ms: u64) {
        self.now_ms = now_ms;
    }

    /// Records an event at the current time.
    pub fn push(&mut self, event: CombatEvent) {
        if self.enabled {
            self.events.push(LoggedEvent {
                at_ms: self.now_ms,
                event,
            });
        }
    }

    /// Events recorded so far.
    #[must_use]
    pub fn events(&self) -> &[LoggedEvent] {
        &self.events
    }

    /// Drains the recorded events.
    pub fn take(&mut self) -> Vec<LoggedEvent> {
        std::mem::take(&mut self.events)
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` when nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
