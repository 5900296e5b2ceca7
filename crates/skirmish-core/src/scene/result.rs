//! Scene results.

use serde::{Deserialize, Serialize};

use crate::combat_log::LoggedEvent;
use crate::unit::{Camp, Unit, UnitId, UnitStats};

use super::{SceneId, SceneType};

/// How a scene ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SceneOutcome {
    /// The elimination objective was met by this camp.
    Victory(Camp),
    /// The duration limit was reached.
    TimedOut,
    /// The scene was cancelled.
    Cancelled,
    /// The scene stopped on an engine error or a task failure.
    Errored(String),
}

/// Identity of a scene, carried on its handle and result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneMeta {
    /// Scene id.
    pub scene_id: SceneId,
    /// Scene type.
    pub scene_type: SceneType,
    /// Attacking roster owner.
    pub attacker_id: u64,
    /// Defending roster owner.
    pub defender_id: u64,
    /// RNG seed the scene ran with.
    pub seed: u64,
}

/// Final state of one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSummary {
    /// Unit id.
    pub id: UnitId,
    /// Unit type id.
    pub type_id: u32,
    /// Camp.
    pub camp: Camp,
    /// Hit points left.
    pub hp: i64,
    /// Whether the unit survived.
    pub alive: bool,
    /// Battle statistics.
    pub stats: UnitStats,
}

impl UnitSummary {
    /// Summarizes a unit.
    #[must_use]
    pub fn of(unit: &Unit) -> Self {
        Self {
            id: unit.id(),
            type_id: unit.type_id(),
            camp: unit.camp(),
            hp: unit.hp(),
            alive: unit.is_alive(),
            stats: *unit.stats(),
        }
    }
}

/// Published once per scene and shared by every waiter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneResult {
    /// Scene identity.
    #[serde(flatten)]
    pub meta: SceneMeta,
    /// How the scene ended.
    pub outcome: SceneOutcome,
    /// `true` only for an attacker victory.
    pub attacker_win: bool,
    /// Simulated battle time.
    pub elapsed_ms: u64,
    /// Ticks run.
    pub ticks: u64,
    /// Final state of every unit.
    pub units: Vec<UnitSummary>,
    /// Combat log.
    pub events: Vec<LoggedEvent>,
}

impl SceneResult {
    /// Result of a scene whose task failed before producing one.
    #[must_use]
    pub fn errored(meta: SceneMeta, reason: impl Into<String>) -> Self {
        Self {
            meta,
            outcome: SceneOutcome::Errored(reason.into()),
            attacker_win: false,
            elapsed_ms: 0,
            ticks: 0,
            units: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Total damage dealt by one camp.
    #[must_use]
    pub fn damage_dealt(&self, camp: Camp) -> i64 {
        self.units
            .iter()
            .filter(|unit| unit.camp == camp)
            .map(|unit| unit.stats.damage_dealt)
            .sum()
    }
}
