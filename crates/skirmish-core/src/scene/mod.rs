//! Scene module: one running battle.
//!
//! A [`Scene`] owns a [`Battlefield`], a seeded [`SceneRng`], a combat log
//! and the scene's end condition. Each tick updates every unit in ascending
//! id order; unit updates tick auras and cooldowns and cast spells through
//! the spell pipeline.
//!
//! # Architecture
//!
//! ```text
//! SceneManager ──create──▶ Scene::new (validate, populate, passives)
//!      │                        │
//!      └─spawn supervisor──▶ Scene::run ──tick──▶ Scene::step ──▶ update_unit × N
//!                               │
//!                 cancel / watchdog / objective
//!                               ▼
//!                         SceneResult ──publish──▶ SceneHandle
//! ```
//!
//! [`Scene::step`] is fully synchronous: the async [`Scene::run`] loop only
//! adds pacing, the watchdog and cancellation around it. Tests drive scenes
//! with `step` or [`Scene::run_to_end`] and never need a runtime.
//!
//! # Example
//!
//! ```rust,ignore
//! let scene = Scene::new(request, &config, content, registry)?;
//! let result = scene.run_to_end();
//! println!("attacker won: {}", result.attacker_win);
//! ```

pub mod end_condition;
pub mod handle;
pub mod manager;
pub mod result;
pub mod update;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::aura;
use crate::battlefield::Battlefield;
use crate::combat_log::CombatLog;
use crate::config::{EngineConfig, SeedPolicy};
use crate::content::ContentTables;
use crate::error::{EngineError, SceneError};
use crate::rng::SceneRng;
use crate::spell::{CastContext, SceneModifiers, SpellRegistry};
use crate::unit::{Camp, UnitSnapshot};

pub use end_condition::EndCondition;
pub use handle::{SceneHandle, SceneState};
pub use manager::SceneManager;
pub use result::{SceneMeta, SceneOutcome, SceneResult, UnitSummary};

// =============================================================================
// Identity
// =============================================================================

/// Unique identifier of a scene within a process.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneId(u64);

impl SceneId {
    /// Wraps a raw id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of battle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum SceneType {
    /// PvE stage.
    Stage = 1,
    /// PvP arena; hero-versus-hero damage gets the PvP bonus.
    Arena = 2,
    /// Boss fight.
    Boss = 3,
}

impl SceneType {
    /// Returns `true` for player-versus-player scenes.
    #[must_use]
    pub const fn is_pvp(self) -> bool {
        matches!(self, Self::Arena)
    }
}

impl TryFrom<u8> for SceneType {
    type Error = SceneError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            1 => Ok(Self::Stage),
            2 => Ok(Self::Arena),
            3 => Ok(Self::Boss),
            other => Err(SceneError::UnknownSceneType(other)),
        }
    }
}

impl fmt::Display for SceneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stage => "stage",
            Self::Arena => "arena",
            Self::Boss => "boss",
        };
        f.write_str(name)
    }
}

fn default_eliminate() -> bool {
    true
}

/// Per scene-type settings from the content tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneEntry {
    /// Scene type these settings apply to.
    pub scene_type: SceneType,
    /// Battle duration limit; the engine default applies when unset.
    #[serde(default)]
    pub max_battle_ms: Option<u64>,
    /// End the battle as soon as one camp has no living unit.
    #[serde(default = "default_eliminate")]
    pub eliminate: bool,
    /// Added to every damage percentage in the scene.
    #[serde(default)]
    pub damage_pct: i32,
    /// Added to every heal percentage in the scene.
    #[serde(default)]
    pub heal_pct: i32,
}

impl SceneEntry {
    /// Default settings for a scene type.
    #[must_use]
    pub fn new(scene_type: SceneType) -> Self {
        Self {
            scene_type,
            max_battle_ms: None,
            eliminate: default_eliminate(),
            damage_pct: 0,
            heal_pct: 0,
        }
    }
}

/// Everything needed to start a battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneRequest {
    /// Scene id, unique among live scenes.
    pub id: SceneId,
    /// Raw scene type, validated on creation.
    pub scene_type: u8,
    /// Opaque id of the attacking roster's owner.
    pub attacker_id: u64,
    /// Opaque id of the defending roster's owner.
    pub defender_id: u64,
    /// Attacking roster, in spawn order.
    pub attackers: Vec<UnitSnapshot>,
    /// Defending roster, in spawn order.
    pub defenders: Vec<UnitSnapshot>,
    /// RNG seed; chosen by the engine's seed policy when unset.
    #[serde(default)]
    pub seed: Option<u64>,
}

// =============================================================================
// Scene
// =============================================================================

/// One battle instance.
pub struct Scene {
    meta: SceneMeta,
    field: Battlefield,
    rng: SceneRng,
    content: Arc<ContentTables>,
    registry: Arc<SpellRegistry>,
    modifiers: SceneModifiers,
    log: CombatLog,
    end: EndCondition,
    tick_period_ms: u64,
    elapsed_ms: u64,
    ticks: u64,
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("meta", &self.meta)
            .field("units", &self.field.len())
            .field("elapsed_ms", &self.elapsed_ms)
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}

impl Scene {
    /// Validates a request and builds the populated scene.
    ///
    /// Units spawn attackers first, each roster in order, so ids follow the
    /// roster layout. Passive auras of every unit are applied before the
    /// first tick.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError`] for an unknown scene type, a scene type with no
    /// content entry, an oversized roster or an unknown unit type.
    pub fn new(
        request: SceneRequest,
        config: &EngineConfig,
        content: Arc<ContentTables>,
        registry: Arc<SpellRegistry>,
    ) -> Result<Self, SceneError> {
        let scene_type = SceneType::try_from(request.scene_type)?;
        let entry = content
            .scene(scene_type)
            .ok_or(SceneError::InvalidSceneEntry(scene_type))?;

        let count = request.attackers.len() + request.defenders.len();
        let limit = config.max_units_per_scene;
        if count > limit {
            return Err(SceneError::TooManyUnits { count, limit });
        }

        let mut field = Battlefield::new(request.id, limit);
        let rosters = request
            .attackers
            .iter()
            .map(|snapshot| (Camp::Attacker, snapshot))
            .chain(request.defenders.iter().map(|snapshot| (Camp::Defender, snapshot)));
        for (camp, snapshot) in rosters {
            let unit_entry = content
                .unit(snapshot.unit_type_id)
                .cloned()
                .ok_or(SceneError::UnknownUnitEntry(snapshot.unit_type_id))?;
            field.spawn(camp, unit_entry, snapshot)?;
        }

        let seed = request.seed.unwrap_or_else(|| match config.seed_policy {
            SeedPolicy::SceneId => request.id.as_u64(),
            SeedPolicy::Random => rand::random(),
        });
        let modifiers = SceneModifiers {
            pvp: scene_type.is_pvp(),
            damage_pct: entry.damage_pct,
            heal_pct: entry.heal_pct,
        };
        let end = EndCondition::from_entry(entry, config.max_battle_ms);

        let mut scene = Self {
            meta: SceneMeta {
                scene_id: request.id,
                scene_type,
                attacker_id: request.attacker_id,
                defender_id: request.defender_id,
                seed,
            },
            field,
            rng: SceneRng::new(seed),
            content,
            registry,
            modifiers,
            log: CombatLog::new(config.log_events),
            end,
            tick_period_ms: config.tick_period_ms,
            elapsed_ms: 0,
            ticks: 0,
        };
        scene.apply_passives();
        debug!(scene = %scene.meta.scene_id, units = count, seed, "scene created");
        Ok(scene)
    }

    fn ctx(&mut self) -> CastContext<'_> {
        CastContext::new(
            &mut self.field,
            &mut self.rng,
            &self.content,
            &self.registry,
            self.modifiers,
            &mut self.log,
        )
    }

    fn apply_passives(&mut self) {
        let passives: Vec<_> = self
            .field
            .iter()
            .map(|unit| (unit.id(), unit.entry().passive_auras.clone()))
            .collect();
        let mut ctx = self.ctx();
        for (unit, auras) in passives {
            for aura in auras {
                if let Err(err) = aura::apply_aura(&mut ctx, unit, unit, aura) {
                    warn!(%unit, aura, %err, "passive aura not applied");
                }
            }
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Identity of the scene.
    #[must_use]
    pub const fn meta(&self) -> SceneMeta {
        self.meta
    }

    /// Scene id.
    #[must_use]
    pub const fn id(&self) -> SceneId {
        self.meta.scene_id
    }

    /// The scene's units.
    #[must_use]
    pub const fn field(&self) -> &Battlefield {
        &self.field
    }

    /// Simulated battle time in milliseconds.
    #[must_use]
    pub const fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Ticks run so far.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Combat log recorded so far.
    #[must_use]
    pub const fn log(&self) -> &CombatLog {
        &self.log
    }

    // =========================================================================
    // Tick loop
    // =========================================================================

    /// Runs one tick: every unit updates once, in ascending id order.
    ///
    /// Returns the outcome when the elimination objective is met.
    ///
    /// # Errors
    ///
    /// Returns the [`EngineError`] that ends the scene as `Errored`.
    pub fn step(&mut self) -> Result<Option<SceneOutcome>, EngineError> {
        let dt_ms = u32::try_from(self.tick_period_ms).unwrap_or(u32::MAX);
        self.log.set_time(self.elapsed_ms);

        let ids = self.field.ids();
        let mut ctx = self.ctx();
        for id in ids {
            update::update_unit(&mut ctx, id, dt_ms)?;
        }

        self.ticks += 1;
        self.elapsed_ms += self.tick_period_ms;
        Ok(self.end.check(&self.field).map(SceneOutcome::Victory))
    }

    /// Steps the scene to completion without pacing, using simulated time
    /// for the duration limit.
    #[must_use]
    pub fn run_to_end(mut self) -> SceneResult {
        let limit_ms = self.end.max_battle_ms();
        loop {
            match self.step() {
                Ok(Some(outcome)) => return self.finish(outcome),
                Ok(None) if self.elapsed_ms >= limit_ms => {
                    return self.finish(SceneOutcome::TimedOut);
                }
                Ok(None) => {}
                Err(err) => return self.finish(SceneOutcome::Errored(err.to_string())),
            }
        }
    }

    /// Runs the paced tick loop until the objective is met, the watchdog
    /// fires, or `cancel` turns `true`.
    ///
    /// Each iteration checks cancellation, steps, then sleeps for what is
    /// left of the tick period. The watchdog and cancellation race the sleep.
    /// A dropped cancel sender counts as cancellation.
    pub async fn run(mut self, mut cancel: watch::Receiver<bool>) -> SceneResult {
        let period = Duration::from_millis(self.tick_period_ms);
        let watchdog = tokio::time::sleep(self.end.max_duration());
        tokio::pin!(watchdog);

        loop {
            if *cancel.borrow_and_update() {
                return self.finish(SceneOutcome::Cancelled);
            }
            let started = tokio::time::Instant::now();
            match self.step() {
                Ok(Some(outcome)) => return self.finish(outcome),
                Ok(None) => {}
                Err(err) => return self.finish(SceneOutcome::Errored(err.to_string())),
            }
            let pause = period.saturating_sub(started.elapsed());

            tokio::select! {
                biased;
                changed = cancel.changed() => {
                    if changed.is_err() {
                        return self.finish(SceneOutcome::Cancelled);
                    }
                }
                () = &mut watchdog => return self.finish(SceneOutcome::TimedOut),
                () = tokio::time::sleep(pause) => {}
            }
        }
    }

    /// Consumes the scene into its result.
    #[must_use]
    pub fn finish(mut self, outcome: SceneOutcome) -> SceneResult {
        let attacker_win = matches!(outcome, SceneOutcome::Victory(Camp::Attacker));
        info!(
            scene = %self.meta.scene_id,
            kind = %self.meta.scene_type,
            ?outcome,
            ticks = self.ticks,
            elapsed_ms = self.elapsed_ms,
            "scene finished"
        );
        SceneResult {
            meta: self.meta,
            outcome,
            attacker_win,
            elapsed_ms: self.elapsed_ms,
            ticks: self.ticks,
            units: self.field.iter().map(UnitSummary::of).collect(),
            events: self.log.take(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::helpers::{duel_request, standard_content, GRUNT};
    use crate::unit::{AttributeKind, Attributes};

    fn config() -> EngineConfig {
        EngineConfig::default()
    }

    fn build(request: SceneRequest) -> Result<Scene, SceneError> {
        Scene::new(
            request,
            &config(),
            Arc::new(standard_content()),
            Arc::new(SpellRegistry::standard()),
        )
    }

    mod creation_tests {
        use super::*;

        #[test]
        fn scene_type_range() {
            assert_eq!(SceneType::try_from(1), Ok(SceneType::Stage));
            assert_eq!(SceneType::try_from(3), Ok(SceneType::Boss));
            assert_eq!(SceneType::try_from(0), Err(SceneError::UnknownSceneType(0)));
            assert_eq!(SceneType::try_from(4), Err(SceneError::UnknownSceneType(4)));
            assert!(SceneType::Arena.is_pvp());
            assert!(!SceneType::Stage.is_pvp());
        }

        #[test]
        fn unknown_scene_type_is_rejected() {
            let mut request = duel_request(1);
            request.scene_type = 9;
            assert_eq!(build(request).unwrap_err(), SceneError::UnknownSceneType(9));
        }

        #[test]
        fn missing_scene_entry_is_rejected() {
            let full = standard_content();
            let mut content = ContentTables::new();
            for spell in full.spells() {
                content.insert_spell(spell.clone());
            }
            if let Some(unit) = full.unit(GRUNT) {
                content.insert_unit((**unit).clone());
            }
            let err = Scene::new(
                duel_request(1),
                &config(),
                Arc::new(content),
                Arc::new(SpellRegistry::standard()),
            )
            .unwrap_err();
            assert_eq!(err, SceneError::InvalidSceneEntry(SceneType::Stage));
        }

        #[test]
        fn unknown_unit_type_is_rejected() {
            let mut request = duel_request(1);
            request.defenders[0].unit_type_id = 404;
            assert_eq!(build(request).unwrap_err(), SceneError::UnknownUnitEntry(404));
        }

        #[test]
        fn oversized_roster_is_rejected() {
            let mut request = duel_request(1);
            let unit = request.attackers[0].clone();
            request.attackers = vec![unit; 41];
            assert_eq!(
                build(request).unwrap_err(),
                SceneError::TooManyUnits { count: 42, limit: 40 }
            );
        }

        #[test]
        fn attackers_spawn_first() {
            let scene = build(duel_request(1)).unwrap();
            let camps: Vec<_> = scene.field().iter().map(|u| u.camp()).collect();
            assert_eq!(camps, vec![Camp::Attacker, Camp::Defender]);
            assert_eq!(scene.meta().seed, 1);
        }
    }

    mod tick_tests {
        use super::*;

        #[test]
        fn step_advances_clock() {
            let mut scene = build(duel_request(1)).unwrap();
            assert_eq!(scene.step(), Ok(None));
            assert_eq!(scene.ticks(), 1);
            assert_eq!(scene.elapsed_ms(), 200);
            assert!(!scene.log().is_empty());
        }

        #[test]
        fn unkillable_duel_times_out() {
            let mut request = duel_request(1);
            let tank = Attributes::new().with(AttributeKind::MaxHp, 1_000_000_000);
            request.attackers[0].attributes = tank;
            request.defenders[0].attributes = tank;
            let result = build(request).unwrap().run_to_end();
            assert_eq!(result.outcome, SceneOutcome::TimedOut);
            assert!(!result.attacker_win);
            assert_eq!(result.elapsed_ms, 90_000);
            assert_eq!(result.ticks, 450);
        }

        #[test]
        fn stronger_attacker_wins() {
            let mut request = duel_request(1);
            request.attackers[0].attributes = Attributes::new()
                .with(AttributeKind::MaxHp, 100_000)
                .with(AttributeKind::Attack, 500)
                .with(AttributeKind::Hit, 20_000);
            let result = build(request).unwrap().run_to_end();
            assert_eq!(result.outcome, SceneOutcome::Victory(Camp::Attacker));
            assert!(result.attacker_win);
            assert!(result.units.iter().any(|u| !u.alive));
        }
    }
}
