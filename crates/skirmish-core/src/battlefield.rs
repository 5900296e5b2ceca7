//! Battlefield: the unit registry of one scene.
//!
//! The battlefield owns every unit of a scene. It provides:
//! - Unit storage with deterministic iteration order (`BTreeMap`)
//! - Camp-aware queries used by target selection
//! - Id allocation in roster order
//!
//! # Architecture
//!
//! Units are stored in a `BTreeMap` keyed by [`UnitId`], so every walk over
//! the registry (unit updates, `AllEnemies` selections, nearest-unit ties)
//! happens in ascending id order. Combined with the per-scene RNG this makes
//! a scene replay exactly from its seed.
//!
//! Units are never removed: death is a state on the unit. Membership is
//! fixed once the scene is populated.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use skirmish_core::battlefield::Battlefield;
//! use skirmish_core::scene::SceneId;
//! use skirmish_core::unit::{Camp, UnitEntry, UnitSnapshot, UnitTag};
//! use skirmish_core::unit::attributes::{AttributeKind, Attributes};
//!
//! let mut field = Battlefield::new(SceneId::new(1), 8);
//! let entry = Arc::new(UnitEntry::new(1, UnitTag::Creature, 100));
//! let snapshot = UnitSnapshot::new(1, Attributes::new().with(AttributeKind::MaxHp, 50));
//!
//! let id = field.spawn(Camp::Defender, entry, &snapshot).unwrap();
//! assert_eq!(field.alive_count(Camp::Defender), 1);
//! assert_eq!(field.get(id).map(|unit| unit.hp()), Some(50));
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use glam::Vec2;

use crate::error::{EngineError, SceneError};
use crate::scene::SceneId;
use crate::unit::{Camp, Unit, UnitEntry, UnitId, UnitSnapshot};

/// Unit registry of one scene.
#[derive(Debug, Clone)]
pub struct Battlefield {
    scene: SceneId,
    units: BTreeMap<UnitId, Unit>,
    limit: usize,
    next_id: u32,
}

impl Battlefield {
    /// Creates an empty battlefield holding at most `limit` units.
    #[must_use]
    pub fn new(scene: SceneId, limit: usize) -> Self {
        Self {
            scene,
            units: BTreeMap::new(),
            limit,
            next_id: 0,
        }
    }

    // =========================================================================
    // Population
    // =========================================================================

    /// Adds a unit built from `entry` and `snapshot`, returning its new id.
    ///
    /// Ids are handed out in spawn order, starting at 0.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::TooManyUnits`] once the limit is reached.
    pub fn spawn(
        &mut self,
        camp: Camp,
        entry: Arc<UnitEntry>,
        snapshot: &UnitSnapshot,
    ) -> Result<UnitId, SceneError> {
        if self.units.len() >= self.limit {
            return Err(SceneError::TooManyUnits {
                count: self.units.len() + 1,
                limit: self.limit,
            });
        }
        let id = UnitId::new(self.next_id);
        self.next_id += 1;
        self.units
            .insert(id, Unit::new(id, camp, self.scene, entry, snapshot));
        Ok(id)
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Returns a unit by id.
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    /// Returns a unit by id, mutably.
    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    /// Returns a unit that must exist.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnitMissing`] when the id is not registered.
    pub fn require(&self, id: UnitId) -> Result<&Unit, EngineError> {
        self.units.get(&id).ok_or(EngineError::UnitMissing(id))
    }

    /// Mutable variant of [`require`](Self::require).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnitMissing`] when the id is not registered.
    pub fn require_mut(&mut self, id: UnitId) -> Result<&mut Unit, EngineError> {
        self.units.get_mut(&id).ok_or(EngineError::UnitMissing(id))
    }

    /// Returns `true` when the id is registered.
    #[must_use]
    pub fn contains(&self, id: UnitId) -> bool {
        self.units.contains_key(&id)
    }

    /// All unit ids in ascending order.
    #[must_use]
    pub fn ids(&self) -> Vec<UnitId> {
        self.units.keys().copied().collect()
    }

    /// All units in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    /// All units in ascending id order, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Unit> {
        self.units.values_mut()
    }

    /// Units of one camp in ascending id order.
    pub fn camp(&self, camp: Camp) -> impl Iterator<Item = &Unit> {
        self.units.values().filter(move |unit| unit.camp() == camp)
    }

    /// Number of living units in a camp.
    #[must_use]
    pub fn alive_count(&self, camp: Camp) -> usize {
        self.camp(camp).filter(|unit| unit.is_alive()).count()
    }

    /// Closest unit to `origin` among `candidates`; ties go to the lower id.
    pub fn nearest<'a>(
        origin: Vec2,
        candidates: impl Iterator<Item = &'a Unit>,
    ) -> Option<&'a Unit> {
        candidates.min_by(|a, b| {
            let da = a.position().distance_squared(origin);
            let db = b.position().distance_squared(origin);
            da.total_cmp(&db).then(a.id().cmp(&b.id()))
        })
    }

    /// Number of registered units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns `true` when no unit is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Owning scene.
    #[must_use]
    pub const fn scene(&self) -> SceneId {
        self.scene
    }
}
