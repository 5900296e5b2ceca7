//! Unit module: the combat participants of a scene.
//!
//! This module provides:
//! - [`UnitId`]: unique identifier within a scene
//! - [`UnitTag`] / [`UnitInner`]: the Hero and Creature variants
//! - [`Unit`]: the complete participant (identity, attribute lookup, update hook)
//! - [`UnitSnapshot`]: the frozen roster data a unit is built from
//!
//! # Architecture
//!
//! Heroes and creatures resolve combat identically. The variant only carries
//! presentation metadata, so a flat struct with a tagged inner enum covers
//! both without trait objects:
//! - `UnitTag` classifies the unit (PvP bonuses look at it)
//! - `UnitInner` stores the variant-specific metadata
//!
//! Attribute lookups combine the frozen base snapshot with every active aura
//! modifier, so removing an aura never needs to undo anything.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use skirmish_core::scene::SceneId;
//! use skirmish_core::unit::{Camp, Unit, UnitEntry, UnitId, UnitSnapshot, UnitTag};
//! use skirmish_core::unit::attributes::{AttributeKind, Attributes};
//!
//! let entry = Arc::new(UnitEntry::new(1, UnitTag::Creature, 100));
//! let snapshot = UnitSnapshot::new(1, Attributes::new().with(AttributeKind::MaxHp, 500));
//! let unit = Unit::new(UnitId::new(0), Camp::Attacker, SceneId::new(9), entry, &snapshot);
//!
//! assert_eq!(unit.hp(), 500);
//! assert!(unit.is_alive());
//! ```

pub mod attributes;
pub mod entry;
pub mod state;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::aura::AuraSlots;
use crate::scene::SceneId;

pub use attributes::{AttributeKind, Attributes, Race, RaceMask};
pub use entry::UnitEntry;
pub use state::{AuraState, Mechanic, UnitState};

/// Unique identifier for a unit within its scene.
///
/// Ids are assigned in roster order (attackers first) and define the unit
/// update order of every tick.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitId(u32);

impl UnitId {
    /// Creates a new `UnitId` from a raw value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw value of this identifier.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UnitId({})", self.0)
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for UnitId {
    fn from(id: u32) -> Self {
        Self::new(id)
    }
}

/// Which roster a unit fights for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Camp {
    /// The roster that started the battle.
    Attacker,
    /// The roster being attacked.
    Defender,
}

impl Camp {
    /// The other camp.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Attacker => Self::Defender,
            Self::Defender => Self::Attacker,
        }
    }
}

impl fmt::Display for Camp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attacker => write!(f, "Attacker"),
            Self::Defender => write!(f, "Defender"),
        }
    }
}

/// Unit variant tag.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitTag {
    /// Player-owned hero.
    Hero,
    /// Monster or summoned creature.
    Creature,
}

/// Hero metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeroInfo {
    /// Owning account.
    pub owner: u64,
    /// Star rank, presentation only.
    pub star: u8,
}

/// Creature metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatureInfo {
    /// Wave the creature belongs to, presentation only.
    pub wave: u8,
}

/// Variant-specific storage. Always matches the unit's [`UnitTag`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitInner {
    /// Hero metadata.
    Hero(HeroInfo),
    /// Creature metadata.
    Creature(CreatureInfo),
}

impl UnitInner {
    /// Returns the tag matching this variant.
    #[must_use]
    pub const fn tag(&self) -> UnitTag {
        match self {
            Self::Hero(_) => UnitTag::Hero,
            Self::Creature(_) => UnitTag::Creature,
        }
    }
}

fn default_level() -> u16 {
    1
}

/// Frozen roster data for one unit, captured by the caller before the battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    /// Unit type id in the content tables.
    pub unit_type_id: u32,
    /// Unit level.
    #[serde(default = "default_level")]
    pub level: u16,
    /// Battlefield position.
    #[serde(default)]
    pub position: Vec2,
    /// Attribute vector.
    #[serde(default)]
    pub attributes: Attributes,
    /// Owning account, heroes only.
    #[serde(default)]
    pub owner: u64,
    /// Hero star rank.
    #[serde(default)]
    pub star: u8,
    /// Creature wave.
    #[serde(default)]
    pub wave: u8,
}

impl UnitSnapshot {
    /// Level 1 snapshot at the origin.
    #[must_use]
    pub fn new(unit_type_id: u32, attributes: Attributes) -> Self {
        Self {
            unit_type_id,
            level: default_level(),
            position: Vec2::ZERO,
            attributes,
            owner: 0,
            star: 0,
            wave: 0,
        }
    }

    /// Builder-style level override.
    #[must_use]
    pub fn at_level(mut self, level: u16) -> Self {
        self.level = level;
        self
    }

    /// Builder-style position override.
    #[must_use]
    pub fn at_position(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }
}

/// Per-unit battle statistics reported with the scene result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStats {
    /// Damage this unit dealt.
    pub damage_dealt: i64,
    /// Damage this unit took.
    pub damage_taken: i64,
    /// Effective healing this unit did.
    pub healing_done: i64,
    /// Killing blows.
    pub kills: u32,
    /// Successful casts.
    pub casts: u32,
}

/// A combat participant.
///
/// # Invariants
///
/// - `hp` stays within `[0, max_hp]`
/// - `DEAD` is set exactly when `hp` reached 0 through damage
/// - the unit never leaves its scene's registry; death is a state
#[derive(Debug, Clone)]
pub struct Unit {
    id: UnitId,
    camp: Camp,
    scene: SceneId,
    level: u16,
    position: Vec2,
    entry: Arc<UnitEntry>,
    inner: UnitInner,
    base: Attributes,
    own_state: UnitState,
    hp: i64,
    energy: i32,
    cooldowns: BTreeMap<u32, u32>,
    auras: AuraSlots,
    stats: UnitStats,
}

impl Unit {
    /// Builds a unit from its entry and roster snapshot, at full health.
    #[must_use]
    pub fn new(
        id: UnitId,
        camp: Camp,
        scene: SceneId,
        entry: Arc<UnitEntry>,
        snapshot: &UnitSnapshot,
    ) -> Self {
        let inner = match entry.tag {
            UnitTag::Hero => UnitInner::Hero(HeroInfo {
                owner: snapshot.owner,
                star: snapshot.star,
            }),
            UnitTag::Creature => UnitInner::Creature(CreatureInfo {
                wave: snapshot.wave,
            }),
        };
        let hp = i64::from(snapshot.attributes.get(AttributeKind::MaxHp).max(1));
        Self {
            id,
            camp,
            scene,
            level: snapshot.level,
            position: snapshot.position,
            entry,
            inner,
            base: snapshot.attributes,
            own_state: UnitState::empty(),
            hp,
            energy: 0,
            cooldowns: BTreeMap::new(),
            auras: AuraSlots::new(),
            stats: UnitStats::default(),
        }
    }

    // -------------------------------------------------------------------------
    // Identity
    // -------------------------------------------------------------------------

    /// Returns the unit's identifier.
    #[must_use]
    pub const fn id(&self) -> UnitId {
        self.id
    }

    /// Returns the unit type id.
    #[must_use]
    pub fn type_id(&self) -> u32 {
        self.entry.id
    }

    /// Returns the unit's camp.
    #[must_use]
    pub const fn camp(&self) -> Camp {
        self.camp
    }

    /// Returns the owning scene (lookup only).
    #[must_use]
    pub const fn scene(&self) -> SceneId {
        self.scene
    }

    /// Returns the variant tag.
    #[must_use]
    pub const fn tag(&self) -> UnitTag {
        self.inner.tag()
    }

    /// Returns the variant metadata.
    #[must_use]
    pub const fn inner(&self) -> &UnitInner {
        &self.inner
    }

    /// Returns `true` for heroes.
    #[must_use]
    pub const fn is_hero(&self) -> bool {
        matches!(self.inner, UnitInner::Hero(_))
    }

    /// Returns the static entry.
    #[must_use]
    pub fn entry(&self) -> &UnitEntry {
        &self.entry
    }

    /// Returns the unit's race.
    #[must_use]
    pub fn race(&self) -> Race {
        self.entry.race
    }

    /// Returns the unit's level.
    #[must_use]
    pub const fn level(&self) -> u16 {
        self.level
    }

    /// Returns the battlefield position.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Returns `true` if both units fight for the same camp.
    #[must_use]
    pub fn is_friend_of(&self, other: &Unit) -> bool {
        self.camp == other.camp
    }

    // -------------------------------------------------------------------------
    // Attribute lookup
    // -------------------------------------------------------------------------

    /// Effective attribute: base snapshot plus active aura modifiers.
    #[must_use]
    pub fn attribute(&self, kind: AttributeKind) -> i32 {
        self.base
            .get(kind)
            .saturating_add(self.auras.attribute_modifier(kind))
    }

    /// The frozen snapshot the unit was built from.
    #[must_use]
    pub const fn base_attributes(&self) -> &Attributes {
        &self.base
    }

    /// Current state: the unit's own bits plus every active aura state.
    #[must_use]
    pub fn state(&self) -> UnitState {
        self.own_state | self.auras.unit_states()
    }

    /// Markers placed by active auras.
    #[must_use]
    pub fn aura_state(&self) -> AuraState {
        self.auras.aura_states()
    }

    /// Mechanics the unit is currently immune to.
    #[must_use]
    pub fn mechanic_immunity(&self) -> Mechanic {
        self.auras.mechanic_immunity()
    }

    /// Returns `true` unless the unit is dead.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        !self.own_state.contains(UnitState::DEAD)
    }

    // -------------------------------------------------------------------------
    // Health and energy
    // -------------------------------------------------------------------------

    /// Current hit points.
    #[must_use]
    pub const fn hp(&self) -> i64 {
        self.hp
    }

    /// Effective maximum hit points (at least 1).
    #[must_use]
    pub fn max_hp(&self) -> i64 {
        i64::from(self.attribute(AttributeKind::MaxHp).max(1))
    }

    /// Hit points as a fraction of maximum, on the 1/10000 scale.
    #[must_use]
    pub fn hp_pct(&self) -> i32 {
        let pct = self.hp.clamp(0, self.max_hp()) * 10_000 / self.max_hp();
        i32::try_from(pct).unwrap_or(10_000)
    }

    /// Removes hit points. Returns the amount actually removed and whether
    /// this damage killed the unit.
    pub fn take_damage(&mut self, amount: i64) -> (i64, bool) {
        if !self.is_alive() || amount <= 0 {
            return (0, false);
        }
        let dealt = amount.min(self.hp);
        self.hp -= dealt;
        self.stats.damage_taken += dealt;
        if self.hp == 0 {
            self.own_state.insert(UnitState::DEAD);
            return (dealt, true);
        }
        (dealt, false)
    }

    /// Restores hit points up to the maximum. Returns the effective amount.
    pub fn heal(&mut self, amount: i64) -> i64 {
        if !self.is_alive() || amount <= 0 {
            return 0;
        }
        let healed = amount.min(self.max_hp() - self.hp).max(0);
        self.hp += healed;
        healed
    }

    /// Sets hit points directly, clamped to `[1, max_hp]` for living units.
    pub fn set_hp(&mut self, hp: i64) {
        if self.is_alive() {
            self.hp = hp.clamp(1, self.max_hp());
        }
    }

    /// Current energy.
    #[must_use]
    pub const fn energy(&self) -> i32 {
        self.energy
    }

    /// Adds (or with a negative delta removes) energy, clamped to
    /// `[0, max_energy]`. Returns the applied change.
    pub fn add_energy(&mut self, delta: i32) -> i32 {
        let before = self.energy;
        self.energy = self
            .energy
            .saturating_add(delta)
            .clamp(0, self.entry.max_energy.max(0));
        self.energy - before
    }

    // -------------------------------------------------------------------------
    // Cooldowns
    // -------------------------------------------------------------------------

    /// Remaining cooldown of a spell, 0 when ready.
    #[must_use]
    pub fn cooldown(&self, spell: u32) -> u32 {
        self.cooldowns.get(&spell).copied().unwrap_or(0)
    }

    /// Puts a spell on cooldown.
    pub fn start_cooldown(&mut self, spell: u32, duration_ms: u32) {
        if duration_ms > 0 {
            self.cooldowns.insert(spell, duration_ms);
        }
    }

    // -------------------------------------------------------------------------
    // Update hook
    // -------------------------------------------------------------------------

    /// Per-tick self update: counts cooldowns down and regenerates energy.
    ///
    /// Aura processing and casting need the whole battlefield and are driven
    /// by the scene around this hook.
    pub fn update(&mut self, dt_ms: u32) {
        if !self.is_alive() {
            return;
        }
        self.cooldowns.retain(|_, remaining| {
            *remaining = remaining.saturating_sub(dt_ms);
            *remaining > 0
        });
        let regen = self.attribute(AttributeKind::EnergyRegen);
        if regen > 0 {
            self.add_energy(regen);
        }
    }

    // -------------------------------------------------------------------------
    // Auras and stats
    // -------------------------------------------------------------------------

    /// Aura slot groups.
    #[must_use]
    pub const fn auras(&self) -> &AuraSlots {
        &self.auras
    }

    /// Mutable aura slot groups.
    pub fn auras_mut(&mut self) -> &mut AuraSlots {
        &mut self.auras
    }

    /// Battle statistics.
    #[must_use]
    pub const fn stats(&self) -> &UnitStats {
        &self.stats
    }

    /// Mutable battle statistics.
    pub fn stats_mut(&mut self) -> &mut UnitStats {
        &mut self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_with(attrs: Attributes) -> Unit {
        let entry = Arc::new(UnitEntry::new(1, UnitTag::Hero, 100));
        Unit::new(
            UnitId::new(0),
            Camp::Attacker,
            SceneId::new(1),
            entry,
            &UnitSnapshot::new(1, attrs),
        )
    }

    mod unit_id_tests {
        use super::*;

        #[test]
        fn ordering_follows_raw_value() {
            assert!(UnitId::new(1) < UnitId::new(2));
            assert_eq!(UnitId::from(4).as_u32(), 4);
        }

        #[test]
        fn display_and_debug() {
            assert_eq!(format!("{}", UnitId::new(3)), "3");
            assert_eq!(format!("{:?}", UnitId::new(3)), "UnitId(3)");
        }
    }

    mod camp_tests {
        use super::*;

        #[test]
        fn opposite_swaps() {
            assert_eq!(Camp::Attacker.opposite(), Camp::Defender);
            assert_eq!(Camp::Defender.opposite(), Camp::Attacker);
        }
    }

    mod health_tests {
        use super::*;

        #[test]
        fn starts_at_full_health() {
            let unit = unit_with(Attributes::new().with(AttributeKind::MaxHp, 800));
            assert_eq!(unit.hp(), 800);
            assert_eq!(unit.hp_pct(), 10_000);
            assert!(unit.is_hero());
            assert_eq!(unit.tag(), UnitTag::Hero);
        }

        #[test]
        fn lethal_damage_sets_dead() {
            let mut unit = unit_with(Attributes::new().with(AttributeKind::MaxHp, 100));
            let (dealt, killed) = unit.take_damage(250);
            assert_eq!(dealt, 100);
            assert!(killed);
            assert!(!unit.is_alive());
            assert!(unit.state().contains(UnitState::DEAD));
            assert_eq!(unit.stats().damage_taken, 100);
        }

        #[test]
        fn dead_units_take_no_more_damage_or_healing() {
            let mut unit = unit_with(Attributes::new().with(AttributeKind::MaxHp, 100));
            unit.take_damage(100);
            assert_eq!(unit.take_damage(10), (0, false));
            assert_eq!(unit.heal(10), 0);
        }

        #[test]
        fn healing_caps_at_max() {
            let mut unit = unit_with(Attributes::new().with(AttributeKind::MaxHp, 100));
            unit.take_damage(30);
            assert_eq!(unit.heal(50), 30);
            assert_eq!(unit.hp(), 100);
        }

        #[test]
        fn hp_pct_scale() {
            let mut unit = unit_with(Attributes::new().with(AttributeKind::MaxHp, 200));
            unit.take_damage(150);
            assert_eq!(unit.hp_pct(), 2500);
        }
    }

    mod update_tests {
        use super::*;

        #[test]
        fn cooldowns_count_down_and_expire() {
            let mut unit = unit_with(Attributes::new().with(AttributeKind::MaxHp, 10));
            unit.start_cooldown(5, 300);
            unit.update(200);
            assert_eq!(unit.cooldown(5), 100);
            unit.update(200);
            assert_eq!(unit.cooldown(5), 0);
        }

        #[test]
        fn energy_regenerates_up_to_cap() {
            let mut unit = unit_with(
                Attributes::new()
                    .with(AttributeKind::MaxHp, 10)
                    .with(AttributeKind::EnergyRegen, 600),
            );
            unit.update(200);
            assert_eq!(unit.energy(), 600);
            unit.update(200);
            assert_eq!(unit.energy(), 1000);
        }

        #[test]
        fn energy_never_negative() {
            let mut unit = unit_with(Attributes::new());
            assert_eq!(unit.add_energy(-50), 0);
            assert_eq!(unit.energy(), 0);
        }
    }
}
