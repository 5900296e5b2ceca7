//! Attribute vectors and races.
//!
//! Attributes are integers. Percentages use the 1/10000 scale (`10000` is
//! 100%), matching the roll scale in [`crate::rng`].

use std::collections::BTreeMap;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// One slot of a unit's attribute vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    /// Maximum hit points.
    MaxHp,
    /// Attack power, basis for effect scaling and the minimum damage floor.
    Attack,
    /// Hit rating.
    Hit,
    /// Dodge rating.
    Dodge,
    /// Critical strike rating.
    Crit,
    /// Reduces incoming crit chance from enemies.
    Resilience,
    /// Block rating.
    Block,
    /// Reduces the block chance of enemies hit by this unit.
    Broken,
    /// Added to the crit multiplier, in 1/10000.
    CritIncrement,
    /// Flat damage added to outgoing damage.
    DamageBonus,
    /// Flat damage removed from incoming damage.
    DamageReduce,
    /// Flat healing added to outgoing heals.
    HealBonus,
    /// Flat healing added to incoming heals.
    HealTakenBonus,
    /// Outgoing physical damage percentage.
    PhysicalDamagePct,
    /// Outgoing magic damage percentage.
    MagicDamagePct,
    /// Incoming physical damage resistance percentage.
    PhysicalResistPct,
    /// Incoming magic damage resistance percentage.
    MagicResistPct,
    /// Bonus percentage applied in PvP scenes against heroes.
    PvpDamagePct,
    /// Outgoing heal percentage.
    HealPct,
    /// Incoming heal percentage.
    HealTakenPct,
    /// Energy regained each tick.
    EnergyRegen,
    /// Damage percentage against humans.
    DamageVsHumanPct,
    /// Damage percentage against beasts.
    DamageVsBeastPct,
    /// Damage percentage against undead.
    DamageVsUndeadPct,
    /// Damage percentage against demons.
    DamageVsDemonPct,
    /// Damage percentage against elementals.
    DamageVsElementalPct,
}

impl AttributeKind {
    /// Number of attribute slots.
    pub const COUNT: usize = 26;

    /// The race-versus-race damage attribute for a target race.
    #[must_use]
    pub const fn damage_vs(race: Race) -> Self {
        match race {
            Race::Human => Self::DamageVsHumanPct,
            Race::Beast => Self::DamageVsBeastPct,
            Race::Undead => Self::DamageVsUndeadPct,
            Race::Demon => Self::DamageVsDemonPct,
            Race::Elemental => Self::DamageVsElementalPct,
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

/// Unit race.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Race {
    /// Humans.
    #[default]
    Human,
    /// Beasts.
    Beast,
    /// Undead.
    Undead,
    /// Demons.
    Demon,
    /// Elementals.
    Elemental,
}

impl Race {
    /// The mask bit for this race.
    #[must_use]
    pub const fn mask(self) -> RaceMask {
        match self {
            Self::Human => RaceMask::HUMAN,
            Self::Beast => RaceMask::BEAST,
            Self::Undead => RaceMask::UNDEAD,
            Self::Demon => RaceMask::DEMON,
            Self::Elemental => RaceMask::ELEMENTAL,
        }
    }
}

bitflags! {
    /// Set of races. An empty mask means "any race" wherever it is used as a filter.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct RaceMask: u8 {
        /// Humans.
        const HUMAN = 1 << 0;
        /// Beasts.
        const BEAST = 1 << 1;
        /// Undead.
        const UNDEAD = 1 << 2;
        /// Demons.
        const DEMON = 1 << 3;
        /// Elementals.
        const ELEMENTAL = 1 << 4;
    }
}

impl RaceMask {
    /// Returns true when the mask is empty or contains `race`.
    #[must_use]
    pub fn admits(self, race: Race) -> bool {
        self.is_empty() || self.contains(race.mask())
    }
}

/// Fixed-size attribute vector.
///
/// Serialized as a map from attribute name to value; missing attributes are 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<AttributeKind, i32>", into = "BTreeMap<AttributeKind, i32>")]
pub struct Attributes {
    values: [i32; AttributeKind::COUNT],
}

impl Attributes {
    /// All attributes zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            values: [0; AttributeKind::COUNT],
        }
    }

    /// Returns the value of one attribute.
    #[must_use]
    pub const fn get(&self, kind: AttributeKind) -> i32 {
        self.values[kind.index()]
    }

    /// Overwrites one attribute.
    pub fn set(&mut self, kind: AttributeKind, value: i32) {
        self.values[kind.index()] = value;
    }

    /// Builder-style [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, kind: AttributeKind, value: i32) -> Self {
        self.set(kind, value);
        self
    }
}

impl Default for Attributes {
    fn default() -> Self {
        Self::new()
    }
}

impl From<BTreeMap<AttributeKind, i32>> for Attributes {
    fn from(map: BTreeMap<AttributeKind, i32>) -> Self {
        map.into_iter()
            .fold(Self::new(), |attrs, (kind, value)| attrs.with(kind, value))
    }
}

impl From<Attributes> for BTreeMap<AttributeKind, i32> {
    fn from(attrs: Attributes) -> Self {
        ALL_ATTRIBUTES
            .iter()
            .filter(|kind| attrs.get(**kind) != 0)
            .map(|kind| (*kind, attrs.get(*kind)))
            .collect()
    }
}

const ALL_ATTRIBUTES: [AttributeKind; AttributeKind::COUNT] = [
    AttributeKind::MaxHp,
    AttributeKind::Attack,
    AttributeKind::Hit,
    AttributeKind::Dodge,
    AttributeKind::Crit,
    AttributeKind::Resilience,
    AttributeKind::Block,
    AttributeKind::Broken,
    AttributeKind::CritIncrement,
    AttributeKind::DamageBonus,
    AttributeKind::DamageReduce,
    AttributeKind::HealBonus,
    AttributeKind::HealTakenBonus,
    AttributeKind::PhysicalDamagePct,
    AttributeKind::MagicDamagePct,
    AttributeKind::PhysicalResistPct,
    AttributeKind::MagicResistPct,
    AttributeKind::PvpDamagePct,
    AttributeKind::HealPct,
    AttributeKind::HealTakenPct,
    AttributeKind::EnergyRegen,
    AttributeKind::DamageVsHumanPct,
    AttributeKind::DamageVsBeastPct,
    AttributeKind::DamageVsUndeadPct,
    AttributeKind::DamageVsDemonPct,
    AttributeKind::DamageVsElementalPct,
];
