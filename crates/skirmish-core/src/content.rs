//! Content tables: the static balance data every scene reads.
//!
//! Content arrives as a [`ContentFile`] (plain lists, usually parsed from
//! JSON by the service) and is indexed into [`ContentTables`]. Building the
//! tables validates them: duplicate ids, dangling spell or aura references
//! and oversized effect lists are rejected up front, so resolution never has
//! to guess.
//!
//! Entries are stored behind `Arc` so spells and auras in flight can hold on
//! to their definition without borrowing the tables.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aura::entry::AURA_EFFECT_SLOTS;
use crate::aura::AuraEntry;
use crate::scene::{SceneEntry, SceneType};
use crate::spell::entry::SPELL_EFFECT_SLOTS;
use crate::spell::SpellEntry;
use crate::unit::UnitEntry;

/// Serialized form of the content tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentFile {
    /// Spell definitions.
    #[serde(default)]
    pub spells: Vec<SpellEntry>,
    /// Aura definitions.
    #[serde(default)]
    pub auras: Vec<AuraEntry>,
    /// Unit type definitions.
    #[serde(default)]
    pub units: Vec<UnitEntry>,
    /// Per scene-type settings.
    #[serde(default)]
    pub scenes: Vec<SceneEntry>,
}

/// Which entry holds a dangling reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Referrer {
    /// A spell entry.
    Spell(u32),
    /// An aura entry.
    Aura(u32),
    /// A unit entry.
    Unit(u32),
}

impl fmt::Display for Referrer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spell(id) => write!(f, "spell {id}"),
            Self::Aura(id) => write!(f, "aura {id}"),
            Self::Unit(id) => write!(f, "unit {id}"),
        }
    }
}

/// Content rejected while building the tables.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentError {
    /// Two spells share an id.
    #[error("duplicate spell id {0}")]
    DuplicateSpell(u32),

    /// Two auras share an id.
    #[error("duplicate aura id {0}")]
    DuplicateAura(u32),

    /// Two unit entries share an id.
    #[error("duplicate unit id {0}")]
    DuplicateUnit(u32),

    /// Two scene entries share a type.
    #[error("duplicate scene entry for {0}")]
    DuplicateScene(SceneType),

    /// A reference to a spell that does not exist.
    #[error("{from} references unknown spell {spell}")]
    DanglingSpell {
        /// Referring entry.
        from: Referrer,
        /// Missing spell id.
        spell: u32,
    },

    /// A reference to an aura that does not exist.
    #[error("{from} references unknown aura {aura}")]
    DanglingAura {
        /// Referring entry.
        from: Referrer,
        /// Missing aura id.
        aura: u32,
    },

    /// An entry carries more effect slots than allowed.
    #[error("{from} has {count} effects, at most {limit} allowed")]
    TooManyEffects {
        /// Offending entry.
        from: Referrer,
        /// Effects declared.
        count: usize,
        /// Slot limit.
        limit: usize,
    },

    /// A spell names a target policy nothing is registered for.
    #[error("spell {spell} uses unregistered target policy {policy}")]
    UnregisteredSelector {
        /// Spell id.
        spell: u32,
        /// Policy id.
        policy: u16,
    },

    /// A spell names an effect type nothing is registered for.
    #[error("spell {spell} uses unregistered effect type {effect}")]
    UnregisteredEffect {
        /// Spell id.
        spell: u32,
        /// Effect type id.
        effect: u16,
    },
}

/// Indexed, read-only content.
#[derive(Debug, Clone, Default)]
pub struct ContentTables {
    spells: HashMap<u32, Arc<SpellEntry>>,
    auras: HashMap<u32, Arc<AuraEntry>>,
    units: HashMap<u32, Arc<UnitEntry>>,
    scenes: HashMap<SceneType, SceneEntry>,
}

impl ContentTables {
    /// Empty tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes and validates a content file.
    ///
    /// # Errors
    ///
    /// Returns the first duplicate id, dangling reference or oversized
    /// effect list found.
    pub fn from_file(file: ContentFile) -> Result<Self, ContentError> {
        let mut tables = Self::new();
        for spell in file.spells {
            if tables.spells.contains_key(&spell.id) {
                return Err(ContentError::DuplicateSpell(spell.id));
            }
            tables.insert_spell(spell);
        }
        for aura in file.auras {
            if tables.auras.contains_key(&aura.id) {
                return Err(ContentError::DuplicateAura(aura.id));
            }
            tables.insert_aura(aura);
        }
        for unit in file.units {
            if tables.units.contains_key(&unit.id) {
                return Err(ContentError::DuplicateUnit(unit.id));
            }
            tables.insert_unit(unit);
        }
        for scene in file.scenes {
            if tables.scenes.contains_key(&scene.scene_type) {
                return Err(ContentError::DuplicateScene(scene.scene_type));
            }
            tables.insert_scene(scene);
        }
        tables.validate()?;
        Ok(tables)
    }

    /// Checks every cross reference and effect-slot limit.
    ///
    /// # Errors
    ///
    /// Returns the first problem found, in ascending id order.
    pub fn validate(&self) -> Result<(), ContentError> {
        let mut spell_ids: Vec<_> = self.spells.keys().copied().collect();
        spell_ids.sort_unstable();
        for id in spell_ids {
            let spell = &self.spells[&id];
            let from = Referrer::Spell(id);
            if spell.effects.len() > SPELL_EFFECT_SLOTS {
                return Err(ContentError::TooManyEffects {
                    from,
                    count: spell.effects.len(),
                    limit: SPELL_EFFECT_SLOTS,
                });
            }
            self.check_spells(from, spell.referenced_spells())?;
            self.check_auras(from, spell.referenced_auras())?;
        }

        let mut aura_ids: Vec<_> = self.auras.keys().copied().collect();
        aura_ids.sort_unstable();
        for id in aura_ids {
            let aura = &self.auras[&id];
            let from = Referrer::Aura(id);
            if aura.effects.len() > AURA_EFFECT_SLOTS {
                return Err(ContentError::TooManyEffects {
                    from,
                    count: aura.effects.len(),
                    limit: AURA_EFFECT_SLOTS,
                });
            }
            self.check_spells(from, aura.referenced_spells())?;
        }

        let mut unit_ids: Vec<_> = self.units.keys().copied().collect();
        unit_ids.sort_unstable();
        for id in unit_ids {
            let unit = &self.units[&id];
            let from = Referrer::Unit(id);
            self.check_spells(from, unit.referenced_spells())?;
            self.check_auras(from, unit.passive_auras.iter().copied())?;
        }
        Ok(())
    }

    fn check_spells(&self, from: Referrer, ids: impl Iterator<Item = u32>) -> Result<(), ContentError> {
        for spell in ids {
            if !self.spells.contains_key(&spell) {
                return Err(ContentError::DanglingSpell { from, spell });
            }
        }
        Ok(())
    }

    fn check_auras(&self, from: Referrer, ids: impl Iterator<Item = u32>) -> Result<(), ContentError> {
        for aura in ids {
            if !self.auras.contains_key(&aura) {
                return Err(ContentError::DanglingAura { from, aura });
            }
        }
        Ok(())
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Spell by id.
    #[must_use]
    pub fn spell(&self, id: u32) -> Option<&Arc<SpellEntry>> {
        self.spells.get(&id)
    }

    /// Aura by id.
    #[must_use]
    pub fn aura(&self, id: u32) -> Option<&Arc<AuraEntry>> {
        self.auras.get(&id)
    }

    /// Unit entry by id.
    #[must_use]
    pub fn unit(&self, id: u32) -> Option<&Arc<UnitEntry>> {
        self.units.get(&id)
    }

    /// Scene settings for a type.
    #[must_use]
    pub fn scene(&self, scene_type: SceneType) -> Option<&SceneEntry> {
        self.scenes.get(&scene_type)
    }

    /// Every spell, in no particular order.
    pub fn spells(&self) -> impl Iterator<Item = &SpellEntry> {
        self.spells.values().map(|spell| &**spell)
    }

    // =========================================================================
    // Insertion
    // =========================================================================

    /// Adds or replaces a spell without validation.
    pub fn insert_spell(&mut self, spell: SpellEntry) {
        self.spells.insert(spell.id, Arc::new(spell));
    }

    /// Adds or replaces an aura without validation.
    pub fn insert_aura(&mut self, aura: AuraEntry) {
        self.auras.insert(aura.id, Arc::new(aura));
    }

    /// Adds or replaces a unit entry without validation.
    pub fn insert_unit(&mut self, unit: UnitEntry) {
        self.units.insert(unit.id, Arc::new(unit));
    }

    /// Adds or replaces scene settings.
    pub fn insert_scene(&mut self, scene: SceneEntry) {
        self.scenes.insert(scene.scene_type, scene);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aura::{AuraCastType, AuraEffect, AuraGroup};
    use crate::spell::{EffectSlot, EffectType, ProcFlags, SelectTarget, SpellSchool};
    use crate::unit::UnitTag;

    fn strike(id: u32) -> SpellEntry {
        SpellEntry::new(id, SpellSchool::Physical, SelectTarget::NEAREST_ENEMY)
    }

    fn file() -> ContentFile {
        ContentFile {
            spells: vec![strike(1)],
            auras: vec![AuraEntry::new(10, AuraCastType::Persist, AuraGroup::Passive)],
            units: vec![UnitEntry::new(100, UnitTag::Creature, 1)],
            scenes: vec![SceneEntry::new(SceneType::Stage)],
        }
    }

    #[test]
    fn builds_and_looks_up() {
        let tables = ContentTables::from_file(file()).unwrap();
        assert!(tables.spell(1).is_some());
        assert!(tables.aura(10).is_some());
        assert!(tables.unit(100).is_some());
        assert!(tables.scene(SceneType::Stage).is_some());
        assert!(tables.scene(SceneType::Arena).is_none());
    }

    #[test]
    fn duplicates_are_rejected() {
        let mut content = file();
        content.spells.push(strike(1));
        assert_eq!(ContentTables::from_file(content).unwrap_err(), ContentError::DuplicateSpell(1));
    }

    #[test]
    fn dangling_unit_spell() {
        let mut content = file();
        content.units[0].normal_attack = 9;
        assert_eq!(
            ContentTables::from_file(content).unwrap_err(),
            ContentError::DanglingSpell { from: Referrer::Unit(100), spell: 9 }
        );
    }

    #[test]
    fn dangling_aura_from_spell_and_passive() {
        let mut content = file();
        content.spells[0] = strike(1).with_effect(EffectSlot::new(EffectType::APPLY_AURA).with_param(77));
        assert_eq!(
            ContentTables::from_file(content).unwrap_err(),
            ContentError::DanglingAura { from: Referrer::Spell(1), aura: 77 }
        );

        let mut content = file();
        content.units[0].passive_auras = vec![11];
        assert!(matches!(
            ContentTables::from_file(content),
            Err(ContentError::DanglingAura { aura: 11, .. })
        ));
    }

    #[test]
    fn proc_trigger_spell_must_exist() {
        let mut content = file();
        content.auras[0].effects = vec![AuraEffect::ProcTrigger {
            procs: ProcFlags::BLOCK,
            spell: 2,
            chance: 10_000,
        }];
        assert_eq!(
            ContentTables::from_file(content).unwrap_err(),
            ContentError::DanglingSpell { from: Referrer::Aura(10), spell: 2 }
        );
    }

    #[test]
    fn effect_slot_limit() {
        let mut content = file();
        let mut spell = strike(1);
        for _ in 0..4 {
            spell = spell.with_effect(EffectSlot::new(EffectType::HEAL));
        }
        content.spells[0] = spell;
        assert!(matches!(
            ContentTables::from_file(content),
            Err(ContentError::TooManyEffects { count: 4, limit: 3, .. })
        ));
    }

    #[test]
    fn content_file_parses_json() {
        let json = r#"{
            "spells": [{"id": 1, "school": "physical", "select_target": 2}],
            "units": [{"id": 100, "tag": "creature", "normal_attack": 1}],
            "scenes": [{"scene_type": "stage"}]
        }"#;
        let content: ContentFile = serde_json::from_str(json).unwrap();
        let tables = ContentTables::from_file(content).unwrap();
        assert_eq!(tables.spell(1).map(|s| s.select_target), Some(SelectTarget::NEAREST_ENEMY));
    }
}
