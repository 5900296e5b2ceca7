//! Static balance data for unit types.

use serde::{Deserialize, Serialize};

use super::{Race, UnitTag};

fn default_max_energy() -> i32 {
    1000
}

/// Read-only definition of a unit type, keyed by `id` in the content tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitEntry {
    /// Unit type id.
    pub id: u32,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Hero or creature.
    pub tag: UnitTag,
    /// Race, used by race filters and race damage bonuses.
    #[serde(default)]
    pub race: Race,
    /// Skills tried each tick, in priority order, before the normal attack.
    #[serde(default)]
    pub skills: Vec<u32>,
    /// Fallback spell cast when no skill is usable.
    pub normal_attack: u32,
    /// Spell used to counter-attack after blocking a hit.
    #[serde(default)]
    pub beat_back_spell: Option<u32>,
    /// Auras applied to the unit when the scene is populated.
    #[serde(default)]
    pub passive_auras: Vec<u32>,
    /// Energy cap.
    #[serde(default = "default_max_energy")]
    pub max_energy: i32,
}

impl UnitEntry {
    /// Minimal entry with a normal attack and nothing else.
    #[must_use]
    pub fn new(id: u32, tag: UnitTag, normal_attack: u32) -> Self {
        Self {
            id,
            name: String::new(),
            tag,
            race: Race::default(),
            skills: Vec::new(),
            normal_attack,
            beat_back_spell: None,
            passive_auras: Vec::new(),
            max_energy: default_max_energy(),
        }
    }

    /// Skill rotation followed by the normal attack.
    pub fn rotation(&self) -> impl Iterator<Item = u32> + '_ {
        self.skills
            .iter()
            .copied()
            .chain(std::iter::once(self.normal_attack))
    }

    /// Every spell id this entry references, for content validation.
    pub fn referenced_spells(&self) -> impl Iterator<Item = u32> + '_ {
        self.rotation().chain(self.beat_back_spell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_ends_with_normal_attack() {
        let mut entry = UnitEntry::new(1, UnitTag::Creature, 100);
        entry.skills = vec![7, 8];
        assert_eq!(entry.rotation().collect::<Vec<_>>(), vec![7, 8, 100]);
    }

    #[test]
    fn deserializes_with_defaults() {
        let entry: UnitEntry =
            serde_json::from_str(r#"{"id":3,"tag":"hero","normal_attack":1}"#).unwrap();
        assert_eq!(entry.max_energy, 1000);
        assert!(entry.skills.is_empty());
        assert_eq!(entry.race, Race::Human);
    }
}
