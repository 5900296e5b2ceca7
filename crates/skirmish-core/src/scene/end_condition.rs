//! When a battle stops.

use std::time::Duration;

use crate::battlefield::Battlefield;
use crate::unit::Camp;

use super::SceneEntry;

/// End policy of one scene: a hard duration limit plus the optional
/// elimination objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndCondition {
    max_battle_ms: u64,
    eliminate: bool,
}

impl EndCondition {
    /// Builds the policy from a scene entry, falling back to the engine
    /// default for the duration.
    #[must_use]
    pub fn from_entry(entry: &SceneEntry, default_max_battle_ms: u64) -> Self {
        Self {
            max_battle_ms: entry.max_battle_ms.unwrap_or(default_max_battle_ms),
            eliminate: entry.eliminate,
        }
    }

    /// Duration limit in milliseconds.
    #[must_use]
    pub const fn max_battle_ms(&self) -> u64 {
        self.max_battle_ms
    }

    /// Duration limit for the watchdog timer.
    #[must_use]
    pub const fn max_duration(&self) -> Duration {
        Duration::from_millis(self.max_battle_ms)
    }

    /// Returns the winning camp once the objective is met.
    ///
    /// A camp wins when the other has no living unit. When both camps are
    /// wiped out in the same tick the defender holds.
    #[must_use]
    pub fn check(&self, field: &Battlefield) -> Option<Camp> {
        if !self.eliminate {
            return None;
        }
        let attackers = field.alive_count(Camp::Attacker);
        let defenders = field.alive_count(Camp::Defender);
        match (attackers, defenders) {
            (0, _) => Some(Camp::Defender),
            (_, 0) => Some(Camp::Attacker),
            _ => None,
        }
    }
}
