//! Unit state bitmasks.
//!
//! - [`UnitState`]: engine-interpreted states (dead, stunned, stealthed, ...)
//! - [`AuraState`]: free-form markers set by auras and tested by spells
//! - [`Mechanic`]: effect categories used for immunities and dispels

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// States the engine reacts to.
    ///
    /// `DEAD` is held by the unit itself; every other bit comes from auras.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct UnitState: u32 {
        /// Hit points reached zero.
        const DEAD = 1 << 0;
        /// Cannot cast anything.
        const STUN = 1 << 1;
        /// Cannot cast magic spells.
        const SILENCE = 1 << 2;
        /// Cannot cast physical spells.
        const DISARM = 1 << 3;
        /// Hidden from spells that forbid stealthed targets.
        const STEALTH = 1 << 4;
        /// Ignores the target's stealth when selecting.
        const ANTI_STEALTH = 1 << 5;
        /// Melee skills hit a random unit.
        const CHAOS = 1 << 6;
        /// Melee skills must hit the taunting unit.
        const TAUNT = 1 << 7;
        /// Cannot be healed.
        const INJURY = 1 << 8;
        /// Heals are cut to a quarter.
        const POISON = 1 << 9;
        /// Hostile effects do not land.
        const IMMUNE = 1 << 10;
        /// Cannot move.
        const ROOT = 1 << 11;
    }
}

bitflags! {
    /// Markers auras place on their owner for spells to test.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct AuraState: u32 {
        /// Owner is exposed to follow-up strikes.
        const EXPOSED = 1 << 0;
        /// Owner is in a frenzy.
        const FRENZY = 1 << 1;
        /// Owner has an open combo window.
        const COMBO = 1 << 2;
        /// Owner is shielded.
        const SHIELDED = 1 << 3;
        /// Owner is marked for death.
        const MARKED = 1 << 4;
        /// Owner is burning.
        const BURNING = 1 << 5;
        /// Owner is frozen.
        const FROZEN = 1 << 6;
        /// Owner is bleeding.
        const BLEEDING = 1 << 7;

        const _ = !0;
    }
}

bitflags! {
    /// Effect mechanics, for immunities and dispel filters.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Mechanic: u32 {
        /// Stuns.
        const STUN = 1 << 0;
        /// Silences.
        const SILENCE = 1 << 1;
        /// Roots.
        const ROOT = 1 << 2;
        /// Poisons.
        const POISON = 1 << 3;
        /// Bleeds.
        const BLEED = 1 << 4;
        /// Fear.
        const FEAR = 1 << 5;
        /// Charm and chaos.
        const CHARM = 1 << 6;
        /// Generic magic.
        const MAGIC = 1 << 7;
        /// Curses.
        const CURSE = 1 << 8;
    }
}
