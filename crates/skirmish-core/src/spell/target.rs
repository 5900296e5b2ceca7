//! Target selection.
//!
//! Every [`SpellEntry`] names a selection policy ([`SelectTarget`]). The
//! [`TargetSelectorRegistry`] maps policy ids to plain selector functions so
//! new policies can be registered without touching the cast pipeline.
//!
//! Selectors only ever return units that pass [`is_target_valid`]; the
//! pipeline truncates the result to the spell's target limit.

use std::collections::HashMap;

use crate::battlefield::Battlefield;
use crate::rng::RollSource;
use crate::unit::{Unit, UnitId, UnitState};

use super::entry::{SelectTarget, SpellEntry, SpellFlags, TargetCamp};

/// Inputs of one selection.
#[derive(Debug, Clone, Copy)]
pub struct Selection<'a> {
    /// The scene's units.
    pub field: &'a Battlefield,
    /// The casting unit.
    pub caster: &'a Unit,
    /// The spell being cast.
    pub entry: &'a SpellEntry,
    /// Target named by the caller, if any.
    pub explicit: Option<UnitId>,
}

impl<'a> Selection<'a> {
    /// Valid units of the opposing camp, in id order.
    pub fn enemies(self) -> impl Iterator<Item = &'a Unit> {
        self.field
            .camp(self.caster.camp().opposite())
            .filter(move |unit| is_target_valid(self.caster, unit, self.entry))
    }

    /// Valid units of the caster's camp, in id order.
    pub fn friends(self) -> impl Iterator<Item = &'a Unit> {
        self.field
            .camp(self.caster.camp())
            .filter(move |unit| is_target_valid(self.caster, unit, self.entry))
    }
}

/// A selection policy.
pub type SelectorFn = fn(Selection<'_>, &mut dyn RollSource) -> Vec<UnitId>;

/// Returns `true` when `target` passes the spell's target filters.
///
/// Checks liveness (unless dead targets are allowed), self-targeting, the
/// camp requirement, the race mask and the forbidden target states. A caster
/// with `ANTI_STEALTH` ignores the `STEALTH` filter.
#[must_use]
pub fn is_target_valid(caster: &Unit, target: &Unit, entry: &SpellEntry) -> bool {
    if !target.is_alive() && !entry.has(SpellFlags::ALLOW_DEAD_TARGET) {
        return false;
    }
    if caster.id() == target.id() && !entry.has(SpellFlags::INCLUDE_SELF) {
        return false;
    }
    let camp_ok = match entry.target_camp {
        TargetCamp::Enemy => !caster.is_friend_of(target),
        TargetCamp::Friend => caster.is_friend_of(target),
        TargetCamp::Any => true,
    };
    camp_ok && admits_state(caster, target, entry)
}

/// The camp-blind part of [`is_target_valid`]: liveness, race mask and
/// forbidden target states. Confused casters pick targets with this.
#[must_use]
pub fn admits_state(caster: &Unit, target: &Unit, entry: &SpellEntry) -> bool {
    if !target.is_alive() && !entry.has(SpellFlags::ALLOW_DEAD_TARGET) {
        return false;
    }
    if !entry.target_race.admits(target.race()) {
        return false;
    }
    let mut forbid = entry.target_state_forbid;
    if caster.state().contains(UnitState::ANTI_STEALTH) {
        forbid.remove(UnitState::STEALTH);
    }
    !target.state().intersects(forbid)
}

fn ids<'a>(units: impl Iterator<Item = &'a Unit>) -> Vec<UnitId> {
    units.map(Unit::id).collect()
}

fn lowest_hp<'a>(units: impl Iterator<Item = &'a Unit>) -> Vec<UnitId> {
    units
        .min_by_key(|unit| (unit.hp_pct(), unit.id()))
        .map(Unit::id)
        .into_iter()
        .collect()
}

fn select_self(sel: Selection<'_>, _rng: &mut dyn RollSource) -> Vec<UnitId> {
    vec![sel.caster.id()]
}

fn select_nearest_enemy(sel: Selection<'_>, _rng: &mut dyn RollSource) -> Vec<UnitId> {
    Battlefield::nearest(sel.caster.position(), sel.enemies())
        .map(Unit::id)
        .into_iter()
        .collect()
}

fn select_lowest_hp_friend(sel: Selection<'_>, _rng: &mut dyn RollSource) -> Vec<UnitId> {
    lowest_hp(sel.friends())
}

fn select_all_enemies(sel: Selection<'_>, _rng: &mut dyn RollSource) -> Vec<UnitId> {
    ids(sel.enemies())
}

fn select_all_friends(sel: Selection<'_>, _rng: &mut dyn RollSource) -> Vec<UnitId> {
    ids(sel.friends())
}

fn select_random_enemy(sel: Selection<'_>, rng: &mut dyn RollSource) -> Vec<UnitId> {
    let candidates = ids(sel.enemies());
    if candidates.is_empty() {
        return candidates;
    }
    vec![candidates[rng.pick(candidates.len())]]
}

fn select_lowest_hp_enemy(sel: Selection<'_>, _rng: &mut dyn RollSource) -> Vec<UnitId> {
    lowest_hp(sel.enemies())
}

fn select_explicit(sel: Selection<'_>, _rng: &mut dyn RollSource) -> Vec<UnitId> {
    sel.explicit
        .and_then(|id| sel.field.get(id))
        .filter(|target| is_target_valid(sel.caster, target, sel.entry))
        .map(Unit::id)
        .into_iter()
        .collect()
}

fn select_front_enemy(sel: Selection<'_>, _rng: &mut dyn RollSource) -> Vec<UnitId> {
    sel.enemies().next().map(Unit::id).into_iter().collect()
}

/// Policy id to selector function table.
#[derive(Debug, Clone, Default)]
pub struct TargetSelectorRegistry {
    selectors: HashMap<SelectTarget, SelectorFn>,
}

impl TargetSelectorRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in policy.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(SelectTarget::SELF, select_self);
        registry.register(SelectTarget::NEAREST_ENEMY, select_nearest_enemy);
        registry.register(SelectTarget::LOWEST_HP_FRIEND, select_lowest_hp_friend);
        registry.register(SelectTarget::ALL_ENEMIES, select_all_enemies);
        registry.register(SelectTarget::ALL_FRIENDS, select_all_friends);
        registry.register(SelectTarget::RANDOM_ENEMY, select_random_enemy);
        registry.register(SelectTarget::LOWEST_HP_ENEMY, select_lowest_hp_enemy);
        registry.register(SelectTarget::EXPLICIT, select_explicit);
        registry.register(SelectTarget::FRONT_ENEMY, select_front_enemy);
        registry
    }

    /// Registers (or replaces) a policy.
    pub fn register(&mut self, policy: SelectTarget, selector: SelectorFn) {
        self.selectors.insert(policy, selector);
    }

    /// Looks a policy up.
    #[must_use]
    pub fn get(&self, policy: SelectTarget) -> Option<SelectorFn> {
        self.selectors.get(&policy).copied()
    }

    /// Returns `true` when the policy is registered.
    #[must_use]
    pub fn contains(&self, policy: SelectTarget) -> bool {
        self.selectors.contains_key(&policy)
    }
}
