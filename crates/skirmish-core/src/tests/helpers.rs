//! Test helper functions for setting up battlefields, content and scenes.
//!
//! This module provides a small standard content catalog and a [`Fixture`]
//! that owns everything a [`CastContext`] borrows, so resolution tests can
//! cast spells without building a whole scene.

use glam::Vec2;

use crate::aura::{AuraCastType, AuraEffect, AuraEntry, AuraGroup};
use crate::battlefield::Battlefield;
use crate::combat_log::CombatLog;
use crate::content::ContentTables;
use crate::rng::ScriptedRolls;
use crate::scene::{SceneEntry, SceneId, SceneRequest, SceneType};
use crate::spell::condition::TargetCondition;
use crate::spell::{
    CastContext, EffectSlot, EffectType, SceneModifiers, SelectTarget, SpellEntry, SpellFlags,
    SpellRegistry, SpellSchool, TargetCamp,
};
use crate::unit::{
    AttributeKind, AuraState, Attributes, Camp, Unit, UnitEntry, UnitId, UnitSnapshot, UnitTag,
};

// =============================================================================
// Standard Content
// =============================================================================

/// Melee strike at the nearest enemy for 100% attack.
pub const STRIKE: u32 = 1;
/// Counter-attack at an explicit enemy for 50% attack.
pub const COUNTER: u32 = 2;
/// Heal on the most wounded friend (self included) below 80% hp.
pub const MEND: u32 = 3;
/// Magic hit that applies [`BURN`]; costs energy.
pub const IGNITE: u32 = 4;

/// Burning damage over time.
pub const BURN: u32 = 150;

/// Creature with only a normal attack.
pub const GRUNT: u32 = 100;
/// Creature that answers blocks with [`COUNTER`].
pub const GUARD: u32 = 101;
/// Hero casting [`MEND`] and [`IGNITE`] before its normal attack.
pub const ADEPT: u32 = 102;

/// Attribute vector with max hp and attack set.
pub fn attrs(hp: i32, attack: i32) -> Attributes {
    Attributes::new()
        .with(AttributeKind::MaxHp, hp)
        .with(AttributeKind::Attack, attack)
}

/// Builds the standard test catalog.
pub fn standard_content() -> ContentTables {
    let mut content = ContentTables::new();

    let mut strike = SpellEntry::new(STRIKE, SpellSchool::Physical, SelectTarget::NEAREST_ENEMY)
        .with_flags(SpellFlags::MELEE | SpellFlags::ALLOW_BEAT_BACK)
        .with_effect(EffectSlot::new(EffectType::SCHOOL_DAMAGE).with_ratio(10_000));
    strike.target_camp = TargetCamp::Enemy;
    content.insert_spell(strike);

    let mut counter = SpellEntry::new(COUNTER, SpellSchool::Physical, SelectTarget::EXPLICIT)
        .with_effect(EffectSlot::new(EffectType::SCHOOL_DAMAGE).with_ratio(5_000));
    counter.target_camp = TargetCamp::Enemy;
    content.insert_spell(counter);

    let mut mend = SpellEntry::new(MEND, SpellSchool::Magic, SelectTarget::LOWEST_HP_FRIEND)
        .with_flags(SpellFlags::INCLUDE_SELF)
        .with_effect(
            EffectSlot::new(EffectType::HEAL)
                .with_ratio(10_000)
                .with_condition(TargetCondition::TargetHpBelow { pct: 8000 }),
        );
    mend.target_camp = TargetCamp::Friend;
    mend.cooldown_ms = 1000;
    content.insert_spell(mend);

    let mut ignite = SpellEntry::new(IGNITE, SpellSchool::Magic, SelectTarget::NEAREST_ENEMY)
        .with_effect(EffectSlot::new(EffectType::SCHOOL_DAMAGE).with_ratio(5_000))
        .with_effect(EffectSlot::new(EffectType::APPLY_AURA).with_param(BURN));
    ignite.target_camp = TargetCamp::Enemy;
    ignite.energy_cost = 400;
    ignite.cooldown_ms = 2000;
    content.insert_spell(ignite);

    let mut burn = AuraEntry::new(BURN, AuraCastType::Interval, AuraGroup::Negative);
    burn.duration_ms = 2000;
    burn.interval_ms = 500;
    burn.multi_wrap = 3;
    burn.effects = vec![
        AuraEffect::PeriodicDamage {
            base: 0,
            attack_ratio: 2000,
        },
        AuraEffect::SetAuraState {
            state: AuraState::BURNING,
        },
    ];
    content.insert_aura(burn);

    content.insert_unit(UnitEntry::new(GRUNT, UnitTag::Creature, STRIKE));
    let mut guard = UnitEntry::new(GUARD, UnitTag::Creature, STRIKE);
    guard.beat_back_spell = Some(COUNTER);
    content.insert_unit(guard);
    let mut adept = UnitEntry::new(ADEPT, UnitTag::Hero, STRIKE);
    adept.skills = vec![MEND, IGNITE];
    content.insert_unit(adept);

    for scene_type in [SceneType::Stage, SceneType::Arena, SceneType::Boss] {
        content.insert_scene(SceneEntry::new(scene_type));
    }
    content
}

// =============================================================================
// Cast Fixture
// =============================================================================

/// Owns everything a [`CastContext`] borrows.
///
/// Rolls default to a script that always returns 1, so every chance roll
/// with a positive chance succeeds.
pub struct Fixture {
    pub field: Battlefield,
    pub rng: ScriptedRolls,
    pub content: ContentTables,
    pub registry: SpellRegistry,
    pub log: CombatLog,
    pub modifiers: SceneModifiers,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            field: Battlefield::new(SceneId::new(1), 40),
            rng: ScriptedRolls::new([], 1),
            content: standard_content(),
            registry: SpellRegistry::standard(),
            log: CombatLog::new(true),
            modifiers: SceneModifiers::default(),
        }
    }

    /// Spawns a [`GRUNT`] at the origin.
    pub fn spawn(&mut self, camp: Camp, attributes: Attributes) -> UnitId {
        self.spawn_at(camp, attributes, Vec2::ZERO)
    }

    /// Spawns a [`GRUNT`] at `position`.
    pub fn spawn_at(&mut self, camp: Camp, attributes: Attributes, position: Vec2) -> UnitId {
        let snapshot = UnitSnapshot::new(GRUNT, attributes).at_position(position);
        self.spawn_snapshot(camp, &snapshot)
    }

    /// Spawns a unit of any standard type at the origin.
    pub fn spawn_unit(&mut self, camp: Camp, unit_type: u32, attributes: Attributes) -> UnitId {
        self.spawn_snapshot(camp, &UnitSnapshot::new(unit_type, attributes))
    }

    fn spawn_snapshot(&mut self, camp: Camp, snapshot: &UnitSnapshot) -> UnitId {
        let entry = self
            .content
            .unit(snapshot.unit_type_id)
            .cloned()
            .expect("unit type in standard content");
        self.field.spawn(camp, entry, snapshot).expect("fixture has room")
    }

    pub fn ctx(&mut self) -> CastContext<'_> {
        CastContext::new(
            &mut self.field,
            &mut self.rng,
            &self.content,
            &self.registry,
            self.modifiers,
            &mut self.log,
        )
    }

    pub fn unit(&self, id: UnitId) -> &Unit {
        self.field.get(id).expect("unit exists")
    }

    pub fn unit_mut(&mut self, id: UnitId) -> &mut Unit {
        self.field.get_mut(id).expect("unit exists")
    }
}

// =============================================================================
// Scene Requests
// =============================================================================

/// One [`GRUNT`] against one [`GRUNT`], ten units apart, on a stage.
pub fn duel_request(id: u64) -> SceneRequest {
    SceneRequest {
        id: SceneId::new(id),
        scene_type: SceneType::Stage as u8,
        attacker_id: 10,
        defender_id: 20,
        attackers: vec![UnitSnapshot::new(GRUNT, attrs(1000, 100))],
        defenders: vec![
            UnitSnapshot::new(GRUNT, attrs(1000, 100)).at_position(Vec2::new(10.0, 0.0)),
        ],
        seed: None,
    }
}

/// Three against three with every standard unit type, in an arena.
///
/// Adepts carry a PvP damage bonus, so the scene type changes the battle.
pub fn squad_request(id: u64, seed: u64) -> SceneRequest {
    let roster = |x: f32| {
        vec![
            UnitSnapshot::new(
                ADEPT,
                attrs(2400, 150)
                    .with(AttributeKind::EnergyRegen, 100)
                    .with(AttributeKind::Hit, 10_000)
                    .with(AttributeKind::PvpDamagePct, 1000),
            )
            .at_position(Vec2::new(x, 0.0)),
            UnitSnapshot::new(GUARD, attrs(4000, 80).with(AttributeKind::Block, 3000))
                .at_position(Vec2::new(x, 2.0)),
            UnitSnapshot::new(GRUNT, attrs(3000, 120).with(AttributeKind::Hit, 2000))
                .at_position(Vec2::new(x, 4.0)),
        ]
    };
    SceneRequest {
        id: SceneId::new(id),
        scene_type: SceneType::Arena as u8,
        attacker_id: 1,
        defender_id: 2,
        attackers: roster(0.0),
        defenders: roster(12.0),
        seed: Some(seed),
    }
}
