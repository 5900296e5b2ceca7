use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glam::Vec2;
use skirmish_core::aura::{AuraCastType, AuraEffect, AuraEntry, AuraGroup};
use skirmish_core::scene::SceneEntry;
use skirmish_core::spell::{EffectSlot, EffectType, SceneModifiers, SelectTarget, SpellEntry, SpellSchool, TargetCamp};
use skirmish_core::unit::{AttributeKind, Attributes, UnitEntry};
use skirmish_core::{
    cast_spell, Battlefield, Camp, CastContext, CastMode, CombatLog, ContentTables, EngineConfig,
    Scene, SceneId, SceneRequest, SceneRng, SceneType, SpellRegistry, UnitSnapshot, UnitTag,
};

const STRIKE: u32 = 1;
const SCORCH: u32 = 2;
const BURN: u32 = 10;
const SOLDIER: u32 = 100;

fn content() -> ContentTables {
    let mut content = ContentTables::new();

    let mut strike = SpellEntry::new(STRIKE, SpellSchool::Physical, SelectTarget::NEAREST_ENEMY)
        .with_effect(EffectSlot::new(EffectType::SCHOOL_DAMAGE).with_ratio(10_000));
    strike.target_camp = TargetCamp::Enemy;
    content.insert_spell(strike);

    let mut scorch = SpellEntry::new(SCORCH, SpellSchool::Magic, SelectTarget::ALL_ENEMIES)
        .with_effect(EffectSlot::new(EffectType::SCHOOL_DAMAGE).with_ratio(3_000))
        .with_effect(EffectSlot::new(EffectType::APPLY_AURA).with_param(BURN));
    scorch.target_camp = TargetCamp::Enemy;
    scorch.max_targets = 6;
    scorch.cooldown_ms = 1000;
    content.insert_spell(scorch);

    let mut burn = AuraEntry::new(BURN, AuraCastType::Interval, AuraGroup::Negative);
    burn.duration_ms = 3000;
    burn.interval_ms = 600;
    burn.effects = vec![AuraEffect::PeriodicDamage {
        base: 0,
        attack_ratio: 1000,
    }];
    content.insert_aura(burn);

    let mut soldier = UnitEntry::new(SOLDIER, UnitTag::Creature, STRIKE);
    soldier.skills = vec![SCORCH];
    content.insert_unit(soldier);
    content.insert_scene(SceneEntry::new(SceneType::Stage));
    content
}

fn attrs() -> Attributes {
    Attributes::new()
        .with(AttributeKind::MaxHp, 20_000)
        .with(AttributeKind::Attack, 150)
        .with(AttributeKind::Hit, 4000)
        .with(AttributeKind::Crit, 2000)
}

fn roster(x: f32) -> Vec<UnitSnapshot> {
    (0..6)
        .map(|i| UnitSnapshot::new(SOLDIER, attrs()).at_position(Vec2::new(x, i as f32 * 2.0)))
        .collect()
}

fn bench_cast_strike(c: &mut Criterion) {
    let content = content();
    let registry = SpellRegistry::standard();
    let entry = Arc::clone(content.unit(SOLDIER).expect("soldier"));
    let snapshot = UnitSnapshot::new(SOLDIER, attrs().with(AttributeKind::MaxHp, i32::MAX));

    let mut field = Battlefield::new(SceneId::new(1), 2);
    let caster = field.spawn(Camp::Attacker, Arc::clone(&entry), &snapshot).expect("room");
    field.spawn(Camp::Defender, entry, &snapshot).expect("room");
    let mut rng = SceneRng::new(1);
    let mut log = CombatLog::new(false);

    c.bench_function("cast_strike", |b| {
        b.iter(|| {
            let mut ctx = CastContext::new(
                &mut field,
                &mut rng,
                &content,
                &registry,
                SceneModifiers::default(),
                &mut log,
            );
            black_box(cast_spell(&mut ctx, caster, STRIKE, None, CastMode::Normal))
        })
    });
}

fn bench_scene_to_end(c: &mut Criterion) {
    let content = Arc::new(content());
    let registry = Arc::new(SpellRegistry::standard());
    let config = EngineConfig::default();

    c.bench_function("scene_6v6_to_end", |b| {
        b.iter(|| {
            let request = SceneRequest {
                id: SceneId::new(1),
                scene_type: SceneType::Stage as u8,
                attacker_id: 1,
                defender_id: 2,
                attackers: roster(0.0),
                defenders: roster(10.0),
                seed: Some(black_box(7)),
            };
            let scene = Scene::new(request, &config, Arc::clone(&content), Arc::clone(&registry))
                .expect("valid request");
            black_box(scene.run_to_end())
        })
    });
}

criterion_group!(benches, bench_cast_strike, bench_scene_to_end);
criterion_main!(benches);
