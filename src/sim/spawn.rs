//! Enemy spawning at the arena edges

use glam::Vec2;
use rand::Rng;

use super::difficulty::Difficulty;
use super::state::{Enemy, EnemyVariant, GameEvent, RunState};
use crate::consts::SPAWN_MARGIN;

/// Pick a variant from a uniform `[0, 1)` roll
pub fn roll_variant(roll: f64, difficulty: &Difficulty) -> EnemyVariant {
    if roll < difficulty.tank_chance {
        EnemyVariant::Tank
    } else if roll < difficulty.tank_chance + difficulty.fast_chance {
        EnemyVariant::Fast
    } else {
        EnemyVariant::Normal
    }
}

/// Uniform whole-pixel point on a uniformly chosen edge, inset by the margin
pub fn edge_position(rng: &mut impl Rng, arena: Vec2) -> Vec2 {
    let margin = SPAWN_MARGIN as i32;
    let right = (arena.x as i32 - margin).max(margin);
    let bottom = (arena.y as i32 - margin).max(margin);

    let (x, y) = match rng.random_range(0..4) {
        0 => (rng.random_range(margin..=right), margin),
        1 => (rng.random_range(margin..=right), bottom),
        2 => (margin, rng.random_range(margin..=bottom)),
        _ => (right, rng.random_range(margin..=bottom)),
    };
    Vec2::new(x as f32, y as f32)
}

/// Spawn one enemy of `variant` at a random edge, scaled from current difficulty
pub fn spawn_enemy(run: &mut RunState, variant: EnemyVariant) -> usize {
    let pos = edge_position(&mut run.rng, run.arena);
    let base_speed = run.rng.random_range(run.difficulty.speed_range()) as f32;
    let base_hp = run.rng.random_range(run.difficulty.hp_range()) as f32;

    let speed = base_speed * variant.speed_mult();
    let hp = (base_hp * variant.hp_mult()).round().max(1.0);

    let id = run.next_entity_id();
    run.enemies.push(Enemy::new(id, variant, pos, hp, speed));
    run.enemies.len() - 1
}

/// Spawn timer tick: `spawn_count` enemies with rolled variants
pub fn spawn_wave(run: &mut RunState) {
    for _ in 0..run.difficulty.spawn_count {
        let roll: f64 = run.rng.random();
        let variant = roll_variant(roll, &run.difficulty);
        spawn_enemy(run, variant);
    }
}

/// The letter secret's reward
pub fn spawn_massive(run: &mut RunState) {
    spawn_enemy(run, EnemyVariant::Massive);
    log::info!("Massive enemy summoned");
    run.events.push(GameEvent::MassiveSpawned);
}
