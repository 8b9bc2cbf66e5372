//! Fixed timestep simulation tick
//!
//! Advances a run deterministically: timers due within the step fire in
//! order at their own instants, then bodies move, then overlaps resolve.

use std::f32::consts::PI;

use glam::Vec2;
use rand::Rng;

use super::collision::{circles_overlap, clamp_to_arena, nearest};
use super::combat::{
    HitOutcome, KillMilestones, activate_god_mode, apply_power_up, end_god_mode, expire_power_up,
    record_kill, resolve_contact, resolve_projectile_hit,
};
use super::scheduler::{FiredTimer, TimerKind};
use super::secrets::SecretMatch;
use super::spawn::{spawn_massive, spawn_wave};
use super::state::{GameEvent, GamePhase, PowerUpKind, Projectile, RunState};
use crate::consts::*;
use crate::persistence::Storage;
use crate::progression::{ProgressionState, ProgressionStore};
use crate::{angle_between, normalize_angle, unit_from_angle};

/// Autopilot backs away from enemies closer than this
const AUTOPILOT_SAFE_DISTANCE: f32 = 160.0;
/// Autopilot stops drifting when this close to the arena center
const AUTOPILOT_CENTER_SLACK: f32 = 40.0;

/// Input intents for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Movement intent; summed axes, normalized before use
    pub move_axis: Vec2,
    /// Aim point in arena coordinates (mouse position)
    pub aim: Option<Vec2>,
    /// Fire on each fire-timer tick while held
    pub fire_held: bool,
    /// Keys typed since the last tick
    pub typed: String,
    /// Pause toggle
    pub pause: bool,
    /// Idle/demo mode - autopilot plays the run
    pub idle_mode: bool,
}

/// Advance the run by `dt_ms` of simulation time
pub fn tick<S: Storage>(
    run: &mut RunState,
    store: &mut ProgressionStore<S>,
    milestones: &mut KillMilestones,
    input: &TickInput,
    dt_ms: u64,
) {
    if input.pause {
        match run.phase {
            GamePhase::Playing => {
                run.phase = GamePhase::Paused;
                return;
            }
            GamePhase::Paused => run.phase = GamePhase::Playing,
            _ => {}
        }
    }

    if run.phase != GamePhase::Playing {
        return;
    }

    let mut input = input.clone();
    if input.idle_mode {
        autopilot(run, &mut input);
    }
    if let Some(aim) = input.aim {
        run.aim = aim;
    }
    run.fire_held = input.fire_held;

    for ch in input.typed.chars() {
        press_key(run, store.state(), ch);
    }

    let target = run.now_ms + dt_ms;
    while let Some(fired) = run.scheduler.pop_due(target) {
        run.now_ms = run.now_ms.max(fired.at_ms);
        dispatch_timer(run, store, fired);
    }
    run.now_ms = target;

    move_bodies(run, input.move_axis, dt_ms as f32);
    resolve_overlaps(run, store, milestones);
    run.compact();
}

/// Feed one typed key to the secret buffers
pub fn press_key(run: &mut RunState, progression: &ProgressionState, ch: char) {
    match run.secrets.press(ch) {
        Some(SecretMatch::Letters) => spawn_massive(run),
        Some(SecretMatch::Digits) => activate_god_mode(run, progression),
        None => {}
    }
}

fn dispatch_timer<S: Storage>(run: &mut RunState, store: &mut ProgressionStore<S>, fired: FiredTimer) {
    match fired.kind {
        TimerKind::Fire => {
            if run.fire_held {
                fire(run);
            }
        }
        TimerKind::Spawn => spawn_wave(run),
        TimerKind::Difficulty => escalate(run),
        TimerKind::HudRefresh => run.events.push(GameEvent::HudChanged),
        TimerKind::ProjectileExpire(id) => {
            if let Some(p) = run.projectiles.iter_mut().find(|p| p.id == id) {
                p.alive = false;
            }
        }
        TimerKind::PickupExpire(id) => {
            if let Some(p) = run.pickups.iter_mut().find(|p| p.id == id) {
                p.alive = false;
            }
        }
        TimerKind::PowerUpExpire(kind) => expire_power_up(run, store.state(), kind, fired.id),
        TimerKind::GodModeExpire => {
            if run.timers.god_mode == Some(fired.id) {
                end_god_mode(run, store.state());
            }
        }
    }
}

/// Raise difficulty and rebuild the spawn timer at the new delay
fn escalate(run: &mut RunState) {
    run.difficulty.escalate();
    run.scheduler.cancel(run.timers.spawn);
    run.timers.spawn = run
        .scheduler
        .every(run.now_ms, run.difficulty.spawn_delay_ms, TimerKind::Spawn);
    log::info!(
        "MAKE IT HARDER: level {}, spawn every {} ms x{}",
        run.difficulty.level,
        run.difficulty.spawn_delay_ms,
        run.difficulty.spawn_count
    );
    run.events.push(GameEvent::DifficultyIncreased {
        level: run.difficulty.level,
    });
}

/// One volley toward the aim point
fn fire(run: &mut RunState) {
    let base = angle_between(run.player.pos, run.aim);
    let spread = run.stats.spread_deg.to_radians();
    let akimbo = run.is_power_active(PowerUpKind::Akimbo);
    let pierce = if run.is_power_active(PowerUpKind::Pierce) {
        PIERCE_COUNT
    } else {
        0
    };

    for _ in 0..run.stats.pellets {
        let offset = if spread > 0.0 {
            (run.rng.random::<f32>() - 0.5) * spread
        } else {
            0.0
        };
        let angle = base + offset;
        spawn_projectile(run, angle, pierce);
        if akimbo {
            spawn_projectile(run, normalize_angle(angle + PI), pierce);
        }
    }
    run.events.push(GameEvent::ShotFired);
}

fn spawn_projectile(run: &mut RunState, angle: f32, pierce: u32) {
    let dir = unit_from_angle(angle);
    let id = run.next_entity_id();
    let lifetime_ms = run.stats.bullet_lifetime_ms;
    run.projectiles.push(Projectile {
        id,
        pos: run.player.pos + dir * MUZZLE_OFFSET,
        vel: dir * run.stats.bullet_speed,
        damage: run.stats.damage,
        pierce_remaining: pierce,
        spawned_at_ms: run.now_ms,
        lifetime_ms,
        radius: PROJECTILE_RADIUS,
        alive: true,
    });
    run.scheduler
        .after(run.now_ms, lifetime_ms, TimerKind::ProjectileExpire(id));
}

fn move_bodies(run: &mut RunState, move_axis: Vec2, dt_ms: f32) {
    let dt = dt_ms / 1000.0;

    let player = &mut run.player;
    player.vel = move_axis.normalize_or_zero() * run.stats.speed;
    player.pos = clamp_to_arena(player.pos + player.vel * dt, player.radius, run.arena);
    player.facing = angle_between(player.pos, run.aim);

    // Straight pursuit
    let target = player.pos;
    for enemy in run.enemies.iter_mut().filter(|e| e.alive) {
        enemy.vel = (target - enemy.pos).normalize_or_zero() * enemy.speed;
        enemy.pos += enemy.vel * dt;
    }

    for projectile in run.projectiles.iter_mut().filter(|p| p.alive) {
        projectile.pos += projectile.vel * dt;
    }

    run.hurt_cooldown_ms = (run.hurt_cooldown_ms - dt_ms).max(0.0);
}

fn resolve_overlaps<S: Storage>(
    run: &mut RunState,
    store: &mut ProgressionStore<S>,
    milestones: &mut KillMilestones,
) {
    // Projectiles vs enemies, in id order
    let mut kills = Vec::new();
    for projectile in run.projectiles.iter_mut() {
        for enemy in run.enemies.iter_mut() {
            if !projectile.alive {
                break;
            }
            if !enemy.alive || !circles_overlap(projectile.pos, projectile.radius, enemy.pos, enemy.radius) {
                continue;
            }
            match resolve_projectile_hit(projectile, enemy) {
                HitOutcome::Wounded => run.events.push(GameEvent::EnemyHit { pos: enemy.pos }),
                HitOutcome::Killed { .. } => kills.push((enemy.pos, enemy.variant)),
                HitOutcome::Ignored => {}
            }
        }
    }
    for (pos, variant) in kills {
        record_kill(run, store, milestones, pos, variant);
    }

    // Enemies vs player
    if run.hurt_cooldown_ms <= 0.0 {
        let player = &run.player;
        let contact = run
            .enemies
            .iter()
            .find(|e| e.alive && circles_overlap(e.pos, e.radius, player.pos, player.radius))
            .map(|e| e.contact);
        if let Some(contact) = contact {
            resolve_contact(run, store.state(), contact);
        }
    }
    if run.phase != GamePhase::Playing {
        return;
    }

    // Player vs pickups
    let (pos, radius) = (run.player.pos, run.player.radius);
    let mut collected = Vec::new();
    for pickup in run.pickups.iter_mut().filter(|p| p.alive) {
        if circles_overlap(pos, radius, pickup.pos, pickup.radius) {
            pickup.alive = false;
            collected.push(pickup.kind);
        }
    }
    for kind in collected {
        apply_power_up(run, store, milestones, kind);
    }
}

/// Demo play: aim at the nearest enemy, grab pickups, keep distance
fn autopilot(run: &RunState, input: &mut TickInput) {
    let pos = run.player.pos;
    let enemy = nearest(pos, run.enemies.iter().filter(|e| e.alive).map(|e| e.pos)).map(|(_, p)| p);
    let pickup = nearest(pos, run.pickups.iter().filter(|p| p.alive).map(|p| p.pos)).map(|(_, p)| p);

    if let Some(target) = enemy {
        input.aim = Some(target);
    }
    input.fire_held = true;

    let center = run.arena * 0.5;
    input.move_axis = match (pickup, enemy) {
        (Some(goal), _) => goal - pos,
        (None, Some(threat)) if pos.distance(threat) < AUTOPILOT_SAFE_DISTANCE => {
            // Flee, but bias back toward the middle so we don't pin ourselves to a wall
            (pos - threat).normalize_or_zero() + (center - pos).normalize_or_zero() * 0.5
        }
        _ if pos.distance(center) > AUTOPILOT_CENTER_SLACK => center - pos,
        _ => Vec2::ZERO,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStorage;
    use crate::sim::combat::spawn_pickup;
    use crate::sim::state::{Enemy, EnemyVariant, EntityId, RunConfig};
    use proptest::prelude::*;

    struct Harness {
        run: RunState,
        store: ProgressionStore<MemoryStorage>,
        milestones: KillMilestones,
    }

    impl Harness {
        fn new(seed: u64) -> Self {
            let store = ProgressionStore::load(MemoryStorage::new());
            let run = RunState::new(seed, &RunConfig::default(), store.state());
            Self {
                run,
                store,
                milestones: KillMilestones::new(),
            }
        }

        fn step(&mut self, input: &TickInput) {
            tick(&mut self.run, &mut self.store, &mut self.milestones, input, SIM_DT_MS);
        }

        /// Advance with enemies cleared every step so the player survives
        fn advance_safely(&mut self, ms: u64, input: &TickInput) {
            for _ in 0..ms / SIM_DT_MS {
                self.run.enemies.clear();
                self.step(input);
            }
        }

        fn add_enemy(&mut self, pos: Vec2, hp: f32) -> EntityId {
            let id = self.run.next_entity_id();
            self.run.enemies.push(Enemy::new(id, EnemyVariant::Normal, pos, hp, 0.0));
            id
        }
    }

    fn holding_fire() -> TickInput {
        TickInput {
            fire_held: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_tick_pause() {
        let mut h = Harness::new(1);
        h.step(&TickInput::default());
        let now = h.run.now_ms;

        let pause = TickInput {
            pause: true,
            ..Default::default()
        };
        h.step(&pause);
        assert_eq!(h.run.phase, GamePhase::Paused);
        h.step(&TickInput::default());
        assert_eq!(h.run.now_ms, now);

        h.step(&pause);
        assert_eq!(h.run.phase, GamePhase::Playing);
        assert_eq!(h.run.now_ms, now + SIM_DT_MS);
    }

    #[test]
    fn test_fire_timer_needs_fire_held() {
        let mut h = Harness::new(1);
        h.advance_safely(400, &TickInput::default());
        assert!(h.run.projectiles.is_empty());

        h.advance_safely(400, &holding_fire());
        assert_eq!(h.run.projectiles.len(), 1);
        let p = &h.run.projectiles[0];
        assert_eq!(p.damage, 10.0);
        assert_eq!(p.pierce_remaining, 0);
        assert!(p.vel.x > 0.0);
    }

    #[test]
    fn test_projectile_expires_after_lifetime() {
        let mut h = Harness::new(1);
        fire(&mut h.run);
        assert_eq!(h.run.projectiles.len(), 1);
        h.advance_safely(1192, &TickInput::default());
        assert_eq!(h.run.projectiles.len(), 1);
        h.advance_safely(8, &TickInput::default());
        assert!(h.run.projectiles.is_empty());
    }

    #[test]
    fn test_shotgun_volley_spreads() {
        let mut h = Harness::new(4);
        h.store.add_coins(200);
        h.store.unlock_weapon("shotgun", 200);
        h.store.select_weapon("shotgun");
        h.run.refresh_stats(h.store.state());

        fire(&mut h.run);
        assert_eq!(h.run.projectiles.len(), 5);
        let half_spread = 8f32.to_radians() + 1e-4;
        for p in &h.run.projectiles {
            assert!(p.vel.y.atan2(p.vel.x).abs() <= half_spread);
            assert_eq!(p.lifetime_ms, 700);
        }
    }

    #[test]
    fn test_akimbo_and_pierce_volley() {
        let mut h = Harness::new(4);
        apply_power_up(&mut h.run, &mut h.store, &mut h.milestones, PowerUpKind::Akimbo);
        apply_power_up(&mut h.run, &mut h.store, &mut h.milestones, PowerUpKind::Pierce);
        fire(&mut h.run);
        assert_eq!(h.run.projectiles.len(), 2);
        assert!(h.run.projectiles[0].vel.x > 0.0);
        assert!(h.run.projectiles[1].vel.x < 0.0);
        assert!(h.run.projectiles.iter().all(|p| p.pierce_remaining == PIERCE_COUNT));
    }

    #[test]
    fn test_spawn_timer() {
        let mut h = Harness::new(2);
        for _ in 0..(1392 / SIM_DT_MS) {
            h.step(&TickInput::default());
        }
        assert!(h.run.enemies.is_empty());
        h.step(&TickInput::default());
        assert_eq!(h.run.enemies.len(), 1);
    }

    #[test]
    fn test_difficulty_escalates_and_rebuilds_spawn_timer() {
        let mut h = Harness::new(3);
        h.advance_safely(DIFFICULTY_INTERVAL_MS, &TickInput::default());
        assert_eq!(h.run.difficulty.level, 1);
        assert_eq!(h.run.difficulty.spawn_delay_ms, 1288);
        assert_eq!(h.run.scheduler.len(), 4);
        assert!(
            h.run
                .events
                .contains(&GameEvent::DifficultyIncreased { level: 1 })
        );
    }

    #[test]
    fn test_kill_through_collision() {
        let mut h = Harness::new(5);
        let enemy_pos = Vec2::new(100.0, 100.0);
        h.add_enemy(enemy_pos, 5.0);
        let id = h.run.next_entity_id();
        h.run.projectiles.push(Projectile {
            id,
            pos: enemy_pos,
            vel: Vec2::ZERO,
            damage: 10.0,
            pierce_remaining: 0,
            spawned_at_ms: 0,
            lifetime_ms: 1200,
            radius: PROJECTILE_RADIUS,
            alive: true,
        });

        h.step(&TickInput::default());
        assert!(h.run.enemies.is_empty());
        assert!(h.run.projectiles.is_empty());
        assert_eq!(h.run.run_kills, 1);
        assert_eq!(h.store.state().total_kills, 1);
        assert_eq!(h.store.state().coins, 10);
    }

    #[test]
    fn test_contact_damage_and_game_over() {
        let mut h = Harness::new(6);
        let at_player = h.run.player.pos;
        h.add_enemy(at_player, 50.0);

        h.step(&TickInput::default());
        assert!(h.run.player.hp < MAX_HP);
        assert!(h.run.hurt_cooldown_ms > 0.0);

        h.run.player.hp = 1.0;
        h.run.hurt_cooldown_ms = 0.0;
        h.step(&TickInput::default());
        assert_eq!(h.run.phase, GamePhase::GameOver);

        let frozen = h.run.now_ms;
        h.step(&TickInput::default());
        assert_eq!(h.run.now_ms, frozen);
        let overs = h
            .run
            .events
            .iter()
            .filter(|e| matches!(e, GameEvent::GameOver(_)))
            .count();
        assert_eq!(overs, 1);
    }

    #[test]
    fn test_pickup_collected_and_expires() {
        let mut h = Harness::new(7);
        let on_player = h.run.player.pos;
        spawn_pickup(&mut h.run, PowerUpKind::Speed, on_player);
        h.step(&TickInput::default());
        assert!(h.run.pickups.is_empty());
        assert!(h.run.is_power_active(PowerUpKind::Speed));
        assert_eq!(h.run.stats.speed, 330.0);

        h.advance_safely(6_000, &TickInput::default());
        assert!(!h.run.is_power_active(PowerUpKind::Speed));
        assert_eq!(h.run.stats.speed, 220.0);

        let far = Vec2::new(50.0, 50.0);
        spawn_pickup(&mut h.run, PowerUpKind::Heal, far);
        h.advance_safely(PICKUP_LIFETIME_MS - SIM_DT_MS, &TickInput::default());
        assert_eq!(h.run.pickups.len(), 1);
        h.advance_safely(SIM_DT_MS, &TickInput::default());
        assert!(h.run.pickups.is_empty());
    }

    #[test]
    fn test_god_mode_window() {
        let mut h = Harness::new(8);
        let typed = TickInput {
            typed: "42".to_string(),
            ..Default::default()
        };
        h.step(&typed);
        let start = h.run.now_ms - SIM_DT_MS;
        assert!(h.run.god_mode_active());
        assert_eq!(h.run.stats.damage, 410.0);
        assert_eq!(h.run.stats.fire_interval_ms, 90);
        assert_eq!(h.run.stats.speed, 2720.0);

        let until = start + GOD_MODE_DURATION_MS;
        while h.run.now_ms + SIM_DT_MS < until {
            h.run.enemies.clear();
            h.step(&TickInput::default());
        }
        assert!(h.run.god_mode_active());
        h.step(&TickInput::default());
        assert!(!h.run.god_mode_active());
        assert_eq!(h.run.stats.damage, 10.0);
        assert_eq!(h.run.stats.fire_interval_ms, 400);
        assert_eq!(h.run.stats.speed, 220.0);
        assert!(h.run.events.contains(&GameEvent::GodModeEnded));
    }

    #[test]
    fn test_letter_secret_spawns_massive() {
        let mut h = Harness::new(9);
        let typed = TickInput {
            typed: "CBUM".to_string(),
            ..Default::default()
        };
        h.step(&typed);
        assert_eq!(h.run.enemies.len(), 1);
        assert_eq!(h.run.enemies[0].variant, EnemyVariant::Massive);
    }

    #[test]
    fn test_enemies_pursue_player() {
        let mut h = Harness::new(10);
        let start = Vec2::new(100.0, 270.0);
        h.add_enemy(start, 50.0);
        h.run.enemies[0].speed = 100.0;
        h.step(&TickInput::default());
        let moved = h.run.enemies[0].pos;
        assert!(moved.x > start.x);
        assert!((moved.distance(start) - 0.8).abs() < 1e-3);
    }

    #[test]
    fn test_player_movement_normalized_and_clamped() {
        let mut h = Harness::new(11);
        let start = h.run.player.pos;
        let diagonal = TickInput {
            move_axis: Vec2::new(1.0, 1.0),
            ..Default::default()
        };
        h.step(&diagonal);
        let travelled = h.run.player.pos.distance(start);
        assert!((travelled - 220.0 * 0.008).abs() < 1e-3);

        h.run.player.pos = Vec2::new(2.0, 2.0);
        h.step(&TickInput {
            move_axis: Vec2::new(-1.0, -1.0),
            ..Default::default()
        });
        assert_eq!(h.run.player.pos, Vec2::splat(PLAYER_RADIUS));
    }

    #[test]
    fn test_autopilot_targets_nearest_enemy() {
        let mut h = Harness::new(12);
        let near = h.run.player.pos + Vec2::new(50.0, 0.0);
        h.add_enemy(near, 50.0);
        h.add_enemy(Vec2::new(20.0, 20.0), 50.0);

        let mut input = TickInput {
            idle_mode: true,
            ..Default::default()
        };
        autopilot(&h.run, &mut input);
        assert_eq!(input.aim, Some(near));
        assert!(input.fire_held);
        assert!(input.move_axis.x < 0.0);
    }

    #[test]
    fn test_determinism() {
        let mut a = Harness::new(99999);
        let mut b = Harness::new(99999);
        let input = TickInput {
            idle_mode: true,
            ..Default::default()
        };
        for _ in 0..(20_000 / SIM_DT_MS) {
            a.step(&input);
            b.step(&input);
        }
        assert_eq!(a.run.now_ms, b.run.now_ms);
        assert_eq!(a.run.run_kills, b.run.run_kills);
        assert_eq!(a.run.player.hp, b.run.player.hp);
        assert_eq!(a.run.enemies.len(), b.run.enemies.len());
        for (x, y) in a.run.enemies.iter().zip(&b.run.enemies) {
            assert_eq!(x.id, y.id);
            assert_eq!(x.pos, y.pos);
        }
        assert_eq!(a.run.events, b.run.events);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn run_invariants_hold(
            seed in any::<u64>(),
            moves in proptest::collection::vec((-1.0f32..1.0, -1.0f32..1.0, any::<bool>()), 50..400),
        ) {
            let mut h = Harness::new(seed);
            let mut last_kills = 0;
            for (x, y, fire) in moves {
                let input = TickInput {
                    move_axis: Vec2::new(x, y),
                    fire_held: fire,
                    aim: Some(Vec2::new(480.0 + x * 300.0, 270.0 + y * 200.0)),
                    ..Default::default()
                };
                h.step(&input);
                prop_assert!(h.run.player.hp >= 0.0 && h.run.player.hp <= h.run.stats.max_hp);
                prop_assert!(h.run.run_kills >= last_kills);
                last_kills = h.run.run_kills;
                prop_assert!(h.run.stats.fire_interval_ms >= 60);
                prop_assert!(h.run.enemies.iter().all(|e| e.alive));
                let ids: Vec<_> = h.run.enemies.iter().map(|e| e.id).collect();
                prop_assert!(ids.windows(2).all(|w| w[0] < w[1]));
            }
        }
    }
}
