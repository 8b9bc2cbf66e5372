//! Combat resolution
//!
//! Outcomes of projectile hits and enemy contact, kill rewards, power-up
//! effects and the end of a run. Collision detection itself happens in the
//! tick; these functions only decide what an overlap means.

use std::collections::BTreeSet;

use glam::Vec2;
use rand::Rng;

use super::collision::in_arena;
use super::scheduler::{TimerId, TimerKind};
use super::state::{
    ActivePowerUp, ContactDamage, Enemy, EnemyVariant, GameEvent, GamePhase, Pickup, PowerUpKind,
    Projectile, RunState,
};
use crate::consts::*;
use crate::persistence::Storage;
use crate::progression::{ProgressionState, ProgressionStore};

/// Kill totals that get a one-time announcement per session
pub const KILL_MILESTONES: [u64; 7] = [10, 100, 1_000, 5_000, 10_000, 100_000, 1_000_000];

/// What a projectile hit did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    /// One side was already destroyed
    Ignored,
    /// Enemy survived; the projectile is spent
    Wounded,
    Killed { projectile_survives: bool },
}

/// Apply one projectile hit to one enemy
pub fn resolve_projectile_hit(projectile: &mut Projectile, enemy: &mut Enemy) -> HitOutcome {
    if !projectile.alive || !enemy.alive {
        return HitOutcome::Ignored;
    }

    enemy.hp -= projectile.damage;
    if enemy.hp > 0.0 {
        projectile.alive = false;
        return HitOutcome::Wounded;
    }

    enemy.alive = false;
    if projectile.pierce_remaining > 0 {
        projectile.pierce_remaining -= 1;
    } else {
        projectile.alive = false;
    }
    HitOutcome::Killed {
        projectile_survives: projectile.alive,
    }
}

/// Milestones already announced this session
#[derive(Debug, Clone, Default)]
pub struct KillMilestones {
    shown: BTreeSet<u64>,
}

impl KillMilestones {
    pub fn new() -> Self {
        Self::default()
    }

    /// First threshold reached by `total_kills` and not yet shown, marking it.
    /// Only one is returned even if several were crossed at once.
    pub fn check(&mut self, total_kills: u64) -> Option<u64> {
        let reached = KILL_MILESTONES
            .iter()
            .copied()
            .find(|t| total_kills >= *t && !self.shown.contains(t))?;
        self.shown.insert(reached);
        Some(reached)
    }
}

fn announce_milestone(run: &mut RunState, milestones: &mut KillMilestones, total_kills: u64) {
    if let Some(threshold) = milestones.check(total_kills) {
        log::info!("Kill milestone: {}", threshold);
        run.events.push(GameEvent::KillMilestone { threshold });
    }
}

/// Bookkeeping for one enemy death: drop roll, kill counters, coins
pub fn record_kill<S: Storage>(
    run: &mut RunState,
    store: &mut ProgressionStore<S>,
    milestones: &mut KillMilestones,
    pos: Vec2,
    variant: EnemyVariant,
) {
    run.events.push(GameEvent::EnemyKilled { pos, variant });
    roll_drop(run, pos);

    run.run_kills += 1;
    if !store.add_kills(1) {
        log::warn!("Kill was not saved; lifetime total unchanged");
    }
    announce_milestone(run, milestones, store.state().total_kills);
    if !store.add_coins(COINS_PER_KILL) {
        log::warn!("Kill reward of {} coins was not saved", COINS_PER_KILL);
    }
    run.events.push(GameEvent::HudChanged);
}

/// Maybe leave a random power-up where an enemy died
pub fn roll_drop(run: &mut RunState, pos: Vec2) {
    let roll: f32 = run.rng.random();
    if roll >= PICKUP_DROP_CHANCE {
        return;
    }
    let kind = PowerUpKind::ALL[run.rng.random_range(0..PowerUpKind::ALL.len())];
    spawn_pickup(run, kind, pos);
}

/// Place a pickup that despawns on its own after a while
pub fn spawn_pickup(run: &mut RunState, kind: PowerUpKind, pos: Vec2) {
    let id = run.next_entity_id();
    run.pickups.push(Pickup {
        id,
        kind,
        pos,
        spawned_at_ms: run.now_ms,
        despawn_after_ms: PICKUP_LIFETIME_MS,
        radius: PICKUP_RADIUS,
        alive: true,
    });
    run.scheduler
        .after(run.now_ms, PICKUP_LIFETIME_MS, TimerKind::PickupExpire(id));
}

/// Enemy touched the player. Returns true if damage landed.
pub fn resolve_contact(run: &mut RunState, progression: &ProgressionState, contact: ContactDamage) -> bool {
    if run.hurt_cooldown_ms > 0.0 || run.phase != GamePhase::Playing {
        return false;
    }

    run.hurt_cooldown_ms = contact.cooldown_ms as f32;
    let damage = run.rng.random_range(contact.min..=contact.max.max(contact.min));
    run.player.hp = (run.player.hp - damage as f32).max(0.0);
    run.events.push(GameEvent::PlayerHurt { damage });
    run.events.push(GameEvent::HudChanged);

    if run.player.hp <= 0.0 {
        game_over(run, progression);
    }
    true
}

/// End the run. Idempotent: only the first call emits the summary.
pub fn game_over(run: &mut RunState, progression: &ProgressionState) -> bool {
    if run.phase == GamePhase::GameOver {
        return false;
    }
    run.phase = GamePhase::GameOver;
    run.scheduler.cancel_all();
    run.player.vel = Vec2::ZERO;
    for enemy in &mut run.enemies {
        enemy.vel = Vec2::ZERO;
    }

    let summary = run.summary(progression);
    log::info!(
        "Game over: {} kills this run, {} total, {} coins",
        summary.run_kills,
        summary.total_kills,
        summary.coins
    );
    run.events.push(GameEvent::GameOver(summary));
    true
}

/// Apply a collected power-up
pub fn apply_power_up<S: Storage>(
    run: &mut RunState,
    store: &mut ProgressionStore<S>,
    milestones: &mut KillMilestones,
    kind: PowerUpKind,
) {
    log::debug!("Collected {}", kind.name());
    match kind {
        PowerUpKind::Nuke => nuke(run, store, milestones),
        PowerUpKind::Heal => {
            run.player.hp = (run.player.hp + HEAL_AMOUNT).min(run.stats.max_hp);
            run.events.push(GameEvent::HudChanged);
        }
        timed => {
            let Some(duration) = timed.duration_ms() else {
                return;
            };
            if let Some(previous) = run.active_power_ups.get(&timed) {
                run.scheduler.cancel(previous.timer);
            }
            let timer = run
                .scheduler
                .after(run.now_ms, duration, TimerKind::PowerUpExpire(timed));
            run.active_power_ups.insert(
                timed,
                ActivePowerUp {
                    expires_at_ms: run.now_ms + duration,
                    timer,
                },
            );
            run.refresh_stats(store.state());
        }
    }
    run.events.push(GameEvent::PowerUpCollected { kind });
}

/// Kill every enemy inside the visible area
fn nuke<S: Storage>(run: &mut RunState, store: &mut ProgressionStore<S>, milestones: &mut KillMilestones) {
    let arena = run.arena;
    let mut kills = 0u64;
    for enemy in run.enemies.iter_mut().filter(|e| e.alive && in_arena(e.pos, arena)) {
        enemy.alive = false;
        kills += 1;
        run.events.push(GameEvent::EnemyKilled {
            pos: enemy.pos,
            variant: enemy.variant,
        });
    }
    if kills == 0 {
        return;
    }

    run.run_kills += kills;
    if !store.add_kills(kills) {
        log::warn!("{} nuke kills were not saved; lifetime total unchanged", kills);
    }
    if !store.add_coins(COINS_PER_KILL * kills) {
        log::warn!("Nuke reward of {} coins was not saved", COINS_PER_KILL * kills);
    }
    announce_milestone(run, milestones, store.state().total_kills);
    run.events.push(GameEvent::HudChanged);
}

/// A timed power-up's expiry came due. Stale timers are ignored.
pub fn expire_power_up(run: &mut RunState, progression: &ProgressionState, kind: PowerUpKind, timer: TimerId) {
    let current = run.active_power_ups.get(&kind).is_some_and(|p| p.timer == timer);
    if !current {
        return;
    }
    run.active_power_ups.remove(&kind);
    run.refresh_stats(progression);
    run.events.push(GameEvent::PowerUpExpired { kind });
}

/// Temporary level-100 everything. Re-triggering restarts the window.
pub fn activate_god_mode(run: &mut RunState, progression: &ProgressionState) {
    if let Some(previous) = run.timers.god_mode.take() {
        run.scheduler.cancel(previous);
    }
    run.god_mode_until = Some(run.now_ms + GOD_MODE_DURATION_MS);
    run.timers.god_mode = Some(
        run.scheduler
            .after(run.now_ms, GOD_MODE_DURATION_MS, TimerKind::GodModeExpire),
    );
    log::info!("God mode on for {} ms", GOD_MODE_DURATION_MS);
    run.refresh_stats(progression);
    run.events.push(GameEvent::GodModeActivated);
}

pub fn end_god_mode(run: &mut RunState, progression: &ProgressionState) {
    run.god_mode_until = None;
    run.timers.god_mode = None;
    log::info!("God mode over");
    run.refresh_stats(progression);
    run.events.push(GameEvent::GodModeEnded);
}
