//! Run state and entity records
//!
//! Everything that belongs to one run lives here. Entities are plain records
//! in id-sorted vectors; behaviour lives in free functions elsewhere in `sim`.

use std::collections::BTreeMap;

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::difficulty::Difficulty;
use super::scheduler::{Scheduler, TimerId, TimerKind};
use super::secrets::SecretCodes;
use super::stats::{EffectiveStats, compute_stats};
use crate::consts::*;
use crate::progression::{ProgressionState, WeaponKind};

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// No run started yet (menu)
    Ready,
    /// Active gameplay
    Playing,
    /// Simulation clock frozen
    Paused,
    /// Run ended, waiting for restart
    GameOver,
}

/// Stable entity identifier, unique within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// The player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub pos: Vec2,
    pub vel: Vec2,
    pub hp: f32,
    /// Facing angle in radians (tracks the aim point)
    pub facing: f32,
    pub radius: f32,
}

impl Player {
    pub fn new(pos: Vec2, hp: f32) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            hp,
            facing: 0.0,
            radius: PLAYER_RADIUS,
        }
    }
}

/// A fired projectile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    pub id: EntityId,
    pub pos: Vec2,
    pub vel: Vec2,
    pub damage: f32,
    /// Extra kills this projectile may pass through
    pub pierce_remaining: u32,
    pub spawned_at_ms: u64,
    pub lifetime_ms: u64,
    pub radius: f32,
    pub alive: bool,
}

/// Enemy archetypes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnemyVariant {
    Normal,
    /// Small, quick, weak; hits lighter but more often
    Fast,
    /// Slow and very tough
    Tank,
    /// Secret-summoned giant
    Massive,
}

/// Contact damage profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDamage {
    pub min: u32,
    pub max: u32,
    /// Player invulnerability after being hit, ms
    pub cooldown_ms: u32,
}

impl EnemyVariant {
    pub fn speed_mult(&self) -> f32 {
        match self {
            EnemyVariant::Normal => 1.0,
            EnemyVariant::Fast => 1.6,
            EnemyVariant::Tank => 0.6,
            EnemyVariant::Massive => 0.3,
        }
    }

    pub fn hp_mult(&self) -> f32 {
        match self {
            EnemyVariant::Normal => 1.0,
            EnemyVariant::Fast => 0.6,
            EnemyVariant::Tank => 10.0,
            EnemyVariant::Massive => 30.0,
        }
    }

    pub fn radius(&self) -> f32 {
        match self {
            EnemyVariant::Normal => 10.0,
            EnemyVariant::Fast => 6.0,
            EnemyVariant::Tank => 14.0,
            EnemyVariant::Massive => 66.0,
        }
    }

    pub fn contact(&self) -> ContactDamage {
        match self {
            EnemyVariant::Fast => ContactDamage {
                min: 3,
                max: 6,
                cooldown_ms: 200,
            },
            _ => ContactDamage {
                min: 6,
                max: 12,
                cooldown_ms: 350,
            },
        }
    }
}

/// An enemy chasing the player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enemy {
    pub id: EntityId,
    pub variant: EnemyVariant,
    pub pos: Vec2,
    pub vel: Vec2,
    pub hp: f32,
    pub speed: f32,
    pub radius: f32,
    pub contact: ContactDamage,
    pub alive: bool,
}

impl Enemy {
    pub fn new(id: EntityId, variant: EnemyVariant, pos: Vec2, hp: f32, speed: f32) -> Self {
        Self {
            id,
            variant,
            pos,
            vel: Vec2::ZERO,
            hp,
            speed,
            radius: variant.radius(),
            contact: variant.contact(),
            alive: true,
        }
    }
}

/// Power-up types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PowerUpKind {
    Damage,
    FireRate,
    Speed,
    Pierce,
    Heal,
    Nuke,
    Akimbo,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 7] = [
        PowerUpKind::Damage,
        PowerUpKind::FireRate,
        PowerUpKind::Speed,
        PowerUpKind::Pierce,
        PowerUpKind::Heal,
        PowerUpKind::Nuke,
        PowerUpKind::Akimbo,
    ];

    /// How long a timed power-up lasts; `None` for instant effects
    pub fn duration_ms(&self) -> Option<u64> {
        match self {
            PowerUpKind::Damage | PowerUpKind::FireRate | PowerUpKind::Pierce | PowerUpKind::Akimbo => {
                Some(8_000)
            }
            PowerUpKind::Speed => Some(6_000),
            PowerUpKind::Heal | PowerUpKind::Nuke => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PowerUpKind::Damage => "Damage Boost",
            PowerUpKind::FireRate => "Haste",
            PowerUpKind::Speed => "Speed Boost",
            PowerUpKind::Pierce => "Piercing Rounds",
            PowerUpKind::Heal => "Medkit",
            PowerUpKind::Nuke => "Nuke",
            PowerUpKind::Akimbo => "Akimbo",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PowerUpKind::Damage => "+40% damage for 8s",
            PowerUpKind::FireRate => "-30% fire interval for 8s",
            PowerUpKind::Speed => "+50% move speed for 6s",
            PowerUpKind::Pierce => "Bullets pierce up to 2 enemies for 8s",
            PowerUpKind::Heal => "+35 HP instantly",
            PowerUpKind::Nuke => "Eliminates all on-screen enemies",
            PowerUpKind::Akimbo => "Shoots forwards and backwards for 8s",
        }
    }
}

/// A power-up lying on the ground
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pickup {
    pub id: EntityId,
    pub kind: PowerUpKind,
    pub pos: Vec2,
    pub spawned_at_ms: u64,
    pub despawn_after_ms: u64,
    pub radius: f32,
    pub alive: bool,
}

/// A running timed power-up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivePowerUp {
    pub expires_at_ms: u64,
    pub timer: TimerId,
}

/// End-of-run numbers shown on the game over screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub coins: u64,
    pub total_kills: u64,
    pub run_kills: u64,
    pub run_ms: u64,
}

/// Things the presentation layer may want to react to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    RunInitialized,
    HudChanged,
    GameOver(RunSummary),
    KillMilestone { threshold: u64 },
    PowerUpCollected { kind: PowerUpKind },
    PowerUpExpired { kind: PowerUpKind },
    DifficultyIncreased { level: u32 },
    ShotFired,
    EnemyHit { pos: Vec2 },
    EnemyKilled { pos: Vec2, variant: EnemyVariant },
    PlayerHurt { damage: u32 },
    MassiveSpawned,
    GodModeActivated,
    GodModeEnded,
}

/// Per-run values taken from the host settings
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Arena (viewport) size in pixels
    pub arena: Vec2,
    pub easter_eggs: bool,
    pub letter_secret: String,
    pub digit_secret: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            arena: Vec2::new(ARENA_WIDTH, ARENA_HEIGHT),
            easter_eggs: true,
            letter_secret: "cbum".to_string(),
            digit_secret: "42".to_string(),
        }
    }
}

/// Ids of the run's standing periodic timers
#[derive(Debug, Clone, Copy)]
pub struct RunTimers {
    pub fire: TimerId,
    pub spawn: TimerId,
    pub difficulty: TimerId,
    pub hud: TimerId,
    pub god_mode: Option<TimerId>,
}

/// Complete state of one run
#[derive(Debug, Clone)]
pub struct RunState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub rng: Pcg32,
    /// Simulation clock (ms since run start, frozen while paused)
    pub now_ms: u64,
    pub phase: GamePhase,
    /// Arena size; the camera is static so this is also the visible area
    pub arena: Vec2,
    pub player: Player,
    /// Current aim point in arena coordinates
    pub aim: Vec2,
    pub fire_held: bool,
    pub projectiles: Vec<Projectile>,
    pub enemies: Vec<Enemy>,
    pub pickups: Vec<Pickup>,
    pub difficulty: Difficulty,
    pub active_power_ups: BTreeMap<PowerUpKind, ActivePowerUp>,
    /// God mode end time, if active
    pub god_mode_until: Option<u64>,
    pub run_kills: u64,
    /// Remaining ms before contact damage can land again
    pub hurt_cooldown_ms: f32,
    pub stats: EffectiveStats,
    pub scheduler: Scheduler,
    pub timers: RunTimers,
    pub secrets: SecretCodes,
    /// Events not yet drained by the host
    pub events: Vec<GameEvent>,
    next_id: u32,
}

impl RunState {
    /// Start a fresh run: full HP, default difficulty, standing timers armed
    pub fn new(seed: u64, config: &RunConfig, progression: &ProgressionState) -> Self {
        let stats = compute_stats(progression, &[], false);
        let difficulty = Difficulty::default();
        let center = config.arena * 0.5;

        let mut scheduler = Scheduler::new();
        let timers = RunTimers {
            fire: scheduler.every(0, stats.fire_interval_ms, TimerKind::Fire),
            spawn: scheduler.every(0, difficulty.spawn_delay_ms, TimerKind::Spawn),
            difficulty: scheduler.every(0, DIFFICULTY_INTERVAL_MS, TimerKind::Difficulty),
            hud: scheduler.every(0, HUD_REFRESH_MS, TimerKind::HudRefresh),
            god_mode: None,
        };

        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            now_ms: 0,
            phase: GamePhase::Playing,
            arena: config.arena,
            player: Player::new(center, stats.max_hp),
            aim: center + Vec2::X,
            fire_held: false,
            projectiles: Vec::new(),
            enemies: Vec::new(),
            pickups: Vec::new(),
            difficulty,
            active_power_ups: BTreeMap::new(),
            god_mode_until: None,
            run_kills: 0,
            hurt_cooldown_ms: 0.0,
            stats,
            scheduler,
            timers,
            secrets: SecretCodes::new(config.easter_eggs, &config.letter_secret, &config.digit_secret),
            events: vec![GameEvent::RunInitialized, GameEvent::HudChanged],
            next_id: 1,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn weapon(&self) -> WeaponKind {
        self.stats.weapon
    }

    pub fn is_power_active(&self, kind: PowerUpKind) -> bool {
        self.active_power_ups
            .get(&kind)
            .is_some_and(|p| p.expires_at_ms > self.now_ms)
    }

    pub fn god_mode_active(&self) -> bool {
        self.god_mode_until.is_some_and(|until| until > self.now_ms)
    }

    /// Active timed power-ups with their remaining time, in kind order
    pub fn power_up_remaining(&self) -> Vec<(PowerUpKind, u64)> {
        self.active_power_ups
            .iter()
            .map(|(kind, p)| (*kind, p.expires_at_ms.saturating_sub(self.now_ms)))
            .collect()
    }

    /// Recompute stats from progression + modifiers and rebuild the fire timer
    pub fn refresh_stats(&mut self, progression: &ProgressionState) {
        let active: Vec<PowerUpKind> = self
            .active_power_ups
            .keys()
            .copied()
            .filter(|kind| self.is_power_active(*kind))
            .collect();
        self.stats = compute_stats(progression, &active, self.god_mode_active());
        self.player.hp = self.player.hp.min(self.stats.max_hp);

        if self.phase != GamePhase::GameOver {
            self.scheduler.cancel(self.timers.fire);
            self.timers.fire = self
                .scheduler
                .every(self.now_ms, self.stats.fire_interval_ms, TimerKind::Fire);
        }
        self.events.push(GameEvent::HudChanged);
    }

    /// Drop destroyed entities, keeping id order
    pub fn compact(&mut self) {
        self.projectiles.retain(|p| p.alive);
        self.enemies.retain(|e| e.alive);
        self.pickups.retain(|p| p.alive);
    }

    pub fn summary(&self, progression: &ProgressionState) -> RunSummary {
        RunSummary {
            coins: progression.coins,
            total_kills: progression.total_kills,
            run_kills: self.run_kills,
            run_ms: self.now_ms,
        }
    }
}
