//! Hurdz - top-down arcade survival shooter core
//!
//! Core modules:
//! - `sim`: Deterministic run simulation (entities, difficulty, combat, timers)
//! - `game`: Host-facing facade (commands, fixed-step loop, events, HUD snapshots)
//! - `progression`: Cross-run economy (coins, kills, upgrades, weapon unlocks)
//! - `persistence`: Durable storage for the progression record
//! - `settings`: Host configuration

pub mod game;
pub mod persistence;
pub mod progression;
pub mod settings;
pub mod sim;

pub use game::{Command, Game, HudSnapshot};
pub use progression::{ProgressionState, ProgressionStore, UpgradeKind};
pub use settings::Settings;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep in milliseconds (125 Hz)
    pub const SIM_DT_MS: u64 = 8;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Default arena (viewport) dimensions
    pub const ARENA_WIDTH: f32 = 960.0;
    pub const ARENA_HEIGHT: f32 = 540.0;
    /// Enemies spawn this far inside the arena edge
    pub const SPAWN_MARGIN: f32 = 20.0;

    /// Player defaults
    pub const PLAYER_RADIUS: f32 = 8.0;
    pub const MAX_HP: f32 = 100.0;

    /// Projectiles leave the muzzle this far ahead of the player
    pub const MUZZLE_OFFSET: f32 = 24.0;
    pub const PROJECTILE_RADIUS: f32 = 4.0;
    /// Pierce granted to each projectile while the pierce power-up is active
    pub const PIERCE_COUNT: u32 = 2;

    /// Pickups
    pub const PICKUP_RADIUS: f32 = 9.0;
    pub const PICKUP_DROP_CHANCE: f32 = 0.10;
    pub const PICKUP_LIFETIME_MS: u64 = 12_000;

    /// Reward per kill
    pub const COINS_PER_KILL: u64 = 10;
    /// HP restored by a heal pickup
    pub const HEAL_AMOUNT: f32 = 35.0;

    /// Periodic trigger intervals
    pub const DIFFICULTY_INTERVAL_MS: u64 = 30_000;
    pub const HUD_REFRESH_MS: u64 = 500;
    /// God mode window opened by the digit secret
    pub const GOD_MODE_DURATION_MS: u64 = 15_000;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Angle of the ray from `from` toward `to` (radians, screen coordinates)
#[inline]
pub fn angle_between(from: Vec2, to: Vec2) -> f32 {
    let d = to - from;
    d.y.atan2(d.x)
}

/// Unit vector pointing along `angle`
#[inline]
pub fn unit_from_angle(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}
