//! Time-driven difficulty escalation

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

pub const MAX_SPAWN_COUNT: u32 = 4;
pub const MIN_SPAWN_DELAY_MS: u64 = 500;
pub const MAX_FAST_CHANCE: f64 = 0.25;
pub const MAX_TANK_CHANCE: f64 = 0.15;

/// Spawn pacing and enemy strength for the current difficulty level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Difficulty {
    pub level: u32,
    pub spawn_delay_ms: u64,
    /// Enemies per spawn tick
    pub spawn_count: u32,
    pub zombie_hp_base: u32,
    pub zombie_hp_range: u32,
    pub zombie_speed_base: u32,
    pub speed_range: u32,
    pub fast_chance: f64,
    pub tank_chance: f64,
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl Difficulty {
    /// Values every run starts from
    pub const INITIAL: Difficulty = Difficulty {
        level: 0,
        spawn_delay_ms: 1400,
        spawn_count: 1,
        zombie_hp_base: 12,
        zombie_hp_range: 8,
        zombie_speed_base: 70,
        speed_range: 50,
        fast_chance: 0.03,
        tank_chance: 0.015,
    };

    /// Advance one level. Every field moves toward harder and stays there.
    pub fn escalate(&mut self) {
        self.level += 1;
        if self.level % 2 == 0 && self.spawn_count < MAX_SPAWN_COUNT {
            self.spawn_count += 1;
        }
        self.spawn_delay_ms = ((self.spawn_delay_ms as f64 * 0.92).round() as u64).max(MIN_SPAWN_DELAY_MS);
        self.zombie_hp_base += 2;
        self.zombie_hp_range += 1;
        self.zombie_speed_base += 3;
        self.speed_range += 2;
        self.fast_chance = (self.fast_chance + 0.02).min(MAX_FAST_CHANCE);
        self.tank_chance = (self.tank_chance + 0.01).min(MAX_TANK_CHANCE);
    }

    /// Range enemy base hp is drawn from
    pub fn hp_range(&self) -> RangeInclusive<u32> {
        self.zombie_hp_base..=self.zombie_hp_base + self.zombie_hp_range
    }

    /// Range enemy base speed is drawn from
    pub fn speed_range(&self) -> RangeInclusive<u32> {
        self.zombie_speed_base..=self.zombie_speed_base + self.speed_range
    }
}
