//! Effective weapon and movement stats
//!
//! Derived from upgrade levels and the selected weapon, then adjusted by god
//! mode and active power-ups. Pure: same inputs, same numbers.

use serde::{Deserialize, Serialize};

use super::state::PowerUpKind;
use crate::consts::MAX_HP;
use crate::progression::{ProgressionState, Upgrades, WeaponKind};

/// Upgrade level every track is treated as while god mode is on
pub const GOD_MODE_LEVEL: u32 = 100;

/// Numbers the run uses for firing and movement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectiveStats {
    pub weapon: WeaponKind,
    pub fire_interval_ms: u64,
    pub damage: f32,
    /// Player move speed, px/s
    pub speed: f32,
    /// Projectile speed, px/s
    pub bullet_speed: f32,
    pub pellets: u32,
    /// Total spread cone in degrees
    pub spread_deg: f32,
    pub bullet_lifetime_ms: u64,
    pub max_hp: f32,
}

struct WeaponProfile {
    base_interval: f64,
    interval_decay: f64,
    min_interval: u64,
    base_damage: f32,
    damage_per_level: f32,
    base_speed: f32,
    bullet_speed: f32,
    pellets: u32,
    spread_deg: f32,
    lifetime_ms: u64,
}

fn profile(weapon: WeaponKind) -> WeaponProfile {
    match weapon {
        WeaponKind::Pistol => WeaponProfile {
            base_interval: 400.0,
            interval_decay: 0.92,
            min_interval: 90,
            base_damage: 10.0,
            damage_per_level: 4.0,
            base_speed: 220.0,
            bullet_speed: 650.0,
            pellets: 1,
            spread_deg: 0.0,
            lifetime_ms: 1200,
        },
        WeaponKind::Shotgun => WeaponProfile {
            base_interval: 700.0,
            interval_decay: 0.94,
            min_interval: 120,
            base_damage: 6.0,
            damage_per_level: 2.5,
            base_speed: 200.0,
            bullet_speed: 550.0,
            pellets: 5,
            spread_deg: 16.0,
            lifetime_ms: 700,
        },
    }
}

const SPEED_PER_LEVEL: f32 = 25.0;

/// Compute effective stats.
///
/// `active` lists the timed power-ups currently running; instant kinds in it
/// are ignored.
pub fn compute_stats(progression: &ProgressionState, active: &[PowerUpKind], god_mode: bool) -> EffectiveStats {
    let weapon = progression.selected_weapon();
    let levels = if god_mode {
        Upgrades::uniform(GOD_MODE_LEVEL)
    } else {
        progression.upgrades
    };
    let p = profile(weapon);

    let interval = (p.base_interval * p.interval_decay.powi(levels.fire_rate as i32)).round() as u64;
    let mut stats = EffectiveStats {
        weapon,
        fire_interval_ms: interval.max(p.min_interval),
        damage: p.base_damage + p.damage_per_level * levels.damage as f32,
        speed: p.base_speed + SPEED_PER_LEVEL * levels.speed as f32,
        bullet_speed: p.bullet_speed,
        pellets: p.pellets,
        spread_deg: p.spread_deg,
        bullet_lifetime_ms: p.lifetime_ms,
        max_hp: MAX_HP,
    };

    if god_mode {
        stats.damage = stats.damage.round();
        stats.speed = stats.speed.round();
    }

    for kind in active {
        match kind {
            PowerUpKind::Damage => stats.damage = (stats.damage * 1.4).round(),
            PowerUpKind::FireRate => {
                stats.fire_interval_ms = ((stats.fire_interval_ms as f64 * 0.7).round() as u64).max(60)
            }
            PowerUpKind::Speed => stats.speed = (stats.speed * 1.5).round(),
            _ => {}
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_levels(damage: u32, fire_rate: u32, speed: u32) -> ProgressionState {
        ProgressionState {
            upgrades: Upgrades {
                damage,
                fire_rate,
                speed,
            },
            ..ProgressionState::default()
        }
    }

    fn shotgun(levels: ProgressionState) -> ProgressionState {
        let mut state = levels;
        state.weapons.get_mut("pistol").unwrap().selected = false;
        let shotgun = state.weapons.get_mut("shotgun").unwrap();
        shotgun.unlocked = true;
        shotgun.selected = true;
        state
    }

    #[test]
    fn pistol_base_stats() {
        let s = compute_stats(&ProgressionState::default(), &[], false);
        assert_eq!(s.weapon, WeaponKind::Pistol);
        assert_eq!(s.fire_interval_ms, 400);
        assert_eq!(s.damage, 10.0);
        assert_eq!(s.speed, 220.0);
        assert_eq!(s.pellets, 1);
        assert_eq!(s.spread_deg, 0.0);
        assert_eq!(s.max_hp, 100.0);
    }

    #[test]
    fn pistol_level_five_fire_rate() {
        let s = compute_stats(&with_levels(0, 5, 0), &[], false);
        assert_eq!(s.fire_interval_ms, 264);
    }

    #[test]
    fn shotgun_base_stats() {
        let s = compute_stats(&shotgun(ProgressionState::default()), &[], false);
        assert_eq!(s.fire_interval_ms, 700);
        assert_eq!(s.damage, 6.0);
        assert_eq!(s.speed, 200.0);
        assert_eq!(s.bullet_speed, 550.0);
        assert_eq!(s.bullet_lifetime_ms, 700);
    }

    #[test]
    fn shotgun_scaling() {
        let s = compute_stats(&shotgun(with_levels(3, 5, 2)), &[], false);
        assert_eq!(s.weapon, WeaponKind::Shotgun);
        assert_eq!(s.fire_interval_ms, 514);
        assert_eq!(s.damage, 13.5);
        assert_eq!(s.speed, 250.0);
        assert_eq!(s.pellets, 5);
        assert_eq!(s.spread_deg, 16.0);
    }

    #[test]
    fn fire_interval_floors() {
        assert_eq!(compute_stats(&with_levels(0, 100, 0), &[], false).fire_interval_ms, 90);
        let s = compute_stats(&shotgun(with_levels(0, 100, 0)), &[], false);
        assert_eq!(s.fire_interval_ms, 120);
    }

    #[test]
    fn god_mode_maxes_every_track() {
        let s = compute_stats(&ProgressionState::default(), &[], true);
        assert_eq!(s.fire_interval_ms, 90);
        assert_eq!(s.damage, 410.0);
        assert_eq!(s.speed, 2720.0);
    }

    #[test]
    fn power_ups_modify_and_round() {
        let active = [PowerUpKind::Damage, PowerUpKind::FireRate, PowerUpKind::Speed];
        let s = compute_stats(&ProgressionState::default(), &active, false);
        assert_eq!(s.damage, 14.0);
        assert_eq!(s.fire_interval_ms, 280);
        assert_eq!(s.speed, 330.0);
    }

    #[test]
    fn fire_rate_power_up_never_below_sixty() {
        let s = compute_stats(&ProgressionState::default(), &[PowerUpKind::FireRate], true);
        assert_eq!(s.fire_interval_ms, 63);
        let s = compute_stats(&with_levels(0, 100, 0), &[PowerUpKind::FireRate], false);
        assert!(s.fire_interval_ms >= 60);
    }

    #[test]
    fn instant_kinds_do_not_change_stats() {
        let base = compute_stats(&ProgressionState::default(), &[], false);
        let s = compute_stats(
            &ProgressionState::default(),
            &[PowerUpKind::Heal, PowerUpKind::Nuke, PowerUpKind::Pierce, PowerUpKind::Akimbo],
            false,
        );
        assert_eq!(s, base);
    }
}
