//! Deterministic run simulation
//!
//! All gameplay rules live here. This module must be pure and deterministic:
//! - Simulation clock advanced only by explicit steps
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod collision;
pub mod combat;
pub mod difficulty;
pub mod scheduler;
pub mod secrets;
pub mod spawn;
pub mod state;
pub mod stats;
pub mod tick;

pub use combat::{HitOutcome, KILL_MILESTONES, KillMilestones, resolve_projectile_hit};
pub use difficulty::Difficulty;
pub use scheduler::{FiredTimer, Scheduler, TimerId, TimerKind};
pub use secrets::{SecretCodes, SecretSequence};
pub use state::{
    ContactDamage, Enemy, EnemyVariant, EntityId, GameEvent, GamePhase, Pickup, Player,
    PowerUpKind, Projectile, RunConfig, RunState, RunSummary,
};
pub use stats::{EffectiveStats, compute_stats};
pub use tick::{TickInput, press_key, tick};
