//! Hurdz headless runner
//!
//! Plays one run with the demo autopilot and logs the outcome. Progress is
//! saved as it is earned, so repeated runs keep accumulating coins.
//!
//! Usage: `hurdz [settings.json]`

use hurdz::persistence::JsonFileStorage;
use hurdz::sim::{GameEvent, GamePhase, TickInput};
use hurdz::{Command, Game, Settings, UpgradeKind};

/// Simulated duration of the demo run
const DEMO_DURATION_SECS: f32 = 120.0;
/// Host frame length fed to the fixed-step loop
const FRAME_SECS: f32 = 1.0 / 60.0;

fn main() {
    #[cfg(not(target_arch = "wasm32"))]
    env_logger::init();
    log::info!("Hurdz (headless) starting...");

    let settings = match std::env::args().nth(1) {
        Some(path) => Settings::load(path),
        None => Settings::default(),
    };
    let storage = JsonFileStorage::new(&settings.save_path);
    let mut game = Game::new(settings, storage);

    // Spend whatever the last runs earned, cheapest track first
    loop {
        let cheapest = UpgradeKind::ALL
            .into_iter()
            .filter(|kind| game.store().can_upgrade(*kind))
            .min_by_key(|kind| game.store().upgrade_cost(*kind));
        match cheapest {
            Some(kind) if game.apply(Command::PurchaseUpgrade(kind)) => {}
            _ => break,
        }
    }

    game.apply(Command::StartRun);
    let input = TickInput {
        idle_mode: true,
        ..Default::default()
    };

    let frames = (DEMO_DURATION_SECS / FRAME_SECS) as usize;
    for _ in 0..frames {
        game.update(FRAME_SECS, &input);
        for event in game.drain_events() {
            match event {
                GameEvent::KillMilestone { threshold } => log::info!("Milestone: {} kills", threshold),
                GameEvent::DifficultyIncreased { level } => log::info!("Difficulty level {}", level),
                GameEvent::PowerUpCollected { kind } => {
                    log::info!("{}: {}", kind.name(), kind.description())
                }
                GameEvent::GameOver(summary) => log::info!("Summary: {:?}", summary),
                _ => {}
            }
        }
        if game.phase() == GamePhase::GameOver {
            break;
        }
    }

    let hud = game.snapshot();
    log::info!(
        "Run finished after {:.1}s: {} kills, {} total kills, {} coins, hp {}/{}",
        hud.run_ms as f64 / 1000.0,
        hud.run_kills,
        hud.total_kills,
        hud.coins,
        hud.hp,
        hud.max_hp
    );
    if let Some(e) = game.take_last_error() {
        log::error!("Progress may not have been saved: {}", e);
    }
}
