//! Host-facing game facade
//!
//! Owns the progression store, the current run and the fixed-step loop.
//! The presentation layer sends [`Command`]s and per-frame [`TickInput`],
//! then reads [`HudSnapshot`]s and drains [`GameEvent`]s. It never touches
//! core state directly.

use serde::{Deserialize, Serialize};

use crate::consts::{MAX_SUBSTEPS, SIM_DT_MS};
use crate::persistence::{PersistenceError, Storage};
use crate::progression::{ProgressionState, ProgressionStore, UpgradeKind, WeaponKind};
use crate::settings::Settings;
use crate::sim::{
    GameEvent, GamePhase, KillMilestones, PowerUpKind, RunConfig, RunState, TickInput, compute_stats, tick,
};

/// Longest frame fed to the accumulator, seconds
const MAX_FRAME_SECS: f32 = 0.1;

/// User intents that are not per-frame input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    StartRun,
    RestartRun,
    Pause,
    Resume,
    /// Ignored while the game over screen is up
    TogglePause,
    PurchaseUpgrade(UpgradeKind),
    UnlockWeapon { id: String, cost: u64 },
    SelectWeapon(String),
    ResetAllProgress,
}

/// Everything the HUD shows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HudSnapshot {
    pub phase: GamePhase,
    pub hp: f32,
    pub max_hp: f32,
    pub coins: u64,
    pub total_kills: u64,
    pub run_kills: u64,
    pub weapon: WeaponKind,
    pub fire_interval_ms: u64,
    /// Active timed power-ups and their remaining ms
    pub power_ups: Vec<(PowerUpKind, u64)>,
    pub god_mode_remaining_ms: Option<u64>,
    /// Run time excluding pauses
    pub run_ms: u64,
    pub difficulty_level: u32,
}

/// Wall-clock run timer that excludes paused time
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunClock {
    started_at_ms: f64,
    paused_accum_ms: f64,
    paused_at_ms: Option<f64>,
    stopped_at_ms: Option<f64>,
}

impl RunClock {
    pub fn start(now_ms: f64) -> Self {
        Self {
            started_at_ms: now_ms,
            ..Self::default()
        }
    }

    pub fn pause(&mut self, now_ms: f64) {
        if self.paused_at_ms.is_none() {
            self.paused_at_ms = Some(now_ms);
        }
    }

    pub fn resume(&mut self, now_ms: f64) {
        if let Some(at) = self.paused_at_ms.take() {
            self.paused_accum_ms += now_ms - at;
        }
    }

    /// Freeze the clock (game over)
    pub fn stop(&mut self, now_ms: f64) {
        self.stopped_at_ms.get_or_insert(now_ms);
    }

    pub fn elapsed_ms(&self, now_ms: f64) -> f64 {
        let now = self.stopped_at_ms.map_or(now_ms, |at| at.min(now_ms));
        let paused_now = self.paused_at_ms.map_or(0.0, |at| (now - at).max(0.0));
        (now - self.started_at_ms - self.paused_accum_ms - paused_now).max(0.0)
    }
}

/// The game: progression, current run and loop timing
#[derive(Debug)]
pub struct Game<S: Storage> {
    settings: Settings,
    config: RunConfig,
    store: ProgressionStore<S>,
    run: Option<RunState>,
    milestones: KillMilestones,
    clock: RunClock,
    /// Host wall time, ms
    wall_ms: f64,
    accumulator_ms: f64,
    /// Typed keys waiting for the next substep
    pending_keys: String,
    seed: u64,
    runs_started: u64,
    events: Vec<GameEvent>,
}

impl<S: Storage> Game<S> {
    /// Load progression from `storage` and wait in the menu
    pub fn new(settings: Settings, storage: S) -> Self {
        let store = ProgressionStore::load(storage);
        let seed = settings.seed.unwrap_or_else(rand::random);
        Self {
            config: settings.run_config(),
            settings,
            store,
            run: None,
            milestones: KillMilestones::new(),
            clock: RunClock::default(),
            wall_ms: 0.0,
            accumulator_ms: 0.0,
            pending_keys: String::new(),
            seed,
            runs_started: 0,
            events: Vec::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn progression(&self) -> &ProgressionState {
        self.store.state()
    }

    pub fn store(&self) -> &ProgressionStore<S> {
        &self.store
    }

    /// The current run, if one was started
    pub fn run(&self) -> Option<&RunState> {
        self.run.as_ref()
    }

    pub fn phase(&self) -> GamePhase {
        self.run.as_ref().map_or(GamePhase::Ready, |r| r.phase)
    }

    /// Most recent save failure, if any
    pub fn take_last_error(&mut self) -> Option<PersistenceError> {
        self.store.take_last_error()
    }

    /// Apply a command. Returns false when it was refused or had no effect.
    pub fn apply(&mut self, command: Command) -> bool {
        match command {
            Command::StartRun => {
                if self.run.is_some() {
                    log::debug!("Run already started");
                    return false;
                }
                self.begin_run();
                true
            }
            Command::RestartRun => {
                self.begin_run();
                true
            }
            Command::Pause => self.pause(),
            Command::Resume => self.resume(),
            Command::TogglePause => match self.phase() {
                GamePhase::Playing => self.pause(),
                GamePhase::Paused => self.resume(),
                _ => false,
            },
            Command::PurchaseUpgrade(kind) => {
                let bought = self.store.apply_upgrade(kind);
                self.progression_changed(bought)
            }
            Command::UnlockWeapon { id, cost } => {
                let unlocked = self.store.unlock_weapon(&id, cost);
                self.progression_changed(unlocked)
            }
            Command::SelectWeapon(id) => {
                let selected = self.store.select_weapon(&id);
                self.progression_changed(selected)
            }
            Command::ResetAllProgress => {
                let reset = self.store.reset_all_progress();
                self.progression_changed(reset)
            }
        }
    }

    fn begin_run(&mut self) {
        self.absorb_run_events();
        self.runs_started += 1;
        let seed = self
            .seed
            .wrapping_add(self.runs_started.wrapping_mul(0x9E37_79B9_7F4A_7C15));
        self.run = Some(RunState::new(seed, &self.config, self.store.state()));
        self.clock = RunClock::start(self.wall_ms);
        self.accumulator_ms = 0.0;
        self.pending_keys.clear();
        log::info!("Run {} started (seed {})", self.runs_started, seed);
    }

    fn pause(&mut self) -> bool {
        let Some(run) = self.run.as_mut().filter(|r| r.phase == GamePhase::Playing) else {
            return false;
        };
        run.phase = GamePhase::Paused;
        run.events.push(GameEvent::HudChanged);
        self.clock.pause(self.wall_ms);
        log::debug!("Paused");
        true
    }

    fn resume(&mut self) -> bool {
        let Some(run) = self.run.as_mut().filter(|r| r.phase == GamePhase::Paused) else {
            return false;
        };
        run.phase = GamePhase::Playing;
        run.events.push(GameEvent::HudChanged);
        self.clock.resume(self.wall_ms);
        self.accumulator_ms = 0.0;
        log::debug!("Resumed");
        true
    }

    /// Recompute run stats after a successful progression change
    fn progression_changed(&mut self, changed: bool) -> bool {
        if changed {
            match self.run.as_mut() {
                Some(run) => run.refresh_stats(self.store.state()),
                None => self.events.push(GameEvent::HudChanged),
            }
        }
        changed
    }

    /// Advance by one host frame of `dt_secs`, in fixed substeps
    pub fn update(&mut self, dt_secs: f32, input: &TickInput) {
        let dt = dt_secs.max(0.0);
        self.wall_ms += dt as f64 * 1000.0;

        let mut input = input.clone();
        if input.pause {
            self.apply(Command::TogglePause);
            input.pause = false;
        }
        if self.phase() != GamePhase::Playing {
            self.accumulator_ms = 0.0;
            return;
        }

        self.pending_keys.push_str(&input.typed);
        input.fire_held |= self.settings.auto_fire;
        self.accumulator_ms += dt.min(MAX_FRAME_SECS) as f64 * 1000.0;

        let mut substeps = 0;
        while self.accumulator_ms >= SIM_DT_MS as f64 && substeps < MAX_SUBSTEPS {
            input.typed = std::mem::take(&mut self.pending_keys);
            self.step(&input, SIM_DT_MS);
            self.accumulator_ms -= SIM_DT_MS as f64;
            substeps += 1;

            if self.phase() != GamePhase::Playing {
                self.accumulator_ms = 0.0;
                break;
            }
        }
        if substeps == MAX_SUBSTEPS {
            self.accumulator_ms = self.accumulator_ms.min(SIM_DT_MS as f64);
        }
    }

    /// Run exactly one simulation step of `dt_ms`. Does not advance wall time.
    pub fn step(&mut self, input: &TickInput, dt_ms: u64) {
        let Some(run) = self.run.as_mut() else {
            return;
        };
        let before = run.phase;
        tick(run, &mut self.store, &mut self.milestones, input, dt_ms);

        match (before, run.phase) {
            (GamePhase::Playing, GamePhase::Paused) => self.clock.pause(self.wall_ms),
            (GamePhase::Paused, GamePhase::Playing) => self.clock.resume(self.wall_ms),
            (b, GamePhase::GameOver) if b != GamePhase::GameOver => self.clock.stop(self.wall_ms),
            _ => {}
        }
    }

    /// Run time so far, excluding pauses
    pub fn run_ms(&self) -> u64 {
        if self.run.is_none() {
            return 0;
        }
        self.clock.elapsed_ms(self.wall_ms).round() as u64
    }

    pub fn snapshot(&self) -> HudSnapshot {
        let progression = self.store.state();
        match &self.run {
            Some(run) => HudSnapshot {
                phase: run.phase,
                hp: run.player.hp,
                max_hp: run.stats.max_hp,
                coins: progression.coins,
                total_kills: progression.total_kills,
                run_kills: run.run_kills,
                weapon: run.stats.weapon,
                fire_interval_ms: run.stats.fire_interval_ms,
                power_ups: run.power_up_remaining(),
                god_mode_remaining_ms: run.god_mode_until.map(|until| until.saturating_sub(run.now_ms)),
                run_ms: self.run_ms(),
                difficulty_level: run.difficulty.level,
            },
            None => {
                let stats = compute_stats(progression, &[], false);
                HudSnapshot {
                    phase: GamePhase::Ready,
                    hp: stats.max_hp,
                    max_hp: stats.max_hp,
                    coins: progression.coins,
                    total_kills: progression.total_kills,
                    run_kills: 0,
                    weapon: stats.weapon,
                    fire_interval_ms: stats.fire_interval_ms,
                    power_ups: Vec::new(),
                    god_mode_remaining_ms: None,
                    run_ms: 0,
                    difficulty_level: 0,
                }
            }
        }
    }

    fn absorb_run_events(&mut self) {
        if let Some(run) = self.run.as_mut() {
            self.events.append(&mut run.events);
        }
    }

    /// Take every event emitted since the last drain, oldest first
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.absorb_run_events();
        std::mem::take(&mut self.events)
    }
}
