//! Host settings
//!
//! Persisted as JSON next to the save file. Any missing field takes its
//! default, so old settings files keep loading as fields are added.

use std::fs;
use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::{ARENA_HEIGHT, ARENA_WIDTH};
use crate::persistence::{PersistenceResult, SAVE_FILE_NAME};
use crate::sim::RunConfig;

/// Host-tunable settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Arena (viewport) size in pixels
    pub arena_width: f32,
    pub arena_height: f32,

    /// Where progression is saved
    pub save_path: String,

    /// Fixed seed for reproducible runs; random per run when unset
    pub seed: Option<u64>,

    /// Fire continuously without holding the fire button
    pub auto_fire: bool,

    // === Secrets ===
    pub easter_eggs: bool,
    /// Typed letters that summon the massive enemy
    pub letter_secret: String,
    /// Typed digits that grant god mode
    pub digit_secret: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            arena_width: ARENA_WIDTH,
            arena_height: ARENA_HEIGHT,
            save_path: SAVE_FILE_NAME.to_string(),
            seed: None,
            auto_fire: true,
            easter_eggs: true,
            letter_secret: "cbum".to_string(),
            digit_secret: "42".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file. Never fails: anything unreadable
    /// yields defaults.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No settings at {}, using defaults", path.display());
                return Self::default();
            }
            Err(e) => {
                log::warn!("Failed to read settings {} ({}), using defaults", path.display(), e);
                return Self::default();
            }
        };

        match serde_json::from_str(&json) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::warn!("Settings {} are invalid ({}), using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save settings as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> PersistenceResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        log::info!("Settings saved");
        Ok(())
    }

    /// Per-run configuration derived from these settings
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            arena: Vec2::new(self.arena_width, self.arena_height),
            easter_eggs: self.easter_eggs,
            letter_secret: self.letter_secret.clone(),
            digit_secret: self.digit_secret.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Settings::load(dir.path().join("nope.json")), Settings::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"seed": 7, "auto_fire": false}"#).unwrap();

        let settings = Settings::load(&path);
        assert_eq!(settings.seed, Some(7));
        assert!(!settings.auto_fire);
        assert_eq!(settings.arena_width, 960.0);
        assert_eq!(settings.letter_secret, "cbum");
    }

    #[test]
    fn corrupt_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{{{").unwrap();
        assert_eq!(Settings::load(&path), Settings::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            arena_width: 1280.0,
            easter_eggs: false,
            ..Settings::default()
        };
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path), settings);
    }

    #[test]
    fn run_config_carries_arena_and_secrets() {
        let config = Settings::default().run_config();
        assert_eq!(config.arena, Vec2::new(960.0, 540.0));
        assert_eq!(config.digit_secret, "42");
        assert!(config.easter_eggs);
    }
}
