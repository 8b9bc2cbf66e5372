//! Persistent cross-run economy
//!
//! Coins, kill totals, upgrade levels and weapon unlocks survive between runs.
//! Every mutation is persisted before it becomes visible: a call either
//! commits to storage and memory together, or leaves both untouched.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::persistence::{PersistenceError, Storage, merge_with_defaults};

/// Price of the shotgun in the shop
pub const SHOTGUN_UNLOCK_COST: u64 = 200;

/// Purchasable upgrade tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpgradeKind {
    Damage,
    FireRate,
    Speed,
}

impl UpgradeKind {
    pub const ALL: [UpgradeKind; 3] = [UpgradeKind::Damage, UpgradeKind::FireRate, UpgradeKind::Speed];

    /// (base cost, per-level multiplier)
    pub fn cost_table(self) -> (f64, f64) {
        match self {
            UpgradeKind::Damage => (50.0, 1.5),
            UpgradeKind::FireRate => (60.0, 1.6),
            UpgradeKind::Speed => (40.0, 1.4),
        }
    }

    /// Cost of buying the next level when currently at `level`
    pub fn cost_at(self, level: u32) -> u64 {
        let (base, mult) = self.cost_table();
        (base * mult.powi(level as i32)).round() as u64
    }

    /// Field name in the persisted `upgrades` object
    pub fn key(self) -> &'static str {
        match self {
            UpgradeKind::Damage => "damage",
            UpgradeKind::FireRate => "fireRate",
            UpgradeKind::Speed => "speed",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UpgradeKind::Damage => "Damage",
            UpgradeKind::FireRate => "Fire Rate",
            UpgradeKind::Speed => "Speed",
        }
    }
}

/// Weapons the stat calculator knows how to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WeaponKind {
    #[default]
    Pistol,
    Shotgun,
}

impl WeaponKind {
    pub fn id(&self) -> &'static str {
        match self {
            WeaponKind::Pistol => "pistol",
            WeaponKind::Shotgun => "shotgun",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "pistol" => Some(WeaponKind::Pistol),
            "shotgun" => Some(WeaponKind::Shotgun),
            _ => None,
        }
    }
}

/// Upgrade levels per track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Upgrades {
    pub damage: u32,
    pub fire_rate: u32,
    pub speed: u32,
}

impl Upgrades {
    pub fn level(&self, kind: UpgradeKind) -> u32 {
        match kind {
            UpgradeKind::Damage => self.damage,
            UpgradeKind::FireRate => self.fire_rate,
            UpgradeKind::Speed => self.speed,
        }
    }

    fn level_mut(&mut self, kind: UpgradeKind) -> &mut u32 {
        match kind {
            UpgradeKind::Damage => &mut self.damage,
            UpgradeKind::FireRate => &mut self.fire_rate,
            UpgradeKind::Speed => &mut self.speed,
        }
    }

    /// Every track at the same level (god mode)
    pub fn uniform(level: u32) -> Self {
        Self {
            damage: level,
            fire_rate: level,
            speed: level,
        }
    }
}

/// Unlock/selection flags for one weapon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponState {
    pub unlocked: bool,
    pub selected: bool,
}

/// The persisted progression record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionState {
    #[serde(default)]
    pub coins: u64,
    #[serde(default)]
    pub total_kills: u64,
    #[serde(default)]
    pub upgrades: Upgrades,
    #[serde(default = "default_weapons")]
    pub weapons: BTreeMap<String, WeaponState>,
}

fn default_weapons() -> BTreeMap<String, WeaponState> {
    let mut weapons = BTreeMap::new();
    weapons.insert(
        WeaponKind::Pistol.id().to_string(),
        WeaponState {
            unlocked: true,
            selected: true,
        },
    );
    weapons.insert(WeaponKind::Shotgun.id().to_string(), WeaponState::default());
    weapons
}

impl Default for ProgressionState {
    fn default() -> Self {
        Self {
            coins: 0,
            total_kills: 0,
            upgrades: Upgrades::default(),
            weapons: default_weapons(),
        }
    }
}

/// Decode one entry of a saved record, dropping it (with a warning) when it
/// does not fit the field's type
fn decode_field<T: DeserializeOwned>(record: &mut serde_json::Map<String, serde_json::Value>, key: &str) -> Option<T> {
    let value = record.remove(key)?;
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            log::warn!("Ignoring saved field '{}' ({})", key, e);
            None
        }
    }
}

impl ProgressionState {
    /// Decode a raw saved record, merging it over the defaults.
    /// Each field decodes on its own, so one that does not fit keeps its
    /// default without disturbing the rest; this never fails.
    pub fn from_saved(raw: &str) -> Self {
        let saved: serde_json::Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("Saved progress is not valid JSON ({}), using defaults", e);
                return Self::default();
            }
        };
        let Ok(defaults) = serde_json::to_value(Self::default()) else {
            return Self::default();
        };

        let merged = merge_with_defaults(defaults, &saved);
        let serde_json::Value::Object(mut record) = merged else {
            return Self::default();
        };

        let mut state = Self::default();
        if let Some(coins) = decode_field(&mut record, "coins") {
            state.coins = coins;
        }
        if let Some(kills) = decode_field(&mut record, "totalKills") {
            state.total_kills = kills;
        }
        if let Some(serde_json::Value::Object(mut levels)) = record.remove("upgrades") {
            for kind in UpgradeKind::ALL {
                if let Some(level) = decode_field(&mut levels, kind.key()) {
                    *state.upgrades.level_mut(kind) = level;
                }
            }
        }
        if let Some(serde_json::Value::Object(mut weapons)) = record.remove("weapons") {
            let ids: Vec<String> = weapons.keys().cloned().collect();
            for id in ids {
                if let Some(weapon) = decode_field(&mut weapons, &id) {
                    state.weapons.insert(id, weapon);
                }
            }
        }

        state.normalize_weapons();
        state
    }

    /// Id of the selected weapon ("pistol" if none is flagged)
    pub fn selected_weapon_id(&self) -> &str {
        self.weapons
            .iter()
            .find(|(_, w)| w.selected)
            .map(|(id, _)| id.as_str())
            .unwrap_or(WeaponKind::Pistol.id())
    }

    /// Weapon used for stat computation; unknown ids fall back to the pistol
    pub fn selected_weapon(&self) -> WeaponKind {
        WeaponKind::from_id(self.selected_weapon_id()).unwrap_or_default()
    }

    pub fn is_weapon_unlocked(&self, id: &str) -> bool {
        self.weapons.get(id).is_some_and(|w| w.unlocked)
    }

    /// Enforce "pistol always unlocked, exactly one unlocked weapon selected"
    fn normalize_weapons(&mut self) {
        let pistol = WeaponKind::Pistol.id();
        self.weapons.entry(pistol.to_string()).or_default().unlocked = true;

        let keep = self
            .weapons
            .iter()
            .find(|(_, w)| w.selected && w.unlocked)
            .map(|(id, _)| id.clone())
            .unwrap_or_else(|| pistol.to_string());

        for (id, weapon) in self.weapons.iter_mut() {
            weapon.selected = *id == keep;
        }
    }
}

/// Owner of the progression record and its storage backend
#[derive(Debug)]
pub struct ProgressionStore<S: Storage> {
    state: ProgressionState,
    storage: S,
    last_error: Option<PersistenceError>,
}

impl<S: Storage> ProgressionStore<S> {
    /// Load from storage. Missing or corrupt records start fresh.
    pub fn load(storage: S) -> Self {
        let state = match storage.read() {
            Ok(Some(raw)) => {
                let state = ProgressionState::from_saved(&raw);
                log::info!(
                    "Loaded progress: {} coins, {} kills, weapon {}",
                    state.coins,
                    state.total_kills,
                    state.selected_weapon_id()
                );
                state
            }
            Ok(None) => {
                log::info!("No saved progress found, starting fresh");
                ProgressionState::default()
            }
            Err(e) => {
                log::warn!("Failed to read saved progress ({}), starting fresh", e);
                ProgressionState::default()
            }
        };

        Self {
            state,
            storage,
            last_error: None,
        }
    }

    pub fn state(&self) -> &ProgressionState {
        &self.state
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Most recent save failure, if any
    pub fn take_last_error(&mut self) -> Option<PersistenceError> {
        self.last_error.take()
    }

    /// Persist `next`, then make it current. On failure nothing changes.
    fn commit(&mut self, next: ProgressionState) -> bool {
        let result = serde_json::to_string(&next)
            .map_err(PersistenceError::from)
            .and_then(|json| self.storage.write(&json));

        match result {
            Ok(()) => {
                self.state = next;
                true
            }
            Err(e) => {
                log::error!("Failed to save progress: {}", e);
                self.last_error = Some(e);
                false
            }
        }
    }

    /// Apply `f` to a copy and commit it if `f` reports a change
    fn mutate(&mut self, f: impl FnOnce(&mut ProgressionState) -> bool) -> bool {
        let mut next = self.state.clone();
        if !f(&mut next) {
            return false;
        }
        self.commit(next)
    }

    pub fn add_coins(&mut self, amount: u64) -> bool {
        self.mutate(|s| {
            s.coins = s.coins.saturating_add(amount);
            true
        })
    }

    /// Deduct `amount` if affordable. Never partially deducts.
    pub fn spend_coins(&mut self, amount: u64) -> bool {
        self.mutate(|s| {
            if s.coins < amount {
                return false;
            }
            s.coins -= amount;
            true
        })
    }

    pub fn add_kills(&mut self, n: u64) -> bool {
        self.mutate(|s| {
            s.total_kills = s.total_kills.saturating_add(n);
            true
        })
    }

    pub fn upgrade_level(&self, kind: UpgradeKind) -> u32 {
        self.state.upgrades.level(kind)
    }

    pub fn upgrade_cost(&self, kind: UpgradeKind) -> u64 {
        kind.cost_at(self.upgrade_level(kind))
    }

    pub fn can_upgrade(&self, kind: UpgradeKind) -> bool {
        self.state.coins >= self.upgrade_cost(kind)
    }

    /// Buy one level of `kind`. Returns false (state unchanged) if unaffordable.
    pub fn apply_upgrade(&mut self, kind: UpgradeKind) -> bool {
        let cost = self.upgrade_cost(kind);
        let bought = self.mutate(|s| {
            if s.coins < cost {
                return false;
            }
            s.coins -= cost;
            *s.upgrades.level_mut(kind) += 1;
            true
        });
        if bought {
            log::info!(
                "Upgraded {} to level {} for {} coins",
                kind.as_str(),
                self.upgrade_level(kind),
                cost
            );
        }
        bought
    }

    pub fn selected_weapon(&self) -> WeaponKind {
        self.state.selected_weapon()
    }

    pub fn is_weapon_unlocked(&self, id: &str) -> bool {
        self.state.is_weapon_unlocked(id)
    }

    /// Unlock `id` for `cost`. Already-unlocked weapons succeed without charge.
    pub fn unlock_weapon(&mut self, id: &str, cost: u64) -> bool {
        if self.is_weapon_unlocked(id) {
            return true;
        }
        let unlocked = self.mutate(|s| {
            if s.coins < cost {
                return false;
            }
            s.coins -= cost;
            s.weapons.entry(id.to_string()).or_default().unlocked = true;
            true
        });
        if unlocked {
            log::info!("Unlocked weapon {} for {} coins", id, cost);
        }
        unlocked
    }

    /// Make `id` the only selected weapon. Locked weapons are refused.
    pub fn select_weapon(&mut self, id: &str) -> bool {
        if !self.is_weapon_unlocked(id) {
            return false;
        }
        let selected = self.mutate(|s| {
            for (key, weapon) in s.weapons.iter_mut() {
                weapon.selected = key == id;
            }
            true
        });
        if selected {
            log::info!("Selected weapon {}", id);
        }
        selected
    }

    /// Shop button behaviour: buy the shotgun, or swap between pistol and shotgun
    pub fn toggle_shotgun(&mut self) -> bool {
        let shotgun = WeaponKind::Shotgun.id();
        if !self.is_weapon_unlocked(shotgun) {
            return self.unlock_weapon(shotgun, SHOTGUN_UNLOCK_COST);
        }
        if self.selected_weapon() == WeaponKind::Shotgun {
            self.select_weapon(WeaponKind::Pistol.id())
        } else {
            self.select_weapon(shotgun)
        }
    }

    /// Wipe coins only; upgrades and unlocks stay
    pub fn reset_coins(&mut self) -> bool {
        self.mutate(|s| {
            s.coins = 0;
            true
        })
    }

    /// Wipe everything back to defaults
    pub fn reset_all_progress(&mut self) -> bool {
        let reset = self.commit(ProgressionState::default());
        if reset {
            log::info!("All progress reset");
        }
        reset
    }
}
