//! TOML-based application configuration.
//!
//! Stores operator preferences including:
//! - Game mode and play/pause interval bounds
//! - Haptic feedback toggle
//! - Playback sensor settle delay
//! - Progress tick cadence
//! - Transport commands for play/pause/haptic/status
//!
//! Configuration is stored at `~/.config/musicstop/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{ConfigError, GameError};
use crate::game::{GameConfiguration, GameMode, SettingsStore};

/// Game settings, the operator-facing sliders and switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSettings {
    #[serde(default)]
    pub mode: GameMode,
    #[serde(default = "default_play_min")]
    pub play_min_secs: u32,
    #[serde(default = "default_play_max")]
    pub play_max_secs: u32,
    #[serde(default = "default_pause_min")]
    pub pause_min_secs: u32,
    #[serde(default = "default_pause_max")]
    pub pause_max_secs: u32,
    #[serde(default)]
    pub haptic_enabled: bool,
}

/// Playback sensor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Delay before polling the sensor when a game starts.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

/// Round timer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

/// External transport commands. Empty strings disable a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(default = "default_play_command")]
    pub play_command: String,
    #[serde(default = "default_pause_command")]
    pub pause_command: String,
    /// Prints `Playing` while audio is flowing.
    #[serde(default = "default_status_command")]
    pub status_command: String,
    /// How long the status command may run before it counts as silent.
    #[serde(default = "default_status_timeout_ms")]
    pub status_timeout_ms: u64,
    #[serde(default)]
    pub haptic_command: Option<String>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/musicstop/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub game: GameSettings,
    #[serde(default)]
    pub sensor: SensorConfig,
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub transport: TransportConfig,
}

// Default functions
fn default_play_min() -> u32 {
    10
}
fn default_play_max() -> u32 {
    40
}
fn default_pause_min() -> u32 {
    3
}
fn default_pause_max() -> u32 {
    8
}
fn default_settle_delay_ms() -> u64 {
    500
}
fn default_tick_interval_ms() -> u64 {
    16
}
fn default_status_timeout_ms() -> u64 {
    2000
}
fn default_play_command() -> String {
    "playerctl play".into()
}
fn default_pause_command() -> String {
    "playerctl pause".into()
}
fn default_status_command() -> String {
    "playerctl status".into()
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            mode: GameMode::Statues,
            play_min_secs: default_play_min(),
            play_max_secs: default_play_max(),
            pause_min_secs: default_pause_min(),
            pause_max_secs: default_pause_max(),
            haptic_enabled: false,
        }
    }
}

impl GameSettings {
    /// Both ranges must be ordered, whichever mode is selected.
    pub fn check_ranges(&self) -> Result<(), GameError> {
        if self.play_min_secs > self.play_max_secs {
            return Err(GameError::InvalidPlayRange {
                min: self.play_min_secs,
                max: self.play_max_secs,
            });
        }
        if self.pause_min_secs > self.pause_max_secs {
            return Err(GameError::InvalidPauseRange {
                min: self.pause_min_secs,
                max: self.pause_max_secs,
            });
        }
        Ok(())
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            play_command: default_play_command(),
            pause_command: default_pause_command(),
            status_command: default_status_command(),
            status_timeout_ms: default_status_timeout_ms(),
            haptic_command: None,
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => serde_json::Value::Number(
                        value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?
                            .into(),
                    ),
                    serde_json::Value::Object(_) => {
                        return Err(invalid("cannot replace a whole section".into()))
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Location of the config file.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or create the default file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path, writing defaults there when it is absent.
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`].
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to an explicit path.
    ///
    /// # Errors
    ///
    /// Same as [`Config::save`].
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Update a value by dot-separated key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value does not fit it, or
    /// the change would leave a play or pause range with min above max. On
    /// error the config is left unchanged.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated
            .game
            .check_ranges()
            .map_err(|e| invalid(e.to_string()))?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save. Returns error if key is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Per-run game configuration built from these settings.
    pub fn game_configuration(&self) -> GameConfiguration {
        GameConfiguration {
            mode: self.game.mode,
            play_min_secs: self.game.play_min_secs,
            play_max_secs: self.game.play_max_secs,
            pause_min_secs: self.game.pause_min_secs,
            pause_max_secs: self.game.pause_max_secs,
            haptic_enabled: self.game.haptic_enabled,
            settle_delay: Duration::from_millis(self.sensor.settle_delay_ms),
            tick_interval: Duration::from_millis(self.timer.tick_interval_ms),
        }
    }
}

impl SettingsStore for Config {
    fn snapshot(&self) -> GameConfiguration {
        self.game_configuration()
    }
}
