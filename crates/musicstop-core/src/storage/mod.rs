mod config;

pub use config::{Config, GameSettings, SensorConfig, TimerConfig, TransportConfig};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/musicstop[-dev]/` based on MUSICSTOP_ENV.
///
/// Set MUSICSTOP_ENV=dev to use development data directory, or
/// MUSICSTOP_CONFIG_DIR to use an explicit directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("MUSICSTOP_CONFIG_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("MUSICSTOP_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("musicstop-dev")
            } else {
                base_dir.join("musicstop")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|source| ConfigError::NoDataDir {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}
