//! Core error types for musicstop-core.
//!
//! Every failure the library reports is a typed, recoverable value built
//! with thiserror. Nothing here is fatal to the process.

use std::path::PathBuf;
use thiserror::Error;

use crate::game::Phase;

/// Core error type for musicstop-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Game control errors
    #[error("Game error: {0}")]
    Game(#[from] GameError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors returned by the game control surface (`start`, `resume_round`).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    /// The playback sensor reported no audio at start time.
    #[error("No music is playing")]
    NoAudioActive,

    /// Minimum play time exceeds the maximum.
    #[error("Min play time ({min}s) cannot be greater than max play time ({max}s)")]
    InvalidPlayRange { min: u32, max: u32 },

    /// Minimum pause time exceeds the maximum (statues mode only).
    #[error("Min pause time ({min}s) cannot be greater than max pause time ({max}s)")]
    InvalidPauseRange { min: u32, max: u32 },

    /// `resume_round` outside the elimination checkpoint.
    #[error("Cannot resume a round while {phase}")]
    ResumeInWrongPhase { phase: Phase },

    /// `start` while a game is already in progress.
    #[error("A game is already running ({phase})")]
    AlreadyRunning { phase: Phase },

    /// The scheduler task is no longer running.
    #[error("Game scheduler has shut down")]
    SchedulerGone,
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Lower bound above upper bound
    #[error("Invalid range: min ({min}) must not exceed max ({max})")]
    InvalidRange { min: u32, max: u32 },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Key does not exist in the configuration tree
    #[error("Unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// No directory could be determined or created for the config file
    #[error("Cannot prepare config directory {path}: {source}")]
    NoDataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
