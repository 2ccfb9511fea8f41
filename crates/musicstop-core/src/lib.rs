//! # musicstop Core Library
//!
//! This library drives musical statues and musical chairs: it starts and
//! stops an external music source at randomized intervals and reports round
//! progress. The `musicstop` CLI is a thin front end over the same library.
//!
//! ## Architecture
//!
//! - **Game Scheduler**: A state machine running on a single tokio task that
//!   alternates play and pause phases, or parks at an elimination checkpoint
//!   in chairs mode
//! - **Round Timer**: Cancellable per-phase countdown with ~60 Hz progress ticks
//! - **Interval Generator**: Uniform phase durations from an injected random source
//! - **Media**: Play/pause/haptic signals to an external transport and a
//!   playback sensor
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`GameHandle`]: Control surface for a running scheduler
//! - [`RoundTimer`]: Phase countdown
//! - [`IntervalGenerator`]: Phase duration draws
//! - [`MediaController`]: Trait for external audio transports
//! - [`Config`]: Application configuration management

pub mod error;
pub mod events;
pub mod game;
pub mod media;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, GameError, ValidationError};
pub use events::{GameEvent, GameSnapshot};
pub use game::{GameConfiguration, GameHandle, GameMode, Phase, SettingsStore};
pub use media::{
    CommandTransport, LoggingController, ManualSensor, MediaController, MediaSignal,
    PlaybackActivitySensor, RecordingController,
};
pub use storage::Config;
pub use timer::{IntervalGenerator, IntervalRange, PcgSource, RandomSource, RoundTimer, SequenceSource};
