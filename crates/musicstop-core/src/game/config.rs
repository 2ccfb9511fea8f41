//! Per-run game configuration and the settings seam it is read from.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::timer::{IntervalRange, DEFAULT_TICK_INTERVAL};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    /// Play and pause alternate until stopped.
    #[default]
    Statues,
    /// Every pause is an elimination checkpoint awaiting `resume_round`.
    Chairs,
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameMode::Statues => f.write_str("statues"),
            GameMode::Chairs => f.write_str("chairs"),
        }
    }
}

/// Snapshot of the operator's settings, fixed for the duration of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameConfiguration {
    pub mode: GameMode,
    pub play_min_secs: u32,
    pub play_max_secs: u32,
    /// Only used in statues mode.
    pub pause_min_secs: u32,
    pub pause_max_secs: u32,
    pub haptic_enabled: bool,
    /// Wait before polling the playback sensor at start.
    pub settle_delay: Duration,
    /// Progress tick cadence.
    pub tick_interval: Duration,
}

impl Default for GameConfiguration {
    fn default() -> Self {
        Self {
            mode: GameMode::Statues,
            play_min_secs: 10,
            play_max_secs: 40,
            pause_min_secs: 3,
            pause_max_secs: 8,
            haptic_enabled: false,
            settle_delay: Duration::from_millis(500),
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

impl GameConfiguration {
    /// Check both ranges and produce the phase plan for a run.
    ///
    /// # Errors
    ///
    /// `InvalidPlayRange` when the play bounds are inverted, and
    /// `InvalidPauseRange` when the pause bounds are inverted in statues mode.
    pub fn validate(&self) -> Result<PhasePlan, GameError> {
        let play = IntervalRange::new(self.play_min_secs, self.play_max_secs).map_err(|_| {
            GameError::InvalidPlayRange {
                min: self.play_min_secs,
                max: self.play_max_secs,
            }
        })?;

        match self.mode {
            GameMode::Chairs => Ok(PhasePlan::Chairs { play }),
            GameMode::Statues => {
                let pause = IntervalRange::new(self.pause_min_secs, self.pause_max_secs)
                    .map_err(|_| GameError::InvalidPauseRange {
                        min: self.pause_min_secs,
                        max: self.pause_max_secs,
                    })?;
                Ok(PhasePlan::Statues { play, pause })
            }
        }
    }
}

/// Validated duration ranges for a run, shaped by mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhasePlan {
    Statues {
        play: IntervalRange,
        pause: IntervalRange,
    },
    Chairs {
        play: IntervalRange,
    },
}

impl PhasePlan {
    pub fn mode(&self) -> GameMode {
        match self {
            PhasePlan::Statues { .. } => GameMode::Statues,
            PhasePlan::Chairs { .. } => GameMode::Chairs,
        }
    }

    pub fn play(&self) -> &IntervalRange {
        match self {
            PhasePlan::Statues { play, .. } | PhasePlan::Chairs { play } => play,
        }
    }
}

/// Read-only access to the operator's settings.
pub trait SettingsStore: Send {
    fn snapshot(&self) -> GameConfiguration;
}

impl SettingsStore for GameConfiguration {
    fn snapshot(&self) -> GameConfiguration {
        self.clone()
    }
}
