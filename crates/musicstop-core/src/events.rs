use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::game::{GameMode, Phase};

/// Every state change in a game produces an Event.
/// Front ends subscribe to them to draw progress and phase changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameEvent {
    PhaseChanged {
        from: Phase,
        to: Phase,
        round: u32,
        /// Drawn length of the new phase, for timed phases.
        duration_ms: Option<u64>,
        at: DateTime<Utc>,
    },
    /// Progress within the current phase, 0.0 .. 1.0.
    Progress {
        phase: Phase,
        progress: f64,
        at: DateTime<Utc>,
    },
    /// A start request was refused; the game stays idle.
    StartRejected {
        reason: String,
        at: DateTime<Utc>,
    },
}

/// Point-in-time view of a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub phase: Phase,
    /// Mode of the running game, `None` while idle.
    pub mode: Option<GameMode>,
    pub round: u32,
    pub progress: f64,
    pub remaining_ms: Option<u64>,
    pub at: DateTime<Utc>,
}
