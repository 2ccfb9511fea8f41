use std::fmt;

use serde::{Deserialize, Serialize};

use crate::timer::RoundTimer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Playing,
    Paused,
    /// Chairs mode only: music is paused until the operator resumes.
    AwaitingNextRound,
    /// Transient: a stop routes through here on its way back to `Idle`.
    Stopped,
}

impl Phase {
    /// Phases that run against a timer.
    pub fn is_timed(self) -> bool {
        matches!(self, Phase::Playing | Phase::Paused)
    }

    pub fn is_running(self) -> bool {
        matches!(
            self,
            Phase::Playing | Phase::Paused | Phase::AwaitingNextRound
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Playing => "playing",
            Phase::Paused => "paused",
            Phase::AwaitingNextRound => "awaiting next round",
            Phase::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Phase plus the timer driving it.
///
/// A timer is held exactly while the phase is `Playing` or `Paused`.
#[derive(Debug, Default)]
pub struct RunState {
    phase: Phase,
    timer: Option<RoundTimer>,
}

impl RunState {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn timer(&self) -> Option<&RoundTimer> {
        self.timer.as_ref()
    }

    /// Cancel the in-flight timer, if any. The phase is left untouched.
    pub fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }

    /// Enter a timed phase with a freshly started timer.
    pub fn enter_timed(&mut self, phase: Phase, timer: RoundTimer) {
        debug_assert!(phase.is_timed(), "{phase} has no timer");
        self.cancel_timer();
        self.phase = phase;
        self.timer = Some(timer);
    }

    /// Enter a phase that does not run against a timer.
    pub fn enter_untimed(&mut self, phase: Phase) {
        debug_assert!(!phase.is_timed(), "{phase} needs a timer");
        self.cancel_timer();
        self.phase = phase;
    }

    pub fn is_consistent(&self) -> bool {
        self.timer.is_some() == self.phase.is_timed()
    }
}
