//! Seams to the outside audio world.
//!
//! The game never plays audio itself. It sends logical play/pause signals to
//! whatever transport is plugged in, optionally pulses a haptic actuator, and
//! asks a sensor whether audio is flowing before a game starts. Delivery is
//! best effort: transports expose no acknowledgment and nothing is retried.

mod command;
mod recording;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use command::CommandTransport;
pub use recording::{LoggingController, ManualSensor, RecordingController};

/// Fire-and-forget control signals for an external audio transport.
pub trait MediaController: Send {
    fn send_play(&mut self);
    fn send_pause(&mut self);
    /// Only called right after [`MediaController::send_pause`].
    fn pulse_haptic(&mut self);
}

/// Answers "is audio output currently active".
///
/// At start the scheduler calls [`wake`](PlaybackActivitySensor::wake) once,
/// waits for the settle delay and then polls. A paused player gets a chance
/// to resume before it is judged silent.
#[async_trait]
pub trait PlaybackActivitySensor: Send + Sync {
    /// Nudge the player towards playing. Not counted as a play signal.
    async fn wake(&mut self) {}

    async fn is_audio_active(&self) -> bool;
}

/// A signal as seen by the transport, used for recording and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaSignal {
    Play,
    Pause,
    Haptic,
}
