//! In-process transports: dry runs, diagnostics and tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tracing::info;

use super::{MediaController, MediaSignal, PlaybackActivitySensor};

/// Records every signal into a shared log. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingController {
    log: Arc<Mutex<Vec<MediaSignal>>>,
}

impl RecordingController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals received so far, oldest first.
    pub fn signals(&self) -> Vec<MediaSignal> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self, signal: MediaSignal) -> usize {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|s| **s == signal)
            .count()
    }

    pub fn clear(&self) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn push(&self, signal: MediaSignal) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(signal);
    }
}

impl MediaController for RecordingController {
    fn send_play(&mut self) {
        self.push(MediaSignal::Play);
    }

    fn send_pause(&mut self) {
        self.push(MediaSignal::Pause);
    }

    fn pulse_haptic(&mut self) {
        self.push(MediaSignal::Haptic);
    }
}

/// Dry-run transport: signals only show up in the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingController;

impl MediaController for LoggingController {
    fn send_play(&mut self) {
        info!(signal = ?MediaSignal::Play, "dry run");
    }

    fn send_pause(&mut self) {
        info!(signal = ?MediaSignal::Pause, "dry run");
    }

    fn pulse_haptic(&mut self) {
        info!(signal = ?MediaSignal::Haptic, "dry run");
    }
}

/// Sensor whose answer is set by hand. Clones share the same state.
///
/// A sensor built with [`ManualSensor::paused`] stands in for a player that
/// is paused but resumes when woken.
#[derive(Debug, Clone)]
pub struct ManualSensor {
    active: Arc<AtomicBool>,
    resumes_on_wake: bool,
    wakes: Arc<AtomicUsize>,
}

impl ManualSensor {
    pub fn new(active: bool) -> Self {
        Self {
            active: Arc::new(AtomicBool::new(active)),
            resumes_on_wake: false,
            wakes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn active() -> Self {
        Self::new(true)
    }

    pub fn inactive() -> Self {
        Self::new(false)
    }

    pub fn paused() -> Self {
        Self {
            resumes_on_wake: true,
            ..Self::inactive()
        }
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    /// Times [`PlaybackActivitySensor::wake`] has been called.
    pub fn wake_count(&self) -> usize {
        self.wakes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlaybackActivitySensor for ManualSensor {
    async fn wake(&mut self) {
        self.wakes.fetch_add(1, Ordering::SeqCst);
        if self.resumes_on_wake {
            self.set_active(true);
        }
    }

    async fn is_audio_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}
