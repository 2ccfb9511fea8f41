//! Round timer: progress ticks for a single phase.
//!
//! A timer ticks at a fixed cadence (16 ms by default, enough for a smooth
//! progress ring), reports `elapsed / duration` clamped to `0.0..=1.0`, and
//! fires its completion callback exactly once when the deadline is reached.
//!
//! ## Cancellation
//!
//! Every callback runs while holding the timer's gate. `cancel()` closes the
//! gate under the same lock, so once it returns no further `on_tick` or
//! `on_complete` can start. A callback must therefore never cancel its own
//! timer; post a message somewhere else instead.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

/// Tick cadence used by [`RoundTimer::start`].
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(16);

/// One phase worth of countdown. Dropping the timer cancels it.
#[derive(Debug)]
pub struct RoundTimer {
    duration: Duration,
    started_at: Instant,
    /// `true` once cancelled.
    gate: Arc<Mutex<bool>>,
    task: JoinHandle<()>,
}

impl RoundTimer {
    /// Start a timer at the default cadence.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn start<T, C>(duration: Duration, on_tick: T, on_complete: C) -> Self
    where
        T: FnMut(f64) + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        Self::start_with_cadence(duration, DEFAULT_TICK_INTERVAL, on_tick, on_complete)
    }

    /// Start a timer ticking every `cadence`.
    ///
    /// The first tick reports `0.0` immediately (unless the duration is zero),
    /// the last one lands on the deadline and reports `1.0`.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn start_with_cadence<T, C>(
        duration: Duration,
        cadence: Duration,
        mut on_tick: T,
        on_complete: C,
    ) -> Self
    where
        T: FnMut(f64) + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        let cadence = cadence.max(Duration::from_millis(1));
        let started_at = Instant::now();
        let deadline = started_at + duration;
        let gate = Arc::new(Mutex::new(false));
        let task_gate = Arc::clone(&gate);

        let task = tokio::spawn(async move {
            let mut next_tick = started_at;
            let mut last_progress = -1.0_f64;
            loop {
                sleep_until(next_tick.min(deadline)).await;
                let now = Instant::now();
                let progress = progress_at(started_at, duration, now);
                if progress > last_progress {
                    let cancelled = task_gate.lock().unwrap_or_else(PoisonError::into_inner);
                    if *cancelled {
                        return;
                    }
                    on_tick(progress);
                    last_progress = progress;
                }
                if progress >= 1.0 {
                    break;
                }
                next_tick = (next_tick + cadence).max(now);
            }

            let cancelled = task_gate.lock().unwrap_or_else(PoisonError::into_inner);
            if !*cancelled {
                on_complete();
            }
        });

        Self {
            duration,
            started_at,
            gate,
            task,
        }
    }

    /// Stop the timer. No callback starts after this returns.
    pub fn cancel(&self) {
        {
            let mut cancelled = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
            *cancelled = true;
        }
        self.task.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// 0.0 .. 1.0 progress at the current instant.
    pub fn progress(&self) -> f64 {
        progress_at(self.started_at, self.duration, Instant::now())
    }

    pub fn remaining(&self) -> Duration {
        (self.started_at + self.duration).saturating_duration_since(Instant::now())
    }
}

impl Drop for RoundTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn progress_at(started_at: Instant, duration: Duration, now: Instant) -> f64 {
    if duration.is_zero() {
        return 1.0;
    }
    let elapsed = now.saturating_duration_since(started_at);
    (elapsed.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn recorder() -> (Arc<Mutex<Vec<f64>>>, Arc<AtomicUsize>) {
        (Arc::new(Mutex::new(Vec::new())), Arc::new(AtomicUsize::new(0)))
    }

    fn spawn_recorded(
        duration: Duration,
        ticks: &Arc<Mutex<Vec<f64>>>,
        completions: &Arc<AtomicUsize>,
    ) -> RoundTimer {
        let ticks = Arc::clone(ticks);
        let completions = Arc::clone(completions);
        RoundTimer::start(
            duration,
            move |p| ticks.lock().unwrap().push(p),
            move || {
                completions.fetch_add(1, Ordering::SeqCst);
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_increase_and_complete_once() {
        let (ticks, completions) = recorder();
        let _timer = spawn_recorded(Duration::from_millis(100), &ticks, &completions);

        tokio::time::sleep(Duration::from_millis(300)).await;

        let ticks = ticks.lock().unwrap().clone();
        assert_eq!(completions.load(Ordering::SeqCst), 1);
        assert_eq!(ticks.first().copied(), Some(0.0));
        assert_eq!(ticks.last().copied(), Some(1.0));
        assert!(ticks.windows(2).all(|w| w[0] < w[1]), "{ticks:?}");
        assert!(ticks.len() >= 7 && ticks.len() <= 9, "{} ticks", ticks.len());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_silences_all_callbacks() {
        let (ticks, completions) = recorder();
        let timer = spawn_recorded(Duration::from_millis(200), &ticks, &completions);

        tokio::time::sleep(Duration::from_millis(50)).await;
        timer.cancel();
        let seen = ticks.lock().unwrap().len();
        assert!(seen > 0);
        assert!(timer.is_cancelled());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(ticks.lock().unwrap().len(), seen);
        assert_eq!(completions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_cancels() {
        let (ticks, completions) = recorder();
        let timer = spawn_recorded(Duration::from_millis(100), &ticks, &completions);
        drop(timer);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(ticks.lock().unwrap().is_empty());
        assert_eq!(completions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_duration_completes_immediately() {
        let (ticks, completions) = recorder();
        let _timer = spawn_recorded(Duration::ZERO, &ticks, &completions);

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(*ticks.lock().unwrap(), vec![1.0]);
        assert_eq!(completions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn progress_and_remaining_follow_the_clock() {
        let timer = RoundTimer::start(Duration::from_secs(4), |_| {}, || {});
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!((timer.progress() - 0.25).abs() < 0.01);
        let remaining = timer.remaining();
        assert!(remaining <= Duration::from_secs(3) && remaining > Duration::from_millis(2_950));
        assert_eq!(timer.duration(), Duration::from_secs(4));
    }

    #[test]
    fn progress_is_clamped() {
        let start = Instant::now();
        let d = Duration::from_millis(10);
        assert_eq!(progress_at(start, d, start + Duration::from_secs(1)), 1.0);
        assert_eq!(progress_at(start + d, d, start), 0.0);
    }
}
