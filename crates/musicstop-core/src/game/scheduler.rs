//! Game scheduling state machine.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Playing -> Paused -> Playing -> ...            (statues)
//! Idle -> Playing -> AwaitingNextRound -> Playing -> ... (chairs, via resume_round)
//! Playing | Paused | AwaitingNextRound -> Stopped -> Idle (stop)
//! ```
//!
//! The scheduler itself is synchronous. Round timers report back through an
//! unbounded channel that the owning event loop drains into
//! [`GameScheduler::on_timer`]. Each timer is stamped with a generation; any
//! message whose generation is not the current one belongs to a cancelled
//! timer and is dropped.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, trace, warn};

use super::config::{GameConfiguration, PhasePlan};
use super::state::{Phase, RunState};
use crate::error::GameError;
use crate::events::{GameEvent, GameSnapshot};
use crate::media::MediaController;
use crate::timer::{IntervalGenerator, RandomSource, RoundTimer};

/// Report from a running [`RoundTimer`] back to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum TimerMessage {
    Tick { generation: u64, progress: f64 },
    Elapsed { generation: u64 },
}

#[derive(Debug)]
struct ActiveGame {
    config: GameConfiguration,
    plan: PhasePlan,
}

pub(crate) struct GameScheduler {
    state: RunState,
    game: Option<ActiveGame>,
    intervals: IntervalGenerator<Box<dyn RandomSource>>,
    controller: Box<dyn MediaController>,
    events: broadcast::Sender<GameEvent>,
    timer_tx: mpsc::UnboundedSender<TimerMessage>,
    generation: u64,
    round: u32,
    progress: f64,
}

impl GameScheduler {
    pub(crate) fn new(
        controller: Box<dyn MediaController>,
        source: Box<dyn RandomSource>,
        events: broadcast::Sender<GameEvent>,
        timer_tx: mpsc::UnboundedSender<TimerMessage>,
    ) -> Self {
        Self {
            state: RunState::default(),
            game: None,
            intervals: IntervalGenerator::new(source),
            controller,
            events,
            timer_tx,
            generation: 0,
            round: 0,
            progress: 0.0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub(crate) fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub(crate) fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            phase: self.state.phase(),
            mode: self.game.as_ref().map(|g| g.plan.mode()),
            round: self.round,
            progress: self.progress,
            remaining_ms: self
                .state
                .timer()
                .map(|t| u64::try_from(t.remaining().as_millis()).unwrap_or(u64::MAX)),
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a run. `audio_active` is the sensor reading taken by the caller.
    pub(crate) fn start(
        &mut self,
        config: GameConfiguration,
        audio_active: bool,
    ) -> Result<(), GameError> {
        self.ensure_idle()?;
        if !audio_active {
            return Err(self.reject(GameError::NoAudioActive));
        }
        let plan = match config.validate() {
            Ok(plan) => plan,
            Err(e) => return Err(self.reject(e)),
        };

        info!(mode = %plan.mode(), haptic = config.haptic_enabled, "game started");
        self.game = Some(ActiveGame { config, plan });
        self.round = 1;
        self.begin_playing();
        Ok(())
    }

    /// Reject a start unless idle. The rejection is broadcast like any other.
    pub(crate) fn ensure_idle(&self) -> Result<(), GameError> {
        let phase = self.state.phase();
        if phase != Phase::Idle {
            return Err(self.reject(GameError::AlreadyRunning { phase }));
        }
        Ok(())
    }

    /// Leave the elimination checkpoint and play the next round.
    pub(crate) fn resume_round(&mut self) -> Result<(), GameError> {
        let phase = self.state.phase();
        if phase != Phase::AwaitingNextRound {
            return Err(GameError::ResumeInWrongPhase { phase });
        }
        self.round += 1;
        self.begin_playing();
        Ok(())
    }

    /// Cancel the active phase, pause the music and return to idle.
    pub(crate) fn stop(&mut self) {
        let phase = self.state.phase();
        if !phase.is_running() {
            debug!(%phase, "stop ignored, no game running");
            return;
        }
        self.invalidate_timer();
        self.controller.send_pause();
        self.transition(Phase::Stopped);
        self.game = None;
        self.round = 0;
        self.transition(Phase::Idle);
        self.set_progress(0.0);
        info!("game stopped");
    }

    pub(crate) fn on_timer(&mut self, message: TimerMessage) {
        match message {
            TimerMessage::Tick {
                generation,
                progress,
            } if generation == self.generation => self.set_progress(progress),
            TimerMessage::Elapsed { generation } if generation == self.generation => {
                self.on_phase_elapsed()
            }
            stale => trace!(?stale, current = self.generation, "dropped stale timer message"),
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn on_phase_elapsed(&mut self) {
        let Some(plan) = self.game.as_ref().map(|g| g.plan) else {
            return;
        };
        match (self.state.phase(), plan) {
            (Phase::Playing, PhasePlan::Chairs { .. }) => {
                self.invalidate_timer();
                self.pause_music();
                self.transition(Phase::AwaitingNextRound);
                self.set_progress(0.0);
            }
            (Phase::Playing, PhasePlan::Statues { pause, .. }) => {
                self.pause_music();
                let duration_ms = self.intervals.draw(&pause);
                self.run_phase(Phase::Paused, duration_ms);
            }
            (Phase::Paused, _) => {
                self.round += 1;
                self.begin_playing();
            }
            (phase, _) => trace!(%phase, "timer elapsed outside a timed phase"),
        }
    }

    fn begin_playing(&mut self) {
        let Some(plan) = self.game.as_ref().map(|g| g.plan) else {
            return;
        };
        self.controller.send_play();
        let duration_ms = self.intervals.draw(plan.play());
        self.run_phase(Phase::Playing, duration_ms);
    }

    fn pause_music(&mut self) {
        self.controller.send_pause();
        if self.game.as_ref().is_some_and(|g| g.config.haptic_enabled) {
            self.controller.pulse_haptic();
        }
    }

    fn run_phase(&mut self, phase: Phase, duration_ms: u64) {
        let Some(cadence) = self.game.as_ref().map(|g| g.config.tick_interval) else {
            return;
        };
        self.invalidate_timer();
        let generation = self.generation;
        let tick_tx = self.timer_tx.clone();
        let done_tx = self.timer_tx.clone();
        let timer = RoundTimer::start_with_cadence(
            Duration::from_millis(duration_ms),
            cadence,
            move |progress| {
                let _ = tick_tx.send(TimerMessage::Tick {
                    generation,
                    progress,
                });
            },
            move || {
                let _ = done_tx.send(TimerMessage::Elapsed { generation });
            },
        );

        let from = self.state.phase();
        self.state.enter_timed(phase, timer);
        self.progress = 0.0;
        info!(%from, to = %phase, round = self.round, duration_ms, "phase started");
        self.emit(GameEvent::PhaseChanged {
            from,
            to: phase,
            round: self.round,
            duration_ms: Some(duration_ms),
            at: Utc::now(),
        });
        debug_assert!(self.state.is_consistent());
    }

    fn transition(&mut self, to: Phase) {
        let from = self.state.phase();
        self.state.enter_untimed(to);
        info!(%from, %to, round = self.round, "phase changed");
        self.emit(GameEvent::PhaseChanged {
            from,
            to,
            round: self.round,
            duration_ms: None,
            at: Utc::now(),
        });
        debug_assert!(self.state.is_consistent());
    }

    /// Cancel the active timer and retire its generation.
    fn invalidate_timer(&mut self) {
        self.state.cancel_timer();
        self.generation = self.generation.wrapping_add(1);
    }

    fn set_progress(&mut self, progress: f64) {
        self.progress = progress;
        self.emit(GameEvent::Progress {
            phase: self.state.phase(),
            progress,
            at: Utc::now(),
        });
    }

    fn reject(&self, err: GameError) -> GameError {
        warn!(error = %err, "start rejected");
        self.emit(GameEvent::StartRejected {
            reason: err.to_string(),
            at: Utc::now(),
        });
        err
    }

    fn emit(&self, event: GameEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GameMode;
    use crate::media::{MediaSignal, RecordingController};
    use crate::timer::SequenceSource;

    use MediaSignal::{Haptic, Pause, Play};

    struct Harness {
        scheduler: GameScheduler,
        timers: mpsc::UnboundedReceiver<TimerMessage>,
        media: RecordingController,
        events: broadcast::Receiver<GameEvent>,
    }

    fn harness(draws: Vec<u32>) -> Harness {
        let media = RecordingController::new();
        let (events_tx, events) = broadcast::channel(1024);
        let (timer_tx, timers) = mpsc::unbounded_channel();
        let scheduler = GameScheduler::new(
            Box::new(media.clone()),
            Box::new(SequenceSource::new(draws)),
            events_tx,
            timer_tx,
        );
        Harness {
            scheduler,
            timers,
            media,
            events,
        }
    }

    fn config(mode: GameMode) -> GameConfiguration {
        GameConfiguration {
            mode,
            play_min_secs: 1,
            play_max_secs: 5,
            pause_min_secs: 1,
            pause_max_secs: 5,
            haptic_enabled: false,
            settle_delay: Duration::ZERO,
            ..GameConfiguration::default()
        }
    }

    /// Feed timer messages until the current phase elapses.
    async fn finish_phase(h: &mut Harness) {
        loop {
            let msg = h.timers.recv().await.expect("timer channel open");
            let elapsed = matches!(msg, TimerMessage::Elapsed { .. });
            h.scheduler.on_timer(msg);
            if elapsed {
                return;
            }
        }
    }

    fn phase_changes(events: &mut broadcast::Receiver<GameEvent>) -> Vec<(Phase, Phase)> {
        let mut out = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let GameEvent::PhaseChanged { from, to, .. } = event {
                out.push((from, to));
            }
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn start_plays_exactly_once() {
        let mut h = harness(vec![3]);
        h.scheduler.start(config(GameMode::Statues), true).unwrap();

        assert_eq!(h.scheduler.phase(), Phase::Playing);
        assert_eq!(h.media.signals(), vec![Play]);
        let snap = h.scheduler.snapshot();
        assert_eq!(snap.round, 1);
        assert_eq!(snap.mode, Some(GameMode::Statues));
        assert_eq!(snap.remaining_ms, Some(3_000));
    }

    #[tokio::test(start_paused = true)]
    async fn silent_sensor_rejects_start() {
        let mut h = harness(vec![3]);
        let err = h.scheduler.start(config(GameMode::Statues), false).unwrap_err();

        assert_eq!(err, GameError::NoAudioActive);
        assert_eq!(h.scheduler.phase(), Phase::Idle);
        assert!(h.media.signals().is_empty());
        assert!(matches!(
            h.events.try_recv(),
            Ok(GameEvent::StartRejected { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn inverted_play_range_rejects_start() {
        let mut h = harness(vec![3]);
        let cfg = GameConfiguration {
            play_min_secs: 50,
            play_max_secs: 10,
            ..config(GameMode::Statues)
        };
        assert_eq!(
            h.scheduler.start(cfg, true),
            Err(GameError::InvalidPlayRange { min: 50, max: 10 })
        );
        assert_eq!(h.scheduler.phase(), Phase::Idle);
        assert!(h.media.signals().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn start_while_running_is_refused() {
        let mut h = harness(vec![3]);
        h.scheduler.start(config(GameMode::Statues), true).unwrap();
        assert_eq!(
            h.scheduler.start(config(GameMode::Statues), true),
            Err(GameError::AlreadyRunning {
                phase: Phase::Playing
            })
        );
        assert_eq!(h.media.signals(), vec![Play]);

        let rejections: Vec<_> = std::iter::from_fn(|| h.events.try_recv().ok())
            .filter_map(|event| match event {
                GameEvent::StartRejected { reason, .. } => Some(reason),
                _ => None,
            })
            .collect();
        assert_eq!(rejections, vec!["A game is already running (playing)".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn statues_alternates_with_haptics() {
        let mut h = harness(vec![2, 1]);
        let cfg = GameConfiguration {
            haptic_enabled: true,
            ..config(GameMode::Statues)
        };
        h.scheduler.start(cfg, true).unwrap();

        finish_phase(&mut h).await;
        assert_eq!(h.scheduler.phase(), Phase::Paused);
        assert_eq!(h.media.signals(), vec![Play, Pause, Haptic]);

        finish_phase(&mut h).await;
        assert_eq!(h.scheduler.phase(), Phase::Playing);
        assert_eq!(h.scheduler.snapshot().round, 2);
        assert_eq!(h.media.signals(), vec![Play, Pause, Haptic, Play]);

        finish_phase(&mut h).await;
        assert_eq!(h.scheduler.phase(), Phase::Paused);
        assert_eq!(
            phase_changes(&mut h.events),
            vec![
                (Phase::Idle, Phase::Playing),
                (Phase::Playing, Phase::Paused),
                (Phase::Paused, Phase::Playing),
                (Phase::Playing, Phase::Paused),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn haptic_stays_quiet_when_disabled() {
        let mut h = harness(vec![1]);
        h.scheduler.start(config(GameMode::Statues), true).unwrap();
        finish_phase(&mut h).await;
        assert_eq!(h.media.signals(), vec![Play, Pause]);
    }

    #[tokio::test(start_paused = true)]
    async fn chairs_parks_until_resumed() {
        let mut h = harness(vec![2]);
        h.scheduler.start(config(GameMode::Chairs), true).unwrap();

        assert_eq!(
            h.scheduler.resume_round(),
            Err(GameError::ResumeInWrongPhase {
                phase: Phase::Playing
            })
        );

        finish_phase(&mut h).await;
        assert_eq!(h.scheduler.phase(), Phase::AwaitingNextRound);
        assert_eq!(h.media.signals(), vec![Play, Pause]);
        assert_eq!(h.scheduler.snapshot().progress, 0.0);
        assert_eq!(h.scheduler.snapshot().remaining_ms, None);

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert!(h.timers.try_recv().is_err());
        assert_eq!(h.scheduler.phase(), Phase::AwaitingNextRound);

        h.scheduler.resume_round().unwrap();
        assert_eq!(h.scheduler.phase(), Phase::Playing);
        assert_eq!(h.scheduler.snapshot().round, 2);
        assert_eq!(h.media.signals(), vec![Play, Pause, Play]);
    }

    #[tokio::test(start_paused = true)]
    async fn chairs_checkpoint_pulses_haptic() {
        let mut h = harness(vec![2]);
        let cfg = GameConfiguration {
            haptic_enabled: true,
            ..config(GameMode::Chairs)
        };
        h.scheduler.start(cfg, true).unwrap();

        finish_phase(&mut h).await;
        assert_eq!(h.scheduler.phase(), Phase::AwaitingNextRound);
        assert_eq!(h.media.signals(), vec![Play, Pause, Haptic]);

        h.scheduler.resume_round().unwrap();
        h.scheduler.stop();
        assert_eq!(h.media.signals(), vec![Play, Pause, Haptic, Play, Pause]);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_routes_through_stopped_to_idle() {
        let mut h = harness(vec![4]);
        h.scheduler.start(config(GameMode::Statues), true).unwrap();
        h.scheduler.stop();

        assert_eq!(h.scheduler.phase(), Phase::Idle);
        assert_eq!(h.media.signals(), vec![Play, Pause]);
        let snap = h.scheduler.snapshot();
        assert_eq!((snap.round, snap.progress, snap.mode), (0, 0.0, None));
        assert_eq!(
            phase_changes(&mut h.events),
            vec![
                (Phase::Idle, Phase::Playing),
                (Phase::Playing, Phase::Stopped),
                (Phase::Stopped, Phase::Idle),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stop_from_checkpoint_pauses_again() {
        let mut h = harness(vec![1]);
        h.scheduler.start(config(GameMode::Chairs), true).unwrap();
        finish_phase(&mut h).await;
        h.scheduler.stop();
        assert_eq!(h.scheduler.phase(), Phase::Idle);
        assert_eq!(h.media.signals(), vec![Play, Pause, Pause]);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_while_idle_sends_nothing() {
        let mut h = harness(vec![1]);
        h.scheduler.stop();
        assert_eq!(h.scheduler.phase(), Phase::Idle);
        assert!(h.media.signals().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_timer_messages_are_ignored() {
        let mut h = harness(vec![2, 3]);
        h.scheduler.start(config(GameMode::Statues), true).unwrap();
        let old = h.scheduler.generation;
        h.scheduler.stop();
        h.scheduler.start(config(GameMode::Statues), true).unwrap();

        h.scheduler.on_timer(TimerMessage::Elapsed { generation: old });
        h.scheduler.on_timer(TimerMessage::Tick {
            generation: old,
            progress: 0.9,
        });

        assert_eq!(h.scheduler.phase(), Phase::Playing);
        assert_eq!(h.scheduler.snapshot().progress, 0.0);
        assert_eq!(h.media.signals(), vec![Play, Pause, Play]);
    }

    #[tokio::test(start_paused = true)]
    async fn progress_tracks_current_timer() {
        let mut h = harness(vec![1]);
        h.scheduler.start(config(GameMode::Statues), true).unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        while let Ok(msg) = h.timers.try_recv() {
            h.scheduler.on_timer(msg);
        }
        let progress = h.scheduler.snapshot().progress;
        assert!(progress > 0.4 && progress <= 0.5, "progress {progress}");
    }
}
