//! Event-loop front for the game scheduler.
//!
//! [`GameHandle::spawn`] moves the scheduler into one tokio task. Operator
//! commands and round-timer reports are both drained by that task, so every
//! transition is serialized and a `stop` processed before a pending timer
//! report leaves that report stale.

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::debug;

use super::config::SettingsStore;
use super::scheduler::{GameScheduler, TimerMessage};
use super::state::Phase;
use crate::error::GameError;
use crate::events::{GameEvent, GameSnapshot};
use crate::media::{MediaController, PlaybackActivitySensor};
use crate::timer::RandomSource;

const COMMAND_CAPACITY: usize = 32;
const EVENT_CAPACITY: usize = 256;

enum Command {
    Start {
        reply: oneshot::Sender<Result<(), GameError>>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
    ResumeRound {
        reply: oneshot::Sender<Result<(), GameError>>,
    },
    Snapshot {
        reply: oneshot::Sender<GameSnapshot>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable control surface for a running game scheduler.
///
/// When the last handle is dropped the scheduler stops any game in progress
/// and exits.
#[derive(Debug, Clone)]
pub struct GameHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<GameEvent>,
}

impl GameHandle {
    /// Spawn the scheduler task.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn spawn<S, P, M, R>(settings: S, sensor: P, controller: M, source: R) -> Self
    where
        S: SettingsStore + 'static,
        P: PlaybackActivitySensor + 'static,
        M: MediaController + 'static,
        R: RandomSource + 'static,
    {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();

        let scheduler = GameScheduler::new(
            Box::new(controller),
            Box::new(source),
            events.clone(),
            timer_tx,
        );
        let event_loop = EventLoop {
            settings: Box::new(settings),
            sensor: Box::new(sensor),
            scheduler,
            commands: command_rx,
            timers: timer_rx,
        };
        tokio::spawn(event_loop.run());

        Self {
            commands: command_tx,
            events,
        }
    }

    /// Subscribe to phase and progress notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.events.subscribe()
    }

    /// Start a game with the current settings.
    ///
    /// Wakes the playback sensor, waits for the configured settle delay,
    /// polls the sensor once, then validates the interval ranges.
    ///
    /// # Errors
    ///
    /// `NoAudioActive`, `InvalidPlayRange`, `InvalidPauseRange` or
    /// `AlreadyRunning`; the game stays as it was.
    pub async fn start(&self) -> Result<(), GameError> {
        self.request(|reply| Command::Start { reply }).await?
    }

    /// Stop the game in progress. A no-op while idle.
    pub async fn stop(&self) -> Result<(), GameError> {
        self.request(|reply| Command::Stop { reply }).await
    }

    /// Continue after a chairs-mode elimination checkpoint.
    ///
    /// # Errors
    ///
    /// `ResumeInWrongPhase` unless the game is awaiting the next round.
    pub async fn resume_round(&self) -> Result<(), GameError> {
        self.request(|reply| Command::ResumeRound { reply }).await?
    }

    pub async fn snapshot(&self) -> Result<GameSnapshot, GameError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub async fn phase(&self) -> Result<Phase, GameError> {
        Ok(self.snapshot().await?.phase)
    }

    /// Stop any game and end the scheduler task.
    pub async fn shutdown(&self) -> Result<(), GameError> {
        self.request(|reply| Command::Shutdown { reply }).await
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, GameError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| GameError::SchedulerGone)?;
        response.await.map_err(|_| GameError::SchedulerGone)
    }
}

struct EventLoop {
    settings: Box<dyn SettingsStore>,
    sensor: Box<dyn PlaybackActivitySensor>,
    scheduler: GameScheduler,
    commands: mpsc::Receiver<Command>,
    timers: mpsc::UnboundedReceiver<TimerMessage>,
}

impl EventLoop {
    async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                command = self.commands.recv() => match command {
                    Some(command) => {
                        if !self.handle(command).await {
                            break;
                        }
                    }
                    None => {
                        self.scheduler.stop();
                        break;
                    }
                },
                Some(message) = self.timers.recv() => self.scheduler.on_timer(message),
            }
        }
        debug!("game scheduler exited");
    }

    /// Returns `false` once the loop should exit.
    async fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Start { reply } => {
                let result = self.start().await;
                let _ = reply.send(result);
            }
            Command::Stop { reply } => {
                self.scheduler.stop();
                let _ = reply.send(());
            }
            Command::ResumeRound { reply } => {
                let _ = reply.send(self.scheduler.resume_round());
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.scheduler.snapshot());
            }
            Command::Shutdown { reply } => {
                self.scheduler.stop();
                let _ = reply.send(());
                return false;
            }
        }
        true
    }

    async fn start(&mut self) -> Result<(), GameError> {
        self.scheduler.ensure_idle()?;
        let config = self.settings.snapshot();
        self.sensor.wake().await;
        if !config.settle_delay.is_zero() {
            debug!(delay = ?config.settle_delay, "waiting for playback to settle");
            tokio::time::sleep(config.settle_delay).await;
        }
        let audio_active = self.sensor.is_audio_active().await;
        self.scheduler.start(config, audio_active)
    }
}
