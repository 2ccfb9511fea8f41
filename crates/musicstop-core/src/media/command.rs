//! Transport backed by external commands.
//!
//! Each signal runs an operator-configured command line, for example
//! `playerctl play` on an MPRIS desktop. Commands are split on whitespace and
//! executed directly (no shell). Signals are spawned and forgotten; the child
//! is reaped by tokio in the background. The status command is awaited under
//! a timeout and killed if it overruns.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::{MediaController, MediaSignal, PlaybackActivitySensor};
use crate::storage::TransportConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
struct CommandLine {
    program: String,
    args: Vec<String>,
}

impl CommandLine {
    fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(str::to_owned);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }
}

/// Runs commands for play/pause/haptic and polls a status command.
#[derive(Debug, Clone)]
pub struct CommandTransport {
    play: Option<CommandLine>,
    pause: Option<CommandLine>,
    haptic: Option<CommandLine>,
    status: Option<CommandLine>,
    status_timeout: Duration,
}

impl CommandTransport {
    pub fn from_config(config: &TransportConfig) -> Self {
        Self {
            play: CommandLine::parse(&config.play_command),
            pause: CommandLine::parse(&config.pause_command),
            haptic: config.haptic_command.as_deref().and_then(CommandLine::parse),
            status: CommandLine::parse(&config.status_command),
            status_timeout: Duration::from_millis(config.status_timeout_ms),
        }
    }

    fn fire(&self, signal: MediaSignal) {
        let command = match signal {
            MediaSignal::Play => &self.play,
            MediaSignal::Pause => &self.pause,
            MediaSignal::Haptic => &self.haptic,
        };
        let Some(command) = command else {
            debug!(?signal, "no command configured");
            return;
        };

        let spawned = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        match spawned {
            Ok(_child) => debug!(?signal, program = %command.program, "signal sent"),
            Err(e) => warn!(?signal, program = %command.program, error = %e, "failed to send signal"),
        }
    }
}

impl MediaController for CommandTransport {
    fn send_play(&mut self) {
        self.fire(MediaSignal::Play);
    }

    fn send_pause(&mut self) {
        self.fire(MediaSignal::Pause);
    }

    fn pulse_haptic(&mut self) {
        self.fire(MediaSignal::Haptic);
    }
}

#[async_trait]
impl PlaybackActivitySensor for CommandTransport {
    /// Runs the play command so a paused player can resume before the poll.
    async fn wake(&mut self) {
        self.fire(MediaSignal::Play);
    }

    /// Active when the status command prints `Playing`.
    async fn is_audio_active(&self) -> bool {
        let Some(status) = &self.status else {
            warn!("no status command configured; assuming no audio");
            return false;
        };
        let mut command = Command::new(&status.program);
        command
            .args(&status.args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        match timeout(self.status_timeout, command.output()).await {
            Ok(Ok(output)) => {
                let reported = String::from_utf8_lossy(&output.stdout);
                let active = reported.trim().eq_ignore_ascii_case("playing");
                debug!(status = %reported.trim(), active, "polled playback status");
                active
            }
            Ok(Err(e)) => {
                warn!(program = %status.program, error = %e, "failed to poll playback status");
                false
            }
            Err(_) => {
                warn!(
                    program = %status.program,
                    timeout = ?self.status_timeout,
                    "playback status command timed out"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(status: &str) -> CommandTransport {
        CommandTransport::from_config(&TransportConfig {
            status_command: status.into(),
            ..TransportConfig::default()
        })
    }

    #[test]
    fn parses_program_and_args() {
        assert_eq!(
            CommandLine::parse("  playerctl -p spotify play "),
            Some(CommandLine {
                program: "playerctl".into(),
                args: vec!["-p".into(), "spotify".into(), "play".into()],
            })
        );
        assert_eq!(CommandLine::parse("   "), None);
    }

    #[test]
    fn blank_haptic_command_is_disabled() {
        let t = CommandTransport::from_config(&TransportConfig {
            haptic_command: Some(String::new()),
            ..TransportConfig::default()
        });
        assert!(t.haptic.is_none());
        assert!(t.play.is_some());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn status_output_decides_activity() {
        assert!(transport("echo Playing").is_audio_active().await);
        assert!(!transport("echo Paused").is_audio_active().await);
    }

    #[tokio::test]
    async fn missing_status_program_reads_as_inactive() {
        assert!(!transport("musicstop-no-such-program-xyz").is_audio_active().await);
        assert!(!transport("").is_audio_active().await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn hung_status_command_times_out_without_blocking() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let transport = CommandTransport::from_config(&TransportConfig {
            status_command: "sleep 5".into(),
            status_timeout_ms: 300,
            ..TransportConfig::default()
        });

        // Single-threaded runtime: the heartbeat only advances if the poll yields.
        let beats = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&beats);
        let heartbeat = tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_millis(20)).await;
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        let started = std::time::Instant::now();
        assert!(!transport.is_audio_active().await);
        let elapsed = started.elapsed();
        heartbeat.abort();

        assert!(elapsed < Duration::from_secs(2), "took {elapsed:?}");
        assert!(beats.load(Ordering::SeqCst) >= 3, "runtime was blocked");
    }
}
