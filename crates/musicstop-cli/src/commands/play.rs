use std::io::Write;

use clap::{Args, ValueEnum};
use musicstop_core::error::Result;
use musicstop_core::{
    CommandTransport, Config, GameEvent, GameHandle, GameMode, LoggingController, ManualSensor,
    PcgSource, Phase,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

const BAR_WIDTH: usize = 30;

#[derive(Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Statues,
    Chairs,
}

impl From<ModeArg> for GameMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Statues => GameMode::Statues,
            ModeArg::Chairs => GameMode::Chairs,
        }
    }
}

#[derive(Args)]
pub struct PlayArgs {
    /// Game mode (defaults to the configured mode)
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,
    /// Shortest play phase in seconds
    #[arg(long)]
    play_min: Option<u32>,
    /// Longest play phase in seconds
    #[arg(long)]
    play_max: Option<u32>,
    /// Shortest pause in seconds (statues)
    #[arg(long)]
    pause_min: Option<u32>,
    /// Longest pause in seconds (statues)
    #[arg(long)]
    pause_max: Option<u32>,
    /// Run the haptic command after every pause
    #[arg(long)]
    haptic: bool,
    /// Seed for reproducible phase durations
    #[arg(long)]
    seed: Option<u64>,
    /// Log signals instead of driving the music player
    #[arg(long)]
    dry_run: bool,
    /// Print events as JSON lines
    #[arg(long)]
    json: bool,
}

impl PlayArgs {
    /// Apply command-line overrides for this run only.
    fn apply(&self, config: &mut Config) {
        if let Some(mode) = self.mode {
            config.game.mode = mode.into();
        }
        if let Some(v) = self.play_min {
            config.game.play_min_secs = v;
        }
        if let Some(v) = self.play_max {
            config.game.play_max_secs = v;
        }
        if let Some(v) = self.pause_min {
            config.game.pause_min_secs = v;
        }
        if let Some(v) = self.pause_max {
            config.game.pause_max_secs = v;
        }
        if self.haptic {
            config.game.haptic_enabled = true;
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Input {
    NextRound,
    Stop,
    Unknown,
}

fn parse_input(line: &str) -> Input {
    match line.trim().to_ascii_lowercase().as_str() {
        "" | "n" | "next" | "r" | "resume" => Input::NextRound,
        "q" | "quit" | "s" | "stop" => Input::Stop,
        _ => Input::Unknown,
    }
}

pub fn run(args: PlayArgs) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(play(args))
}

async fn play(args: PlayArgs) -> Result<()> {
    let mut config = Config::load()?;
    args.apply(&mut config);

    let source = match args.seed {
        Some(seed) => PcgSource::from_seed(seed),
        None => PcgSource::from_entropy(),
    };
    let game = if args.dry_run {
        GameHandle::spawn(config.clone(), ManualSensor::active(), LoggingController, source)
    } else {
        let transport = CommandTransport::from_config(&config.transport);
        GameHandle::spawn(config.clone(), transport.clone(), transport, source)
    };

    let mut events = game.subscribe();
    let mut printer = EventPrinter::new(args.json);

    if let Err(e) = game.start().await {
        game.shutdown().await?;
        return Err(e.into());
    }
    if !args.json {
        eprintln!("mode: {}. <enter> starts the next round, q stops.", config.game.mode);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => match parse_input(&line) {
                    Input::NextRound => {
                        if let Err(e) = game.resume_round().await {
                            printer.notice(&e.to_string());
                        }
                    }
                    Input::Stop => break,
                    Input::Unknown => warn!(input = %line.trim(), "unrecognised input"),
                },
                None => break,
            },
            event = events.recv() => match event {
                Ok(event) => printer.print(&event)?,
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "event display lagged"),
                Err(RecvError::Closed) => break,
            },
            _ = &mut ctrl_c => break,
        }
    }

    game.stop().await?;
    while let Ok(event) = events.try_recv() {
        printer.print(&event)?;
    }
    game.shutdown().await?;
    Ok(())
}

/// Renders events as text with a progress bar, or as JSON lines.
struct EventPrinter {
    json: bool,
    /// Last drawn percentage, `None` when no bar is on screen.
    drawn_pct: Option<u32>,
}

impl EventPrinter {
    fn new(json: bool) -> Self {
        Self {
            json,
            drawn_pct: None,
        }
    }

    fn print(&mut self, event: &GameEvent) -> std::io::Result<()> {
        if self.json {
            if !matches!(event, GameEvent::Progress { .. }) {
                let line = serde_json::to_string(event).map_err(std::io::Error::other)?;
                println!("{line}");
            }
            return Ok(());
        }

        match event {
            GameEvent::PhaseChanged {
                to,
                round,
                duration_ms,
                ..
            } => {
                self.clear_bar();
                match (to, duration_ms) {
                    (Phase::AwaitingNextRound, _) => {
                        println!("round {round}: music stopped, press <enter> for the next round")
                    }
                    (_, Some(ms)) => println!("round {round}: {to} for {}s", ms / 1000),
                    (_, None) => println!("{to}"),
                }
            }
            GameEvent::Progress { phase, progress, .. } if phase.is_timed() => {
                let pct = (progress * 100.0).round() as u32;
                if self.drawn_pct != Some(pct) {
                    let mut stderr = std::io::stderr().lock();
                    write!(stderr, "\r{}", render_bar(*progress))?;
                    stderr.flush()?;
                    self.drawn_pct = Some(pct);
                }
            }
            GameEvent::Progress { .. } | GameEvent::StartRejected { .. } => {}
        }
        Ok(())
    }

    fn notice(&mut self, message: &str) {
        self.clear_bar();
        eprintln!("{message}");
    }

    fn clear_bar(&mut self) {
        if self.drawn_pct.take().is_some() {
            eprintln!();
        }
    }
}

fn render_bar(progress: f64) -> String {
    let progress = progress.clamp(0.0, 1.0);
    let filled = (progress * BAR_WIDTH as f64).round() as usize;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        (progress * 100.0).round() as u32
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_commands() {
        assert_eq!(parse_input(""), Input::NextRound);
        assert_eq!(parse_input("  Next \n"), Input::NextRound);
        assert_eq!(parse_input("q"), Input::Stop);
        assert_eq!(parse_input("STOP"), Input::Stop);
        assert_eq!(parse_input("dance"), Input::Unknown);
    }

    #[test]
    fn bar_fills_with_progress() {
        assert_eq!(render_bar(0.0), format!("[{}]   0%", "-".repeat(BAR_WIDTH)));
        assert_eq!(render_bar(1.0), format!("[{}] 100%", "#".repeat(BAR_WIDTH)));
        assert!(render_bar(0.5).ends_with(" 50%"));
        assert_eq!(render_bar(7.0), render_bar(1.0));
    }

    #[test]
    fn overrides_apply_to_the_run() {
        let args = PlayArgs {
            mode: Some(ModeArg::Chairs),
            play_min: Some(5),
            play_max: None,
            pause_min: None,
            pause_max: Some(20),
            haptic: true,
            seed: None,
            dry_run: true,
            json: false,
        };
        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config.game.mode, GameMode::Chairs);
        assert_eq!(config.game.play_min_secs, 5);
        assert_eq!(config.game.play_max_secs, 40);
        assert_eq!(config.game.pause_max_secs, 20);
        assert!(config.game.haptic_enabled);
    }
}
