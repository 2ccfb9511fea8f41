mod config;
mod handle;
mod scheduler;
mod state;

pub use config::{GameConfiguration, GameMode, PhasePlan, SettingsStore};
pub use handle::GameHandle;
pub use state::{Phase, RunState};
