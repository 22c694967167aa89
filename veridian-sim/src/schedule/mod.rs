use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Timing presets, partial overrides and their validation.
pub mod config;

/// Burst and calm window countdowns.
pub mod window;

/// Delay computation and regularity breaker.
pub mod interval;

pub use config::{TimingConfig, TimingOverride};
pub use interval::{IntervalContext, IntervalState, ScheduledDelay, next_delay};
pub use window::{WindowState, WindowStep};

/// Controller scheduling phase.
///
/// `Idle` before enable, `Armed` while a timer is pending, `Fired` while an
/// emission is in progress before re-arming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    #[display("idle")]
    Idle,
    #[display("armed")]
    Armed,
    #[display("fired")]
    Fired,
}
