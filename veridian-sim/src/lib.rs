/// Veridian Sim - synthetic trading-bot event streams
///
/// Produces two independent, believable event streams for a trading dashboard:
/// - bot activity: scans, executions, rebalances, signals and other housekeeping
/// - smart alerts: rarer, higher-signal notices capped to a short list
///
/// Each stream picks an eligible template from its catalog, fills placeholders
/// with values anchored to live market signals and schedules the next emission
/// with jittered, bursty, regime-aware delays.
pub mod context;
pub mod controller;
pub mod error;
pub mod event;
pub mod fill;
pub mod random;
pub mod schedule;
pub mod select;
pub mod template;

// Re-export commonly used types for convenience
pub use context::{
    ActiveEvents, EventThresholds, MarketCondition, MarketRegime, MarketSignals, SessionSlot,
    Ticker, TimeOfDay, Trend, Volatility, Volume,
};
pub use controller::{
    ControllerConfig, Engine, EngineStats, EventBuffer, SimulationController, StreamKind,
};
pub use error::SimError;
pub use event::GeneratedEvent;
pub use random::{RandomSource, ScriptedRandom, SimRng};
pub use schedule::{Phase, TimingConfig, TimingOverride};
pub use template::{Category, EventTemplate, Priority};
