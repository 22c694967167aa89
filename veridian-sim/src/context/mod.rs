/// Wall-clock buckets: time of day and exchange session slots.
pub mod session;

/// Slowly rotating market regime and its win/loss narrative profile.
pub mod regime;

/// Externally supplied market signals and their bucketed condition.
pub mod signal;

/// "Is X happening now" flags derived from signals and coin flips.
pub mod evaluator;

pub use evaluator::{ActiveEvents, EvaluationInput, EventFlag, EventThresholds, evaluate};
pub use regime::{MarketRegime, RegimeState, Tone, WinProfile};
pub use session::{SessionSlot, TimeOfDay};
pub use signal::{MarketCondition, MarketLabel, MarketSignals, Ticker, Trend, Volatility, Volume};
