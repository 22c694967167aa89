use super::{
    config::{Bounds, TimingConfig},
    window::{WindowState, WindowStep},
};
use crate::{
    context::{
        regime::MarketRegime,
        session::{SessionSlot, TimeOfDay},
        signal::{Trend, Volatility},
    },
    random::RandomSource,
};
use std::{collections::VecDeque, time::Duration};
use tracing::debug;

/// Context the delay computation reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalContext {
    pub time_of_day: TimeOfDay,
    pub volatility: Volatility,
    pub trend: Trend,
    pub session: SessionSlot,
    pub regime: MarketRegime,
}

/// Mutable scheduling state owned by one controller.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IntervalState {
    pub burst: WindowState,
    pub calm: WindowState,
    history: VecDeque<f64>,
}

impl IntervalState {
    /// Recent delays in milliseconds, oldest first.
    pub fn history(&self) -> impl Iterator<Item = f64> + '_ {
        self.history.iter().copied()
    }

    pub fn reset(&mut self) {
        self.burst.reset();
        self.calm.reset();
        self.history.clear();
    }

    fn record(&mut self, delay_ms: f64, capacity: usize) {
        if capacity == 0 {
            return;
        }
        while self.history.len() >= capacity {
            self.history.pop_front();
        }
        self.history.push_back(delay_ms);
    }

    fn is_regular(&self, delay_ms: f64, capacity: usize, band: f64) -> bool {
        capacity > 0
            && self.history.len() >= capacity
            && self
                .history
                .iter()
                .all(|past| (past - delay_ms).abs() <= band * delay_ms)
    }
}

/// Result of one delay computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledDelay {
    pub delay: Duration,
    pub burst: WindowStep,
    pub calm: WindowStep,
    /// Whether the regularity breaker rewrote the delay.
    pub corrected: bool,
}

/// Compute the delay until the next emission.
///
/// Factors apply in order: base × variance, time of day, volatility, trend,
/// session and regime tempo, burst × calm, floor. The regularity breaker then
/// compares against recent history, the floor is re-applied and the result
/// recorded.
pub fn next_delay(
    config: &TimingConfig,
    ctx: &IntervalContext,
    state: &mut IntervalState,
    rng: &mut dyn RandomSource,
) -> ScheduledDelay {
    let mut interval = config.base_interval_ms
        * rng.uniform(1.0 - config.variance, 1.0 + config.variance);

    interval *= config.time_of_day.get(ctx.time_of_day);

    interval *= match ctx.volatility {
        Volatility::High => config.high_volatility,
        Volatility::Low => config.low_volatility,
        Volatility::Medium => 1.0,
    };

    interval *= match ctx.trend {
        Trend::Up | Trend::Down => config.trending,
        Trend::Sideways => config.sideways,
    };

    let session = config.session_tempo.get(ctx.session);
    let regime = config.regime_tempo.get(ctx.regime);
    interval *= rng.uniform(session.min, session.max);
    interval *= rng.uniform(regime.min, regime.max);

    let burst = state.burst.advance(&config.burst, rng);
    let calm = state.calm.advance(&config.calm, rng);
    interval *= burst.multiplier() * calm.multiplier();

    if let WindowStep::Triggered { length, .. } = burst {
        debug!(length, "burst window triggered");
    }
    if let WindowStep::Triggered { length, .. } = calm {
        debug!(length, "calm window triggered");
    }

    let floor = config.min_interval_ms;
    interval = interval.max(floor);

    let breaker = &config.breaker;
    let capacity = if breaker.is_enabled() {
        breaker.history_len()
    } else {
        0
    };

    let mut corrected = false;
    if state.is_regular(interval, capacity, breaker.band) {
        // Shortening would be clamped back inside the band by the floor
        let allow_down = interval * (1.0 - 2.0 * breaker.band) >= floor;
        if let Some(factor) = correction_factor(breaker.correction, breaker.band, allow_down, rng) {
            debug!(baseline = interval, factor, "regular cadence detected, correcting");
            interval = (interval * factor).max(floor);
            corrected = true;
        }
    }

    state.record(interval, capacity);

    ScheduledDelay {
        delay: Duration::from_millis(interval.round() as u64),
        burst,
        calm,
        corrected,
    }
}

/// Correction factor within `correction` that lands outside `1 ± band`.
///
/// Picks a direction, then draws the deviation from `[min(2 × band, span), span]`.
/// Only lengthens when `allow_down` is false. `None` when no direction has room.
fn correction_factor(
    correction: Bounds,
    band: f64,
    allow_down: bool,
    rng: &mut dyn RandomSource,
) -> Option<f64> {
    let down_span = if allow_down {
        (1.0 - correction.min).max(0.0)
    } else {
        0.0
    };
    let up_span = (correction.max - 1.0).max(0.0);

    let (direction, span) = match (down_span > 0.0, up_span > 0.0) {
        (true, true) if rng.chance(0.5) => (-1.0, down_span),
        (true, true) => (1.0, up_span),
        (true, false) => (-1.0, down_span),
        (false, true) => (1.0, up_span),
        (false, false) => return None,
    };

    let deviation = rng.uniform((2.0 * band).min(span), span);
    Some(1.0 + direction * deviation)
}
