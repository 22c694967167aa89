use crate::random::RandomSource;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Probability of re-drawing when the draw repeats the previous regime.
const REDRAW_PROBABILITY: f64 = 0.6;

/// Maximum re-draw attempts. Avoidance is soft: a repeat can still survive.
const REDRAW_ATTEMPTS: usize = 5;

/// Regime dwell time bounds in minutes.
const DWELL_MINUTES_MIN: f64 = 20.0;
const DWELL_MINUTES_MAX: f64 = 60.0;
const DWELL_JITTER_MINUTES: f64 = 5.0;

/// Coarse label for simulated market character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketRegime {
    #[display("bull")]
    Bull,
    #[display("bear")]
    Bear,
    #[display("sideways")]
    Sideways,
    #[display("volatile")]
    Volatile,
}

impl MarketRegime {
    pub const ALL: [MarketRegime; 4] = [
        MarketRegime::Bull,
        MarketRegime::Bear,
        MarketRegime::Sideways,
        MarketRegime::Volatile,
    ];
}

/// Narrative tone of a regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    #[display("bullish")]
    Bullish,
    #[display("bearish")]
    Bearish,
    #[display("neutral")]
    Neutral,
}

/// Win/loss narrative profile drawn for a regime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WinProfile {
    /// Fraction of simulated trades that close in profit, `[0, 1]`.
    pub win_rate: f64,
    /// Multiplier applied to loss magnitudes, `>= 1`.
    pub loss_skew: f64,
    pub tone: Tone,
}

/// Draw a regime uniformly.
///
/// When `previous` is supplied a repeated draw is re-rolled with probability 0.6,
/// up to five attempts. This is a soft preference, the result may still equal
/// `previous`.
pub fn pick_regime(previous: Option<MarketRegime>, rng: &mut dyn RandomSource) -> MarketRegime {
    let mut regime = MarketRegime::ALL[rng.index(MarketRegime::ALL.len())];

    if let Some(previous) = previous {
        for _ in 0..REDRAW_ATTEMPTS {
            if regime != previous || !rng.chance(REDRAW_PROBABILITY) {
                break;
            }
            regime = MarketRegime::ALL[rng.index(MarketRegime::ALL.len())];
        }
    }

    regime
}

/// Random dwell time: uniform 20-60 minutes plus ±5 minutes jitter, floored at 20 minutes.
pub fn regime_duration(rng: &mut dyn RandomSource) -> ChronoDuration {
    let minutes = rng.uniform(DWELL_MINUTES_MIN, DWELL_MINUTES_MAX)
        + rng.uniform(-DWELL_JITTER_MINUTES, DWELL_JITTER_MINUTES);
    let minutes = minutes.max(DWELL_MINUTES_MIN);
    ChronoDuration::milliseconds((minutes * 60_000.0).round() as i64)
}

/// Draw a [`WinProfile`] within the fixed bounds of `regime`.
pub fn regime_win_profile(regime: MarketRegime, rng: &mut dyn RandomSource) -> WinProfile {
    let ((win_lo, win_hi), (skew_lo, skew_hi), tone) = match regime {
        MarketRegime::Bull => ((0.62, 0.72), (1.0, 1.3), Tone::Bullish),
        MarketRegime::Bear => ((0.42, 0.52), (1.3, 1.8), Tone::Bearish),
        MarketRegime::Sideways => ((0.52, 0.60), (1.1, 1.4), Tone::Neutral),
        MarketRegime::Volatile => ((0.48, 0.62), (1.4, 2.0), Tone::Neutral),
    };

    WinProfile {
        win_rate: rng.uniform(win_lo, win_hi),
        loss_skew: rng.uniform(skew_lo, skew_hi),
        tone,
    }
}

/// Current regime, when it expires, and its narrative profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeState {
    pub regime: MarketRegime,
    pub expiry: DateTime<Utc>,
    pub win_profile: WinProfile,
}

impl RegimeState {
    /// Draw a fresh regime starting at `now`.
    pub fn new(now: DateTime<Utc>, rng: &mut dyn RandomSource) -> Self {
        Self::starting(pick_regime(None, rng), now, rng)
    }

    /// Pin `regime` starting at `now`.
    pub fn starting(regime: MarketRegime, now: DateTime<Utc>, rng: &mut dyn RandomSource) -> Self {
        Self {
            regime,
            expiry: now + regime_duration(rng),
            win_profile: regime_win_profile(regime, rng),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry
    }

    /// Redraw the regime if it has expired. Returns true when the regime label changed.
    pub fn refresh(&mut self, now: DateTime<Utc>, rng: &mut dyn RandomSource) -> bool {
        if !self.is_expired(now) {
            return false;
        }

        let previous = self.regime;
        self.regime = pick_regime(Some(previous), rng);
        self.expiry = now + regime_duration(rng);

        let changed = self.regime != previous;
        if changed {
            self.win_profile = regime_win_profile(self.regime, rng);
            info!(
                from = %previous,
                to = %self.regime,
                win_rate = self.win_profile.win_rate,
                expiry = %self.expiry,
                "market regime rotated"
            );
        }
        changed
    }
}
