//! Context evaluator.
//!
//! Derives the "is X happening now" flags that gate template eligibility. Each
//! flag ORs a signal-derived threshold with a coin flip, so real market input
//! matters while the stream still moves when the tape is quiet.

use super::{
    regime::MarketRegime,
    session::SessionSlot,
    signal::{MarketSignals, Trend, Volatility, Volume},
};
use crate::random::RandomSource;
use derive_more::Display;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Event families a template can require to be active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventFlag {
    #[display("execution")]
    Execution,
    #[display("risk")]
    Risk,
    #[display("portfolio")]
    Portfolio,
    #[display("news")]
    News,
    #[display("user")]
    User,
    #[display("arbitrage")]
    Arbitrage,
}

/// Snapshot of which event families are currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActiveEvents {
    pub execution: bool,
    pub risk: bool,
    pub portfolio: bool,
    pub news: bool,
    pub user: bool,
    pub arbitrage: bool,
}

impl ActiveEvents {
    pub fn is_active(&self, flag: EventFlag) -> bool {
        match flag {
            EventFlag::Execution => self.execution,
            EventFlag::Risk => self.risk,
            EventFlag::Portfolio => self.portfolio,
            EventFlag::News => self.news,
            EventFlag::User => self.user,
            EventFlag::Arbitrage => self.arbitrage,
        }
    }

    /// Every flag raised, useful to make all conditional templates eligible.
    pub fn all() -> Self {
        Self {
            execution: true,
            risk: true,
            portfolio: true,
            news: true,
            user: true,
            arbitrage: true,
        }
    }

    /// Comma separated list of active flags, for logging.
    pub fn summary(&self) -> String {
        [
            EventFlag::Execution,
            EventFlag::Risk,
            EventFlag::Portfolio,
            EventFlag::News,
            EventFlag::User,
            EventFlag::Arbitrage,
        ]
        .into_iter()
        .filter(|flag| self.is_active(*flag))
        .join(",")
    }
}

/// Thresholds and coin-flip cut-offs for each flag.
///
/// Coin flips read as `random() > chance`, so a higher value means rarer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventThresholds {
    /// Absolute focal 24h move (%) that counts as an execution trigger.
    pub execution_move_pct: f64,
    pub execution_chance: f64,
    /// Pnl ratio at or below which risk is active (eg. -0.01 = -1%).
    pub risk_pnl_ratio: f64,
    pub risk_chance: f64,
    /// Absolute pnl ratio at which the portfolio is worth talking about.
    pub portfolio_pnl_ratio: f64,
    pub portfolio_chance: f64,
    /// Absolute focal 24h move (%) treated as newsworthy.
    pub news_move_pct: f64,
    pub news_chance: f64,
    /// Coin flip used during peak sessions.
    pub user_peak_chance: f64,
    pub user_chance: f64,
    /// Absolute spread (%) between focal and comparison moves.
    pub arbitrage_spread_pct: f64,
    pub arbitrage_chance: f64,
    /// Range for the focal move drawn when no price data is available.
    pub fallback_move_pct: f64,
}

impl Default for EventThresholds {
    fn default() -> Self {
        Self {
            execution_move_pct: 1.5,
            execution_chance: 0.55,
            risk_pnl_ratio: -0.01,
            risk_chance: 0.82,
            portfolio_pnl_ratio: 0.02,
            portfolio_chance: 0.7,
            news_move_pct: 3.0,
            news_chance: 0.85,
            user_peak_chance: 0.5,
            user_chance: 0.9,
            arbitrage_spread_pct: 1.0,
            arbitrage_chance: 0.8,
            fallback_move_pct: 2.5,
        }
    }
}

/// Inputs to [`evaluate`] that are not held by [`MarketSignals`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationInput<'a> {
    pub regime: MarketRegime,
    pub session: SessionSlot,
    pub signals: &'a MarketSignals,
    /// Symbol the next emission is most likely to be about.
    pub focal_symbol: &'a str,
    pub comparison_symbol: &'a str,
}

/// Derive [`ActiveEvents`] from signals, blended with coin flips.
pub fn evaluate(
    input: EvaluationInput<'_>,
    thresholds: &EventThresholds,
    rng: &mut dyn RandomSource,
) -> ActiveEvents {
    let signals = input.signals;
    let condition = signals.condition;
    let pnl_ratio = signals.pnl_ratio();

    let fallback = thresholds.fallback_move_pct;
    let focal_move = signals
        .change_24h(input.focal_symbol)
        .unwrap_or_else(|| rng.uniform(-fallback, fallback));
    let comparison_move = signals
        .change_24h(input.comparison_symbol)
        .unwrap_or_else(|| rng.uniform(-fallback, fallback));

    let execution = focal_move.abs() >= thresholds.execution_move_pct
        || (condition.trend != Trend::Sideways && input.regime != MarketRegime::Sideways)
            && rng.above(thresholds.execution_chance)
        || rng.above(thresholds.execution_chance);

    let risk = pnl_ratio <= thresholds.risk_pnl_ratio
        || condition.volatility == Volatility::High
        || rng.above(thresholds.risk_chance);

    let portfolio =
        pnl_ratio.abs() >= thresholds.portfolio_pnl_ratio || rng.above(thresholds.portfolio_chance);

    let news = focal_move.abs() >= thresholds.news_move_pct
        || condition.volume == Volume::High
        || input.regime == MarketRegime::Volatile && rng.above(thresholds.news_chance - 0.25)
        || rng.above(thresholds.news_chance);

    let user = input.session.is_peak() && rng.above(thresholds.user_peak_chance)
        || rng.above(thresholds.user_chance);

    let arbitrage = (focal_move - comparison_move).abs() >= thresholds.arbitrage_spread_pct
        || rng.above(thresholds.arbitrage_chance);

    ActiveEvents {
        execution,
        risk,
        portfolio,
        news,
        user,
        arbitrage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::signal::{MarketCondition, Ticker};
    use crate::random::ScriptedRandom;

    fn input<'a>(signals: &'a MarketSignals) -> EvaluationInput<'a> {
        EvaluationInput {
            regime: MarketRegime::Sideways,
            session: SessionSlot::AsiaMid,
            signals,
            focal_symbol: "BTC/USDT",
            comparison_symbol: "ETH/USDT",
        }
    }

    fn calm_signals() -> MarketSignals {
        MarketSignals::new(["BTC/USDT", "ETH/USDT"])
            .with_ticker("BTC/USDT", Ticker::new(60_000.0, 0.2, 1.0))
            .with_ticker("ETH/USDT", Ticker::new(3_000.0, 0.1, 1.0))
            .with_portfolio(10.0, 10_000.0)
    }

    #[test]
    fn test_quiet_market_with_losing_coins_is_inactive() {
        let signals = calm_signals();
        // Every coin flip returns 0.0, never above any threshold
        let mut rng = ScriptedRandom::constant(0.0);
        let active = evaluate(input(&signals), &EventThresholds::default(), &mut rng);
        assert_eq!(active, ActiveEvents::default());
        assert_eq!(active.summary(), "");
    }

    #[test]
    fn test_winning_coins_raise_every_flag() {
        let signals = calm_signals();
        let mut rng = ScriptedRandom::constant(0.99);
        let active = evaluate(input(&signals), &EventThresholds::default(), &mut rng);
        assert_eq!(active, ActiveEvents::all());
    }

    #[test]
    fn test_signals_raise_flags_without_coins() {
        struct TestCase {
            signals: MarketSignals,
            expected: fn(&ActiveEvents) -> bool,
        }

        let tests = vec![
            TestCase {
                // TC0: drawdown below -1% raises risk
                signals: calm_signals().with_portfolio(-150.0, 10_000.0),
                expected: |active| active.risk && active.portfolio == false,
            },
            TestCase {
                // TC1: high volatility raises risk
                signals: calm_signals().with_condition(MarketCondition::new(
                    Volatility::High,
                    Trend::Sideways,
                    Volume::Normal,
                )),
                expected: |active| active.risk,
            },
            TestCase {
                // TC2: big focal move raises execution and news
                signals: calm_signals().with_ticker("BTC/USDT", Ticker::new(60_000.0, 4.0, 1.0)),
                expected: |active| active.execution && active.news && active.arbitrage,
            },
            TestCase {
                // TC3: large pnl raises portfolio
                signals: calm_signals().with_portfolio(400.0, 10_000.0),
                expected: |active| active.portfolio && !active.risk,
            },
            TestCase {
                // TC4: heavy volume raises news
                signals: calm_signals().with_condition(MarketCondition::new(
                    Volatility::Medium,
                    Trend::Sideways,
                    Volume::High,
                )),
                expected: |active| active.news && !active.execution,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let mut rng = ScriptedRandom::constant(0.0);
            let actual = evaluate(input(&test.signals), &EventThresholds::default(), &mut rng);
            assert!((test.expected)(&actual), "TC{} failed: {:?}", index, actual);
        }
    }

    #[test]
    fn test_missing_prices_fall_back_to_random_move() {
        let signals = MarketSignals::default();
        // Fallback moves: 0.0 -> -2.5%, 0.999 -> ~+2.5%, spread ~5% raises arbitrage
        let mut rng = ScriptedRandom::new([0.0, 0.999], 0.0);
        let active = evaluate(input(&signals), &EventThresholds::default(), &mut rng);
        assert!(active.execution);
        assert!(active.arbitrage);
        assert!(!active.news);
    }

    #[test]
    fn test_summary_lists_active_flags() {
        let active = ActiveEvents {
            risk: true,
            news: true,
            ..ActiveEvents::default()
        };
        assert_eq!(active.summary(), "risk,news");
    }
}
