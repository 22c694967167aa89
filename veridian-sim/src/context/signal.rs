use derive_more::Display;
use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Symbol universe used when the caller supplies none.
pub const DEFAULT_SYMBOLS: [&str; 8] = [
    "BTC/USDT",
    "ETH/USDT",
    "SOL/USDT",
    "BNB/USDT",
    "XRP/USDT",
    "AVAX/USDT",
    "LINK/USDT",
    "ARB/USDT",
];

/// Mean absolute 24h change (%) at or above which volatility is `High`.
const HIGH_VOLATILITY_CHANGE_PCT: f64 = 5.0;

/// Mean absolute 24h change (%) at or below which volatility is `Low`.
const LOW_VOLATILITY_CHANGE_PCT: f64 = 1.5;

/// Mean signed 24h change (%) beyond which the trend is directional.
const TREND_CHANGE_PCT: f64 = 1.0;

/// Absolute 24h change (%) at which a symbol counts as a mover.
pub const MOVER_CHANGE_PCT: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Volatility {
    #[display("low")]
    Low,
    #[default]
    #[display("medium")]
    Medium,
    #[display("high")]
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    #[display("up")]
    Up,
    #[display("down")]
    Down,
    #[default]
    #[display("sideways")]
    Sideways,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Volume {
    #[display("low")]
    Low,
    #[default]
    #[display("normal")]
    Normal,
    #[display("high")]
    High,
}

/// Market-condition label a template can declare affinity for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketLabel {
    #[display("volatile")]
    Volatile,
    #[display("quiet")]
    Quiet,
    #[display("bullish")]
    Bullish,
    #[display("bearish")]
    Bearish,
    #[display("ranging")]
    Ranging,
    #[display("heavy_volume")]
    HeavyVolume,
}

/// Bucketed market signal, refreshed externally on its own cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MarketCondition {
    pub volatility: Volatility,
    pub trend: Trend,
    pub volume: Volume,
}

impl MarketCondition {
    pub fn new(volatility: Volatility, trend: Trend, volume: Volume) -> Self {
        Self {
            volatility,
            trend,
            volume,
        }
    }

    /// Whether this condition carries `label`.
    pub fn has_label(&self, label: MarketLabel) -> bool {
        match label {
            MarketLabel::Volatile => self.volatility == Volatility::High,
            MarketLabel::Quiet => self.volatility == Volatility::Low,
            MarketLabel::Bullish => self.trend == Trend::Up,
            MarketLabel::Bearish => self.trend == Trend::Down,
            MarketLabel::Ranging => self.trend == Trend::Sideways,
            MarketLabel::HeavyVolume => self.volume == Volume::High,
        }
    }

    /// Derive a condition from a ticker snapshot.
    ///
    /// `volume_baseline` is the aggregate 24h volume considered "normal"; `None`
    /// leaves the volume bucket at [`Volume::Normal`].
    pub fn from_tickers<'a>(
        tickers: impl IntoIterator<Item = &'a Ticker>,
        volume_baseline: Option<f64>,
    ) -> Self {
        let (count, abs_sum, signed_sum, volume_sum) = tickers
            .into_iter()
            .filter(|ticker| ticker.change_24h.is_finite())
            .fold((0usize, 0.0, 0.0, 0.0), |(n, abs, signed, vol), ticker| {
                (
                    n + 1,
                    abs + ticker.change_24h.abs(),
                    signed + ticker.change_24h,
                    vol + ticker.volume_24h.max(0.0),
                )
            });

        if count == 0 {
            return Self::default();
        }

        let mean_abs = abs_sum / count as f64;
        let mean_signed = signed_sum / count as f64;

        let volatility = if mean_abs >= HIGH_VOLATILITY_CHANGE_PCT {
            Volatility::High
        } else if mean_abs <= LOW_VOLATILITY_CHANGE_PCT {
            Volatility::Low
        } else {
            Volatility::Medium
        };

        let trend = if mean_signed > TREND_CHANGE_PCT {
            Trend::Up
        } else if mean_signed < -TREND_CHANGE_PCT {
            Trend::Down
        } else {
            Trend::Sideways
        };

        let volume = match volume_baseline.filter(|baseline| *baseline > 0.0) {
            Some(baseline) if volume_sum >= baseline * 1.5 => Volume::High,
            Some(baseline) if volume_sum <= baseline * 0.5 => Volume::Low,
            _ => Volume::Normal,
        };

        Self {
            volatility,
            trend,
            volume,
        }
    }
}

/// Live price snapshot for a symbol. `change_24h` is a percentage.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Ticker {
    pub price: f64,
    pub change_24h: f64,
    pub volume_24h: f64,
}

impl Ticker {
    pub fn new(price: f64, change_24h: f64, volume_24h: f64) -> Self {
        Self {
            price,
            change_24h,
            volume_24h,
        }
    }

    fn is_usable(&self) -> bool {
        self.price.is_finite() && self.price > 0.0 && self.change_24h.is_finite()
    }
}

/// Everything the simulation reads from its collaborators.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MarketSignals {
    pub symbols: Vec<SmolStr>,
    pub condition: MarketCondition,
    pub tickers: FnvHashMap<SmolStr, Ticker>,
    pub pnl: f64,
    pub allocation_limit: f64,
    /// Symbols another stream is currently talking about.
    pub focus_symbols: Vec<SmolStr>,
}

impl MarketSignals {
    pub fn new<S>(symbols: impl IntoIterator<Item = S>) -> Self
    where
        S: Into<SmolStr>,
    {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_condition(mut self, condition: MarketCondition) -> Self {
        self.condition = condition;
        self
    }

    pub fn with_ticker(mut self, symbol: impl Into<SmolStr>, ticker: Ticker) -> Self {
        self.tickers.insert(symbol.into(), ticker);
        self
    }

    pub fn with_portfolio(mut self, pnl: f64, allocation_limit: f64) -> Self {
        self.pnl = pnl;
        self.allocation_limit = allocation_limit;
        self
    }

    /// Configured symbols, or [`DEFAULT_SYMBOLS`] when none were supplied.
    pub fn universe(&self) -> Vec<SmolStr> {
        let symbols: Vec<SmolStr> = self
            .symbols
            .iter()
            .filter(|symbol| !symbol.trim().is_empty())
            .cloned()
            .collect();

        if symbols.is_empty() {
            DEFAULT_SYMBOLS.iter().map(|symbol| SmolStr::new(symbol)).collect()
        } else {
            symbols
        }
    }

    /// Realised pnl as a fraction of the allocation. Zero without a usable allocation.
    pub fn pnl_ratio(&self) -> f64 {
        let usable = self.allocation_limit.is_finite() && self.allocation_limit > 0.0;
        if usable && self.pnl.is_finite() {
            self.pnl / self.allocation_limit
        } else {
            0.0
        }
    }

    /// Ticker for `symbol`, ignoring malformed snapshots.
    pub fn ticker(&self, symbol: &str) -> Option<&Ticker> {
        self.tickers.get(symbol).filter(|ticker| ticker.is_usable())
    }

    /// 24h change (%) for `symbol`, if a usable ticker exists.
    pub fn change_24h(&self, symbol: &str) -> Option<f64> {
        self.ticker(symbol).map(|ticker| ticker.change_24h)
    }

    /// Symbols whose absolute 24h change reaches [`MOVER_CHANGE_PCT`].
    pub fn movers(&self) -> Vec<SmolStr> {
        self.universe()
            .into_iter()
            .filter(|symbol| {
                self.change_24h(symbol)
                    .is_some_and(|change| change.abs() >= MOVER_CHANGE_PCT)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_tickers() {
        struct TestCase {
            changes: Vec<f64>,
            expected_volatility: Volatility,
            expected_trend: Trend,
        }

        let tests = vec![
            TestCase {
                // TC0: no tickers defaults
                changes: vec![],
                expected_volatility: Volatility::Medium,
                expected_trend: Trend::Sideways,
            },
            TestCase {
                // TC1: large moves both ways
                changes: vec![8.0, -7.0, 6.5],
                expected_volatility: Volatility::High,
                expected_trend: Trend::Up,
            },
            TestCase {
                // TC2: quiet tape
                changes: vec![0.4, -0.2, 0.3],
                expected_volatility: Volatility::Low,
                expected_trend: Trend::Sideways,
            },
            TestCase {
                // TC3: steady sell-off
                changes: vec![-3.0, -2.5, -2.0],
                expected_volatility: Volatility::Medium,
                expected_trend: Trend::Down,
            },
            TestCase {
                // TC4: non-finite changes are ignored
                changes: vec![f64::NAN, 0.1],
                expected_volatility: Volatility::Low,
                expected_trend: Trend::Sideways,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let tickers: Vec<Ticker> = test
                .changes
                .iter()
                .map(|change| Ticker::new(100.0, *change, 1_000.0))
                .collect();
            let actual = MarketCondition::from_tickers(&tickers, None);
            assert_eq!(actual.volatility, test.expected_volatility, "TC{} failed", index);
            assert_eq!(actual.trend, test.expected_trend, "TC{} failed", index);
            assert_eq!(actual.volume, Volume::Normal, "TC{} failed", index);
        }
    }

    #[test]
    fn test_from_tickers_volume_baseline() {
        let tickers = [Ticker::new(1.0, 0.0, 900.0), Ticker::new(1.0, 0.0, 900.0)];
        assert_eq!(MarketCondition::from_tickers(&tickers, Some(1_000.0)).volume, Volume::High);
        assert_eq!(MarketCondition::from_tickers(&tickers, Some(4_000.0)).volume, Volume::Low);
        assert_eq!(MarketCondition::from_tickers(&tickers, Some(0.0)).volume, Volume::Normal);
    }

    #[test]
    fn test_labels() {
        let condition = MarketCondition::new(Volatility::High, Trend::Down, Volume::High);
        assert!(condition.has_label(MarketLabel::Volatile));
        assert!(condition.has_label(MarketLabel::Bearish));
        assert!(condition.has_label(MarketLabel::HeavyVolume));
        assert!(!condition.has_label(MarketLabel::Quiet));
        assert!(!condition.has_label(MarketLabel::Ranging));
    }

    #[test]
    fn test_universe_defaults_when_empty() {
        let signals = MarketSignals::new(Vec::<&str>::new());
        assert_eq!(signals.universe().len(), DEFAULT_SYMBOLS.len());

        let blank = MarketSignals::new(["  "]);
        assert_eq!(blank.universe()[0], "BTC/USDT");

        let custom = MarketSignals::new(["DOGE/USDT"]);
        assert_eq!(custom.universe(), vec![SmolStr::new("DOGE/USDT")]);
    }

    #[test]
    fn test_pnl_ratio_defaults() {
        assert_eq!(MarketSignals::default().with_portfolio(-50.0, 0.0).pnl_ratio(), 0.0);
        assert_eq!(MarketSignals::default().with_portfolio(f64::NAN, 100.0).pnl_ratio(), 0.0);
        assert_eq!(MarketSignals::default().with_portfolio(-50.0, 5_000.0).pnl_ratio(), -0.01);
    }

    #[test]
    fn test_movers_skip_malformed_tickers() {
        let signals = MarketSignals::new(["BTC/USDT", "ETH/USDT", "SOL/USDT"])
            .with_ticker("BTC/USDT", Ticker::new(60_000.0, 3.2, 1.0))
            .with_ticker("ETH/USDT", Ticker::new(0.0, 9.0, 1.0))
            .with_ticker("SOL/USDT", Ticker::new(150.0, -0.5, 1.0));

        assert_eq!(signals.movers(), vec![SmolStr::new("BTC/USDT")]);
        assert!(signals.ticker("ETH/USDT").is_none());
    }
}
