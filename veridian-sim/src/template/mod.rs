use crate::context::{
    evaluator::{ActiveEvents, EventFlag},
    session::TimeOfDay,
    signal::{MarketCondition, MarketLabel},
};
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Bot-activity catalog.
pub mod activity;

/// Smart-alert catalog.
pub mod alert;

/// Template priority, driving the sampling weight (low=1, medium=2, high=3).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[display("low")]
    Low,
    #[display("medium")]
    Medium,
    #[display("high")]
    High,
}

impl Priority {
    pub fn weight(&self) -> u32 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }
}

/// Template category. The first block belongs to the bot-activity stream, the
/// second to the smart-alert stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum Category {
    #[display("market_scanning")]
    #[serde(rename = "market_scanning")]
    MarketScanning,
    #[display("trade_execution")]
    #[serde(rename = "trade_execution")]
    TradeExecution,
    #[display("risk_management")]
    #[serde(rename = "risk_management")]
    RiskManagement,
    #[display("portfolio_rebalancing")]
    #[serde(rename = "portfolio_rebalancing")]
    PortfolioRebalancing,
    #[display("signal_analysis")]
    #[serde(rename = "signal_analysis")]
    SignalAnalysis,
    #[display("arbitrage")]
    #[serde(rename = "arbitrage")]
    Arbitrage,
    #[display("news_sentiment")]
    #[serde(rename = "news_sentiment")]
    NewsSentiment,
    #[display("strategy_optimization")]
    #[serde(rename = "strategy_optimization")]
    StrategyOptimization,
    #[display("user_interaction")]
    #[serde(rename = "user_interaction")]
    UserInteraction,

    #[display("Market Volatility")]
    #[serde(rename = "Market Volatility")]
    MarketVolatility,
    #[display("Execution Success")]
    #[serde(rename = "Execution Success")]
    ExecutionSuccess,
    #[display("Risk Warning")]
    #[serde(rename = "Risk Warning")]
    RiskWarning,
    #[display("Portfolio Update")]
    #[serde(rename = "Portfolio Update")]
    PortfolioUpdate,
    #[display("Arbitrage Opportunity")]
    #[serde(rename = "Arbitrage Opportunity")]
    ArbitrageOpportunity,
    #[display("News Impact")]
    #[serde(rename = "News Impact")]
    NewsImpact,
    #[display("Performance Milestone")]
    #[serde(rename = "Performance Milestone")]
    PerformanceMilestone,
    #[display("System Status")]
    #[serde(rename = "System Status")]
    SystemStatus,
}

/// When a template may fire. Each empty axis matches any context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eligibility {
    /// Time-of-day buckets the template is written for.
    pub time: &'static [TimeOfDay],
    /// Market labels, any of which must be present.
    pub market: &'static [MarketLabel],
    /// Event flags, all of which must be active.
    pub requires: &'static [EventFlag],
}

impl Eligibility {
    pub const ANY: Eligibility = Eligibility {
        time: &[],
        market: &[],
        requires: &[],
    };

    pub fn matches(
        &self,
        time_of_day: TimeOfDay,
        condition: &MarketCondition,
        active: &ActiveEvents,
    ) -> bool {
        let time = self.time.is_empty() || self.time.contains(&time_of_day);
        let market = self.market.is_empty()
            || self.market.iter().any(|label| condition.has_label(*label));
        let requires = self.requires.iter().all(|flag| active.is_active(*flag));

        time && market && requires
    }
}

/// Parameterised message pattern. `body` holds `{placeholder}` tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventTemplate {
    pub id: &'static str,
    pub category: Category,
    pub priority: Priority,
    pub body: &'static str,
    pub eligibility: Eligibility,
}

impl EventTemplate {
    pub const fn new(
        id: &'static str,
        category: Category,
        priority: Priority,
        body: &'static str,
    ) -> Self {
        Self {
            id,
            category,
            priority,
            body,
            eligibility: Eligibility::ANY,
        }
    }

    /// Restrict to the given time-of-day buckets.
    pub const fn at(self, time: &'static [TimeOfDay]) -> Self {
        Self {
            eligibility: Eligibility {
                time,
                ..self.eligibility
            },
            ..self
        }
    }

    /// Restrict to contexts carrying any of the given market labels.
    pub const fn when(self, market: &'static [MarketLabel]) -> Self {
        Self {
            eligibility: Eligibility {
                market,
                ..self.eligibility
            },
            ..self
        }
    }

    /// Require every given event flag to be active.
    pub const fn requires(self, requires: &'static [EventFlag]) -> Self {
        Self {
            eligibility: Eligibility {
                requires,
                ..self.eligibility
            },
            ..self
        }
    }

    /// Placeholder names appearing in `body`, in order, including repeats.
    pub fn placeholders(&self) -> impl Iterator<Item = &'static str> {
        placeholders(self.body)
    }
}

/// Iterate the `{name}` tokens of `body`. An unterminated `{` ends the scan.
pub fn placeholders(body: &str) -> impl Iterator<Item = &str> {
    let mut rest = body;
    std::iter::from_fn(move || {
        let open = rest.find('{')?;
        let close = rest[open..].find('}')? + open;
        let name = &rest[open + 1..close];
        rest = &rest[close + 1..];
        Some(name)
    })
}
