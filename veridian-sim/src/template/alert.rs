use super::{
    Category::{
        ArbitrageOpportunity, ExecutionSuccess, MarketVolatility, NewsImpact,
        PerformanceMilestone, PortfolioUpdate, RiskWarning, SystemStatus,
    },
    EventTemplate,
    Priority::{High, Low, Medium},
};
use crate::context::{
    evaluator::EventFlag,
    session::TimeOfDay::{Evening, Morning, Night},
    signal::MarketLabel::{Bearish, Bullish, HeavyVolume, Quiet, Volatile},
};

pub const TEMPLATES: &[EventTemplate] = &[
    // Market Volatility
    EventTemplate::new(
        "alert-vol-spike",
        MarketVolatility,
        High,
        "{symbol} moved {move_pct} in {minutes} minutes, realised volatility {volatility_pct}",
    )
    .when(&[Volatile]),
    EventTemplate::new(
        "alert-vol-liquidations",
        MarketVolatility,
        High,
        "{liquidations} in {side} liquidations across {symbol} perps in the last hour",
    )
    .when(&[Volatile, HeavyVolume]),
    EventTemplate::new(
        "alert-vol-compression",
        MarketVolatility,
        Medium,
        "{symbol} {timeframe} range compressed to {range_pct}, expansion likely",
    )
    .when(&[Quiet]),
    EventTemplate::new(
        "alert-vol-iv",
        MarketVolatility,
        Low,
        "{base} implied volatility at {iv}, {iv_state} 30-day average",
    ),
    // Execution Success
    EventTemplate::new(
        "alert-exec-filled",
        ExecutionSuccess,
        High,
        "{direction} {symbol} filled at {fill_price}, slippage {slippage}",
    )
    .requires(&[EventFlag::Execution]),
    EventTemplate::new(
        "alert-exec-target",
        ExecutionSuccess,
        High,
        "Take-profit hit on {symbol}: {profit} secured ({gain_pct})",
    )
    .requires(&[EventFlag::Execution])
    .when(&[Bullish, Volatile]),
    EventTemplate::new(
        "alert-exec-batch",
        ExecutionSuccess,
        Medium,
        "{fill_count} orders filled across {markets} markets in {latency_ms}ms median",
    )
    .requires(&[EventFlag::Execution]),
    // Risk Warning
    EventTemplate::new(
        "alert-risk-drawdown",
        RiskWarning,
        High,
        "Drawdown at {drawdown} of allocation, risk limits tightened",
    )
    .requires(&[EventFlag::Risk]),
    EventTemplate::new(
        "alert-risk-stop",
        RiskWarning,
        High,
        "{symbol} within {distance_pct} of stop at {stop}",
    )
    .requires(&[EventFlag::Risk])
    .when(&[Bearish, Volatile]),
    EventTemplate::new(
        "alert-risk-funding",
        RiskWarning,
        Medium,
        "Funding on {symbol} at {funding_rate}, crowded {direction} positioning",
    ),
    // Portfolio Update
    EventTemplate::new(
        "alert-portfolio-pnl",
        PortfolioUpdate,
        Medium,
        "Portfolio {pnl_direction} {daily_pnl} today, {win_rate} win rate",
    )
    .requires(&[EventFlag::Portfolio]),
    EventTemplate::new(
        "alert-portfolio-allocation",
        PortfolioUpdate,
        Low,
        "{allocation_pct} of {capital} allocation deployed across {markets} pairs",
    ),
    EventTemplate::new(
        "alert-portfolio-close",
        PortfolioUpdate,
        Medium,
        "Daily close: {trades} trades, best performer {symbol} at {gain_pct}",
    )
    .at(&[Evening, Night]),
    // Arbitrage Opportunity
    EventTemplate::new(
        "alert-arb-spread",
        ArbitrageOpportunity,
        High,
        "{symbol} {spread_pct} spread between {exchange} and {exchange_b}",
    )
    .requires(&[EventFlag::Arbitrage]),
    EventTemplate::new(
        "alert-arb-basis",
        ArbitrageOpportunity,
        Medium,
        "{base} quarterly basis at {premium} annualised",
    )
    .requires(&[EventFlag::Arbitrage]),
    // News Impact
    EventTemplate::new(
        "alert-news-breaking",
        NewsImpact,
        High,
        "{news_source}: {news_topic}, {symbol} reacting {change}",
    )
    .requires(&[EventFlag::News]),
    EventTemplate::new(
        "alert-news-sentiment",
        NewsImpact,
        Medium,
        "{base} sentiment turned {sentiment} across {headlines} sources",
    )
    .requires(&[EventFlag::News]),
    EventTemplate::new(
        "alert-news-calendar",
        NewsImpact,
        Low,
        "{news_topic} scheduled in {hours}h, expect elevated volatility",
    )
    .at(&[Morning]),
    // Performance Milestone
    EventTemplate::new(
        "alert-milestone-streak",
        PerformanceMilestone,
        Medium,
        "{streak} consecutive winning trades on {strategy}",
    )
    .when(&[Bullish]),
    EventTemplate::new(
        "alert-milestone-pnl",
        PerformanceMilestone,
        Low,
        "{milestone} reached for {period}",
    ),
    // System Status
    EventTemplate::new(
        "alert-system-latency",
        SystemStatus,
        Low,
        "{exchange} connectivity healthy, {latency_ms}ms round trip",
    ),
    EventTemplate::new(
        "alert-system-sync",
        SystemStatus,
        Low,
        "Market data resynced, {markets} feeds live after {seconds}s",
    ),
    EventTemplate::new(
        "alert-system-model",
        SystemStatus,
        Medium,
        "{model} retrained on {hours}h of data, regime read {regime}",
    ),
    EventTemplate::new(
        "alert-system-session",
        SystemStatus,
        Low,
        "{session} session open, {strategy} switched to {session_mode} mode",
    ),
];
