use super::{
    Category::{
        Arbitrage, MarketScanning, NewsSentiment, PortfolioRebalancing, RiskManagement,
        SignalAnalysis, StrategyOptimization, TradeExecution, UserInteraction,
    },
    EventTemplate,
    Priority::{High, Low, Medium},
};
use crate::context::{
    evaluator::EventFlag,
    session::TimeOfDay::{Evening, Midday, Morning, Night},
    signal::MarketLabel::{Bearish, Bullish, HeavyVolume, Quiet, Ranging, Volatile},
};

pub const TEMPLATES: &[EventTemplate] = &[
    // Market scanning
    EventTemplate::new(
        "scan-universe",
        MarketScanning,
        Low,
        "Scanning {pairs_scanned} pairs across {exchange} for {pattern} setups",
    ),
    EventTemplate::new(
        "scan-breakout",
        MarketScanning,
        Medium,
        "{symbol} pressing {resistance} resistance on {volume_multiple} average volume",
    )
    .when(&[Bullish, HeavyVolume]),
    EventTemplate::new(
        "scan-breakdown",
        MarketScanning,
        Medium,
        "{symbol} testing {support} support, watching for a {timeframe} close below",
    )
    .when(&[Bearish]),
    EventTemplate::new(
        "scan-range",
        MarketScanning,
        Low,
        "{symbol} ranging between {support} and {resistance}, mean reversion bands armed",
    )
    .when(&[Ranging, Quiet]),
    EventTemplate::new(
        "scan-asia-liquidity",
        MarketScanning,
        Low,
        "Overnight order book depth on {symbol} thinned to {liquidity_pct} of daily average",
    )
    .at(&[Night]),
    EventTemplate::new(
        "scan-morning-gap",
        MarketScanning,
        Medium,
        "Morning sweep flagged {count} gap candidates, {symbol} leads with {change}",
    )
    .at(&[Morning]),
    EventTemplate::new(
        "scan-whale",
        MarketScanning,
        High,
        "Whale transfer of {whale_amount} {base} to {exchange} detected",
    )
    .when(&[Volatile, HeavyVolume]),
    // Trade execution
    EventTemplate::new(
        "exec-entry",
        TradeExecution,
        High,
        "Opened {direction} {size} {base} at {entry} via {order_type} order",
    )
    .requires(&[EventFlag::Execution]),
    EventTemplate::new(
        "exec-close",
        TradeExecution,
        High,
        "Closed {symbol} position at {exit}, realised {trade_pnl} ({pnl_pct})",
    )
    .requires(&[EventFlag::Execution]),
    EventTemplate::new(
        "exec-scale-in",
        TradeExecution,
        Medium,
        "Scaling into {symbol}: {fill_count}/{orders} {order_type} orders filled, avg {fill_price}",
    ),
    EventTemplate::new(
        "exec-twap",
        TradeExecution,
        Medium,
        "TWAP slice {fill_count}/{orders} on {symbol} executed, slippage {slippage}",
    )
    .at(&[Midday, Evening]),
    EventTemplate::new(
        "exec-momentum",
        TradeExecution,
        High,
        "Momentum trigger on {symbol}: {side} {notional} at {price}, target {target}",
    )
    .when(&[Bullish, Bearish, Volatile]),
    EventTemplate::new(
        "exec-limit-rest",
        TradeExecution,
        Low,
        "Resting {side} limit on {symbol} at {level}, {liquidity_pct} queue position",
    )
    .when(&[Quiet, Ranging]),
    // Risk management
    EventTemplate::new(
        "risk-stop-trail",
        RiskManagement,
        Medium,
        "Trailing stop on {symbol} raised to {stop}, locking {gain_pct}",
    ),
    EventTemplate::new(
        "risk-exposure-cut",
        RiskManagement,
        High,
        "Exposure reduced to {exposure} after drawdown reached {drawdown}",
    )
    .requires(&[EventFlag::Risk]),
    EventTemplate::new(
        "risk-leverage",
        RiskManagement,
        High,
        "Leverage capped at {leverage} while {symbol} volatility runs at {volatility_pct}",
    )
    .when(&[Volatile]),
    EventTemplate::new(
        "risk-var",
        RiskManagement,
        Low,
        "Portfolio VaR (95%) recalculated: {var} over {hours}h horizon",
    ),
    EventTemplate::new(
        "risk-hedge",
        RiskManagement,
        Medium,
        "Hedged {hedge_ratio} of {symbol} delta with {hedge_instrument}",
    )
    .requires(&[EventFlag::Risk]),
    EventTemplate::new(
        "risk-correlation",
        RiskManagement,
        Low,
        "Correlation {symbol} vs {alt_symbol} at {correlation}, concentration check passed",
    ),
    // Portfolio rebalancing
    EventTemplate::new(
        "rebal-weights",
        PortfolioRebalancing,
        Medium,
        "Rebalanced {base} weight from {weight_from} to {weight_to}",
    )
    .requires(&[EventFlag::Portfolio]),
    EventTemplate::new(
        "rebal-take-profit",
        PortfolioRebalancing,
        Medium,
        "Rotated {profit} of {base} profit into {alt_base}",
    )
    .requires(&[EventFlag::Portfolio])
    .when(&[Bullish]),
    EventTemplate::new(
        "rebal-stables",
        PortfolioRebalancing,
        Medium,
        "Moved {allocation_pct} of allocation to stables ahead of {news_topic}",
    )
    .when(&[Bearish, Volatile]),
    EventTemplate::new(
        "rebal-daily",
        PortfolioRebalancing,
        Low,
        "End-of-day rebalance complete: {trades} adjustments, cash buffer {allocation_pct}",
    )
    .at(&[Evening, Night]),
    // Signal analysis
    EventTemplate::new(
        "signal-indicator",
        SignalAnalysis,
        Medium,
        "{indicator} on {symbol} {timeframe} reads {indicator_value}, signal {signal_strength}",
    ),
    EventTemplate::new(
        "signal-rsi",
        SignalAnalysis,
        Low,
        "{symbol} RSI({rsi_period}) at {rsi}, {rsi_state}",
    ),
    EventTemplate::new(
        "signal-pattern",
        SignalAnalysis,
        Medium,
        "{pattern} forming on {symbol} {timeframe}, {confidence} confidence",
    ),
    EventTemplate::new(
        "signal-confluence",
        SignalAnalysis,
        High,
        "{signals} signals aligned {sentiment} on {symbol}, composite score {score}",
    )
    .when(&[Bullish, Bearish]),
    EventTemplate::new(
        "signal-divergence",
        SignalAnalysis,
        Medium,
        "{macd_state} on {symbol} {timeframe} while price prints {change}",
    ),
    // Arbitrage
    EventTemplate::new(
        "arb-cross-exchange",
        Arbitrage,
        High,
        "{symbol} spread {spread_pct} between {exchange} and {exchange_b}, routing {notional}",
    )
    .requires(&[EventFlag::Arbitrage]),
    EventTemplate::new(
        "arb-triangular",
        Arbitrage,
        Medium,
        "Triangular loop {base} -> {alt_base} -> {quote} yields {spread_pct} net of fees",
    )
    .requires(&[EventFlag::Arbitrage]),
    EventTemplate::new(
        "arb-funding",
        Arbitrage,
        Medium,
        "Funding on {symbol} perp at {funding_rate}, basis trade {basis_state}",
    ),
    EventTemplate::new(
        "arb-dex-cex",
        Arbitrage,
        Low,
        "{dex} quote for {base} sits {spread_pct} off {exchange}, gas {gas}",
    )
    .when(&[Quiet, Ranging]),
    // News & sentiment
    EventTemplate::new(
        "news-headline",
        NewsSentiment,
        Medium,
        "{news_source}: {news_topic} headline moved {symbol} {change}",
    )
    .requires(&[EventFlag::News]),
    EventTemplate::new(
        "news-sentiment",
        NewsSentiment,
        Low,
        "Social sentiment on {base} at {sentiment_score}/100 across {headlines} posts",
    ),
    EventTemplate::new(
        "news-macro",
        NewsSentiment,
        High,
        "{news_topic} in {minutes}m, tightening stops on {exposure} of exposure",
    )
    .requires(&[EventFlag::News])
    .at(&[Morning, Midday]),
    // Strategy optimisation
    EventTemplate::new(
        "opt-backtest",
        StrategyOptimization,
        Low,
        "Backtested {backtests} variants of {strategy}, best Sharpe {sharpe}",
    ),
    EventTemplate::new(
        "opt-parameter",
        StrategyOptimization,
        Medium,
        "Tuned {parameter} for {strategy} on {symbol}: win rate now {win_rate}",
    ),
    EventTemplate::new(
        "opt-regime-shift",
        StrategyOptimization,
        Medium,
        "Regime read {regime}, {strategy} allocation shifted to {allocation_pct}",
    ),
    EventTemplate::new(
        "opt-overnight",
        StrategyOptimization,
        Low,
        "Overnight walk-forward on {strategy} improved expectancy by {improvement}",
    )
    .at(&[Night]),
    // User interaction
    EventTemplate::new(
        "user-approval",
        UserInteraction,
        Medium,
        "Awaiting approval: {side} {notional} {symbol} exceeds auto-trade limit",
    )
    .requires(&[EventFlag::User]),
    EventTemplate::new(
        "user-preference",
        UserInteraction,
        Low,
        "Applied updated risk preference: max position {allocation_pct} per pair",
    )
    .requires(&[EventFlag::User]),
    EventTemplate::new(
        "user-summary",
        UserInteraction,
        Low,
        "{session} session summary: {trades} trades, net {daily_pnl}",
    )
    .at(&[Evening]),
];
