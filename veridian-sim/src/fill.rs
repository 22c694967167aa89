//! Placeholder filler.
//!
//! Substitutes every `{name}` token of a template body with a freshly drawn
//! value. Prices are anchored to the live ticker when one is available, else to
//! a per-asset reference price jittered on every fill. A token repeated inside
//! one body resolves to the same value. Unknown tokens resolve to the event
//! symbol.

use crate::{
    context::{
        regime::{MarketRegime, Tone, WinProfile},
        session::SessionSlot,
        signal::MarketSignals,
    },
    random::RandomSource,
    template::EventTemplate,
};
use fnv::FnvHashMap;

const EXCHANGES: &[&str] = &["Binance", "OKX", "Bybit", "Coinbase", "Kraken", "Bitget"];
const DEXES: &[&str] = &["Uniswap", "Curve", "PancakeSwap", "Raydium", "Jupiter"];
const CHAINS: &[&str] = &["Ethereum", "Arbitrum", "Solana", "Base", "BNB Chain"];
const PATTERNS: &[&str] = &[
    "bull flag",
    "ascending triangle",
    "double bottom",
    "head and shoulders",
    "cup and handle",
    "falling wedge",
    "descending channel",
    "inside bar",
];
const TIMEFRAMES: &[&str] = &["5m", "15m", "1h", "4h", "1d"];
const INDICATORS: &[&str] = &[
    "EMA(21) slope",
    "MACD histogram",
    "Bollinger %B",
    "Stochastic RSI",
    "OBV trend",
    "ADX",
];
const STRATEGIES: &[&str] = &[
    "Momentum Alpha",
    "Grid Scalper",
    "Mean Reversion v3",
    "Breakout Hunter",
    "Funding Harvester",
    "Trend Rider",
];
const PARAMETERS: &[&str] = &[
    "entry threshold",
    "ATR stop multiple",
    "lookback window",
    "take-profit ratio",
    "position sizing curve",
];
const ORDER_TYPES: &[&str] = &["limit", "post-only", "market", "iceberg", "TWAP"];
const NEWS_SOURCES: &[&str] = &[
    "CoinDesk",
    "The Block",
    "Bloomberg",
    "Reuters",
    "Decrypt",
    "On-chain monitor",
];
const NEWS_TOPICS: &[&str] = &[
    "FOMC minutes",
    "CPI print",
    "ETF flow update",
    "exchange listing",
    "protocol upgrade",
    "regulatory hearing",
    "token unlock",
];
const MODELS: &[&str] = &[
    "Regime classifier",
    "Volatility forecaster",
    "Sentiment model",
    "Order flow model",
];
const PERIODS: &[&str] = &["this week", "this month", "the quarter"];
const SIGNAL_STRENGTHS: &[&str] = &["weak", "moderate", "strong"];
const BASIS_STATES: &[&str] = &["opening", "holding", "unwinding"];
const RSI_PERIODS: &[&str] = &["7", "14", "21"];

/// Reference prices used when no live ticker exists.
const REFERENCE_PRICES: &[(&str, f64)] = &[
    ("BTC", 64_000.0),
    ("ETH", 3_200.0),
    ("SOL", 150.0),
    ("BNB", 580.0),
    ("XRP", 0.55),
    ("AVAX", 35.0),
    ("LINK", 15.0),
    ("ARB", 1.1),
    ("DOGE", 0.15),
    ("ADA", 0.45),
    ("DOT", 7.0),
    ("MATIC", 0.7),
];

/// Inputs available to placeholder generators.
#[derive(Debug, Clone, Copy)]
pub struct FillContext<'a> {
    pub symbol: &'a str,
    pub signals: &'a MarketSignals,
    pub regime: MarketRegime,
    pub session: SessionSlot,
    pub win_profile: WinProfile,
}

/// Fill `template` for `ctx`. Never fails: unknown tokens resolve to the symbol.
pub fn fill(template: &EventTemplate, ctx: &FillContext<'_>, rng: &mut dyn RandomSource) -> String {
    fill_body(template.body, ctx, rng)
}

/// Fill an arbitrary body. An unterminated `{` is copied through literally.
pub fn fill_body(body: &str, ctx: &FillContext<'_>, rng: &mut dyn RandomSource) -> String {
    let scope = Scope::new(ctx, rng);
    let mut cache = FnvHashMap::<&str, String>::default();
    let mut out = String::with_capacity(body.len() + 32);
    let mut rest = body;

    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}').map(|offset| open + offset) else {
            break;
        };
        out.push_str(&rest[..open]);

        let name = &rest[open + 1..close];
        let value = cache.entry(name).or_insert_with(|| {
            generate(name, &scope, rng).unwrap_or_else(|| scope.symbol.to_string())
        });
        out.push_str(value);

        rest = &rest[close + 1..];
    }

    out.push_str(rest);
    out
}


/// Values drawn once per fill so related tokens stay coherent.
struct Scope<'a> {
    symbol: &'a str,
    base: &'a str,
    quote: &'a str,
    alt_symbol: String,
    anchor: f64,
    exchanges: (&'static str, &'static str),
    orders: u32,
    rsi: f64,
    ctx: &'a FillContext<'a>,
}

impl<'a> Scope<'a> {
    fn new(ctx: &'a FillContext<'a>, rng: &mut dyn RandomSource) -> Self {
        let (base, quote) = split_symbol(ctx.symbol);

        let alt_symbol = ctx
            .signals
            .universe()
            .into_iter()
            .filter(|candidate| candidate.as_str() != ctx.symbol)
            .collect::<Vec<_>>();
        let alt_symbol = if alt_symbol.is_empty() {
            let fallback = if base == "ETH" { "BTC/USDT" } else { "ETH/USDT" };
            fallback.to_string()
        } else {
            alt_symbol[rng.index(alt_symbol.len())].to_string()
        };

        let reference = ctx
            .signals
            .ticker(ctx.symbol)
            .map(|ticker| ticker.price)
            .filter(|price| *price > 0.0)
            .unwrap_or_else(|| reference_price(base, rng) * rng.uniform(0.95, 1.05));

        let first = rng.index(EXCHANGES.len());
        let second = (first + 1 + rng.index(EXCHANGES.len() - 1)) % EXCHANGES.len();

        Self {
            symbol: ctx.symbol,
            base,
            quote,
            alt_symbol,
            anchor: reference,
            exchanges: (EXCHANGES[first], EXCHANGES[second]),
            orders: rng.int_inclusive(3, 12),
            rsi: rng.uniform(18.0, 85.0),
            ctx,
        }
    }

    fn bullish_bias(&self) -> f64 {
        match self.ctx.win_profile.tone {
            Tone::Bullish => 0.75,
            Tone::Bearish => 0.25,
            Tone::Neutral => 0.5,
        }
    }

    fn price_near(&self, rng: &mut dyn RandomSource, low: f64, high: f64) -> String {
        format_price(self.anchor * rng.uniform(low, high))
    }

    /// Signed outcome shaped by the regime win profile.
    fn outcome(&self, rng: &mut dyn RandomSource, low: f64, high: f64) -> f64 {
        let profile = self.ctx.win_profile;
        if rng.chance(profile.win_rate) {
            rng.uniform(low, high)
        } else {
            -rng.uniform(low, high) * profile.loss_skew * 0.7
        }
    }

    fn change(&self, rng: &mut dyn RandomSource) -> f64 {
        self.ctx
            .signals
            .change_24h(self.symbol)
            .unwrap_or_else(|| rng.uniform(-4.0, 4.0))
    }
}

fn generate(name: &str, scope: &Scope<'_>, rng: &mut dyn RandomSource) -> Option<String> {
    let value = match name {
        // Symbols & venues
        "symbol" => scope.symbol.to_string(),
        "base" => scope.base.to_string(),
        "quote" => scope.quote.to_string(),
        "alt_symbol" => scope.alt_symbol.clone(),
        "alt_base" => split_symbol(&scope.alt_symbol).0.to_string(),
        "exchange" => scope.exchanges.0.to_string(),
        "exchange_b" => scope.exchanges.1.to_string(),
        "dex" => pick(DEXES, rng),
        "chain" => pick(CHAINS, rng),

        // Prices
        "price" => scope.price_near(rng, 0.998, 1.002),
        "entry" => scope.price_near(rng, 0.992, 1.004),
        "exit" => scope.price_near(rng, 0.985, 1.02),
        "fill_price" => scope.price_near(rng, 0.997, 1.003),
        "level" => scope.price_near(rng, 0.97, 0.995),
        "support" => scope.price_near(rng, 0.93, 0.985),
        "resistance" => scope.price_near(rng, 1.015, 1.07),
        "target" => scope.price_near(rng, 1.02, 1.08),
        "stop" => scope.price_near(rng, 0.94, 0.985),
        "bid" => format_price(scope.anchor * 0.9995),
        "ask" => format_price(scope.anchor * 1.0005),

        // Direction & tone
        "direction" => either(rng.chance(scope.bullish_bias()), "long", "short"),
        "side" => either(rng.chance(scope.bullish_bias()), "buy", "sell"),
        "sentiment" => either(rng.chance(scope.bullish_bias()), "bullish", "bearish"),
        "macd_state" => either(
            rng.chance(scope.bullish_bias()),
            "Bullish MACD divergence",
            "Bearish MACD divergence",
        ),
        "pnl_direction" => either(rng.chance(scope.ctx.win_profile.win_rate), "up", "down"),
        "tone" => scope.ctx.win_profile.tone.to_string(),
        "regime" => scope.ctx.regime.to_string(),
        "session" => scope.ctx.session.label().to_string(),
        "session_mode" => either(scope.ctx.session.is_peak(), "active", "conservative"),
        "iv_state" => either(rng.chance(0.5), "above", "below"),
        "rsi_state" => rsi_state(scope.rsi).to_string(),

        // Percentages
        "change" => format_signed_pct(scope.change(rng)),
        "move_pct" => format_pct(scope.change(rng).abs().max(rng.uniform(1.5, 8.0))),
        "pnl_pct" => format_signed_pct(scope.outcome(rng, 0.4, 4.5)),
        "gain_pct" => format_pct(rng.uniform(0.8, 6.5)),
        "drawdown" => format_pct(rng.uniform(1.0, 4.0) * scope.ctx.win_profile.loss_skew),
        "spread_pct" => format_pct(rng.uniform(0.08, 1.4)),
        "funding_rate" => format!("{:+.4}%", rng.uniform(-0.03, 0.08)),
        "slippage" => format_pct(rng.uniform(0.01, 0.15)),
        "confidence" => format!("{:.0}%", rng.uniform(62.0, 94.0)),
        "win_rate" => format!(
            "{:.1}%",
            (scope.ctx.win_profile.win_rate * 100.0 + rng.uniform(-2.0, 2.0)).clamp(0.0, 100.0)
        ),
        "allocation_pct" => format!("{:.0}%", rng.uniform(5.0, 35.0)),
        "exposure" => format!("{:.0}%", rng.uniform(20.0, 70.0)),
        "volatility_pct" => format!("{:.0}%", rng.uniform(35.0, 120.0)),
        "iv" => format!("{:.1}%", rng.uniform(40.0, 95.0)),
        "liquidity_pct" => format!("{:.0}%", rng.uniform(40.0, 85.0)),
        "distance_pct" => format_pct(rng.uniform(0.4, 2.5)),
        "range_pct" => format_pct(rng.uniform(0.6, 2.2)),
        "premium" => format_pct(rng.uniform(4.0, 18.0)),
        "improvement" => format_pct(rng.uniform(1.5, 9.0)),
        "hedge_ratio" => format!("{:.0}%", rng.uniform(20.0, 60.0)),
        "weight_from" => format!("{:.1}%", rng.uniform(8.0, 25.0)),
        "weight_to" => format!("{:.1}%", rng.uniform(5.0, 30.0)),
        "correlation" => format!("{:.2}", rng.uniform(0.2, 0.92)),
        "sharpe" => format!("{:.2}", rng.uniform(1.1, 3.4)),

        // Amounts
        "notional" => format_usd(rng.uniform(2_000.0, 85_000.0)),
        "profit" => format_usd(rng.uniform(120.0, 4_800.0)),
        "loss" => format_usd(rng.uniform(80.0, 2_400.0) * scope.ctx.win_profile.loss_skew),
        "trade_pnl" => format_signed_usd(scope.outcome(rng, 40.0, 2_600.0)),
        "daily_pnl" => format_signed_usd(scope.outcome(rng, 150.0, 6_500.0)),
        "capital" => format_usd(
            Some(scope.ctx.signals.allocation_limit)
                .filter(|limit| limit.is_finite() && *limit > 0.0)
                .unwrap_or_else(|| rng.uniform(25_000.0, 250_000.0)),
        ),
        "var" => format_usd(rng.uniform(800.0, 9_000.0)),
        "volume" => format_usd(
            scope
                .ctx
                .signals
                .ticker(scope.symbol)
                .map(|ticker| ticker.volume_24h)
                .filter(|volume| *volume > 0.0)
                .unwrap_or_else(|| rng.uniform(5.0e6, 9.0e8)),
        ),
        "liquidations" => format!("${:.1}M", rng.uniform(2.0, 85.0)),
        "milestone" => format!(
            "{} cumulative profit",
            format_usd(rng.uniform(1.0, 25.0).round() * 1_000.0)
        ),
        "size" => format_units(rng.uniform(800.0, 25_000.0) / scope.anchor),
        "whale_amount" => format_units(rng.uniform(2.0e6, 4.0e7) / scope.anchor),
        "gas" => format!("${:.2}", rng.uniform(0.4, 12.0)),
        "leverage" => match scope.ctx.regime {
            MarketRegime::Volatile => format!("{:.1}x", rng.uniform(1.5, 3.0)),
            _ => format!("{:.1}x", rng.uniform(2.0, 5.0)),
        },
        "volume_multiple" => format!("{:.1}x", rng.uniform(1.6, 4.2)),
        "indicator_value" => format!("{:.2}", rng.uniform(-1.0, 1.0)),
        "score" => format!("{:.0}", rng.uniform(55.0, 96.0)),
        "rsi" => format!("{:.1}", scope.rsi),

        // Counts & durations
        "pairs_scanned" => rng.int_inclusive(40, 280).to_string(),
        "count" => rng.int_inclusive(3, 14).to_string(),
        "signals" => rng.int_inclusive(3, 7).to_string(),
        "trades" => rng.int_inclusive(6, 48).to_string(),
        "backtests" => rng.int_inclusive(50, 400).to_string(),
        "orders" => scope.orders.to_string(),
        "fill_count" => rng.int_inclusive(1, scope.orders).to_string(),
        "markets" => rng.int_inclusive(4, 24).to_string(),
        "headlines" => rng.int_inclusive(20, 900).to_string(),
        "latency_ms" => rng.int_inclusive(8, 140).to_string(),
        "seconds" => rng.int_inclusive(2, 45).to_string(),
        "minutes" => rng.int_inclusive(3, 55).to_string(),
        "hours" => rng.int_inclusive(4, 72).to_string(),
        "streak" => rng.int_inclusive(4, 11).to_string(),
        "sentiment_score" => {
            let (low, high) = match scope.ctx.win_profile.tone {
                Tone::Bullish => (58, 90),
                Tone::Bearish => (18, 45),
                Tone::Neutral => (40, 62),
            };
            rng.int_inclusive(low, high).to_string()
        }

        // Categorical
        "pattern" => pick(PATTERNS, rng),
        "timeframe" => pick(TIMEFRAMES, rng),
        "indicator" => pick(INDICATORS, rng),
        "strategy" => pick(STRATEGIES, rng),
        "parameter" => pick(PARAMETERS, rng),
        "order_type" => pick(ORDER_TYPES, rng),
        "news_source" => pick(NEWS_SOURCES, rng),
        "news_topic" => pick(NEWS_TOPICS, rng),
        "model" => pick(MODELS, rng),
        "period" => pick(PERIODS, rng),
        "signal_strength" => pick(SIGNAL_STRENGTHS, rng),
        "basis_state" => pick(BASIS_STATES, rng),
        "rsi_period" => pick(RSI_PERIODS, rng),
        "hedge_instrument" => match rng.index(3) {
            0 => format!("{}-PERP short", scope.base),
            1 => format!("{} put spread", scope.base),
            _ => format!("{} short", split_symbol(&scope.alt_symbol).0),
        },

        _ => return None,
    };

    Some(value)
}

fn either(condition: bool, yes: &str, no: &str) -> String {
    let value = if condition { yes } else { no };
    value.to_string()
}

fn rsi_state(rsi: f64) -> &'static str {
    if rsi >= 70.0 {
        "overbought"
    } else if rsi <= 30.0 {
        "oversold"
    } else {
        "neutral zone"
    }
}

fn pick(options: &[&str], rng: &mut dyn RandomSource) -> String {
    options[rng.index(options.len())].to_string()
}

/// Split `BASE/QUOTE`, defaulting the quote to USDT.
fn split_symbol(symbol: &str) -> (&str, &str) {
    match symbol.split_once('/') {
        Some((base, quote)) if !base.is_empty() && !quote.is_empty() => (base, quote),
        _ => (
            symbol
                .strip_suffix("USDT")
                .filter(|base| !base.is_empty())
                .unwrap_or(symbol),
            "USDT",
        ),
    }
}

fn reference_price(base: &str, rng: &mut dyn RandomSource) -> f64 {
    REFERENCE_PRICES
        .iter()
        .find(|(asset, _)| asset.eq_ignore_ascii_case(base))
        .map(|(_, price)| *price)
        .unwrap_or_else(|| rng.uniform(0.5, 120.0))
}

fn format_price(price: f64) -> String {
    if price >= 1_000.0 {
        format_usd(price)
    } else if price >= 1.0 {
        format!("${:.2}", price)
    } else {
        format!("${:.4}", price)
    }
}

fn format_units(units: f64) -> String {
    if units >= 1_000.0 {
        group_thousands(units.round() as u64)
    } else if units >= 1.0 {
        format!("{:.2}", units)
    } else {
        format!("{:.4}", units)
    }
}

fn format_usd(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let cents = (value.abs() * 100.0).round() as u64;
    format!("{sign}${}.{:02}", group_thousands(cents / 100), cents % 100)
}

fn format_signed_usd(value: f64) -> String {
    if value >= 0.0 {
        format!("+{}", format_usd(value))
    } else {
        format_usd(value)
    }
}

fn format_pct(value: f64) -> String {
    format!("{:.2}%", value)
}

fn format_signed_pct(value: f64) -> String {
    format!("{:+.2}%", value)
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(digit);
    }
    out
}
