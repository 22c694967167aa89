use serde::{Serialize, de::DeserializeOwned};
use smol_str::SmolStr;
use std::{future, time::Duration};
use tokio::time::{interval, sleep};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, filter::LevelFilter};
use veridian_sim::{
    ControllerConfig, GeneratedEvent, MarketCondition, MarketSignals, SimulationController,
    StreamKind, TimingOverride, Trend, Volatility, context::signal::DEFAULT_SYMBOLS,
};

/// Emitted event tagged with the stream that produced it.
#[derive(Debug, Clone, Serialize)]
struct StreamEventMessage<'a> {
    stream: StreamKind,
    #[serde(flatten)]
    event: &'a GeneratedEvent,
}

/// Tracks the newest event already written for one stream.
#[derive(Debug, Default)]
struct Cursor {
    last_id: Option<SmolStr>,
}

impl Cursor {
    /// Write every buffered event newer than the last one written.
    fn drain(&mut self, controller: &SimulationController) {
        let events = controller.events();
        let start = self
            .last_id
            .as_ref()
            .and_then(|last| events.iter().position(|event| &event.id == last))
            .map_or(0, |index| index + 1);

        for event in &events[start..] {
            let message = StreamEventMessage {
                stream: controller.kind(),
                event,
            };
            match serde_json::to_string(&message) {
                Ok(line) => println!("{line}"),
                Err(error) => warn!(%error, id = %event.id, "failed to serialise event"),
            }
        }

        if let Some(newest) = events.last() {
            self.last_id = Some(newest.id.clone().into());
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging
    init_logging();

    info!("Starting veridian simulation stream");

    let signals = init_signals();
    info!(
        symbols = ?signals.universe(),
        volatility = %signals.condition.volatility,
        trend = %signals.condition.trend,
        "market signals configured"
    );

    let mut activity_config = ControllerConfig::bot_activity();
    let mut alert_config = ControllerConfig::smart_alerts();

    // Partial timing override as JSON via SIM_TIMING_OVERRIDE, applied to both streams
    if let Ok(text) = std::env::var("SIM_TIMING_OVERRIDE") {
        match TimingOverride::from_json(&text) {
            Ok(timing_override) => {
                if !timing_override.rejected.is_empty() {
                    warn!(
                        rejected = timing_override.rejected.len(),
                        "timing override partially applied"
                    );
                }
                activity_config = activity_config.with_timing_override(&timing_override);
                alert_config = alert_config.with_timing_override(&timing_override);
            }
            Err(error) => {
                warn!(%error, recoverable = error.is_recoverable(), "ignoring timing override");
            }
        }
    }

    // Fixed seed via SIM_SEED, otherwise every run draws from OS entropy
    if let Some(seed) = env_parse::<u64>("SIM_SEED") {
        activity_config = activity_config.with_seed(seed);
        alert_config = alert_config.with_seed(seed.wrapping_add(1));
    }

    let mut activity = SimulationController::new(StreamKind::BotActivity, activity_config);
    let mut alerts = SimulationController::new(StreamKind::SmartAlerts, alert_config);
    activity.update_signals(signals.clone());
    alerts.update_signals(signals);

    if let Err(error) = activity.enable().and_then(|_| alerts.enable()) {
        warn!(%error, "failed to enable simulation");
        return;
    }

    let run_secs = env_parse::<u64>("SIM_RUN_SECS");
    let deadline = async move {
        match run_secs {
            Some(secs) => sleep(Duration::from_secs(secs)).await,
            None => future::pending::<()>().await,
        }
    };
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(deadline, shutdown);

    let mut ticker = interval(Duration::from_secs(1));
    let mut activity_cursor = Cursor::default();
    let mut alert_cursor = Cursor::default();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // Activity subjects flow one way into the alert stream
                alerts.set_focus_symbols(activity.recent_symbols(3));
                activity_cursor.drain(&activity);
                alert_cursor.drain(&alerts);
            }
            result = &mut shutdown => {
                if let Err(error) = result {
                    warn!(%error, "failed to listen for ctrl-c");
                }
                info!("shutdown requested");
                break;
            }
            _ = &mut deadline => {
                info!(run_secs, "run duration elapsed");
                break;
            }
        }
    }

    activity.disable();
    alerts.disable();

    info!(
        activity = ?activity.stats(),
        alerts = ?alerts.stats(),
        "simulation stream stopped"
    );
}

/// Build the signal snapshot from SIM_* environment variables.
fn init_signals() -> MarketSignals {
    let symbols: Vec<SmolStr> = std::env::var("SIM_SYMBOLS")
        .map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|symbol| !symbol.is_empty())
                .map(SmolStr::new)
                .collect()
        })
        .unwrap_or_else(|_| DEFAULT_SYMBOLS.iter().map(SmolStr::new).collect());

    let allocation = env_parse::<f64>("SIM_ALLOCATION").unwrap_or(25_000.0);
    let pnl = env_parse::<f64>("SIM_PNL").unwrap_or(0.0);

    let defaults = MarketCondition::default();
    let volatility = env_label::<Volatility>("SIM_VOLATILITY").unwrap_or(defaults.volatility);
    let trend = env_label::<Trend>("SIM_TREND").unwrap_or(defaults.trend);

    MarketSignals::new(symbols)
        .with_condition(MarketCondition::new(volatility, trend, defaults.volume))
        .with_portfolio(pnl, allocation)
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

/// Parse a snake_case label, eg. `SIM_TREND=sideways`.
fn env_label<T: DeserializeOwned>(key: &str) -> Option<T> {
    let value = std::env::var(key).ok()?;
    let label = serde_json::Value::String(value.trim().to_ascii_lowercase());
    match serde_json::from_value(label) {
        Ok(parsed) => Some(parsed),
        Err(error) => {
            warn!(key, %value, %error, "unrecognised label, using default");
            None
        }
    }
}

/// Initialize logging
///
/// Logs go to stderr so stdout carries only JSON event lines.
fn init_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(cfg!(debug_assertions))
            .init();
    }
}
