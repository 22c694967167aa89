use super::{ControllerConfig, StreamKind, buffer::EventBuffer};
use crate::{
    context::{
        evaluator::{ActiveEvents, EvaluationInput, evaluate},
        regime::{MarketRegime, RegimeState},
        session::{SessionSlot, TimeOfDay},
        signal::{DEFAULT_SYMBOLS, MarketSignals},
    },
    event::GeneratedEvent,
    fill::{FillContext, fill},
    random::{RandomSource, SimRng},
    schedule::{IntervalContext, IntervalState, Phase, next_delay},
    select::{RecentUseSet, Selection, SelectionContext, select_template},
};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::time::Duration;
use tracing::debug;

/// Probability an emission is about one of the focus symbols, when any are set.
const FOCUS_PROBABILITY: f64 = 0.6;

/// Probability an emission is about a mover, when any exist.
const MOVER_PROBABILITY: f64 = 0.35;

/// Regime/session re-evaluation cadence, in seconds.
const REGIME_TICK_SECS: (f64, f64) = (45.0, 75.0);

/// Context flag re-evaluation cadence, in seconds.
const CONTEXT_TICK_SECS: (f64, f64) = (15.0, 30.0);

/// Counters exposed for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EngineStats {
    pub emitted: u64,
    pub exhaustion_resets: u64,
    pub bursts_triggered: u64,
    pub calms_triggered: u64,
    pub regularity_corrections: u64,
    pub regime_changes: u64,
}

/// Synchronous simulation core owning every piece of mutable state of one stream.
///
/// The async timer chain in [`super::SimulationController`] only calls into
/// this type while holding its lock.
pub struct Engine {
    kind: StreamKind,
    config: ControllerConfig,
    rng: Box<dyn RandomSource>,
    signals: MarketSignals,
    regime: RegimeState,
    session: SessionSlot,
    active: ActiveEvents,
    recent: RecentUseSet,
    intervals: IntervalState,
    buffer: EventBuffer,
    phase: Phase,
    generation: u64,
    stats: EngineStats,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("kind", &self.kind)
            .field("regime", &self.regime)
            .field("session", &self.session)
            .field("phase", &self.phase)
            .field("generation", &self.generation)
            .field("buffered", &self.buffer.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Construct an idle engine, seeding from `config.seed` or OS entropy.
    pub fn new(kind: StreamKind, config: ControllerConfig, now: DateTime<Utc>) -> Self {
        let rng: Box<dyn RandomSource> = match config.seed {
            Some(seed) => Box::new(SimRng::seeded(seed)),
            None => Box::new(SimRng::from_entropy()),
        };
        Self::with_rng(kind, config, rng, now)
    }

    /// Construct an idle engine drawing from `rng`.
    pub fn with_rng(
        kind: StreamKind,
        config: ControllerConfig,
        mut rng: Box<dyn RandomSource>,
        now: DateTime<Utc>,
    ) -> Self {
        let regime = RegimeState::new(now, rng.as_mut());

        Self {
            kind,
            recent: RecentUseSet::new(config.recent_capacity),
            buffer: EventBuffer::new(config.buffer_capacity, config.display_limit),
            config,
            rng,
            signals: MarketSignals::default(),
            regime,
            session: SessionSlot::at(now),
            active: ActiveEvents::default(),
            intervals: IntervalState::default(),
            phase: Phase::Idle,
            generation: 0,
            stats: EngineStats::default(),
        }
    }

    /// Arm the engine from a clean scheduling state. Returns the new generation.
    pub fn start(&mut self, now: DateTime<Utc>) -> u64 {
        self.generation += 1;
        self.reset_transient();
        self.session = SessionSlot::at(now);
        self.phase = Phase::Armed;
        self.generation
    }

    /// Return to idle. Any timer holding an older generation becomes inert.
    ///
    /// Transient scheduling state is cleared; buffered events are kept.
    pub fn stop(&mut self) {
        self.generation += 1;
        self.reset_transient();
        self.phase = Phase::Idle;
    }

    /// Whether a timer armed for `generation` may still mutate this engine.
    pub fn is_current(&self, generation: u64) -> bool {
        self.phase != Phase::Idle && self.generation == generation
    }

    fn reset_transient(&mut self) {
        self.recent.clear();
        self.intervals.reset();
        self.active = ActiveEvents::default();
    }

    /// Run one emission. Returns `None` when the candidate set was exhausted.
    pub fn emit(&mut self, now: DateTime<Utc>) -> Option<GeneratedEvent> {
        self.phase = Phase::Fired;
        let event = self.try_emit(now);
        self.phase = Phase::Armed;
        event
    }

    fn try_emit(&mut self, now: DateTime<Utc>) -> Option<GeneratedEvent> {
        let symbol = pick_symbol(&self.signals, self.rng.as_mut());
        self.active = self.evaluate_flags(&symbol);

        let ctx = SelectionContext {
            time_of_day: TimeOfDay::at(now),
            condition: self.signals.condition,
            active: self.active,
            regime: self.regime.regime,
            session: self.session,
        };

        let template = match select_template(
            self.kind.catalog(),
            &ctx,
            &mut self.recent,
            self.rng.as_mut(),
        ) {
            Selection::Picked(template) => template,
            Selection::Exhausted => {
                self.stats.exhaustion_resets += 1;
                return None;
            }
        };

        let fill_ctx = FillContext {
            symbol: &symbol,
            signals: &self.signals,
            regime: self.regime.regime,
            session: self.session,
            win_profile: self.regime.win_profile,
        };
        let body = fill(template, &fill_ctx, self.rng.as_mut());
        let event = GeneratedEvent::new(template, body, symbol, now, self.rng.as_mut());

        debug!(
            stream = %self.kind,
            id = %event.id,
            category = %event.category,
            symbol = %event.symbol,
            flags = %self.active.summary(),
            "emitted simulated event"
        );

        self.buffer.push(event.clone());
        self.stats.emitted += 1;
        Some(event)
    }

    fn evaluate_flags(&mut self, focal: &str) -> ActiveEvents {
        let universe = self.signals.universe();
        let others: Vec<&SmolStr> = universe
            .iter()
            .filter(|symbol| symbol.as_str() != focal)
            .collect();
        let comparison = if others.is_empty() {
            focal
        } else {
            others[self.rng.index(others.len())].as_str()
        };

        evaluate(
            EvaluationInput {
                regime: self.regime.regime,
                session: self.session,
                signals: &self.signals,
                focal_symbol: focal,
                comparison_symbol: comparison,
            },
            &self.config.thresholds,
            self.rng.as_mut(),
        )
    }

    /// Compute the delay until the next emission.
    pub fn next_delay(&mut self, now: DateTime<Utc>) -> Duration {
        let ctx = IntervalContext {
            time_of_day: TimeOfDay::at(now),
            volatility: self.signals.condition.volatility,
            trend: self.signals.condition.trend,
            session: self.session,
            regime: self.regime.regime,
        };

        let scheduled = next_delay(
            &self.config.timing,
            &ctx,
            &mut self.intervals,
            self.rng.as_mut(),
        );

        if scheduled.burst.is_triggered() {
            self.stats.bursts_triggered += 1;
        }
        if scheduled.calm.is_triggered() {
            self.stats.calms_triggered += 1;
        }
        if scheduled.corrected {
            self.stats.regularity_corrections += 1;
        }

        scheduled.delay
    }

    /// Refresh the session slot and rotate the regime if it expired.
    pub fn tick_regime(&mut self, now: DateTime<Utc>) -> bool {
        self.session = SessionSlot::at(now);
        let changed = self.regime.refresh(now, self.rng.as_mut());
        if changed {
            self.stats.regime_changes += 1;
        }
        changed
    }

    /// Re-derive the active event flags against a random universe symbol.
    ///
    /// The result is only observable through [`Engine::active`] between
    /// emissions. Each emission re-evaluates the flags for its own subject
    /// before selecting a template.
    pub fn tick_context(&mut self) {
        let symbol = pick_symbol(&self.signals, self.rng.as_mut());
        self.active = self.evaluate_flags(&symbol);
    }

    pub fn regime_tick_delay(&mut self) -> Duration {
        Duration::from_secs_f64(self.rng.uniform(REGIME_TICK_SECS.0, REGIME_TICK_SECS.1))
    }

    pub fn context_tick_delay(&mut self) -> Duration {
        Duration::from_secs_f64(self.rng.uniform(CONTEXT_TICK_SECS.0, CONTEXT_TICK_SECS.1))
    }

    /// Replace the external signal snapshot.
    pub fn update_signals(&mut self, signals: MarketSignals) {
        self.signals = signals;
    }

    pub fn set_focus_symbols(&mut self, symbols: Vec<SmolStr>) {
        self.signals.focus_symbols = symbols;
    }

    /// Pin the regime, eg. for deterministic scenarios.
    pub fn pin_regime(&mut self, regime: MarketRegime, now: DateTime<Utc>) {
        self.regime = RegimeState::starting(regime, now, self.rng.as_mut());
    }

    /// Most recent distinct event symbols, newest first.
    pub fn recent_symbols(&self, limit: usize) -> Vec<SmolStr> {
        self.buffer
            .iter()
            .rev()
            .map(|event| event.symbol.clone())
            .unique()
            .take(limit)
            .collect()
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn regime(&self) -> &RegimeState {
        &self.regime
    }

    pub fn session(&self) -> SessionSlot {
        self.session
    }

    pub fn active(&self) -> ActiveEvents {
        self.active
    }

    pub fn recent(&self) -> &RecentUseSet {
        &self.recent
    }

    pub fn intervals(&self) -> &IntervalState {
        &self.intervals
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn buffer(&self) -> &EventBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut EventBuffer {
        &mut self.buffer
    }
}

/// Pick the emission subject: focus symbols first, then movers, then uniform.
fn pick_symbol(signals: &MarketSignals, rng: &mut dyn RandomSource) -> SmolStr {
    if !signals.focus_symbols.is_empty() && rng.chance(FOCUS_PROBABILITY) {
        return signals.focus_symbols[rng.index(signals.focus_symbols.len())].clone();
    }

    let movers = signals.movers();
    if !movers.is_empty() && rng.chance(MOVER_PROBABILITY) {
        return movers[rng.index(movers.len())].clone();
    }

    let universe = signals.universe();
    if universe.is_empty() {
        return SmolStr::new_static(DEFAULT_SYMBOLS[0]);
    }
    universe[rng.index(universe.len())].clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::{regime::Tone, signal::Ticker},
        random::ScriptedRandom,
        template::EventTemplate,
    };
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 14, 0, 0).unwrap()
    }

    fn engine(kind: StreamKind, seed: u64) -> Engine {
        let config = ControllerConfig::for_kind(kind).with_seed(seed);
        Engine::new(kind, config, now())
    }

    #[test]
    fn test_emit_appends_and_counts() {
        let mut engine = engine(StreamKind::BotActivity, 51);
        engine.start(now());

        let mut emitted = 0;
        for _ in 0..60 {
            if engine.emit(now()).is_some() {
                emitted += 1;
            }
        }

        let stats = engine.stats();
        assert_eq!(stats.emitted, emitted);
        assert_eq!(stats.emitted + stats.exhaustion_resets, 60);
        assert_eq!(engine.buffer().len(), 50.min(emitted as usize));
        assert_eq!(engine.phase(), Phase::Armed);
    }

    #[test]
    fn test_alert_buffer_capped_at_three() {
        let mut engine = engine(StreamKind::SmartAlerts, 52);
        engine.start(now());
        for _ in 0..20 {
            engine.emit(now());
        }
        assert_eq!(engine.buffer().len(), 3);
    }

    #[test]
    fn test_stop_clears_transient_state_but_keeps_buffer() {
        let mut engine = engine(StreamKind::BotActivity, 53);
        let generation = engine.start(now());
        for _ in 0..10 {
            engine.emit(now());
            engine.next_delay(now());
        }
        let buffered = engine.buffer().len();
        assert!(!engine.recent().is_empty());

        engine.stop();

        assert!(!engine.is_current(generation));
        assert_eq!(engine.phase(), Phase::Idle);
        assert!(engine.recent().is_empty());
        assert_eq!(engine.intervals(), &IntervalState::default());
        assert_eq!(engine.buffer().len(), buffered);

        let restarted = engine.start(now());
        assert!(restarted > generation);
        assert!(engine.is_current(restarted));
        assert!(!engine.is_current(generation));
    }

    #[test]
    fn test_recent_symbols_distinct_newest_first() {
        let mut engine = engine(StreamKind::BotActivity, 54);
        engine.update_signals(MarketSignals::new(["BTC/USDT", "ETH/USDT"]));
        engine.start(now());
        for _ in 0..30 {
            engine.emit(now());
        }

        let recent = engine.recent_symbols(5);
        assert!(recent.len() <= 2);
        assert_eq!(recent.iter().unique().count(), recent.len());
        let newest = engine.buffer().iter().last().unwrap().symbol.clone();
        assert_eq!(recent[0], newest);
    }

    #[test]
    fn test_symbol_bias() {
        let signals = MarketSignals::new(["BTC/USDT", "ETH/USDT", "SOL/USDT", "XRP/USDT"])
            .with_ticker("SOL/USDT", Ticker::new(150.0, 7.5, 1.0));
        let mut focused = signals.clone();
        focused.focus_symbols = vec!["ETH/USDT".into()];

        let mut rng = SimRng::seeded(55);
        let mut counts: HashMap<SmolStr, usize> = HashMap::new();
        for _ in 0..10_000 {
            *counts.entry(pick_symbol(&focused, &mut rng)).or_default() += 1;
        }

        // eth: 0.6 + 0.4 * 0.65 * 0.25 ~= 0.665
        let eth = counts["ETH/USDT"] as f64 / 10_000.0;
        assert!((0.63..0.70).contains(&eth), "eth share {eth}");

        // sol (mover) without focus: 0.35 + 0.65 * 0.25 ~= 0.51
        counts.clear();
        for _ in 0..10_000 {
            *counts.entry(pick_symbol(&signals, &mut rng)).or_default() += 1;
        }
        let sol = counts["SOL/USDT"] as f64 / 10_000.0;
        assert!((0.48..0.55).contains(&sol), "sol share {sol}");
    }

    #[test]
    fn test_exhaustion_is_counted() {
        // Every draw 0.0: all coin flips lose, and calm tickers raise no flags,
        // so gated templates stay ineligible
        let config = ControllerConfig::smart_alerts().with_recent_capacity(50);
        let mut engine = Engine::with_rng(
            StreamKind::SmartAlerts,
            config,
            Box::new(ScriptedRandom::constant(0.0)),
            now(),
        );
        engine.update_signals(
            MarketSignals::new(["BTC/USDT", "ETH/USDT"])
                .with_ticker("BTC/USDT", Ticker::new(64_000.0, 0.1, 1.0))
                .with_ticker("ETH/USDT", Ticker::new(3_200.0, 0.2, 1.0)),
        );
        engine.start(now());

        let eligible = StreamKind::SmartAlerts
            .catalog()
            .iter()
            .filter(|template: &&EventTemplate| {
                template.eligibility.matches(
                    TimeOfDay::at(now()),
                    &MarketSignals::default().condition,
                    &ActiveEvents::default(),
                )
            })
            .count();

        assert!(eligible > 0);
        for _ in 0..eligible {
            assert!(engine.emit(now()).is_some());
            assert_eq!(engine.active(), ActiveEvents::default());
        }
        assert!(engine.emit(now()).is_none());
        assert_eq!(engine.stats().exhaustion_resets, 1);
        assert!(engine.recent().is_empty());
        assert!(engine.emit(now()).is_some());
    }

    #[test]
    fn test_tick_regime_rotates_expired_regime() {
        let mut engine = engine(StreamKind::BotActivity, 57);
        engine.pin_regime(MarketRegime::Bull, now());
        let pinned = engine.regime().clone();

        // Not yet expired: nothing changes, session still refreshed
        assert!(!engine.tick_regime(now()));
        assert_eq!(engine.regime(), &pinned);
        assert_eq!(engine.session(), SessionSlot::at(now()));
        assert_eq!(engine.stats().regime_changes, 0);

        let mut changes = 0;
        for _ in 0..50 {
            let previous = engine.regime().clone();
            let at = previous.expiry + chrono::Duration::minutes(1);

            let changed = engine.tick_regime(at);
            let current = engine.regime().clone();

            assert!(current.expiry > at);
            assert_eq!(engine.session(), SessionSlot::at(at));
            assert_eq!(changed, current.regime != previous.regime);
            if changed {
                changes += 1;
                let expected = expected_tone(current.regime);
                assert_eq!(current.win_profile.tone, expected);
            } else {
                assert_eq!(current.win_profile, previous.win_profile);
            }
        }

        assert!(changes > 0);
        assert_eq!(engine.stats().regime_changes, changes);
    }

    fn expected_tone(regime: MarketRegime) -> Tone {
        match regime {
            MarketRegime::Bull => Tone::Bullish,
            MarketRegime::Bear => Tone::Bearish,
            MarketRegime::Sideways | MarketRegime::Volatile => Tone::Neutral,
        }
    }

    #[test]
    fn test_tick_delays_within_bounds() {
        let mut engine = engine(StreamKind::BotActivity, 56);
        for _ in 0..100 {
            let regime = engine.regime_tick_delay();
            assert!(regime >= Duration::from_secs(45) && regime <= Duration::from_secs(75));
            let context = engine.context_tick_delay();
            assert!(context >= Duration::from_secs(15) && context <= Duration::from_secs(30));
        }
    }
}
