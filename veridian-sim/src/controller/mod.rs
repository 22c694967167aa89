use crate::{
    context::{
        evaluator::EventThresholds,
        regime::MarketRegime,
        session::SessionSlot,
        signal::MarketSignals,
    },
    error::SimError,
    event::GeneratedEvent,
    schedule::{Phase, TimingConfig, TimingOverride},
    select::{ACTIVITY_RECENT_CAPACITY, ALERT_RECENT_CAPACITY},
    template::{self, EventTemplate},
};
use chrono::Utc;
use derive_more::Display;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::sync::Arc;
use tokio::{
    runtime::Handle,
    task::JoinHandle,
    time::{Instant, sleep_until},
};
use tracing::{debug, info};

/// Bounded output buffer.
pub mod buffer;

/// Synchronous simulation core.
pub mod engine;

pub use buffer::EventBuffer;
pub use engine::{Engine, EngineStats};

/// Which of the two event streams a controller drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    #[display("bot_activity")]
    BotActivity,
    #[display("smart_alerts")]
    SmartAlerts,
}

impl StreamKind {
    pub fn catalog(&self) -> &'static [EventTemplate] {
        match self {
            StreamKind::BotActivity => template::activity::TEMPLATES,
            StreamKind::SmartAlerts => template::alert::TEMPLATES,
        }
    }
}

/// Per-controller configuration, read-only once the controller is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    pub timing: TimingConfig,
    pub thresholds: EventThresholds,
    pub recent_capacity: usize,
    pub buffer_capacity: usize,
    pub display_limit: usize,
    /// Fixed RNG seed. `None` reseeds from OS entropy on every construction.
    pub seed: Option<u64>,
}

impl ControllerConfig {
    /// Activity stream: 50 buffered, 30 displayed, 15 recent templates.
    pub fn bot_activity() -> Self {
        Self {
            timing: TimingConfig::bot_activity(),
            thresholds: EventThresholds::default(),
            recent_capacity: ACTIVITY_RECENT_CAPACITY,
            buffer_capacity: 50,
            display_limit: 30,
            seed: None,
        }
    }

    /// Alert stream: 3 buffered and displayed.
    pub fn smart_alerts() -> Self {
        Self {
            timing: TimingConfig::smart_alerts(),
            thresholds: EventThresholds::default(),
            recent_capacity: ALERT_RECENT_CAPACITY,
            buffer_capacity: 3,
            display_limit: 3,
            seed: None,
        }
    }

    pub fn for_kind(kind: StreamKind) -> Self {
        match kind {
            StreamKind::BotActivity => Self::bot_activity(),
            StreamKind::SmartAlerts => Self::smart_alerts(),
        }
    }

    pub fn with_timing(self, timing: TimingConfig) -> Self {
        Self { timing, ..self }
    }

    pub fn with_timing_override(self, timing_override: &TimingOverride) -> Self {
        Self {
            timing: self.timing.with_override(timing_override),
            ..self
        }
    }

    pub fn with_thresholds(self, thresholds: EventThresholds) -> Self {
        Self { thresholds, ..self }
    }

    pub fn with_recent_capacity(self, recent_capacity: usize) -> Self {
        Self {
            recent_capacity,
            ..self
        }
    }

    pub fn with_buffer(self, buffer_capacity: usize, display_limit: usize) -> Self {
        Self {
            buffer_capacity,
            display_limit,
            ..self
        }
    }

    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..self
        }
    }
}

/// Drives one event stream on a cancellable Tokio timer chain.
///
/// On [`enable`](Self::enable) an event is emitted immediately, then the chain
/// repeats emit -> compute delay -> wait until [`disable`](Self::disable) or drop.
/// Disabling bumps the engine generation under its lock before aborting the
/// task, so a timer firing concurrently observes a stale generation and leaves
/// the buffer untouched.
#[derive(Debug)]
pub struct SimulationController {
    kind: StreamKind,
    engine: Arc<Mutex<Engine>>,
    task: Option<JoinHandle<()>>,
}

impl SimulationController {
    pub fn new(kind: StreamKind, config: ControllerConfig) -> Self {
        Self::from_engine(Engine::new(kind, config, Utc::now()))
    }

    pub fn from_engine(engine: Engine) -> Self {
        Self {
            kind: engine.kind(),
            engine: Arc::new(Mutex::new(engine)),
            task: None,
        }
    }

    pub fn bot_activity() -> Self {
        Self::new(StreamKind::BotActivity, ControllerConfig::bot_activity())
    }

    pub fn smart_alerts() -> Self {
        Self::new(StreamKind::SmartAlerts, ControllerConfig::smart_alerts())
    }

    /// Start the timer chain. A no-op when already enabled.
    pub fn enable(&mut self) -> Result<(), SimError> {
        if self.task.is_some() {
            return Ok(());
        }

        let handle = Handle::try_current().map_err(|_| SimError::RuntimeUnavailable)?;

        let generation = {
            let mut engine = self.engine.lock();
            let now = Utc::now();
            let generation = engine.start(now);
            engine.emit(now);
            info!(
                stream = %self.kind,
                regime = %engine.regime().regime,
                session = %engine.session(),
                "simulation enabled"
            );
            generation
        };

        self.task = Some(handle.spawn(run_timer_chain(Arc::clone(&self.engine), generation)));
        Ok(())
    }

    /// Cancel the pending timer and clear transient scheduling state.
    ///
    /// Buffered events are kept.
    pub fn disable(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };

        let stats = {
            let mut engine = self.engine.lock();
            engine.stop();
            engine.stats()
        };
        task.abort();

        info!(
            stream = %self.kind,
            emitted = stats.emitted,
            exhaustion_resets = stats.exhaustion_resets,
            "simulation disabled"
        );
    }

    pub fn is_active(&self) -> bool {
        self.task.is_some() && self.engine.lock().phase() != Phase::Idle
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    pub fn update_signals(&self, signals: MarketSignals) {
        self.engine.lock().update_signals(signals);
    }

    /// Bias subject selection toward `symbols`, eg. those another stream emitted recently.
    pub fn set_focus_symbols(&self, symbols: Vec<SmolStr>) {
        self.engine.lock().set_focus_symbols(symbols);
    }

    /// Buffered events, oldest first.
    pub fn events(&self) -> Vec<GeneratedEvent> {
        self.engine.lock().buffer().snapshot()
    }

    /// The displayed slice of the buffer, oldest first.
    pub fn visible_events(&self) -> Vec<GeneratedEvent> {
        self.engine.lock().buffer().visible().cloned().collect()
    }

    pub fn dismiss(&self, id: &str) -> bool {
        self.engine.lock().buffer_mut().dismiss(id)
    }

    pub fn clear(&self) {
        self.engine.lock().buffer_mut().clear();
    }

    pub fn market_regime(&self) -> MarketRegime {
        self.engine.lock().regime().regime
    }

    pub fn session(&self) -> SessionSlot {
        self.engine.lock().session()
    }

    pub fn phase(&self) -> Phase {
        self.engine.lock().phase()
    }

    pub fn recent_symbols(&self, limit: usize) -> Vec<SmolStr> {
        self.engine.lock().recent_symbols(limit)
    }

    pub fn stats(&self) -> EngineStats {
        self.engine.lock().stats()
    }

    /// Run `f` against the engine under its lock.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut Engine) -> R) -> R {
        f(&mut self.engine.lock())
    }
}

impl Drop for SimulationController {
    fn drop(&mut self) {
        self.disable();
    }
}

/// Next deadline of each of the three timers in the chain.
#[derive(Debug, Clone, Copy)]
struct Deadlines {
    emit: Instant,
    regime: Instant,
    context: Instant,
}

async fn run_timer_chain(engine: Arc<Mutex<Engine>>, generation: u64) {
    let Some(mut deadlines) = arm(&engine, generation) else {
        return;
    };

    loop {
        let fired = tokio::select! {
            _ = sleep_until(deadlines.emit) => on_emit(&engine, generation, &mut deadlines),
            _ = sleep_until(deadlines.regime) => {
                on_regime_tick(&engine, generation, &mut deadlines)
            }
            _ = sleep_until(deadlines.context) => {
                on_context_tick(&engine, generation, &mut deadlines)
            }
        };

        if !fired {
            debug!(generation, "stale simulation timer, exiting");
            break;
        }
    }
}

fn arm(engine: &Mutex<Engine>, generation: u64) -> Option<Deadlines> {
    let mut engine = engine.lock();
    if !engine.is_current(generation) {
        return None;
    }

    let now = Instant::now();
    Some(Deadlines {
        emit: now + engine.next_delay(Utc::now()),
        regime: now + engine.regime_tick_delay(),
        context: now + engine.context_tick_delay(),
    })
}

fn on_emit(engine: &Mutex<Engine>, generation: u64, deadlines: &mut Deadlines) -> bool {
    let mut engine = engine.lock();
    if !engine.is_current(generation) {
        return false;
    }

    let now = Utc::now();
    engine.emit(now);
    deadlines.emit = Instant::now() + engine.next_delay(now);
    true
}

fn on_regime_tick(engine: &Mutex<Engine>, generation: u64, deadlines: &mut Deadlines) -> bool {
    let mut engine = engine.lock();
    if !engine.is_current(generation) {
        return false;
    }

    engine.tick_regime(Utc::now());
    deadlines.regime = Instant::now() + engine.regime_tick_delay();
    true
}

fn on_context_tick(engine: &Mutex<Engine>, generation: u64, deadlines: &mut Deadlines) -> bool {
    let mut engine = engine.lock();
    if !engine.is_current(generation) {
        return false;
    }

    engine.tick_context();
    deadlines.context = Instant::now() + engine.context_tick_delay();
    true
}
