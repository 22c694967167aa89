use crate::{
    context::{regime::MarketRegime, session::SessionSlot, session::TimeOfDay},
    error::SimError,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use tracing::warn;

/// Inclusive `[min, max]` range a factor is drawn from.
///
/// Deserialises from either `{"min": a, "max": b}` or `[a, b]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const ONE: Bounds = Bounds { min: 1.0, max: 1.0 };

    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Inclusive window length range, in emissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthBounds {
    pub min: u32,
    pub max: u32,
}

impl LengthBounds {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeOfDayMultipliers {
    pub morning: f64,
    pub midday: f64,
    pub evening: f64,
    pub night: f64,
}

impl TimeOfDayMultipliers {
    pub fn get(&self, time_of_day: TimeOfDay) -> f64 {
        match time_of_day {
            TimeOfDay::Morning => self.morning,
            TimeOfDay::Midday => self.midday,
            TimeOfDay::Evening => self.evening,
            TimeOfDay::Night => self.night,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionTempo {
    pub asia_open: Bounds,
    pub asia_mid: Bounds,
    pub europe_open: Bounds,
    pub us_open: Bounds,
    pub us_power: Bounds,
    pub overnight: Bounds,
}

impl SessionTempo {
    pub const NEUTRAL: SessionTempo = SessionTempo {
        asia_open: Bounds::ONE,
        asia_mid: Bounds::ONE,
        europe_open: Bounds::ONE,
        us_open: Bounds::ONE,
        us_power: Bounds::ONE,
        overnight: Bounds::ONE,
    };

    pub fn get(&self, session: SessionSlot) -> Bounds {
        match session {
            SessionSlot::AsiaOpen => self.asia_open,
            SessionSlot::AsiaMid => self.asia_mid,
            SessionSlot::EuropeOpen => self.europe_open,
            SessionSlot::UsOpen => self.us_open,
            SessionSlot::UsPower => self.us_power,
            SessionSlot::Overnight => self.overnight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeTempo {
    pub bull: Bounds,
    pub bear: Bounds,
    pub sideways: Bounds,
    pub volatile: Bounds,
}

impl RegimeTempo {
    pub const NEUTRAL: RegimeTempo = RegimeTempo {
        bull: Bounds::ONE,
        bear: Bounds::ONE,
        sideways: Bounds::ONE,
        volatile: Bounds::ONE,
    };

    pub fn get(&self, regime: MarketRegime) -> Bounds {
        match regime {
            MarketRegime::Bull => self.bull,
            MarketRegime::Bear => self.bear,
            MarketRegime::Sideways => self.sideways,
            MarketRegime::Volatile => self.volatile,
        }
    }
}

/// Burst or calm window settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Chance per computation of triggering a new window. Zero disables.
    pub probability: f64,
    pub length: LengthBounds,
    pub multiplier: Bounds,
}

impl WindowConfig {
    pub const DISABLED: WindowConfig = WindowConfig {
        probability: 0.0,
        length: LengthBounds::new(1, 1),
        multiplier: Bounds::ONE,
    };
}

/// Regularity breaker settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Consecutive near-identical delays tolerated before correcting. `<= 1` disables.
    pub max_consistent_intervals: usize,
    /// Relative band within which two delays count as identical (eg. 0.05).
    pub band: f64,
    pub correction: Bounds,
}

impl BreakerConfig {
    pub const DISABLED: BreakerConfig = BreakerConfig {
        max_consistent_intervals: 0,
        band: 0.05,
        correction: Bounds::ONE,
    };

    pub fn is_enabled(&self) -> bool {
        self.max_consistent_intervals > 1
    }

    /// Number of past delays compared against a new one.
    pub fn history_len(&self) -> usize {
        self.max_consistent_intervals.saturating_sub(1)
    }
}

/// Every constant of the interval computation.
///
/// Read-only once handed to a controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    pub base_interval_ms: f64,
    /// Relative spread of the base interval, `[0, 1)`.
    pub variance: f64,
    pub min_interval_ms: f64,
    pub time_of_day: TimeOfDayMultipliers,
    pub high_volatility: f64,
    pub low_volatility: f64,
    /// Applied when the trend is up or down.
    pub trending: f64,
    /// Applied when the trend is sideways.
    pub sideways: f64,
    pub session_tempo: SessionTempo,
    pub regime_tempo: RegimeTempo,
    pub burst: WindowConfig,
    pub calm: WindowConfig,
    pub breaker: BreakerConfig,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self::bot_activity()
    }
}

impl TimingConfig {
    /// Bot-activity cadence: ~12s base, 800ms floor.
    pub fn bot_activity() -> Self {
        Self {
            base_interval_ms: 12_000.0,
            variance: 0.35,
            min_interval_ms: 800.0,
            time_of_day: TimeOfDayMultipliers {
                morning: 0.9,
                midday: 0.85,
                evening: 1.0,
                night: 1.35,
            },
            high_volatility: 0.7,
            low_volatility: 1.3,
            trending: 0.9,
            sideways: 1.15,
            session_tempo: SessionTempo {
                asia_open: Bounds::new(0.9, 1.1),
                asia_mid: Bounds::new(1.1, 1.3),
                europe_open: Bounds::new(0.85, 1.0),
                us_open: Bounds::new(0.7, 0.9),
                us_power: Bounds::new(0.75, 0.95),
                overnight: Bounds::new(1.2, 1.5),
            },
            regime_tempo: RegimeTempo {
                bull: Bounds::new(0.85, 1.0),
                bear: Bounds::new(0.9, 1.05),
                sideways: Bounds::new(1.1, 1.3),
                volatile: Bounds::new(0.65, 0.85),
            },
            burst: WindowConfig {
                probability: 0.12,
                length: LengthBounds::new(3, 6),
                multiplier: Bounds::new(0.25, 0.5),
            },
            calm: WindowConfig {
                probability: 0.08,
                length: LengthBounds::new(2, 4),
                multiplier: Bounds::new(1.8, 3.0),
            },
            breaker: BreakerConfig {
                max_consistent_intervals: 4,
                band: 0.05,
                correction: Bounds::new(0.75, 1.25),
            },
        }
    }

    /// Smart-alert cadence: ~25s base, 3s floor, shorter bursts.
    pub fn smart_alerts() -> Self {
        Self {
            base_interval_ms: 25_000.0,
            variance: 0.4,
            min_interval_ms: 3_000.0,
            burst: WindowConfig {
                probability: 0.08,
                length: LengthBounds::new(2, 3),
                multiplier: Bounds::new(0.4, 0.6),
            },
            calm: WindowConfig {
                probability: 0.1,
                length: LengthBounds::new(2, 5),
                multiplier: Bounds::new(1.5, 2.5),
            },
            breaker: BreakerConfig {
                max_consistent_intervals: 3,
                band: 0.05,
                correction: Bounds::new(0.8, 1.2),
            },
            ..Self::bot_activity()
        }
    }

    /// Every multiplier exactly 1, no variance, burst/calm and breaker disabled.
    pub fn neutral(base_interval_ms: f64, min_interval_ms: f64) -> Self {
        Self {
            base_interval_ms,
            variance: 0.0,
            min_interval_ms,
            time_of_day: TimeOfDayMultipliers {
                morning: 1.0,
                midday: 1.0,
                evening: 1.0,
                night: 1.0,
            },
            high_volatility: 1.0,
            low_volatility: 1.0,
            trending: 1.0,
            sideways: 1.0,
            session_tempo: SessionTempo::NEUTRAL,
            regime_tempo: RegimeTempo::NEUTRAL,
            burst: WindowConfig::DISABLED,
            calm: WindowConfig::DISABLED,
            breaker: BreakerConfig::DISABLED,
        }
    }

    /// Apply the accepted fields of `timing_override`.
    pub fn with_override(mut self, timing_override: &TimingOverride) -> Self {
        let o = timing_override;
        let set = |target: &mut f64, value: Option<f64>| {
            if let Some(value) = value {
                *target = value;
            }
        };

        set(&mut self.base_interval_ms, o.base_interval_ms);
        set(&mut self.variance, o.variance);
        set(&mut self.min_interval_ms, o.min_interval_ms);
        set(&mut self.high_volatility, o.high_volatility);
        set(&mut self.low_volatility, o.low_volatility);
        set(&mut self.trending, o.trending);
        set(&mut self.sideways, o.sideways);
        set(&mut self.burst.probability, o.burst_probability);
        set(&mut self.calm.probability, o.calm_probability);
        set(&mut self.breaker.band, o.regularity_band);

        if let Some(time_of_day) = o.time_of_day {
            self.time_of_day = time_of_day;
        }
        if let Some(session_tempo) = o.session_tempo {
            self.session_tempo = session_tempo;
        }
        if let Some(regime_tempo) = o.regime_tempo {
            self.regime_tempo = regime_tempo;
        }
        if let Some(length) = o.burst_length {
            self.burst.length = length;
        }
        if let Some(multiplier) = o.burst_multiplier {
            self.burst.multiplier = multiplier;
        }
        if let Some(length) = o.calm_length {
            self.calm.length = length;
        }
        if let Some(multiplier) = o.calm_multiplier {
            self.calm.multiplier = multiplier;
        }
        if let Some(max) = o.max_consistent_intervals {
            self.breaker.max_consistent_intervals = max;
        }
        if let Some(correction) = o.correction {
            self.breaker.correction = correction;
        }

        self
    }
}

/// Caller-supplied partial override of [`TimingConfig`].
///
/// Parsed field by field: a malformed field is dropped with a warning and the
/// default retained, the rest still apply.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimingOverride {
    pub base_interval_ms: Option<f64>,
    pub variance: Option<f64>,
    pub min_interval_ms: Option<f64>,
    pub time_of_day: Option<TimeOfDayMultipliers>,
    pub high_volatility: Option<f64>,
    pub low_volatility: Option<f64>,
    pub trending: Option<f64>,
    pub sideways: Option<f64>,
    pub session_tempo: Option<SessionTempo>,
    pub regime_tempo: Option<RegimeTempo>,
    pub burst_probability: Option<f64>,
    pub burst_length: Option<LengthBounds>,
    pub burst_multiplier: Option<Bounds>,
    pub calm_probability: Option<f64>,
    pub calm_length: Option<LengthBounds>,
    pub calm_multiplier: Option<Bounds>,
    pub max_consistent_intervals: Option<usize>,
    pub regularity_band: Option<f64>,
    pub correction: Option<Bounds>,
    /// Fields that failed validation and were ignored.
    pub rejected: Vec<SimError>,
}

impl TimingOverride {
    /// Parse a JSON object override. Only a non-object or invalid document is an error.
    pub fn from_json(text: &str) -> Result<Self, SimError> {
        let value: Value = serde_json::from_str(text)?;
        let object = match value {
            Value::Object(object) => object,
            other => {
                return Err(SimError::OverrideParse(format!(
                    "expected a JSON object, found {}",
                    json_kind(&other)
                )));
            }
        };

        let mut parser = FieldParser {
            object: &object,
            rejected: Vec::new(),
        };

        let time_of_day = parser.field("time_of_day", |multipliers: &TimeOfDayMultipliers| {
            [
                multipliers.morning,
                multipliers.midday,
                multipliers.evening,
                multipliers.night,
            ]
            .into_iter()
            .try_for_each(positive)
        });

        let session_tempo = parser.field("session_tempo", |tempo: &SessionTempo| {
            [
                tempo.asia_open,
                tempo.asia_mid,
                tempo.europe_open,
                tempo.us_open,
                tempo.us_power,
                tempo.overnight,
            ]
            .iter()
            .try_for_each(valid_bounds)
        });

        let regime_tempo = parser.field("regime_tempo", |tempo: &RegimeTempo| {
            [tempo.bull, tempo.bear, tempo.sideways, tempo.volatile]
                .iter()
                .try_for_each(valid_bounds)
        });

        let timing_override = Self {
            base_interval_ms: parser.field("base_interval_ms", |v: &f64| positive(*v)),
            variance: parser.field("variance", |v: &f64| {
                if v.is_finite() && (0.0..1.0).contains(v) {
                    Ok(())
                } else {
                    Err(format!("{v} is outside [0, 1)"))
                }
            }),
            min_interval_ms: parser.field("min_interval_ms", |v: &f64| positive(*v)),
            time_of_day,
            high_volatility: parser.field("high_volatility", |v: &f64| positive(*v)),
            low_volatility: parser.field("low_volatility", |v: &f64| positive(*v)),
            trending: parser.field("trending", |v: &f64| positive(*v)),
            sideways: parser.field("sideways", |v: &f64| positive(*v)),
            session_tempo,
            regime_tempo,
            burst_probability: parser.field("burst_probability", |v: &f64| probability(*v)),
            burst_length: parser.field("burst_length", valid_length),
            burst_multiplier: parser.field("burst_multiplier", valid_bounds),
            calm_probability: parser.field("calm_probability", |v: &f64| probability(*v)),
            calm_length: parser.field("calm_length", valid_length),
            calm_multiplier: parser.field("calm_multiplier", valid_bounds),
            max_consistent_intervals: parser.field("max_consistent_intervals", |_: &usize| Ok(())),
            regularity_band: parser.field("regularity_band", |v: &f64| {
                if v.is_finite() && *v > 0.0 && *v < 0.5 {
                    Ok(())
                } else {
                    Err(format!("{v} is outside (0, 0.5)"))
                }
            }),
            correction: parser.field("correction", valid_bounds),
            rejected: Vec::new(),
        };

        Ok(Self {
            rejected: parser.rejected,
            ..timing_override
        })
    }

    pub fn is_empty(&self) -> bool {
        *self
            == Self {
                rejected: self.rejected.clone(),
                ..Self::default()
            }
    }
}

struct FieldParser<'a> {
    object: &'a Map<String, Value>,
    rejected: Vec<SimError>,
}

impl FieldParser<'_> {
    fn field<T, F>(&mut self, name: &'static str, validate: F) -> Option<T>
    where
        T: DeserializeOwned,
        F: FnOnce(&T) -> Result<(), String>,
    {
        let raw = self.object.get(name)?;

        let parsed = serde_json::from_value::<T>(raw.clone())
            .map_err(|error| error.to_string())
            .and_then(|value| validate(&value).map(|_| value));

        match parsed {
            Ok(value) => Some(value),
            Err(reason) => {
                warn!(field = name, %reason, "rejected timing override field, keeping default");
                self.rejected.push(SimError::invalid_field(name, reason));
                None
            }
        }
    }
}

fn positive(value: f64) -> Result<(), String> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(format!("{value} is not a positive finite number"))
    }
}

fn probability(value: f64) -> Result<(), String> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(format!("{value} is not a probability in [0, 1]"))
    }
}

fn valid_bounds(bounds: &Bounds) -> Result<(), String> {
    positive(bounds.min)?;
    positive(bounds.max)?;
    if bounds.min > bounds.max {
        return Err(format!("inverted range [{}, {}]", bounds.min, bounds.max));
    }
    Ok(())
}

fn valid_length(length: &LengthBounds) -> Result<(), String> {
    if length.min == 0 {
        return Err("window length must be at least 1".to_string());
    }
    if length.min > length.max {
        return Err(format!("inverted range [{}, {}]", length.min, length.max));
    }
    Ok(())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let activity = TimingConfig::bot_activity();
        assert_eq!(activity.base_interval_ms, 12_000.0);
        assert_eq!(activity.min_interval_ms, 800.0);
        assert_eq!(activity.breaker.correction, Bounds::new(0.75, 1.25));

        let alerts = TimingConfig::smart_alerts();
        assert_eq!(alerts.base_interval_ms, 25_000.0);
        assert_eq!(alerts.min_interval_ms, 3_000.0);
        assert_eq!(alerts.breaker.correction, Bounds::new(0.8, 1.2));
        assert_eq!(alerts.time_of_day, activity.time_of_day);

        let neutral = TimingConfig::neutral(12_000.0, 800.0);
        assert!(!neutral.breaker.is_enabled());
        assert_eq!(neutral.burst.probability, 0.0);
        assert_eq!(neutral.session_tempo.get(SessionSlot::UsOpen), Bounds::ONE);
    }

    #[test]
    fn test_override_applies_valid_fields() {
        let timing_override = TimingOverride::from_json(
            r#"{
                "base_interval_ms": 5000,
                "burst_multiplier": [0.3, 0.4],
                "calm_length": {"min": 2, "max": 2},
                "max_consistent_intervals": 6,
                "session_tempo": {
                    "asia_open": [1.0, 1.0],
                    "asia_mid": [1.0, 1.2],
                    "europe_open": [0.9, 1.0],
                    "us_open": [0.5, 0.6],
                    "us_power": [0.8, 0.9],
                    "overnight": [1.5, 2.0]
                },
                "regime_tempo": {
                    "bull": [0.9, 0.9],
                    "bear": [1.0, 1.1],
                    "sideways": [1.2, 1.4],
                    "volatile": {"min": 0.5, "max": 0.7}
                }
            }"#,
        )
        .unwrap();

        assert!(timing_override.rejected.is_empty());
        let config = TimingConfig::bot_activity().with_override(&timing_override);
        assert_eq!(config.base_interval_ms, 5_000.0);
        assert_eq!(config.burst.multiplier, Bounds::new(0.3, 0.4));
        assert_eq!(config.calm.length, LengthBounds::new(2, 2));
        assert_eq!(config.breaker.max_consistent_intervals, 6);
        assert_eq!(config.min_interval_ms, 800.0);
        assert_eq!(config.session_tempo.get(SessionSlot::UsOpen), Bounds::new(0.5, 0.6));
        assert_eq!(config.session_tempo.get(SessionSlot::Overnight), Bounds::new(1.5, 2.0));
        assert_eq!(config.regime_tempo.get(MarketRegime::Volatile), Bounds::new(0.5, 0.7));
        assert_eq!(config.regime_tempo.get(MarketRegime::Bull), Bounds::new(0.9, 0.9));
    }

    #[test]
    fn test_override_rejects_invalid_fields_individually() {
        struct TestCase {
            input: &'static str,
            rejected_field: &'static str,
        }

        let tests = vec![
            TestCase {
                // TC0: negative base interval
                input: r#"{"base_interval_ms": -1, "variance": 0.2}"#,
                rejected_field: "base_interval_ms",
            },
            TestCase {
                // TC1: probability above 1
                input: r#"{"burst_probability": 1.5, "variance": 0.2}"#,
                rejected_field: "burst_probability",
            },
            TestCase {
                // TC2: inverted range
                input: r#"{"correction": [1.3, 0.7], "variance": 0.2}"#,
                rejected_field: "correction",
            },
            TestCase {
                // TC3: wrong type
                input: r#"{"min_interval_ms": "fast", "variance": 0.2}"#,
                rejected_field: "min_interval_ms",
            },
            TestCase {
                // TC4: zero-length window
                input: r#"{"burst_length": [0, 3], "variance": 0.2}"#,
                rejected_field: "burst_length",
            },
            TestCase {
                // TC5: inverted session tempo range
                input: r#"{
                    "session_tempo": {
                        "asia_open": [1.0, 1.0],
                        "asia_mid": [1.0, 1.0],
                        "europe_open": [1.0, 1.0],
                        "us_open": [0.9, 0.6],
                        "us_power": [1.0, 1.0],
                        "overnight": [1.0, 1.0]
                    },
                    "variance": 0.2
                }"#,
                rejected_field: "session_tempo",
            },
            TestCase {
                // TC6: regime tempo missing a regime
                input: r#"{"regime_tempo": {"bull": [1.0, 1.0]}, "variance": 0.2}"#,
                rejected_field: "regime_tempo",
            },
            TestCase {
                // TC7: non-positive regime tempo
                input: r#"{
                    "regime_tempo": {
                        "bull": [1.0, 1.0],
                        "bear": [0.0, 1.0],
                        "sideways": [1.0, 1.0],
                        "volatile": [1.0, 1.0]
                    },
                    "variance": 0.2
                }"#,
                rejected_field: "regime_tempo",
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let timing_override = TimingOverride::from_json(test.input).unwrap();
            assert_eq!(timing_override.rejected.len(), 1, "TC{} failed", index);
            assert!(
                matches!(
                    &timing_override.rejected[0],
                    SimError::InvalidField { field, .. } if field == test.rejected_field
                ),
                "TC{} failed: {:?}",
                index,
                timing_override.rejected
            );

            let defaults = TimingConfig::bot_activity();
            let config = defaults.with_override(&timing_override);
            assert_eq!(config.variance, 0.2, "TC{} valid sibling not applied", index);
            assert_eq!(config.base_interval_ms, defaults.base_interval_ms, "TC{} failed", index);
            assert_eq!(config.min_interval_ms, defaults.min_interval_ms, "TC{} failed", index);
            assert_eq!(config.session_tempo, defaults.session_tempo, "TC{} failed", index);
            assert_eq!(config.regime_tempo, defaults.regime_tempo, "TC{} failed", index);
        }
    }

    #[test]
    fn test_override_document_errors() {
        assert!(matches!(
            TimingOverride::from_json("not json"),
            Err(SimError::OverrideParse(_))
        ));
        assert!(matches!(
            TimingOverride::from_json("[1, 2]"),
            Err(SimError::OverrideParse(_))
        ));
        assert!(TimingOverride::from_json("{}").unwrap().is_empty());
    }
}
