//! Property tests for the scheduling and selection invariants.

use proptest::prelude::*;
use veridian_sim::{
    ActiveEvents, MarketCondition, MarketRegime, SessionSlot, SimRng, TimeOfDay, TimingConfig,
    Trend, Volatility,
    context::{MarketSignals, RegimeState},
    fill::{FillContext, fill},
    schedule::{
        IntervalContext, IntervalState,
        config::{Bounds, BreakerConfig, LengthBounds, WindowConfig},
        next_delay,
    },
    select::{RecentUseSet, Selection, SelectionContext, select_template},
    template::{activity, alert},
};

fn interval_context() -> impl Strategy<Value = IntervalContext> {
    (0..4usize, 0..3usize, 0..3usize, 0..6usize, 0..4usize).prop_map(
        |(time, volatility, trend, session, regime)| IntervalContext {
            time_of_day: TimeOfDay::ALL[time],
            volatility: [Volatility::Low, Volatility::Medium, Volatility::High][volatility],
            trend: [Trend::Up, Trend::Down, Trend::Sideways][trend],
            session: SessionSlot::ALL[session],
            regime: MarketRegime::ALL[regime],
        },
    )
}

fn timing_config() -> impl Strategy<Value = TimingConfig> {
    (
        (100.0..60_000.0f64, 0.0..0.9f64, 0u32..5_000),
        (0.05..3.0f64, 0.05..3.0f64, 0.05..3.0f64),
        (0.0..1.0f64, 0.05..1.0f64, 0.0..1.0f64, 1.0..4.0f64),
        (0usize..8, 0.0..0.3f64, 0.1..1.0f64, 1.0..2.0f64),
    )
        .prop_map(
            |(
                (base, variance, floor),
                (high_volatility, trending, night),
                (burst_probability, burst_multiplier, calm_probability, calm_multiplier),
                (max_consistent, band, correction_min, correction_max),
            )| {
                let mut config = TimingConfig::bot_activity();
                config.base_interval_ms = base;
                config.variance = variance;
                config.min_interval_ms = floor as f64;
                config.high_volatility = high_volatility;
                config.trending = trending;
                config.time_of_day.night = night;
                config.burst = WindowConfig {
                    probability: burst_probability,
                    length: LengthBounds::new(1, 6),
                    multiplier: Bounds::new(burst_multiplier, burst_multiplier),
                };
                config.calm = WindowConfig {
                    probability: calm_probability,
                    length: LengthBounds::new(1, 6),
                    multiplier: Bounds::new(1.0, calm_multiplier),
                };
                config.breaker = BreakerConfig {
                    max_consistent_intervals: max_consistent,
                    band,
                    correction: Bounds::new(correction_min, correction_max),
                };
                config
            },
        )
}

fn selection_context() -> impl Strategy<Value = SelectionContext> {
    (0..4usize, 0..4usize, 0..6usize).prop_map(|(time, regime, session)| SelectionContext {
        time_of_day: TimeOfDay::ALL[time],
        condition: MarketCondition::default(),
        active: ActiveEvents::default(),
        regime: MarketRegime::ALL[regime],
        session: SessionSlot::ALL[session],
    })
}

proptest! {
    #[test]
    fn prop_delay_never_below_floor(
        config in timing_config(),
        ctx in interval_context(),
        seed in any::<u64>(),
    ) {
        let mut state = IntervalState::default();
        let mut rng = SimRng::seeded(seed);

        for _ in 0..40 {
            let scheduled = next_delay(&config, &ctx, &mut state, &mut rng);
            prop_assert!(
                scheduled.delay.as_millis() as f64 >= config.min_interval_ms,
                "delay {:?} below floor {}",
                scheduled.delay,
                config.min_interval_ms
            );
        }
    }

    #[test]
    fn prop_no_repeat_within_recent_window(
        ctx in selection_context(),
        capacity in 0usize..20,
        alerts in any::<bool>(),
        seed in any::<u64>(),
    ) {
        let catalog = if alerts { alert::TEMPLATES } else { activity::TEMPLATES };
        let mut recent = RecentUseSet::new(capacity);
        let mut rng = SimRng::seeded(seed);
        let mut since_reset: Vec<&'static str> = Vec::new();

        for _ in 0..200 {
            match select_template(catalog, &ctx, &mut recent, &mut rng) {
                Selection::Picked(template) => {
                    let window_start = since_reset.len().saturating_sub(capacity);
                    prop_assert!(
                        !since_reset[window_start..].contains(&template.id),
                        "{} repeated within {} picks",
                        template.id,
                        capacity
                    );
                    since_reset.push(template.id);
                }
                Selection::Exhausted => {
                    prop_assert!(recent.is_empty());
                    since_reset.clear();
                }
            }
        }
    }

    #[test]
    fn prop_filled_bodies_have_no_placeholders(
        index in any::<prop::sample::Index>(),
        regime in 0..4usize,
        session in 0..6usize,
        seed in any::<u64>(),
    ) {
        let catalog: Vec<_> = activity::TEMPLATES.iter().chain(alert::TEMPLATES).collect();
        let template = index.get(&catalog);
        let mut rng = SimRng::seeded(seed);
        let regime_state =
            RegimeState::starting(MarketRegime::ALL[regime], chrono::Utc::now(), &mut rng);
        let signals = MarketSignals::default();

        let ctx = FillContext {
            symbol: "ETH/USDT",
            signals: &signals,
            regime: regime_state.regime,
            session: SessionSlot::ALL[session],
            win_profile: regime_state.win_profile,
        };
        let body = fill(template, &ctx, &mut rng);

        prop_assert!(!body.contains('{'), "unfilled token in {}: {}", template.id, body);
        prop_assert!(!body.contains('}'), "unfilled token in {}: {}", template.id, body);
    }
}
