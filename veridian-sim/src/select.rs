//! Candidate filter and weighted selector.

use crate::{
    context::{
        evaluator::ActiveEvents, regime::MarketRegime, session::SessionSlot, session::TimeOfDay,
        signal::MarketCondition,
    },
    random::RandomSource,
    template::{Category, EventTemplate},
};
use std::collections::VecDeque;
use tracing::debug;

/// Default anti-repetition window for the bot-activity stream.
pub const ACTIVITY_RECENT_CAPACITY: usize = 15;

/// Default anti-repetition window for the smart-alert stream.
pub const ALERT_RECENT_CAPACITY: usize = 6;

/// Bounded FIFO of recently emitted template ids.
///
/// An id present in the set is never eligible for selection. Inserting past
/// capacity evicts the oldest id; re-inserting does not refresh position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentUseSet {
    capacity: usize,
    ids: VecDeque<&'static str>,
}

impl RecentUseSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ids: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|recent| *recent == id)
    }

    pub fn insert(&mut self, id: &'static str) {
        if self.capacity == 0 || self.contains(id) {
            return;
        }
        if self.ids.len() == self.capacity {
            self.ids.pop_front();
        }
        self.ids.push_back(id);
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Ids oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.ids.iter().copied()
    }
}

/// Context a template is filtered and weighted against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionContext {
    pub time_of_day: TimeOfDay,
    pub condition: MarketCondition,
    pub active: ActiveEvents,
    pub regime: MarketRegime,
    pub session: SessionSlot,
}

/// Outcome of a selection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection<'a> {
    Picked(&'a EventTemplate),
    /// Every eligible template was recently used; the recent-use set was cleared.
    Exhausted,
}

/// Category affinity for a regime. Unlisted categories weigh 1.
pub fn regime_weight(regime: MarketRegime, category: Category) -> f64 {
    use Category::*;

    match (regime, category) {
        (MarketRegime::Bull, TradeExecution) => 1.4,
        (MarketRegime::Bull, SignalAnalysis) => 1.2,
        (MarketRegime::Bull, PortfolioRebalancing) => 1.1,
        (MarketRegime::Bull, ExecutionSuccess) => 1.4,
        (MarketRegime::Bull, PerformanceMilestone) => 1.3,
        (MarketRegime::Bull, RiskManagement) => 0.8,

        (MarketRegime::Bear, RiskManagement) => 1.5,
        (MarketRegime::Bear, RiskWarning) => 1.5,
        (MarketRegime::Bear, TradeExecution) => 0.8,
        (MarketRegime::Bear, PortfolioRebalancing) => 1.2,
        (MarketRegime::Bear, MarketScanning) => 1.1,

        (MarketRegime::Sideways, TradeExecution) => 0.9,
        (MarketRegime::Sideways, Arbitrage) => 1.3,
        (MarketRegime::Sideways, ArbitrageOpportunity) => 1.3,
        (MarketRegime::Sideways, StrategyOptimization) => 1.2,
        (MarketRegime::Sideways, MarketScanning) => 1.2,

        (MarketRegime::Volatile, RiskManagement) => 1.3,
        (MarketRegime::Volatile, MarketVolatility) => 1.6,
        (MarketRegime::Volatile, NewsSentiment) => 1.3,
        (MarketRegime::Volatile, NewsImpact) => 1.4,
        (MarketRegime::Volatile, TradeExecution) => 1.2,

        _ => 1.0,
    }
}

/// Category affinity for a session slot. Unlisted categories weigh 1.
pub fn session_weight(session: SessionSlot, category: Category) -> f64 {
    use Category::*;

    match (session, category) {
        (SessionSlot::AsiaOpen, MarketScanning | Arbitrage) => 1.2,
        (SessionSlot::AsiaMid, StrategyOptimization | SystemStatus) => 1.2,
        (SessionSlot::EuropeOpen, NewsSentiment | NewsImpact) => 1.2,
        (SessionSlot::EuropeOpen, SignalAnalysis) => 1.1,
        (SessionSlot::UsOpen, TradeExecution | ExecutionSuccess) => 1.3,
        (SessionSlot::UsOpen, MarketVolatility) => 1.2,
        (SessionSlot::UsPower, TradeExecution | PortfolioRebalancing | PortfolioUpdate) => 1.2,
        (SessionSlot::Overnight, RiskManagement) => 1.1,
        (SessionSlot::Overnight, StrategyOptimization) => 1.3,
        (SessionSlot::Overnight, UserInteraction) => 0.8,
        _ => 1.0,
    }
}

/// Integer sampling weight: `round(priority × regime × session)`, at least 1.
pub fn template_weight(template: &EventTemplate, ctx: &SelectionContext) -> u32 {
    let weight = f64::from(template.priority.weight())
        * regime_weight(ctx.regime, template.category)
        * session_weight(ctx.session, template.category);

    (weight.round() as u32).max(1)
}

/// Draw one candidate with probability proportional to [`template_weight`].
///
/// Equivalent to sampling uniformly from a pool where each candidate is
/// repeated `weight` times, without materialising the pool.
pub fn weighted_pick<'a>(
    candidates: &[&'a EventTemplate],
    ctx: &SelectionContext,
    rng: &mut dyn RandomSource,
) -> Option<&'a EventTemplate> {
    let weights: Vec<u32> = candidates
        .iter()
        .map(|template| template_weight(template, ctx))
        .collect();
    let total: u32 = weights.iter().sum();
    if total == 0 {
        return None;
    }

    let mut draw = rng.index(total as usize) as u32;
    candidates
        .iter()
        .zip(weights)
        .find(|(_, weight)| {
            if draw < *weight {
                true
            } else {
                draw -= weight;
                false
            }
        })
        .map(|(template, _)| *template)
}

/// Filter `catalog` by eligibility and recent use, then draw a weighted template.
///
/// When nothing survives the filter the recent-use set is cleared and
/// [`Selection::Exhausted`] returned, so the next attempt sees the full catalog.
pub fn select_template<'a>(
    catalog: &'a [EventTemplate],
    ctx: &SelectionContext,
    recent: &mut RecentUseSet,
    rng: &mut dyn RandomSource,
) -> Selection<'a> {
    let candidates: Vec<&EventTemplate> = catalog
        .iter()
        .filter(|template| {
            template
                .eligibility
                .matches(ctx.time_of_day, &ctx.condition, &ctx.active)
        })
        .filter(|template| !recent.contains(template.id))
        .collect();

    match weighted_pick(&candidates, ctx, rng) {
        Some(template) => {
            recent.insert(template.id);
            Selection::Picked(template)
        }
        None => {
            debug!(
                recent = recent.len(),
                regime = %ctx.regime,
                session = %ctx.session,
                "template candidates exhausted, clearing recent-use set"
            );
            recent.clear();
            Selection::Exhausted
        }
    }
}
