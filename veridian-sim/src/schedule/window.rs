use super::config::{Bounds, WindowConfig};
use crate::random::RandomSource;

/// Burst or calm window countdown.
///
/// Once triggered, the next `length` computations (including the triggering
/// one) draw their multiplier from the window's range.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WindowState {
    remaining: u32,
    multiplier: Option<Bounds>,
}

/// What a window contributed to one interval computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindowStep {
    Inactive,
    Continued(f64),
    Triggered { multiplier: f64, length: u32 },
}

impl WindowStep {
    pub fn multiplier(&self) -> f64 {
        match self {
            WindowStep::Inactive => 1.0,
            WindowStep::Continued(multiplier) => *multiplier,
            WindowStep::Triggered { multiplier, .. } => *multiplier,
        }
    }

    pub fn is_triggered(&self) -> bool {
        matches!(self, WindowStep::Triggered { .. })
    }
}

impl WindowState {
    pub fn is_active(&self) -> bool {
        self.remaining > 0
    }

    /// Computations left in the current window, excluding the one that triggered it.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn advance(&mut self, config: &WindowConfig, rng: &mut dyn RandomSource) -> WindowStep {
        if self.remaining > 0 {
            self.remaining -= 1;
            let range = self.multiplier.unwrap_or(config.multiplier);
            if self.remaining == 0 {
                self.multiplier = None;
            }
            return WindowStep::Continued(rng.uniform(range.min, range.max));
        }

        if config.probability <= 0.0 || !rng.chance(config.probability) {
            return WindowStep::Inactive;
        }

        let length = rng.int_inclusive(config.length.min.max(1), config.length.max.max(1));
        self.remaining = length - 1;
        self.multiplier = (self.remaining > 0).then_some(config.multiplier);

        WindowStep::Triggered {
            multiplier: rng.uniform(config.multiplier.min, config.multiplier.max),
            length,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
