//! Reduce-on-plateau learning rate scheduling.
//!
//! The scheduler is stepped exactly once per epoch with the monitored metric
//! (validation loss) and returns the learning rate to use next. The monitored
//! direction comes from the configured mode string.

use crate::utils::error::{MelanetError, Result};

/// Direction in which the monitored metric should move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlateauMode {
    /// Metric should decrease (e.g., loss)
    Min,
    /// Metric should increase (e.g., F1)
    Max,
}

impl PlateauMode {
    /// Resolve a configured mode string; unknown values are fatal
    pub fn resolve(name: &str) -> Result<Self> {
        match name {
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            _ => Err(MelanetError::Config(format!(
                "unknown scheduler mode '{}' (supported: min, max)",
                name
            ))),
        }
    }
}

/// Reduce-on-plateau scheduler state
#[derive(Debug, Clone)]
pub struct ReduceOnPlateau {
    best_metric: f64,
    epochs_without_improvement: usize,
    current_lr: f64,
    reduction_factor: f64,
    patience: usize,
    min_lr: f64,
    mode: PlateauMode,
    steps: usize,
}

impl ReduceOnPlateau {
    /// Create a new scheduler
    pub fn new(
        initial_lr: f64,
        reduction_factor: f64,
        patience: usize,
        min_lr: f64,
        mode: PlateauMode,
    ) -> Self {
        let best_metric = match mode {
            PlateauMode::Min => f64::INFINITY,
            PlateauMode::Max => f64::NEG_INFINITY,
        };

        Self {
            best_metric,
            epochs_without_improvement: 0,
            current_lr: initial_lr,
            reduction_factor,
            patience,
            min_lr,
            mode,
            steps: 0,
        }
    }

    /// Record a new metric value and return the learning rate to use next
    pub fn step(&mut self, metric: f64) -> f64 {
        self.steps += 1;

        let improved = match self.mode {
            PlateauMode::Min => metric < self.best_metric,
            PlateauMode::Max => metric > self.best_metric,
        };

        if improved {
            self.best_metric = metric;
            self.epochs_without_improvement = 0;
        } else {
            self.epochs_without_improvement += 1;

            if self.epochs_without_improvement >= self.patience {
                let new_lr = (self.current_lr * self.reduction_factor).max(self.min_lr);
                if new_lr < self.current_lr {
                    self.current_lr = new_lr;
                    self.epochs_without_improvement = 0;
                }
            }
        }

        self.current_lr
    }

    /// Current learning rate
    pub fn get_lr(&self) -> f64 {
        self.current_lr
    }

    /// Number of times `step` has been called
    pub fn steps(&self) -> usize {
        self.steps
    }
}
