//! Shared utilities: error types, logging, and evaluation metrics.

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{MelanetError, Result};
pub use metrics::{ConfusionMatrix, MetricReport};
