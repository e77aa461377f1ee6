//! # Melanet
//!
//! Skin lesion classification training pipeline built on the Burn framework.
//!
//! A JSON configuration file drives the whole run: the CSV-indexed dataset
//! is shuffled, subsampled, and split into train/validation sets, a CNN is
//! trained with reduce-on-plateau LR scheduling, and the checkpoint with the
//! best validation F1-score is evaluated on a held-out test set.
//!
//! ## Modules
//!
//! - `config`: JSON run configuration with startup validation
//! - `backend`: compile-time backend selection (NdArray / CUDA)
//! - `dataset`: CSV index loading, splitting, and Burn batching
//! - `model`: CNN architecture and the extractor registry
//! - `training`: losses, optimizers, LR scheduling, and the epoch loop
//! - `inference`: checkpoint evaluation on the test set
//! - `utils`: errors, logging, and evaluation metrics

pub mod backend;
pub mod config;
pub mod dataset;
pub mod inference;
pub mod model;
pub mod training;
pub mod utils;

pub use backend::{default_device, DefaultBackend, TrainingBackend};
pub use config::RunConfig;
pub use dataset::{LesionBatch, LesionBatcher, LesionDataset, LesionItem};
pub use model::{LesionClassifier, LesionClassifierConfig};
pub use training::{run_training, FitOutcome, TrainingSummary};
pub use utils::{MelanetError, Result};
