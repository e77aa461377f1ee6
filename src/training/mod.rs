//! Training: loss and optimizer registries, LR scheduling, the per-epoch
//! runner, and the epoch loop controller.

pub mod epoch;
pub mod loss;
pub mod optim;
pub mod run;
pub mod scheduler;

pub use epoch::{EpochResult, EpochRunner, SupervisedRunner};
pub use loss::{Criterion, LossKind};
pub use optim::OptimizerKind;
pub use run::{run_training, FitOutcome, TrainingSummary};
pub use scheduler::{PlateauMode, ReduceOnPlateau};
