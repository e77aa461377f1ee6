//! Training run orchestration.
//!
//! `run_epoch_loop` is the checkpoint selection controller: it runs every
//! configured epoch, saves the model whenever the validation F1-score
//! strictly improves on the best seen so far, and steps the LR scheduler
//! exactly once per epoch with the validation loss. `run_training` wires the
//! whole pipeline together and finishes with a test-set evaluation of the
//! saved checkpoint.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use burn::optim::{AdamConfig, AdamWConfig, Optimizer, SgdConfig};
use burn::tensor::backend::AutodiffBackend;
use tracing::{info, warn};

use crate::config::RunConfig;
use crate::dataset::{load_records, prepare_split, LesionBatcher, LesionDataset, SplitOptions};
use crate::model::{resolve_extractor, LesionClassifier};
use crate::training::epoch::{EpochRunner, SupervisedRunner};
use crate::training::loss::{Criterion, LossKind};
use crate::training::optim::OptimizerKind;
use crate::training::scheduler::{PlateauMode, ReduceOnPlateau};
use crate::utils::error::{MelanetError, Result};

/// Metric the checkpoint selection watches
pub const SELECTION_METRIC: &str = "f1_score";

/// Outcome of the epoch loop
#[derive(Debug, Clone, PartialEq)]
pub struct FitOutcome {
    /// Best validation F1-score seen over the run
    pub best_f1: f64,
    /// Number of checkpoint saves (improvements)
    pub saves: usize,
    /// Number of epochs executed
    pub epochs_run: usize,
}

/// Full result of a training run
#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub outcome: FitOutcome,
    /// Path of the best checkpoint written during the run
    pub checkpoint: PathBuf,
    /// Test-set metrics of the best checkpoint, plus its test loss
    pub test_report: BTreeMap<String, f64>,
}

/// Checkpoint path for a run: `saved/models/<timestamp>-<save_as_name>`
pub fn checkpoint_path(save_as_name: &str, timestamp: &str) -> PathBuf {
    PathBuf::from("saved")
        .join("models")
        .join(format!("{}-{}", timestamp, save_as_name))
}

/// Run the epoch loop with best-F1 checkpointing.
///
/// All `num_epoch` epochs run regardless of metric movement; there is no
/// early stopping. A checkpoint is written only on strict improvement of the
/// validation F1-score, so the saved weights are always the best seen.
pub fn run_epoch_loop<R: EpochRunner>(
    runner: &mut R,
    scheduler: &mut ReduceOnPlateau,
    num_epoch: usize,
    checkpoint: &Path,
) -> Result<FitOutcome> {
    let mut best_f1 = 0.0f64;
    let mut saves = 0usize;

    for epoch in 1..=num_epoch {
        let lr = scheduler.get_lr();
        let result = runner.run_epoch(epoch, lr)?;

        let val_f1 = *result.val_metrics.get(SELECTION_METRIC).ok_or_else(|| {
            MelanetError::Training(format!(
                "epoch result is missing the '{}' metric",
                SELECTION_METRIC
            ))
        })?;

        let improved = val_f1 > best_f1;
        if improved {
            best_f1 = val_f1;
            runner.save_checkpoint(checkpoint)?;
            saves += 1;
        }

        info!(
            "epoch {}/{}: lr = {:.2e}, train_loss = {:.4}, val_loss = {:.4}, train_metrics = {:?}, val_metrics = {:?}{}",
            epoch,
            num_epoch,
            lr,
            result.train_loss,
            result.val_loss,
            result.train_metrics,
            result.val_metrics,
            if improved { " (saved)" } else { " (no save)" }
        );

        // One scheduler step per epoch, driven by the validation loss.
        scheduler.step(result.val_loss);
    }

    Ok(FitOutcome {
        best_f1,
        saves,
        epochs_run: num_epoch,
    })
}

/// Run the full training pipeline for a validated configuration.
///
/// Loads and splits the CSV index, builds the model, optimizer, and loss
/// from their registries, runs the epoch loop, and evaluates the saved
/// checkpoint on the test set. The checkpoint layout lives under
/// `output_root` (the CLI passes the working directory).
pub fn run_training<B: AutodiffBackend>(
    config: &RunConfig,
    timestamp: &str,
    output_root: &Path,
) -> Result<TrainingSummary> {
    let device = B::Device::default();
    info!("Device: {:?}", device);

    let records = load_records(Path::new(&config.data.data_csv_name))?;
    let split = prepare_split(
        records,
        &SplitOptions {
            validation_ratio: config.data.validation_ratio,
            sample_cap: config.data.sample_cap,
            seed: config.data.seed,
        },
    )?;

    let data_path = Path::new(&config.data.data_path);
    let train_dataset =
        LesionDataset::from_records(&split.train, data_path, config.data.image_size)?;
    let val_dataset =
        LesionDataset::from_records(&split.validation, data_path, config.data.image_size)?;

    info!(
        "Train class distribution: {:?}",
        train_dataset.class_distribution(config.train.num_classes)
    );

    let model_config = resolve_extractor(
        &config.train.extractor,
        config.train.num_classes,
        config.data.image_size,
    )?;
    let model = LesionClassifier::<B>::new(&model_config, &device);

    let criterion = Criterion::new(LossKind::resolve(&config.optimizer.loss)?);
    let mode = PlateauMode::resolve(&config.train.scheduler_mode)?;
    let mut scheduler = ReduceOnPlateau::new(
        config.optimizer.lr,
        config.train.reduce_lr_factor,
        config.train.patience,
        0.0,
        mode,
    );

    let batcher = LesionBatcher::new(config.data.image_size);
    let checkpoint = output_root.join(checkpoint_path(&config.train.save_as_name, timestamp));

    info!(
        "Training '{}' for {} epochs ({} train / {} val samples)",
        config.train.extractor,
        config.train.num_epoch,
        split.train.len(),
        split.validation.len()
    );

    let outcome = match OptimizerKind::resolve(&config.optimizer.name)? {
        OptimizerKind::Adam => fit(
            AdamConfig::new().init::<B, LesionClassifier<B>>(),
            model,
            criterion,
            batcher,
            train_dataset,
            val_dataset,
            config,
            &mut scheduler,
            &checkpoint,
            device,
        )?,
        OptimizerKind::AdamW => fit(
            AdamWConfig::new().init::<B, LesionClassifier<B>>(),
            model,
            criterion,
            batcher,
            train_dataset,
            val_dataset,
            config,
            &mut scheduler,
            &checkpoint,
            device,
        )?,
        OptimizerKind::Sgd => fit(
            SgdConfig::new().init::<B, LesionClassifier<B>>(),
            model,
            criterion,
            batcher,
            train_dataset,
            val_dataset,
            config,
            &mut scheduler,
            &checkpoint,
            device,
        )?,
    };

    if outcome.saves == 0 {
        warn!("No epoch improved the validation F1-score; no checkpoint was written");
    }

    info!(
        "Training finished: best val F1 = {:.4} over {} epochs ({} saves)",
        outcome.best_f1, outcome.epochs_run, outcome.saves
    );

    // Evaluate this run's best checkpoint on the held-out test set.
    let test_report = crate::inference::run_test::<B::InnerBackend>(config, &checkpoint)?;

    Ok(TrainingSummary {
        outcome,
        checkpoint,
        test_report,
    })
}

#[allow(clippy::too_many_arguments)]
fn fit<B, O>(
    optimizer: O,
    model: LesionClassifier<B>,
    criterion: Criterion,
    batcher: LesionBatcher,
    train_dataset: LesionDataset,
    val_dataset: LesionDataset,
    config: &RunConfig,
    scheduler: &mut ReduceOnPlateau,
    checkpoint: &Path,
    device: B::Device,
) -> Result<FitOutcome>
where
    B: AutodiffBackend,
    O: Optimizer<LesionClassifier<B>, B>,
{
    let mut runner = SupervisedRunner::new(
        model,
        optimizer,
        criterion,
        batcher,
        train_dataset,
        val_dataset,
        config.data.batch_size,
        config.train.metrics.clone(),
        config.train.num_classes,
        device,
        config.data.seed,
    );

    run_epoch_loop(&mut runner, scheduler, config.train.num_epoch, checkpoint)
}
