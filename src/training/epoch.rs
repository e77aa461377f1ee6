//! Per-epoch training and evaluation.
//!
//! [`EpochRunner`] is the seam between the epoch loop controller and the
//! gradient machinery: the controller only sees epoch results and checkpoint
//! requests, so checkpoint selection logic can be exercised without a model.
//! [`SupervisedRunner`] is the real implementation driving a Burn model.

use std::collections::BTreeMap;
use std::path::Path;

use burn::{
    data::dataloader::batcher::Batcher,
    data::dataset::Dataset,
    module::{AutodiffModule, Module},
    optim::{GradientsParams, Optimizer},
    record::CompactRecorder,
    tensor::backend::{AutodiffBackend, Backend},
    tensor::ElementConversion,
};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::dataset::{LesionBatch, LesionBatcher, LesionDataset};
use crate::model::LesionClassifier;
use crate::training::loss::Criterion;
use crate::utils::error::{MelanetError, Result};
use crate::utils::metrics::MetricReport;

/// Losses and metrics from one epoch
#[derive(Debug, Clone)]
pub struct EpochResult {
    /// Mean training loss over the epoch's batches
    pub train_loss: f64,
    /// Mean validation loss
    pub val_loss: f64,
    /// Training metrics by configured name
    pub train_metrics: BTreeMap<String, f64>,
    /// Validation metrics by configured name
    pub val_metrics: BTreeMap<String, f64>,
}

/// One epoch of work plus checkpointing, as seen by the epoch loop
pub trait EpochRunner {
    /// Train for one epoch at the given learning rate, then evaluate on the
    /// validation set
    fn run_epoch(&mut self, epoch: usize, lr: f64) -> Result<EpochResult>;

    /// Persist the current model weights to `path`
    fn save_checkpoint(&self, path: &Path) -> Result<()>;
}

/// Epoch runner training a [`LesionClassifier`] with an optimizer and loss
pub struct SupervisedRunner<B: AutodiffBackend, O> {
    model: LesionClassifier<B>,
    optimizer: O,
    criterion: Criterion,
    batcher: LesionBatcher,
    train_dataset: LesionDataset,
    val_dataset: LesionDataset,
    batch_size: usize,
    metric_names: Vec<String>,
    num_classes: usize,
    device: B::Device,
    shuffle_rng: ChaCha8Rng,
}

impl<B, O> SupervisedRunner<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<LesionClassifier<B>, B>,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        model: LesionClassifier<B>,
        optimizer: O,
        criterion: Criterion,
        batcher: LesionBatcher,
        train_dataset: LesionDataset,
        val_dataset: LesionDataset,
        batch_size: usize,
        metric_names: Vec<String>,
        num_classes: usize,
        device: B::Device,
        seed: Option<u64>,
    ) -> Self {
        let shuffle_rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        Self {
            model,
            optimizer,
            criterion,
            batcher,
            train_dataset,
            val_dataset,
            batch_size,
            metric_names,
            num_classes,
            device,
            shuffle_rng,
        }
    }

    /// Take the trained model out of the runner
    pub fn into_model(self) -> LesionClassifier<B> {
        self.model
    }

    fn train_phase(&mut self, epoch: usize, lr: f64) -> Result<(f64, MetricReport)> {
        let len = self.train_dataset.len();
        let mut indices: Vec<usize> = (0..len).collect();
        indices.shuffle(&mut self.shuffle_rng);

        let num_batches = len.div_ceil(self.batch_size);

        let mut model = self.model.clone();
        let mut loss_sum = 0.0f64;
        let mut batches_seen = 0usize;
        let mut predictions = Vec::with_capacity(len);
        let mut ground_truth = Vec::with_capacity(len);

        for (batch_idx, chunk) in indices.chunks(self.batch_size).enumerate() {
            let items = chunk
                .iter()
                .map(|&i| self.train_dataset.try_get(i))
                .collect::<Result<Vec<_>>>()?;

            let batch: LesionBatch<B> = self.batcher.batch(items, &self.device);

            let output = model.forward(batch.images.clone());
            let loss = self
                .criterion
                .forward(output.clone(), batch.targets.clone(), &self.device);

            let loss_value: f64 = loss.clone().into_scalar().elem();
            loss_sum += loss_value;
            batches_seen += 1;

            accumulate_predictions(&output, &batch.targets, &mut predictions, &mut ground_truth)?;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = self.optimizer.step(lr, model, grads);

            if (batch_idx + 1) % 10 == 0 || batch_idx + 1 == num_batches {
                debug!(
                    "epoch {} batch {}/{}: loss = {:.4}",
                    epoch,
                    batch_idx + 1,
                    num_batches,
                    loss_value
                );
            }
        }

        self.model = model;

        if batches_seen == 0 {
            return Err(MelanetError::Training(
                "training set produced no batches".into(),
            ));
        }

        let report = MetricReport::from_predictions(&predictions, &ground_truth, self.num_classes);
        Ok((loss_sum / batches_seen as f64, report))
    }

    fn validation_phase(&self) -> Result<(f64, MetricReport)> {
        // The autodiff and inner backends share the device type, so the
        // run's fixed device carries over to evaluation.
        let device = self.device.clone();
        let inner_model = self.model.clone().valid();

        let len = self.val_dataset.len();
        let mut loss_sum = 0.0f64;
        let mut batches_seen = 0usize;
        let mut predictions = Vec::with_capacity(len);
        let mut ground_truth = Vec::with_capacity(len);

        for start in (0..len).step_by(self.batch_size) {
            let end = (start + self.batch_size).min(len);
            let items = (start..end)
                .map(|i| self.val_dataset.try_get(i))
                .collect::<Result<Vec<_>>>()?;

            let batch: LesionBatch<B::InnerBackend> = self.batcher.batch(items, &device);

            let output = inner_model.forward(batch.images.clone());
            let loss = self
                .criterion
                .forward(output.clone(), batch.targets.clone(), &device);

            loss_sum += loss.into_scalar().elem::<f64>();
            batches_seen += 1;

            accumulate_predictions(&output, &batch.targets, &mut predictions, &mut ground_truth)?;
        }

        if batches_seen == 0 {
            return Err(MelanetError::Training(
                "validation set produced no batches".into(),
            ));
        }

        let report = MetricReport::from_predictions(&predictions, &ground_truth, self.num_classes);
        Ok((loss_sum / batches_seen as f64, report))
    }
}

impl<B, O> EpochRunner for SupervisedRunner<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<LesionClassifier<B>, B>,
{
    fn run_epoch(&mut self, epoch: usize, lr: f64) -> Result<EpochResult> {
        let (train_loss, train_report) = self.train_phase(epoch, lr)?;
        let (val_loss, val_report) = self.validation_phase()?;

        Ok(EpochResult {
            train_loss,
            val_loss,
            train_metrics: train_report.select(&self.metric_names),
            val_metrics: val_report.select(&self.metric_names),
        })
    }

    fn save_checkpoint(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        self.model
            .clone()
            .save_file(path, &CompactRecorder::new())
            .map_err(|e| MelanetError::Checkpoint(format!("failed to save {}: {}", path.display(), e)))
    }
}

/// Extract argmax predictions and targets from a batch into accumulators
pub fn accumulate_predictions<B: Backend>(
    logits: &burn::tensor::Tensor<B, 2>,
    targets: &burn::tensor::Tensor<B, 1, burn::tensor::Int>,
    predictions: &mut Vec<usize>,
    ground_truth: &mut Vec<usize>,
) -> Result<()> {
    let preds = logits
        .clone()
        .argmax(1)
        .squeeze_dim::<1>(1)
        .into_data()
        .to_vec::<i64>()
        .map_err(|e| MelanetError::Training(format!("failed to read predictions: {:?}", e)))?;
    let truth = targets
        .clone()
        .into_data()
        .to_vec::<i64>()
        .map_err(|e| MelanetError::Training(format!("failed to read targets: {:?}", e)))?;

    predictions.extend(preds.into_iter().map(|p| p as usize));
    ground_truth.extend(truth.into_iter().map(|t| t as usize));

    Ok(())
}
