//! Test-set evaluation of a saved checkpoint.
//!
//! Rebuilds the model from the configured extractor preset, loads the
//! checkpoint weights, and evaluates the test CSV index. Used both by the
//! end-of-training test phase and the standalone `evaluate` command.

use std::collections::BTreeMap;
use std::path::Path;

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::module::Module;
use burn::record::CompactRecorder;
use burn::tensor::backend::Backend;
use burn::tensor::ElementConversion;
use tracing::info;

use crate::config::RunConfig;
use crate::dataset::{load_records, LesionBatch, LesionBatcher, LesionDataset};
use crate::model::{resolve_extractor, LesionClassifier};
use crate::training::epoch::accumulate_predictions;
use crate::training::loss::{Criterion, LossKind};
use crate::utils::error::{MelanetError, Result};
use crate::utils::metrics::MetricReport;

/// Evaluate a checkpoint on the configured test set.
///
/// Returns the configured metrics plus a `loss` entry. A missing checkpoint
/// file is a fatal error naming the path.
pub fn run_test<B: Backend>(
    config: &RunConfig,
    checkpoint: &Path,
) -> Result<BTreeMap<String, f64>> {
    let device = B::Device::default();

    let model = load_checkpoint::<B>(config, checkpoint, &device)?;
    let criterion = Criterion::new(LossKind::resolve(&config.optimizer.loss)?);

    let records = load_records(Path::new(&config.data.test_csv_name))?;
    let dataset = LesionDataset::from_records(
        &records,
        Path::new(config.data.test_data_path()),
        config.data.image_size,
    )?;

    info!(
        "Evaluating {} on {} test samples",
        checkpoint.display(),
        dataset.len()
    );

    let (loss, report) = evaluate_dataset(&model, &dataset, config, &criterion, &device)?;

    let mut out = report.select(&config.train.metrics);
    out.insert("loss".to_string(), loss);

    Ok(out)
}

/// Rebuild the configured model and load checkpoint weights into it
pub fn load_checkpoint<B: Backend>(
    config: &RunConfig,
    checkpoint: &Path,
    device: &B::Device,
) -> Result<LesionClassifier<B>> {
    // CompactRecorder stores the record with an .mpk extension.
    let stored = checkpoint.with_extension("mpk");
    if !stored.is_file() {
        return Err(MelanetError::Checkpoint(format!(
            "checkpoint not found: {}",
            stored.display()
        )));
    }

    let model_config = resolve_extractor(
        &config.train.extractor,
        config.train.num_classes,
        config.data.image_size,
    )?;
    let model = LesionClassifier::<B>::new(&model_config, device);

    model
        .load_file(checkpoint, &CompactRecorder::new(), device)
        .map_err(|e| {
            MelanetError::Checkpoint(format!("failed to load {}: {}", checkpoint.display(), e))
        })
}

/// Run a model over a dataset, returning the mean loss and a metric report
pub fn evaluate_dataset<B: Backend>(
    model: &LesionClassifier<B>,
    dataset: &LesionDataset,
    config: &RunConfig,
    criterion: &Criterion,
    device: &B::Device,
) -> Result<(f64, MetricReport)> {
    let batcher = LesionBatcher::new(config.data.image_size);
    let batch_size = config.data.batch_size;
    let len = dataset.len();

    let mut loss_sum = 0.0f64;
    let mut batches_seen = 0usize;
    let mut predictions = Vec::with_capacity(len);
    let mut ground_truth = Vec::with_capacity(len);

    for start in (0..len).step_by(batch_size) {
        let end = (start + batch_size).min(len);
        let items = (start..end)
            .map(|i| dataset.try_get(i))
            .collect::<Result<Vec<_>>>()?;

        let batch: LesionBatch<B> = batcher.batch(items, device);

        let output = model.forward(batch.images.clone());
        let loss = criterion.forward(output.clone(), batch.targets.clone(), device);

        loss_sum += loss.into_scalar().elem::<f64>();
        batches_seen += 1;

        accumulate_predictions(&output, &batch.targets, &mut predictions, &mut ground_truth)?;
    }

    if batches_seen == 0 {
        return Err(MelanetError::Inference(
            "test set produced no batches".into(),
        ));
    }

    let report =
        MetricReport::from_predictions(&predictions, &ground_truth, config.train.num_classes);
    Ok((loss_sum / batches_seen as f64, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    fn sample_config() -> RunConfig {
        let json = r#"{
            "data": {
                "data_csv_name": "dataset/train.csv",
                "data_path": "dataset/train",
                "batch_size": 8,
                "validation_ratio": 0.2,
                "test_csv_name": "dataset/test.csv"
            },
            "train": {
                "extractor": "lesnet_tiny",
                "metrics": ["f1_score", "accuracy"],
                "num_epoch": 1,
                "save_as_name": "model.ckpt",
                "lr_scheduler_factor": "min",
                "patience": 1,
                "reduce_lr_factor": 0.5
            },
            "optimizer": { "loss": "cross_entropy", "name": "adam", "lr": 0.001 },
            "session": { "sess_name": "test" }
        }"#;
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_missing_checkpoint_is_fatal() {
        let config = sample_config();
        let device = Default::default();

        let err =
            load_checkpoint::<NdArray>(&config, Path::new("/nonexistent/model.ckpt"), &device)
                .unwrap_err();

        match err {
            MelanetError::Checkpoint(msg) => assert!(msg.contains("/nonexistent/model.mpk")),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_checkpoint_round_trip() {
        let config = sample_config();
        let device = Default::default();
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = dir.path().join("model.ckpt");

        let model_config = resolve_extractor("lesnet_tiny", 2, 128).unwrap();
        let model = LesionClassifier::<NdArray>::new(&model_config, &device);
        model
            .save_file(&checkpoint, &CompactRecorder::new())
            .unwrap();

        let loaded = load_checkpoint::<NdArray>(&config, &checkpoint, &device);
        assert!(loaded.is_ok());
    }

    #[test]
    fn test_run_test_requires_checkpoint_before_data() {
        // The checkpoint check runs before any dataset access, so a bogus
        // test CSV path is not reached.
        let mut config = sample_config();
        config.data.test_csv_name = "/nonexistent/test.csv".to_string();

        let err = run_test::<NdArray>(&config, Path::new("/nonexistent/model.ckpt")).unwrap_err();
        assert!(matches!(err, MelanetError::Checkpoint(_)));
    }

    #[test]
    fn test_corrupt_test_image_aborts_evaluation() {
        use crate::dataset::ImageRecord;

        let config = sample_config();
        let device = Default::default();

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ISIC_0003.jpg"), b"truncated").unwrap();

        let records = vec![ImageRecord {
            image_name: "ISIC_0003".to_string(),
            target: 1,
        }];
        let dataset =
            LesionDataset::from_records(&records, dir.path(), config.data.image_size).unwrap();

        let model_config = resolve_extractor("lesnet_tiny", 2, config.data.image_size).unwrap();
        let model = LesionClassifier::<NdArray>::new(&model_config, &device);
        let criterion = Criterion::new(LossKind::CrossEntropy);

        let err = evaluate_dataset(&model, &dataset, &config, &criterion, &device).unwrap_err();
        match err {
            MelanetError::Dataset(msg) => assert!(msg.contains("ISIC_0003.jpg")),
            other => panic!("unexpected error: {}", other),
        }
    }
}
