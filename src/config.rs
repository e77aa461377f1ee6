//! Run Configuration Module
//!
//! Deserializes the JSON configuration file into nested sections
//! (`data`, `train`, `optimizer`, `session`). Missing or mistyped keys fail
//! at parse time; [`RunConfig::validate`] resolves every name-based setting
//! (loss, optimizer, extractor, scheduler mode, metric names) up front so an
//! unknown name aborts the run before any data is touched.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dataset::split::DEFAULT_SAMPLE_CAP;
use crate::model::resolve_extractor;
use crate::training::loss::LossKind;
use crate::training::optim::OptimizerKind;
use crate::training::scheduler::PlateauMode;
use crate::utils::error::{MelanetError, Result};
use crate::utils::metrics::validate_metric_names;

/// Top-level run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub data: DataConfig,
    pub train: TrainConfig,
    pub optimizer: OptimizerConfig,
    pub session: SessionConfig,
}

/// Dataset and dataloader settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Path to the training CSV index (columns: image_name, target)
    pub data_csv_name: String,
    /// Directory containing the training images
    pub data_path: String,
    /// Batch size for both training and evaluation loaders
    pub batch_size: usize,
    /// Fraction of the pool held out for validation, in (0, 1)
    pub validation_ratio: f64,
    /// Path to the test CSV index
    pub test_csv_name: String,
    /// Directory containing the test images (defaults to `data_path`)
    #[serde(default)]
    pub test_data_path: Option<String>,
    /// Fixed subsample size for the training pool
    #[serde(default = "default_sample_cap")]
    pub sample_cap: usize,
    /// Seed for shuffle/split reproducibility; unset means OS entropy
    #[serde(default)]
    pub seed: Option<u64>,
    /// Square image size fed to the model
    #[serde(default = "default_image_size")]
    pub image_size: usize,
}

impl DataConfig {
    /// Image directory for the test set
    pub fn test_data_path(&self) -> &str {
        self.test_data_path.as_deref().unwrap_or(&self.data_path)
    }
}

/// Training loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Architecture name, resolved against the extractor registry
    pub extractor: String,
    /// Metric names tracked each epoch (must include "f1_score" for
    /// checkpoint selection)
    pub metrics: Vec<String>,
    /// Number of training epochs; the loop always runs all of them
    pub num_epoch: usize,
    /// Checkpoint file name suffix; the artifact is
    /// `saved/models/<timestamp>-<save_as_name>`
    pub save_as_name: String,
    /// Plateau scheduler mode ("min" or "max"). The key name is kept from the
    /// original config format for compatibility.
    #[serde(rename = "lr_scheduler_factor")]
    pub scheduler_mode: String,
    /// Epochs without improvement before the LR is reduced
    pub patience: usize,
    /// Multiplicative LR reduction factor, in (0, 1)
    pub reduce_lr_factor: f64,
    /// Number of output classes
    #[serde(default = "default_num_classes")]
    pub num_classes: usize,
}

/// Loss/optimizer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Loss name, resolved against the loss registry
    pub loss: String,
    /// Optimizer name, resolved against the optimizer registry
    pub name: String,
    /// Initial learning rate
    pub lr: f64,
}

/// Session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session name, used for the per-run log file
    pub sess_name: String,
}

fn default_sample_cap() -> usize {
    DEFAULT_SAMPLE_CAP
}

fn default_image_size() -> usize {
    128
}

fn default_num_classes() -> usize {
    2
}

impl RunConfig {
    /// Load and validate a configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            MelanetError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Fail fast on out-of-range values and unknown registry names
    pub fn validate(&self) -> Result<()> {
        if self.data.batch_size == 0 {
            return Err(MelanetError::Config("batch_size must be positive".into()));
        }
        if !(self.data.validation_ratio > 0.0 && self.data.validation_ratio < 1.0) {
            return Err(MelanetError::Config(format!(
                "validation_ratio must be in (0, 1), got {}",
                self.data.validation_ratio
            )));
        }
        if self.data.sample_cap == 0 {
            return Err(MelanetError::Config("sample_cap must be positive".into()));
        }
        if self.train.num_epoch == 0 {
            return Err(MelanetError::Config("num_epoch must be positive".into()));
        }
        if self.train.num_classes < 2 {
            return Err(MelanetError::Config(format!(
                "num_classes must be at least 2, got {}",
                self.train.num_classes
            )));
        }
        if !(self.optimizer.lr > 0.0) {
            return Err(MelanetError::Config(format!(
                "lr must be positive, got {}",
                self.optimizer.lr
            )));
        }
        if !(self.train.reduce_lr_factor > 0.0 && self.train.reduce_lr_factor < 1.0) {
            return Err(MelanetError::Config(format!(
                "reduce_lr_factor must be in (0, 1), got {}",
                self.train.reduce_lr_factor
            )));
        }

        // Resolve every name-based setting so unknown names fail at startup.
        LossKind::resolve(&self.optimizer.loss)?;
        OptimizerKind::resolve(&self.optimizer.name)?;
        PlateauMode::resolve(&self.train.scheduler_mode)?;
        resolve_extractor(
            &self.train.extractor,
            self.train.num_classes,
            self.data.image_size,
        )?;
        validate_metric_names(&self.train.metrics)?;

        if !self.train.metrics.iter().any(|m| m == "f1_score") {
            return Err(MelanetError::Config(
                "train.metrics must include \"f1_score\" (used for checkpoint selection)".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_json() -> String {
        r#"{
            "data": {
                "data_csv_name": "dataset/train.csv",
                "data_path": "dataset/train",
                "batch_size": 64,
                "validation_ratio": 0.2,
                "test_csv_name": "dataset/test.csv",
                "sample_cap": 25000,
                "seed": 42
            },
            "train": {
                "extractor": "lesnet",
                "metrics": ["f1_score", "accuracy"],
                "num_epoch": 5,
                "save_as_name": "melanet.ckpt",
                "lr_scheduler_factor": "min",
                "patience": 2,
                "reduce_lr_factor": 0.5
            },
            "optimizer": {
                "loss": "focal",
                "name": "adam",
                "lr": 0.001
            },
            "session": {
                "sess_name": "tenes"
            }
        }"#
        .to_string()
    }

    #[test]
    fn test_parse_and_validate() {
        let config: RunConfig = serde_json::from_str(&sample_json()).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.data.sample_cap, 25000);
        assert_eq!(config.data.image_size, 128); // default
        assert_eq!(config.train.num_classes, 2); // default
        assert_eq!(config.train.scheduler_mode, "min");
        assert_eq!(config.data.test_data_path(), "dataset/train");
    }

    #[test]
    fn test_missing_key_fails() {
        let json = sample_json().replace("\"batch_size\": 64,", "");
        let result: std::result::Result<RunConfig, _> = serde_json::from_str(&json);
        assert!(result.is_err());
    }

    #[test]
    fn test_mistyped_key_fails() {
        let json = sample_json().replace("\"batch_size\": 64", "\"batch_size\": \"64\"");
        let result: std::result::Result<RunConfig, _> = serde_json::from_str(&json);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_optimizer_is_fatal() {
        let json = sample_json().replace("\"name\": \"adam\"", "\"name\": \"Adamm\"");
        let config: RunConfig = serde_json::from_str(&json).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, MelanetError::Config(_)));
        assert!(format!("{}", err).contains("Adamm"));
    }

    #[test]
    fn test_unknown_loss_is_fatal() {
        let json = sample_json().replace("\"loss\": \"focal\"", "\"loss\": \"hinge\"");
        let config: RunConfig = serde_json::from_str(&json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_validation_ratio() {
        let json = sample_json().replace("\"validation_ratio\": 0.2", "\"validation_ratio\": 1.5");
        let config: RunConfig = serde_json::from_str(&json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_metrics_must_include_f1() {
        let json = sample_json().replace(
            "\"metrics\": [\"f1_score\", \"accuracy\"]",
            "\"metrics\": [\"accuracy\"]",
        );
        let config: RunConfig = serde_json::from_str(&json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(sample_json().as_bytes()).unwrap();

        let config = RunConfig::load(file.path()).unwrap();
        assert_eq!(config.session.sess_name, "tenes");
    }
}
