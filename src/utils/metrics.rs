//! Metrics Module for Model Evaluation
//!
//! Provides the metrics tracked per epoch and on the test set:
//! - Accuracy
//! - Macro-averaged precision, recall, F1-score
//! - Confusion matrix
//!
//! Metric names requested in the configuration are validated against
//! [`SUPPORTED_METRICS`] at startup so typos fail before training starts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::utils::error::{MelanetError, Result};

/// Metric names that can appear in `train.metrics`
pub const SUPPORTED_METRICS: [&str; 4] = ["accuracy", "precision", "recall", "f1_score"];

/// Validate a list of configured metric names against the supported set
pub fn validate_metric_names(names: &[String]) -> Result<()> {
    for name in names {
        if !SUPPORTED_METRICS.contains(&name.as_str()) {
            return Err(MelanetError::Config(format!(
                "unknown metric '{}' (supported: {})",
                name,
                SUPPORTED_METRICS.join(", ")
            )));
        }
    }
    Ok(())
}

/// Evaluation report computed from accumulated predictions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricReport {
    /// Total number of samples evaluated
    pub total_samples: usize,

    /// Overall accuracy (correct / total)
    pub accuracy: f64,

    /// Macro-averaged precision (average of per-class precisions)
    pub macro_precision: f64,

    /// Macro-averaged recall
    pub macro_recall: f64,

    /// Macro-averaged F1-score
    pub macro_f1: f64,

    /// Confusion matrix backing the per-class numbers
    pub confusion_matrix: ConfusionMatrix,
}

impl MetricReport {
    /// Compute a report from predictions and ground truth labels
    pub fn from_predictions(
        predictions: &[usize],
        ground_truth: &[usize],
        num_classes: usize,
    ) -> Self {
        assert_eq!(
            predictions.len(),
            ground_truth.len(),
            "predictions and ground truth must have the same length"
        );

        let total_samples = predictions.len();
        let confusion_matrix =
            ConfusionMatrix::from_predictions(predictions, ground_truth, num_classes);

        if total_samples == 0 {
            return Self {
                total_samples: 0,
                accuracy: 0.0,
                macro_precision: 0.0,
                macro_recall: 0.0,
                macro_f1: 0.0,
                confusion_matrix,
            };
        }

        let accuracy = confusion_matrix.accuracy();

        let per_class: Vec<ClassMetrics> = (0..num_classes)
            .map(|class_idx| ClassMetrics::from_confusion_matrix(&confusion_matrix, class_idx))
            .collect();

        // Macro averages over classes that actually occur
        let represented: Vec<&ClassMetrics> =
            per_class.iter().filter(|m| m.support > 0).collect();
        let n = represented.len() as f64;

        let (macro_precision, macro_recall, macro_f1) = if n > 0.0 {
            (
                represented.iter().map(|m| m.precision).sum::<f64>() / n,
                represented.iter().map(|m| m.recall).sum::<f64>() / n,
                represented.iter().map(|m| m.f1).sum::<f64>() / n,
            )
        } else {
            (0.0, 0.0, 0.0)
        };

        Self {
            total_samples,
            accuracy,
            macro_precision,
            macro_recall,
            macro_f1,
            confusion_matrix,
        }
    }

    /// Project the report into a name -> value map for the requested metrics.
    ///
    /// Names must have passed [`validate_metric_names`]; unknown names are
    /// silently skipped here since validation happens at startup.
    pub fn select(&self, names: &[String]) -> BTreeMap<String, f64> {
        let mut out = BTreeMap::new();
        for name in names {
            let value = match name.as_str() {
                "accuracy" => self.accuracy,
                "precision" => self.macro_precision,
                "recall" => self.macro_recall,
                "f1_score" => self.macro_f1,
                _ => continue,
            };
            out.insert(name.clone(), value);
        }
        out
    }
}

/// Per-class metrics derived from the confusion matrix
#[derive(Debug, Clone, Default)]
pub struct ClassMetrics {
    pub class_idx: usize,
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Number of actual samples of this class
    pub support: usize,
}

impl ClassMetrics {
    /// Calculate metrics for one class from the confusion matrix
    pub fn from_confusion_matrix(cm: &ConfusionMatrix, class_idx: usize) -> Self {
        let true_positives = cm.get(class_idx, class_idx);

        // Predicted as this class but actually another
        let false_positives: usize = (0..cm.num_classes)
            .filter(|&i| i != class_idx)
            .map(|i| cm.get(i, class_idx))
            .sum();

        // Actually this class but predicted as another
        let false_negatives: usize = (0..cm.num_classes)
            .filter(|&i| i != class_idx)
            .map(|i| cm.get(class_idx, i))
            .sum();

        let support = true_positives + false_negatives;

        let precision = if true_positives + false_positives > 0 {
            true_positives as f64 / (true_positives + false_positives) as f64
        } else {
            0.0
        };

        let recall = if support > 0 {
            true_positives as f64 / support as f64
        } else {
            0.0
        };

        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            class_idx,
            true_positives,
            false_positives,
            false_negatives,
            precision,
            recall,
            f1,
            support,
        }
    }
}

/// Confusion Matrix for multi-class classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// Number of classes
    pub num_classes: usize,

    /// Matrix data (row = actual, column = predicted), row-major
    pub matrix: Vec<usize>,
}

impl ConfusionMatrix {
    /// Create a new empty confusion matrix
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            matrix: vec![0; num_classes * num_classes],
        }
    }

    /// Create a confusion matrix from predictions and ground truth
    pub fn from_predictions(
        predictions: &[usize],
        ground_truth: &[usize],
        num_classes: usize,
    ) -> Self {
        let mut cm = Self::new(num_classes);
        for (&pred, &actual) in predictions.iter().zip(ground_truth.iter()) {
            cm.add(actual, pred);
        }
        cm
    }

    /// Add a single prediction to the matrix
    pub fn add(&mut self, actual: usize, predicted: usize) {
        if actual < self.num_classes && predicted < self.num_classes {
            self.matrix[actual * self.num_classes + predicted] += 1;
        }
    }

    /// Get the count at (actual, predicted)
    pub fn get(&self, actual: usize, predicted: usize) -> usize {
        if actual < self.num_classes && predicted < self.num_classes {
            self.matrix[actual * self.num_classes + predicted]
        } else {
            0
        }
    }

    /// Total number of recorded predictions
    pub fn total(&self) -> usize {
        self.matrix.iter().sum()
    }

    /// Number of correct predictions (diagonal sum)
    pub fn correct(&self) -> usize {
        (0..self.num_classes).map(|i| self.get(i, i)).sum()
    }

    /// Overall accuracy
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total > 0 {
            self.correct() as f64 / total as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confusion_matrix() {
        let predictions = vec![0, 1, 2, 0, 1, 2, 0, 0, 2, 2];
        let ground_truth = vec![0, 1, 2, 0, 2, 2, 1, 0, 1, 2];

        let cm = ConfusionMatrix::from_predictions(&predictions, &ground_truth, 3);

        assert_eq!(cm.get(0, 0), 3);
        assert_eq!(cm.get(1, 1), 1);
        assert_eq!(cm.get(2, 2), 3);
        assert_eq!(cm.total(), 10);
        assert_eq!(cm.correct(), 7);
        assert!((cm.accuracy() - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_report_from_predictions() {
        let predictions = vec![0, 1, 2, 0, 1, 2, 0, 0, 2, 2];
        let ground_truth = vec![0, 1, 2, 0, 2, 2, 1, 0, 1, 2];

        let report = MetricReport::from_predictions(&predictions, &ground_truth, 3);

        assert_eq!(report.total_samples, 10);
        assert!((report.accuracy - 0.7).abs() < 1e-9);
        assert!(report.macro_f1 > 0.0 && report.macro_f1 < 1.0);
    }

    #[test]
    fn test_class_metrics() {
        let predictions = vec![0, 0, 0, 1, 1];
        let ground_truth = vec![0, 0, 1, 1, 0];

        let cm = ConfusionMatrix::from_predictions(&predictions, &ground_truth, 2);
        let class0 = ClassMetrics::from_confusion_matrix(&cm, 0);

        assert_eq!(class0.true_positives, 2);
        assert_eq!(class0.false_positives, 1);
        assert_eq!(class0.false_negatives, 1);
        assert!((class0.precision - 2.0 / 3.0).abs() < 1e-9);
        assert!((class0.recall - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_perfect_binary_f1() {
        let predictions = vec![0, 1, 0, 1];
        let ground_truth = vec![0, 1, 0, 1];

        let report = MetricReport::from_predictions(&predictions, &ground_truth, 2);
        assert!((report.macro_f1 - 1.0).abs() < 1e-9);
        assert!((report.accuracy - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_select_projects_requested_names() {
        let report = MetricReport::from_predictions(&[0, 1], &[0, 1], 2);
        let names = vec!["f1_score".to_string(), "accuracy".to_string()];
        let map = report.select(&names);

        assert_eq!(map.len(), 2);
        assert!((map["f1_score"] - 1.0).abs() < 1e-9);
        assert!((map["accuracy"] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_validate_metric_names() {
        let good = vec!["f1_score".to_string(), "recall".to_string()];
        assert!(validate_metric_names(&good).is_ok());

        let bad = vec!["f1".to_string()];
        assert!(validate_metric_names(&bad).is_err());
    }

    #[test]
    fn test_empty_report() {
        let report = MetricReport::from_predictions(&[], &[], 2);
        assert_eq!(report.total_samples, 0);
        assert_eq!(report.accuracy, 0.0);
    }
}
