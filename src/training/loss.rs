//! Loss functions and the loss registry.
//!
//! The configuration names the loss to use; `LossKind::resolve` maps the
//! accepted names to a variant and unknown names fail at startup. Focal loss
//! with gamma = 0 reduces to cross-entropy.

use burn::nn::loss::CrossEntropyLossConfig;
use burn::prelude::*;
use burn::tensor::activation::log_softmax;

use crate::utils::error::{MelanetError, Result};

/// Default focusing parameter for the focal loss
pub const DEFAULT_FOCAL_GAMMA: f64 = 2.0;

/// Loss function selected by configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LossKind {
    CrossEntropy,
    Focal { gamma: f64 },
}

impl LossKind {
    /// Resolve a configured loss name; unknown names are fatal
    pub fn resolve(name: &str) -> Result<Self> {
        match name {
            "cross_entropy" | "CrossEntropyLoss" => Ok(Self::CrossEntropy),
            "focal" | "FocalLoss" => Ok(Self::Focal {
                gamma: DEFAULT_FOCAL_GAMMA,
            }),
            _ => Err(MelanetError::Config(format!(
                "unknown loss '{}' (supported: cross_entropy, focal)",
                name
            ))),
        }
    }
}

/// Criterion computing the configured loss from logits and targets
#[derive(Debug, Clone)]
pub struct Criterion {
    kind: LossKind,
}

impl Criterion {
    pub fn new(kind: LossKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> LossKind {
        self.kind
    }

    /// Compute the mean loss over a batch.
    ///
    /// `logits` has shape [batch_size, num_classes], `targets` shape
    /// [batch_size].
    pub fn forward<B: Backend>(
        &self,
        logits: Tensor<B, 2>,
        targets: Tensor<B, 1, Int>,
        device: &B::Device,
    ) -> Tensor<B, 1> {
        match self.kind {
            LossKind::CrossEntropy => CrossEntropyLossConfig::new()
                .init(device)
                .forward(logits, targets),
            LossKind::Focal { gamma } => focal_loss(logits, targets, gamma),
        }
    }
}

/// Focal loss: mean of `-(1 - p_t)^gamma * log(p_t)` over the batch.
///
/// `p_t` is the predicted probability of the true class. Down-weights easy
/// examples, which matters for the heavy class imbalance of lesion data.
pub fn focal_loss<B: Backend>(
    logits: Tensor<B, 2>,
    targets: Tensor<B, 1, Int>,
    gamma: f64,
) -> Tensor<B, 1> {
    let [batch_size, _num_classes] = logits.dims();

    let log_probs = log_softmax(logits, 1);

    // Gather log p_t for each sample: [B, C] -> [B, 1] -> [B]
    let indices = targets.reshape([batch_size, 1]);
    let log_pt = log_probs.gather(1, indices).reshape([batch_size]);
    let pt = log_pt.clone().exp();

    let focal_weight = (pt.neg() + 1.0).powf_scalar(gamma as f32);
    let loss = focal_weight * log_pt.neg();

    loss.mean()
}
