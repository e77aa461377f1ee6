//! CNN Architecture for Lesion Classification
//!
//! A compact convolutional network built from Conv/BatchNorm/ReLU/MaxPool
//! blocks with global average pooling and a dropout-regularized classifier
//! head. The filter schedule is driven by configuration so the extractor
//! registry can expose multiple presets of the same architecture.

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d,
        Relu,
    },
    tensor::{backend::Backend, Tensor},
};

/// Configuration for the lesion classifier CNN
#[derive(Config, Debug)]
pub struct LesionClassifierConfig {
    /// Number of output classes
    #[config(default = "2")]
    pub num_classes: usize,

    /// Input image size (assumes square images)
    #[config(default = "128")]
    pub input_size: usize,

    /// Number of input channels (3 for RGB)
    #[config(default = "3")]
    pub in_channels: usize,

    /// Output channels of each convolutional block; each block halves the
    /// spatial resolution
    #[config(default = "vec![32, 64, 128, 256]")]
    pub conv_filters: Vec<usize>,

    /// Dropout rate in the classifier head
    #[config(default = "0.3")]
    pub dropout_rate: f64,

    /// Hidden units of the classifier head
    #[config(default = "256")]
    pub fc_units: usize,
}

/// A CNN block with Conv2d, BatchNorm, ReLU, and MaxPool
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub conv: Conv2d<B>,
    pub bn: BatchNorm<B>,
    pub relu: Relu,
    pub pool: MaxPool2d,
}

impl<B: Backend> ConvBlock<B> {
    /// Create a new convolutional block
    pub fn new(in_channels: usize, out_channels: usize, device: &B::Device) -> Self {
        let conv = Conv2dConfig::new([in_channels, out_channels], [3, 3])
            .with_padding(PaddingConfig2d::Same)
            .init(device);

        let bn = BatchNormConfig::new(out_channels).init(device);
        let pool = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();

        Self {
            conv,
            bn,
            relu: Relu::new(),
            pool,
        }
    }

    /// Forward pass through the block
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.bn.forward(x);
        let x = self.relu.forward(x);
        self.pool.forward(x)
    }
}

/// Lesion Classifier CNN
///
/// Architecture:
/// - Configurable stack of convolutional blocks, each halving resolution
/// - Global average pooling
/// - Fully connected classifier with dropout
#[derive(Module, Debug)]
pub struct LesionClassifier<B: Backend> {
    pub blocks: Vec<ConvBlock<B>>,
    pub global_pool: AdaptiveAvgPool2d,
    pub fc1: Linear<B>,
    pub dropout: Dropout,
    pub fc2: Linear<B>,

    num_classes: usize,
}

impl<B: Backend> LesionClassifier<B> {
    /// Create a new classifier from configuration
    pub fn new(config: &LesionClassifierConfig, device: &B::Device) -> Self {
        let mut blocks = Vec::with_capacity(config.conv_filters.len());
        let mut in_channels = config.in_channels;
        for &out_channels in &config.conv_filters {
            blocks.push(ConvBlock::new(in_channels, out_channels, device));
            in_channels = out_channels;
        }

        let global_pool = AdaptiveAvgPool2dConfig::new([1, 1]).init();

        let fc1 = LinearConfig::new(in_channels, config.fc_units).init(device);
        let dropout = DropoutConfig::new(config.dropout_rate).init();
        let fc2 = LinearConfig::new(config.fc_units, config.num_classes).init(device);

        Self {
            blocks,
            global_pool,
            fc1,
            dropout,
            fc2,
            num_classes: config.num_classes,
        }
    }

    /// Forward pass through the network.
    ///
    /// Input shape [batch_size, 3, height, width], output logits of shape
    /// [batch_size, num_classes].
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = x;
        for block in &self.blocks {
            x = block.forward(x);
        }

        // [B, C, H, W] -> [B, C, 1, 1] -> [B, C]
        let x = self.global_pool.forward(x);
        let [batch_size, channels, _, _] = x.dims();
        let x = x.reshape([batch_size, channels]);

        let x = self.fc1.forward(x);
        let x = Relu::new().forward(x);
        let x = self.dropout.forward(x);
        self.fc2.forward(x)
    }

    /// Forward pass with softmax for inference
    pub fn forward_softmax(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let logits = self.forward(x);
        burn::tensor::activation::softmax(logits, 1)
    }

    /// Get the number of output classes
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_classifier_output_shape() {
        let device = Default::default();
        let config = LesionClassifierConfig::new();
        let model = LesionClassifier::<TestBackend>::new(&config, &device);

        let input = Tensor::<TestBackend, 4>::zeros([2, 3, 128, 128], &device);
        let output = model.forward(input);

        assert_eq!(output.dims(), [2, 2]);
    }

    #[test]
    fn test_custom_filter_schedule() {
        let device = Default::default();
        let config = LesionClassifierConfig::new()
            .with_conv_filters(vec![16, 32])
            .with_num_classes(4)
            .with_fc_units(64);
        let model = LesionClassifier::<TestBackend>::new(&config, &device);

        let input = Tensor::<TestBackend, 4>::zeros([1, 3, 64, 64], &device);
        let output = model.forward(input);

        assert_eq!(output.dims(), [1, 4]);
        assert_eq!(model.num_classes(), 4);
    }

    #[test]
    fn test_softmax_rows_sum_to_one() {
        let device = Default::default();
        let config = LesionClassifierConfig::new().with_conv_filters(vec![8]);
        let model = LesionClassifier::<TestBackend>::new(&config, &device);

        let input = Tensor::<TestBackend, 4>::ones([1, 3, 32, 32], &device);
        let probs = model.forward_softmax(input);
        let sum = probs.sum().into_data().to_vec::<f32>().unwrap()[0];

        assert!((sum - 1.0).abs() < 1e-4);
    }
}
