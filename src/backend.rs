//! Backend selection for the training pipeline.
//!
//! The backend is chosen at compile time via cargo features. The default
//! build runs on CPU through NdArray; enabling the `cuda` feature switches
//! the whole pipeline to the CUDA backend. Training always wraps the chosen
//! backend in `Autodiff`.

use burn::backend::Autodiff;

#[cfg(feature = "cuda")]
pub type DefaultBackend = burn::backend::Cuda;

#[cfg(not(feature = "cuda"))]
pub type DefaultBackend = burn::backend::NdArray;

/// Backend used for training (gradient tracking enabled)
pub type TrainingBackend = Autodiff<DefaultBackend>;

/// Default device for the selected backend
pub fn default_device() -> <DefaultBackend as burn::tensor::backend::Backend>::Device {
    Default::default()
}

/// Human-readable backend name for logging
pub fn backend_name() -> &'static str {
    #[cfg(feature = "cuda")]
    {
        "CUDA"
    }
    #[cfg(not(feature = "cuda"))]
    {
        "NdArray (CPU)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::Tensor;

    #[test]
    fn test_device_is_usable() {
        let device = default_device();
        let t = Tensor::<DefaultBackend, 1>::from_floats([1.0, 2.0, 3.0], &device);
        assert_eq!(t.dims(), [3]);
    }

    #[test]
    fn test_backend_name_nonempty() {
        assert!(!backend_name().is_empty());
    }
}
