//! Model architectures and the extractor registry.
//!
//! The configuration selects a model by name; `resolve_extractor` maps that
//! name to a concrete [`LesionClassifierConfig`] preset. Unknown names are a
//! configuration error, surfaced at startup rather than mid-run.

pub mod cnn;

pub use cnn::{ConvBlock, LesionClassifier, LesionClassifierConfig};

use crate::utils::error::{MelanetError, Result};

/// Extractor names accepted in `train.extractor`
pub const SUPPORTED_EXTRACTORS: [&str; 3] = ["lesnet_tiny", "lesnet", "lesnet_wide"];

/// Resolve an extractor name to a model configuration preset
pub fn resolve_extractor(
    name: &str,
    num_classes: usize,
    input_size: usize,
) -> Result<LesionClassifierConfig> {
    let config = match name {
        "lesnet_tiny" => LesionClassifierConfig::new()
            .with_conv_filters(vec![16, 32, 64])
            .with_fc_units(128),
        "lesnet" => LesionClassifierConfig::new(),
        "lesnet_wide" => LesionClassifierConfig::new()
            .with_conv_filters(vec![64, 128, 256, 512])
            .with_fc_units(512),
        _ => {
            return Err(MelanetError::Config(format!(
                "unknown extractor '{}' (supported: {})",
                name,
                SUPPORTED_EXTRACTORS.join(", ")
            )))
        }
    };

    Ok(config
        .with_num_classes(num_classes)
        .with_input_size(input_size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_extractors() {
        for name in SUPPORTED_EXTRACTORS {
            let config = resolve_extractor(name, 2, 128).unwrap();
            assert_eq!(config.num_classes, 2);
            assert_eq!(config.input_size, 128);
        }
    }

    #[test]
    fn test_presets_differ() {
        let tiny = resolve_extractor("lesnet_tiny", 2, 128).unwrap();
        let wide = resolve_extractor("lesnet_wide", 2, 128).unwrap();
        assert_ne!(tiny.conv_filters, wide.conv_filters);
    }

    #[test]
    fn test_unknown_extractor_is_fatal() {
        let err = resolve_extractor("resnet50", 2, 128).unwrap_err();
        assert!(format!("{}", err).contains("resnet50"));
    }
}
