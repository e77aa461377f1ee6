//! Optimizer registry.
//!
//! The configuration selects an optimizer by name. Unknown names are a
//! configuration error at startup, not a silent fallback.

use crate::utils::error::{MelanetError, Result};

/// Optimizer names accepted in `optimizer.name`
pub const SUPPORTED_OPTIMIZERS: [&str; 3] = ["adam", "adamw", "sgd"];

/// Optimizer selected by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizerKind {
    Adam,
    AdamW,
    Sgd,
}

impl OptimizerKind {
    /// Resolve a configured optimizer name; unknown names are fatal
    pub fn resolve(name: &str) -> Result<Self> {
        match name {
            "adam" | "Adam" => Ok(Self::Adam),
            "adamw" | "AdamW" => Ok(Self::AdamW),
            "sgd" | "SGD" => Ok(Self::Sgd),
            _ => Err(MelanetError::Config(format!(
                "unknown optimizer '{}' (supported: {})",
                name,
                SUPPORTED_OPTIMIZERS.join(", ")
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_names() {
        assert_eq!(OptimizerKind::resolve("adam").unwrap(), OptimizerKind::Adam);
        assert_eq!(OptimizerKind::resolve("Adam").unwrap(), OptimizerKind::Adam);
        assert_eq!(
            OptimizerKind::resolve("adamw").unwrap(),
            OptimizerKind::AdamW
        );
        assert_eq!(OptimizerKind::resolve("sgd").unwrap(), OptimizerKind::Sgd);
    }

    #[test]
    fn test_typo_is_fatal() {
        let err = OptimizerKind::resolve("Adamm").unwrap_err();
        assert!(matches!(err, MelanetError::Config(_)));
        assert!(format!("{}", err).contains("Adamm"));
    }
}
