//! Error Handling Module
//!
//! Defines the error types for the melanet training pipeline.
//! Uses thiserror for ergonomic error definitions.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for melanet operations
#[derive(Error, Debug)]
pub enum MelanetError {
    /// Configuration error (missing/malformed keys, unknown registry names)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error with dataset operations
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// An image referenced by the CSV index does not exist on disk
    #[error("Image file not found: {0}")]
    MissingImage(PathBuf),

    /// CSV parse/deserialize error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Error with training
    #[error("Training error: {0}")]
    Training(String),

    /// Checkpoint save/load error
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// Error with inference
    #[error("Inference error: {0}")]
    Inference(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type for melanet operations
pub type Result<T> = std::result::Result<T, MelanetError>;
