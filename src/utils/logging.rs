//! Logging Module
//!
//! Structured logging utilities using the `tracing` crate. The subscriber is
//! configured explicitly from a [`LogConfig`] at run start; training runs log
//! to a per-run file derived from the session name and run timestamp.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::utils::error::Result;

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level to display
    pub level: LogLevel,
    /// Whether to include target (module path)
    pub include_target: bool,
    /// Whether to use ANSI colors (forced off for file output)
    pub ansi_colors: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            include_target: false,
            ansi_colors: true,
        }
    }
}

impl LogConfig {
    /// Verbose configuration for debugging
    pub fn verbose() -> Self {
        Self {
            level: LogLevel::Debug,
            include_target: true,
            ansi_colors: true,
        }
    }
}

/// Log level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Convert to tracing Level
    pub fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

/// Path of the per-run log file: `logs/<sess_name>-<timestamp>.log`
pub fn log_file_path(sess_name: &str, timestamp: &str) -> PathBuf {
    PathBuf::from("logs").join(format!("{}-{}.log", sess_name, timestamp))
}

/// Initialize console logging with the given configuration.
///
/// Returns an error string if a global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> std::result::Result<(), String> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.level.to_tracing_level())
        .with_ansi(config.ansi_colors)
        .with_target(config.include_target)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| format!("Failed to initialize logging: {}", e))
}

/// Initialize logging to a per-run file.
///
/// Creates the parent directory if needed. ANSI colors are disabled for the
/// file writer.
pub fn init_file_logging(config: &LogConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.level.to_tracing_level())
        .with_ansi(false)
        .with_target(config.include_target)
        .with_writer(Mutex::new(file))
        .compact()
        .finish();

    // A second init in the same process (e.g. under `cargo test`) is benign.
    let _ = tracing::subscriber::set_global_default(subscriber);

    Ok(())
}
