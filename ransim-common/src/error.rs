//! Error types shared across the workspace

use thiserror::Error;

/// Workspace-level error type.
///
/// The protocol crates define their own codec errors; this type covers
/// the cross-cutting failures (I/O, configuration, truncated input) that
/// every layer can hit.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration loading or validation failure.
    #[error("config error: {0}")]
    Config(String),

    /// Network or file I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parse failure while loading configuration.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Input ended before the advertised length.
    #[error("truncated input: need {needed} more bytes, have {available}")]
    Truncated {
        /// Bytes the caller asked for.
        needed: usize,
        /// Bytes actually remaining.
        available: usize,
    },

    /// Generic protocol violation.
    #[error("protocol error: {0}")]
    Protocol(String),
}
