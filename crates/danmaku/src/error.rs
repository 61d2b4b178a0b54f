//! Danmaku error types.
//!
//! Engine operations never return these; they surface only from configuration
//! validation and comment sources, which the engine logs and swallows.

use thiserror::Error;

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, DanmakuError>;

/// Errors that can occur while configuring the overlay or loading comments.
#[derive(Error, Debug)]
pub enum DanmakuError {
    /// Invalid overlay or feed configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed danmu XML
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::DeError),

    /// A comment source could not resolve the requested identifier
    #[error("Source error: {0}")]
    Source(String),
}

impl DanmakuError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a source error.
    pub fn source_error(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }
}
