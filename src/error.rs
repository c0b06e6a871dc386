// src/error.rs

use thiserror::Error;

/// Core error types for pacmeta
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors (cache checksum reads, manifest I/O)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Repository handle construction error
    #[error("Failed to initialize repository view: {0}")]
    InitError(String),

    /// Malformed metalink document
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Metalink serialization error
    #[error("Failed to write metalink document: {0}")]
    WriteError(String),
}

/// Result type alias using pacmeta's Error type
pub type Result<T> = std::result::Result<T, Error>;
