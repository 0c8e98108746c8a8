//! Error types for apicat.

use std::io;

use thiserror::Error;

/// Error type for apicat operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid catalog magic bytes
    #[error("invalid magic bytes: expected APICATFB header")]
    InvalidMagic,

    /// Unsupported catalog format version
    #[error("unsupported format version: {0}")]
    UnsupportedVersion(i32),

    /// Stream ended before a complete section could be read
    #[error("catalog truncated while reading {section}")]
    Truncated { section: &'static str },

    /// Header declares a table count this build does not understand
    #[error("invalid table count: expected {expected}, got {actual}")]
    InvalidTableCount { expected: usize, actual: i32 },

    /// A declared table length is negative
    #[error("invalid length {length} for table {table}")]
    InvalidTableLength { table: &'static str, length: i32 },

    /// Compressed table stream is corrupt or shorter than declared
    #[error("failed to inflate table stream: {0}")]
    Decompress(#[source] io::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed identifier text
    #[error("invalid guid: {0}")]
    InvalidGuid(String),

    /// Manifest refers to something it never defined
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),
}

impl Error {
    /// Whether this error means the input is not a loadable catalog.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidMagic
                | Error::UnsupportedVersion(_)
                | Error::Truncated { .. }
                | Error::InvalidTableCount { .. }
                | Error::InvalidTableLength { .. }
                | Error::Decompress(_)
        )
    }
}

/// Result type alias for apicat operations.
pub type Result<T> = std::result::Result<T, Error>;
