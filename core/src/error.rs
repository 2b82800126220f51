//! Error types for engine-independent operations.
//!
//! Covers SQL text assembly and configuration loading. Engine failures live
//! in the `stmtwrap-sqlite` crate, which wraps this type.

use thiserror::Error;

/// Errors that can occur while building SQL text or loading configuration.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Assembled SQL text does not fit the builder's capacity.
    #[error("SQL text of {length} bytes exceeds builder capacity of {capacity} bytes")]
    BuilderOverflow {
        /// Length of the assembled statement, terminator included.
        length: usize,
        /// Configured capacity.
        capacity: usize,
    },

    /// A builder fragment cannot form a statement (e.g. an empty `SET` list).
    #[error("invalid SQL fragment: {0}")]
    InvalidFragment(String),

    /// Configuration values are out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

/// Convenience alias for results with [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;
