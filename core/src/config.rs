//! Connection configuration.
//!
//! Controls busy-retry behavior, SQL builder capacity, and how the database
//! file is opened. Serializable to YAML so the CLI and embedding programs
//! can keep it in a file.
//!
//! # Example YAML
//!
//! ```yaml
//! busy_retry:
//!   max_attempts: 16
//!   backoff_ms: 250
//! builder_capacity: 1024
//! read_only: false
//! create: true
//! ```
//!
//! Every field is optional; missing fields take their defaults.

use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::builder::{DEFAULT_BUILDER_CAPACITY, SqlBuilder};
use crate::error::{CoreError, Result};
use crate::retry::RetryPolicy;

/// Settings applied when opening a connection.
///
/// # Examples
///
/// ```
/// use stmtwrap_core::ConnectionConfig;
///
/// let config: ConnectionConfig = serde_yaml::from_str("read_only: true").unwrap();
/// assert!(config.read_only);
/// assert_eq!(config.busy_retry.max_attempts, 16);
/// assert_eq!(config.builder_capacity, 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Retry settings for busy steps.
    pub busy_retry: RetryPolicy,
    /// Maximum length of builder-generated statements, in bytes.
    pub builder_capacity: usize,
    /// Open the database read-only.
    pub read_only: bool,
    /// Create the database file if it does not exist (ignored when read-only).
    pub create: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            busy_retry: RetryPolicy::default(),
            builder_capacity: DEFAULT_BUILDER_CAPACITY,
            read_only: false,
            create: true,
        }
    }
}

impl ConnectionConfig {
    /// Loads configuration from a YAML file and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](CoreError::IoError) if the file cannot be read,
    /// [`YamlError`](CoreError::YamlError) if parsing fails, or
    /// [`InvalidConfig`](CoreError::InvalidConfig) if a value is out of range.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config: Self = serde_yaml::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](CoreError::IoError) if the file cannot be
    /// written, or [`YamlError`](CoreError::YamlError) if serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidConfig`] for zero retry attempts or zero builder
    /// capacity.
    pub fn validate(&self) -> Result<()> {
        if self.busy_retry.max_attempts == 0 {
            return Err(CoreError::InvalidConfig(
                "busy_retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.builder_capacity == 0 {
            return Err(CoreError::InvalidConfig(
                "builder_capacity must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns a builder using this configuration's capacity.
    pub fn sql_builder(&self) -> SqlBuilder {
        SqlBuilder::new(self.builder_capacity)
    }

    /// Replaces the busy-retry policy.
    pub fn with_busy_retry(mut self, policy: RetryPolicy) -> Self {
        self.busy_retry = policy;
        self
    }

    /// Replaces the builder capacity.
    pub fn with_builder_capacity(mut self, capacity: usize) -> Self {
        self.builder_capacity = capacity;
        self
    }

    /// Sets read-only mode.
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
}
