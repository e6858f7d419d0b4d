//! Error types for convo-cluster-core.
//!
//! This module defines the central error type [`CoreError`] used outside the
//! clustering algorithms (configuration, serialization), along with the
//! [`CoreResult<T>`] type alias. Algorithm failures are
//! [`ClusterError`](crate::clustering::ClusterError) and convert into
//! [`CoreError::Cluster`].
//!
//! # Examples
//!
//! ```rust
//! use convo_cluster_core::CoreError;
//!
//! fn check_window(min: usize, max: usize) -> Result<(), CoreError> {
//!     if min > max {
//!         return Err(CoreError::ValidationError {
//!             field: "consolidation.min_size".into(),
//!             message: format!("{} exceeds max_size {}", min, max),
//!         });
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_window(9, 8).is_err());
//! ```

use thiserror::Error;

use crate::clustering::ClusterError;

/// Top-level error type for convo-cluster-core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Configuration is invalid or missing.
    ///
    /// # When This Occurs
    ///
    /// - Configuration file cannot be read or parsed
    /// - Environment variable override has the wrong type
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A field value failed validation constraints.
    #[error("Validation error: {field} - {message}")]
    ValidationError {
        /// Dotted path of the field that failed validation
        field: String,
        /// Description of the validation failure
        message: String,
    },

    /// JSON or TOML (de)serialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A clustering algorithm rejected its input or parameters.
    #[error(transparent)]
    Cluster(#[from] ClusterError),
}

impl CoreError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::SerializationError(err.to_string())
    }
}

impl From<config::ConfigError> for CoreError {
    fn from(err: config::ConfigError) -> Self {
        CoreError::ConfigError(err.to_string())
    }
}

impl From<toml::de::Error> for CoreError {
    fn from(err: toml::de::Error) -> Self {
        CoreError::ConfigError(format!("Failed to parse config file: {}", err))
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
