//! Error types for clustering operations.

use thiserror::Error;

/// Errors raised by the clustering algorithms.
///
/// These are algorithm-level failures (bad configuration, malformed vectors,
/// oversized batches). The engine turns them into `errors` entries on the
/// [`ClusteringResult`](crate::types::ClusteringResult) instead of panicking.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClusterError {
    /// A configuration parameter is outside its valid range.
    #[error("Invalid parameter: {message}")]
    InvalidParameter {
        /// What was wrong
        message: String,
    },

    /// Embedding dimensions disagree within one batch.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension of the first embedding in the batch
        expected: usize,
        /// Offending dimension
        actual: usize,
    },

    /// An embedding contains NaN or Infinity.
    #[error("Non-finite value in embedding for conversation '{conversation_id}' at index {index}")]
    NonFiniteValue {
        conversation_id: String,
        index: usize,
    },

    /// The batch exceeds the configured bound for the O(N^2) distance matrix.
    #[error("Batch of {actual} conversations exceeds max_batch_size {limit}; split the batch upstream")]
    BatchTooLarge {
        limit: usize,
        actual: usize,
    },
}

impl ClusterError {
    /// Create an `InvalidParameter` error.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    /// Create a `DimensionMismatch` error.
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    /// Create a `NonFiniteValue` error.
    pub fn non_finite(conversation_id: impl Into<String>, index: usize) -> Self {
        Self::NonFiniteValue {
            conversation_id: conversation_id.into(),
            index,
        }
    }
}
