//! Convo Cluster Core Library
//!
//! Groups a batch of support conversations into fine-grained, actionable
//! clusters. Embedding similarity finds the topic; categorical facets
//! (action type, direction, product area) keep opposite problems about the
//! same topic apart; curated merge rules undo over-fragmentation.
//!
//! # Architecture
//!
//! This crate defines:
//! - Domain types (`ConversationEmbedding`, `FacetRecord`, `HybridCluster`, etc.)
//! - Cosine similarity and distance matrices
//! - The clustering pipeline and its `HybridClusteringEngine`
//! - Error types and result aliases
//! - Configuration structures
//!
//! # Example
//!
//! ```
//! use convo_cluster_core::{EngineConfig, HybridClusteringEngine};
//! use convo_cluster_core::types::{ActionType, ConversationEmbedding, Direction, FacetRecord};
//! use uuid::Uuid;
//!
//! let engine = HybridClusteringEngine::from_config(&EngineConfig::default_config());
//! let embeddings = vec![ConversationEmbedding::new("c1", vec![0.3, 0.7, 0.1])];
//! let facets = vec![FacetRecord::new("c1", ActionType::Inquiry, Direction::Neutral)];
//!
//! let result = engine.cluster_batch(Uuid::new_v4(), &embeddings, &facets, None);
//! assert!(result.success);
//! assert_eq!(result.clusters.len(), 1);
//! ```

pub mod clustering;
pub mod config;
pub mod error;
pub mod similarity;
pub mod types;

// Re-exports for convenience
pub use clustering::{ClusterError, HybridClusteringEngine};
pub use config::EngineConfig;
pub use error::{CoreError, CoreResult};
pub use types::{
    ActionType, ClusteringInput, ClusteringResult, ConversationEmbedding, Direction, FacetRecord,
    HybridCluster, ThemeRecord,
};
