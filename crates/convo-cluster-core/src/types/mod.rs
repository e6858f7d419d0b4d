//! Core domain types for conversation clustering.
//!
//! Inputs ([`ConversationEmbedding`], [`FacetRecord`], [`ThemeRecord`], bundled
//! as [`ClusteringInput`]) come from upstream pipelines; outputs are [`HybridCluster`] and
//! [`ClusteringResult`].

mod batch;
mod cluster;
mod embedding;
mod facet;
mod result;

pub use batch::ClusteringInput;
pub use cluster::HybridCluster;
pub use embedding::ConversationEmbedding;
pub use facet::{ActionType, Direction, FacetRecord, ThemeRecord, UNKNOWN_TOPIC};
pub use result::ClusteringResult;
