//! Hybrid clustering of support conversations.
//!
//! Embedding similarity alone groups conversations by topic and blurs
//! opposite problems about the same feature. The pipeline therefore runs in
//! stages:
//!
//! - Stage 1 ([`AgglomerativeClusterer`]): threshold-cut hierarchical
//!   clustering over cosine distance
//! - Stage 2 ([`FacetSubgrouper`]): split each coarse cluster by categorical
//!   facets, always including direction
//! - [`Consolidator`]: re-merge curated narrow combinations within a size window
//! - [`ResultAggregator`]: ordering, histogram, errors
//!
//! [`HybridClusteringEngine`] runs all of them for one batch.
//!
//! # Key Types
//!
//! - [`AgglomerativeParams`]: distance threshold and [`Linkage`]
//! - [`MergeRuleTable`]: tagged [`MergeRule`] variants evaluated in [`MergePass`] order
//! - [`ClusterError`]: algorithm-level failures

pub mod aggregate;
pub mod agglomerative;
pub mod consolidate;
pub mod engine;
pub mod error;
pub mod input;
pub mod linkage;
pub mod subgroup;

pub use aggregate::{ResultAggregator, NO_CLUSTERABLE_ERROR, NO_EMBEDDINGS_ERROR};
pub use agglomerative::{
    agglomerative_defaults, AgglomerativeClusterer, AgglomerativeParams, CoarseClustering,
    DEFAULT_DISTANCE_THRESHOLD, MAX_COSINE_DISTANCE,
};
pub use consolidate::{
    ComponentRef, ConsolidationReport, Consolidator, MergePass, MergeRecord, MergeRule,
    MergeRuleTable, DEFAULT_MAX_SIZE, DEFAULT_MIN_SIZE,
};
pub use engine::HybridClusteringEngine;
pub use error::ClusterError;
pub use input::{BatchIndex, ConversationProfile};
pub use linkage::Linkage;
pub use subgroup::{FacetSubgrouper, SubgroupKey};
