//! Result of one clustering invocation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::cluster::HybridCluster;

/// Outcome of a single batch run.
///
/// Callers must check [`ClusteringResult::success`] before consuming
/// `clusters`; on failure `clusters` is empty and `errors` explains why.
/// `fallback_conversations` is informational and never blocks success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringResult {
    pub run_id: Uuid,
    /// Conversations that had both an embedding and facets.
    pub total_conversations: usize,
    pub embedding_clusters_count: usize,
    pub hybrid_clusters_count: usize,
    /// Sorted by size descending, then `cluster_id` ascending.
    pub clusters: Vec<HybridCluster>,
    /// Ids present in exactly one of the embedding and facet inputs (sorted).
    pub fallback_conversations: Vec<String>,
    pub errors: Vec<String>,
    /// Cluster size -> number of clusters of that size.
    pub cluster_size_distribution: BTreeMap<usize, usize>,
    /// `errors.is_empty() && total_conversations > 0`
    pub success: bool,
}

impl ClusteringResult {
    /// Whether the run produced a usable clustering.
    #[inline]
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Number of conversations placed in some cluster.
    pub fn clustered_conversations(&self) -> usize {
        self.clusters.iter().map(HybridCluster::size).sum()
    }

    /// Find the cluster holding a conversation.
    pub fn cluster_for(&self, conversation_id: &str) -> Option<&HybridCluster> {
        self.clusters.iter().find(|c| c.contains(conversation_id))
    }

    /// Split clusters into those meeting a minimum size (candidates for
    /// promotion to a durable grouping) and the low-signal remainder.
    ///
    /// Both halves keep the result's ordering.
    pub fn partition_by_min_size(
        &self,
        min_conversations: usize,
    ) -> (Vec<&HybridCluster>, Vec<&HybridCluster>) {
        self.clusters
            .iter()
            .partition(|c| c.size() >= min_conversations)
    }

    /// Average cluster size, 0.0 for an empty result.
    pub fn avg_cluster_size(&self) -> f32 {
        if self.clusters.is_empty() {
            0.0
        } else {
            self.clustered_conversations() as f32 / self.clusters.len() as f32
        }
    }
}
