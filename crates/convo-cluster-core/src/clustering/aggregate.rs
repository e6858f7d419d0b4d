//! Result aggregation: ordering, histogram, errors and success flag.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::types::{ClusteringResult, HybridCluster};

use super::error::ClusterError;

/// Error reported when the embedding input is empty.
pub const NO_EMBEDDINGS_ERROR: &str = "No embeddings provided";

/// Error reported when no conversation has both required inputs.
pub const NO_CLUSTERABLE_ERROR: &str = "No conversations have both an embedding and facets";

/// Error message for a Stage 1 failure.
pub fn embedding_clustering_failed(error: &ClusterError) -> String {
    format!("Embedding clustering failed: {}", error)
}

/// Order clusters by size descending, then `cluster_id` ascending.
pub fn sort_clusters(clusters: &mut [HybridCluster]) {
    clusters.sort_by(|a, b| {
        b.size()
            .cmp(&a.size())
            .then_with(|| a.cluster_id.cmp(&b.cluster_id))
    });
}

/// Cluster size -> number of clusters with that size.
pub fn size_distribution(clusters: &[HybridCluster]) -> BTreeMap<usize, usize> {
    let mut distribution = BTreeMap::new();
    for cluster in clusters {
        *distribution.entry(cluster.size()).or_insert(0) += 1;
    }
    distribution
}

/// Builds the [`ClusteringResult`] for one run.
#[derive(Debug, Clone)]
pub struct ResultAggregator {
    run_id: Uuid,
    total_conversations: usize,
    embedding_clusters_count: usize,
    fallback_conversations: Vec<String>,
}

impl ResultAggregator {
    /// Start a result; `fallback_conversations` must already be sorted.
    pub fn new(run_id: Uuid, fallback_conversations: Vec<String>) -> Self {
        Self {
            run_id,
            total_conversations: 0,
            embedding_clusters_count: 0,
            fallback_conversations,
        }
    }

    #[must_use]
    pub fn with_total_conversations(mut self, total: usize) -> Self {
        self.total_conversations = total;
        self
    }

    #[must_use]
    pub fn with_embedding_clusters(mut self, count: usize) -> Self {
        self.embedding_clusters_count = count;
        self
    }

    /// Successful run (unless no conversation was clusterable).
    pub fn finish(self, mut clusters: Vec<HybridCluster>) -> ClusteringResult {
        sort_clusters(&mut clusters);
        self.build(clusters, Vec::new())
    }

    /// Failed run; `clusters` is empty.
    pub fn fail(self, error: impl Into<String>) -> ClusteringResult {
        self.build(Vec::new(), vec![error.into()])
    }

    fn build(self, clusters: Vec<HybridCluster>, errors: Vec<String>) -> ClusteringResult {
        let success = errors.is_empty() && self.total_conversations > 0;
        ClusteringResult {
            run_id: self.run_id,
            total_conversations: self.total_conversations,
            embedding_clusters_count: self.embedding_clusters_count,
            hybrid_clusters_count: clusters.len(),
            cluster_size_distribution: size_distribution(&clusters),
            clusters,
            fallback_conversations: self.fallback_conversations,
            errors,
            success,
        }
    }
}
