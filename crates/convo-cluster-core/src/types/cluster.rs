//! Output cluster type.

use serde::{Deserialize, Serialize};

use super::facet::{ActionType, Direction};

/// A fine-grained cluster produced by coarse embedding clustering, facet
/// sub-grouping and consolidation.
///
/// `cluster_id` encodes lineage:
/// - `emb_{coarse}_{action_type}_{direction}` (facet key)
/// - `emb_{coarse}_{direction}_{product_area}` (product-area key)
/// - `{pass}_{name}_emb_{i-j-..}` for consolidated clusters
///
/// `conversation_ids` is non-empty, duplicate-free and sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HybridCluster {
    pub cluster_id: String,
    /// Originating coarse cluster. For merged clusters, the smallest contributing index.
    pub embedding_cluster: usize,
    pub action_type: ActionType,
    pub direction: Direction,
    /// Product area shared by every member, when topic metadata was available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_area: Option<String>,
    pub conversation_ids: Vec<String>,
}

impl HybridCluster {
    /// Create a cluster; ids are sorted and de-duplicated.
    pub fn new(
        cluster_id: impl Into<String>,
        embedding_cluster: usize,
        action_type: ActionType,
        direction: Direction,
        product_area: Option<String>,
        mut conversation_ids: Vec<String>,
    ) -> Self {
        conversation_ids.sort();
        conversation_ids.dedup();
        Self {
            cluster_id: cluster_id.into(),
            embedding_cluster,
            action_type,
            direction,
            product_area,
            conversation_ids,
        }
    }

    /// Number of conversations in the cluster.
    #[inline]
    pub fn size(&self) -> usize {
        self.conversation_ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.conversation_ids.is_empty()
    }

    /// Membership test (ids are kept sorted).
    pub fn contains(&self, conversation_id: &str) -> bool {
        self.conversation_ids
            .binary_search_by(|id| id.as_str().cmp(conversation_id))
            .is_ok()
    }
}
