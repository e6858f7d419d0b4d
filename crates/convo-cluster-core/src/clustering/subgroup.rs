//! Stage 2: split each coarse cluster by categorical facets.
//!
//! Embedding similarity groups conversations by topic. Two conversations about
//! the same feature can still describe opposite problems ("posts published
//! twice" vs "posts never published"), so every coarse cluster is partitioned
//! by a key that always includes [`Direction`].

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{ActionType, Direction, HybridCluster};

use super::agglomerative::CoarseClustering;
use super::input::{BatchIndex, ConversationProfile};

/// Which facets make up the Stage 2 partition key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubgroupKey {
    /// `(action_type, direction)`, used without topic metadata.
    Facet,
    /// `(direction, product_area)`, used when topic metadata is present.
    ProductArea,
}

impl SubgroupKey {
    /// Pick the key for a run.
    #[inline]
    pub fn for_run(has_themes: bool) -> Self {
        if has_themes {
            Self::ProductArea
        } else {
            Self::Facet
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Facet => "facet",
            Self::ProductArea => "product_area",
        }
    }
}

impl fmt::Display for SubgroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum PartitionKey<'a> {
    Facet(ActionType, Direction),
    ProductArea(Direction, &'a str),
}

impl<'a> PartitionKey<'a> {
    fn of(key: SubgroupKey, profile: &ConversationProfile<'a>) -> Self {
        match key {
            SubgroupKey::Facet => Self::Facet(profile.action_type, profile.direction),
            SubgroupKey::ProductArea => Self::ProductArea(profile.direction, profile.product_area()),
        }
    }
}

/// Partitions Stage 1 output into [`HybridCluster`] candidates.
#[derive(Debug, Clone, Copy, Default)]
pub struct FacetSubgrouper;

impl FacetSubgrouper {
    pub fn new() -> Self {
        Self
    }

    /// Split every coarse cluster by the run's key.
    ///
    /// `coarse.labels[i]` must refer to `index.profiles()[i]`. Coarse clusters
    /// are visited in ascending index order and partitions are emitted in the
    /// order their key first appears among the (id-sorted) members.
    pub fn subgroup(&self, coarse: &CoarseClustering, index: &BatchIndex<'_>) -> Vec<HybridCluster> {
        let key = SubgroupKey::for_run(index.has_themes());
        let profiles = index.profiles();
        let mut clusters = Vec::new();

        for (coarse_id, members) in coarse.groups().into_iter().enumerate() {
            let mut order: Vec<PartitionKey<'_>> = Vec::new();
            let mut partitions: HashMap<PartitionKey<'_>, Vec<&ConversationProfile<'_>>> =
                HashMap::new();

            for i in members {
                let profile = &profiles[i];
                let pk = PartitionKey::of(key, profile);
                partitions
                    .entry(pk.clone())
                    .or_insert_with(|| {
                        order.push(pk);
                        Vec::new()
                    })
                    .push(profile);
            }

            for pk in order {
                let Some(members) = partitions.remove(&pk) else {
                    continue;
                };
                clusters.push(build_cluster(coarse_id, &pk, &members));
            }
        }

        debug!(
            key = %key,
            coarse_clusters = coarse.cluster_count,
            hybrid_clusters = clusters.len(),
            "Stage 2 sub-grouping complete"
        );

        clusters
    }
}

fn build_cluster(
    coarse_id: usize,
    key: &PartitionKey<'_>,
    members: &[&ConversationProfile<'_>],
) -> HybridCluster {
    let ids = members.iter().map(|p| p.conversation_id.to_string()).collect();
    match *key {
        PartitionKey::Facet(action_type, direction) => HybridCluster::new(
            format!("emb_{}_{}_{}", coarse_id, action_type, direction),
            coarse_id,
            action_type,
            direction,
            None,
            ids,
        ),
        PartitionKey::ProductArea(direction, product_area) => {
            let action_type =
                mode(members.iter().map(|p| p.action_type)).unwrap_or(ActionType::Unknown);
            HybridCluster::new(
                format!("emb_{}_{}_{}", coarse_id, direction, product_area),
                coarse_id,
                action_type,
                direction,
                Some(product_area.to_string()),
                ids,
            )
        }
    }
}

/// Most frequent value. On ties the value that reached the winning count
/// first, in iteration order, wins.
pub(crate) fn mode<T>(values: impl IntoIterator<Item = T>) -> Option<T>
where
    T: Copy + Eq + Hash,
{
    let mut counts: HashMap<T, usize> = HashMap::new();
    let mut best: Option<(T, usize)> = None;
    for value in values {
        let count = counts.entry(value).or_insert(0);
        *count += 1;
        if best.map_or(true, |(_, best_count)| *count > best_count) {
            best = Some((value, *count));
        }
    }
    best.map(|(value, _)| value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ConversationEmbedding, FacetRecord, ThemeRecord};

    fn coarse(labels: Vec<usize>) -> CoarseClustering {
        let cluster_count = labels.iter().max().map_or(0, |m| m + 1);
        CoarseClustering {
            labels,
            cluster_count,
        }
    }

    fn embeddings(ids: &[&str]) -> Vec<ConversationEmbedding> {
        ids.iter()
            .map(|id| ConversationEmbedding::new(*id, vec![1.0, 0.0]))
            .collect()
    }

    #[test]
    fn test_mode_first_reached_max_wins_ties() {
        assert_eq!(mode(["a", "b", "b", "a"]), Some("b"));
        assert_eq!(mode(["a", "b"]), Some("a"));
        assert_eq!(mode(["c", "a", "a", "c", "c"]), Some("c"));
        assert_eq!(mode(Vec::<u8>::new()), None);
        println!("[PASS] test_mode_first_reached_max_wins_ties");
    }

    #[test]
    fn test_facet_key_splits_by_direction_and_action() {
        let ids = ["c1", "c2", "c3", "c4"];
        let emb = embeddings(&ids);
        let facets = vec![
            FacetRecord::new("c1", ActionType::BugReport, Direction::Excess),
            FacetRecord::new("c2", ActionType::BugReport, Direction::Deficit),
            FacetRecord::new("c3", ActionType::BugReport, Direction::Excess),
            FacetRecord::new("c4", ActionType::Inquiry, Direction::Excess),
        ];
        let index = BatchIndex::build(&emb, &facets, None);

        let clusters = FacetSubgrouper::new().subgroup(&coarse(vec![0, 0, 0, 0]), &index);

        let ids: Vec<&str> = clusters.iter().map(|c| c.cluster_id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "emb_0_bug_report_excess",
                "emb_0_bug_report_deficit",
                "emb_0_inquiry_excess"
            ]
        );
        assert_eq!(clusters[0].conversation_ids, vec!["c1", "c3"]);
        assert!(clusters.iter().all(|c| c.product_area.is_none()));
        println!("[PASS] test_facet_key_splits_by_direction_and_action");
    }

    #[test]
    fn test_same_key_in_different_coarse_clusters_stays_distinct() {
        let ids = ["a", "b"];
        let emb = embeddings(&ids);
        let facets = vec![
            FacetRecord::new("a", ActionType::Complaint, Direction::Neutral),
            FacetRecord::new("b", ActionType::Complaint, Direction::Neutral),
        ];
        let index = BatchIndex::build(&emb, &facets, None);

        let clusters = FacetSubgrouper::new().subgroup(&coarse(vec![0, 1]), &index);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].cluster_id, "emb_0_complaint_neutral");
        assert_eq!(clusters[1].cluster_id, "emb_1_complaint_neutral");
        assert_eq!(clusters[1].embedding_cluster, 1);
    }

    #[test]
    fn test_product_area_key_labels_action_by_mode() {
        let ids = ["a", "b", "c", "d"];
        let emb = embeddings(&ids);
        let facets = vec![
            FacetRecord::new("a", ActionType::Inquiry, Direction::Deficit),
            FacetRecord::new("b", ActionType::BugReport, Direction::Deficit),
            FacetRecord::new("c", ActionType::BugReport, Direction::Deficit),
            FacetRecord::new("d", ActionType::Inquiry, Direction::Deficit),
        ];
        let themes = vec![
            ThemeRecord::new("a", "analytics", "dashboard"),
            ThemeRecord::new("b", "analytics", "export"),
            ThemeRecord::new("c", "analytics", "dashboard"),
        ];
        let index = BatchIndex::build(&emb, &facets, Some(themes.as_slice()));

        let clusters = FacetSubgrouper::new().subgroup(&coarse(vec![0, 0, 0, 0]), &index);

        assert_eq!(clusters.len(), 2);
        let analytics = &clusters[0];
        assert_eq!(analytics.cluster_id, "emb_0_deficit_analytics");
        assert_eq!(analytics.conversation_ids, vec!["a", "b", "c"]);
        // inquiry reaches 1 first, bug_report reaches 2 first
        assert_eq!(analytics.action_type, ActionType::BugReport);
        assert_eq!(analytics.product_area.as_deref(), Some("analytics"));

        let unknown = &clusters[1];
        assert_eq!(unknown.cluster_id, "emb_0_deficit_unknown");
        assert_eq!(unknown.conversation_ids, vec!["d"]);
        println!("[PASS] test_product_area_key_labels_action_by_mode");
    }

    #[test]
    fn test_key_selection() {
        assert_eq!(SubgroupKey::for_run(true), SubgroupKey::ProductArea);
        assert_eq!(SubgroupKey::for_run(false), SubgroupKey::Facet);
        assert_eq!(SubgroupKey::ProductArea.to_string(), "product_area");
    }
}
