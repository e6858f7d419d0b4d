//! Pass implementations over the working cluster set.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::clustering::input::{BatchIndex, ConversationProfile};
use crate::clustering::subgroup::mode;
use crate::types::{ActionType, Direction, HybridCluster, UNKNOWN_TOPIC};

use super::rules::{MergePass, MergeRule};
use super::{ConsolidationReport, Consolidator, MergeRecord};

struct Slot {
    cluster: HybridCluster,
    /// Produced by a merge; later passes leave it alone.
    merged: bool,
}

enum Window {
    Fits,
    Oversize,
    Undersize,
}

/// Clusters still in play plus the merges made so far.
pub(super) struct Workset<'c, 'i, 'a> {
    consolidator: &'c Consolidator,
    index: &'i BatchIndex<'a>,
    families: HashMap<(&'c str, &'c str), &'c str>,
    slots: Vec<Slot>,
    report: ConsolidationReport,
}

impl<'c, 'i, 'a> Workset<'c, 'i, 'a> {
    pub(super) fn new(
        consolidator: &'c Consolidator,
        clusters: Vec<HybridCluster>,
        index: &'i BatchIndex<'a>,
    ) -> Self {
        Self {
            consolidator,
            index,
            families: consolidator.rules.family_index(),
            slots: clusters
                .into_iter()
                .map(|cluster| Slot {
                    cluster,
                    merged: false,
                })
                .collect(),
            report: ConsolidationReport::default(),
        }
    }

    pub(super) fn apply(&mut self, rule: &MergeRule) {
        match rule {
            MergeRule::SinglePack { product_area } => self.single_pack(product_area),
            MergeRule::ComponentFamily { family, .. } => self.component_family(family),
            MergeRule::Conjunction { name, direction, .. } => {
                self.conjunction(rule, name, *direction)
            }
            MergeRule::NarrowKey {
                direction,
                product_area,
            } => self.narrow_key(*direction, product_area),
        }
        // Consumed and fully drained clusters are left empty.
        self.slots.retain(|s| !s.cluster.is_empty());
    }

    pub(super) fn finish(self) -> (Vec<HybridCluster>, ConsolidationReport) {
        (
            self.slots.into_iter().map(|s| s.cluster).collect(),
            self.report,
        )
    }

    // =========================================================================
    // Pass 1: single-pack
    // =========================================================================

    fn single_pack(&mut self, product_area: &str) {
        let candidates: Vec<usize> = self
            .pending()
            .filter(|&i| {
                self.slots[i]
                    .cluster
                    .conversation_ids
                    .iter()
                    .all(|id| self.profile(id).map(|p| p.product_area()) == Some(product_area))
            })
            .collect();

        // Direction is the mode of the members: this pass merges across it.
        self.merge_clusters(
            MergePass::SinglePack,
            &format!("single_pack_{}", product_area),
            &candidates,
            None,
        );
    }

    // =========================================================================
    // Pass 2: component family
    // =========================================================================

    fn component_family(&mut self, family: &str) {
        let mut groups: Vec<(Direction, Vec<usize>)> = Vec::new();
        for i in self.pending().collect::<Vec<_>>() {
            if self.family_of(&self.slots[i].cluster) != Some(family) {
                continue;
            }
            let direction = self.slots[i].cluster.direction;
            match groups.iter_mut().find(|(d, _)| *d == direction) {
                Some((_, members)) => members.push(i),
                None => groups.push((direction, vec![i])),
            }
        }

        for (direction, members) in groups {
            self.merge_clusters(
                MergePass::ComponentFamily,
                &format!("family_{}_{}", family, direction),
                &members,
                Some(direction),
            );
        }
    }

    /// Family shared by every member, if any.
    fn family_of(&self, cluster: &HybridCluster) -> Option<&str> {
        let mut family = None;
        for id in &cluster.conversation_ids {
            let profile = self.profile(id)?;
            let member_family = *self
                .families
                .get(&(profile.product_area(), profile.component()))?;
            match family {
                None => family = Some(member_family),
                Some(f) if f == member_family => {}
                Some(_) => return None,
            }
        }
        family
    }

    // =========================================================================
    // Pass 3: conjunction (id-granular)
    // =========================================================================

    fn conjunction(&mut self, rule: &MergeRule, name: &str, direction: Direction) {
        let mut sources: Vec<(usize, Vec<String>)> = Vec::new();
        for i in self.pending().collect::<Vec<_>>() {
            let qualifying: Vec<String> = self.slots[i]
                .cluster
                .conversation_ids
                .iter()
                .filter(|id| self.profile(id).is_some_and(|p| rule.matches(p)))
                .cloned()
                .collect();
            if !qualifying.is_empty() {
                sources.push((i, qualifying));
            }
        }

        if sources.len() < 2 {
            return;
        }

        let size: usize = sources.iter().map(|(_, ids)| ids.len()).sum();
        if !self.fits(MergePass::Conjunction, name, size) {
            return;
        }

        let embedding_clusters: Vec<usize> = sources
            .iter()
            .map(|(i, _)| self.slots[*i].cluster.embedding_cluster)
            .collect();
        let source_cluster_ids: Vec<String> = sources
            .iter()
            .map(|(i, _)| self.slots[*i].cluster.cluster_id.clone())
            .collect();
        let ids: Vec<String> = sources.iter().flat_map(|(_, ids)| ids.iter().cloned()).collect();

        for (i, taken) in &sources {
            let remaining: Vec<String> = self.slots[*i]
                .cluster
                .conversation_ids
                .iter()
                .filter(|id| !taken.contains(id))
                .cloned()
                .collect();
            let action_type = self.action_mode(&remaining);
            let cluster = &mut self.slots[*i].cluster;
            cluster.conversation_ids = remaining;
            cluster.action_type = action_type.unwrap_or(cluster.action_type);
        }

        let cluster_id = format!("rule_{}_emb_{}", name, lineage(&embedding_clusters));
        let merged = self.build(cluster_id, &embedding_clusters, ids, Some(direction));
        self.record(MergePass::Conjunction, &merged, source_cluster_ids);
        self.slots.push(Slot {
            cluster: merged,
            merged: true,
        });
    }

    // =========================================================================
    // Pass 4: narrow facet key
    // =========================================================================

    fn narrow_key(&mut self, direction: Direction, product_area: &str) {
        let candidates: Vec<usize> = self
            .pending()
            .filter(|&i| {
                let cluster = &self.slots[i].cluster;
                cluster.direction == direction
                    && cluster.product_area.as_deref().unwrap_or(UNKNOWN_TOPIC) == product_area
            })
            .collect();

        self.merge_clusters(
            MergePass::NarrowKey,
            &format!("narrow_{}_{}", direction, product_area),
            &candidates,
            Some(direction),
        );
    }

    // =========================================================================
    // Shared
    // =========================================================================

    fn pending(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.merged && !s.cluster.is_empty())
            .map(|(i, _)| i)
    }

    fn profile(&self, conversation_id: &str) -> Option<&ConversationProfile<'a>> {
        self.index.profile(conversation_id)
    }

    fn window(&self, size: usize) -> Window {
        if size > self.consolidator.max_size {
            Window::Oversize
        } else if size < self.consolidator.min_size {
            Window::Undersize
        } else {
            Window::Fits
        }
    }

    /// Check the size window, counting and logging skipped candidates.
    fn fits(&mut self, pass: MergePass, key: &str, size: usize) -> bool {
        match self.window(size) {
            Window::Fits => true,
            Window::Oversize => {
                self.report.skipped_oversize += 1;
                debug!(
                    pass = %pass,
                    key,
                    size,
                    max_size = self.consolidator.max_size,
                    "Merge skipped: above max_size"
                );
                false
            }
            Window::Undersize => {
                self.report.skipped_undersize += 1;
                debug!(
                    pass = %pass,
                    key,
                    size,
                    min_size = self.consolidator.min_size,
                    "Merge skipped: below min_size"
                );
                false
            }
        }
    }

    /// Merge whole clusters at `positions` (pending, encounter order) into one.
    ///
    /// `direction` of `None` reports the members' mode.
    fn merge_clusters(
        &mut self,
        pass: MergePass,
        prefix: &str,
        positions: &[usize],
        direction: Option<Direction>,
    ) {
        if positions.len() < 2 {
            return;
        }
        let size: usize = positions.iter().map(|&i| self.slots[i].cluster.size()).sum();
        if !self.fits(pass, prefix, size) {
            return;
        }

        // Sources are drained in place; `apply` drops them afterwards, so
        // positions stay valid for the rest of the rule.
        let mut embedding_clusters = Vec::with_capacity(positions.len());
        let mut source_cluster_ids = Vec::with_capacity(positions.len());
        let mut ids = Vec::with_capacity(size);
        for &i in positions {
            let source = &mut self.slots[i].cluster;
            embedding_clusters.push(source.embedding_cluster);
            source_cluster_ids.push(source.cluster_id.clone());
            ids.append(&mut source.conversation_ids);
        }
        let cluster_id = format!("{}_emb_{}", prefix, lineage(&embedding_clusters));

        let merged = self.build(cluster_id, &embedding_clusters, ids, direction);
        self.record(pass, &merged, source_cluster_ids);
        self.slots.push(Slot {
            cluster: merged,
            merged: true,
        });
    }

    fn build(
        &self,
        cluster_id: String,
        embedding_clusters: &[usize],
        mut ids: Vec<String>,
        direction: Option<Direction>,
    ) -> HybridCluster {
        ids.sort();
        let profiles: Vec<&ConversationProfile<'a>> =
            ids.iter().filter_map(|id| self.profile(id)).collect();

        let action_type = mode(profiles.iter().map(|p| p.action_type)).unwrap_or(ActionType::Unknown);
        let direction = direction
            .or_else(|| mode(profiles.iter().map(|p| p.direction)))
            .unwrap_or(Direction::Neutral);

        let product_area = if self.index.has_themes() {
            let areas: BTreeSet<&str> = profiles.iter().map(|p| p.product_area()).collect();
            match areas.len() {
                1 => areas.into_iter().next().map(str::to_string),
                _ => None,
            }
        } else {
            None
        };

        HybridCluster::new(
            cluster_id,
            embedding_clusters.iter().copied().min().unwrap_or(0),
            action_type,
            direction,
            product_area,
            ids,
        )
    }

    fn action_mode(&self, ids: &[String]) -> Option<ActionType> {
        mode(ids.iter().filter_map(|id| self.profile(id)).map(|p| p.action_type))
    }

    fn record(&mut self, pass: MergePass, merged: &HybridCluster, source_cluster_ids: Vec<String>) {
        debug!(
            pass = %pass,
            cluster_id = %merged.cluster_id,
            sources = source_cluster_ids.len(),
            size = merged.size(),
            "Merged clusters"
        );
        self.report.merges.push(MergeRecord {
            pass,
            cluster_id: merged.cluster_id.clone(),
            source_cluster_ids,
            size: merged.size(),
        });
    }
}

/// `i-j-k` over the distinct contributing coarse indices, ascending.
fn lineage(embedding_clusters: &[usize]) -> String {
    embedding_clusters
        .iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("-")
}
