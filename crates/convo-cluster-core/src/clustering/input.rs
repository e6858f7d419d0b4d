//! Batch input adaptation.
//!
//! Joins the embedding, facet and optional theme collections by
//! conversation id, in lexicographic id order, and records which
//! conversations fall back because one of the two required inputs is missing.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::warn;

use crate::types::{
    ActionType, ConversationEmbedding, Direction, FacetRecord, ThemeRecord, UNKNOWN_TOPIC,
};

/// Everything clustering needs to know about one conversation.
#[derive(Debug, Clone, Copy)]
pub struct ConversationProfile<'a> {
    pub conversation_id: &'a str,
    pub vector: &'a [f32],
    pub action_type: ActionType,
    pub direction: Direction,
    pub theme: Option<&'a ThemeRecord>,
}

impl<'a> ConversationProfile<'a> {
    /// Product area, or `"unknown"` without topic metadata.
    #[inline]
    pub fn product_area(&self) -> &'a str {
        self.theme.map_or(UNKNOWN_TOPIC, |t| t.product_area.as_str())
    }

    /// Component, or `"unknown"` without topic metadata.
    #[inline]
    pub fn component(&self) -> &'a str {
        self.theme.map_or(UNKNOWN_TOPIC, |t| t.component.as_str())
    }
}

/// The joined, id-ordered view of one batch.
#[derive(Debug)]
pub struct BatchIndex<'a> {
    profiles: Vec<ConversationProfile<'a>>,
    positions: HashMap<&'a str, usize>,
    fallback: Vec<String>,
    has_themes: bool,
}

impl<'a> BatchIndex<'a> {
    /// Join the inputs.
    ///
    /// Duplicate ids within one collection keep their first occurrence and
    /// are logged. Themes for conversations that are not clusterable are
    /// ignored.
    pub fn build(
        embeddings: &'a [ConversationEmbedding],
        facets: &'a [FacetRecord],
        themes: Option<&'a [ThemeRecord]>,
    ) -> Self {
        let embedding_map = first_by_id(embeddings, |e| e.conversation_id.as_str(), "embedding");
        let facet_map = first_by_id(facets, |f| f.conversation_id.as_str(), "facet");
        let theme_map = themes
            .map(|t| first_by_id(t, |r| r.conversation_id.as_str(), "theme"))
            .unwrap_or_default();

        let embedding_ids: BTreeSet<&str> = embedding_map.keys().copied().collect();
        let facet_ids: BTreeSet<&str> = facet_map.keys().copied().collect();

        let fallback: Vec<String> = embedding_ids
            .symmetric_difference(&facet_ids)
            .map(|id| id.to_string())
            .collect();

        if !fallback.is_empty() {
            warn!(
                fallback = fallback.len(),
                embeddings = embedding_ids.len(),
                facets = facet_ids.len(),
                "Conversations missing an embedding or facets are excluded from clustering"
            );
        }

        // BTreeMap iteration gives lexicographic id order.
        let profiles: Vec<ConversationProfile<'a>> = embedding_map
            .iter()
            .filter_map(|(&id, &embedding)| {
                facet_map.get(id).map(|facet| ConversationProfile {
                    conversation_id: id,
                    vector: embedding.vector.as_slice(),
                    action_type: facet.action_type,
                    direction: facet.direction,
                    theme: theme_map.get(id).copied(),
                })
            })
            .collect();

        let positions = profiles
            .iter()
            .enumerate()
            .map(|(i, p)| (p.conversation_id, i))
            .collect();

        // Themes only count when they describe a clusterable conversation.
        let has_themes = profiles.iter().any(|p| p.theme.is_some());

        Self {
            has_themes,
            profiles,
            positions,
            fallback,
        }
    }

    /// Clusterable conversations in lexicographic id order.
    #[inline]
    pub fn profiles(&self) -> &[ConversationProfile<'a>] {
        &self.profiles
    }

    /// Profile for a clusterable conversation.
    pub fn profile(&self, conversation_id: &str) -> Option<&ConversationProfile<'a>> {
        self.positions
            .get(conversation_id)
            .map(|&i| &self.profiles[i])
    }

    /// Number of clusterable conversations (embedding ∩ facets).
    #[inline]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Whether at least one clusterable conversation carries a theme.
    #[inline]
    pub fn has_themes(&self) -> bool {
        self.has_themes
    }

    /// Ids with exactly one of embedding / facets, sorted.
    #[inline]
    pub fn fallback(&self) -> &[String] {
        &self.fallback
    }

    pub fn into_fallback(self) -> Vec<String> {
        self.fallback
    }
}

fn first_by_id<'a, T>(
    items: &'a [T],
    key: impl Fn(&'a T) -> &'a str,
    kind: &'static str,
) -> BTreeMap<&'a str, &'a T> {
    let mut map = BTreeMap::new();
    let mut duplicates = 0usize;
    for item in items {
        let id = key(item);
        if map.contains_key(id) {
            duplicates += 1;
            continue;
        }
        map.insert(id, item);
    }
    if duplicates > 0 {
        warn!(kind, duplicates, "Duplicate conversation ids; keeping first occurrence");
    }
    map
}
