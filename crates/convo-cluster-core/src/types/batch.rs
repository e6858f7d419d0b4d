//! Owned input bundle for one clustering invocation.

use serde::{Deserialize, Serialize};

use super::embedding::ConversationEmbedding;
use super::facet::{FacetRecord, ThemeRecord};

/// Everything one batch run consumes.
///
/// `themes` is optional; without it Stage 2 keys on `(action_type, direction)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusteringInput {
    pub embeddings: Vec<ConversationEmbedding>,
    pub facets: Vec<FacetRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub themes: Option<Vec<ThemeRecord>>,
}

impl ClusteringInput {
    pub fn new(embeddings: Vec<ConversationEmbedding>, facets: Vec<FacetRecord>) -> Self {
        Self {
            embeddings,
            facets,
            themes: None,
        }
    }

    #[must_use]
    pub fn with_themes(mut self, themes: Vec<ThemeRecord>) -> Self {
        self.themes = Some(themes);
        self
    }

    /// Themes as a slice, if supplied.
    pub fn themes(&self) -> Option<&[ThemeRecord]> {
        self.themes.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActionType, Direction};

    #[test]
    fn test_themes_are_optional_on_the_wire() {
        let json = r#"{
            "embeddings": [{"conversation_id": "c1", "vector": [0.1, 0.2]}],
            "facets": [{"conversation_id": "c1", "action_type": "inquiry", "direction": "neutral"}]
        }"#;
        let input: ClusteringInput = serde_json::from_str(json).unwrap();
        assert!(input.themes().is_none());
        assert_eq!(input.facets[0].action_type, ActionType::Inquiry);

        let with = input.clone().with_themes(vec![ThemeRecord::new("c1", "billing", "plan")]);
        assert_eq!(with.themes().map(<[ThemeRecord]>::len), Some(1));
        assert_eq!(with.facets[0].direction, Direction::Neutral);
    }
}
