//! Conversation embedding vectors supplied by the embedding pipeline.

use serde::{Deserialize, Serialize};

/// A conversation's dense embedding.
///
/// All embeddings in one run must share the same dimension; Stage 1 rejects
/// the batch otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEmbedding {
    pub conversation_id: String,
    pub vector: Vec<f32>,
}

impl ConversationEmbedding {
    pub fn new(conversation_id: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            vector,
        }
    }

    /// Dimension of the embedding.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.vector.len()
    }

    /// Position of the first NaN/Infinity component, if any.
    pub fn first_non_finite(&self) -> Option<usize> {
        self.vector.iter().position(|v| !v.is_finite())
    }
}
