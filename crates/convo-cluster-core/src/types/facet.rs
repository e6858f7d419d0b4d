//! Categorical facets attached to each conversation.
//!
//! Facets are produced upstream by the classification pipeline. Clustering
//! only reads the two categorical axes ([`ActionType`] and [`Direction`]) and,
//! when present, the topic metadata carried by [`ThemeRecord`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Product area / component reported for conversations without topic metadata.
pub const UNKNOWN_TOPIC: &str = "unknown";

/// What the customer is trying to do in the conversation.
///
/// Unrecognised values coming from the facet extractor deserialize to
/// [`ActionType::Unknown`] instead of failing the whole batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Asking for information
    Inquiry,
    /// Expressing dissatisfaction
    Complaint,
    /// Reporting broken behavior
    BugReport,
    /// Asking how to accomplish something
    HowToQuestion,
    /// Asking for new functionality
    FeatureRequest,
    /// Requesting a change to account or plan
    AccountChange,
    /// Requesting removal of data or account
    DeleteRequest,
    /// Extractor could not decide
    #[serde(other)]
    Unknown,
}

impl ActionType {
    /// Wire name of this action type.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inquiry => "inquiry",
            Self::Complaint => "complaint",
            Self::BugReport => "bug_report",
            Self::HowToQuestion => "how_to_question",
            Self::FeatureRequest => "feature_request",
            Self::AccountChange => "account_change",
            Self::DeleteRequest => "delete_request",
            Self::Unknown => "unknown",
        }
    }

    /// All variants in canonical order.
    #[inline]
    pub fn all() -> [ActionType; 8] {
        [
            Self::Inquiry,
            Self::Complaint,
            Self::BugReport,
            Self::HowToQuestion,
            Self::FeatureRequest,
            Self::AccountChange,
            Self::DeleteRequest,
            Self::Unknown,
        ]
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Self::all()
            .into_iter()
            .find(|a| a.as_str() == normalized)
            .ok_or_else(|| {
                format!(
                    "Invalid ActionType: '{}'. Valid values: inquiry, complaint, bug_report, \
                     how_to_question, feature_request, account_change, delete_request, unknown",
                    s
                )
            })
    }
}

/// Polarity of the reported issue.
///
/// This is the load-bearing axis that separates semantically opposite
/// conversations about the same feature ("posted twice" vs "never posted").
/// Two conversations with different directions are never grouped together
/// except by an explicitly configured single-pack product area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Too much / too many / duplicated
    Excess,
    /// Too little / missing / not happening
    Deficit,
    /// Wants something created
    Creation,
    /// Wants something removed
    Deletion,
    /// Wants something changed
    Modification,
    /// Slowness, timeouts
    Performance,
    /// No polarity
    Neutral,
}

impl Direction {
    /// Wire name of this direction.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excess => "excess",
            Self::Deficit => "deficit",
            Self::Creation => "creation",
            Self::Deletion => "deletion",
            Self::Modification => "modification",
            Self::Performance => "performance",
            Self::Neutral => "neutral",
        }
    }

    /// All variants in canonical order.
    #[inline]
    pub fn all() -> [Direction; 7] {
        [
            Self::Excess,
            Self::Deficit,
            Self::Creation,
            Self::Deletion,
            Self::Modification,
            Self::Performance,
            Self::Neutral,
        ]
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Self::all()
            .into_iter()
            .find(|d| d.as_str() == normalized)
            .ok_or_else(|| {
                format!(
                    "Invalid Direction: '{}'. Valid values: excess, deficit, creation, deletion, \
                     modification, performance, neutral",
                    s
                )
            })
    }
}

/// Per-conversation facets from the classification pipeline.
///
/// The free-text fields are accepted so upstream payloads deserialize as-is;
/// they play no part in clustering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetRecord {
    pub conversation_id: String,
    pub action_type: ActionType,
    pub direction: Direction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symptom: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_goal: Option<String>,
}

impl FacetRecord {
    pub fn new(
        conversation_id: impl Into<String>,
        action_type: ActionType,
        direction: Direction,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            action_type,
            direction,
            symptom: None,
            user_goal: None,
        }
    }
}

/// Optional topic metadata for a conversation.
///
/// When any theme records are supplied for a run, Stage 2 switches from the
/// `(action_type, direction)` key to the richer `(direction, product_area)` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeRecord {
    pub conversation_id: String,
    pub product_area: String,
    pub component: String,
}

impl ThemeRecord {
    pub fn new(
        conversation_id: impl Into<String>,
        product_area: impl Into<String>,
        component: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            product_area: product_area.into(),
            component: component.into(),
        }
    }
}
