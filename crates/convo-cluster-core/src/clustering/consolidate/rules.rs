//! Declarative merge rule table.
//!
//! Each rule is a tagged variant. The consolidator evaluates variants in the
//! fixed order of [`MergePass`] and, within one variant, in table order.
//!
//! In TOML:
//!
//! ```toml
//! [[consolidation.rules]]
//! kind = "single_pack"
//! product_area = "account_access"
//!
//! [[consolidation.rules]]
//! kind = "narrow_key"
//! direction = "excess"
//! product_area = "billing"
//! ```

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::clustering::error::ClusterError;
use crate::clustering::input::ConversationProfile;
use crate::types::{ActionType, Direction};

/// Consolidation passes, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePass {
    SinglePack,
    ComponentFamily,
    Conjunction,
    NarrowKey,
}

impl MergePass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SinglePack => "single_pack",
            Self::ComponentFamily => "component_family",
            Self::Conjunction => "conjunction",
            Self::NarrowKey => "narrow_key",
        }
    }

    /// All passes in evaluation order.
    pub fn all() -> [MergePass; 4] {
        [
            Self::SinglePack,
            Self::ComponentFamily,
            Self::Conjunction,
            Self::NarrowKey,
        ]
    }
}

impl fmt::Display for MergePass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `(product_area, component)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentRef {
    pub product_area: String,
    pub component: String,
}

impl ComponentRef {
    pub fn new(product_area: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            product_area: product_area.into(),
            component: component.into(),
        }
    }
}

/// A curated merge rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MergeRule {
    /// Product area known to hold a single underlying issue. All of its
    /// clusters merge regardless of direction.
    SinglePack { product_area: String },

    /// Many-to-one mapping of `(product_area, component)` pairs onto a family.
    ComponentFamily {
        family: String,
        members: Vec<ComponentRef>,
    },

    /// Id-level conjunction. An empty set matches anything.
    Conjunction {
        name: String,
        #[serde(default)]
        product_areas: Vec<String>,
        #[serde(default)]
        components: Vec<String>,
        #[serde(default)]
        action_types: Vec<ActionType>,
        direction: Direction,
    },

    /// Allow-listed `(direction, product_area)` key known to be a single issue.
    NarrowKey {
        direction: Direction,
        product_area: String,
    },
}

impl MergeRule {
    pub fn pass(&self) -> MergePass {
        match self {
            Self::SinglePack { .. } => MergePass::SinglePack,
            Self::ComponentFamily { .. } => MergePass::ComponentFamily,
            Self::Conjunction { .. } => MergePass::Conjunction,
            Self::NarrowKey { .. } => MergePass::NarrowKey,
        }
    }

    /// Name used in merged cluster ids and logs.
    pub fn name(&self) -> String {
        match self {
            Self::SinglePack { product_area } => product_area.clone(),
            Self::ComponentFamily { family, .. } => family.clone(),
            Self::Conjunction { name, .. } => name.clone(),
            Self::NarrowKey {
                direction,
                product_area,
            } => format!("{}_{}", direction, product_area),
        }
    }

    /// Whether a conversation satisfies a conjunction rule.
    ///
    /// Always false for the cluster-level variants.
    pub fn matches(&self, profile: &ConversationProfile<'_>) -> bool {
        match self {
            Self::Conjunction {
                product_areas,
                components,
                action_types,
                direction,
                ..
            } => {
                profile.direction == *direction
                    && (product_areas.is_empty()
                        || product_areas.iter().any(|a| a == profile.product_area()))
                    && (components.is_empty()
                        || components.iter().any(|c| c == profile.component()))
                    && (action_types.is_empty() || action_types.contains(&profile.action_type))
            }
            _ => false,
        }
    }

    fn validate(&self) -> Result<(), ClusterError> {
        let require = |field: &str, value: &str| {
            if value.trim().is_empty() {
                Err(ClusterError::invalid_parameter(format!(
                    "{} rule: {} must not be empty",
                    self.pass(),
                    field
                )))
            } else {
                Ok(())
            }
        };

        match self {
            Self::SinglePack { product_area } => require("product_area", product_area.as_str()),
            Self::ComponentFamily { family, members } => {
                require("family", family.as_str())?;
                if members.is_empty() {
                    return Err(ClusterError::invalid_parameter(format!(
                        "component_family rule '{}': members must not be empty",
                        family
                    )));
                }
                for member in members {
                    require("members.product_area", member.product_area.as_str())?;
                    require("members.component", member.component.as_str())?;
                }
                Ok(())
            }
            Self::Conjunction { name, .. } => require("name", name.as_str()),
            Self::NarrowKey { product_area, .. } => require("product_area", product_area.as_str()),
        }
    }
}

/// Ordered collection of [`MergeRule`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MergeRuleTable {
    rules: Vec<MergeRule>,
}

impl MergeRuleTable {
    pub fn new(rules: Vec<MergeRule>) -> Self {
        Self { rules }
    }

    /// A table with no rules; consolidation becomes a pass-through.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    #[must_use]
    pub fn with_rule(mut self, rule: MergeRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[MergeRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules of one pass, in table order.
    pub fn for_pass(&self, pass: MergePass) -> impl Iterator<Item = &MergeRule> {
        self.rules.iter().filter(move |r| r.pass() == pass)
    }

    /// Single-pack product areas, in table order.
    pub fn single_pack_areas(&self) -> Vec<&str> {
        self.rules
            .iter()
            .filter_map(|r| match r {
                MergeRule::SinglePack { product_area } => Some(product_area.as_str()),
                _ => None,
            })
            .collect()
    }

    /// `(product_area, component)` -> family lookup.
    pub fn family_index(&self) -> HashMap<(&str, &str), &str> {
        let mut index = HashMap::new();
        for rule in &self.rules {
            if let MergeRule::ComponentFamily { family, members } = rule {
                for m in members {
                    index
                        .entry((m.product_area.as_str(), m.component.as_str()))
                        .or_insert(family.as_str());
                }
            }
        }
        index
    }

    /// Whether `(direction, product_area)` is on the narrow allow-list.
    pub fn is_narrow_key(&self, direction: Direction, product_area: &str) -> bool {
        self.rules.iter().any(|r| {
            matches!(r, MergeRule::NarrowKey { direction: d, product_area: a }
                if *d == direction && a == product_area)
        })
    }

    /// Check every rule.
    ///
    /// Fails on empty names, empty families and on a `(product_area,
    /// component)` pair mapped into two different families.
    pub fn validate(&self) -> Result<(), ClusterError> {
        let mut seen: HashMap<(&str, &str), &str> = HashMap::new();
        for rule in &self.rules {
            rule.validate()?;
            if let MergeRule::ComponentFamily { family, members } = rule {
                for m in members {
                    let key = (m.product_area.as_str(), m.component.as_str());
                    if let Some(existing) = seen.insert(key, family.as_str()) {
                        if existing != family.as_str() {
                            return Err(ClusterError::invalid_parameter(format!(
                                "({}, {}) belongs to both '{}' and '{}' component families",
                                m.product_area, m.component, existing, family
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl Default for MergeRuleTable {
    /// Curated rules for the support taxonomy, mirrored in `config/default.toml`.
    fn default() -> Self {
        Self::new(vec![
            MergeRule::SinglePack {
                product_area: "account_access".into(),
            },
            MergeRule::SinglePack {
                product_area: "data_export".into(),
            },
            MergeRule::ComponentFamily {
                family: "scheduling".into(),
                members: vec![
                    ComponentRef::new("scheduling", "queue"),
                    ComponentRef::new("scheduling", "calendar"),
                    ComponentRef::new("scheduling", "time_slots"),
                    ComponentRef::new("publishing", "post_scheduler"),
                ],
            },
            MergeRule::ComponentFamily {
                family: "ai_writing".into(),
                members: vec![
                    ComponentRef::new("ai_creation", "caption_generator"),
                    ComponentRef::new("ai_creation", "ghostwriter"),
                    ComponentRef::new("ai_creation", "hashtag_suggestions"),
                ],
            },
            MergeRule::Conjunction {
                name: "duplicate_posts".into(),
                product_areas: vec!["publishing".into(), "scheduling".into()],
                components: Vec::new(),
                action_types: vec![ActionType::BugReport, ActionType::Complaint],
                direction: Direction::Excess,
            },
            MergeRule::Conjunction {
                name: "missing_analytics".into(),
                product_areas: vec!["analytics".into()],
                components: Vec::new(),
                action_types: Vec::new(),
                direction: Direction::Deficit,
            },
            MergeRule::NarrowKey {
                direction: Direction::Excess,
                product_area: "billing".into(),
            },
            MergeRule::NarrowKey {
                direction: Direction::Performance,
                product_area: "publishing".into(),
            },
            MergeRule::NarrowKey {
                direction: Direction::Creation,
                product_area: "integrations".into(),
            },
        ])
    }
}
