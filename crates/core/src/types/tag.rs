//! Recipe tags.

use serde::{Deserialize, Serialize};

use super::TagId;

/// A stored tag. The id is `{accountId}:{name}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
}

/// A tag as submitted by a client; new tags have no id yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TagId>,
    pub name: String,
}

impl TagInput {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }
}

impl From<&Tag> for TagInput {
    fn from(tag: &Tag) -> Self {
        Self {
            id: Some(tag.id.clone()),
            name: tag.name.clone(),
        }
    }
}

/// Trim a tag name; blank names are dropped.
#[must_use]
pub fn normalize_tag_name(name: &str) -> Option<&str> {
    let trimmed = name.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
