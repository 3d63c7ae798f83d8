//! Recipes and the query/page types used to list them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AccountId, RecipeId, Tag, TagInput};
use crate::search::SearchQuery;

/// Errors raised when a submitted recipe is not acceptable.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RecipeError {
    #[error("recipe title cannot be empty")]
    EmptyTitle,
    #[error("{field} cannot be negative")]
    NegativeTime { field: &'static str },
}

/// A stored recipe with its tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: RecipeId,
    pub account_id: AccountId,
    pub title: String,
    pub category: String,
    pub prep_time: Option<i32>,
    pub cook_time: i32,
    pub servings: String,
    pub cooked_count: i32,
    pub ingredients: String,
    pub steps: String,
    pub notes: String,
    pub image_name: Option<String>,
    pub image_public_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Recipe {
    #[must_use]
    pub fn to_summary(&self) -> RecipeSummary {
        RecipeSummary {
            id: self.id,
            title: self.title.clone(),
            category: self.category.clone(),
            image_name: self.image_name.clone(),
        }
    }

    /// Copy the scalar fields of a draft onto this recipe. Tags are
    /// reconciled separately by the store.
    pub fn apply_draft(&mut self, draft: &RecipeDraft, now: DateTime<Utc>) {
        self.title = draft.title.trim().to_owned();
        self.category.clone_from(&draft.category);
        self.prep_time = draft.prep_time;
        self.cook_time = draft.cook_time;
        self.servings.clone_from(&draft.servings);
        self.cooked_count = draft.cooked_count;
        self.ingredients.clone_from(&draft.ingredients);
        self.steps.clone_from(&draft.steps);
        self.notes.clone_from(&draft.notes);
        self.image_name.clone_from(&draft.image_name);
        self.image_public_id.clone_from(&draft.image_public_id);
        self.updated_at = now;
    }
}

/// The list projection of a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeSummary {
    pub id: RecipeId,
    pub title: String,
    pub category: String,
    pub image_name: Option<String>,
}

/// A recipe as submitted for create or update.
///
/// `tags: None` on update leaves the current tag set untouched; an empty
/// array disconnects every tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecipeDraft {
    pub title: String,
    pub category: String,
    pub prep_time: Option<i32>,
    pub cook_time: i32,
    pub servings: String,
    pub cooked_count: i32,
    pub ingredients: String,
    pub steps: String,
    pub notes: String,
    pub image_name: Option<String>,
    pub image_public_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<TagInput>>,
}

impl RecipeDraft {
    /// # Errors
    ///
    /// Returns an error when the title is blank or a time is negative.
    pub fn validate(&self) -> Result<(), RecipeError> {
        if self.title.trim().is_empty() {
            return Err(RecipeError::EmptyTitle);
        }
        if self.prep_time.is_some_and(|t| t < 0) {
            return Err(RecipeError::NegativeTime { field: "prepTime" });
        }
        if self.cook_time < 0 {
            return Err(RecipeError::NegativeTime { field: "cookTime" });
        }
        Ok(())
    }

    /// Tag names carried by the draft, or none when tags were omitted.
    #[must_use]
    pub fn tag_names(&self) -> Option<Vec<&str>> {
        self.tags
            .as_ref()
            .map(|tags| tags.iter().map(|t| t.name.as_str()).collect())
    }
}

impl From<&Recipe> for RecipeDraft {
    fn from(recipe: &Recipe) -> Self {
        Self {
            title: recipe.title.clone(),
            category: recipe.category.clone(),
            prep_time: recipe.prep_time,
            cook_time: recipe.cook_time,
            servings: recipe.servings.clone(),
            cooked_count: recipe.cooked_count,
            ingredients: recipe.ingredients.clone(),
            steps: recipe.steps.clone(),
            notes: recipe.notes.clone(),
            image_name: recipe.image_name.clone(),
            image_public_id: recipe.image_public_id.clone(),
            tags: Some(recipe.tags.iter().map(TagInput::from).collect()),
        }
    }
}

/// One page of recipe summaries. `cursor` is the id of the last row when
/// more rows follow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipePage {
    pub recipes: Vec<RecipeSummary>,
    pub cursor: Option<RecipeId>,
}

/// Page size, clamped to `1..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimit(u32);

impl PageLimit {
    pub const DEFAULT: u32 = 20;
    pub const MAX: u32 = 100;

    #[must_use]
    pub fn new(limit: u32) -> Self {
        Self(limit.clamp(1, Self::MAX))
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl Default for PageLimit {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

/// Parameters for listing one page of an account's recipes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeQuery {
    pub search: SearchQuery,
    pub category: Option<String>,
    pub cursor: Option<RecipeId>,
    pub limit: PageLimit,
}

impl RecipeQuery {
    /// Whether a recipe passes the search and category filters. Cursor and
    /// ownership are applied by the caller.
    #[must_use]
    pub fn accepts(&self, recipe: &Recipe) -> bool {
        let category_ok = self
            .category
            .as_deref()
            .is_none_or(|category| recipe.category == category);
        category_ok && self.search.matches(&recipe.title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_limit_clamps() {
        assert_eq!(PageLimit::new(0).get(), 1);
        assert_eq!(PageLimit::new(500).get(), 100);
        assert_eq!(PageLimit::default().get(), 20);
    }

    #[test]
    fn test_draft_validation() {
        let mut draft = RecipeDraft {
            title: "  ".into(),
            ..RecipeDraft::default()
        };
        assert_eq!(draft.validate(), Err(RecipeError::EmptyTitle));

        draft.title = "Soup".into();
        draft.cook_time = -5;
        assert!(matches!(
            draft.validate(),
            Err(RecipeError::NegativeTime { field: "cookTime" })
        ));

        draft.cook_time = 15;
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_draft_deserializes_camel_case_with_defaults() {
        let draft: RecipeDraft =
            serde_json::from_str(r#"{"title":"Toast","cookTime":3,"imageName":"toast.jpg"}"#)
                .unwrap_or_default();
        assert_eq!(draft.title, "Toast");
        assert_eq!(draft.cook_time, 3);
        assert_eq!(draft.image_name.as_deref(), Some("toast.jpg"));
        assert!(draft.tags.is_none());
    }

    #[test]
    fn test_query_filters_category_and_search() {
        let now = Utc::now();
        let recipe = Recipe {
            id: RecipeId::new(1),
            account_id: AccountId::new("a"),
            title: "Apple crumble".into(),
            category: "dessert".into(),
            prep_time: None,
            cook_time: 40,
            servings: "4".into(),
            cooked_count: 0,
            ingredients: String::new(),
            steps: String::new(),
            notes: String::new(),
            image_name: None,
            image_public_id: None,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        let query = RecipeQuery {
            search: SearchQuery::parse("crumb"),
            category: Some("dessert".into()),
            ..RecipeQuery::default()
        };
        assert!(query.accepts(&recipe));

        let query = RecipeQuery {
            category: Some("lunch".into()),
            ..RecipeQuery::default()
        };
        assert!(!query.accepts(&recipe));
    }
}
