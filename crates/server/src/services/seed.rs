//! Recipe seeding from a JSON fixture.
//!
//! New demo accounts start with the bundled recipe set; the CLI can seed
//! from any file with the same shape (`{"recipes": [RecipeDraft, …]}`).

use serde::Deserialize;
use thiserror::Error;

use cookbook_core::{AccountId, RecipeDraft};

use crate::db::{RepositoryError, Store};

const BUNDLED_RECIPES: &str = include_str!("../../fixtures/recipes.json");

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("invalid fixture: {0}")]
    Fixture(#[from] serde_json::Error),
    #[error("fixture recipe {index} is invalid: {source}")]
    InvalidRecipe {
        index: usize,
        source: cookbook_core::RecipeError,
    },
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Deserialize)]
struct Fixture {
    recipes: Vec<RecipeDraft>,
}

/// Parse and validate a fixture document.
///
/// # Errors
///
/// Returns an error if the JSON is malformed or a recipe fails validation.
pub fn parse_fixture(json: &str) -> Result<Vec<RecipeDraft>, SeedError> {
    let fixture: Fixture = serde_json::from_str(json)?;
    for (index, draft) in fixture.recipes.iter().enumerate() {
        draft
            .validate()
            .map_err(|source| SeedError::InvalidRecipe { index, source })?;
    }
    Ok(fixture.recipes)
}

/// The recipes bundled with the server.
///
/// # Errors
///
/// Returns an error if the bundled fixture is malformed.
pub fn bundled_recipes() -> Result<Vec<RecipeDraft>, SeedError> {
    parse_fixture(BUNDLED_RECIPES)
}

/// Create every draft under `account`, connecting-or-creating tags.
/// Returns the number of recipes created.
///
/// # Errors
///
/// Returns the first repository failure; recipes created before it remain.
pub async fn seed_recipes(
    store: &dyn Store,
    account: &AccountId,
    drafts: &[RecipeDraft],
) -> Result<usize, SeedError> {
    for draft in drafts {
        let recipe = store.create_recipe(account, draft).await?;
        tracing::debug!(recipe_id = %recipe.id, title = %recipe.title, "seeded recipe");
    }
    tracing::info!(account_id = %account, count = drafts.len(), "recipes seeded");
    Ok(drafts.len())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cookbook_core::RecipeQuery;

    use super::*;
    use crate::db::MemoryStore;

    #[test]
    fn test_bundled_fixture_is_valid() {
        let recipes = bundled_recipes().unwrap();
        assert!(recipes.len() >= 10);
        assert!(recipes.iter().all(|r| r.tags.as_ref().is_some_and(|t| !t.is_empty())));
    }

    #[test]
    fn test_rejects_untitled_recipe() {
        let err = parse_fixture(r#"{"recipes":[{"title":"ok"},{"title":""}]}"#).unwrap_err();
        assert!(matches!(err, SeedError::InvalidRecipe { index: 1, .. }));
    }

    #[tokio::test]
    async fn test_seeding_shares_tags_across_recipes() {
        let store = MemoryStore::new();
        let account = store.create_account().await.unwrap().id;
        let drafts = bundled_recipes().unwrap();

        let created = seed_recipes(&store, &account, &drafts).await.unwrap();
        assert_eq!(created, drafts.len());

        let page = store
            .list_recipes(&account, &RecipeQuery::default())
            .await
            .unwrap();
        assert_eq!(page.recipes.len(), drafts.len());

        let mut names: Vec<&str> = drafts
            .iter()
            .flat_map(|d| d.tags.iter().flatten().map(|t| t.name.as_str()))
            .collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(store.tag_count(&account).await, names.len());
    }
}
