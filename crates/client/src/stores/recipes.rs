//! Recipe queries and mutations.
//!
//! Updates and deletes are optimistic: the cache shows the expected result
//! at once and is rolled back if the server refuses.

use chrono::Utc;

use cookbook_core::types::tag::normalize_tag_name;
use cookbook_core::{Recipe, RecipeDraft, RecipeId, RecipePage, RecipeSummary, Tag, TagId};

use crate::api::{ApiClient, ClientError, ListParams};
use crate::cache::{QueryCache, QueryKey};

/// Recipe store over the API client and the shared cache.
#[derive(Clone)]
pub struct RecipeStore {
    api: ApiClient,
    cache: QueryCache,
}

impl RecipeStore {
    #[must_use]
    pub const fn new(api: ApiClient, cache: QueryCache) -> Self {
        Self { api, cache }
    }

    /// The pages loaded so far for `params`, fetching the first page when
    /// nothing fresh is cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list(&self, params: &ListParams) -> Result<Vec<RecipePage>, ClientError> {
        let key = QueryKey::RecipeList(params.clone());
        self.cache
            .fetch(key, || async {
                Ok(vec![self.api.list_recipes(params, None).await?])
            })
            .await
    }

    /// Append the next page to the cached list. Returns the pages, unchanged
    /// when the last page had no cursor.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn load_more(&self, params: &ListParams) -> Result<Vec<RecipePage>, ClientError> {
        let key = QueryKey::RecipeList(params.clone());
        let started = self.cache.generation(&key);
        let mut pages: Vec<RecipePage> = match self.cache.get(&key).await {
            Some(pages) => pages,
            None => return self.list(params).await,
        };

        let Some(cursor) = pages.last().and_then(|page| page.cursor) else {
            return Ok(pages);
        };

        let next = self.api.list_recipes(params, Some(cursor)).await?;
        pages.push(next);
        // A mutation that ran meanwhile owns the list now.
        self.cache.set_if_current(key, started, pages.clone()).await;
        Ok(pages)
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get(&self, id: RecipeId) -> Result<Recipe, ClientError> {
        self.cache
            .fetch(QueryKey::Recipe(id), || self.api.get_recipe(id))
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn selection(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<RecipeSummary>, ClientError> {
        let key = QueryKey::Selection {
            category: category.map(str::to_owned),
        };
        self.cache
            .fetch(key, || self.api.recipe_selection(category))
            .await
    }

    /// Create a recipe and refresh the list it will appear in.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn create(
        &self,
        draft: &RecipeDraft,
        list: &ListParams,
    ) -> Result<Recipe, ClientError> {
        let recipe = self.api.create_recipe(draft).await?;
        self.cache.set(QueryKey::Recipe(recipe.id), recipe.clone()).await;
        self.invalidate_lists(list).await;
        Ok(recipe)
    }

    /// Optimistically update a recipe.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails; the cache is rolled back.
    pub async fn update(
        &self,
        id: RecipeId,
        draft: &RecipeDraft,
        list: &ListParams,
    ) -> Result<Recipe, ClientError> {
        let detail = QueryKey::Recipe(id);
        let list_key = QueryKey::RecipeList(list.clone());
        let keys = [detail.clone(), list_key.clone()];

        for key in &keys {
            self.cache.cancel(key);
        }
        let snapshot = self.cache.snapshot(&keys).await;

        if let Some(mut recipe) = self.cache.get::<Recipe>(&detail).await {
            apply_optimistic(&mut recipe, draft);
            let summary = recipe.to_summary();
            self.cache.set(detail.clone(), recipe).await;

            if let Some(mut pages) = self.cache.get::<Vec<RecipePage>>(&list_key).await {
                replace_summary(&mut pages, &summary);
                self.cache.set(list_key.clone(), pages).await;
            }
        }

        match self.api.update_recipe(id, draft).await {
            Ok(recipe) => {
                self.cache.set(detail, recipe.clone()).await;
                self.invalidate_lists(list).await;
                Ok(recipe)
            }
            Err(e) => {
                tracing::warn!(recipe_id = %id, error = %e, "update failed, rolling back");
                self.cache.restore(snapshot).await;
                Err(e)
            }
        }
    }

    /// Optimistically delete a recipe.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails; the cache is rolled back.
    pub async fn delete(&self, id: RecipeId, list: &ListParams) -> Result<(), ClientError> {
        let detail = QueryKey::Recipe(id);
        let list_key = QueryKey::RecipeList(list.clone());
        let keys = [detail.clone(), list_key.clone()];

        for key in &keys {
            self.cache.cancel(key);
        }
        let snapshot = self.cache.snapshot(&keys).await;

        self.cache.invalidate(&detail).await;
        if let Some(mut pages) = self.cache.get::<Vec<RecipePage>>(&list_key).await {
            remove_summary(&mut pages, id);
            self.cache.set(list_key, pages).await;
        }

        match self.api.delete_recipe(id).await {
            Ok(()) => {
                self.invalidate_lists(list).await;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(recipe_id = %id, error = %e, "delete failed, rolling back");
                self.cache.restore(snapshot).await;
                Err(e)
            }
        }
    }

    /// Add the bundled example recipes.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn generate(&self, list: &ListParams) -> Result<usize, ClientError> {
        let created = self.api.generate_recipes().await?;
        self.invalidate_lists(list).await;
        Ok(created)
    }

    async fn invalidate_lists(&self, list: &ListParams) {
        self.cache
            .invalidate(&QueryKey::RecipeList(list.clone()))
            .await;
        self.cache
            .invalidate(&QueryKey::Selection { category: None })
            .await;
        if list.category.is_some() {
            self.cache
                .invalidate(&QueryKey::Selection {
                    category: list.category.clone(),
                })
                .await;
        }
    }
}

/// The server's view of a recipe after applying `draft`, as far as it can be
/// predicted locally.
fn apply_optimistic(recipe: &mut Recipe, draft: &RecipeDraft) {
    recipe.apply_draft(draft, Utc::now());

    if let Some(tags) = &draft.tags {
        let mut next: Vec<Tag> = Vec::with_capacity(tags.len());
        for input in tags {
            let Some(name) = normalize_tag_name(&input.name) else {
                continue;
            };
            if next.iter().any(|tag| tag.name == name) {
                continue;
            }
            next.push(Tag {
                id: input
                    .id
                    .clone()
                    .unwrap_or_else(|| TagId::compose(&recipe.account_id, name)),
                name: name.to_owned(),
            });
        }
        recipe.tags = next;
    }
}

fn replace_summary(pages: &mut [RecipePage], summary: &RecipeSummary) {
    for existing in pages
        .iter_mut()
        .flat_map(|page| page.recipes.iter_mut())
        .filter(|existing| existing.id == summary.id)
    {
        existing.clone_from(summary);
    }
}

fn remove_summary(pages: &mut [RecipePage], id: RecipeId) {
    for page in pages {
        page.recipes.retain(|summary| summary.id != id);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cookbook_core::{AccountId, TagInput};

    use super::*;

    fn recipe() -> Recipe {
        Recipe {
            id: RecipeId::new(1),
            account_id: AccountId::new("acc"),
            title: "Apple pie".to_owned(),
            category: "Dessert".to_owned(),
            prep_time: None,
            cook_time: 40,
            servings: "6".to_owned(),
            cooked_count: 0,
            ingredients: String::new(),
            steps: String::new(),
            notes: String::new(),
            image_name: None,
            image_public_id: None,
            tags: vec![Tag {
                id: TagId::compose(&AccountId::new("acc"), "sweet"),
                name: "sweet".to_owned(),
            }],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_optimistic_tags_collapse_and_compose_ids() {
        let mut recipe = recipe();
        let mut draft = RecipeDraft::from(&recipe);
        draft.title = "Pear pie".to_owned();
        draft.tags = Some(vec![
            TagInput::named(" fruit "),
            TagInput::named("fruit"),
            TagInput::named(""),
        ]);

        apply_optimistic(&mut recipe, &draft);

        assert_eq!(recipe.title, "Pear pie");
        assert_eq!(recipe.tags.len(), 1);
        let tag = recipe.tags.first().unwrap();
        assert_eq!(tag.name, "fruit");
        assert_eq!(tag.id, TagId::compose(&recipe.account_id, "fruit"));
    }

    #[test]
    fn test_omitted_tags_are_kept() {
        let mut recipe = recipe();
        let mut draft = RecipeDraft::from(&recipe);
        draft.tags = None;
        apply_optimistic(&mut recipe, &draft);
        assert_eq!(recipe.tags.len(), 1);
    }

    #[test]
    fn test_page_edits() {
        let summary = recipe().to_summary();
        let other = RecipeSummary {
            id: RecipeId::new(2),
            ..summary.clone()
        };
        let mut pages = vec![
            RecipePage {
                recipes: vec![summary.clone()],
                cursor: Some(RecipeId::new(1)),
            },
            RecipePage {
                recipes: vec![other],
                cursor: None,
            },
        ];

        let renamed = RecipeSummary {
            title: "Renamed".to_owned(),
            ..summary
        };
        replace_summary(&mut pages, &renamed);
        assert_eq!(pages.first().unwrap().recipes.first().unwrap().title, "Renamed");

        remove_summary(&mut pages, RecipeId::new(2));
        assert!(pages.last().unwrap().recipes.is_empty());
    }
}
