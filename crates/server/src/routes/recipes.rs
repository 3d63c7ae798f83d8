//! Recipe route handlers.
//!
//! One endpoint serves several resources and modes, selected by query
//! parameters:
//!
//! - `resource=recipes` (required) or `resource=shopping-list`
//! - `mode=crud` (default), `selection` (random summaries) or `generate`
//!   (seed the bundled recipes)

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use cookbook_core::{
    AccountId, PageLimit, Recipe, RecipeDraft, RecipeId, RecipeQuery, SearchQuery,
};

use super::{json_body, non_empty, shopping_list};
use crate::error::{AppError, Result};
use crate::middleware::RequireAccount;
use crate::services::seed;
use crate::state::AppState;

/// Number of recipes returned by `mode=selection`.
pub const SELECTION_SIZE: u32 = 3;

/// Query parameters accepted by `/api/recipes`.
#[derive(Debug, Default, Deserialize)]
pub struct RecipeParams {
    pub resource: Option<String>,
    pub mode: Option<String>,
    pub id: Option<String>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub cursor: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resource {
    Recipes,
    ShoppingList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Crud,
    Selection,
    Generate,
}

impl RecipeParams {
    fn resource(&self) -> Result<Resource> {
        match non_empty(self.resource.as_deref()) {
            Some("recipes") => Ok(Resource::Recipes),
            Some("shopping-list") => Ok(Resource::ShoppingList),
            Some(other) => Err(AppError::BadRequest(format!("Unknown resource: {other}"))),
            None => Err(AppError::BadRequest("Missing resource.".to_string())),
        }
    }

    fn mode(&self) -> Result<Mode> {
        match non_empty(self.mode.as_deref()) {
            None | Some("crud") => Ok(Mode::Crud),
            Some("selection") => Ok(Mode::Selection),
            Some("generate") => Ok(Mode::Generate),
            Some(other) => Err(AppError::BadRequest(format!("Unknown mode: {other}"))),
        }
    }

    fn recipe_id(&self) -> Result<Option<RecipeId>> {
        non_empty(self.id.as_deref())
            .map(|id| {
                id.parse()
                    .map_err(|_| AppError::BadRequest(format!("Invalid recipe id: {id}")))
            })
            .transpose()
    }

    fn require_recipe_id(&self) -> Result<RecipeId> {
        self.recipe_id()?
            .ok_or_else(|| AppError::BadRequest("Missing recipe id.".to_string()))
    }

    fn category(&self) -> Option<&str> {
        non_empty(self.category.as_deref())
    }

    fn list_query(&self, default_limit: PageLimit) -> Result<RecipeQuery> {
        let cursor = non_empty(self.cursor.as_deref())
            .map(|c| {
                c.parse::<RecipeId>()
                    .map_err(|_| AppError::BadRequest(format!("Invalid cursor: {c}")))
            })
            .transpose()?;
        let limit = non_empty(self.limit.as_deref())
            .map(|l| {
                l.parse::<u32>()
                    .map(PageLimit::new)
                    .map_err(|_| AppError::BadRequest(format!("Invalid limit: {l}")))
            })
            .transpose()?
            .unwrap_or(default_limit);

        Ok(RecipeQuery {
            search: SearchQuery::parse(self.search.as_deref().unwrap_or_default()),
            category: self.category().map(str::to_owned),
            cursor,
            limit,
        })
    }
}

/// Response of `mode=generate`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Generated {
    pub created: usize,
}

/// `GET /api/recipes`: a page, a random selection, or a single recipe.
#[instrument(skip(state))]
pub async fn get(
    State(state): State<AppState>,
    RequireAccount(account): RequireAccount,
    Query(params): Query<RecipeParams>,
) -> Result<Response> {
    if params.resource()? == Resource::ShoppingList {
        return Ok(shopping_list::list_for(&state, &account).await?.into_response());
    }

    if params.mode()? == Mode::Selection {
        let summaries = state
            .store()
            .select_recipes(&account, params.category(), SELECTION_SIZE)
            .await?;
        return Ok(Json(summaries).into_response());
    }

    if let Some(id) = params.recipe_id()? {
        let recipe = state
            .store()
            .get_recipe(id)
            .await?
            .filter(|recipe| recipe.account_id == account)
            .ok_or_else(|| AppError::NotFound("Recipe not found.".to_string()))?;
        return Ok(Json(recipe).into_response());
    }

    let query = params.list_query(state.config().page_size)?;
    let page = state.store().list_recipes(&account, &query).await?;
    tracing::debug!(
        count = page.recipes.len(),
        has_more = page.cursor.is_some(),
        "recipe page"
    );
    Ok(Json(page).into_response())
}

/// `POST /api/recipes`: create a recipe, or seed the bundled set.
#[instrument(skip(state, body))]
pub async fn post(
    State(state): State<AppState>,
    RequireAccount(account): RequireAccount,
    Query(params): Query<RecipeParams>,
    body: Bytes,
) -> Result<Response> {
    if params.resource()? != Resource::Recipes {
        return Err(AppError::BadRequest(
            "Shopping lists cannot be created directly.".to_string(),
        ));
    }

    if params.mode()? == Mode::Generate {
        let drafts = seed::bundled_recipes()?;
        let created = seed::seed_recipes(state.store(), &account, &drafts).await?;
        return Ok(Json(Generated { created }).into_response());
    }

    let draft: RecipeDraft = json_body(&body)?;
    draft
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let recipe = state.store().create_recipe(&account, &draft).await?;
    tracing::info!(recipe_id = %recipe.id, "recipe created");
    Ok(Json(recipe).into_response())
}

/// `PUT /api/recipes?id`: replace a recipe's fields and reconcile its tags.
#[instrument(skip(state, body))]
pub async fn put(
    State(state): State<AppState>,
    RequireAccount(account): RequireAccount,
    Query(params): Query<RecipeParams>,
    body: Bytes,
) -> Result<Response> {
    if params.resource()? == Resource::ShoppingList {
        return Ok(
            shopping_list::update(&state, &account, params.id.as_deref(), &body)
                .await?
                .into_response(),
        );
    }

    let id = params.require_recipe_id()?;
    let draft: RecipeDraft = json_body(&body)?;
    draft
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let existing = owned_recipe(&state, &account, id).await?;
    let recipe = state.store().update_recipe(id, &draft).await?;

    let replaced = existing
        .image_public_id
        .as_deref()
        .filter(|old| recipe.image_public_id.as_deref() != Some(*old));
    if let Some(old) = replaced {
        destroy_image(&state, old).await;
    }

    tracing::info!(recipe_id = %id, "recipe updated");
    Ok(Json(recipe).into_response())
}

/// `DELETE /api/recipes?id`.
#[instrument(skip(state))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAccount(account): RequireAccount,
    Query(params): Query<RecipeParams>,
) -> Result<Response> {
    if params.resource()? != Resource::Recipes {
        return Err(AppError::BadRequest(
            "Shopping lists cannot be deleted directly.".to_string(),
        ));
    }

    let id = params.require_recipe_id()?;
    let existing = owned_recipe(&state, &account, id).await?;
    state.store().delete_recipe(id).await?;

    if let Some(public_id) = existing.image_public_id.as_deref() {
        destroy_image(&state, public_id).await;
    }

    tracing::info!(recipe_id = %id, "recipe deleted");
    Ok("Recipe deleted.".into_response())
}

/// Load a recipe the caller may modify: 404 when missing, 403 when it
/// belongs to another account.
async fn owned_recipe(state: &AppState, account: &AccountId, id: RecipeId) -> Result<Recipe> {
    let recipe = state
        .store()
        .get_recipe(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Recipe not found.".to_string()))?;

    if &recipe.account_id != account {
        tracing::warn!(recipe_id = %id, "recipe owned by another account");
        return Err(AppError::Forbidden(
            "Recipe does not belong to this account.".to_string(),
        ));
    }
    Ok(recipe)
}

/// Remove an image from the host, logging failures.
async fn destroy_image(state: &AppState, public_id: &str) {
    if let Err(e) = state.images().destroy_image(public_id).await {
        tracing::warn!(error = %e, public_id, "failed to remove recipe image");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> RecipeParams {
        let query = pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        Query::<RecipeParams>::try_from_uri(&format!("/api/recipes?{query}").parse().unwrap())
            .unwrap()
            .0
    }

    #[test]
    fn test_resource_is_required() {
        assert!(params(&[]).resource().is_err());
        assert!(params(&[("resource", "orders")]).resource().is_err());
        assert_eq!(
            params(&[("resource", "shopping-list")]).resource().unwrap(),
            Resource::ShoppingList
        );
    }

    #[test]
    fn test_mode_defaults_to_crud() {
        assert_eq!(params(&[]).mode().unwrap(), Mode::Crud);
        assert_eq!(
            params(&[("mode", "selection")]).mode().unwrap(),
            Mode::Selection
        );
        assert!(params(&[("mode", "random")]).mode().is_err());
    }

    #[test]
    fn test_non_numeric_id_is_rejected() {
        assert!(params(&[("id", "abc")]).recipe_id().is_err());
        assert_eq!(
            params(&[("id", "7")]).recipe_id().unwrap(),
            Some(RecipeId::new(7))
        );
        assert!(params(&[]).require_recipe_id().is_err());
    }

    #[test]
    fn test_list_query_parses_paging() {
        let query = params(&[
            ("search", "apple%20pear"),
            ("category", "Dessert"),
            ("cursor", "12"),
            ("limit", "500"),
        ])
        .list_query(PageLimit::default())
        .unwrap();

        assert_eq!(query.search.tokens(), ["apple", "pear"]);
        assert_eq!(query.category.as_deref(), Some("Dessert"));
        assert_eq!(query.cursor, Some(RecipeId::new(12)));
        assert_eq!(query.limit.get(), PageLimit::MAX);
    }

    #[test]
    fn test_list_query_uses_default_limit() {
        let query = params(&[("category", "")])
            .list_query(PageLimit::new(5))
            .unwrap();
        assert_eq!(query.limit.get(), 5);
        assert!(query.category.is_none());
        assert!(query.search.is_empty());
    }

    #[test]
    fn test_bad_cursor_is_rejected() {
        assert!(
            params(&[("cursor", "next")])
                .list_query(PageLimit::default())
                .is_err()
        );
    }
}
