//! Shopping list route handlers.
//!
//! Reachable as `/api/shopping-list` and as `/api/recipes?resource=shopping-list`.

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use cookbook_core::{AccountId, ShoppingItem, ShoppingList, ShoppingListId};

use super::{json_body, non_empty};
use crate::error::{AppError, Result};
use crate::middleware::RequireAccount;
use crate::state::AppState;

/// Query parameters for shopping list updates.
#[derive(Debug, Default, Deserialize)]
pub struct ShoppingListParams {
    pub id: Option<String>,
}

/// Accepted update bodies: a bare item array or `{"items": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ItemsBody {
    Items(Vec<ShoppingItem>),
    Wrapped { items: Vec<ShoppingItem> },
}

impl ItemsBody {
    fn into_items(self) -> Vec<ShoppingItem> {
        match self {
            Self::Items(items) | Self::Wrapped { items } => items,
        }
    }
}

/// Return the caller's shopping list, creating it on first access.
#[instrument(skip(state))]
pub async fn get(
    State(state): State<AppState>,
    RequireAccount(account): RequireAccount,
) -> Result<Json<ShoppingList>> {
    list_for(&state, &account).await
}

/// Replace the items of the caller's shopping list.
#[instrument(skip(state, body))]
pub async fn put(
    State(state): State<AppState>,
    RequireAccount(account): RequireAccount,
    Query(params): Query<ShoppingListParams>,
    body: Bytes,
) -> Result<Json<ShoppingList>> {
    update(&state, &account, params.id.as_deref(), &body).await
}

pub(crate) async fn list_for(state: &AppState, account: &AccountId) -> Result<Json<ShoppingList>> {
    let list = state.store().shopping_list_for(account).await?;
    Ok(Json(list))
}

pub(crate) async fn update(
    state: &AppState,
    account: &AccountId,
    id: Option<&str>,
    body: &Bytes,
) -> Result<Json<ShoppingList>> {
    let id = non_empty(id)
        .map(ShoppingListId::new)
        .ok_or_else(|| AppError::BadRequest("Missing shopping list id.".to_string()))?;
    let items = json_body::<ItemsBody>(body)?.into_items();

    let existing = state
        .store()
        .get_shopping_list(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Shopping list not found.".to_string()))?;

    if &existing.account_id != account {
        tracing::warn!(shopping_list_id = %id, "shopping list owned by another account");
        return Err(AppError::Forbidden(
            "Shopping list does not belong to this account.".to_string(),
        ));
    }

    let list = state.store().update_shopping_list(&id, &items).await?;
    tracing::debug!(shopping_list_id = %id, items = list.items.len(), "shopping list updated");
    Ok(Json(list))
}
