//! User and account route handlers.
//!
//! Sign-up comes in two flavors: demo accounts (guarded by reCAPTCHA and
//! seeded with the bundled recipes) and Google sign-in for users whose
//! email was registered beforehand.

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use cookie::Cookie;
use serde::Deserialize;
use tracing::instrument;

use cookbook_core::{Account, AccountId};

use super::{json_body, non_empty};
use crate::error::{AppError, Result, clear_sentry_account, set_sentry_account};
use crate::middleware::OptionalAccount;
use crate::services::cloudinary::account_folder;
use crate::services::seed;
use crate::session;
use crate::state::AppState;

/// Query parameters accepted by `/api/user`.
#[derive(Debug, Default, Deserialize)]
pub struct UserParams {
    pub logout: Option<String>,
    pub id: Option<String>,
}

/// Sign-up or sign-in request body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignInRequest {
    pub is_demo_user: bool,
    pub recaptcha_token: Option<String>,
    pub google_code: Option<String>,
}

/// `GET /api/user`: logout (`?logout`) or fetch an account (`?id`).
#[instrument(skip(state))]
pub async fn get(
    State(state): State<AppState>,
    OptionalAccount(caller): OptionalAccount,
    Query(params): Query<UserParams>,
) -> Result<Response> {
    if params.logout.is_some() {
        tracing::info!("logout");
        clear_sentry_account();
        let cookies = session::logout_cookies(state.config().secure_cookies());
        return Ok(with_cookies("OK".into_response(), &cookies));
    }

    let id = requested_account(&params)?;
    authorize(caller.as_ref(), &id)?;

    let account = state
        .store()
        .get_account(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;
    Ok(Json(account).into_response())
}

/// `POST /api/user`: demo sign-up, bare account creation, or Google sign-in.
#[instrument(skip(state, body))]
pub async fn post(State(state): State<AppState>, body: Bytes) -> Result<Response> {
    let request: SignInRequest = json_body(&body)?;

    if let Some(code) = non_empty(request.google_code.as_deref()) {
        return google_sign_in(&state, code).await;
    }

    let token = non_empty(request.recaptcha_token.as_deref())
        .ok_or_else(|| AppError::BadRequest("Missing reCAPTCHA token.".to_string()))?;
    if !state.bots().verify(token).await? {
        return Err(AppError::Forbidden("reCAPTCHA verification failed.".to_string()));
    }

    let account = state.store().create_account().await?;
    set_sentry_account(&account.id);
    prepare_account(&state, &account.id).await?;

    if !request.is_demo_user {
        tracing::info!(account_id = %account.id, "account created");
        return Ok(Json(account).into_response());
    }

    let drafts = seed::bundled_recipes()?;
    seed::seed_recipes(state.store(), &account.id, &drafts).await?;
    tracing::info!(account_id = %account.id, "demo account created");

    let cookies = session::demo_login_cookies(&account.id, state.config().secure_cookies());
    Ok(with_cookies(Json(account).into_response(), &cookies))
}

/// `DELETE /api/user?id`: remove the account and everything it owns.
#[instrument(skip(state))]
pub async fn delete(
    State(state): State<AppState>,
    OptionalAccount(caller): OptionalAccount,
    Query(params): Query<UserParams>,
) -> Result<Response> {
    let id = requested_account(&params)?;
    authorize(caller.as_ref(), &id)?;

    if state.store().get_account(&id).await?.is_none() {
        return Err(AppError::NotFound("User not found.".to_string()));
    }

    if let Err(e) = state.images().delete_folder(&account_folder(&id)).await {
        tracing::warn!(error = %e, account_id = %id, "failed to delete image folder");
    }

    state.store().delete_account(&id).await?;
    clear_sentry_account();
    tracing::info!(account_id = %id, "account deleted");
    Ok("User deleted.".into_response())
}

async fn google_sign_in(state: &AppState, code: &str) -> Result<Response> {
    let (account, tokens) = state.auth().login_with_google(code).await?;
    set_sentry_account(&account.id);
    prepare_account(state, &account.id).await?;

    let cookies = session::google_login_cookies(&tokens, state.config().secure_cookies());
    Ok(with_cookies(Json::<Account>(account).into_response(), &cookies))
}

/// Make sure the account has an image folder and a shopping list. The folder
/// is best effort.
async fn prepare_account(state: &AppState, account: &AccountId) -> Result<()> {
    if let Err(e) = state.images().create_folder(&account_folder(account)).await {
        tracing::warn!(error = %e, account_id = %account, "failed to create image folder");
    }
    state.store().shopping_list_for(account).await?;
    Ok(())
}

fn requested_account(params: &UserParams) -> Result<AccountId> {
    non_empty(params.id.as_deref())
        .map(AccountId::new)
        .ok_or_else(|| AppError::BadRequest("Missing user id.".to_string()))
}

fn authorize(caller: Option<&AccountId>, requested: &AccountId) -> Result<()> {
    match caller {
        None => Err(AppError::Unauthorized("Unauthorized".to_string())),
        Some(caller) if caller != requested => {
            tracing::warn!(account_id = %requested, "account requested by another account");
            Err(AppError::Forbidden("Access denied.".to_string()))
        }
        Some(_) => Ok(()),
    }
}

fn with_cookies(mut response: Response, cookies: &[Cookie<'static>]) -> Response {
    session::append_set_cookies(response.headers_mut(), cookies);
    response
}
