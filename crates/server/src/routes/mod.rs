//! HTTP route handlers for the cookbook API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Store connectivity check
//!
//! # Recipes (resource=recipes|shopping-list, mode=crud|selection|generate)
//! GET    /api/recipes          - List page, selection, or one recipe (?id)
//! POST   /api/recipes          - Create a recipe, or seed fixtures (mode=generate)
//! PUT    /api/recipes?id       - Update a recipe
//! DELETE /api/recipes?id       - Delete a recipe
//!
//! # Shopping list
//! GET  /api/shopping-list      - The account's list (created lazily)
//! PUT  /api/shopping-list?id   - Replace the list's items
//!
//! # User
//! GET    /api/user?logout      - Clear session cookies
//! GET    /api/user?id          - Account with users
//! POST   /api/user             - Demo sign-up or Google sign-in
//! DELETE /api/user?id          - Delete the account and everything in it
//! ```

pub mod recipes;
pub mod shopping_list;
pub mod user;

use axum::{
    Router,
    body::Bytes,
    extract::{Request, State},
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    routing::get,
};
use serde::de::DeserializeOwned;
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::middleware::{request_id_middleware, resolve_account_middleware};
use crate::state::AppState;

/// Create the `/api` routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/recipes",
            get(recipes::get)
                .post(recipes::post)
                .put(recipes::put)
                .delete(recipes::delete),
        )
        .route(
            "/shopping-list",
            get(shopping_list::get).put(shopping_list::put),
        )
        .route("/user", get(user::get).post(user::post).delete(user::delete))
}

/// Build the complete application router with its middleware stack.
///
/// Sentry layers are added by the binary so tests can drive this router
/// directly.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api", api_routes())
        // -- Middleware stack (applied bottom-up) --
        .layer(from_fn_with_state(state.clone(), resolve_account_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
                account_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Decode a JSON request body, answering 400 when it is missing or malformed.
pub(crate) fn json_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::BadRequest("Missing request body.".to_string()));
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid request body: {e}")))
}

/// Treat absent and blank query values alike.
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_body_is_missing() {
        let err = json_body::<serde_json::Value>(&Bytes::from_static(b"  \n")).unwrap_err();
        assert_eq!(err.to_string(), "Bad request: Missing request body.");
    }

    #[test]
    fn test_malformed_body_is_bad_request() {
        let err = json_body::<serde_json::Value>(&Bytes::from_static(b"{nope")).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_non_empty_trims() {
        assert_eq!(non_empty(Some("  ")), None);
        assert_eq!(non_empty(Some(" x ")), Some("x"));
        assert_eq!(non_empty(None), None);
    }
}
