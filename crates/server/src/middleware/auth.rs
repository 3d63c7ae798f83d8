//! Identity resolution middleware and extractors.
//!
//! Every request is resolved to at most one account:
//!
//! 1. `Authorization: Basic <accountId>` (an identity token issued to the
//!    client library, not RFC 7617 credentials), else
//! 2. the `session` cookie (demo or Google).
//!
//! The result is stored as a [`ResolvedAccount`] request extension. When a
//! Google session had to be refreshed, the new session cookie is appended to
//! the response.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, StatusCode, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};

use cookbook_core::AccountId;

use crate::error::set_sentry_account;
use crate::session::{self, Session};
use crate::state::AppState;

const BASIC_PREFIX: &str = "Basic ";

/// The account the current request acts for, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedAccount(pub Option<AccountId>);

/// Read an account id from the `Authorization` header.
#[must_use]
pub fn account_from_authorization(headers: &HeaderMap) -> Option<AccountId> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix(BASIC_PREFIX)?.trim();
    (!token.is_empty()).then(|| AccountId::new(token))
}

/// Middleware that resolves the caller's account.
///
/// Failures never reject the request here; handlers that need an account
/// answer 401 through [`RequireAccount`].
pub async fn resolve_account_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let mut refreshed = None;

    let account = match account_from_authorization(request.headers()) {
        Some(account) => Some(account),
        None => match Session::from_headers(request.headers()) {
            Ok(Some(session)) => match state.auth().resolve(&session).await {
                Ok(resolved) => {
                    refreshed = resolved.refreshed;
                    Some(resolved.account_id)
                }
                Err(e) if e.is_internal() => {
                    tracing::error!(error = %e, "session resolution failed");
                    None
                }
                Err(e) => {
                    tracing::info!(error = %e, "session rejected");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::debug!(error = %e, "malformed session cookie");
                None
            }
        },
    };

    if let Some(account) = &account {
        tracing::Span::current().record("account_id", account.as_str());
        set_sentry_account(account);
    }
    request.extensions_mut().insert(ResolvedAccount(account));

    let mut response = next.run(request).await;

    if let Some(tokens) = refreshed {
        tracing::debug!("refreshing session cookie");
        let cookie = session::google_session_cookie(&tokens, state.config().secure_cookies());
        session::append_set_cookies(response.headers_mut(), &[cookie]);
    }

    response
}

/// Extractor that requires a resolved account.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireAccount(account): RequireAccount) -> impl IntoResponse {
///     format!("Hello, {account}!")
/// }
/// ```
pub struct RequireAccount(pub AccountId);

/// Rejection when no account could be resolved.
pub struct Unauthenticated;

impl IntoResponse for Unauthenticated {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
    }
}

impl<S> FromRequestParts<S> for RequireAccount
where
    S: Send + Sync,
{
    type Rejection = Unauthenticated;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ResolvedAccount>()
            .and_then(|resolved| resolved.0.clone())
            .map(Self)
            .ok_or(Unauthenticated)
    }
}

/// Extractor that yields the resolved account when present.
pub struct OptionalAccount(pub Option<AccountId>);

impl<S> FromRequestParts<S> for OptionalAccount
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .extensions
                .get::<ResolvedAccount>()
                .and_then(|resolved| resolved.0.clone()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_basic_token_is_account_id() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic 9c1e0f"));
        assert_eq!(
            account_from_authorization(&headers),
            Some(AccountId::new("9c1e0f"))
        );
    }

    #[test]
    fn test_other_schemes_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert!(account_from_authorization(&headers).is_none());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic   "));
        assert!(account_from_authorization(&headers).is_none());
    }
}
