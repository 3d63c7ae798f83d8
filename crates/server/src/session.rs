//! Session cookie codec.
//!
//! The `session` cookie holds base64-encoded JSON of either a demo session
//! (`{"type":"demo","demoUserId":…}`) or Google tokens
//! (`{"type":"google","accessToken",…}`). Nothing is stored server side.
//! A second, script-readable `isAuthenticated` cookie lets the client know
//! whether to show signed-in pages.

use axum::http::{HeaderMap, HeaderValue, header};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use cookie::time::{Duration, OffsetDateTime};
use cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use cookbook_core::AccountId;

use crate::services::auth::GoogleTokens;

pub const SESSION_COOKIE: &str = "session";
pub const IS_AUTHENTICATED_COOKIE: &str = "isAuthenticated";

const DEMO_SESSION_DAYS: i64 = 365;
const GOOGLE_SESSION_DAYS: i64 = 30;
const IS_AUTHENTICATED_DAYS: i64 = 30;

/// Errors decoding a session cookie.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("session is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Decoded session cookie contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Session {
    Demo {
        #[serde(rename = "demoUserId")]
        demo_user_id: AccountId,
    },
    Google(GoogleTokens),
}

impl Session {
    #[must_use]
    pub fn encode(&self) -> String {
        // Serializing a derive-only enum of strings and integers cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        STANDARD.encode(json)
    }

    /// # Errors
    ///
    /// Returns an error if the value is not base64 JSON of a known session
    /// type.
    pub fn decode(value: &str) -> Result<Self, SessionError> {
        let bytes = STANDARD.decode(value.trim())?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Read the `session` cookie from request headers. `Ok(None)` when the
    /// cookie is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the cookie is present but malformed.
    pub fn from_headers(headers: &HeaderMap) -> Result<Option<Self>, SessionError> {
        let Some(value) = find_cookie(headers, SESSION_COOKIE) else {
            return Ok(None);
        };
        Self::decode(&value).map(Some)
    }
}

/// Find a cookie value by name across all `Cookie` headers.
#[must_use]
pub fn find_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_owned())
}

fn session_cookie(session: &Session, days: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session.encode()))
        .http_only(true)
        .path("/")
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::days(days))
        .build()
}

fn is_authenticated_cookie(value: bool, secure: bool) -> Cookie<'static> {
    Cookie::build((IS_AUTHENTICATED_COOKIE, if value { "true" } else { "false" }))
        .http_only(false)
        .path("/")
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::days(IS_AUTHENTICATED_DAYS))
        .build()
}

/// Cookies that sign in a demo account.
#[must_use]
pub fn demo_login_cookies(account: &AccountId, secure: bool) -> Vec<Cookie<'static>> {
    let session = Session::Demo {
        demo_user_id: account.clone(),
    };
    vec![
        session_cookie(&session, DEMO_SESSION_DAYS, secure),
        is_authenticated_cookie(true, secure),
    ]
}

/// Cookies that sign in with Google tokens.
#[must_use]
pub fn google_login_cookies(tokens: &GoogleTokens, secure: bool) -> Vec<Cookie<'static>> {
    vec![
        google_session_cookie(tokens, secure),
        is_authenticated_cookie(true, secure),
    ]
}

/// Replacement session cookie after a token refresh.
#[must_use]
pub fn google_session_cookie(tokens: &GoogleTokens, secure: bool) -> Cookie<'static> {
    session_cookie(&Session::Google(tokens.clone()), GOOGLE_SESSION_DAYS, secure)
}

/// Cookies that expire the session.
#[must_use]
pub fn logout_cookies(secure: bool) -> Vec<Cookie<'static>> {
    let expire = |cookie: Cookie<'static>| {
        let mut cookie = cookie;
        cookie.set_max_age(Duration::ZERO);
        cookie.set_expires(OffsetDateTime::UNIX_EPOCH);
        cookie
    };
    vec![
        expire(
            Cookie::build((SESSION_COOKIE, ""))
                .http_only(true)
                .path("/")
                .secure(secure)
                .build(),
        ),
        expire(is_authenticated_cookie(false, secure)),
    ]
}

/// Append cookies as `Set-Cookie` headers.
pub fn append_set_cookies(headers: &mut HeaderMap, cookies: &[Cookie<'static>]) {
    for cookie in cookies {
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                headers.append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::warn!(cookie = cookie.name(), error = %e, "unencodable cookie"),
        }
    }
}
