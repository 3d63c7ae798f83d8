//! Integration test harness for Cookbook.
//!
//! Builds the full router over the in-memory store with fake third-party
//! collaborators, so every test runs without a database or network.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p cookbook-integration-tests
//! ```
//!
//! # Fakes
//!
//! - [`FakeVerifier`] accepts only [`VALID_RECAPTCHA`]
//! - [`FakeIdentity`] signs in [`GOOGLE_EMAIL`] for [`GOOGLE_CODE`]
//! - [`RecordingImageHost`] records every call

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, Bytes},
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tower::ServiceExt;

use cookbook_core::{Account, AccountId, Email};
use cookbook_server::db::{MemoryStore, Store};
use cookbook_server::services::auth::{AuthError, GoogleTokens, GoogleUserInfo, IdentityProvider};
use cookbook_server::services::cloudinary::{ImageHost, ImageHostError};
use cookbook_server::services::recaptcha::{BotVerifier, RecaptchaError};
use cookbook_server::{AppState, ServerConfig, router};

/// The only token [`FakeVerifier`] accepts.
pub const VALID_RECAPTCHA: &str = "valid-token";
/// The only code [`FakeIdentity`] exchanges.
pub const GOOGLE_CODE: &str = "good-code";
/// Email of the Google account behind [`GOOGLE_CODE`].
pub const GOOGLE_EMAIL: &str = "cook@example.com";
/// Google subject id of that account.
pub const GOOGLE_SUB: &str = "google-sub-1";

/// reCAPTCHA stand-in.
pub struct FakeVerifier;

#[async_trait]
impl BotVerifier for FakeVerifier {
    async fn verify(&self, token: &str) -> Result<bool, RecaptchaError> {
        Ok(token == VALID_RECAPTCHA)
    }
}

/// Google stand-in. Id tokens are `id:<sub>`.
pub struct FakeIdentity;

impl FakeIdentity {
    /// Tokens valid for an hour from now.
    #[must_use]
    pub fn tokens(sub: &str) -> GoogleTokens {
        GoogleTokens {
            access_token: format!("access:{sub}"),
            id_token: format!("id:{sub}"),
            refresh_token: format!("refresh:{sub}"),
            expires_in: chrono::Utc::now().timestamp_millis() + 3_600_000,
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn exchange_code(&self, code: &str) -> Result<GoogleTokens, AuthError> {
        if code == GOOGLE_CODE {
            Ok(Self::tokens(GOOGLE_SUB))
        } else {
            Err(AuthError::Api {
                status: 400,
                message: "invalid_grant".to_string(),
            })
        }
    }

    async fn refresh(&self, tokens: &GoogleTokens) -> Result<GoogleTokens, AuthError> {
        let sub = tokens
            .refresh_token
            .strip_prefix("refresh:")
            .ok_or_else(|| AuthError::InvalidIdToken("bad refresh token".to_string()))?;
        Ok(Self::tokens(sub))
    }

    async fn user_info(&self, access_token: &str) -> Result<GoogleUserInfo, AuthError> {
        let sub = access_token
            .strip_prefix("access:")
            .ok_or_else(|| AuthError::InvalidIdToken("bad access token".to_string()))?;
        Ok(GoogleUserInfo {
            sub: sub.to_string(),
            email: Some(GOOGLE_EMAIL.to_string()),
            name: Some("Ada Cook".to_string()),
            given_name: Some("Ada".to_string()),
            family_name: Some("Cook".to_string()),
            picture: None,
        })
    }

    async fn verify_id_token(&self, id_token: &str) -> Result<String, AuthError> {
        id_token
            .strip_prefix("id:")
            .map(str::to_string)
            .ok_or_else(|| AuthError::InvalidIdToken("bad id token".to_string()))
    }
}

/// Image host that records calls instead of making them.
#[derive(Default)]
pub struct RecordingImageHost {
    calls: Mutex<Vec<String>>,
}

impl RecordingImageHost {
    fn record(&self, call: String) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    /// Calls so far, as `create_folder:<path>`, `delete_folder:<path>` or
    /// `destroy_image:<public id>`.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ImageHost for RecordingImageHost {
    async fn create_folder(&self, path: &str) -> Result<(), ImageHostError> {
        self.record(format!("create_folder:{path}"));
        Ok(())
    }

    async fn delete_folder(&self, path: &str) -> Result<(), ImageHostError> {
        self.record(format!("delete_folder:{path}"));
        Ok(())
    }

    async fn destroy_image(&self, public_id: &str) -> Result<(), ImageHostError> {
        self.record(format!("destroy_image:{public_id}"));
        Ok(())
    }
}

/// A buffered response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    /// Decode the body as JSON.
    ///
    /// # Panics
    ///
    /// Panics if the body is not the expected JSON.
    #[must_use]
    pub fn json<T: DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).unwrap_or_else(|e| {
            panic!(
                "expected JSON body ({e}), got {}: {}",
                self.status,
                self.text()
            )
        })
    }

    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Every `Set-Cookie` header value.
    #[must_use]
    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok().map(str::to_string))
            .collect()
    }

    /// The `name=value` pair of a `Set-Cookie` header, ready for a `Cookie`
    /// request header.
    #[must_use]
    pub fn cookie_pair(&self, name: &str) -> Option<String> {
        self.set_cookies().into_iter().find_map(|c| {
            let pair = c.split(';').next()?.trim().to_string();
            pair.starts_with(&format!("{name}=")).then_some(pair)
        })
    }
}

/// How a test request identifies itself.
#[derive(Debug, Clone, Copy)]
pub enum Auth<'a> {
    Anonymous,
    Token(&'a AccountId),
    Cookie(&'a str),
}

/// The application under test.
#[derive(Clone)]
pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub images: Arc<RecordingImageHost>,
    router: Router,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ServerConfig::development())
    }

    #[must_use]
    pub fn with_config(config: ServerConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let images = Arc::new(RecordingImageHost::default());
        let identity: Arc<dyn IdentityProvider> = Arc::new(FakeIdentity);
        let state = AppState::new(
            config,
            store.clone(),
            Some(identity),
            images.clone(),
            Arc::new(FakeVerifier),
        );
        let router = router(state.clone());
        Self {
            state,
            store,
            images,
            router,
        }
    }

    /// An account with its shopping list, created directly in the store.
    ///
    /// # Panics
    ///
    /// Panics if the store fails.
    pub async fn account(&self) -> Account {
        let account = self.store.create_account().await.expect("create account");
        self.store
            .shopping_list_for(&account.id)
            .await
            .expect("create shopping list");
        account
    }

    /// Register [`GOOGLE_EMAIL`] under a new account so Google sign-in is
    /// allowed.
    ///
    /// # Panics
    ///
    /// Panics if the store fails.
    pub async fn google_account(&self) -> Account {
        let account = self.store.create_account().await.expect("create account");
        self.store
            .add_user(&account.id, Email::parse(GOOGLE_EMAIL).expect("valid email"))
            .await
            .expect("add user");
        account
    }

    /// Send a request through the router.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body cannot be read.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        auth: Auth<'_>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        match auth {
            Auth::Anonymous => {}
            Auth::Token(account) => {
                builder = builder.header(header::AUTHORIZATION, format!("Basic {account}"));
            }
            Auth::Cookie(cookie) => {
                builder = builder.header(header::COOKIE, cookie);
            }
        }

        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).expect("valid request"))
            .await
            .expect("infallible router");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("readable body")
            .to_bytes();

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, auth: Auth<'_>) -> TestResponse {
        self.request(Method::GET, uri, auth, None).await
    }

    pub async fn post(&self, uri: &str, auth: Auth<'_>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, auth, Some(body)).await
    }

    pub async fn put(&self, uri: &str, auth: Auth<'_>, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, auth, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, auth: Auth<'_>) -> TestResponse {
        self.request(Method::DELETE, uri, auth, None).await
    }

    /// Serve the router on an ephemeral local port.
    ///
    /// # Panics
    ///
    /// Panics if no port can be bound.
    pub async fn spawn(&self) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local address");
        let router = self.router.clone();
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                panic!("test server failed: {e}");
            }
        });
        addr
    }
}
