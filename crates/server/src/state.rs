//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::db::{MemoryStore, PgStore, Store, create_pool};
use crate::services::auth::{AuthError, AuthService, GoogleClient, IdentityProvider};
use crate::services::cloudinary::{CloudinaryClient, ImageHost, ImageHostError, NoopImageHost};
use crate::services::recaptcha::{BotVerifier, RecaptchaClient, RecaptchaError};

/// Error assembling application state from configuration.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("database connection failed: {0}")]
    Database(#[from] sqlx::Error),
    #[error("google client: {0}")]
    Google(#[from] AuthError),
    #[error("image host client: {0}")]
    ImageHost(#[from] ImageHostError),
    #[error("recaptcha client: {0}")]
    Recaptcha(#[from] RecaptchaError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// store and the third-party collaborators, each behind a trait so tests
/// can substitute fakes.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    store: Arc<dyn Store>,
    identity: Option<Arc<dyn IdentityProvider>>,
    images: Arc<dyn ImageHost>,
    bots: Arc<dyn BotVerifier>,
}

impl AppState {
    /// Create application state from explicit parts.
    #[must_use]
    pub fn new(
        config: ServerConfig,
        store: Arc<dyn Store>,
        identity: Option<Arc<dyn IdentityProvider>>,
        images: Arc<dyn ImageHost>,
        bots: Arc<dyn BotVerifier>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                identity,
                images,
                bots,
            }),
        }
    }

    /// Build the production state: `PostgreSQL` when a database URL is
    /// configured (memory otherwise) and real clients for every configured
    /// integration.
    ///
    /// # Errors
    ///
    /// Returns an error if the database is unreachable or an HTTP client
    /// fails to build.
    pub async fn from_config(config: ServerConfig) -> Result<Self, StateError> {
        let store: Arc<dyn Store> = match &config.database_url {
            Some(url) => {
                let pool = create_pool(url).await?;
                tracing::info!("Database pool created");
                Arc::new(PgStore::new(pool))
            }
            None => {
                tracing::warn!("No database configured, using in-memory store");
                Arc::new(MemoryStore::new())
            }
        };

        let identity: Option<Arc<dyn IdentityProvider>> = match &config.google {
            Some(google) => Some(Arc::new(GoogleClient::new(google)?)),
            None => {
                tracing::info!("Google sign-in disabled");
                None
            }
        };

        let images: Arc<dyn ImageHost> = match &config.cloudinary {
            Some(cloudinary) => Arc::new(CloudinaryClient::new(cloudinary)?),
            None => {
                tracing::info!("Image host disabled");
                Arc::new(NoopImageHost)
            }
        };

        let bots: Arc<dyn BotVerifier> =
            Arc::new(RecaptchaClient::new(config.recaptcha_secret.clone())?);

        Ok(Self::new(config, store, identity, images, bots))
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    #[must_use]
    pub fn identity(&self) -> Option<&dyn IdentityProvider> {
        self.inner.identity.as_deref()
    }

    #[must_use]
    pub fn images(&self) -> &dyn ImageHost {
        self.inner.images.as_ref()
    }

    #[must_use]
    pub fn bots(&self) -> &dyn BotVerifier {
        self.inner.bots.as_ref()
    }

    /// Authentication service bound to this state's store and provider.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(self.store(), self.identity())
    }
}
