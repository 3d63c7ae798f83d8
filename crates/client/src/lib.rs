//! Cookbook client library.
//!
//! Typed access to the cookbook API plus a query cache that mutations
//! update optimistically and roll back on failure.
//!
//! # Example
//!
//! ```rust,ignore
//! let client = Cookbook::new("http://localhost:3000")?;
//! client.user().sign_up_demo(&recaptcha_token).await?;
//! let pages = client.recipes().list(&ListParams::default()).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cache;
pub mod stores;

pub use api::{ApiClient, ClientError, ListParams};
pub use cache::{CachedValue, Generation, QueryCache, QueryKey};
pub use stores::{RecipeStore, SeasonalStore, ShoppingListStore, UserStore};

/// One API client and one cache shared by every store.
#[derive(Clone)]
pub struct Cookbook {
    api: ApiClient,
    cache: QueryCache,
}

impl Cookbook {
    /// # Errors
    ///
    /// Returns an error if `base_url` is invalid.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Ok(Self {
            api: ApiClient::new(base_url)?,
            cache: QueryCache::new(),
        })
    }

    #[must_use]
    pub const fn api(&self) -> &ApiClient {
        &self.api
    }

    #[must_use]
    pub const fn cache(&self) -> &QueryCache {
        &self.cache
    }

    #[must_use]
    pub fn recipes(&self) -> RecipeStore {
        RecipeStore::new(self.api.clone(), self.cache.clone())
    }

    #[must_use]
    pub fn shopping_list(&self) -> ShoppingListStore {
        ShoppingListStore::new(self.api.clone(), self.cache.clone())
    }

    #[must_use]
    pub fn user(&self) -> UserStore {
        UserStore::new(self.api.clone(), self.cache.clone())
    }
}
