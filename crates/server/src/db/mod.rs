//! Persistence for accounts, recipes, tags and shopping lists.
//!
//! # Database: `cookbook` schema
//!
//! ## Tables
//!
//! - `account` - Tenant root
//! - `app_user` - Users under an account (email whitelist, Google subject id)
//! - `recipe` - Recipes, serial ids
//! - `tag` / `recipe_tag` - Per-account tags and their recipe links
//! - `shopping_list` - One JSONB item list per account
//!
//! Two [`Store`] implementations share the same semantics:
//! [`PgStore`] for production and [`MemoryStore`] for local runs and tests.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p cookbook-cli -- migrate
//! ```

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use cookbook_core::{
    Account, AccountId, Email, Recipe, RecipeDraft, RecipeId, RecipePage, RecipeQuery,
    RecipeSummary, ShoppingItem, ShoppingList, ShoppingListId, User, UserId, UserProfile,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Storage operations used by the HTTP handlers.
///
/// Reads by id do not check ownership; handlers compare the owning account
/// with the resolved caller so they can tell 403 from 404.
#[async_trait]
pub trait Store: Send + Sync {
    /// Connectivity check for the readiness probe.
    async fn ping(&self) -> Result<(), RepositoryError>;

    /// Create an account with one blank user.
    async fn create_account(&self) -> Result<Account, RepositoryError>;

    /// Fetch an account with its users.
    async fn get_account(&self, id: &AccountId) -> Result<Option<Account>, RepositoryError>;

    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    async fn find_user_by_google_id(&self, google_id: &str)
    -> Result<Option<User>, RepositoryError>;

    /// Overwrite provider-owned profile fields and link the Google id.
    async fn update_user_profile(
        &self,
        id: &UserId,
        profile: &UserProfile,
    ) -> Result<User, RepositoryError>;

    /// Delete an account's tags, shopping list, recipes, users and the
    /// account itself, all or nothing.
    async fn delete_account(&self, id: &AccountId) -> Result<(), RepositoryError>;

    /// One page of the account's recipes in ascending id order.
    async fn list_recipes(
        &self,
        account: &AccountId,
        query: &RecipeQuery,
    ) -> Result<RecipePage, RepositoryError>;

    /// Up to `count` random summaries, optionally within one category.
    async fn select_recipes(
        &self,
        account: &AccountId,
        category: Option<&str>,
        count: u32,
    ) -> Result<Vec<RecipeSummary>, RepositoryError>;

    async fn get_recipe(&self, id: RecipeId) -> Result<Option<Recipe>, RepositoryError>;

    /// Insert a recipe and connect-or-create its tags.
    async fn create_recipe(
        &self,
        account: &AccountId,
        draft: &RecipeDraft,
    ) -> Result<Recipe, RepositoryError>;

    /// Replace the recipe's fields and reconcile tags by name.
    async fn update_recipe(
        &self,
        id: RecipeId,
        draft: &RecipeDraft,
    ) -> Result<Recipe, RepositoryError>;

    async fn delete_recipe(&self, id: RecipeId) -> Result<(), RepositoryError>;

    /// The account's shopping list, created empty on first access.
    async fn shopping_list_for(&self, account: &AccountId)
    -> Result<ShoppingList, RepositoryError>;

    async fn get_shopping_list(
        &self,
        id: &ShoppingListId,
    ) -> Result<Option<ShoppingList>, RepositoryError>;

    async fn update_shopping_list(
        &self,
        id: &ShoppingListId,
        items: &[ShoppingItem],
    ) -> Result<ShoppingList, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
