//! Seed recipes into an account.
//!
//! Reads a JSON fixture (`{"recipes": [...]}`, the bundled set by default),
//! validates every recipe before touching the database, then creates them
//! with their tags.

use std::path::Path;

use cookbook_core::AccountId;
use cookbook_server::db::{PgStore, Store, create_pool};
use cookbook_server::services::seed::{bundled_recipes, parse_fixture, seed_recipes};
use tracing::info;

use super::{CommandError, database_url};

/// Seed recipes into `account`, or into a new account when none is given.
pub async fn run(account: Option<&str>, file: Option<&Path>) -> Result<(), CommandError> {
    let drafts = match file {
        Some(path) => {
            info!(path = %path.display(), "Loading recipes from file");
            let content =
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| CommandError::Io {
                        path: path.display().to_string(),
                        source,
                    })?;
            parse_fixture(&content)?
        }
        None => bundled_recipes()?,
    };
    info!(count = drafts.len(), "Recipes validated");

    let pool = create_pool(&database_url()?).await?;
    let store = PgStore::new(pool);
    info!("Connected to database");

    let account = match account {
        Some(id) => {
            let id = AccountId::new(id);
            store
                .get_account(&id)
                .await?
                .ok_or_else(|| CommandError::AccountNotFound(id.to_string()))?
                .id
        }
        None => {
            let account = store.create_account().await?;
            store.shopping_list_for(&account.id).await?;
            info!(account_id = %account.id, "Created account");
            account.id
        }
    };

    let created = seed_recipes(&store, &account, &drafts).await?;
    info!(account_id = %account, created, "Seeding complete");
    Ok(())
}
