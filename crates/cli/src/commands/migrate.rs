//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! cookbook-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `COOKBOOK_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! # Migration Files
//!
//! `crates/server/migrations/`

use cookbook_server::db::create_pool;

use super::{CommandError, database_url};

/// Run the server's migrations.
pub async fn run() -> Result<(), CommandError> {
    let database_url = database_url()?;

    tracing::info!("Connecting to database...");
    let pool = create_pool(&database_url).await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
