//! `PostgreSQL` [`Store`] over the `cookbook` schema.
//!
//! Queries are built at runtime (`query_as` / `QueryBuilder`) so the crate
//! compiles without a live database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};

use cookbook_core::{
    Account, AccountId, Email, Recipe, RecipeDraft, RecipeId, RecipePage, RecipeQuery,
    RecipeSummary, ShoppingItem, ShoppingList, ShoppingListId, Tag, TagChanges, TagId, User,
    UserId, UserProfile,
};

use super::{RepositoryError, Store};

const RECIPE_COLUMNS: &str = "id, account_id, title, category, prep_time, cook_time, servings, \
     cooked_count, ingredients, steps, notes, image_name, image_public_id, created_at, updated_at";

const USER_COLUMNS: &str = "id, account_id, email, first_name, last_name, display_name, \
     profile_image, google_id, created_at";

/// Rows may be written by operators outside the app, so the stored address
/// is lower-cased before comparing with a normalized `Email`.
const USER_BY_EMAIL: &str = "lower(email) = $1";

const USER_BY_GOOGLE_ID: &str = "google_id = $1";

#[derive(FromRow)]
struct RecipeRow {
    id: RecipeId,
    account_id: AccountId,
    title: String,
    category: String,
    prep_time: Option<i32>,
    cook_time: i32,
    servings: String,
    cooked_count: i32,
    ingredients: String,
    steps: String,
    notes: String,
    image_name: Option<String>,
    image_public_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RecipeRow {
    fn into_recipe(self, tags: Vec<Tag>) -> Recipe {
        Recipe {
            id: self.id,
            account_id: self.account_id,
            title: self.title,
            category: self.category,
            prep_time: self.prep_time,
            cook_time: self.cook_time,
            servings: self.servings,
            cooked_count: self.cooked_count,
            ingredients: self.ingredients,
            steps: self.steps,
            notes: self.notes,
            image_name: self.image_name,
            image_public_id: self.image_public_id,
            tags,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct SummaryRow {
    id: RecipeId,
    title: String,
    category: String,
    image_name: Option<String>,
}

impl From<SummaryRow> for RecipeSummary {
    fn from(row: SummaryRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            category: row.category,
            image_name: row.image_name,
        }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: UserId,
    account_id: AccountId,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    display_name: Option<String>,
    profile_image: Option<String>,
    google_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = row
            .email
            .as_deref()
            .map(Email::parse)
            .transpose()
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid email in database: {e}")))?;

        Ok(Self {
            id: row.id,
            account_id: row.account_id,
            email,
            first_name: row.first_name,
            last_name: row.last_name,
            display_name: row.display_name,
            profile_image: row.profile_image,
            google_id: row.google_id,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct TagRow {
    id: TagId,
    name: String,
}

#[derive(FromRow)]
struct ShoppingListRow {
    id: ShoppingListId,
    account_id: AccountId,
    items: Json<Vec<ShoppingItem>>,
}

impl From<ShoppingListRow> for ShoppingList {
    fn from(row: ShoppingListRow) -> Self {
        Self {
            id: row.id,
            account_id: row.account_id,
            items: row.items.0,
        }
    }
}

/// Store backed by a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn tags_for(&self, recipe: RecipeId) -> Result<Vec<Tag>, RepositoryError> {
        let rows = sqlx::query_as::<_, TagRow>(
            r"
            SELECT t.id, t.name
            FROM cookbook.tag t
            JOIN cookbook.recipe_tag rt ON rt.tag_id = t.id
            WHERE rt.recipe_id = $1
            ORDER BY t.name
            ",
        )
        .bind(recipe)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| Tag {
                id: r.id,
                name: r.name,
            })
            .collect())
    }

    async fn users_for(&self, account: &AccountId) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM cookbook.app_user WHERE account_id = $1 ORDER BY created_at, id"
        ))
        .bind(account)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(User::try_from).collect()
    }

    async fn find_user(&self, filter: &str, value: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM cookbook.app_user WHERE {filter}"
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }
}

/// Apply a tag diff inside an open transaction.
async fn apply_tag_changes(
    tx: &mut Transaction<'_, Postgres>,
    account: &AccountId,
    recipe: RecipeId,
    changes: &TagChanges,
) -> Result<(), RepositoryError> {
    for name in &changes.connect {
        let tag_id = TagId::compose(account, name);
        sqlx::query(
            r"
            INSERT INTO cookbook.tag (id, account_id, name)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO NOTHING
            ",
        )
        .bind(&tag_id)
        .bind(account)
        .bind(name)
        .execute(&mut **tx)
        .await?;

        sqlx::query(
            r"
            INSERT INTO cookbook.recipe_tag (recipe_id, tag_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(recipe)
        .bind(&tag_id)
        .execute(&mut **tx)
        .await?;
    }

    if !changes.disconnect.is_empty() {
        let ids: Vec<String> = changes
            .disconnect
            .iter()
            .map(|name| TagId::compose(account, name).into_inner())
            .collect();
        sqlx::query("DELETE FROM cookbook.recipe_tag WHERE recipe_id = $1 AND tag_id = ANY($2)")
            .bind(recipe)
            .bind(&ids)
            .execute(&mut **tx)
            .await?;
    }

    Ok(())
}

fn map_unique_violation(err: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(what.to_string());
    }
    RepositoryError::Database(err)
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_account(&self) -> Result<Account, RepositoryError> {
        let id = AccountId::generate();
        let user_id = UserId::generate();

        let mut tx = self.pool.begin().await?;
        let (created_at,): (DateTime<Utc>,) =
            sqlx::query_as("INSERT INTO cookbook.account (id) VALUES ($1) RETURNING created_at")
                .bind(&id)
                .fetch_one(&mut *tx)
                .await?;
        sqlx::query("INSERT INTO cookbook.app_user (id, account_id, created_at) VALUES ($1, $2, $3)")
            .bind(&user_id)
            .bind(&id)
            .bind(created_at)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(Account {
            users: vec![User::blank(user_id, id.clone(), created_at)],
            id,
            created_at,
        })
    }

    async fn get_account(&self, id: &AccountId) -> Result<Option<Account>, RepositoryError> {
        let row: Option<(DateTime<Utc>,)> =
            sqlx::query_as("SELECT created_at FROM cookbook.account WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        let Some((created_at,)) = row else {
            return Ok(None);
        };

        Ok(Some(Account {
            id: id.clone(),
            users: self.users_for(id).await?,
            created_at,
        }))
    }

    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        self.find_user(USER_BY_EMAIL, email.as_str()).await
    }

    async fn find_user_by_google_id(
        &self,
        google_id: &str,
    ) -> Result<Option<User>, RepositoryError> {
        self.find_user(USER_BY_GOOGLE_ID, google_id).await
    }

    async fn update_user_profile(
        &self,
        id: &UserId,
        profile: &UserProfile,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r"
            UPDATE cookbook.app_user
            SET first_name = $2, last_name = $3, display_name = $4,
                profile_image = $5, google_id = $6
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.display_name)
        .bind(&profile.profile_image)
        .bind(&profile.google_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "google id already linked"))?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    async fn delete_account(&self, id: &AccountId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM cookbook.tag WHERE account_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM cookbook.shopping_list WHERE account_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM cookbook.recipe WHERE account_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        // Users cascade with the account.
        let result = sqlx::query("DELETE FROM cookbook.account WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_recipes(
        &self,
        account: &AccountId,
        query: &RecipeQuery,
    ) -> Result<RecipePage, RepositoryError> {
        let limit = query.limit.get();

        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(
            "SELECT id, title, category, image_name FROM cookbook.recipe WHERE account_id = ",
        );
        builder.push_bind(account);
        if let Some(cursor) = query.cursor {
            builder.push(" AND id > ").push_bind(cursor);
        }
        if let Some(category) = &query.category {
            builder.push(" AND category = ").push_bind(category);
        }
        if let Some(tsquery) = query.search.to_tsquery() {
            builder
                .push(" AND to_tsvector('simple', title) @@ to_tsquery('simple', ")
                .push_bind(tsquery)
                .push(")");
        }
        builder
            .push(" ORDER BY id ASC LIMIT ")
            .push_bind(i64::from(limit) + 1);

        let mut recipes: Vec<RecipeSummary> = builder
            .build_query_as::<SummaryRow>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(RecipeSummary::from)
            .collect();

        let cursor = if recipes.len() > limit as usize {
            recipes.truncate(limit as usize);
            recipes.last().map(|r| r.id)
        } else {
            None
        };

        Ok(RecipePage { recipes, cursor })
    }

    async fn select_recipes(
        &self,
        account: &AccountId,
        category: Option<&str>,
        count: u32,
    ) -> Result<Vec<RecipeSummary>, RepositoryError> {
        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(
            "SELECT id, title, category, image_name FROM cookbook.recipe WHERE account_id = ",
        );
        builder.push_bind(account);
        if let Some(category) = category {
            builder.push(" AND category = ").push_bind(category);
        }
        builder
            .push(" ORDER BY random() LIMIT ")
            .push_bind(i64::from(count));

        let rows = builder
            .build_query_as::<SummaryRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(RecipeSummary::from).collect())
    }

    async fn get_recipe(&self, id: RecipeId) -> Result<Option<Recipe>, RepositoryError> {
        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM cookbook.recipe WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let tags = self.tags_for(row.id).await?;
                Ok(Some(row.into_recipe(tags)))
            }
            None => Ok(None),
        }
    }

    async fn create_recipe(
        &self,
        account: &AccountId,
        draft: &RecipeDraft,
    ) -> Result<Recipe, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            r"
            INSERT INTO cookbook.recipe
                (account_id, title, category, prep_time, cook_time, servings, cooked_count,
                 ingredients, steps, notes, image_name, image_public_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {RECIPE_COLUMNS}
            "
        ))
        .bind(account)
        .bind(draft.title.trim())
        .bind(&draft.category)
        .bind(draft.prep_time)
        .bind(draft.cook_time)
        .bind(&draft.servings)
        .bind(draft.cooked_count)
        .bind(&draft.ingredients)
        .bind(&draft.steps)
        .bind(&draft.notes)
        .bind(&draft.image_name)
        .bind(&draft.image_public_id)
        .fetch_one(&mut *tx)
        .await?;

        let changes = TagChanges::connect_all(draft.tag_names().unwrap_or_default());
        apply_tag_changes(&mut tx, account, row.id, &changes).await?;
        tx.commit().await?;

        let tags = self.tags_for(row.id).await?;
        Ok(row.into_recipe(tags))
    }

    async fn update_recipe(
        &self,
        id: RecipeId,
        draft: &RecipeDraft,
    ) -> Result<Recipe, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            r"
            UPDATE cookbook.recipe
            SET title = $2, category = $3, prep_time = $4, cook_time = $5, servings = $6,
                cooked_count = $7, ingredients = $8, steps = $9, notes = $10,
                image_name = $11, image_public_id = $12, updated_at = NOW()
            WHERE id = $1
            RETURNING {RECIPE_COLUMNS}
            "
        ))
        .bind(id)
        .bind(draft.title.trim())
        .bind(&draft.category)
        .bind(draft.prep_time)
        .bind(draft.cook_time)
        .bind(&draft.servings)
        .bind(draft.cooked_count)
        .bind(&draft.ingredients)
        .bind(&draft.steps)
        .bind(&draft.notes)
        .bind(&draft.image_name)
        .bind(&draft.image_public_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        if let Some(next) = draft.tag_names() {
            let previous: Vec<(String,)> = sqlx::query_as(
                r"
                SELECT t.name
                FROM cookbook.tag t
                JOIN cookbook.recipe_tag rt ON rt.tag_id = t.id
                WHERE rt.recipe_id = $1
                ",
            )
            .bind(id)
            .fetch_all(&mut *tx)
            .await?;

            let changes = TagChanges::between(previous.iter().map(|(n,)| n.as_str()), next);
            apply_tag_changes(&mut tx, &row.account_id, id, &changes).await?;
        }
        tx.commit().await?;

        let tags = self.tags_for(id).await?;
        Ok(row.into_recipe(tags))
    }

    async fn delete_recipe(&self, id: RecipeId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM cookbook.recipe WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn shopping_list_for(
        &self,
        account: &AccountId,
    ) -> Result<ShoppingList, RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO cookbook.shopping_list (id, account_id)
            VALUES ($1, $2)
            ON CONFLICT (account_id) DO NOTHING
            ",
        )
        .bind(ShoppingListId::generate())
        .bind(account)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                RepositoryError::NotFound
            }
            other => RepositoryError::Database(other),
        })?;

        let row = sqlx::query_as::<_, ShoppingListRow>(
            "SELECT id, account_id, items FROM cookbook.shopping_list WHERE account_id = $1",
        )
        .bind(account)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn get_shopping_list(
        &self,
        id: &ShoppingListId,
    ) -> Result<Option<ShoppingList>, RepositoryError> {
        let row = sqlx::query_as::<_, ShoppingListRow>(
            "SELECT id, account_id, items FROM cookbook.shopping_list WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ShoppingList::from))
    }

    async fn update_shopping_list(
        &self,
        id: &ShoppingListId,
        items: &[ShoppingItem],
    ) -> Result<ShoppingList, RepositoryError> {
        let row = sqlx::query_as::<_, ShoppingListRow>(
            r"
            UPDATE cookbook.shopping_list
            SET items = $2
            WHERE id = $1
            RETURNING id, account_id, items
            ",
        )
        .bind(id)
        .bind(Json(items))
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }
}
