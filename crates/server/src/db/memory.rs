//! In-memory [`Store`] for local development and tests.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use rand::seq::IndexedRandom;
use tokio::sync::RwLock;

use cookbook_core::{
    Account, AccountId, Email, Recipe, RecipeDraft, RecipeId, RecipePage, RecipeQuery,
    RecipeSummary, ShoppingItem, ShoppingList, ShoppingListId, Tag, TagChanges, TagId, User,
    UserId, UserProfile,
};

use super::{RepositoryError, Store};

#[derive(Default)]
struct Tables {
    accounts: HashMap<AccountId, chrono::DateTime<Utc>>,
    users: BTreeMap<UserId, User>,
    recipes: BTreeMap<RecipeId, Recipe>,
    tags: HashMap<TagId, (AccountId, Tag)>,
    shopping_lists: HashMap<ShoppingListId, ShoppingList>,
    next_recipe_id: i32,
}

impl Tables {
    fn account(&self, id: &AccountId) -> Option<Account> {
        let created_at = *self.accounts.get(id)?;
        let users = self
            .users
            .values()
            .filter(|u| &u.account_id == id)
            .cloned()
            .collect();
        Some(Account {
            id: id.clone(),
            users,
            created_at,
        })
    }

    fn connect_or_create_tag(&mut self, account: &AccountId, name: &str) -> Tag {
        let id = TagId::compose(account, name);
        self.tags
            .entry(id.clone())
            .or_insert_with(|| {
                (
                    account.clone(),
                    Tag {
                        id,
                        name: name.to_owned(),
                    },
                )
            })
            .1
            .clone()
    }

    fn apply_tag_changes(&mut self, recipe: &mut Recipe, changes: &TagChanges) {
        recipe
            .tags
            .retain(|tag| !changes.disconnect.iter().any(|name| name == &tag.name));
        for name in &changes.connect {
            let tag = self.connect_or_create_tag(&recipe.account_id, name);
            if !recipe.tags.contains(&tag) {
                recipe.tags.push(tag);
            }
        }
        recipe.tags.sort_by(|a, b| a.name.cmp(&b.name));
    }
}

/// Store backed by process memory. Semantics match [`super::PgStore`].
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user with a known email to an existing account, as an operator
    /// would when whitelisting someone for Google sign-in.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the account does not exist, `Conflict` if the
    /// email is already registered.
    pub async fn add_user(
        &self,
        account: &AccountId,
        email: Email,
    ) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.accounts.contains_key(account) {
            return Err(RepositoryError::NotFound);
        }
        if tables.users.values().any(|u| u.email.as_ref() == Some(&email)) {
            return Err(RepositoryError::Conflict(format!("email {email} already registered")));
        }
        let mut user = User::blank(UserId::generate(), account.clone(), Utc::now());
        user.email = Some(email);
        tables.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    /// Number of tag rows owned by an account.
    pub async fn tag_count(&self, account: &AccountId) -> usize {
        self.tables
            .read()
            .await
            .tags
            .values()
            .filter(|(owner, _)| owner == account)
            .count()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn create_account(&self) -> Result<Account, RepositoryError> {
        let mut tables = self.tables.write().await;
        let id = AccountId::generate();
        let now = Utc::now();
        tables.accounts.insert(id.clone(), now);
        let user = User::blank(UserId::generate(), id.clone(), now);
        tables.users.insert(user.id.clone(), user);
        tables
            .account(&id)
            .ok_or_else(|| RepositoryError::DataCorruption("account vanished".to_string()))
    }

    async fn get_account(&self, id: &AccountId) -> Result<Option<Account>, RepositoryError> {
        Ok(self.tables.read().await.account(id))
    }

    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.email.as_ref() == Some(email))
            .cloned())
    }

    async fn find_user_by_google_id(
        &self,
        google_id: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.google_id.as_deref() == Some(google_id))
            .cloned())
    }

    async fn update_user_profile(
        &self,
        id: &UserId,
        profile: &UserProfile,
    ) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write().await;
        let taken = tables
            .users
            .values()
            .any(|u| &u.id != id && u.google_id.as_deref() == Some(profile.google_id.as_str()));
        if taken {
            return Err(RepositoryError::Conflict("google id already linked".to_string()));
        }
        let user = tables.users.get_mut(id).ok_or(RepositoryError::NotFound)?;
        user.apply_profile(profile);
        Ok(user.clone())
    }

    async fn delete_account(&self, id: &AccountId) -> Result<(), RepositoryError> {
        // A single write guard makes the multi-table delete atomic.
        let mut tables = self.tables.write().await;
        if tables.accounts.remove(id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        tables.tags.retain(|_, (owner, _)| owner != id);
        tables.shopping_lists.retain(|_, list| &list.account_id != id);
        tables.recipes.retain(|_, recipe| &recipe.account_id != id);
        tables.users.retain(|_, user| &user.account_id != id);
        Ok(())
    }

    async fn list_recipes(
        &self,
        account: &AccountId,
        query: &RecipeQuery,
    ) -> Result<RecipePage, RepositoryError> {
        let tables = self.tables.read().await;
        let limit = query.limit.get() as usize;
        let lower = query
            .cursor
            .map_or(std::ops::Bound::Unbounded, std::ops::Bound::Excluded);

        let mut rows: Vec<RecipeSummary> = tables
            .recipes
            .range((lower, std::ops::Bound::Unbounded))
            .map(|(_, recipe)| recipe)
            .filter(|recipe| &recipe.account_id == account && query.accepts(recipe))
            .take(limit + 1)
            .map(Recipe::to_summary)
            .collect();

        let cursor = if rows.len() > limit {
            rows.truncate(limit);
            rows.last().map(|r| r.id)
        } else {
            None
        };
        Ok(RecipePage {
            recipes: rows,
            cursor,
        })
    }

    async fn select_recipes(
        &self,
        account: &AccountId,
        category: Option<&str>,
        count: u32,
    ) -> Result<Vec<RecipeSummary>, RepositoryError> {
        let tables = self.tables.read().await;
        let candidates: Vec<&Recipe> = tables
            .recipes
            .values()
            .filter(|r| &r.account_id == account)
            .filter(|r| category.is_none_or(|c| r.category == c))
            .collect();
        Ok(candidates
            .choose_multiple(&mut rand::rng(), count as usize)
            .map(|r| r.to_summary())
            .collect())
    }

    async fn get_recipe(&self, id: RecipeId) -> Result<Option<Recipe>, RepositoryError> {
        Ok(self.tables.read().await.recipes.get(&id).cloned())
    }

    async fn create_recipe(
        &self,
        account: &AccountId,
        draft: &RecipeDraft,
    ) -> Result<Recipe, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.accounts.contains_key(account) {
            return Err(RepositoryError::NotFound);
        }
        tables.next_recipe_id += 1;
        let now = Utc::now();
        let mut recipe = Recipe {
            id: RecipeId::new(tables.next_recipe_id),
            account_id: account.clone(),
            title: String::new(),
            category: String::new(),
            prep_time: None,
            cook_time: 0,
            servings: String::new(),
            cooked_count: 0,
            ingredients: String::new(),
            steps: String::new(),
            notes: String::new(),
            image_name: None,
            image_public_id: None,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        recipe.apply_draft(draft, now);
        let changes = TagChanges::connect_all(draft.tag_names().unwrap_or_default());
        tables.apply_tag_changes(&mut recipe, &changes);
        tables.recipes.insert(recipe.id, recipe.clone());
        Ok(recipe)
    }

    async fn update_recipe(
        &self,
        id: RecipeId,
        draft: &RecipeDraft,
    ) -> Result<Recipe, RepositoryError> {
        let mut tables = self.tables.write().await;
        let mut recipe = tables
            .recipes
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)?;
        recipe.apply_draft(draft, Utc::now());
        if let Some(next) = draft.tag_names() {
            let changes = TagChanges::between(recipe.tags.iter().map(|t| t.name.as_str()), next);
            tables.apply_tag_changes(&mut recipe, &changes);
        }
        tables.recipes.insert(id, recipe.clone());
        Ok(recipe)
    }

    async fn delete_recipe(&self, id: RecipeId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        tables
            .recipes
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn shopping_list_for(
        &self,
        account: &AccountId,
    ) -> Result<ShoppingList, RepositoryError> {
        let mut tables = self.tables.write().await;
        if let Some(list) = tables
            .shopping_lists
            .values()
            .find(|l| &l.account_id == account)
        {
            return Ok(list.clone());
        }
        if !tables.accounts.contains_key(account) {
            return Err(RepositoryError::NotFound);
        }
        let list = ShoppingList::empty(ShoppingListId::generate(), account.clone());
        tables.shopping_lists.insert(list.id.clone(), list.clone());
        Ok(list)
    }

    async fn get_shopping_list(
        &self,
        id: &ShoppingListId,
    ) -> Result<Option<ShoppingList>, RepositoryError> {
        Ok(self.tables.read().await.shopping_lists.get(id).cloned())
    }

    async fn update_shopping_list(
        &self,
        id: &ShoppingListId,
        items: &[ShoppingItem],
    ) -> Result<ShoppingList, RepositoryError> {
        let mut tables = self.tables.write().await;
        let list = tables
            .shopping_lists
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        list.items = items.to_vec();
        Ok(list.clone())
    }
}
