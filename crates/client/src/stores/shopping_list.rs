//! Shopping list store with optimistic edits.

use cookbook_core::{ShoppingItem, ShoppingList};

use crate::api::{ApiClient, ClientError};
use crate::cache::{QueryCache, QueryKey};

#[derive(Clone)]
pub struct ShoppingListStore {
    api: ApiClient,
    cache: QueryCache,
}

impl ShoppingListStore {
    #[must_use]
    pub const fn new(api: ApiClient, cache: QueryCache) -> Self {
        Self { api, cache }
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get(&self) -> Result<ShoppingList, ClientError> {
        self.cache
            .fetch(QueryKey::ShoppingList, || self.api.get_shopping_list())
            .await
    }

    /// Replace the list's items, showing them before the server confirms.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails; the cached list is rolled back.
    pub async fn update(&self, items: Vec<ShoppingItem>) -> Result<ShoppingList, ClientError> {
        let key = QueryKey::ShoppingList;
        let current = match self.cache.get::<ShoppingList>(&key).await {
            Some(list) => list,
            None => self.get().await?,
        };

        self.cache.cancel(&key);
        let snapshot = self.cache.snapshot(std::slice::from_ref(&key)).await;

        let optimistic = ShoppingList {
            items: items.clone(),
            ..current
        };
        let id = optimistic.id.clone();
        self.cache.set(key.clone(), optimistic).await;

        match self.api.update_shopping_list(&id, &items).await {
            Ok(list) => {
                self.cache.set(key, list.clone()).await;
                Ok(list)
            }
            Err(e) => {
                tracing::warn!(shopping_list_id = %id, error = %e, "update failed, rolling back");
                self.cache.restore(snapshot).await;
                Err(e)
            }
        }
    }

    /// Append an item unless one with the same name is already listed.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn add_item(&self, name: &str) -> Result<ShoppingList, ClientError> {
        let name = name.trim();
        let list = self.get().await?;
        if name.is_empty() || list.items.iter().any(|item| item.name == name) {
            return Ok(list);
        }
        let mut items = list.items;
        items.push(ShoppingItem {
            name: name.to_owned(),
            checked: false,
        });
        self.update(items).await
    }

    /// Flip the checked state of every item named `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn toggle_item(&self, name: &str) -> Result<ShoppingList, ClientError> {
        let mut items = self.get().await?.items;
        for item in items.iter_mut().filter(|item| item.name == name) {
            item.checked = !item.checked;
        }
        self.update(items).await
    }

    /// Remove every checked item.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn clear_checked(&self) -> Result<ShoppingList, ClientError> {
        let mut items = self.get().await?.items;
        items.retain(|item| !item.checked);
        self.update(items).await
    }
}
