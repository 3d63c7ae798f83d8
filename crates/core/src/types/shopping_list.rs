//! The per-account shopping list.

use serde::{Deserialize, Serialize};

use super::{AccountId, ShoppingListId};

/// One line on the shopping list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingItem {
    pub name: String,
    #[serde(default)]
    pub checked: bool,
}

/// At most one per account, created lazily on first read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingList {
    pub id: ShoppingListId,
    pub account_id: AccountId,
    pub items: Vec<ShoppingItem>,
}

impl ShoppingList {
    #[must_use]
    pub const fn empty(id: ShoppingListId, account_id: AccountId) -> Self {
        Self {
            id,
            account_id,
            items: Vec::new(),
        }
    }
}
