//! Core domain types for Cookbook.
//!
//! Type-safe ids plus the serializable shapes shared by the server and the
//! client library.

pub mod account;
pub mod email;
pub mod id;
pub mod recipe;
pub mod shopping_list;
pub mod tag;

pub use account::{Account, User, UserProfile};
pub use email::{Email, EmailError};
pub use id::*;
pub use recipe::{
    PageLimit, Recipe, RecipeDraft, RecipeError, RecipePage, RecipeQuery, RecipeSummary,
};
pub use shopping_list::{ShoppingItem, ShoppingList};
pub use tag::{Tag, TagInput};
