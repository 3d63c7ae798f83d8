//! Stores pairing the API client with the shared query cache.

pub mod recipes;
pub mod seasonal;
pub mod shopping_list;
pub mod user;

pub use recipes::RecipeStore;
pub use seasonal::SeasonalStore;
pub use shopping_list::ShoppingListStore;
pub use user::UserStore;
