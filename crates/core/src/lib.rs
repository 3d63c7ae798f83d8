//! Cookbook Core - Shared types library.
//!
//! This crate provides the domain types and pure logic used across all
//! Cookbook components:
//! - `server` - HTTP API over recipes, shopping lists and accounts
//! - `client` - Typed API client with an optimistic query cache
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no network I/O,
//! no database access, no HTTP clients. This keeps it lightweight and allows
//! it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, emails, recipes, tags, accounts, shopping lists
//! - [`search`] - Recipe title search tokenizing
//! - [`tags`] - Tag set reconciliation by name
//! - [`seasonal`] - Bundled seasonal fruit and vegetable data

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod search;
pub mod seasonal;
pub mod tags;
pub mod types;

pub use search::SearchQuery;
pub use tags::TagChanges;
pub use types::*;
