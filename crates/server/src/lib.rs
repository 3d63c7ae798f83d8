//! Cookbook server library.
//!
//! The HTTP API over recipes, tags, shopping lists and accounts, exposed as
//! a library so the router can be driven directly from tests and the store
//! reused by the CLI.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod session;
pub mod state;

pub use config::ServerConfig;
pub use routes::router;
pub use state::AppState;
