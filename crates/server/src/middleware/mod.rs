//! HTTP middleware stack for the API server.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request spans)
//! 3. Request ID (add unique ID to each request)
//! 4. Account resolution (Basic token or session cookie)

pub mod auth;
pub mod request_id;

pub use auth::{
    OptionalAccount, RequireAccount, ResolvedAccount, account_from_authorization,
    resolve_account_middleware,
};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
