//! Business logic services and third-party clients.
//!
//! # Services
//!
//! - `auth` - Session resolution and Google sign-in
//! - `cloudinary` - Image host folders and image cleanup
//! - `recaptcha` - Bot verification for demo sign-up
//! - `seed` - Recipe fixtures for new accounts

pub mod auth;
pub mod cloudinary;
pub mod recaptcha;
pub mod seed;
