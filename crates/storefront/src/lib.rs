//! Attar storefront client library.
//!
//! Keeps a shopper's cart and wishlist consistent across two backends: the
//! REST API while signed in, and device storage while anonymous. On sign-in
//! the device snapshot is merged into the account.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod collection;
pub mod config;
pub mod error;
pub mod identity;
pub mod local;
pub mod notice;
pub mod storefront;

pub use collection::{Cart, Collection, MigrationReport, SyncState, Wishlist};
pub use config::StorefrontConfig;
pub use error::AppError;
pub use identity::{Identity, IdentityChange};
pub use storefront::Storefront;
