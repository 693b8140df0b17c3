//! Attar Core - Shared types library.
//!
//! This crate provides the types shared by all Attar components:
//! - `storefront` - Cart and wishlist client library
//! - `cli` - Command-line front end for the storefront library
//!
//! # Architecture
//!
//! The core crate contains only types and serde helpers - no I/O, no HTTP
//! clients, no storage. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Line items, item identity, collection kinds, and lenient
//!   numeric parsing

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
