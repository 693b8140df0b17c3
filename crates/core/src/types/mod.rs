//! Core types for Attar.
//!
//! This module provides the line item types stored in carts and wishlists.

pub mod item;
pub mod kind;
pub mod numeric;

pub use item::{CartItem, CollectionItem, DEFAULT_IMAGE, ItemKey, WishlistItem};
pub use kind::CollectionKind;
pub use numeric::NumericError;
