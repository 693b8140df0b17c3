//! A shopper's cart and wishlist behind one identity.
//!
//! [`Storefront`] owns both collections and keeps them on the same identity
//! epoch, so a sign-in merges both device snapshots and a sign-out resets
//! both lists.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::api::ApiClient;
use crate::collection::{Cart, Collection, Wishlist};
use crate::config::StorefrontConfig;
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::identity::{Identity, IdentityChange};
use crate::local::{FileStore, LocalStore};
use crate::notice::Notifier;

/// Cart and wishlist for one shopper.
pub struct Storefront {
    cart: Cart,
    wishlist: Wishlist,
}

impl Storefront {
    /// Build a storefront from configuration.
    ///
    /// Device snapshots live under `config.data_dir`. The storefront starts
    /// anonymous; call [`sync`](Self::sync) with [`StorefrontConfig::identity`]
    /// to sign in.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &StorefrontConfig, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let api = ApiClient::new(&config.api)?;
        let store: Arc<dyn LocalStore> = Arc::new(FileStore::new(config.data_dir.clone()));
        Ok(Self::new(api, store, notifier))
    }

    /// Build a storefront from its parts.
    #[must_use]
    pub fn new(api: ApiClient, store: Arc<dyn LocalStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            cart: Collection::new(api.clone(), store.clone(), notifier.clone()),
            wishlist: Collection::new(api, store, notifier),
        }
    }

    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    #[must_use]
    pub const fn wishlist(&self) -> &Wishlist {
        &self.wishlist
    }

    /// Switch both collections to `identity`.
    pub fn set_identity(&self, identity: Identity) -> IdentityChange {
        match identity.user_id() {
            Some(user_id) => set_sentry_user(user_id),
            None => clear_sentry_user(),
        }
        self.wishlist.set_identity(identity.clone());
        self.cart.set_identity(identity)
    }

    /// Load both collections for the current epoch, concurrently.
    #[instrument(skip(self))]
    pub async fn initialize(&self) {
        let (cart, wishlist) = tokio::join!(self.cart.initialize(), self.wishlist.initialize());
        info!(
            cart_loaded = cart,
            wishlist_loaded = wishlist,
            cart_count = self.cart.count(),
            wishlist_count = self.wishlist.count(),
            "Storefront initialized"
        );
    }

    /// Adopt `identity` and load for it.
    pub async fn sync(&self, identity: Identity) -> IdentityChange {
        let change = self.set_identity(identity);
        self.initialize().await;
        change
    }

    /// Move a wishlist item into the cart.
    ///
    /// Signed in, the server adds the item to the cart, so the cart is
    /// re-fetched afterwards.
    pub async fn move_to_cart(&self, id: &str) -> bool {
        let moved = self.wishlist.move_to_cart(id).await;
        if moved && !self.wishlist.identity().is_anonymous() {
            self.cart.refresh().await;
        }
        moved
    }
}
