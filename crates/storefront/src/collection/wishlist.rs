//! Wishlist-only operations.

use attar_core::WishlistItem;
use tracing::instrument;

use super::{Backend, Collection};
use crate::notice::Notice;

impl Collection<WishlistItem> {
    /// Move an item from the wishlist to the cart.
    ///
    /// Signed in, the server performs the transfer and returns the remaining
    /// wishlist. Anonymous, there is no server to transfer through: the item
    /// is only removed from the wishlist and the shopper is asked to add it to
    /// the cart themselves.
    #[instrument(skip(self))]
    pub async fn move_to_cart(&self, id: &str) -> bool {
        let _writer = self.writer.lock().await;
        let Some(ticket) = self.begin("move_to_cart") else {
            return false;
        };

        let name = self.display_name(id, None);
        match ticket.backend {
            Backend::Remote(client) => match client.move_to_cart(id).await {
                Ok(listing) => {
                    if !self.apply(ticket.epoch, listing.items) {
                        return false;
                    }
                    self.notify(Notice::success(
                        listing
                            .message
                            .unwrap_or_else(|| format!("{name} moved to your cart")),
                    ));
                    true
                }
                Err(e) => {
                    self.report_failure("move_to_cart", &e, "Failed to move item to cart");
                    false
                }
            },
            Backend::Local => {
                let next = self
                    .items()
                    .into_iter()
                    .filter(|item| item.id != id)
                    .collect();
                if !self.commit_local(ticket.epoch, next, "move_to_cart").await {
                    return false;
                }
                self.notify(Notice::info(format!(
                    "{name} removed from your wishlist. Please add it to your cart manually."
                )));
                true
            }
        }
    }
}
