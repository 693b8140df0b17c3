//! Cart-only operations.

use attar_core::CartItem;
use rust_decimal::Decimal;
use tracing::{debug, instrument};

use super::{Backend, Collection};
use crate::notice::Notice;

impl Collection<CartItem> {
    /// Set the quantity of every line with product `id`.
    ///
    /// Quantities below 1 are refused before any I/O. Success is silent so
    /// repeated increments do not flood the shopper with notices.
    #[instrument(skip(self))]
    pub async fn update_quantity(&self, id: &str, quantity: u32) -> bool {
        if quantity < 1 {
            self.notify(Notice::warning("Quantity must be at least 1"));
            return false;
        }

        let _writer = self.writer.lock().await;
        let Some(ticket) = self.begin("update_quantity") else {
            return false;
        };

        match ticket.backend {
            Backend::Remote(client) => match client.update_quantity(id, quantity).await {
                Ok(listing) => self.apply(ticket.epoch, listing.items),
                Err(e) => {
                    self.report_failure("update_quantity", &e, "Failed to update quantity");
                    false
                }
            },
            Backend::Local => {
                if !self.is_in_collection(id, None) {
                    debug!(item_id = id, "Nothing to update");
                    return true;
                }
                let next = self
                    .items()
                    .into_iter()
                    .map(|mut item| {
                        if item.id == id {
                            item.quantity = Some(quantity);
                        }
                        item
                    })
                    .collect();
                self.commit_local(ticket.epoch, next, "update_quantity")
                    .await
            }
        }
    }

    /// Sum of `price * quantity` over all lines.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.lock().items.iter().map(CartItem::line_total).sum()
    }
}
