//! Remote-or-local item collections.
//!
//! [`Collection<T>`] holds one shopper's cart or wishlist in memory and routes
//! every mutation to the right backend:
//!
//! - Signed in: the REST backend is authoritative. Each mutation replaces the
//!   in-memory list with the full list the server returns.
//! - Anonymous: device storage is authoritative. Each successful mutation
//!   persists a full snapshot before it is applied in memory.
//!
//! Mutations never return errors. They report to the [`Notifier`] and return
//! `true` on success, leaving the list untouched on failure.
//!
//! Loading and the sign-in merge live in [`sequencer`](self::sequencer).

mod cart;
mod sequencer;
mod wishlist;

pub use sequencer::{MigrationReport, SyncState};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use attar_core::{CartItem, CollectionItem, WishlistItem};
use chrono::Utc;
use tracing::{debug, instrument, warn};

use crate::api::{AddOutcome, ApiClient, ApiError, AuthenticatedClient};
use crate::identity::Identity;
use crate::local::{LocalStore, load_snapshot, save_snapshot};
use crate::notice::{Notice, Notifier};

/// The shopper's cart.
pub type Cart = Collection<CartItem>;

/// The shopper's wishlist.
pub type Wishlist = Collection<WishlistItem>;

/// Label used when a removed item is no longer in memory.
const UNKNOWN_ITEM_LABEL: &str = "Item";

/// An in-memory cart or wishlist backed by the server or the device.
pub struct Collection<T: CollectionItem> {
    api: ApiClient,
    store: Arc<dyn LocalStore>,
    notifier: Arc<dyn Notifier>,
    state: Mutex<State<T>>,
    /// Serializes mutations so each one sees the result of the last.
    writer: tokio::sync::Mutex<()>,
}

struct State<T> {
    items: Vec<T>,
    sync: SyncState,
    epoch: u64,
    identity: Identity,
    remote: Option<AuthenticatedClient>,
    last_migration: Option<MigrationReport>,
}

/// Where a mutation is sent.
enum Backend {
    Remote(AuthenticatedClient),
    Local,
}

/// Backend and epoch captured when a mutation starts.
struct Ticket {
    backend: Backend,
    epoch: u64,
}

impl<T: CollectionItem> Collection<T> {
    /// Create an anonymous, uninitialized collection.
    #[must_use]
    pub fn new(api: ApiClient, store: Arc<dyn LocalStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            store,
            notifier,
            state: Mutex::new(State {
                items: Vec::new(),
                sync: SyncState::Uninitialized,
                epoch: 0,
                identity: Identity::Anonymous,
                remote: None,
                last_migration: None,
            }),
            writer: tokio::sync::Mutex::new(()),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Copy of the current items.
    #[must_use]
    pub fn items(&self) -> Vec<T> {
        self.lock().items.clone()
    }

    /// First item selected by `(id, selected_size)`; `None` size selects any size.
    #[must_use]
    pub fn find(&self, id: &str, selected_size: Option<&str>) -> Option<T> {
        self.lock()
            .items
            .iter()
            .find(|item| item.key().selected_by(id, selected_size))
            .cloned()
    }

    /// Whether any item is selected by `(id, selected_size)`.
    #[must_use]
    pub fn is_in_collection(&self, id: &str, selected_size: Option<&str>) -> bool {
        self.lock()
            .items
            .iter()
            .any(|item| item.key().selected_by(id, selected_size))
    }

    /// Cart: total quantity. Wishlist: number of entries.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.lock()
            .items
            .iter()
            .fold(0u32, |total, item| total.saturating_add(item.weight()))
    }

    /// Whether the collection holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// Identity of the current epoch.
    #[must_use]
    pub fn identity(&self) -> Identity {
        self.lock().identity.clone()
    }

    fn contains_exact(&self, item: &T) -> bool {
        let key = item.key();
        self.lock().items.iter().any(|existing| existing.key() == key)
    }

    fn display_name(&self, id: &str, selected_size: Option<&str>) -> String {
        self.find(id, selected_size)
            .map_or_else(|| UNKNOWN_ITEM_LABEL.to_string(), |item| item.name().to_string())
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add an item.
    ///
    /// Refused with a warning if an item with the same `(id, selected_size)`
    /// is already present.
    #[instrument(skip(self, item), fields(kind = %T::KIND, item_id = %item.id()))]
    pub async fn add(&self, item: T) -> bool {
        let _writer = self.writer.lock().await;
        let Some(ticket) = self.begin("add") else {
            return false;
        };

        if self.contains_exact(&item) {
            self.notify(Notice::warning(format!(
                "{} is already in your {}",
                item.name(),
                T::KIND
            )));
            return false;
        }

        let name = item.name().to_string();
        let added = match ticket.backend {
            Backend::Remote(client) => match client.add(&item).await {
                AddOutcome::Created(listing) => self.apply(ticket.epoch, listing.items),
                AddOutcome::AlreadyExists(message) => {
                    let fallback = format!("{name} is already in your {}", T::KIND);
                    self.notify(Notice::warning(message.unwrap_or(fallback)));
                    return false;
                }
                AddOutcome::Error(e) => {
                    self.report_failure("add", &e, &format!("Failed to add item to {}", T::KIND));
                    return false;
                }
            },
            Backend::Local => {
                let mut item = item;
                item.prepare_for_local(Utc::now());
                let mut next = self.items();
                next.push(item);
                self.commit_local(ticket.epoch, next, "add").await
            }
        };

        if added {
            self.notify(Notice::success(format!("{name} added to your {}", T::KIND)));
        }
        added
    }

    /// Remove every item selected by `(id, selected_size)`.
    ///
    /// Removing an item that is not present still succeeds.
    pub async fn remove(&self, id: &str, selected_size: Option<&str>) -> bool {
        self.remove_matching(id, selected_size, |item| {
            item.key().selected_by(id, selected_size)
        })
        .await
    }

    /// Remove through the backend, filtering device items with `matches`.
    #[instrument(skip(self, matches), fields(kind = %T::KIND))]
    async fn remove_matching(
        &self,
        id: &str,
        selected_size: Option<&str>,
        matches: impl Fn(&T) -> bool,
    ) -> bool {
        let _writer = self.writer.lock().await;
        let Some(ticket) = self.begin("remove") else {
            return false;
        };

        let name = self.display_name(id, selected_size);
        let removed = match ticket.backend {
            Backend::Remote(client) => match client.remove::<T>(id, selected_size).await {
                Ok(listing) => self.apply(ticket.epoch, listing.items),
                Err(e) => {
                    self.report_failure(
                        "remove",
                        &e,
                        &format!("Failed to remove item from {}", T::KIND),
                    );
                    return false;
                }
            },
            Backend::Local => {
                let current = self.items();
                let before = current.len();
                let next: Vec<T> = current
                    .into_iter()
                    .filter(|item| !matches(item))
                    .collect();
                if next.len() == before {
                    debug!(item_id = id, "Nothing to remove");
                    true
                } else {
                    self.commit_local(ticket.epoch, next, "remove").await
                }
            }
        };

        if removed {
            self.notify(Notice::success(format!("{name} removed from your {}", T::KIND)));
        }
        removed
    }

    /// Remove every item.
    ///
    /// Signed in, the list is emptied only if the server confirms. Anonymous,
    /// the list is always emptied.
    #[instrument(skip(self), fields(kind = %T::KIND))]
    pub async fn clear(&self) -> bool {
        let _writer = self.writer.lock().await;
        let Some(ticket) = self.begin("clear") else {
            return false;
        };

        let fallback_error = format!("Failed to clear {}", T::KIND);
        let message = match ticket.backend {
            Backend::Remote(client) => match client.clear(T::KIND).await {
                Ok(ack) if ack.success => {
                    if !self.apply(ticket.epoch, Vec::new()) {
                        return false;
                    }
                    ack.message
                }
                Ok(ack) => {
                    warn!(message = ?ack.message, "Backend refused to clear collection");
                    self.notify(Notice::error(ack.message.unwrap_or(fallback_error)));
                    return false;
                }
                Err(e) => {
                    self.report_failure("clear", &e, &fallback_error);
                    return false;
                }
            },
            Backend::Local => {
                if let Err(e) =
                    save_snapshot::<T>(&*self.store, T::KIND.storage_key(), &[]).await
                {
                    tracing::error!(error = %e, "Failed to persist cleared snapshot");
                }
                if !self.apply(ticket.epoch, Vec::new()) {
                    return false;
                }
                None
            }
        };

        self.notify(Notice::success(
            message.unwrap_or_else(|| format!("Your {} has been cleared", T::KIND)),
        ));
        true
    }

    /// Add the item if it is absent, remove it if it is present.
    ///
    /// Only the entry with exactly this `(id, selected_size)` is removed; an
    /// unsized item leaves its sized variants alone.
    pub async fn toggle(&self, item: T) -> bool {
        if self.contains_exact(&item) {
            let key = item.key();
            self.remove_matching(item.id(), item.selected_size(), |existing| {
                existing.key() == key
            })
            .await
        } else {
            self.add(item).await
        }
    }

    /// Re-read the authoritative list for the current epoch.
    ///
    /// Signed in, fetches from the server; anonymous, re-reads device storage.
    #[instrument(skip(self), fields(kind = %T::KIND))]
    pub async fn refresh(&self) -> bool {
        let _writer = self.writer.lock().await;
        let Some(ticket) = self.begin("refresh") else {
            return false;
        };

        let items = match ticket.backend {
            Backend::Remote(client) => match client.fetch::<T>().await {
                Ok(items) => items,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to refresh collection");
                    return false;
                }
            },
            Backend::Local => load_snapshot(&*self.store, T::KIND.storage_key()).await,
        };
        self.apply(ticket.epoch, items)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, notice: Notice) {
        self.notifier.notify(notice);
    }

    /// Capture the backend for a mutation, refusing if not yet initialized.
    fn begin(&self, op: &str) -> Option<Ticket> {
        let state = self.lock();
        if state.sync != SyncState::Initialized {
            warn!(op, kind = %T::KIND, sync = ?state.sync, "Refusing mutation before initialization");
            return None;
        }
        let backend = state
            .remote
            .clone()
            .map_or(Backend::Local, Backend::Remote);
        Some(Ticket {
            backend,
            epoch: state.epoch,
        })
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.lock().epoch == epoch
    }

    /// Replace the list if `epoch` is still current. Returns whether it was applied.
    fn apply(&self, epoch: u64, items: Vec<T>) -> bool {
        let mut state = self.lock();
        if state.epoch != epoch {
            debug!(
                kind = %T::KIND,
                stale_epoch = epoch,
                current_epoch = state.epoch,
                "Discarding result from a previous identity"
            );
            return false;
        }
        state.items = items;
        true
    }

    /// Persist an anonymous snapshot, then apply it in memory.
    async fn commit_local(&self, epoch: u64, next: Vec<T>, op: &str) -> bool {
        if !self.is_current(epoch) {
            debug!(op, "Identity changed before local write; dropping mutation");
            return false;
        }
        match save_snapshot(&*self.store, T::KIND.storage_key(), &next).await {
            Ok(()) => self.apply(epoch, next),
            Err(e) => {
                tracing::error!(op, kind = %T::KIND, error = %e, "Failed to persist device snapshot");
                self.notify(Notice::error(format!("Could not save your {}", T::KIND)));
                false
            }
        }
    }

    /// Log a failed remote mutation and tell the shopper.
    fn report_failure(&self, op: &str, error: &ApiError, fallback: &str) {
        tracing::error!(op, kind = %T::KIND, error = %error, "Collection mutation failed");
        self.notify(Notice::error(error.user_message(fallback)));
    }
}
