//! One-shot loading per identity epoch, with the sign-in merge.
//!
//! ```text
//!   set_identity (new epoch)
//!          │
//!          ▼
//!   Uninitialized ──initialize()──▶ Loading ──(always)──▶ Initialized
//!                                      │
//!                     initialize() while Loading/Initialized is a no-op
//! ```
//!
//! Signed-in loads first merge any anonymous device snapshot into the
//! server collection, one item at a time, then delete the snapshot and
//! fetch the authoritative list.

use attar_core::CollectionItem;
use tracing::{debug, info, instrument, warn};

use super::Collection;
use crate::api::{AddOutcome, AuthenticatedClient};
use crate::identity::{Identity, IdentityChange};
use crate::local::load_snapshot;

/// Load state of a collection within the current identity epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncState {
    /// No load attempted yet.
    Uninitialized,
    /// A load is running; further loads are suppressed.
    Loading,
    /// Loaded (or fell back); mutations are enabled.
    Initialized,
}

/// Outcome of merging a device snapshot into the server collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Items the server accepted.
    pub created: usize,
    /// Items the server already had.
    pub already_present: usize,
    /// Items that failed to sync. These are lost when the snapshot is deleted.
    pub failed: usize,
}

impl MigrationReport {
    /// Total items attempted.
    #[must_use]
    pub const fn attempted(&self) -> usize {
        self.created + self.already_present + self.failed
    }
}

/// Marks the epoch's load finished when dropped, even if the load future is cancelled.
struct LoadGuard<'a, T: CollectionItem> {
    collection: &'a Collection<T>,
    epoch: u64,
}

impl<T: CollectionItem> Drop for LoadGuard<'_, T> {
    fn drop(&mut self) {
        let mut state = self.collection.lock();
        if state.epoch == self.epoch && state.sync == SyncState::Loading {
            state.sync = SyncState::Initialized;
        }
    }
}

impl<T: CollectionItem> Collection<T> {
    /// Current load state.
    #[must_use]
    pub fn state(&self) -> SyncState {
        self.lock().sync
    }

    /// Whether the initial load for this epoch is running.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state() == SyncState::Loading
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state() == SyncState::Initialized
    }

    /// Result of the most recent sign-in merge in this epoch, if one ran.
    #[must_use]
    pub fn last_migration(&self) -> Option<MigrationReport> {
        self.lock().last_migration
    }

    /// Switch to a new identity.
    ///
    /// A different shopper (sign-in, sign-out, account switch) ends the epoch:
    /// items are discarded and the collection returns to `Uninitialized`.
    /// A rotated token for the same shopper only rebuilds the REST client.
    pub fn set_identity(&self, identity: Identity) -> IdentityChange {
        let mut state = self.lock();
        let change = state.identity.change_to(&identity);

        match change {
            IdentityChange::Unchanged => return change,
            IdentityChange::TokenRotated => {
                debug!(kind = %T::KIND, "Bearer token rotated");
            }
            IdentityChange::NewEpoch => {
                state.epoch += 1;
                state.sync = SyncState::Uninitialized;
                state.items.clear();
                state.last_migration = None;
                info!(
                    kind = %T::KIND,
                    epoch = state.epoch,
                    anonymous = identity.is_anonymous(),
                    "Identity changed; starting new epoch"
                );
            }
        }

        state.remote = identity
            .token()
            .map(|token| self.api.authenticated(token.clone()));
        state.identity = identity;
        change
    }

    /// Run the epoch's initial load.
    ///
    /// Returns `false` without doing anything if a load already ran or is
    /// running in this epoch. Always ends in [`SyncState::Initialized`].
    ///
    /// Waits for any in-flight mutation first, so a device write started
    /// before a sign-in is on disk before the snapshot is merged.
    #[instrument(skip(self), fields(kind = %T::KIND))]
    pub async fn initialize(&self) -> bool {
        let epoch = {
            let mut state = self.lock();
            if state.sync != SyncState::Uninitialized {
                debug!(sync = ?state.sync, "Load already handled for this epoch");
                return false;
            }
            state.sync = SyncState::Loading;
            state.epoch
        };
        let _guard = LoadGuard {
            collection: self,
            epoch,
        };

        let _writer = self.writer.lock().await;
        let remote = {
            let state = self.lock();
            if state.epoch != epoch {
                debug!("Identity changed while waiting to load");
                return true;
            }
            state.remote.clone()
        };

        let items = match remote {
            Some(client) => self.load_authenticated(&client, epoch).await,
            None => load_snapshot(&*self.store, T::KIND.storage_key()).await,
        };

        self.apply(epoch, items);
        true
    }

    async fn load_authenticated(&self, client: &AuthenticatedClient, epoch: u64) -> Vec<T> {
        let key = T::KIND.storage_key();
        let snapshot: Vec<T> = load_snapshot(&*self.store, key).await;

        if !snapshot.is_empty() {
            let report = Self::migrate(client, &snapshot).await;
            if report.failed > 0 {
                warn!(
                    failed = report.failed,
                    attempted = report.attempted(),
                    "Some device items could not be synced and will be discarded"
                );
            } else {
                info!(
                    created = report.created,
                    already_present = report.already_present,
                    "Merged device items into account"
                );
            }

            if let Err(e) = self.store.delete(key).await {
                tracing::error!(error = %e, "Failed to delete device snapshot after merge");
            }

            {
                let mut state = self.lock();
                if state.epoch == epoch {
                    state.last_migration = Some(report);
                }
            }
        }

        match client.fetch::<T>().await {
            Ok(items) => items,
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch collection; falling back to device");
                load_snapshot(&*self.store, key).await
            }
        }
    }

    /// Push each snapshot item to the server, one at a time.
    async fn migrate(client: &AuthenticatedClient, snapshot: &[T]) -> MigrationReport {
        let mut report = MigrationReport::default();

        for item in snapshot {
            match client.add(item).await {
                AddOutcome::Created(_) => report.created += 1,
                AddOutcome::AlreadyExists(_) => {
                    debug!(item_id = item.id(), "Item already in account");
                    report.already_present += 1;
                }
                AddOutcome::Error(e) => {
                    warn!(item_id = item.id(), error = %e, "Failed to sync device item");
                    report.failed += 1;
                }
            }
        }

        report
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use attar_core::{CartItem, WishlistItem};
    use rust_decimal::Decimal;
    use secrecy::SecretString;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::super::tests::{harness, shopper};
    use super::*;
    use crate::api::ApiClient;
    use crate::config::ApiConfig;
    use crate::local::{LocalStore, MemoryStore, StoreError};
    use crate::notice::BufferedNotifier;

    fn cart_json(items: &serde_json::Value) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .set_body_json(serde_json::json!({"success": true, "cartItems": items}))
    }

    #[tokio::test]
    async fn test_anonymous_load_reads_snapshot() {
        let store = MemoryStore::with_entry(
            "cart",
            r#"[{"id":"p1","name":"Rose","price":20,"quantity":2}]"#,
        );
        let h = harness::<CartItem>("http://127.0.0.1:9", store);

        assert_eq!(h.collection.state(), SyncState::Uninitialized);
        assert!(h.collection.initialize().await);
        assert!(h.collection.is_initialized());
        assert_eq!(h.collection.count(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_loads_empty() {
        let store = MemoryStore::with_entry("wishlist", "[{oops");
        let h = harness::<WishlistItem>("http://127.0.0.1:9", store);

        assert!(h.collection.initialize().await);
        assert!(h.collection.is_initialized());
        assert!(h.collection.is_empty());
    }

    #[tokio::test]
    async fn test_initialize_runs_once_per_epoch() {
        let h = harness::<CartItem>("http://127.0.0.1:9", MemoryStore::new());

        assert!(h.collection.initialize().await);
        assert!(!h.collection.initialize().await);

        // Unchanged identity keeps the epoch
        assert_eq!(
            h.collection.set_identity(Identity::Anonymous),
            IdentityChange::Unchanged
        );
        assert!(!h.collection.initialize().await);
    }

    #[tokio::test]
    async fn test_concurrent_initialize_collapses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cart"))
            .respond_with(
                cart_json(&serde_json::json!([]))
                    .set_delay(std::time::Duration::from_millis(50)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let h = harness::<CartItem>(&server.uri(), MemoryStore::new());
        h.collection.set_identity(shopper());

        let (first, second) = tokio::join!(h.collection.initialize(), h.collection.initialize());
        assert!(first ^ second);
        assert!(h.collection.is_initialized());
    }

    #[tokio::test]
    async fn test_sign_in_merges_snapshot_and_clears_device() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cart/add"))
            .respond_with(cart_json(&serde_json::json!([])))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cart"))
            .respond_with(cart_json(&serde_json::json!([
                {"id": "A", "name": "Amber", "price": 10, "quantity": 1},
                {"id": "B", "name": "Bergamot", "price": 12, "quantity": 1}
            ])))
            .mount(&server)
            .await;

        let store = MemoryStore::with_entry(
            "cart",
            r#"[{"id":"A","name":"Amber","price":10,"quantity":1},{"id":"B","name":"Bergamot","price":12,"quantity":1}]"#,
        );
        let h = harness::<CartItem>(&server.uri(), store);
        h.collection.set_identity(shopper());
        h.collection.initialize().await;

        assert!(h.collection.is_in_collection("A", None));
        assert!(h.collection.is_in_collection("B", None));
        assert!(h.store.get("cart").is_none());
        assert_eq!(
            h.collection.last_migration(),
            Some(MigrationReport {
                created: 2,
                already_present: 0,
                failed: 0
            })
        );
    }

    #[tokio::test]
    async fn test_sign_in_tolerates_conflict_and_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cart/add"))
            .and(body_partial_json(serde_json::json!({"id": "A"})))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/cart/add"))
            .and(body_partial_json(serde_json::json!({"id": "B"})))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cart"))
            .respond_with(cart_json(&serde_json::json!([
                {"id": "A", "name": "Amber", "price": 10, "quantity": 1}
            ])))
            .mount(&server)
            .await;

        let store = MemoryStore::with_entry(
            "cart",
            r#"[{"id":"A","name":"Amber","price":10},{"id":"B","name":"Bergamot","price":12}]"#,
        );
        let h = harness::<CartItem>(&server.uri(), store);
        h.collection.set_identity(shopper());
        h.collection.initialize().await;

        assert_eq!(h.collection.items().len(), 1);
        assert!(h.store.get("cart").is_none());
        assert_eq!(
            h.collection.last_migration(),
            Some(MigrationReport {
                created: 0,
                already_present: 1,
                failed: 1
            })
        );
    }

    #[tokio::test]
    async fn test_fetch_failure_falls_back_to_device() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wishlist"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let h = harness::<WishlistItem>(&server.uri(), MemoryStore::new());
        h.collection.set_identity(shopper());
        assert!(h.collection.initialize().await);

        assert!(h.collection.is_initialized());
        assert!(!h.collection.is_loading());
        assert!(h.collection.is_empty());
    }

    #[tokio::test]
    async fn test_identity_change_resets_epoch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cart"))
            .respond_with(cart_json(&serde_json::json!([
                {"id": "p9", "name": "Vetiver", "price": 50, "quantity": 1}
            ])))
            .mount(&server)
            .await;

        let h = harness::<CartItem>(&server.uri(), MemoryStore::new());
        h.collection.initialize().await;
        h.collection
            .add(CartItem::new("p1", "Rose", Decimal::from(20)))
            .await;
        assert!(h.collection.is_in_collection("p1", None));

        // Signing out of nothing and into an account starts a new epoch
        assert_eq!(h.collection.set_identity(shopper()), IdentityChange::NewEpoch);
        assert_eq!(h.collection.state(), SyncState::Uninitialized);
        assert!(h.collection.is_empty());

        // Token rotation does not
        assert_eq!(
            h.collection.set_identity(Identity::authenticated(
                "user-1",
                SecretString::from("token-2")
            )),
            IdentityChange::TokenRotated
        );
        assert_eq!(h.collection.state(), SyncState::Uninitialized);
    }

    #[tokio::test]
    async fn test_cancelled_load_still_initializes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cart"))
            .respond_with(
                cart_json(&serde_json::json!([])).set_delay(std::time::Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let h = harness::<CartItem>(&server.uri(), MemoryStore::new());
        h.collection.set_identity(shopper());

        let load = h.collection.initialize();
        let timed_out = tokio::time::timeout(std::time::Duration::from_millis(50), load).await;
        assert!(timed_out.is_err());
        assert!(h.collection.is_initialized());
    }

    /// Device store whose writes take a while to land.
    struct SlowStore {
        inner: MemoryStore,
    }

    #[async_trait::async_trait]
    impl LocalStore for SlowStore {
        async fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.read(key).await
        }

        async fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            self.inner.write(key, value).await
        }

        async fn delete(&self, key: &str) -> Result<(), StoreError> {
            self.inner.delete(key).await
        }
    }

    #[tokio::test]
    async fn test_sign_in_waits_for_pending_device_write() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cart/add"))
            .and(body_partial_json(serde_json::json!({"id": "p1"})))
            .respond_with(cart_json(&serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cart"))
            .respond_with(cart_json(&serde_json::json!([
                {"id": "p1", "name": "Rose", "price": 20, "quantity": 1}
            ])))
            .mount(&server)
            .await;

        let api = ApiClient::new(&ApiConfig::new(&server.uri()).unwrap()).unwrap();
        let store = Arc::new(SlowStore {
            inner: MemoryStore::new(),
        });
        let cart: Collection<CartItem> =
            Collection::new(api, store.clone(), Arc::new(BufferedNotifier::new()));
        cart.initialize().await;

        let (_, loaded) = tokio::join!(
            cart.add(CartItem::new("p1", "Rose", Decimal::from(20))),
            async {
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                cart.set_identity(shopper());
                cart.initialize().await
            }
        );

        assert!(loaded);
        assert!(cart.is_in_collection("p1", None));
        assert!(store.inner.get("cart").is_none());
        assert_eq!(cart.last_migration().unwrap().created, 1);
    }
}
