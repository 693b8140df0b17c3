//! Integration tests for the Attar storefront client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p attar-integration-tests
//! ```
//!
//! Every test gets its own mock REST backend (wiremock) and its own device
//! storage directory (tempfile), so tests run in parallel without sharing
//! state.
//!
//! # Test Categories
//!
//! - `anonymous` - Device-storage mode
//! - `authenticated` - REST mode
//! - `sign_in` - Merging device items into an account

use std::path::PathBuf;
use std::sync::Arc;

use attar_storefront::api::ApiClient;
use attar_storefront::config::ApiConfig;
use attar_storefront::local::FileStore;
use attar_storefront::notice::{BufferedNotifier, Notice};
use attar_storefront::{Identity, Storefront};
use secrecy::SecretString;
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A storefront wired to a mock backend and a scratch data directory.
pub struct TestContext {
    pub server: MockServer,
    pub storefront: Storefront,
    pub notices: Arc<BufferedNotifier>,
    data_dir: TempDir,
}

impl TestContext {
    pub async fn new() -> Self {
        let server = MockServer::start().await;
        let data_dir = TempDir::new().expect("create data dir");
        let api = ApiClient::new(&ApiConfig::new(&server.uri()).expect("mock server URL"))
            .expect("build API client");
        let notices = Arc::new(BufferedNotifier::new());
        let storefront = Storefront::new(
            api,
            Arc::new(FileStore::new(data_dir.path())),
            notices.clone(),
        );
        Self {
            server,
            storefront,
            notices,
            data_dir,
        }
    }

    /// Write a raw device snapshot before the storefront loads.
    pub fn seed(&self, key: &str, raw: &str) {
        std::fs::write(self.snapshot_path(key), raw).expect("write snapshot");
    }

    /// Raw device snapshot, if one exists.
    pub fn snapshot(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.snapshot_path(key)).ok()
    }

    /// Take every notice shown so far.
    pub fn drain_notices(&self) -> Vec<Notice> {
        self.notices.drain()
    }

    /// Serve `items` as the account's collection at `GET /{resource}`.
    pub async fn mount_fetch(&self, resource: &str, items: Value) {
        Mock::given(method("GET"))
            .and(path(format!("/{resource}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing(resource, items)))
            .mount(&self.server)
            .await;
    }

    fn snapshot_path(&self, key: &str) -> PathBuf {
        self.data_dir.path().join(format!("{key}.json"))
    }
}

/// A successful listing envelope for `resource` ("cart" or "wishlist").
pub fn listing(resource: &str, items: Value) -> Value {
    let field = if resource == "cart" {
        "cartItems"
    } else {
        "wishlistItems"
    };
    let mut body = json!({ "success": true });
    body[field] = items;
    body
}

/// A signed-in shopper.
pub fn shopper() -> Identity {
    Identity::authenticated("user-42", SecretString::from("test-token"))
}
