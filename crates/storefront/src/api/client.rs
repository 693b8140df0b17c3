//! HTTP implementation of the cart/wishlist REST client.

use std::sync::Arc;

use attar_core::{CartItem, CollectionItem, CollectionKind, WishlistItem};
use reqwest::{RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use super::{Ack, AddOutcome, ApiError, Envelope, ErrorBody, Listing};
use crate::config::ApiConfig;

/// Longest slice of a response body copied into logs.
const LOG_BODY_LIMIT: usize = 500;

/// Unauthenticated handle on the REST backend.
///
/// Cheap to clone. Carries no credentials; call [`ApiClient::authenticated`]
/// to obtain a client for one shopper.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
}

/// REST client bound to one shopper's bearer token.
///
/// Built once per identity epoch and rebuilt when the token rotates.
#[derive(Clone)]
pub struct AuthenticatedClient {
    api: ApiClient,
    token: SecretString,
}

impl ApiClient {
    /// Create a new REST client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.clone(),
            }),
        })
    }

    /// Bind this client to a shopper's bearer token.
    #[must_use]
    pub fn authenticated(&self, token: SecretString) -> AuthenticatedClient {
        AuthenticatedClient {
            api: self.clone(),
            token,
        }
    }

    /// Build an endpoint URL from path segments, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::Malformed("base URL cannot hold a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl AuthenticatedClient {
    fn http(&self) -> &reqwest::Client {
        &self.api.inner.client
    }

    /// Send a request with the bearer token and return the body of a success response.
    async fn execute(&self, request: RequestBuilder) -> Result<String, ApiError> {
        let response = request
            .bearer_auth(self.token.expose_secret())
            .send()
            .await?;

        let status = response.status();

        // Get response body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            let error: ErrorBody = serde_json::from_str(&body).unwrap_or_default();
            debug!(
                status = %status,
                body = %body.chars().take(LOG_BODY_LIMIT).collect::<String>(),
                "Backend returned non-success status"
            );
            return Err(ApiError::Api {
                status: status.as_u16(),
                message: error.message.or(error.error),
            });
        }

        Ok(body)
    }

    /// Parse a success body into an envelope.
    fn decode<T: DeserializeOwned>(body: &str, endpoint: &str) -> Result<Envelope<T>, ApiError> {
        serde_json::from_str(body).map_err(|e| {
            tracing::error!(
                error = %e,
                endpoint,
                body = %body.chars().take(LOG_BODY_LIMIT).collect::<String>(),
                "Failed to parse backend response"
            );
            ApiError::Parse(e)
        })
    }

    async fn listing<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: RequestBuilder,
    ) -> Result<Listing<T>, ApiError> {
        let body = self.execute(request).await?;
        Self::decode::<T>(&body, endpoint)?.into_listing(endpoint)
    }

    // =========================================================================
    // Shared Collection Methods
    // =========================================================================

    /// Fetch the shopper's full collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is malformed.
    #[instrument(skip(self), fields(kind = %T::KIND))]
    pub async fn fetch<T: CollectionItem>(&self) -> Result<Vec<T>, ApiError> {
        let url = self.api.endpoint(&[T::KIND.resource()])?;
        let listing = self
            .listing::<T>(&format!("GET /{}", T::KIND.resource()), self.http().get(url))
            .await?;
        Ok(listing.items)
    }

    /// Add an item to the shopper's collection.
    ///
    /// A conflict status from the backend means the item is already present
    /// and yields [`AddOutcome::AlreadyExists`].
    #[instrument(skip(self, item), fields(kind = %T::KIND, item_id = %item.id()))]
    pub async fn add<T: CollectionItem>(&self, item: &T) -> AddOutcome<T> {
        let endpoint = format!("POST /{}/add", T::KIND.resource());
        let url = match self.api.endpoint(&[T::KIND.resource(), "add"]) {
            Ok(url) => url,
            Err(e) => return AddOutcome::Error(e),
        };

        match self.listing::<T>(&endpoint, self.http().post(url).json(item)).await {
            Ok(listing) => AddOutcome::Created(listing),
            Err(ApiError::Api { status, message }) if status == StatusCode::CONFLICT.as_u16() => {
                AddOutcome::AlreadyExists(message)
            }
            Err(e) => AddOutcome::Error(e),
        }
    }

    /// Remove an item from the shopper's collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is malformed.
    #[instrument(skip(self), fields(kind = %T::KIND))]
    pub async fn remove<T: CollectionItem>(
        &self,
        id: &str,
        selected_size: Option<&str>,
    ) -> Result<Listing<T>, ApiError> {
        let url = self.api.endpoint(&[T::KIND.resource(), "remove", id])?;
        let mut request = self.http().delete(url);
        if let Some(size) = selected_size {
            request = request.query(&[("selectedSize", size)]);
        }
        self.listing::<T>(&format!("DELETE /{}/remove", T::KIND.resource()), request)
            .await
    }

    /// Empty the shopper's collection.
    ///
    /// A `success: false` answer is returned as an [`Ack`], not an error, so
    /// the caller can decide what to keep.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is not JSON.
    #[instrument(skip(self))]
    pub async fn clear(&self, kind: CollectionKind) -> Result<Ack, ApiError> {
        let endpoint = format!("DELETE /{}/clear", kind.resource());
        let url = self.api.endpoint(&[kind.resource(), "clear"])?;
        let body = self.execute(self.http().delete(url)).await?;
        let envelope = Self::decode::<serde_json::Value>(&body, &endpoint)?;
        Ok(Ack {
            success: envelope.success,
            message: envelope.message,
        })
    }

    // =========================================================================
    // Cart Methods
    // =========================================================================

    /// Set the quantity of a cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is malformed.
    #[instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        id: &str,
        quantity: u32,
    ) -> Result<Listing<CartItem>, ApiError> {
        let url = self.api.endpoint(&["cart", "update", id])?;
        let request = self
            .http()
            .put(url)
            .json(&serde_json::json!({ "quantity": quantity }));
        self.listing::<CartItem>("PUT /cart/update", request).await
    }

    // =========================================================================
    // Wishlist Methods
    // =========================================================================

    /// Move a wishlist item into the cart on the server.
    ///
    /// Returns the remaining wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is malformed.
    #[instrument(skip(self))]
    pub async fn move_to_cart(&self, id: &str) -> Result<Listing<WishlistItem>, ApiError> {
        let url = self.api.endpoint(&["wishlist", "move-to-cart", id])?;
        self.listing::<WishlistItem>("POST /wishlist/move-to-cart", self.http().post(url))
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn test_client(server: &MockServer) -> AuthenticatedClient {
        let config = ApiConfig::new(&format!("{}/api", server.uri())).unwrap();
        ApiClient::new(&config)
            .unwrap()
            .authenticated(SecretString::from("test-token"))
    }

    fn rose() -> serde_json::Value {
        serde_json::json!({"id": "p1", "name": "Rose", "price": 20, "quantity": 1})
    }

    #[tokio::test]
    async fn test_fetch_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/cart"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"success": true, "cartItems": [rose()]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let items = test_client(&server).fetch::<CartItem>().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].price, Decimal::from(20));
    }

    #[tokio::test]
    async fn test_add_created() {
        let server = MockServer::start().await;
        let item = CartItem::new("p1", "Rose", Decimal::from(20));
        Mock::given(method("POST"))
            .and(path("/api/cart/add"))
            .and(body_json(serde_json::to_value(&item).unwrap()))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(serde_json::json!({"success": true, "cartItems": [rose()]})),
            )
            .mount(&server)
            .await;

        let outcome = test_client(&server).add(&item).await;
        assert!(matches!(outcome, AddOutcome::Created(ref l) if l.items.len() == 1));
    }

    #[tokio::test]
    async fn test_add_conflict_is_already_exists() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/wishlist/add"))
            .respond_with(ResponseTemplate::new(409).set_body_json(
                serde_json::json!({"success": false, "message": "Already in wishlist"}),
            ))
            .mount(&server)
            .await;

        let item = WishlistItem::new("w1", "Oud", Decimal::from(45));
        let outcome = test_client(&server).add(&item).await;
        assert!(
            matches!(outcome, AddOutcome::AlreadyExists(Some(ref m)) if m == "Already in wishlist")
        );
    }

    #[tokio::test]
    async fn test_add_server_error_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/cart/add"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let item = CartItem::new("p1", "Rose", Decimal::from(20));
        let outcome = test_client(&server).add(&item).await;
        assert!(matches!(
            outcome,
            AddOutcome::Error(ApiError::Api {
                status: 500,
                message: None
            })
        ));
    }

    #[tokio::test]
    async fn test_remove_encodes_id_and_size() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/cart/remove/gift%20set"))
            .and(query_param("selectedSize", "50ml"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"success": true, "message": "Removed", "cartItems": []}),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let listing = test_client(&server)
            .remove::<CartItem>("gift set", Some("50ml"))
            .await
            .unwrap();
        assert!(listing.items.is_empty());
        assert_eq!(listing.message.as_deref(), Some("Removed"));
    }

    #[tokio::test]
    async fn test_update_quantity_body() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/cart/update/p1"))
            .and(body_json(serde_json::json!({"quantity": 3})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "cartItems": [{"id": "p1", "name": "Rose", "price": 20, "quantity": 3}]
            })))
            .mount(&server)
            .await;

        let listing = test_client(&server).update_quantity("p1", 3).await.unwrap();
        assert_eq!(listing.items[0].quantity, Some(3));
    }

    #[tokio::test]
    async fn test_clear_reports_unsuccessful_ack() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/cart/clear"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"success": false, "message": "Cart locked"}),
            ))
            .mount(&server)
            .await;

        let ack = test_client(&server)
            .clear(CollectionKind::Cart)
            .await
            .unwrap();
        assert_eq!(
            ack,
            Ack {
                success: false,
                message: Some("Cart locked".to_string())
            }
        );
    }

    #[tokio::test]
    async fn test_move_to_cart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/wishlist/move-to-cart/w1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "message": "Moved to cart",
                "wishlistItems": []
            })))
            .mount(&server)
            .await;

        let listing = test_client(&server).move_to_cart("w1").await.unwrap();
        assert!(listing.items.is_empty());
        assert_eq!(listing.message.as_deref(), Some("Moved to cart"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/wishlist"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let result = test_client(&server).fetch::<WishlistItem>().await;
        assert!(matches!(result, Err(ApiError::Parse(_))));
    }
}
