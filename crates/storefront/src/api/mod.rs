//! REST backend client for carts and wishlists.
//!
//! # Architecture
//!
//! - The server is source of truth for signed-in shoppers: every mutation
//!   returns the full, authoritative item list
//! - Credentials travel on an explicit [`AuthenticatedClient`] built per
//!   identity epoch; there is no process-wide default header
//! - Duplicate adds surface as [`AddOutcome::AlreadyExists`] rather than as an
//!   error status the caller has to inspect
//!
//! # Endpoints
//!
//! | Method | Path                          | Response                             |
//! |--------|-------------------------------|--------------------------------------|
//! | GET    | `/{kind}`                     | `{ success, {kind}Items }`           |
//! | POST   | `/{kind}/add`                 | `{ success, {kind}Items }`           |
//! | DELETE | `/{kind}/remove/{id}`         | `{ success, message, {kind}Items }`  |
//! | PUT    | `/cart/update/{id}`           | `{ success, cartItems }`             |
//! | DELETE | `/{kind}/clear`               | `{ success, message }`               |
//! | POST   | `/wishlist/move-to-cart/{id}` | `{ success, message, wishlistItems }`|

mod client;

pub use client::{ApiClient, AuthenticatedClient};

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when talking to the REST backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("API error: {status}{}", format_server_message(.message.as_deref()))]
    Api {
        status: u16,
        message: Option<String>,
    },

    /// The backend answered `success: false`.
    #[error("Request rejected{}", format_server_message(.0.as_deref()))]
    Rejected(Option<String>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The response parsed but lacked a required part.
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl ApiError {
    /// Message supplied by the backend, if any.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Api { message, .. } | Self::Rejected(message) => message.as_deref(),
            _ => None,
        }
    }

    /// Message to show the shopper: the backend's own if present, else `fallback`.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        self.server_message()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(fallback)
            .to_string()
    }
}

fn format_server_message(message: Option<&str>) -> String {
    message.map(|m| format!(" - {m}")).unwrap_or_default()
}

/// Result of a remote add.
#[derive(Debug)]
pub enum AddOutcome<T> {
    /// The item was added; carries the authoritative list.
    Created(Listing<T>),
    /// The item was already in the server-side collection.
    AlreadyExists(Option<String>),
    /// The add failed for any other reason.
    Error(ApiError),
}

/// Authoritative item list returned by a mutation.
#[derive(Debug, Clone)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub message: Option<String>,
}

/// Acknowledgement from an endpoint that returns no items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub success: bool,
    pub message: Option<String>,
}

/// Response envelope shared by all endpoints.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(alias = "cartItems", alias = "wishlistItems")]
    items: Option<Vec<T>>,
}

impl<T> Envelope<T> {
    /// Convert into a listing, requiring `success` and an item list.
    fn into_listing(self, endpoint: &str) -> Result<Listing<T>, ApiError> {
        if !self.success {
            return Err(ApiError::Rejected(self.message));
        }
        let items = self
            .items
            .ok_or_else(|| ApiError::Malformed(format!("{endpoint} response has no item list")))?;
        Ok(Listing {
            items,
            message: self.message,
        })
    }
}

/// Error body of a non-success response.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}
