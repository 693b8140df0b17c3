//! Unified error handling with Sentry integration.
//!
//! Collection mutations report failures as notices, so [`AppError`] only
//! covers setting a storefront up. The helpers below keep Sentry's user
//! context in step with the signed-in shopper.

use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;

/// Error raised while building a [`Storefront`](crate::Storefront).
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration was missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The REST client could not be built.
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

impl AppError {
    /// Capture the error to Sentry and log it with the event ID.
    pub fn report(&self) {
        let event_id = sentry::capture_error(self);
        tracing::error!(
            error = %self,
            sentry_event_id = %event_id,
            "Storefront setup failed"
        );
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Associate subsequent Sentry events with a shopper.
pub fn set_sentry_user(user_id: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on sign-out to stop associating errors with the shopper.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::from(ConfigError::MissingEnvVar("ATTAR_API_URL".to_string()));
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing environment variable: ATTAR_API_URL"
        );

        let err = AppError::from(ApiError::Malformed("no base path".to_string()));
        assert!(err.to_string().starts_with("API error: "));
    }
}
