//! Shopper identity and identity epochs.
//!
//! An identity epoch lasts as long as one shopper (or the anonymous shopper)
//! is active. Signing in, signing out, or switching accounts starts a new
//! epoch. Rotating the bearer token of the same account does not.

use secrecy::{ExposeSecret, SecretString};

/// Who is using the storefront.
#[derive(Clone, Default)]
pub enum Identity {
    /// Nobody is signed in; collections live on the device.
    #[default]
    Anonymous,
    /// A signed-in shopper; collections live on the server.
    Authenticated {
        /// Account identifier
        user_id: String,
        /// Bearer token for the REST backend
        token: SecretString,
    },
}

/// How a new identity relates to the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityChange {
    /// Same shopper, same token.
    Unchanged,
    /// Same shopper with a new bearer token.
    TokenRotated,
    /// A different shopper: the current epoch ends.
    NewEpoch,
}

impl Identity {
    /// Create a signed-in identity.
    #[must_use]
    pub fn authenticated(user_id: impl Into<String>, token: impl Into<SecretString>) -> Self {
        Self::Authenticated {
            user_id: user_id.into(),
            token: token.into(),
        }
    }

    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    /// Account identifier, if signed in.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated { user_id, .. } => Some(user_id),
        }
    }

    /// Bearer token, if signed in.
    #[must_use]
    pub const fn token(&self) -> Option<&SecretString> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated { token, .. } => Some(token),
        }
    }

    /// Classify a switch from `self` to `next`.
    #[must_use]
    pub fn change_to(&self, next: &Self) -> IdentityChange {
        if self.user_id() != next.user_id() {
            return IdentityChange::NewEpoch;
        }
        match (self.token(), next.token()) {
            (Some(current), Some(new)) if current.expose_secret() != new.expose_secret() => {
                IdentityChange::TokenRotated
            }
            _ => IdentityChange::Unchanged,
        }
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::Authenticated { user_id, .. } => f
                .debug_struct("Authenticated")
                .field("user_id", user_id)
                .field("token", &"[REDACTED]")
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, token: &str) -> Identity {
        Identity::authenticated(id, SecretString::from(token))
    }

    #[test]
    fn test_login_logout_and_switch_start_new_epochs() {
        let anon = Identity::Anonymous;
        let alice = user("alice", "t1");
        let bob = user("bob", "t1");

        assert_eq!(anon.change_to(&alice), IdentityChange::NewEpoch);
        assert_eq!(alice.change_to(&anon), IdentityChange::NewEpoch);
        assert_eq!(alice.change_to(&bob), IdentityChange::NewEpoch);
    }

    #[test]
    fn test_token_rotation_keeps_epoch() {
        assert_eq!(
            user("alice", "t1").change_to(&user("alice", "t2")),
            IdentityChange::TokenRotated
        );
        assert_eq!(
            user("alice", "t1").change_to(&user("alice", "t1")),
            IdentityChange::Unchanged
        );
        assert_eq!(
            Identity::Anonymous.change_to(&Identity::Anonymous),
            IdentityChange::Unchanged
        );
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug_output = format!("{:?}", user("alice", "very_secret_token"));
        assert!(debug_output.contains("alice"));
        assert!(!debug_output.contains("very_secret_token"));
    }
}
