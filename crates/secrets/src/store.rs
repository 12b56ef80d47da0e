//! The secret store a [`SecretCache`](crate::SecretCache) fetches from

use crate::SecureSecret;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Errors reported by a [`SecretStore`] backend
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// No secret exists under the identifier
    #[error("secret not found: {message}")]
    NotFound {
        /// Backend message
        message: String,
    },

    /// The caller may not read the secret
    #[error("access denied: {message}")]
    AccessDenied {
        /// Backend message
        message: String,
    },

    /// The store rejected the request (malformed identifier, bad parameters)
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// Backend message
        message: String,
    },

    /// The store could not be reached or failed transiently
    #[error("store unavailable: {message}")]
    Unavailable {
        /// Backend message
        message: String,
    },
}

/// A secret as returned by the store
#[derive(Clone)]
pub enum SecretPayload {
    /// The secret's string payload
    Text(SecureSecret),
    /// The secret carries no string payload (binary-only secret)
    Binary,
}

impl std::fmt::Debug for SecretPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(secret) => f.debug_tuple("Text").field(secret).finish(),
            Self::Binary => f.write_str("Binary"),
        }
    }
}

/// A backend able to fetch a secret by identifier.
///
/// Implementations perform no caching; [`SecretCache`](crate::SecretCache)
/// sits in front of them.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch the current value of a secret.
    async fn get_secret_value(&self, secret_id: &str) -> Result<SecretPayload, StoreError>;

    /// Provider identifier used in log events.
    /// Examples: `"aws"`, `"memory"`
    fn provider_name(&self) -> &'static str;
}

#[async_trait]
impl<S: SecretStore + ?Sized> SecretStore for Arc<S> {
    async fn get_secret_value(&self, secret_id: &str) -> Result<SecretPayload, StoreError> {
        (**self).get_secret_value(secret_id).await
    }

    fn provider_name(&self) -> &'static str {
        (**self).provider_name()
    }
}

#[async_trait]
impl<S: SecretStore + ?Sized> SecretStore for Box<S> {
    async fn get_secret_value(&self, secret_id: &str) -> Result<SecretPayload, StoreError> {
        (**self).get_secret_value(secret_id).await
    }

    fn provider_name(&self) -> &'static str {
        (**self).provider_name()
    }
}
