//! Secret references for configuration values
//!
//! Rewrites configuration values of the form `aws:<secret-id>` or
//! `aws:<secret-id>:<field>` with material fetched from a secret store,
//! leaving every other value untouched.
//!
//! - [`SecretReference`] parses the reference syntax
//! - [`SecretStore`] is the capability a backend must provide
//! - [`SecretCache`] fetches each secret at most once and coalesces
//!   concurrent requests for the same identifier
//! - [`SecretReferenceResolver`] resolves single values and whole mappings
//!
//! # Example
//!
//! ```ignore
//! use secretref::{ResolverOptions, SecretReferenceResolver};
//!
//! let resolver = SecretReferenceResolver::new(store, ResolverOptions::default());
//!
//! // {"host": "db.internal", "password": "aws:db-creds:pass"}
//! let resolved = resolver.resolve_mapping(&config).await?;
//! ```
//!
//! [`MemorySecretStore`] is built in. Remote stores live in separate crates:
//! - secretref-aws: `AwsSecretStore`

mod cache;
mod memory;
mod reference;
mod resolver;
mod store;
mod types;

pub use cache::SecretCache;
pub use memory::MemorySecretStore;
pub use reference::{REFERENCE_PREFIX, SecretReference};
pub use resolver::{MissingFieldPolicy, ResolverOptions, SecretReferenceResolver};
pub use store::{SecretPayload, SecretStore, StoreError};
pub use types::{SecretValue, SecureSecret};

use thiserror::Error;

/// Error types for secret resolution
#[derive(Debug, Error)]
pub enum SecretError {
    /// Reference string does not have 2 or 3 `:`-separated parts
    #[error("Invalid secret reference '{reference}': expected aws:<secret-id> or aws:<secret-id>:<field>")]
    InvalidReference {
        /// The offending configuration value
        reference: String,
    },

    /// The secret store call failed (not found, denied, transient fault)
    #[error("Failed to fetch secret '{secret_id}': {source}")]
    FetchFailed {
        /// Secret identifier
        secret_id: String,
        /// Error reported by the store
        #[source]
        source: StoreError,
    },

    /// The secret has no textual payload
    #[error("Secret '{secret_id}' has no string value (may be binary)")]
    BinaryPayload {
        /// Secret identifier
        secret_id: String,
    },

    /// The payload was requested as structured data but is not a JSON object
    #[error("Secret '{secret_id}' is not a valid JSON object: {source}")]
    Decode {
        /// Secret identifier
        secret_id: String,
        /// Parser error
        #[source]
        source: serde_json::Error,
    },

    /// The requested field is absent from the decoded payload
    #[error("Field '{field}' not found in secret '{secret_id}' (referenced by '{reference}')")]
    FieldNotFound {
        /// The reference string being resolved
        reference: String,
        /// Secret identifier
        secret_id: String,
        /// Requested field
        field: String,
    },
}

impl SecretError {
    /// Whether re-running resolution may succeed without changing
    /// configuration or secret content.
    ///
    /// Failures are never cached, so a retry always reaches the store again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::FetchFailed {
                source: StoreError::Unavailable { .. },
                ..
            }
        )
    }

    /// The secret identifier involved, if the error concerns a specific secret.
    #[must_use]
    pub fn secret_id(&self) -> Option<&str> {
        match self {
            Self::InvalidReference { .. } => None,
            Self::FetchFailed { secret_id, .. }
            | Self::BinaryPayload { secret_id }
            | Self::Decode { secret_id, .. }
            | Self::FieldNotFound { secret_id, .. } => Some(secret_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_reference_message() {
        let err = SecretError::InvalidReference {
            reference: "aws:a:b:c".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("aws:a:b:c"));
        assert!(err.secret_id().is_none());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_fetch_failed_keeps_source() {
        let err = SecretError::FetchFailed {
            secret_id: "missing-id".to_string(),
            source: StoreError::NotFound {
                message: "ResourceNotFoundException".to_string(),
            },
        };
        assert!(err.to_string().contains("missing-id"));
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.secret_id(), Some("missing-id"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_unavailable_store_is_retryable() {
        let err = SecretError::FetchFailed {
            secret_id: "db-creds".to_string(),
            source: StoreError::Unavailable {
                message: "connection reset".to_string(),
            },
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn test_binary_payload_message() {
        let err = SecretError::BinaryPayload {
            secret_id: "cert-bundle".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("cert-bundle"));
        assert!(msg.contains("binary"));
    }

    #[test]
    fn test_decode_message() {
        let source = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = SecretError::Decode {
            secret_id: "api-token".to_string(),
            source,
        };
        assert!(err.to_string().contains("api-token"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_field_not_found_message() {
        let err = SecretError::FieldNotFound {
            reference: "aws:db-creds:port".to_string(),
            secret_id: "db-creds".to_string(),
            field: "port".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'port'"));
        assert!(msg.contains("'db-creds'"));
        assert!(msg.contains("aws:db-creds:port"));
    }
}
