//! Secure secret types with automatic memory zeroing
//!
//! - [`SecureSecret`]: a wrapper around `secrecy::SecretString` that auto-zeros on drop
//! - [`SecretValue`]: what the accessor hands back, either the raw payload or its
//!   decoded structured form

use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};

/// A secret payload with automatic memory zeroing on drop.
///
/// Debug and Display output show `[REDACTED]`; callers must go through
/// [`expose`](SecureSecret::expose) to read the value.
#[derive(Clone)]
pub struct SecureSecret {
    inner: SecretString,
}

impl SecureSecret {
    /// Move a string into secure storage.
    #[must_use]
    pub fn new(value: String) -> Self {
        Self {
            inner: SecretString::from(value),
        }
    }

    /// Expose the secret value for use.
    ///
    /// The exposed value must not be logged or persisted.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.inner.expose_secret()
    }

    /// Get the length of the secret value without exposing it.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.expose_secret().len()
    }

    /// Check if the secret value is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.expose_secret().is_empty()
    }
}

impl From<&str> for SecureSecret {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

impl std::fmt::Debug for SecureSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl std::fmt::Display for SecureSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// A secret as returned by [`SecretCache::fetch_secret`](crate::SecretCache::fetch_secret).
#[derive(Clone)]
pub enum SecretValue {
    /// The full string payload, untouched.
    Text(SecureSecret),
    /// The payload decoded as a JSON object.
    Structured(Map<String, Value>),
}

impl SecretValue {
    /// Look up a field of a structured secret.
    ///
    /// Always `None` for [`SecretValue::Text`].
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Text(_) => None,
            Self::Structured(fields) => fields.get(name),
        }
    }

    /// Convert into a configuration value, exposing the secret material.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Text(secret) => Value::String(secret.expose().to_string()),
            Self::Structured(fields) => Value::Object(fields),
        }
    }
}

impl std::fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(_) => f.write_str("Text([REDACTED])"),
            Self::Structured(fields) => f
                .debug_struct("Structured")
                .field("fields", &fields.keys().collect::<Vec<_>>())
                .finish(),
        }
    }
}
