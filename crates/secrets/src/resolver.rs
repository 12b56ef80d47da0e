//! Resolution of secret references inside configuration values
//!
//! Only top-level values are inspected: a reference nested inside an object
//! or array is passed through untouched.

use crate::{SecretCache, SecretError, SecretReference, SecretStore};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// What to do when `aws:<id>:<field>` names a field the secret lacks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MissingFieldPolicy {
    /// Fail with [`SecretError::FieldNotFound`]
    #[default]
    Error,
    /// Resolve to JSON `null`
    Null,
}

/// Resolver behavior, embeddable in a larger configuration document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolverOptions {
    /// Handling of fields absent from a structured secret
    #[serde(default)]
    pub missing_field: MissingFieldPolicy,
}

impl ResolverOptions {
    /// Options that resolve missing fields to `null` instead of failing
    #[must_use]
    pub const fn lenient() -> Self {
        Self {
            missing_field: MissingFieldPolicy::Null,
        }
    }
}

/// Replaces secret references in configuration values with secret material.
///
/// # Example
///
/// ```ignore
/// let resolver = SecretReferenceResolver::new(store, ResolverOptions::default());
///
/// let password = resolver.resolve_value(&json!("aws:db-creds:pass")).await?;
/// let config = resolver.resolve_mapping(&raw_config).await?;
/// ```
#[derive(Debug)]
pub struct SecretReferenceResolver<S: SecretStore> {
    cache: SecretCache<S>,
    options: ResolverOptions,
}

impl<S: SecretStore> SecretReferenceResolver<S> {
    /// Create a resolver with a fresh cache in front of `store`
    #[must_use]
    pub fn new(store: S, options: ResolverOptions) -> Self {
        Self::with_cache(SecretCache::new(store), options)
    }

    /// Create a resolver around an existing cache
    #[must_use]
    pub const fn with_cache(cache: SecretCache<S>, options: ResolverOptions) -> Self {
        Self { cache, options }
    }

    /// The cache backing this resolver
    #[must_use]
    pub const fn cache(&self) -> &SecretCache<S> {
        &self.cache
    }

    /// The options this resolver was built with
    #[must_use]
    pub const fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Resolve a single configuration value.
    ///
    /// Non-strings and strings without the `aws:` prefix are returned as-is.
    ///
    /// # Errors
    ///
    /// Returns an error if the reference is malformed or the secret cannot
    /// be fetched, decoded or does not contain the requested field.
    pub async fn resolve_value(&self, value: &Value) -> Result<Value, SecretError> {
        let Value::String(text) = value else {
            return Ok(value.clone());
        };

        match SecretReference::parse(text)? {
            Some(reference) => self.resolve_reference(&reference).await,
            None => Ok(value.clone()),
        }
    }

    /// Resolve an already parsed reference.
    ///
    /// # Errors
    ///
    /// Same as [`resolve_value`](Self::resolve_value), minus malformed references.
    pub async fn resolve_reference(
        &self,
        reference: &SecretReference,
    ) -> Result<Value, SecretError> {
        let secret = self
            .cache
            .fetch_secret(&reference.secret_id, reference.is_structured())
            .await?;

        let Some(field) = &reference.field else {
            return Ok(secret.into_value());
        };

        if let Some(value) = secret.field(field) {
            return Ok(value.clone());
        }

        match self.options.missing_field {
            MissingFieldPolicy::Error => Err(SecretError::FieldNotFound {
                reference: reference.to_string(),
                secret_id: reference.secret_id.clone(),
                field: field.clone(),
            }),
            MissingFieldPolicy::Null => {
                tracing::warn!(
                    secret_id = %reference.secret_id,
                    field = %field,
                    "Field not found in secret, resolving to null"
                );
                Ok(Value::Null)
            }
        }
    }

    /// Resolve every top-level value of a configuration mapping concurrently.
    ///
    /// The input is left untouched. If several entries fail, which error is
    /// reported is unspecified.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered; there is no partial result.
    pub async fn resolve_mapping(
        &self,
        config: &Map<String, Value>,
    ) -> Result<Map<String, Value>, SecretError> {
        let futures: Vec<_> = config
            .iter()
            .map(|(key, value)| async move {
                let resolved = self.resolve_value(value).await?;
                Ok::<_, SecretError>((key.clone(), resolved))
            })
            .collect();

        let entries = try_join_all(futures).await?;

        tracing::debug!(
            entries = entries.len(),
            cached_secrets = self.cache.len(),
            "Resolved configuration mapping"
        );

        Ok(entries.into_iter().collect())
    }
}
