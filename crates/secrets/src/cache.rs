//! Secret store accessor with a process-lifetime cache
//!
//! Each identifier is fetched from the store at most once. Concurrent first
//! requests for the same identifier wait on a single in-flight fetch. A failed
//! fetch leaves nothing behind, so the next request goes back to the store.
//! Entries are never refreshed or evicted.

use crate::{SecretError, SecretPayload, SecretStore, SecretValue, SecureSecret};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::OnceCell;

/// A fetched secret: the raw payload plus its lazily decoded object form
struct CachedSecret {
    raw: SecureSecret,
    structured: once_cell::sync::OnceCell<Map<String, Value>>,
}

impl CachedSecret {
    fn new(raw: SecureSecret) -> Self {
        Self {
            raw,
            structured: once_cell::sync::OnceCell::new(),
        }
    }
}

type Slot = Arc<OnceCell<Arc<CachedSecret>>>;

/// Caching front for a [`SecretStore`]
///
/// Construct one per process (or per configuration load) and share it; every
/// [`SecretReferenceResolver`](crate::SecretReferenceResolver) owns one.
pub struct SecretCache<S> {
    store: S,
    slots: Mutex<HashMap<String, Slot>>,
}

impl<S: SecretStore> SecretCache<S> {
    /// Create an empty cache in front of `store`
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// The underlying store
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Fetch a secret, serving it from the cache when already present.
    ///
    /// With `as_structured` the payload is decoded as a JSON object; the
    /// decoded form is memoized alongside the raw payload, so asking for the
    /// same secret in both forms costs one store call.
    ///
    /// # Errors
    ///
    /// - [`SecretError::FetchFailed`] if the store call fails (not cached)
    /// - [`SecretError::BinaryPayload`] if the secret has no string payload
    /// - [`SecretError::Decode`] if `as_structured` is set and the payload is
    ///   not a JSON object
    pub async fn fetch_secret(
        &self,
        secret_id: &str,
        as_structured: bool,
    ) -> Result<SecretValue, SecretError> {
        let slot = self.slot(secret_id);

        if slot.initialized() {
            tracing::trace!(secret_id, "Secret served from cache");
        }

        let entry = match slot
            .get_or_try_init(|| self.fetch_from_store(secret_id))
            .await
        {
            Ok(entry) => entry,
            Err(err) => {
                self.release_slot(secret_id, &slot);
                return Err(err);
            }
        };

        if !as_structured {
            return Ok(SecretValue::Text(entry.raw.clone()));
        }

        let fields = entry
            .structured
            .get_or_try_init(|| serde_json::from_str::<Map<String, Value>>(entry.raw.expose()))
            .map_err(|source| SecretError::Decode {
                secret_id: secret_id.to_string(),
                source,
            })?;

        Ok(SecretValue::Structured(fields.clone()))
    }

    /// Number of secrets currently cached
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock_slots()
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    /// Check if nothing has been cached yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if a secret is cached
    #[must_use]
    pub fn contains(&self, secret_id: &str) -> bool {
        self.lock_slots()
            .get(secret_id)
            .is_some_and(|slot| slot.initialized())
    }

    /// Get or create the slot for an identifier
    fn slot(&self, secret_id: &str) -> Slot {
        let mut slots = self.lock_slots();
        Arc::clone(slots.entry(secret_id.to_string()).or_default())
    }

    /// Drop a slot left empty by a failed fetch, unless a newer slot or a
    /// concurrent successful fetch has taken its place
    fn release_slot(&self, secret_id: &str, slot: &Slot) {
        let mut slots = self.lock_slots();
        let stale = slots
            .get(secret_id)
            .is_some_and(|current| Arc::ptr_eq(current, slot) && !current.initialized());
        if stale {
            slots.remove(secret_id);
        }
    }

    fn lock_slots(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn fetch_from_store(&self, secret_id: &str) -> Result<Arc<CachedSecret>, SecretError> {
        tracing::debug!(
            secret_id,
            provider = self.store.provider_name(),
            "Fetching secret from store"
        );

        let payload = self
            .store
            .get_secret_value(secret_id)
            .await
            .map_err(|source| {
                tracing::debug!(secret_id, error = %source, "Secret fetch failed");
                SecretError::FetchFailed {
                    secret_id: secret_id.to_string(),
                    source,
                }
            })?;

        match payload {
            SecretPayload::Text(raw) => Ok(Arc::new(CachedSecret::new(raw))),
            SecretPayload::Binary => Err(SecretError::BinaryPayload {
                secret_id: secret_id.to_string(),
            }),
        }
    }
}

impl<S: SecretStore> std::fmt::Debug for SecretCache<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCache")
            .field("provider", &self.store.provider_name())
            .field("cached", &self.len())
            .finish()
    }
}
