//! In-memory secret store
//!
//! Useful for tests and for wiring literal secrets into a configuration
//! pipeline without a remote backend. Every call is counted so callers can
//! assert how often the store was actually reached.

use crate::{SecretPayload, SecretStore, SecureSecret, StoreError};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

#[derive(Default)]
struct MemoryState {
    secrets: HashMap<String, SecretPayload>,
    fetches: HashMap<String, usize>,
    scripted_failures: HashMap<String, VecDeque<StoreError>>,
}

/// Secret store backed by a `HashMap`
#[derive(Default)]
pub struct MemorySecretStore {
    state: Mutex<MemoryState>,
    latency: Option<Duration>,
}

impl MemorySecretStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every fetch by `latency` before answering.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Add or replace a secret with a string payload.
    #[must_use]
    pub fn with_secret(self, secret_id: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(secret_id, value);
        self
    }

    /// Add or replace a secret with a string payload.
    pub fn insert(&self, secret_id: impl Into<String>, value: impl Into<String>) {
        self.lock().secrets.insert(
            secret_id.into(),
            SecretPayload::Text(SecureSecret::new(value.into())),
        );
    }

    /// Add or replace a secret that has no string payload.
    pub fn insert_binary(&self, secret_id: impl Into<String>) {
        self.lock()
            .secrets
            .insert(secret_id.into(), SecretPayload::Binary);
    }

    /// Make the next fetch of `secret_id` fail with `error`.
    ///
    /// Failures queue up; each fetch consumes one before the stored value is
    /// consulted.
    pub fn fail_next(&self, secret_id: impl Into<String>, error: StoreError) {
        self.lock()
            .scripted_failures
            .entry(secret_id.into())
            .or_default()
            .push_back(error);
    }

    /// Number of fetches issued for `secret_id`.
    #[must_use]
    pub fn fetch_count(&self, secret_id: &str) -> usize {
        self.lock().fetches.get(secret_id).copied().unwrap_or(0)
    }

    /// Number of fetches issued across all identifiers.
    #[must_use]
    pub fn total_fetches(&self) -> usize {
        self.lock().fetches.values().sum()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn answer(&self, secret_id: &str) -> Result<SecretPayload, StoreError> {
        let mut state = self.lock();
        *state.fetches.entry(secret_id.to_string()).or_default() += 1;

        if let Some(error) = state
            .scripted_failures
            .get_mut(secret_id)
            .and_then(VecDeque::pop_front)
        {
            return Err(error);
        }

        state
            .secrets
            .get(secret_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                message: format!("no secret named '{secret_id}'"),
            })
    }
}

impl std::fmt::Debug for MemorySecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("MemorySecretStore")
            .field("secrets", &state.secrets.keys().collect::<Vec<_>>())
            .field("latency", &self.latency)
            .finish()
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get_secret_value(&self, secret_id: &str) -> Result<SecretPayload, StoreError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.answer(secret_id)
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}
