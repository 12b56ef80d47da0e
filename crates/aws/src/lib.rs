//! AWS Secrets Manager store for secretref
//!
//! Provides [`AwsSecretStore`], the [`SecretStore`](secretref::SecretStore)
//! behind `aws:<secret-id>[:<field>]` configuration references.

pub mod secrets;

// Re-export main types for convenience
pub use secrets::{AwsSecretStore, AwsStoreConfig, AwsStoreMode, DEFAULT_REGION};
