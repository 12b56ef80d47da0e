//! End-to-end resolution of configuration mappings against an in-memory store

use secretref::{
    MemorySecretStore, ResolverOptions, SecretError, SecretReferenceResolver, SecretStore,
    StoreError,
};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::Duration;

const DB_CREDS: &str = r#"{"user":"app","pass":"s3cr3t"}"#;

fn store() -> Arc<MemorySecretStore> {
    Arc::new(
        MemorySecretStore::new()
            .with_secret("db-creds", DB_CREDS)
            .with_secret("smtp-password", "hunter2"),
    )
}

fn config(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("Expected object, got {other}"),
    }
}

#[tokio::test]
async fn field_and_whole_secret_references() {
    let resolver = SecretReferenceResolver::new(store(), ResolverOptions::default());

    let pass = resolver
        .resolve_value(&json!("aws:db-creds:pass"))
        .await
        .unwrap();
    assert_eq!(pass, json!("s3cr3t"));

    // Two-part form returns the raw JSON text, not the parsed object
    let raw = resolver.resolve_value(&json!("aws:db-creds")).await.unwrap();
    assert_eq!(raw, json!(DB_CREDS));
}

#[tokio::test]
async fn missing_secret_names_the_identifier() {
    let resolver = SecretReferenceResolver::new(store(), ResolverOptions::default());

    let err = resolver
        .resolve_value(&json!("aws:missing-id"))
        .await
        .unwrap_err();

    assert!(matches!(err, SecretError::FetchFailed { .. }));
    assert_eq!(err.secret_id(), Some("missing-id"));
    assert!(err.to_string().contains("missing-id"));
}

#[tokio::test]
async fn mapping_keeps_plain_entries() {
    let resolver = SecretReferenceResolver::new(store(), ResolverOptions::default());

    let resolved = resolver
        .resolve_mapping(&config(json!({"a": "x", "b": "aws:smtp-password"})))
        .await
        .unwrap();

    assert_eq!(Value::Object(resolved), json!({"a": "x", "b": "hunter2"}));
}

#[tokio::test]
async fn warm_cache_issues_no_further_fetches() {
    let store = store();
    let resolver = SecretReferenceResolver::new(Arc::clone(&store), ResolverOptions::default());
    let raw = config(json!({
        "db_user": "aws:db-creds:user",
        "db_pass": "aws:db-creds:pass",
        "smtp": "aws:smtp-password",
        "port": 587,
    }));

    let first = resolver.resolve_mapping(&raw).await.unwrap();
    assert_eq!(store.fetch_count("db-creds"), 1);
    assert_eq!(store.fetch_count("smtp-password"), 1);

    let second = resolver.resolve_mapping(&raw).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(store.total_fetches(), 2);
}

#[tokio::test]
async fn concurrent_first_use_fetches_once() {
    let store = Arc::new(
        MemorySecretStore::new()
            .with_latency(Duration::from_millis(25))
            .with_secret("db-creds", DB_CREDS),
    );
    let resolver = SecretReferenceResolver::new(Arc::clone(&store), ResolverOptions::default());

    let raw = config(json!({
        "a": "aws:db-creds:user",
        "b": "aws:db-creds:pass",
        "c": "aws:db-creds",
        "d": "aws:db-creds:user",
    }));

    resolver.resolve_mapping(&raw).await.unwrap();
    assert_eq!(store.fetch_count("db-creds"), 1);
}

#[tokio::test]
async fn separate_resolvers_keep_separate_caches() {
    let store = store();
    let first = SecretReferenceResolver::new(Arc::clone(&store), ResolverOptions::default());
    let second = SecretReferenceResolver::new(Arc::clone(&store), ResolverOptions::default());

    first.resolve_value(&json!("aws:smtp-password")).await.unwrap();
    second.resolve_value(&json!("aws:smtp-password")).await.unwrap();

    assert_eq!(store.fetch_count("smtp-password"), 2);
    assert!(first.cache().contains("smtp-password"));
}

#[tokio::test]
async fn denied_secret_fails_the_whole_mapping() {
    let store = store();
    store.fail_next(
        "db-creds",
        StoreError::AccessDenied {
            message: "not authorized to perform GetSecretValue".to_string(),
        },
    );
    let resolver = SecretReferenceResolver::new(Arc::clone(&store), ResolverOptions::default());

    let result = resolver
        .resolve_mapping(&config(json!({
            "smtp": "aws:smtp-password",
            "db": "aws:db-creds:pass",
        })))
        .await;

    let err = result.unwrap_err();
    assert!(!err.is_retryable());
    assert_eq!(err.secret_id(), Some("db-creds"));
}

#[tokio::test]
async fn trait_object_store() {
    let store: Arc<dyn SecretStore> = store();
    let resolver = SecretReferenceResolver::new(store, ResolverOptions::lenient());

    let value = resolver
        .resolve_value(&json!("aws:db-creds:host"))
        .await
        .unwrap();
    assert_eq!(value, Value::Null);
}
