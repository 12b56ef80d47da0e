//! AWS Secrets Manager store with auto-negotiating dual-mode (HTTP + CLI)

use async_trait::async_trait;
use aws_sdk_secretsmanager::Client;
use aws_sdk_secretsmanager::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_secretsmanager::operation::get_secret_value::{
    GetSecretValueError, GetSecretValueOutput,
};
use secretref::{
    ResolverOptions, SecretPayload, SecretReferenceResolver, SecretStore, SecureSecret, StoreError,
};
use serde::{Deserialize, Serialize};
use tokio::process::Command;

/// Region used when neither the config nor `AWS_REGION` names one
pub const DEFAULT_REGION: &str = "us-west-2";

/// How [`AwsSecretStore`] talks to Secrets Manager
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AwsStoreMode {
    /// HTTP when `AWS_ACCESS_KEY_ID` and `AWS_SECRET_ACCESS_KEY` are set, CLI otherwise
    #[default]
    Auto,
    /// Always use the AWS SDK
    Http,
    /// Always shell out to the `aws` CLI
    Cli,
}

/// Configuration for the AWS Secrets Manager store
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AwsStoreConfig {
    /// Region to query (falls back to `AWS_REGION`, then [`DEFAULT_REGION`])
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Transport selection
    #[serde(default)]
    pub mode: AwsStoreMode,

    /// Version stage to fetch (optional, defaults to AWSCURRENT)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_stage: Option<String>,
}

impl AwsStoreConfig {
    /// Create a config with auto-detected mode and default region
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the region
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Force a transport
    #[must_use]
    pub const fn with_mode(mut self, mode: AwsStoreMode) -> Self {
        self.mode = mode;
        self
    }

    /// The region requests go to
    #[must_use]
    pub fn effective_region(&self) -> String {
        self.region
            .clone()
            .or_else(|| std::env::var("AWS_REGION").ok().filter(|r| !r.is_empty()))
            .unwrap_or_else(|| DEFAULT_REGION.to_string())
    }
}

/// Fetches secrets from AWS Secrets Manager
///
/// Mode is negotiated from [`AwsStoreMode`]; in `Auto` mode:
/// - If `AWS_ACCESS_KEY_ID` and `AWS_SECRET_ACCESS_KEY` are set → HTTP mode
/// - Otherwise → CLI mode (uses `aws` CLI)
pub struct AwsSecretStore {
    http_client: Option<Client>,
    region: String,
    version_stage: Option<String>,
}

impl std::fmt::Debug for AwsSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsSecretStore")
            .field("mode", &if self.can_use_http() { "http" } else { "cli" })
            .field("region", &self.region)
            .finish()
    }
}

impl AwsSecretStore {
    /// Create a store, initializing the SDK client when HTTP mode applies.
    ///
    /// # Errors
    /// Returns error if AWS configuration cannot be loaded.
    pub async fn new(config: AwsStoreConfig) -> Result<Self, StoreError> {
        let region = config.effective_region();
        let use_http = match config.mode {
            AwsStoreMode::Auto => Self::http_credentials_available(),
            AwsStoreMode::Http => true,
            AwsStoreMode::Cli => false,
        };

        let http_client = if use_http {
            let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
                .region(aws_config::Region::new(region.clone()))
                .load()
                .await;
            Some(Client::new(&sdk_config))
        } else {
            None
        };

        let mode = if http_client.is_some() { "http" } else { "cli" };
        tracing::debug!(region = %region, mode, "AWS Secrets Manager store initialized");

        Ok(Self {
            http_client,
            region,
            version_stage: config.version_stage,
        })
    }

    /// Build a reference resolver backed by a new store.
    ///
    /// # Errors
    /// Returns error if the store cannot be created.
    pub async fn resolver(
        config: AwsStoreConfig,
        options: ResolverOptions,
    ) -> Result<SecretReferenceResolver<Self>, StoreError> {
        let store = Self::new(config).await?;
        Ok(SecretReferenceResolver::new(store, options))
    }

    /// The region this store queries
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Check if HTTP credentials are available in environment
    fn http_credentials_available() -> bool {
        std::env::var("AWS_ACCESS_KEY_ID").is_ok() && std::env::var("AWS_SECRET_ACCESS_KEY").is_ok()
    }

    /// Check if this store uses HTTP mode
    const fn can_use_http(&self) -> bool {
        self.http_client.is_some()
    }

    /// Fetch using the AWS SDK (HTTP mode)
    async fn fetch_http(
        &self,
        client: &Client,
        secret_id: &str,
    ) -> Result<SecretPayload, StoreError> {
        let mut request = client.get_secret_value().secret_id(secret_id);

        if let Some(version_stage) = &self.version_stage {
            request = request.version_stage(version_stage);
        }

        let response = request.send().await.map_err(classify_sdk_error)?;
        Ok(payload_from_response(&response))
    }

    /// Fetch using the AWS CLI
    async fn fetch_cli(&self, secret_id: &str) -> Result<SecretPayload, StoreError> {
        let mut args = vec![
            "secretsmanager".to_string(),
            "get-secret-value".to_string(),
            "--region".to_string(),
            self.region.clone(),
            "--secret-id".to_string(),
            secret_id.to_string(),
            "--query".to_string(),
            "SecretString".to_string(),
            "--output".to_string(),
            "json".to_string(),
        ];

        if let Some(version_stage) = &self.version_stage {
            args.push("--version-stage".to_string());
            args.push(version_stage.clone());
        }

        let output = Command::new("aws")
            .args(&args)
            .output()
            .await
            .map_err(|e| StoreError::Unavailable {
                message: format!("Failed to execute aws CLI: {e}"),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_cli_failure(stderr.trim()));
        }

        parse_cli_output(&String::from_utf8_lossy(&output.stdout))
    }
}

#[async_trait]
impl SecretStore for AwsSecretStore {
    fn provider_name(&self) -> &'static str {
        "aws"
    }

    async fn get_secret_value(&self, secret_id: &str) -> Result<SecretPayload, StoreError> {
        if let Some(client) = &self.http_client {
            return self.fetch_http(client, secret_id).await;
        }

        self.fetch_cli(secret_id).await
    }
}

/// A response without `SecretString` carries only a binary payload
fn payload_from_response(response: &GetSecretValueOutput) -> SecretPayload {
    match response.secret_string() {
        Some(secret_string) => SecretPayload::Text(SecureSecret::new(secret_string.to_string())),
        None => SecretPayload::Binary,
    }
}

/// Map an SDK failure onto the store error taxonomy
fn classify_sdk_error(err: SdkError<GetSecretValueError>) -> StoreError {
    let message = format!("AWS Secrets Manager error: {}", DisplayErrorContext(&err));

    let Some(service_error) = err.as_service_error() else {
        // Dispatch failures, timeouts and unparseable responses
        return StoreError::Unavailable { message };
    };

    if service_error.is_resource_not_found_exception() {
        return StoreError::NotFound { message };
    }

    if service_error.is_invalid_parameter_exception() || service_error.is_invalid_request_exception()
    {
        return StoreError::InvalidRequest { message };
    }

    match service_error.code() {
        Some("AccessDeniedException" | "UnrecognizedClientException") => {
            StoreError::AccessDenied { message }
        }
        Some("ValidationException") => StoreError::InvalidRequest { message },
        _ if service_error.is_decryption_failure() => StoreError::AccessDenied { message },
        _ => StoreError::Unavailable { message },
    }
}

/// Map `aws` CLI stderr onto the store error taxonomy
fn classify_cli_failure(stderr: &str) -> StoreError {
    let message = format!("aws CLI failed: {stderr}");

    if stderr.contains("ResourceNotFoundException") {
        StoreError::NotFound { message }
    } else if stderr.contains("AccessDenied")
        || stderr.contains("UnrecognizedClientException")
        || stderr.contains("DecryptionFailure")
    {
        StoreError::AccessDenied { message }
    } else if stderr.contains("InvalidParameterException")
        || stderr.contains("InvalidRequestException")
        || stderr.contains("ValidationException")
    {
        StoreError::InvalidRequest { message }
    } else {
        StoreError::Unavailable { message }
    }
}

/// Interpret `--query SecretString --output json` output
///
/// The CLI prints a JSON string, or `null` when the secret has only a binary
/// payload.
fn parse_cli_output(stdout: &str) -> Result<SecretPayload, StoreError> {
    let secret_string: Option<String> =
        serde_json::from_str(stdout).map_err(|e| StoreError::Unavailable {
            message: format!("Unexpected aws CLI output: {e}"),
        })?;

    Ok(match secret_string {
        Some(secret_string) => SecretPayload::Text(SecureSecret::new(secret_string)),
        None => SecretPayload::Binary,
    })
}
