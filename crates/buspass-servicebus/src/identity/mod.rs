//! Bearer token acquisition for the Microsoft identity platform.
//!
//! [`DefaultCredential`] walks a fixed chain of sources and uses the first one
//! that yields a token:
//!
//! 1. client secret from `AZURE_TENANT_ID` / `AZURE_CLIENT_ID` / `AZURE_CLIENT_SECRET`
//! 2. workload identity from `AZURE_FEDERATED_TOKEN_FILE`
//! 3. managed identity (App Service or the instance metadata service)
//! 4. the Azure CLI's logged-in account

pub mod azure_cli;
pub mod environment;
pub mod managed;

pub use azure_cli::AzureCliCredential;
pub use environment::{ClientSecretCredential, WorkloadIdentityCredential};
pub use managed::ManagedIdentityCredential;

use crate::error::CredentialError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::fmt;
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Lifetime assumed when a token response carries no expiry.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// An opaque bearer token and the instant it stops being valid.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_on: DateTime<Utc>,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_on: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_on,
        }
    }

    /// True when the token expires within `margin` from now.
    pub fn expires_within(&self, margin: Duration) -> bool {
        Utc::now() + margin >= self.expires_on
    }
}

/// A source of bearer tokens for a given scope.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &'static str;

    async fn get_token(&self, scope: &str) -> Result<AccessToken, CredentialError>;
}

/// Convert a `.default` scope into the bare resource URI some endpoints expect.
pub fn scope_to_resource(scope: &str) -> &str {
    scope.strip_suffix("/.default").unwrap_or(scope)
}

// =============================================================================
// DEFAULT CHAIN
// =============================================================================

/// Tries each source in order and sticks with the first one that succeeds.
pub struct DefaultCredential {
    sources: Vec<Box<dyn TokenCredential>>,
    selected: Mutex<Option<usize>>,
}

impl DefaultCredential {
    /// Build the standard chain from the process environment.
    pub fn from_env() -> Self {
        let lookup = |key: &str| std::env::var(key).ok().filter(|value| !value.is_empty());
        let mut sources: Vec<Box<dyn TokenCredential>> = Vec::new();
        match ClientSecretCredential::from_lookup(lookup) {
            Some(credential) => sources.push(Box::new(credential)),
            None => debug!("client secret environment variables not set"),
        }
        match WorkloadIdentityCredential::from_lookup(lookup) {
            Some(credential) => sources.push(Box::new(credential)),
            None => debug!("workload identity environment variables not set"),
        }
        match ManagedIdentityCredential::from_lookup(lookup) {
            Ok(credential) => sources.push(Box::new(credential)),
            Err(e) => warn!(error = %e, "managed identity skipped"),
        }
        sources.push(Box::new(AzureCliCredential::new()));
        Self::with_sources(sources)
    }

    pub fn with_sources(sources: Vec<Box<dyn TokenCredential>>) -> Self {
        Self {
            sources,
            selected: Mutex::new(None),
        }
    }

    fn selected(&self) -> Option<usize> {
        self.selected.lock().ok().and_then(|selected| *selected)
    }
}

#[async_trait]
impl TokenCredential for DefaultCredential {
    fn name(&self) -> &'static str {
        "DefaultCredential"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        if let Some(index) = self.selected() {
            return self.sources[index].get_token(scope).await;
        }

        let mut attempts = Vec::with_capacity(self.sources.len());
        for (index, source) in self.sources.iter().enumerate() {
            match source.get_token(scope).await {
                Ok(token) => {
                    info!(source = source.name(), "acquired token");
                    if let Ok(mut selected) = self.selected.lock() {
                        *selected = Some(index);
                    }
                    return Ok(token);
                }
                Err(e) => {
                    debug!(source = source.name(), error = %e, "credential source skipped");
                    attempts.push(e.to_string());
                }
            }
        }

        let reason = if attempts.is_empty() {
            "no credential sources configured".to_string()
        } else {
            attempts.join("; ")
        };
        Err(CredentialError::failed(self.name(), reason))
    }
}

// =============================================================================
// TOKEN RESPONSES
// =============================================================================

/// Token payload shared by the identity platform and managed identity endpoints.
///
/// Expiry fields are numbers on some endpoints and numeric strings on others.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<serde_json::Value>,
    #[serde(default)]
    pub expires_on: Option<serde_json::Value>,
}

impl TokenResponse {
    pub fn into_access_token(self) -> AccessToken {
        let expires_on = self
            .expires_on
            .as_ref()
            .and_then(value_as_i64)
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .or_else(|| {
                self.expires_in
                    .as_ref()
                    .and_then(value_as_i64)
                    .map(|secs| Utc::now() + Duration::seconds(secs))
            })
            .unwrap_or_else(|| Utc::now() + Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS));
        AccessToken::new(self.access_token, expires_on)
    }
}

pub(crate) fn value_as_i64(value: &serde_json::Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|text| text.trim().parse().ok()))
}

/// Send a token request and decode a [`TokenResponse`].
pub(crate) async fn request_token(
    source_name: &str,
    request: reqwest::RequestBuilder,
) -> Result<AccessToken, CredentialError> {
    let response = request
        .send()
        .await
        .map_err(|e| CredentialError::failed(source_name, format!("request failed: {e}")))?;
    if !response.status().is_success() {
        let reason = crate::error::describe_error_response(response).await;
        return Err(CredentialError::failed(source_name, reason));
    }
    let body = response
        .json::<TokenResponse>()
        .await
        .map_err(|e| CredentialError::failed(source_name, format!("invalid token response: {e}")))?;
    Ok(body.into_access_token())
}
