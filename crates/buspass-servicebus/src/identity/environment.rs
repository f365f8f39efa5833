//! Service principal credentials configured through `AZURE_*` environment variables.

use super::{AccessToken, TokenCredential, request_token};
use crate::error::CredentialError;
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

fn token_url(authority_host: &str, tenant_id: &str) -> String {
    format!(
        "{}/{tenant_id}/oauth2/v2.0/token",
        authority_host.trim_end_matches('/')
    )
}

fn authority_from(lookup: &impl Fn(&str) -> Option<String>) -> String {
    lookup("AZURE_AUTHORITY_HOST").unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string())
}

// =============================================================================
// CLIENT SECRET
// =============================================================================

/// OAuth2 client-credentials grant with a client secret.
pub struct ClientSecretCredential {
    http: reqwest::Client,
    authority_host: String,
    tenant_id: String,
    client_id: String,
    client_secret: String,
}

impl fmt::Debug for ClientSecretCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSecretCredential")
            .field("authority_host", &self.authority_host)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

impl ClientSecretCredential {
    pub fn new(
        authority_host: impl Into<String>,
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            authority_host: authority_host.into(),
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Build from `AZURE_TENANT_ID`, `AZURE_CLIENT_ID` and `AZURE_CLIENT_SECRET`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        Some(Self::new(
            authority_from(&lookup),
            lookup("AZURE_TENANT_ID")?,
            lookup("AZURE_CLIENT_ID")?,
            lookup("AZURE_CLIENT_SECRET")?,
        ))
    }
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    fn name(&self) -> &'static str {
        "ClientSecretCredential"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        let request = self
            .http
            .post(token_url(&self.authority_host, &self.tenant_id))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", scope),
            ]);
        request_token(self.name(), request).await
    }
}

// =============================================================================
// WORKLOAD IDENTITY
// =============================================================================

/// Federated credential: a projected service account token exchanged for an access token.
#[derive(Debug)]
pub struct WorkloadIdentityCredential {
    http: reqwest::Client,
    authority_host: String,
    tenant_id: String,
    client_id: String,
    token_file: PathBuf,
}

impl WorkloadIdentityCredential {
    pub fn new(
        authority_host: impl Into<String>,
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        token_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            authority_host: authority_host.into(),
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            token_file: token_file.into(),
        }
    }

    /// Build from `AZURE_TENANT_ID`, `AZURE_CLIENT_ID` and `AZURE_FEDERATED_TOKEN_FILE`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        Some(Self::new(
            authority_from(&lookup),
            lookup("AZURE_TENANT_ID")?,
            lookup("AZURE_CLIENT_ID")?,
            lookup("AZURE_FEDERATED_TOKEN_FILE")?,
        ))
    }
}

#[async_trait]
impl TokenCredential for WorkloadIdentityCredential {
    fn name(&self) -> &'static str {
        "WorkloadIdentityCredential"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        // The file is rotated by the platform, so read it on every request.
        let assertion = tokio::fs::read_to_string(&self.token_file)
            .await
            .map_err(|e| {
                CredentialError::failed(
                    self.name(),
                    format!("cannot read '{}': {e}", self.token_file.display()),
                )
            })?;
        let request = self
            .http
            .post(token_url(&self.authority_host, &self.tenant_id))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_assertion_type", CLIENT_ASSERTION_TYPE),
                ("client_assertion", assertion.trim()),
                ("scope", scope),
            ]);
        request_token(self.name(), request).await
    }
}
