//! Managed identity through App Service or the instance metadata service (IMDS).

use super::{AccessToken, TokenCredential, TokenResponse, scope_to_resource};
use crate::error::{CredentialError, describe_error_response};
use async_trait::async_trait;
use std::time::Duration;

pub const IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";
const IMDS_API_VERSION: &str = "2018-02-01";
const APP_SERVICE_API_VERSION: &str = "2019-08-01";

/// Off Azure the metadata address does not answer; give up quickly so the chain moves on.
const IMDS_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagedIdentitySource {
    AppService { endpoint: String, secret: String },
    Imds { endpoint: String },
}

#[derive(Debug)]
pub struct ManagedIdentityCredential {
    http: reqwest::Client,
    source: ManagedIdentitySource,
    /// Selects a user-assigned identity; `None` uses the system-assigned one.
    client_id: Option<String>,
}

impl ManagedIdentityCredential {
    pub fn new(
        source: ManagedIdentitySource,
        client_id: Option<String>,
    ) -> Result<Self, CredentialError> {
        let http = reqwest::Client::builder()
            .connect_timeout(IMDS_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| {
                CredentialError::unavailable(
                    "ManagedIdentityCredential",
                    format!("cannot build HTTP client: {e}"),
                )
            })?;
        Ok(Self {
            http,
            source,
            client_id,
        })
    }

    /// Prefer App Service (`IDENTITY_ENDPOINT` + `IDENTITY_HEADER`), else IMDS.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, CredentialError> {
        let source = match (lookup("IDENTITY_ENDPOINT"), lookup("IDENTITY_HEADER")) {
            (Some(endpoint), Some(secret)) => ManagedIdentitySource::AppService { endpoint, secret },
            _ => ManagedIdentitySource::Imds {
                endpoint: IMDS_ENDPOINT.to_string(),
            },
        };
        Self::new(source, lookup("AZURE_CLIENT_ID"))
    }

    pub fn source(&self) -> &ManagedIdentitySource {
        &self.source
    }

    fn build_request(&self, resource: &str) -> reqwest::RequestBuilder {
        let mut query = Vec::with_capacity(3);
        let request = match &self.source {
            ManagedIdentitySource::AppService { endpoint, secret } => {
                query.push(("api-version", APP_SERVICE_API_VERSION));
                self.http
                    .get(endpoint.as_str())
                    .header("X-IDENTITY-HEADER", secret.as_str())
            }
            ManagedIdentitySource::Imds { endpoint } => {
                query.push(("api-version", IMDS_API_VERSION));
                self.http.get(endpoint.as_str()).header("Metadata", "true")
            }
        };
        query.push(("resource", resource));
        if let Some(client_id) = &self.client_id {
            query.push(("client_id", client_id.as_str()));
        }
        request.query(&query)
    }
}

#[async_trait]
impl TokenCredential for ManagedIdentityCredential {
    fn name(&self) -> &'static str {
        "ManagedIdentityCredential"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        let request = self.build_request(scope_to_resource(scope));
        let response = request.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                CredentialError::unavailable(self.name(), format!("no managed identity endpoint: {e}"))
            } else {
                CredentialError::failed(self.name(), format!("request failed: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let reason = describe_error_response(response).await;
            // IMDS answers 400 when no identity is assigned to the host.
            return Err(if status == reqwest::StatusCode::BAD_REQUEST {
                CredentialError::unavailable(self.name(), reason)
            } else {
                CredentialError::failed(self.name(), reason)
            });
        }

        let body = response.json::<TokenResponse>().await.map_err(|e| {
            CredentialError::failed(self.name(), format!("invalid token response: {e}"))
        })?;
        Ok(body.into_access_token())
    }
}
