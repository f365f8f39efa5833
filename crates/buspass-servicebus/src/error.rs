//! Error types for credential discovery and HTTP error reporting.

use buspass::BuspassError;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum CredentialError {
    /// The source is not configured in this environment; the chain moves on.
    Unavailable { source_name: String, reason: String },
    /// The source is configured but could not produce a token.
    Failed { source_name: String, reason: String },
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialError::Unavailable {
                source_name,
                reason,
            } => write!(f, "{source_name} unavailable: {reason}"),
            CredentialError::Failed {
                source_name,
                reason,
            } => write!(f, "{source_name} failed: {reason}"),
        }
    }
}

impl std::error::Error for CredentialError {}

impl CredentialError {
    pub fn unavailable(source_name: &str, reason: impl Into<String>) -> Self {
        CredentialError::Unavailable {
            source_name: source_name.to_string(),
            reason: reason.into(),
        }
    }

    pub fn failed(source_name: &str, reason: impl Into<String>) -> Self {
        CredentialError::Failed {
            source_name: source_name.to_string(),
            reason: reason.into(),
        }
    }

    pub fn source_name(&self) -> &str {
        match self {
            CredentialError::Unavailable { source_name, .. }
            | CredentialError::Failed { source_name, .. } => source_name,
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            CredentialError::Unavailable { reason, .. } | CredentialError::Failed { reason, .. } => {
                reason
            }
        }
    }
}

impl From<CredentialError> for BuspassError {
    fn from(err: CredentialError) -> Self {
        BuspassError::Credential {
            context: err.source_name().to_string(),
            reason: err.reason().to_string(),
        }
    }
}

/// Summarize a non-success response as `HTTP <status>: <body>`.
pub async fn describe_error_response(response: reqwest::Response) -> String {
    let status = response.status();
    match response.text().await {
        Ok(body) if body.trim().is_empty() => format!("HTTP {status}"),
        Ok(body) => format!("HTTP {status}: {}", body.trim()),
        Err(body_error) => {
            format!("HTTP {status} (failed to read response body: {body_error})")
        }
    }
}
