//! Tokens from the account the developer is logged into with `az login`.

use super::{AccessToken, TokenCredential, scope_to_resource, value_as_i64};
use crate::error::CredentialError;
use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime, Utc};
use serde::Deserialize;
use tokio::process::Command;

#[derive(Debug, Default)]
pub struct AzureCliCredential {
    tenant_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliTokenOutput {
    access_token: String,
    /// Local time, e.g. "2024-05-01 14:03:59.000000".
    #[serde(default)]
    expires_on: Option<String>,
    /// POSIX seconds; only printed by newer CLI releases.
    #[serde(default, rename = "expires_on")]
    expires_on_epoch: Option<serde_json::Value>,
}

impl AzureCliCredential {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tenant(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: Some(tenant_id.into()),
        }
    }

    fn command(&self, resource: &str) -> Command {
        let mut command = if cfg!(windows) {
            let mut command = Command::new("cmd");
            command.args(["/C", "az"]);
            command
        } else {
            Command::new("az")
        };
        command.args([
            "account",
            "get-access-token",
            "--output",
            "json",
            "--resource",
            resource,
        ]);
        if let Some(tenant_id) = &self.tenant_id {
            command.args(["--tenant", tenant_id.as_str()]);
        }
        command
    }
}

fn parse_output(source_name: &str, stdout: &[u8]) -> Result<AccessToken, CredentialError> {
    let output: CliTokenOutput = serde_json::from_slice(stdout)
        .map_err(|e| CredentialError::failed(source_name, format!("unexpected az output: {e}")))?;

    let expires_on = output
        .expires_on_epoch
        .as_ref()
        .and_then(value_as_i64)
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .or_else(|| output.expires_on.as_deref().and_then(parse_local_time))
        .ok_or_else(|| CredentialError::failed(source_name, "az output has no expiry"))?;

    Ok(AccessToken::new(output.access_token, expires_on))
}

fn parse_local_time(text: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .ok()?
        .and_local_timezone(Local)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}

#[async_trait]
impl TokenCredential for AzureCliCredential {
    fn name(&self) -> &'static str {
        "AzureCliCredential"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        let output = self
            .command(scope_to_resource(scope))
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    CredentialError::unavailable(self.name(), "az not found on PATH")
                }
                _ => CredentialError::failed(self.name(), format!("cannot run az: {e}")),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            return Err(if stderr.contains("az login") {
                CredentialError::unavailable(self.name(), "not logged in, run 'az login'")
            } else {
                CredentialError::failed(
                    self.name(),
                    format!("az exited with {}: {stderr}", output.status),
                )
            });
        }

        parse_output(self.name(), &output.stdout)
    }
}
