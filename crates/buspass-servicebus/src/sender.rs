use crate::client::ClientInner;
use crate::error::describe_error_response;
use async_trait::async_trait;
use buspass::{BuspassError, Message, MessageSender};
use reqwest::Url;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderName, HeaderValue};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Publishes to `<endpoint>/<entity>/messages`.
pub struct ServiceBusSender {
    client: Arc<ClientInner>,
    entity: String,
    url: Url,
    closed: AtomicBool,
}

/// Reject names with empty path segments, e.g. `""`, `"a//b"` or `"topic/"`.
fn validate_entity(entity: &str) -> Result<(), BuspassError> {
    if entity.is_empty() || entity.split('/').any(str::is_empty) {
        return Err(BuspassError::Connection {
            context: format!("sender for '{entity}'"),
            reason: "queue/topic name must be a non-empty path without empty segments"
                .to_string(),
        });
    }
    Ok(())
}

/// Application properties travel as headers; string values are JSON-quoted.
fn property_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), String> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| format!("invalid property name '{name}': {e}"))?;
    let quoted = serde_json::to_string(value)
        .map_err(|e| format!("invalid property value for '{name}': {e}"))?;
    let header_value = HeaderValue::from_str(&quoted)
        .map_err(|e| format!("invalid property value for '{name}': {e}"))?;
    Ok((header_name, header_value))
}

impl ServiceBusSender {
    pub(crate) fn new(client: Arc<ClientInner>, entity: &str) -> Result<Self, BuspassError> {
        validate_entity(entity)?;

        let mut url = client.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| BuspassError::Connection {
                context: format!("sender for '{entity}'"),
                reason: format!("endpoint {} cannot carry a path", client.endpoint),
            })?
            .pop_if_empty()
            .extend(entity.split('/'))
            .push("messages");

        Ok(Self {
            client,
            entity: entity.to_string(),
            url,
            closed: AtomicBool::new(false),
        })
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    fn ensure_open(&self) -> Result<(), BuspassError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BuspassError::Closed {
                resource: format!("sender for '{}'", self.entity),
            });
        }
        self.client.ensure_open()
    }

    pub(crate) fn build_request(
        &self,
        message: &Message,
        bearer: &str,
    ) -> Result<reqwest::RequestBuilder, BuspassError> {
        let mut request = self
            .client
            .http
            .post(self.url.clone())
            .header(AUTHORIZATION, format!("Bearer {bearer}"))
            .header(CONTENT_TYPE, message.content_type)
            .body(message.body.clone());

        for (name, value) in &message.properties {
            let (header_name, header_value) =
                property_header(name, value).map_err(|reason| BuspassError::Connection {
                    context: format!("message for '{}'", self.entity),
                    reason,
                })?;
            request = request.header(header_name, header_value);
        }
        Ok(request)
    }
}

#[async_trait]
impl MessageSender for ServiceBusSender {
    async fn send(&self, message: &Message) -> Result<(), BuspassError> {
        self.ensure_open()?;
        let bearer = self.client.tokens.bearer().await?;
        let response = self
            .build_request(message, &bearer)?
            .send()
            .await
            .map_err(|e| BuspassError::Connection {
                context: format!("send to {}", self.url),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            let reason = describe_error_response(response).await;
            return Err(BuspassError::Connection {
                context: format!("send to {}", self.url),
                reason,
            });
        }
        debug!(entity = %self.entity, status = %response.status(), "message accepted");
        Ok(())
    }

    async fn close(&self) -> Result<(), BuspassError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(BuspassError::Closed {
                resource: format!("sender for '{}'", self.entity),
            });
        }
        Ok(())
    }
}
