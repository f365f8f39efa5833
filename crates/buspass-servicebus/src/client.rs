//! Authenticated client for one Service Bus namespace.

use crate::identity::{AccessToken, TokenCredential};
use crate::sender::ServiceBusSender;
use async_trait::async_trait;
use buspass::{BrokerClient, BuspassError};
use reqwest::Url;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// OAuth2 scope for the Service Bus data plane.
pub const SERVICE_BUS_SCOPE: &str = "https://servicebus.azure.net/.default";

/// Host suffix appended to a namespace name.
pub const SERVICE_BUS_HOST_SUFFIX: &str = "servicebus.windows.net";

/// Refresh cached tokens this long before they expire.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 300;

/// Endpoint URL for a namespace, e.g. `https://myns.servicebus.windows.net`.
pub fn namespace_endpoint(namespace: &str) -> String {
    format!("https://{namespace}.{SERVICE_BUS_HOST_SUFFIX}")
}

/// Caches the most recent token and asks the credential again when it nears expiry.
pub(crate) struct TokenCache {
    credential: Arc<dyn TokenCredential>,
    cached: Mutex<Option<AccessToken>>,
}

impl TokenCache {
    fn new(credential: Arc<dyn TokenCredential>) -> Self {
        Self {
            credential,
            cached: Mutex::new(None),
        }
    }

    pub(crate) async fn bearer(&self) -> Result<String, BuspassError> {
        let mut cached = self.cached.lock().await;
        let margin = chrono::Duration::seconds(TOKEN_REFRESH_MARGIN_SECS);
        match cached.as_ref() {
            Some(token) if !token.expires_within(margin) => Ok(token.token.clone()),
            _ => {
                let token = self.credential.get_token(SERVICE_BUS_SCOPE).await?;
                debug!(expires_on = %token.expires_on, "refreshed access token");
                let bearer = token.token.clone();
                *cached = Some(token);
                Ok(bearer)
            }
        }
    }
}

pub(crate) struct ClientInner {
    pub(crate) http: reqwest::Client,
    pub(crate) endpoint: Url,
    pub(crate) tokens: TokenCache,
    closed: AtomicBool,
}

impl ClientInner {
    pub(crate) fn ensure_open(&self) -> Result<(), BuspassError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BuspassError::Closed {
                resource: format!("client for {}", self.endpoint),
            });
        }
        Ok(())
    }
}

/// Service Bus client speaking the REST protocol.
///
/// Cheap to share: senders hold a reference to the same HTTP client and token cache.
pub struct ServiceBusClient {
    inner: Arc<ClientInner>,
}

impl ServiceBusClient {
    /// Connect to `<namespace>.servicebus.windows.net`.
    pub async fn connect(
        namespace: &str,
        credential: Arc<dyn TokenCredential>,
    ) -> Result<Self, BuspassError> {
        Self::connect_to(&namespace_endpoint(namespace), credential).await
    }

    /// Connect to an explicit endpoint URL.
    ///
    /// A first token is fetched here so credential problems surface before any send.
    pub async fn connect_to(
        endpoint: &str,
        credential: Arc<dyn TokenCredential>,
    ) -> Result<Self, BuspassError> {
        let endpoint = Url::parse(endpoint).map_err(|e| BuspassError::Connection {
            context: format!("endpoint '{endpoint}'"),
            reason: e.to_string(),
        })?;
        if endpoint.cannot_be_a_base() {
            return Err(BuspassError::Connection {
                context: format!("endpoint '{endpoint}'"),
                reason: "not a base URL".to_string(),
            });
        }

        // Service Bus takes property names from header names, so keep `Priority` cased.
        let http = reqwest::Client::builder()
            .http1_title_case_headers()
            .build()
            .map_err(|e| BuspassError::Connection {
                context: "HTTP client".to_string(),
                reason: e.to_string(),
            })?;

        let inner = ClientInner {
            http,
            endpoint,
            tokens: TokenCache::new(credential),
            closed: AtomicBool::new(false),
        };
        inner.tokens.bearer().await?;
        info!(endpoint = %inner.endpoint, "connected");

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.inner.endpoint
    }
}

#[async_trait]
impl BrokerClient for ServiceBusClient {
    type Sender = ServiceBusSender;

    async fn open_sender(&self, entity: &str) -> Result<Self::Sender, BuspassError> {
        self.inner.ensure_open()?;
        let sender = ServiceBusSender::new(Arc::clone(&self.inner), entity)?;
        debug!(entity, url = %sender.url(), "opened sender");
        Ok(sender)
    }

    async fn close(&self) -> Result<(), BuspassError> {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return Err(BuspassError::Closed {
                resource: format!("client for {}", self.inner.endpoint),
            });
        }
        Ok(())
    }
}
