//! Traits for broker integration.
//!
//! The dispatcher only talks to a broker through these traits, so the send loop
//! is independent of the wire protocol and credential handling behind them.

use crate::{error::BuspassError, message::Message};
use async_trait::async_trait;

/// A connected, authenticated client for one broker namespace.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    type Sender: MessageSender;

    /// Open a sender bound to a single queue or topic.
    async fn open_sender(&self, entity: &str) -> Result<Self::Sender, BuspassError>;

    /// Release the client. Further calls fail with [`BuspassError::Closed`].
    async fn close(&self) -> Result<(), BuspassError>;
}

/// A handle that publishes messages to one queue or topic.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Send one message and wait for the broker to accept it.
    async fn send(&self, message: &Message) -> Result<(), BuspassError>;

    async fn close(&self) -> Result<(), BuspassError>;
}
