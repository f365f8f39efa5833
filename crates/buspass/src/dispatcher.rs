//! The send loop.

use crate::{
    broker::{BrokerClient, MessageSender},
    error::BuspassError,
    message::Message,
};
use tracing::{debug, warn};

/// Outcome of a fully successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub entity: String,
    pub sent: u32,
}

impl DispatchReport {
    /// The confirmation line printed after a successful run.
    pub fn summary(&self) -> String {
        format!("finished send to {}, {} times", self.entity, self.sent)
    }
}

/// Open a sender on `client`, send `message` `repeat` times, then release both.
///
/// Sends are sequential and each one is awaited before the next starts. The first
/// failure stops the loop; messages already sent stay delivered. The sender and the
/// client are closed on every path once acquired, and close failures are only logged.
pub async fn dispatch<C>(
    client: &C,
    entity: &str,
    message: &Message,
    repeat: u32,
) -> Result<DispatchReport, BuspassError>
where
    C: BrokerClient,
{
    let result = match client.open_sender(entity).await {
        Ok(sender) => {
            let sent = send_repeated(&sender, entity, message, repeat).await;
            release("sender", sender.close().await);
            sent
        }
        Err(e) => Err(e),
    };
    release("client", client.close().await);

    result.map(|sent| DispatchReport {
        entity: entity.to_string(),
        sent,
    })
}

async fn send_repeated<S>(
    sender: &S,
    entity: &str,
    message: &Message,
    repeat: u32,
) -> Result<u32, BuspassError>
where
    S: MessageSender,
{
    for attempt in 1..=repeat {
        debug!(entity, attempt, repeat, "sending message");
        sender
            .send(message)
            .await
            .map_err(|e| BuspassError::Send {
                entity: entity.to_string(),
                attempt,
                repeat,
                reason: e.to_string(),
            })?;
    }
    Ok(repeat)
}

fn release(resource: &str, result: Result<(), BuspassError>) {
    match result {
        Ok(()) => debug!(resource, "closed"),
        Err(e) => warn!(resource, error = %e, "close failed"),
    }
}
