use async_trait::async_trait;
use buspass::{BrokerClient, BuspassError, Message, MessageSender};
use std::sync::{Arc, Mutex};

/// Everything the in-memory broker observed during a run.
#[derive(Debug, Default)]
pub struct Observed {
    pub opened: Vec<String>,
    pub sent: Vec<Message>,
    pub send_calls: u32,
    pub sender_closes: u32,
    pub client_closes: u32,
}

/// In-memory broker client that records calls and can inject failures.
#[derive(Clone, Default)]
pub struct RecordingClient {
    pub observed: Arc<Mutex<Observed>>,
    /// Fail the send with this 1-based call number.
    pub fail_on_send: Option<u32>,
    pub fail_open: bool,
    pub fail_close: bool,
}

pub struct RecordingSender {
    observed: Arc<Mutex<Observed>>,
    fail_on_send: Option<u32>,
    fail_close: bool,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on_send(call: u32) -> Self {
        Self {
            fail_on_send: Some(call),
            ..Self::default()
        }
    }

    pub fn snapshot<T>(&self, f: impl FnOnce(&Observed) -> T) -> T {
        f(&self.observed.lock().unwrap())
    }
}

#[async_trait]
impl BrokerClient for RecordingClient {
    type Sender = RecordingSender;

    async fn open_sender(&self, entity: &str) -> Result<Self::Sender, BuspassError> {
        if self.fail_open {
            return Err(BuspassError::Connection {
                context: format!("sender for '{entity}'"),
                reason: "entity not found".to_string(),
            });
        }
        self.observed.lock().unwrap().opened.push(entity.to_string());
        Ok(RecordingSender {
            observed: Arc::clone(&self.observed),
            fail_on_send: self.fail_on_send,
            fail_close: self.fail_close,
        })
    }

    async fn close(&self) -> Result<(), BuspassError> {
        self.observed.lock().unwrap().client_closes += 1;
        if self.fail_close {
            return Err(BuspassError::Closed {
                resource: "client".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send(&self, message: &Message) -> Result<(), BuspassError> {
        let mut observed = self.observed.lock().unwrap();
        observed.send_calls += 1;
        if self.fail_on_send == Some(observed.send_calls) {
            return Err(BuspassError::Connection {
                context: "send".to_string(),
                reason: "broker unavailable".to_string(),
            });
        }
        observed.sent.push(message.clone());
        Ok(())
    }

    async fn close(&self) -> Result<(), BuspassError> {
        self.observed.lock().unwrap().sender_closes += 1;
        if self.fail_close {
            return Err(BuspassError::Closed {
                resource: "sender".to_string(),
            });
        }
        Ok(())
    }
}
