//! Core of `buspass`: publish one message body to a broker queue or topic,
//! optionally several times.
//!
//! This crate holds everything that does not depend on a particular broker:
//! argument parsing and validation, body loading, the message model, the broker
//! traits and the send loop. Transports implement [`broker::BrokerClient`].

pub mod broker;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod message;
pub mod payload;
pub mod telemetry;

pub use broker::{BrokerClient, MessageSender};
pub use config::{BodySource, Cli, Config};
pub use dispatcher::{DispatchReport, dispatch};
pub use error::BuspassError;
pub use message::Message;
