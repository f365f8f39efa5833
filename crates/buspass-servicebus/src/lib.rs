//! Azure Service Bus transport for `buspass`.
//!
//! Messages are published over the Service Bus REST interface with a bearer token
//! from the Microsoft identity platform. [`ServiceBusClient`] implements
//! [`buspass::BrokerClient`], and [`identity::DefaultCredential`] discovers a
//! credential from the environment.

pub mod client;
pub mod error;
pub mod identity;
pub mod sender;

pub use client::{SERVICE_BUS_SCOPE, ServiceBusClient, namespace_endpoint};
pub use error::CredentialError;
pub use identity::{AccessToken, DefaultCredential, TokenCredential};
pub use sender::ServiceBusSender;
