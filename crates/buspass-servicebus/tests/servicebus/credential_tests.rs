use super::test_utilities::{REJECTED_SECRET, STUB_ISSUED_TOKEN, StubServiceBus};
use buspass::{BuspassError, Message, dispatch};
use buspass_servicebus::identity::ClientSecretCredential;
use buspass_servicebus::{
    CredentialError, DefaultCredential, SERVICE_BUS_SCOPE, ServiceBusClient, TokenCredential,
};
use bytes::Bytes;
use std::sync::Arc;
use test_log::test;

#[test(tokio::test)]
async fn test_client_secret_grant() {
    let stub = StubServiceBus::start().await.unwrap();
    let credential = ClientSecretCredential::new(&stub.base_url, "tenant-a", "app-id", "s3cret");

    let token = credential.get_token(SERVICE_BUS_SCOPE).await.unwrap();

    assert_eq!(token.token, STUB_ISSUED_TOKEN);
    let requests = stub.token_requests();
    assert_eq!(requests.len(), 1);
    let form = &requests[0];
    assert_eq!(form["grant_type"], "client_credentials");
    assert_eq!(form["client_id"], "app-id");
    assert_eq!(form["client_secret"], "s3cret");
    assert_eq!(form["scope"], SERVICE_BUS_SCOPE);
}

#[test(tokio::test)]
async fn test_rejected_secret_reports_identity_error() {
    let stub = StubServiceBus::start().await.unwrap();
    let credential =
        ClientSecretCredential::new(&stub.base_url, "tenant-a", "app-id", REJECTED_SECRET);

    let err = credential.get_token(SERVICE_BUS_SCOPE).await.unwrap_err();

    match err {
        CredentialError::Failed { reason, .. } => {
            assert!(reason.contains("401"), "reason was: {reason}");
            assert!(reason.contains("invalid_client"), "reason was: {reason}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test(tokio::test)]
async fn test_default_chain_authenticates_sends() {
    // Setup
    let stub = StubServiceBus::start().await.unwrap();
    let chain = DefaultCredential::with_sources(vec![
        Box::new(ClientSecretCredential::new(
            &stub.base_url,
            "tenant-a",
            "app-id",
            REJECTED_SECRET,
        )),
        Box::new(ClientSecretCredential::new(
            &stub.base_url,
            "tenant-a",
            "app-id",
            "s3cret",
        )),
    ]);

    // Action
    let client = ServiceBusClient::connect_to(&stub.base_url, Arc::new(chain))
        .await
        .unwrap();
    dispatch(&client, "orders", &Message::new(Bytes::from_static(b"{}"), 0), 2)
        .await
        .unwrap();

    // Expectation
    assert_eq!(stub.token_requests().len(), 2);
    let messages = stub.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(
        messages[0].headers["authorization"],
        format!("Bearer {STUB_ISSUED_TOKEN}").as_str()
    );
}

#[test(tokio::test)]
async fn test_connect_fails_when_chain_is_exhausted() {
    let stub = StubServiceBus::start().await.unwrap();
    let chain = DefaultCredential::with_sources(vec![Box::new(ClientSecretCredential::new(
        &stub.base_url,
        "tenant-a",
        "app-id",
        REJECTED_SECRET,
    ))]);

    let result = ServiceBusClient::connect_to(&stub.base_url, Arc::new(chain)).await;

    match result {
        Err(BuspassError::Credential { context, reason }) => {
            assert_eq!(context, "DefaultCredential");
            assert!(reason.starts_with("ClientSecretCredential failed"));
        }
        Err(other) => panic!("unexpected error: {other:?}"),
        Ok(_) => panic!("connect should fail"),
    }
    assert!(stub.messages().is_empty());
}
