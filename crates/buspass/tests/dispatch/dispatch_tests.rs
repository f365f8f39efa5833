use super::test_utilities::RecordingClient;
use buspass::{BuspassError, Message, dispatch};
use bytes::Bytes;
use test_log::test;

fn message(priority: i64) -> Message {
    Message::new(Bytes::from_static(b"{\"order\": 42}"), priority)
}

#[test(tokio::test)]
async fn test_sends_exactly_repeat_times_with_identical_message() {
    for repeat in [1, 3, 10] {
        // Setup
        let client = RecordingClient::new();
        let message = message(3);

        // Action
        let report = dispatch(&client, "orders", &message, repeat).await.unwrap();

        // Expectation
        assert_eq!(report.sent, repeat);
        assert_eq!(report.entity, "orders");
        client.snapshot(|observed| {
            assert_eq!(observed.opened, vec!["orders".to_string()]);
            assert_eq!(observed.send_calls, repeat);
            assert!(observed.sent.iter().all(|sent| *sent == message));
        });
    }
}

#[test(tokio::test)]
async fn test_failure_on_second_of_five_stops_the_loop() {
    // Setup
    let client = RecordingClient::failing_on_send(2);

    // Action
    let err = dispatch(&client, "orders", &message(0), 5).await.unwrap_err();

    // Expectation
    match err {
        BuspassError::Send {
            entity,
            attempt,
            repeat,
            reason,
        } => {
            assert_eq!(entity, "orders");
            assert_eq!(attempt, 2);
            assert_eq!(repeat, 5);
            assert!(reason.contains("broker unavailable"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    client.snapshot(|observed| {
        assert_eq!(observed.send_calls, 2);
        assert_eq!(observed.sent.len(), 1);
    });
}

#[test(tokio::test)]
async fn test_resources_released_after_send_failure() {
    let client = RecordingClient::failing_on_send(1);

    let result = dispatch(&client, "orders", &message(0), 3).await;

    assert!(result.is_err());
    client.snapshot(|observed| {
        assert_eq!(observed.sender_closes, 1);
        assert_eq!(observed.client_closes, 1);
    });
}

#[test(tokio::test)]
async fn test_resources_released_after_success() {
    let client = RecordingClient::new();

    dispatch(&client, "orders", &message(0), 2).await.unwrap();

    client.snapshot(|observed| {
        assert_eq!(observed.sender_closes, 1);
        assert_eq!(observed.client_closes, 1);
    });
}

#[test(tokio::test)]
async fn test_open_sender_failure_still_closes_client() {
    let client = RecordingClient {
        fail_open: true,
        ..RecordingClient::default()
    };

    let err = dispatch(&client, "missing", &message(0), 1).await.unwrap_err();

    assert!(matches!(err, BuspassError::Connection { .. }));
    client.snapshot(|observed| {
        assert_eq!(observed.send_calls, 0);
        assert_eq!(observed.sender_closes, 0);
        assert_eq!(observed.client_closes, 1);
    });
}

#[test(tokio::test)]
async fn test_close_failures_do_not_fail_the_run() {
    let client = RecordingClient {
        fail_close: true,
        ..RecordingClient::default()
    };

    let report = dispatch(&client, "orders", &message(1), 2).await.unwrap();

    assert_eq!(report.summary(), "finished send to orders, 2 times");
    client.snapshot(|observed| {
        assert_eq!(observed.sent.len(), 2);
        assert_eq!(observed.sent[0].properties.get("Priority").unwrap(), "P1");
    });
}
