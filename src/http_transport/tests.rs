//! Tests for the HTTP transport against a loopback server.

use std::time::Duration;

use rstest::rstest;
use serde_json::Value;

use crate::config::HttpConfig;
use crate::test_utils::{CapturedRequest, MockIngestServer};
use crate::transport::{ResponseClass, Transport, TransportError};

use super::HttpBatchSender;

const WAIT: Duration = Duration::from_secs(5);

fn sender_for(server: &MockIngestServer, index: &str, token: &str) -> HttpBatchSender {
    let config = HttpConfig::new(index, token)
        .with_api_base(server.base_url())
        .with_connect_timeout(Duration::from_secs(5))
        .with_request_timeout(Duration::from_secs(5));
    HttpBatchSender::new(&config).expect("sender")
}

fn records(request: &CapturedRequest) -> Vec<Value> {
    let body: Value = serde_json::from_str(&request.body).expect("body is JSON");
    body["records"].as_array().expect("records array").clone()
}

#[rstest]
fn posts_batch_to_ingestion_endpoint() {
    let server = MockIngestServer::start(vec![200]);
    let sender = sender_for(&server, "my-index", "secret-token");

    sender
        .publish(vec![
            r#"{"message":"a"}"#.into(),
            r#"{"message":"b"}"#.into(),
        ])
        .expect("publish succeeds");

    let request = server.next_request(WAIT).expect("request");
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/v1/index/my-index/data");
    assert_eq!(request.header("content-type"), Some("application/json"));
    assert_eq!(request.header("authorization"), Some("secret-token"));
    assert_eq!(
        request.body,
        r#"{"records":[{"message":"a"},{"message":"b"}]}"#
    );
    assert_eq!(records(&request).len(), 2);
}

#[rstest]
fn each_publish_is_one_request() {
    let server = MockIngestServer::start(vec![200, 200]);
    let sender = sender_for(&server, "idx", "t");

    sender.publish(vec!["{}".into()]).expect("first batch");
    sender
        .publish(vec!["{}".into(), "{}".into(), "{}".into()])
        .expect("second batch");

    let first = server.next_request(WAIT).expect("first request");
    let second = server.next_request(WAIT).expect("second request");
    assert_eq!(records(&first).len(), 1);
    assert_eq!(records(&second).len(), 3);
}

#[rstest]
#[case::throttled(429, ResponseClass::Retryable)]
#[case::unavailable(503, ResponseClass::Retryable)]
#[case::unauthorised(401, ResponseClass::Permanent)]
#[case::bad_request(400, ResponseClass::Permanent)]
fn rejected_batches_surface_status(#[case] status: u16, #[case] class: ResponseClass) {
    let server = MockIngestServer::start(vec![status]);
    let sender = sender_for(&server, "idx", "t");

    let err = sender
        .publish(vec!["{}".into()])
        .expect_err("non-2xx must fail");
    assert_eq!(err, TransportError::HttpStatus { status, class });

    // Exactly one attempt; this layer does not retry.
    assert!(server.next_request(WAIT).is_some());
    assert!(server.next_request(Duration::from_millis(200)).is_none());
}

#[rstest]
fn connection_failure_is_reported() {
    let server = MockIngestServer::start(vec![]);
    let sender = sender_for(&server, "idx", "t");
    // Give the server thread time to exit and release the port.
    std::thread::sleep(Duration::from_millis(100));

    let err = sender
        .publish(vec!["{}".into()])
        .expect_err("nobody listening");
    assert!(matches!(err, TransportError::Http(_)));
}

#[rstest]
fn empty_batch_sends_nothing() {
    let server = MockIngestServer::start(vec![200]);
    let sender = sender_for(&server, "idx", "t");
    sender.publish(Vec::new()).expect("no-op");
    assert!(server.next_request(Duration::from_millis(200)).is_none());
}

#[rstest]
fn close_is_a_no_op() {
    let server = MockIngestServer::start(vec![200]);
    let mut sender = sender_for(&server, "idx", "t");
    sender.close();
    sender.close();
    sender
        .publish(vec!["{}".into()])
        .expect("agent remains usable");
    assert!(server.next_request(WAIT).is_some());
}
