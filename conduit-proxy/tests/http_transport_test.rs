//! HttpTransport against a mock server.

#![cfg(feature = "http")]

use conduit_config::ProxyOptions;
use conduit_proxy::{
    CORRELATION_HEADER, CallOptions, ErrorKind, HttpTransport, ProxyClient, ProxyContext,
    ProxyError, Transport,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn transport(server: &MockServer) -> HttpTransport {
    HttpTransport::new(&format!("{}/api", server.uri())).unwrap()
}

fn context(operation: &str, request: Value) -> ProxyContext {
    ProxyContext::new(request, "GetOrder", "Order").with_operation(operation)
}

#[tokio::test]
async fn test_posts_json_and_decodes_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/orders/get"))
        .and(body_json(json!({"id": 7})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 12})))
        .expect(1)
        .mount(&server)
        .await;

    let transport = transport(&server).await;
    let response = transport.send(&mut context("orders/get", json!({"id": 7}))).await;

    assert_eq!(response.value(), Some(&json!({"total": 12})));
}

#[tokio::test]
async fn test_correlation_header_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header(CORRELATION_HEADER, "abc-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(true)))
        .expect(1)
        .mount(&server)
        .await;

    let transport = transport(&server).await;
    let mut ctx = context("ping", json!(null)).with_correlation_id("abc-1");
    let response = transport.send(&mut ctx).await;

    assert!(response.is_success());
}

#[tokio::test]
async fn test_empty_body_is_null() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let transport = transport(&server).await;
    let response = transport.send(&mut context("fire", json!({}))).await;

    assert_eq!(response.value(), Some(&Value::Null));
}

#[tokio::test]
async fn test_statuses_are_classified() {
    let server = MockServer::start().await;
    for (route, status) in [("busy", 503), ("rejected", 422), ("missing", 404), ("slow", 429)] {
        Mock::given(method("POST"))
            .and(path(format!("/api/{route}")))
            .respond_with(ResponseTemplate::new(status).set_body_string(format!("{route} body")))
            .mount(&server)
            .await;
    }
    let transport = transport(&server).await;

    let busy = transport.send(&mut context("busy", json!({}))).await;
    assert_eq!(busy.error_kind(), Some(ErrorKind::Transient));
    assert_eq!(busy.error().and_then(ProxyError::status_code), Some(503));

    let rejected = transport.send(&mut context("rejected", json!({}))).await;
    assert_eq!(
        rejected.error(),
        Some(&ProxyError::Business {
            code: Some("422".into()),
            message: "rejected body".into(),
        })
    );

    let missing = transport.send(&mut context("missing", json!({}))).await;
    assert_eq!(missing.error_kind(), Some(ErrorKind::NonTransient));

    let slow = transport.send(&mut context("slow", json!({}))).await;
    assert_eq!(slow.error_kind(), Some(ErrorKind::Transient));
}

#[tokio::test]
async fn test_invalid_json_reply_is_serialization_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{oops"))
        .mount(&server)
        .await;

    let transport = transport(&server).await;
    let response = transport.send(&mut context("x", json!({}))).await;

    assert!(matches!(
        response.error(),
        Some(ProxyError::Serialization(_))
    ));
}

#[tokio::test]
async fn test_unreachable_host_is_transient() {
    // Nothing listens on this port once the server is dropped.
    let uri = {
        let server = MockServer::start().await;
        server.uri()
    };
    let transport = HttpTransport::new(&uri).unwrap();

    let response = transport.send(&mut context("gone", json!({}))).await;
    assert_eq!(response.error_kind(), Some(ErrorKind::Transient));
}

#[derive(Serialize)]
struct GetOrder {
    id: u64,
}

#[derive(Debug, Deserialize, PartialEq)]
struct Order {
    total: u64,
}

#[tokio::test]
async fn test_client_retries_503_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/orders/get"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/orders/get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 3})))
        .mount(&server)
        .await;

    let client = ProxyClient::builder(transport(&server).await)
        .options(ProxyOptions {
            retry_base_delay_ms: 5,
            ..Default::default()
        })
        .build();

    let response = client
        .send_with::<_, Order>(&GetOrder { id: 1 }, CallOptions::new().operation("orders/get"))
        .await;

    assert_eq!(response.value(), Some(&Order { total: 3 }));
    assert_eq!(server.received_requests().await.map(|r| r.len()), Some(2));
}

#[tokio::test]
async fn test_type_name_is_default_path() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/GetOrder"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let client = ProxyClient::builder(transport(&server).await).build();
    let response = client.send::<_, Order>(&GetOrder { id: 1 }).await;

    assert_eq!(response.value(), Some(&Order { total: 1 }));
}
