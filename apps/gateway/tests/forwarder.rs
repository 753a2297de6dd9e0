use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::post,
};
use igw_core::Platform;
use igw_gateway::{DownstreamConfig, HttpForwarder, WebhookDelivery, WebhookSink};
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct Received {
    calls: Arc<Mutex<Vec<(String, HeaderMap, Bytes)>>>,
}

async fn spawn_downstream(status: StatusCode) -> (String, Received) {
    let received = Received::default();
    let app = Router::new()
        .route(
            "/hooks/{platform}",
            post(
                move |State(received): State<Received>,
                      Path(platform): Path<String>,
                      headers: HeaderMap,
                      body: Bytes| async move {
                    received.calls.lock().unwrap().push((platform, headers, body));
                    status
                },
            ),
        )
        .with_state(received.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/hooks"), received)
}

fn forwarder(url: String, max_retries: u8) -> HttpForwarder {
    HttpForwarder::new(&DownstreamConfig {
        url,
        timeout: Duration::from_secs(5),
        max_retries,
    })
    .unwrap()
}

fn delivery() -> WebhookDelivery {
    WebhookDelivery {
        platform: Platform::GoogleCalendar,
        tenant: Some("acme".into()),
        request_id: "req-9".into(),
        body: Bytes::from_static(br#"{"id":1}"#),
    }
}

#[tokio::test]
async fn forwards_body_and_routing_headers() {
    let (url, received) = spawn_downstream(StatusCode::OK).await;

    forwarder(url, 0).deliver(delivery()).await.unwrap();

    let calls = received.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let (platform, headers, body) = &calls[0];
    assert_eq!(platform, "google_calendar");
    assert_eq!(headers["x-igw-platform"], "google_calendar");
    assert_eq!(headers["x-igw-tenant"], "acme");
    assert_eq!(headers["x-request-id"], "req-9");
    assert_eq!(&body[..], br#"{"id":1}"#);
}

#[tokio::test]
async fn non_success_status_is_retried_then_reported() {
    let (url, received) = spawn_downstream(StatusCode::SERVICE_UNAVAILABLE).await;

    let err = forwarder(url, 1).deliver(delivery()).await.unwrap_err();

    assert!(err.to_string().contains("503"));
    assert_eq!(received.calls.lock().unwrap().len(), 2);
}
