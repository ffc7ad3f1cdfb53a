#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use airwatch_api::config::ServerConfig;
use airwatch_api::router::build_app_router;
use airwatch_api::state::AppState;
use airwatch_core::directory::{InMemoryUserDirectory, UserDirectory};
use airwatch_core::message::MessageRequest;
use airwatch_core::user::User;
use airwatch_events::{DeliveryQueue, Notifier, QueueConfig, Transport, TransportError};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use parking_lot::Mutex;
use tower::ServiceExt;

/// Recipient whose messages the fake transport always rejects.
pub const BOUNCING_EMAIL: &str = "bounce@example.com";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        delivery_wait_ms: 20_000,
    }
}

/// Unpaced queue with a short per-send timeout.
pub fn test_queue_config() -> QueueConfig {
    QueueConfig {
        pacing_interval: Duration::ZERO,
        capacity: 16,
        send_timeout: Some(Duration::from_secs(5)),
    }
}

/// Records sent subjects; rejects anything addressed to [`BOUNCING_EMAIL`].
#[derive(Default)]
pub struct FakeTransport {
    sent: Mutex<Vec<(String, String)>>,
}

impl FakeTransport {
    /// `(recipient, subject)` pairs in send order.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, message: &MessageRequest) -> Result<(), TransportError> {
        self.sent
            .lock()
            .push((message.recipient.clone(), message.subject.clone()));
        if message.recipient == BOUNCING_EMAIL {
            return Err(TransportError::Rejected("mailbox unavailable".into()));
        }
        Ok(())
    }
}

/// Router plus handles on its collaborators.
pub struct TestApp {
    pub router: Router,
    pub notifier: Arc<Notifier>,
    pub directory: Arc<InMemoryUserDirectory>,
    pub transport: Arc<FakeTransport>,
}

/// Build the full application router over an in-memory directory seeded
/// with users 1 (`ada`), 2 (whose mail bounces) and 3 (`cy`), and an unpaced
/// queue delivering to a [`FakeTransport`].
pub fn build_test_app() -> TestApp {
    build_test_app_with(test_config(), test_queue_config())
}

/// Same as [`build_test_app`] with explicit server and queue settings.
pub fn build_test_app_with(config: ServerConfig, queue_config: QueueConfig) -> TestApp {
    let directory = Arc::new(InMemoryUserDirectory::with_users([
        User::new(1, "ada", "ada@example.com"),
        User::new(2, "bob", BOUNCING_EMAIL),
        User::new(3, "cy", "cy@example.com"),
    ]));
    let transport = Arc::new(FakeTransport::default());

    let queue = DeliveryQueue::new(Arc::clone(&transport) as Arc<dyn Transport>, queue_config);
    let notifier = Arc::new(Notifier::new(
        Arc::clone(&directory) as Arc<dyn UserDirectory>,
        queue,
    ));

    let state = AppState {
        notifier: Arc::clone(&notifier),
        pool: None,
        config: Arc::new(config.clone()),
    };

    TestApp {
        router: build_app_router(state, &config),
        notifier,
        directory,
        transport,
    }
}

pub async fn get(app: &TestApp, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, Body::empty()).await
}

pub async fn put_json(app: &TestApp, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::PUT, uri, Body::from(body.to_string())).await
}

pub async fn post_json(app: &TestApp, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::POST, uri, Body::from(body.to_string())).await
}

async fn send(app: &TestApp, method: Method, uri: &str, body: Body) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();
    app.router.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
