//! Common test utilities
//!
//! An in-process deployment: the gateway router, its response collectors and
//! one worker per ledger operation, wired together over an in-memory broker
//! and an in-memory ledger store.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Method, Request, Response, StatusCode},
    Router,
};
use digital_wallet::config::GatewayConfig;
use digital_wallet::gateway::{create_router, GatewayState, ResponseCollector};
use digital_wallet::ledger::InMemoryLedgerStore;
use digital_wallet::messages::Action;
use digital_wallet::queue::InMemoryQueue;
use digital_wallet::worker;
use http_body_util::BodyExt;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

pub struct TestGateway {
    pub app: Router,
    pub state: GatewayState,
    pub store: InMemoryLedgerStore,
    pub queue: InMemoryQueue,
    shutdown: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

/// Gateway config with short timeouts; `wait` bounds every response wait
pub fn test_config(wait: Duration) -> GatewayConfig {
    let mut config = GatewayConfig::defaults();
    config.instance_id = Some(1);
    config.poll_interval = Duration::from_millis(5);
    for action in Action::ALL {
        let service = config.service_mut(action);
        service.queue_timeout = Duration::from_millis(50);
        service.cache_wait_timeout = wait;
    }
    config
}

/// Gateway with collectors and a worker for every operation
pub fn spawn_gateway() -> TestGateway {
    spawn(test_config(Duration::from_secs(5)), true)
}

/// Gateway with collectors but no workers, so every call times out
pub fn spawn_gateway_without_workers(wait: Duration) -> TestGateway {
    spawn(test_config(wait), false)
}

fn spawn(config: GatewayConfig, with_workers: bool) -> TestGateway {
    let queue = InMemoryQueue::new();
    let store = InMemoryLedgerStore::new();
    let shutdown = CancellationToken::new();
    let state = GatewayState::new(config, Arc::new(queue.clone()));

    let mut tasks = Vec::new();
    for service in state.config.services() {
        let collector = ResponseCollector::new(Arc::new(queue.clone()), state.pending.clone(), service.clone());
        tasks.push(collector.start(shutdown.clone()));

        if with_workers {
            tasks.push(tokio::spawn(worker::serve(
                Arc::new(store.clone()),
                Arc::new(queue.clone()),
                service.clone(),
                shutdown.clone(),
            )));
        }
    }

    TestGateway {
        app: create_router(state.clone()),
        state,
        store,
        queue,
        shutdown,
        tasks,
    }
}

impl TestGateway {
    /// Send one request; returns the status and the JSON body (`Null` when empty)
    pub async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let response = self.raw(method, uri, body.map(|b| b.to_string())).await;
        let status = response.status();
        (status, json_body(response).await)
    }

    pub async fn raw(&self, method: Method, uri: &str, body: Option<String>) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        let request = builder
            .body(body.map(Body::from).unwrap_or_else(Body::empty))
            .unwrap();

        self.app.clone().oneshot(request).await.unwrap()
    }

    pub async fn deposit(&self, wallet: &str, amount: &str, currency: &str) -> Value {
        let (status, body) = self
            .call(
                Method::POST,
                &format!("/wallets/{}/deposits", wallet),
                Some(serde_json::json!({"amount": amount, "currency": currency})),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "deposit failed: {}", body);
        body
    }

    pub async fn balance(&self, wallet: &str) -> Value {
        let (status, body) = self
            .call(Method::GET, &format!("/wallets/{}/balance", wallet), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        body
    }

    pub async fn stop(self) {
        self.shutdown.cancel();
        for task in self.tasks {
            tokio::time::timeout(Duration::from_secs(2), task)
                .await
                .expect("background task did not stop")
                .unwrap();
        }
    }
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    }
}
