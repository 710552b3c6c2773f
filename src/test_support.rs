//! In-process JSON-RPC peer for tests
//!
//! Stands in for the chain node or the token gateway. Every request is
//! recorded so tests can assert which methods were (not) called.

use axum::{http::StatusCode, routing::post, Json, Router};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

type Calls = Arc<Mutex<Vec<(String, Value)>>>;

pub struct MockRpc {
    addr: SocketAddr,
    calls: Calls,
    task: JoinHandle<()>,
}

impl MockRpc {
    /// Serve `handler(method, params)` with HTTP 200
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(&str, &Value) -> Value + Send + Sync + 'static,
    {
        Self::start_with_status(200, handler).await
    }

    /// Serve `handler(method, params)` with a fixed HTTP status
    pub async fn start_with_status<F>(status: u16, handler: F) -> Self
    where
        F: Fn(&str, &Value) -> Value + Send + Sync + 'static,
    {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let handler = Arc::new(handler);
        let status = StatusCode::from_u16(status).expect("valid status");

        let recorded = calls.clone();
        let app = Router::new().route(
            "/",
            post(move |Json(request): Json<Value>| {
                let recorded = recorded.clone();
                let handler = handler.clone();
                async move {
                    let method = request["method"].as_str().unwrap_or_default().to_string();
                    let params = request["params"].clone();
                    let response = handler(&method, &params);
                    recorded.lock().unwrap().push((method, params));
                    (status, Json(response))
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, calls, task }
    }

    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Methods received so far, in order
    pub fn methods(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(m, _)| m.clone()).collect()
    }

    /// Full (method, params) log
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Drop for MockRpc {
    fn drop(&mut self) {
        self.task.abort();
    }
}
