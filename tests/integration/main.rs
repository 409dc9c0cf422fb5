//! danmu integration test harness.
//!
//! Runs the real HTTP sender against an in-process mock of the overlay's
//! `/api/send-danmu` endpoint. No external services are needed:
//!
//!   cargo test --test integration

use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

mod config;
mod sender;

// ── Mock overlay ──────────────────────────────────────────────────────────────

/// One request as the overlay saw it.
#[derive(Debug, Clone)]
pub struct Received {
    pub at: Instant,
    pub body: Value,
}

struct MockState {
    reply: (StatusCode, String),
    received: Mutex<Vec<Received>>,
}

/// Records every POSTed payload and answers with a fixed status and body.
pub struct MockOverlay {
    pub url: String,
    state: Arc<MockState>,
    server: JoinHandle<()>,
}

impl MockOverlay {
    pub async fn start() -> Result<Self> {
        Self::with_reply(StatusCode::OK, "ok").await
    }

    pub async fn with_reply(status: StatusCode, body: &str) -> Result<Self> {
        let state = Arc::new(MockState {
            reply: (status, body.to_string()),
            received: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/api/send-danmu", post(send_danmu))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            url: format!("http://{addr}/api/send-danmu"),
            state,
            server,
        })
    }

    pub fn received(&self) -> Vec<Received> {
        self.state.received.lock().unwrap().clone()
    }
}

impl Drop for MockOverlay {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn send_danmu(
    State(state): State<Arc<MockState>>,
    Json(body): Json<Value>,
) -> (StatusCode, String) {
    state.received.lock().unwrap().push(Received {
        at: Instant::now(),
        body,
    });
    state.reply.clone()
}

/// A URL on a port nothing listens on.
pub async fn dead_endpoint() -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{addr}/api/send-danmu"))
}
