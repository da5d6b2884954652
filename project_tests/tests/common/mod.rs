//! In-process stand-ins for the Jetstream endpoint and the ingestion receiver.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{
        Path, State,
        ws::{Message, WebSocketUpgrade},
    },
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use lib_paperstream::{IngestConfig, PipelineConfig};
use serde_json::{Value, json};
use tokio::net::TcpListener;

async fn spawn_router(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr.to_string()
}

/// Mock Jetstream: every connection gets the same frames.
#[derive(Clone)]
pub struct MockJetstream {
    pub url: String,
    connections: Arc<AtomicUsize>,
}

#[derive(Clone)]
struct StreamScript {
    frames: Arc<Vec<String>>,
    close_after_send: bool,
    connections: Arc<AtomicUsize>,
}

impl MockJetstream {
    /// With `close_after_send`, the server closes each connection once the
    /// frames are out; otherwise it holds it open until the client leaves.
    pub async fn start(frames: Vec<String>, close_after_send: bool) -> Self {
        let connections = Arc::new(AtomicUsize::new(0));
        let script = StreamScript {
            frames: Arc::new(frames),
            close_after_send,
            connections: Arc::clone(&connections),
        };
        let router = Router::new()
            .route("/subscribe", get(subscribe_handler))
            .with_state(script);
        let addr = spawn_router(router).await;
        Self {
            url: format!("ws://{}/subscribe", addr),
            connections,
        }
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

async fn subscribe_handler(ws: WebSocketUpgrade, State(script): State<StreamScript>) -> axum::response::Response {
    ws.on_upgrade(move |mut socket| async move {
        script.connections.fetch_add(1, Ordering::SeqCst);
        for frame in script.frames.iter() {
            if socket.send(Message::Text(frame.clone().into())).await.is_err() {
                return;
            }
        }
        if script.close_after_send {
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
        while let Some(Ok(msg)) = socket.recv().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
    })
}

/// One request seen by the mock ingestion receiver.
#[derive(Debug, Clone)]
pub struct Received {
    pub category: String,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
pub struct MockIngest {
    pub base_url: String,
    received: Arc<Mutex<Vec<Received>>>,
}

#[derive(Clone)]
struct IngestState {
    received: Arc<Mutex<Vec<Received>>>,
    failing: Option<&'static str>,
}

impl MockIngest {
    /// `failing` names a path segment (`papers`, `longform`, `articles`)
    /// that answers 500 after recording the request.
    pub async fn start(failing: Option<&'static str>) -> Self {
        let received = Arc::new(Mutex::new(Vec::new()));
        let state = IngestState {
            received: Arc::clone(&received),
            failing,
        };
        let router = Router::new()
            .route("/api/{category}/ingest", post(ingest_handler))
            .with_state(state);
        let addr = spawn_router(router).await;
        Self {
            base_url: format!("http://{}/", addr),
            received,
        }
    }

    pub fn received(&self) -> Vec<Received> {
        self.received.lock().unwrap().clone()
    }

    pub fn for_category(&self, category: &str) -> Vec<Received> {
        self.received().into_iter().filter(|r| r.category == category).collect()
    }
}

async fn ingest_handler(
    State(state): State<IngestState>,
    Path(category): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let failing = state.failing == Some(category.as_str());
    state.received.lock().unwrap().push(Received {
        category,
        authorization,
        body,
    });
    if failing {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "ingest unavailable"})))
    } else {
        (StatusCode::OK, Json(json!({"ok": true})))
    }
}

pub const SECRET: &str = "test-secret";

pub fn pipeline_config(stream: &MockJetstream, ingest: &MockIngest) -> PipelineConfig {
    PipelineConfig {
        stream_url: stream.url.clone(),
        reconnect_delay: Duration::from_millis(200),
        keepalive_interval: Duration::from_millis(100),
        ingest: IngestConfig {
            base_url: ingest.base_url.clone(),
            secret: SECRET.to_string(),
            timeout: Duration::from_secs(5),
            max_retries: 0,
        },
        ..PipelineConfig::default()
    }
}

/// A Jetstream post creation frame.
pub fn post_frame(rkey: &str, text: &str) -> String {
    post_frame_with(rkey, json!({"text": text, "createdAt": "2024-09-09T19:46:02.102Z"}))
}

pub fn post_frame_with(rkey: &str, record: Value) -> String {
    json!({
        "did": "did:plc:alice",
        "time_us": 1_725_911_162_329_308_i64,
        "kind": "commit",
        "commit": {
            "rev": "3l3qo2vutsw2b",
            "operation": "create",
            "collection": "app.bsky.feed.post",
            "rkey": rkey,
            "record": record,
            "cid": "bafyreidwaivazkwu67xztlmuobx35hs2lnfh3kolmgfmucldvhd3sgzcqi"
        }
    })
    .to_string()
}

/// Polls `check` until it holds or `timeout` passes.
pub async fn wait_for(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
