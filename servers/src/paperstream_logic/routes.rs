use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use lib_paperstream::{StatusSnapshot, StreamManager};
use serde_json::{Value, json};

/// Control surface over the single stream manager.
pub fn router(manager: Arc<StreamManager>) -> Router {
    Router::new()
        .route("/start", post(start_handler))
        .route("/stop", post(stop_handler))
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .with_state(manager)
}

async fn start_handler(State(manager): State<Arc<StreamManager>>) -> Json<Value> {
    Json(json!({ "status": manager.start() }))
}

async fn stop_handler(State(manager): State<Arc<StreamManager>>) -> Json<Value> {
    Json(json!({ "status": manager.stop().await }))
}

async fn status_handler(State(manager): State<Arc<StreamManager>>) -> Json<StatusSnapshot> {
    Json(manager.status())
}

/// Liveness for load balancers and uptime checkers.
async fn health_handler() -> &'static str {
    "OK"
}
