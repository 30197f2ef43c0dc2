use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// `GET /healthz` — liveness probe, per `SPEC_FULL.md` §6 ("returns 200").
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let channels: Vec<Value> = state
        .channels
        .statuses()
        .into_iter()
        .map(|(name, status)| json!({ "name": name, "status": status }))
        .collect();

    Json(json!({
        "status": "ok",
        "version": crate::version::VERSION,
        "git_sha": crate::version::GIT_SHA,
        "channels": channels,
    }))
}
