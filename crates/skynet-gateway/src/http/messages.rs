//! `POST /messages`, `POST /messages/enqueue`, `GET /messages` — the REST
//! ingestion surface for C8's text-message side (`SPEC_FULL.md` §6).
//!
//! A create or a bare enqueue both end the same way: win the
//! try-claim-pending-delivery race, then publish a deferred job one minute
//! out (§4.7 ingress surface b). Losing the race is not an error — it means
//! another ingress call already has a job in flight for this user, so the
//! new message will be picked up when that job's C6 narration runs.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::error::Result;

#[derive(Debug, Deserialize)]
pub struct CreateMessageRequest {
    pub user_id: String,
    pub chat_id: String,
    pub content: String,
    /// Accepted for compatibility with callers that stamp their own send
    /// time; the store records arrival time (`created_at`) rather than this
    /// claimed one.
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateMessageResponse {
    pub message_id: String,
    pub chat_id: String,
    pub enqueued: bool,
}

/// `POST /messages` — persist a message, then enqueue a deferred wake job
/// for its recipient unless one is already pending.
pub async fn create_message(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateMessageRequest>,
) -> Result<Json<CreateMessageResponse>> {
    let _ = req.timestamp;
    let message = state
        .tasks
        .create_message(&req.chat_id, &req.user_id, &req.content)?;

    let enqueued = enqueue_pending_delivery(&state, &req.user_id, &req.chat_id, Some(message.message_id.clone()))?;

    Ok(Json(CreateMessageResponse {
        message_id: message.message_id,
        chat_id: message.chat_id,
        enqueued,
    }))
}

#[derive(Debug, Deserialize)]
pub struct EnqueueMessageRequest {
    pub user_id: String,
    pub chat_id: String,
}

#[derive(Debug, Serialize)]
pub struct EnqueueMessageResponse {
    pub enqueued: bool,
    pub message: String,
}

/// `POST /messages/enqueue` — re-announce unread messages for a chat that
/// already exist, without creating a new one (the device missed its wake,
/// or the caller just wants to make sure one is scheduled).
pub async fn enqueue_message(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EnqueueMessageRequest>,
) -> Result<Json<EnqueueMessageResponse>> {
    let enqueued = enqueue_pending_delivery(&state, &req.user_id, &req.chat_id, None)?;
    let message = if enqueued {
        "deferred delivery job scheduled".to_string()
    } else {
        "a delivery job was already pending for this user".to_string()
    };
    Ok(Json(EnqueueMessageResponse { enqueued, message }))
}

/// Shared claim-then-publish step. The claim itself is scoped to `user_id`
/// alone (§4.1: "no row exists for that user") — `message_id` (falling back
/// to the chat-wide sentinel for the bare enqueue endpoint) is only the
/// value recorded on the row, not part of what makes the claim unique, so a
/// second message for a user who already has a pending claim loses the race
/// rather than publishing a second wake job.
fn enqueue_pending_delivery(
    state: &AppState,
    user_id: &str,
    chat_id: &str,
    message_id: Option<String>,
) -> Result<bool> {
    let claim_key = message_id.clone().unwrap_or_else(|| chat_id.to_string());
    if !state.tasks.try_claim_pending_delivery(user_id, &claim_key)? {
        return Ok(false);
    }

    let delay = Duration::seconds(state.config.dispatcher.text_message_delay_secs);
    if let Err(e) =
        skynet_scheduler::publish_text_message_job(&state.scheduler, user_id, chat_id, message_id, delay)
    {
        state.tasks.release_pending_delivery(user_id, &claim_key)?;
        return Err(e.into());
    }
    Ok(true)
}

#[derive(Debug, Deserialize)]
pub struct ListMessagesQuery {
    pub chat_id: String,
}

/// `GET /messages?chat_id=...` — chronological message list for a chat.
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListMessagesQuery>,
) -> Result<Json<Vec<skynet_tasks::Message>>> {
    Ok(Json(state.tasks.list_messages_for_chat(&q.chat_id)?))
}
