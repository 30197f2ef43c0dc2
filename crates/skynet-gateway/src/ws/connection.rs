//! The per-connection lifecycle (§4.6 "Session Gateway responsibilities"):
//! profile lookup, live model session setup, and the reader/uplink/downlink
//! tasks that share one [`SessionContext`] for the life of a connection.
//!
//! The three tasks cancel together through a `watch::channel(false)` — the
//! first one to see the transport close or the conversation end sets it,
//! and the other two notice on their next select and unwind. This is the
//! same shutdown idiom `skynet_scheduler::SchedulerEngine::run` already uses
//! elsewhere in this workspace, so no new cancellation primitive is needed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{Message as WsMessage, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use base64::Engine;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use skynet_agent::orchestration::{DedupSet, Orchestrator, Scratchpad, Speaker};
use skynet_core::config::ECHO_FILTER_WINDOW;
use skynet_protocol::dispatch::{WakeInjection, WakeReason};
use skynet_protocol::frames::{ClientFrame, ParsedClientFrame};
use skynet_protocol::tools;
use skynet_protocol::ServerFrame;
use skynet_tasks::TaskStoreClient;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, info, warn};

use crate::app::AppState;
use crate::live_model::{self, LiveModelSink, ModelEvent, TranscriptSource};
use crate::ws::context::{with_store, SessionContext};
use crate::ws::echo_filter::EchoFilter;
use crate::ws::playback::PlaybackManager;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(user_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, user_id, state))
}

async fn handle_connection(socket: WebSocket, user_id: String, state: Arc<AppState>) {
    info!(%user_id, "session gateway connection opening");

    let tasks = state.tasks.clone();
    let user = {
        let uid = user_id.clone();
        match with_store(&tasks, move |store| store.get_or_create_user_profile(&uid)).await {
            Ok(u) => u,
            Err(e) => {
                warn!(%user_id, error = %e, "failed to load user profile, aborting connection");
                return;
            }
        }
    };

    {
        let uid = user_id.clone();
        if let Err(e) = with_store(&tasks, move |store| store.create_session(&uid)).await {
            warn!(%user_id, error = %e, "failed to create session row, aborting connection");
            return;
        }
    }
    {
        let uid = user_id.clone();
        if let Err(e) = with_store(&tasks, move |store| store.set_session_active(&uid, true)).await {
            warn!(%user_id, error = %e, "failed to mark session active, aborting connection");
            return;
        }
    }

    let now = skynet_agent::orchestration::time_resolve::now_in_zone(&user.timezone);
    let system_prompt = format!(
        "You are a voice assistant for {}. The current local time is {}. \
         Use the declared tools to act on the user's reminders and messages.",
        user.display_name,
        now.to_rfc3339(),
    );

    let live_model = match live_model::connect(&state.config.live_model.url, &system_prompt).await {
        Ok(session) => session,
        Err(e) => {
            warn!(%user_id, error = %e, "failed to open live model session");
            teardown_session(&tasks, &user_id).await;
            return;
        }
    };

    let (ws_tx, ws_rx) = socket.split();
    let (client_tx, client_rx) = mpsc::channel::<WsMessage>(256);
    let (audio_tx, audio_rx) = mpsc::channel::<String>(256);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let ctx = SessionContext {
        user: user.clone(),
        tasks: tasks.clone(),
        provider: state.provider.clone(),
        model: state.config.provider.model.clone(),
        scheduler: Some(state.scheduler.clone()),
        orchestrator: Arc::new(Orchestrator::new()),
        scratchpad: Arc::new(Mutex::new(Scratchpad::new())),
        dedup: Arc::new(Mutex::new(DedupSet::new())),
        echo_filter: Arc::new(Mutex::new(EchoFilter::new(ECHO_FILTER_WINDOW))),
        playback: PlaybackManager::new(client_tx.clone()),
    };

    let writer = tokio::spawn(run_writer(ws_tx, client_rx));
    let reader = tokio::spawn(run_reader(
        ws_rx,
        ctx.clone(),
        audio_tx,
        live_model.sink.clone(),
        shutdown_tx.clone(),
        shutdown_rx.clone(),
    ));
    let uplink = tokio::spawn(run_uplink(audio_rx, live_model.sink.clone(), shutdown_rx.clone()));
    let quiescence = Duration::from_millis(state.config.gateway.quiescence_ms);
    let drain_ceiling = Duration::from_millis(state.config.gateway.drain_ceiling_ms);
    let downlink = tokio::spawn(run_downlink(
        live_model.events,
        ctx.clone(),
        live_model.sink.clone(),
        client_tx.clone(),
        shutdown_tx,
        shutdown_rx,
        quiescence,
        drain_ceiling,
    ));

    let _ = tokio::join!(reader, uplink, downlink);
    drop(client_tx);
    let _ = writer.await;

    {
        let mut pad = ctx.scratchpad.lock().await;
        pad.close();
        if let Ok(snapshot) = serde_json::to_string(pad.snapshot()) {
            let uid = user_id.clone();
            if let Err(e) =
                with_store(&tasks, move |store| store.save_scratchpad_snapshot(&uid, &snapshot)).await
            {
                warn!(%user_id, error = %e, "failed to persist scratchpad snapshot on teardown");
            }
        }
    }
    teardown_session(&tasks, &user_id).await;
    info!(%user_id, "session gateway connection closed");
}

async fn teardown_session(tasks: &Arc<TaskStoreClient>, user_id: &str) {
    let uid = user_id.to_string();
    if let Err(e) = with_store(tasks, move |store| store.set_session_active(&uid, false)).await {
        warn!(%user_id, error = %e, "failed to mark session inactive on teardown");
    }
}

/// The sole owner of the outbound half of the client socket — every other
/// task reaches the client only by sending into `client_rx`'s sender side.
async fn run_writer(
    mut ws_tx: SplitSink<WebSocket, WsMessage>,
    mut client_rx: mpsc::Receiver<WsMessage>,
) {
    while let Some(msg) = client_rx.recv().await {
        if ws_tx.send(msg).await.is_err() {
            break;
        }
    }
}

async fn send_frame(client_tx: &mpsc::Sender<WsMessage>, frame: &ServerFrame) {
    let json = frame.to_json().unwrap_or_default();
    if client_tx.send(WsMessage::Text(json.into())).await.is_err() {
        warn!("client channel closed while sending server frame");
    }
}

/// Parses each inbound client frame and routes it per §4.6's recognized-
/// field precedence (audio, interrupt, structured turns, text).
async fn run_reader(
    mut ws_rx: SplitStream<WebSocket>,
    ctx: SessionContext,
    audio_tx: mpsc::Sender<String>,
    live_sink: Arc<dyn LiveModelSink>,
    shutdown_tx: watch::Sender<bool>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            msg = ws_rx.next() => {
                match msg {
                    None | Some(Err(_)) => {
                        let _ = shutdown_tx.send(true);
                        break;
                    }
                    Some(Ok(WsMessage::Close(_))) => {
                        let _ = shutdown_tx.send(true);
                        break;
                    }
                    Some(Ok(WsMessage::Text(text))) => {
                        handle_client_frame(&text, &ctx, &audio_tx, live_sink.as_ref()).await;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}

async fn handle_client_frame(
    raw: &str,
    ctx: &SessionContext,
    audio_tx: &mpsc::Sender<String>,
    live_sink: &dyn LiveModelSink,
) {
    let frame = match ClientFrame::parse(raw) {
        Ok(f) => f,
        Err(e) => {
            warn!(error = %e, "malformed client envelope, skipping");
            return;
        }
    };

    match frame.classify() {
        ParsedClientFrame::Audio(b64) => {
            // Validate at the boundary (§7 malformed-envelope handling):
            // reject a garbled block here rather than forwarding it and
            // letting the provider fail on an opaque payload.
            if base64::engine::general_purpose::STANDARD.decode(&b64).is_err() {
                warn!("dropping audio block that is not valid base64");
                return;
            }
            let _ = audio_tx.send(b64).await;
        }
        ParsedClientFrame::Interrupt => {
            ctx.playback.interrupt().await;
        }
        ParsedClientFrame::WakeInjection(wake) => {
            handle_wake_injection(wake, ctx, live_sink).await;
        }
        ParsedClientFrame::Turns { payload, turn_complete } => {
            handle_plain_turns(payload, turn_complete, live_sink).await;
        }
        ParsedClientFrame::Text(text) => {
            if let Err(e) = live_sink.send_text_turn(&text, true).await {
                warn!(error = %e, "failed to forward text turn to live model");
            }
        }
        ParsedClientFrame::Empty => {}
    }
}

async fn handle_wake_injection(wake: WakeInjection, ctx: &SessionContext, live_sink: &dyn LiveModelSink) {
    match wake.reason {
        WakeReason::Task => handle_task_wake(&wake, ctx, live_sink).await,
        WakeReason::TextMessage => handle_text_message_wake(&wake, ctx, live_sink).await,
    }
}

/// Hydrates the reminder from the store when a `task_id` is present,
/// falling back to whatever title/description the dispatcher embedded in
/// the job payload, then injects a synthesized system turn (§4.7 C6 side).
async fn handle_task_wake(wake: &WakeInjection, ctx: &SessionContext, live_sink: &dyn LiveModelSink) {
    let task_id = wake.payload.get("task_id").and_then(Value::as_str).map(str::to_string);
    let hydrated = match task_id {
        Some(id) => with_store(&ctx.tasks, move |store| store.get_task(&id)).await.ok().flatten(),
        None => None,
    };

    let description = hydrated
        .as_ref()
        .map(|t| t.description().to_string())
        .or_else(|| wake.payload.get("description").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| "a reminder".to_string());

    let turn = match hydrated.as_ref() {
        Some(task) => format!(
            "[System: deliver this reminder now, originally scheduled for {}] {description}",
            task.time_to_execute.to_rfc3339(),
        ),
        None => format!("[System: deliver this reminder now] {description}"),
    };

    if let Err(e) = live_sink.send_text_turn(&turn, true).await {
        warn!(error = %e, "failed to inject task reminder turn");
    }
}

/// Looks up unread messages for the chat named in the wake payload,
/// narrates them to the model, then marks them read and clears the
/// pending-delivery claim so a later message for the same chat can enqueue
/// its own job (§4.7 "Pending-delivery uniqueness").
async fn handle_text_message_wake(wake: &WakeInjection, ctx: &SessionContext, live_sink: &dyn LiveModelSink) {
    let chat_id = wake
        .payload
        .get("chat_id")
        .and_then(Value::as_str)
        .unwrap_or(&wake.user_id)
        .to_string();
    let message_id = wake.payload.get("message_id").and_then(Value::as_str).map(str::to_string);

    let lookup_chat = chat_id.clone();
    let unread = with_store(&ctx.tasks, move |store| store.list_unread_messages_for_chat(&lookup_chat))
        .await
        .unwrap_or_default();
    if unread.is_empty() {
        return;
    }

    let narration = unread
        .iter()
        .map(|m| format!("- {}: {}", m.sender_id, m.content))
        .collect::<Vec<_>>()
        .join("\n");
    let turn = format!("[System: narrate the following unread message(s) to the user now]\n{narration}");
    if let Err(e) = live_sink.send_text_turn(&turn, true).await {
        warn!(error = %e, "failed to inject pending-message narration turn");
        return;
    }

    let ids: Vec<String> = unread.iter().map(|m| m.message_id.clone()).collect();
    let mark_chat = chat_id.clone();
    let _ = with_store(&ctx.tasks, move |store| store.mark_messages_read(&mark_chat, &ids)).await;

    let claim_key = message_id.unwrap_or_else(|| chat_id.clone());
    let user_id = wake.user_id.clone();
    let _ = with_store(&ctx.tasks, move |store| store.clear_pending_delivery(&user_id, &claim_key)).await;
}

/// `turns` present but not a recognized wake-up shape: a plain message/task
/// pair, forwarded through as a text turn (§4.6 "structured injection").
async fn handle_plain_turns(payload: Value, turn_complete: bool, live_sink: &dyn LiveModelSink) {
    let text = payload
        .get("message")
        .or_else(|| payload.get("task"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| payload.to_string());
    if let Err(e) = live_sink.send_text_turn(&text, turn_complete).await {
        warn!(error = %e, "failed to forward plain turns injection to live model");
    }
}

/// Drains the audio queue into the live model — the only other writer
/// besides the reader's own text/turn sends, hence its own task (§5 "these
/// run concurrently").
async fn run_uplink(
    mut audio_rx: mpsc::Receiver<String>,
    live_sink: Arc<dyn LiveModelSink>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            chunk = audio_rx.recv() => {
                match chunk {
                    None => break,
                    Some(pcm) => {
                        if let Err(e) = live_sink.send_audio(&pcm).await {
                            warn!(error = %e, "failed to stream audio block to live model");
                        }
                    }
                }
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_downlink(
    mut events: mpsc::Receiver<ModelEvent>,
    ctx: SessionContext,
    live_sink: Arc<dyn LiveModelSink>,
    client_tx: mpsc::Sender<WsMessage>,
    shutdown_tx: watch::Sender<bool>,
    mut shutdown_rx: watch::Receiver<bool>,
    quiescence: Duration,
    drain_ceiling: Duration,
) {
    let mut closing = false;
    let mut turn_complete_seen = false;
    let mut last_audio_at: Option<Instant> = None;
    let mut quiescence_ticker = tokio::time::interval(Duration::from_millis(100));

    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.changed(), if !closing => break,
            _ = quiescence_ticker.tick(), if closing => {
                let quiet = turn_complete_seen
                    || last_audio_at.is_some_and(|t| t.elapsed() >= quiescence);
                if quiet {
                    finish_conversation(&ctx, &client_tx, drain_ceiling).await;
                    break;
                }
            }
            event = events.recv() => {
                match event {
                    None => break,
                    Some(event) => {
                        handle_model_event(
                            event,
                            &ctx,
                            &live_sink,
                            &client_tx,
                            &mut closing,
                            &mut turn_complete_seen,
                            &mut last_audio_at,
                        )
                        .await;
                    }
                }
            }
        }
    }

    let _ = shutdown_tx.send(true);
}

#[allow(clippy::too_many_arguments)]
async fn handle_model_event(
    event: ModelEvent,
    ctx: &SessionContext,
    live_sink: &Arc<dyn LiveModelSink>,
    client_tx: &mpsc::Sender<WsMessage>,
    closing: &mut bool,
    turn_complete_seen: &mut bool,
    last_audio_at: &mut Option<Instant>,
) {
    match event {
        ModelEvent::SessionResumed { handle } => {
            debug!(%handle, "live model offered a resumable session handle");
        }
        ModelEvent::GoAway { time_left_secs } => {
            warn!(?time_left_secs, "live model sent a go_away notice");
        }
        ModelEvent::ToolCall { call_id, name, input } => {
            handle_tool_call(call_id, name, input, ctx, live_sink, closing).await;
        }
        ModelEvent::AudioChunk { data_b64 } => {
            *last_audio_at = Some(Instant::now());
            ctx.playback.push(data_b64).await;
        }
        ModelEvent::Interrupted => {
            ctx.playback.interrupt().await;
        }
        ModelEvent::Transcription { source, fragment } => {
            handle_transcription(source, fragment, ctx, client_tx).await;
        }
        ModelEvent::TurnComplete => {
            if *closing {
                *turn_complete_seen = true;
            }
        }
    }
}

/// Commits pending audio to the scratchpad before any tool-call record —
/// §4.6 requires the audio buffers be flushed so a function-call entry
/// never straddles a spoken fragment. Only the two declared tools
/// (`think_and_repeat_output`, `end_conversation`) are recognized; anything
/// else is logged and rejected rather than forwarded further.
async fn handle_tool_call(
    call_id: String,
    name: String,
    input: Value,
    ctx: &SessionContext,
    live_sink: &Arc<dyn LiveModelSink>,
    closing: &mut bool,
) {
    {
        let mut pad = ctx.scratchpad.lock().await;
        pad.commit_audio(Speaker::User);
        pad.commit_audio(Speaker::Agent);
    }

    let response_value = if name == tools::THINK_AND_REPEAT_OUTPUT {
        let user_input = input.get("user_input").and_then(Value::as_str).unwrap_or_default().to_string();
        let reply = handle_think_and_repeat(&user_input, ctx).await;
        let tagged = tools::tag_when_idle(&reply);
        if let Err(e) = live_sink.send_tool_response(&call_id, &Value::String(tagged.clone())).await {
            warn!(error = %e, "failed to send tool response for think_and_repeat_output");
        }
        serde_json::json!({ "reply": tagged })
    } else if name == tools::END_CONVERSATION {
        let goodbye = input.get("goodbye_message").and_then(Value::as_str).unwrap_or_default().to_string();
        if let Err(e) = live_sink
            .send_tool_response(&call_id, &serde_json::json!({ "acknowledged": true }))
            .await
        {
            warn!(error = %e, "failed to acknowledge end_conversation tool call");
        }
        *closing = true;
        serde_json::json!({ "goodbye_message": goodbye })
    } else {
        warn!(name = %name, "unrecognized tool call from live model, ignoring");
        serde_json::json!({ "error": "unrecognized tool" })
    };

    let mut pad = ctx.scratchpad.lock().await;
    pad.append_function_call(Speaker::Agent, name, call_id, Some(input), Some(response_value));
}

/// The dedup set is checked-and-inserted here, atomically within this one
/// handler (§5) — a duplicate gets the sentinel reply without ever reaching
/// the orchestrator.
async fn handle_think_and_repeat(user_input: &str, ctx: &SessionContext) -> String {
    {
        let mut dedup = ctx.dedup.lock().await;
        if !dedup.check_and_insert(user_input) {
            return tools::duplicate_suppressed_reply();
        }
    }
    let turn_ctx = ctx.turn_context();
    let mut pad = ctx.scratchpad.lock().await;
    ctx.orchestrator.think(user_input, &mut pad, &turn_ctx).await
}

async fn handle_transcription(
    source: TranscriptSource,
    fragment: String,
    ctx: &SessionContext,
    client_tx: &mpsc::Sender<WsMessage>,
) {
    match source {
        TranscriptSource::Output => {
            ctx.echo_filter.lock().await.record_output(&fragment);
            ctx.scratchpad.lock().await.buffer_audio(Speaker::Agent, &fragment);
            send_frame(client_tx, &ServerFrame::output_text(fragment)).await;
        }
        TranscriptSource::Input => {
            let dropped = ctx.echo_filter.lock().await.should_drop_input(&fragment);
            if dropped {
                debug!(%fragment, "dropping echoed input transcript fragment");
                return;
            }
            ctx.scratchpad.lock().await.buffer_audio(Speaker::User, &fragment);
            send_frame(client_tx, &ServerFrame::input_text(fragment)).await;
        }
    }
}

/// Drains remaining playback (bounded by `drain_ceiling`) then sends the
/// end-of-conversation marker — the downlink's last act before shutdown.
async fn finish_conversation(ctx: &SessionContext, client_tx: &mpsc::Sender<WsMessage>, drain_ceiling: Duration) {
    ctx.playback.drain(drain_ceiling).await;
    send_frame(client_tx, &ServerFrame::end_conversation()).await;
}
