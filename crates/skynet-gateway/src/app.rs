//! Central shared state and router assembly for the session gateway.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use skynet_agent::LlmProvider;
use skynet_channels::ChannelManager;
use skynet_core::config::VoxaConfig;
use skynet_scheduler::SchedulerHandle;
use skynet_tasks::TaskStoreClient;

/// Everything an Axum handler or a session task needs to reach persisted
/// state, publish deferred jobs, or talk to the auxiliary language model.
/// Cloned as `Arc<AppState>` into every handler and into each of a
/// session's three cooperating tasks.
pub struct AppState {
    pub config: VoxaConfig,
    pub tasks: Arc<TaskStoreClient>,
    pub scheduler: Arc<SchedulerHandle>,
    pub provider: Arc<dyn LlmProvider>,
    /// Outbound Channels (C8) — in practice just the device-wake adapter,
    /// kept behind the generic manager so `/healthz` and the dispatcher
    /// share one place that knows channel status.
    pub channels: Arc<ChannelManager>,
}

impl AppState {
    pub fn new(
        config: VoxaConfig,
        tasks: Arc<TaskStoreClient>,
        scheduler: Arc<SchedulerHandle>,
        provider: Arc<dyn LlmProvider>,
        channels: Arc<ChannelManager>,
    ) -> Self {
        Self {
            config,
            tasks,
            scheduler,
            provider,
            channels,
        }
    }
}

/// Assemble the full Axum router: the session gateway's WebSocket endpoint
/// plus the REST surface from `SPEC_FULL.md` §6.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(crate::http::health::health_handler))
        .route("/ws/{user_id}", get(crate::ws::connection::ws_handler))
        .route(
            "/messages",
            post(crate::http::messages::create_message).get(crate::http::messages::list_messages),
        )
        .route(
            "/messages/enqueue",
            post(crate::http::messages::enqueue_message),
        )
        .route("/tasks", post(crate::http::tasks::create_task))
        .route("/tasks/{user_id}", get(crate::http::tasks::list_tasks))
        .route(
            "/tasks/{user_id}/{task_id}",
            get(crate::http::tasks::get_task)
                .put(crate::http::tasks::update_task)
                .delete(crate::http::tasks::delete_task),
        )
        .route("/enqueue-task", post(crate::http::tasks::enqueue_task))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
