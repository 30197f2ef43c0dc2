//! Per-session shared state (§4.6, §5 "Shared resources"): the scratchpad,
//! dedup set, playback manager, and echo filter a session's three
//! cooperating tasks all reach through one cheaply-clonable handle. The
//! scratchpad itself is owned by this struct alone — reader, uplink, and
//! downlink never hold it outside of a lock acquisition, which is what
//! keeps its single-owner invariant (§5) true even though three tasks touch
//! it.

use std::sync::Arc;

use skynet_agent::orchestration::{DedupSet, Orchestrator, Scratchpad, TurnContext};
use skynet_agent::LlmProvider;
use skynet_scheduler::SchedulerHandle;
use skynet_tasks::TaskStoreClient;
use tokio::sync::Mutex;
use skynet_users::User;

use crate::ws::echo_filter::EchoFilter;
use crate::ws::playback::PlaybackManager;

/// Everything the reader/uplink/downlink tasks of one session share.
/// Cloning this clones `Arc`s only — cheap, and the only way any of the
/// interior state is reached.
#[derive(Clone)]
pub struct SessionContext {
    pub user: User,
    pub tasks: Arc<TaskStoreClient>,
    pub provider: Arc<dyn LlmProvider>,
    pub model: String,
    pub scheduler: Option<Arc<SchedulerHandle>>,
    pub orchestrator: Arc<Orchestrator>,
    pub scratchpad: Arc<Mutex<Scratchpad>>,
    pub dedup: Arc<Mutex<DedupSet>>,
    pub echo_filter: Arc<Mutex<EchoFilter>>,
    pub playback: PlaybackManager,
}

impl SessionContext {
    /// Build a fresh [`TurnContext`] for one orchestrator invocation — the
    /// current instant in the user's zone is recomputed every call rather
    /// than cached, since a turn can start minutes after the session did.
    pub fn turn_context(&self) -> TurnContext {
        TurnContext {
            user: self.user.clone(),
            now: skynet_agent::orchestration::time_resolve::now_in_zone(&self.user.timezone),
            tasks: self.tasks.clone(),
            provider: self.provider.clone(),
            model: self.model.clone(),
            scheduler: self.scheduler.clone(),
        }
    }
}

/// Run a synchronous `TaskStoreClient` call on the blocking worker pool
/// (§5 "Suspension points": relational-store round-trips are synchronous
/// from the caller's perspective but invoked via a thread pool so they
/// never stall a session's cooperative scheduler).
pub async fn with_store<F, T>(tasks: &Arc<TaskStoreClient>, f: F) -> T
where
    F: FnOnce(&TaskStoreClient) -> T + Send + 'static,
    T: Send + 'static,
{
    let tasks = tasks.clone();
    tokio::task::spawn_blocking(move || f(&tasks))
        .await
        .expect("task store worker panicked")
}
