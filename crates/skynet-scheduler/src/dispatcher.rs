//! Deferred Dispatcher (C7): consumes jobs fired by [`SchedulerEngine`] and
//! decides, per (user, reason), whether to re-queue against an active
//! session or push a wake signal to the edge device.
//!
//! Jobs are ordinary [`Schedule::Once`](crate::types::Schedule) rows whose
//! opaque `action` column carries a JSON-encoded
//! [`QueueJob`](skynet_protocol::dispatch::QueueJob). Task jobs are
//! scheduled for the task's execution instant; text-message jobs are
//! scheduled one minute after ingress (per `DispatcherConfig`). Both flow
//! through the same consumer loop below.

use std::sync::Arc;

use chrono::{Duration, Utc};
use skynet_channels::Channel;
use skynet_core::config::DispatcherConfig;
use skynet_protocol::dispatch::{QueueJob, WakeReason, WakeSignal};
use skynet_tasks::TaskStoreClient;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::engine::SchedulerHandle;
use crate::error::Result;
use crate::types::{Job, Schedule};

/// Publish a task job for the task's own execution instant (§4.7 ingress
/// surface a). Called by the task store client immediately after a
/// successful `create_task`.
///
/// Takes a [`SchedulerHandle`] rather than the polling [`crate::engine::SchedulerEngine`]
/// itself — the handle wraps its own mutex-guarded connection precisely so
/// callers that don't own the engine's poll loop (tool agents, REST
/// handlers, this dispatcher) can insert jobs concurrently with it.
pub fn publish_task_job(
    engine: &SchedulerHandle,
    task_id: &str,
    user_id: &str,
    title: &str,
    description: &str,
    time_to_execute: chrono::DateTime<chrono::FixedOffset>,
) -> Result<Job> {
    let job = QueueJob::task(task_id, user_id, title, description);
    let action = serde_json::to_string(&job).unwrap_or_default();
    engine.add_job(
        &format!("task:{task_id}"),
        Schedule::Once { at: time_to_execute.with_timezone(&Utc) },
        &action,
    )
}

/// Publish a text-message job one minute in the future (§4.7 ingress
/// surface b), but only if the caller has already won the
/// try-claim-pending-delivery race for this user. The claim itself is
/// performed by the REST handler via [`TaskStoreClient::try_claim_pending_delivery`]
/// before calling this function; on scheduler-insert failure the caller
/// must release the claim.
pub fn publish_text_message_job(
    engine: &SchedulerHandle,
    user_id: &str,
    chat_id: &str,
    message_id: Option<String>,
    delay: Duration,
) -> Result<Job> {
    let job = QueueJob::text_message(user_id, chat_id, message_id);
    let action = serde_json::to_string(&job).unwrap_or_default();
    engine.add_job(
        &format!("text_message:{user_id}"),
        Schedule::Once { at: Utc::now() + delay },
        &action,
    )
}

/// Runs the consumer side of C7: drains jobs forwarded by the scheduler's
/// `fired_tx` channel and routes each one.
pub struct DispatcherConsumer {
    tasks: Arc<TaskStoreClient>,
    device: Arc<dyn Channel>,
    requeue_delay: Duration,
}

impl DispatcherConsumer {
    pub fn new(tasks: Arc<TaskStoreClient>, device: Arc<dyn Channel>, config: &DispatcherConfig) -> Self {
        Self {
            tasks,
            device,
            requeue_delay: Duration::seconds(config.active_session_requeue_secs),
        }
    }

    /// Drive the consumer loop until `fired_rx` closes (engine shutdown).
    pub async fn run(self, mut fired_rx: mpsc::Receiver<Job>, engine: Arc<SchedulerHandle>) {
        while let Some(job) = fired_rx.recv().await {
            if let Err(e) = self.handle(job, &engine).await {
                error!(error = %e, "deferred dispatcher consumer failed on a job; broker redelivery applies");
            }
        }
    }

    async fn handle(&self, job: Job, engine: &SchedulerHandle) -> Result<()> {
        let payload: QueueJob = match serde_json::from_str(&job.action) {
            Ok(p) => p,
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "dropping job with unparseable payload");
                return Ok(());
            }
        };

        let user_id = payload.user_id().to_string();
        let active = self.tasks.is_session_active(&user_id).unwrap_or(false);

        if active {
            info!(user_id = %user_id, reason = ?payload.reason(), "session active, re-queueing deferred job");
            let action = serde_json::to_string(&payload).unwrap_or_default();
            engine.add_job(
                &job.name,
                Schedule::Once { at: Utc::now() + self.requeue_delay },
                &action,
            )?;
            return Ok(());
        }

        info!(user_id = %user_id, reason = ?payload.reason(), "session inactive, pushing device wake");
        let reason = payload.reason();
        let wake_payload = match serde_json::to_value(&payload) {
            Ok(v) => v,
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "could not serialize wake payload");
                return Ok(());
            }
        };
        let signal = WakeSignal::new(reason, &user_id, wake_payload);
        if let Err(e) = self.device.send(&signal).await {
            warn!(user_id = %user_id, error = %e, "device wake push failed; job left for broker redelivery");
            return Err(crate::error::SchedulerError::DeviceUnreachable(e.to_string()));
        }
        Ok(())
    }
}
