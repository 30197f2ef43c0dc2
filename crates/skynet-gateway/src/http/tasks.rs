//! Task CRUD surface (`SPEC_FULL.md` §6) plus `POST /enqueue-task`, the
//! operational re-publish endpoint used when a task's wake job needs to be
//! re-created without touching the task itself (e.g. after a scheduler
//! restore).

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

use crate::app::AppState;
use crate::error::{GatewayError, Result};
use skynet_tasks::{Task, TaskPatch};

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub user_id: String,
    pub info: HashMap<String, String>,
    pub time_to_execute: DateTime<FixedOffset>,
}

/// `POST /tasks` — create a task, then publish its execution-time wake job
/// (§4.7 ingress surface a), mirroring what the task-creation tool agent
/// does internally.
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<Json<Task>> {
    let task = state
        .tasks
        .create_task(&req.user_id, req.info, req.time_to_execute)?;
    publish_task_wake(&state, &task)?;
    Ok(Json(task))
}

/// `GET /tasks/{user_id}` — all tasks for a user, ordered by execution time.
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Task>>> {
    Ok(Json(state.tasks.list_tasks_for_user(&user_id)?))
}

/// `GET /tasks/{user_id}/{task_id}` — a single task. 404s via
/// `StoreError::TaskNotFound` if the id doesn't exist or belongs to a
/// different user.
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Path((user_id, task_id)): Path<(String, String)>,
) -> Result<Json<Task>> {
    let task = state
        .tasks
        .get_task(&task_id)?
        .filter(|t| t.user_id == user_id)
        .ok_or_else(|| {
            GatewayError::StoreUnavailable(skynet_tasks::StoreError::TaskNotFound {
                task_id: task_id.clone(),
            })
        })?;
    Ok(Json(task))
}

/// `PUT /tasks/{user_id}/{task_id}` — partial update. Ownership is checked
/// the same way as `get_task` before the patch is applied.
pub async fn update_task(
    State(state): State<Arc<AppState>>,
    Path((user_id, task_id)): Path<(String, String)>,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<Task>> {
    let existing = state
        .tasks
        .get_task(&task_id)?
        .filter(|t| t.user_id == user_id)
        .ok_or_else(|| {
            GatewayError::StoreUnavailable(skynet_tasks::StoreError::TaskNotFound {
                task_id: task_id.clone(),
            })
        })?;
    let _ = existing;
    Ok(Json(state.tasks.update_task(&task_id, patch)?))
}

/// `DELETE /tasks/{user_id}/{task_id}`.
pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path((user_id, task_id)): Path<(String, String)>,
) -> Result<Json<()>> {
    let existing = state
        .tasks
        .get_task(&task_id)?
        .filter(|t| t.user_id == user_id)
        .ok_or_else(|| {
            GatewayError::StoreUnavailable(skynet_tasks::StoreError::TaskNotFound {
                task_id: task_id.clone(),
            })
        })?;
    let _ = existing;
    state.tasks.delete_task(&task_id)?;
    Ok(Json(()))
}

#[derive(Debug, Deserialize)]
pub struct EnqueueTaskRequest {
    pub task_id: String,
}

/// `POST /enqueue-task` — re-publish the wake job for an existing task,
/// without creating or mutating it. Used to recover a task whose job was
/// lost (e.g. the scheduler's backing file was restored from a backup that
/// predates the job row).
pub async fn enqueue_task(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EnqueueTaskRequest>,
) -> Result<Json<Task>> {
    let task = state
        .tasks
        .get_task(&req.task_id)?
        .ok_or_else(|| {
            GatewayError::StoreUnavailable(skynet_tasks::StoreError::TaskNotFound {
                task_id: req.task_id.clone(),
            })
        })?;
    publish_task_wake(&state, &task)?;
    Ok(Json(task))
}

fn publish_task_wake(state: &AppState, task: &Task) -> Result<()> {
    skynet_scheduler::publish_task_job(
        &state.scheduler,
        &task.task_id,
        &task.user_id,
        task.description(),
        task.description(),
        task.time_to_execute,
    )?;
    Ok(())
}
