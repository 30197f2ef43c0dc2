//! `skynet-tasks` — the Task Store Client (`SPEC_FULL.md` §4.1): typed CRUD
//! over persisted tasks, messages, and the pending-delivery table, composed
//! with the session and user-profile stores behind one facade.

pub mod client;
pub mod db;
pub mod error;
pub mod store;
pub mod types;

pub use client::TaskStoreClient;
pub use error::StoreError;
pub use store::TaskStore;
pub use types::{Message, Task, TaskPatch, TaskStatus};
