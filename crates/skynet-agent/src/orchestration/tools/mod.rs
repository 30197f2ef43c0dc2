//! The fixed set of tool agents the Selector chooses among (§4.3).

pub mod compose_reply;
pub mod create_tasks;
pub mod delete_tasks;
pub mod edit_tasks;
pub mod get_tasks;

use std::collections::HashMap;
use std::sync::Arc;

use crate::orchestration::tool_agent::ToolAgent;

/// Build the standard registry: the four side-effecting task tools plus
/// the terminal compose-reply tool, keyed by name.
pub fn default_registry() -> HashMap<String, Arc<dyn ToolAgent>> {
    let agents: Vec<Arc<dyn ToolAgent>> = vec![
        Arc::new(create_tasks::CreateTasksTool),
        Arc::new(get_tasks::GetTasksTool),
        Arc::new(edit_tasks::EditTasksTool),
        Arc::new(delete_tasks::DeleteTasksTool),
        Arc::new(compose_reply::ComposeReplyTool),
    ];
    agents.into_iter().map(|a| (a.name().to_string(), a)).collect()
}
