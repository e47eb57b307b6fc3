//! sw_install, sw_activate and sw_status tools.

use offcache_client::{Worker, WorkerState};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Output from the sw_install tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwInstallOutput {
    pub cache_name: String,
    pub state: WorkerState,
    /// Entries held across all stores once install finished.
    pub entries: u64,
}

/// Output from the sw_activate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwActivateOutput {
    pub cache_name: String,
    pub state: WorkerState,
    /// Stores removed because their name differs from the current version.
    pub deleted: Vec<String>,
}

/// Implementation of the sw_install tool.
pub async fn install_impl(worker: &Worker) -> Result<CallToolResult, McpError> {
    worker.install().await?;
    let status = worker.status().await?;
    json_result(&SwInstallOutput { cache_name: status.cache_name, state: status.state, entries: status.entries })
}

/// Implementation of the sw_activate tool.
pub async fn activate_impl(worker: &Worker) -> Result<CallToolResult, McpError> {
    let deleted = worker.activate().await?;
    json_result(&SwActivateOutput { cache_name: worker.cache_name().to_string(), state: worker.state(), deleted })
}

/// Implementation of the sw_status tool.
pub async fn status_impl(worker: &Worker) -> Result<CallToolResult, McpError> {
    let status = worker.status().await?;
    json_result(&status)
}
