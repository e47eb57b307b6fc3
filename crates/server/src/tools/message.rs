//! sw_message tool implementation.

use offcache_client::Worker;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Parameters for the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageParams {
    /// Message posted by the application, e.g. `{"type": "SKIP_WAITING"}` or
    /// `{"type": "CACHE_URLS", "urls": ["/a.js"]}`. Anything else is ignored.
    pub payload: serde_json::Value,
}

/// Implementation of the sw_message tool.
pub async fn message_impl(worker: &Worker, params: SwMessageParams) -> Result<CallToolResult, McpError> {
    let outcome = worker.handle_message(&params.payload).await?;
    json_result(&outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{parse_result, test_support};
    use offcache_client::WorkerState;
    use serde_json::{Value, json};

    #[tokio::test]
    async fn test_skip_waiting_activates_installed_worker() {
        let origin = test_support::origin_with(&["/"]).await;
        let (worker, _db) = test_support::worker(&origin, "v1", &["/"]).await;
        worker.install().await.unwrap();

        let params = SwMessageParams { payload: json!({ "type": "SKIP_WAITING" }) };
        let value: Value = parse_result(&message_impl(&worker, params).await.unwrap());
        assert_eq!(value["outcome"], "activated");
        assert_eq!(worker.state(), WorkerState::Active);
    }

    #[tokio::test]
    async fn test_cache_urls_reports_per_url() {
        let origin = test_support::origin_with(&["/", "/lesson-1.json"]).await;
        let (worker, db) = test_support::worker(&origin, "v1", &["/"]).await;

        let params = SwMessageParams { payload: json!({ "type": "CACHE_URLS", "urls": ["/lesson-1.json", "/nope.json"] }) };
        let value: Value = parse_result(&message_impl(&worker, params).await.unwrap());

        assert_eq!(value["outcome"], "precached");
        assert_eq!(value["cached"].as_array().unwrap().len(), 1);
        assert_eq!(value["failed"][0]["reason"], "status 404");

        let url = format!("{}/lesson-1.json", origin.uri());
        assert!(db.match_entry("v1", "GET", &url, &[]).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unknown_message_is_ignored() {
        let origin = test_support::origin_with(&["/"]).await;
        let (worker, _db) = test_support::worker(&origin, "v1", &["/"]).await;

        let params = SwMessageParams { payload: json!({ "type": "RELOAD" }) };
        let value: Value = parse_result(&message_impl(&worker, params).await.unwrap());
        assert_eq!(value, json!({ "outcome": "ignored" }));
    }
}
