//! cache_purge tool implementation.
//!
//! Deletes a whole named store, or entries whose URL contains a pattern.

use offcache_client::Worker;
use offcache_core::{CacheDb, Error};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Store to purge. Defaults to the live store when only a pattern is given.
    pub cache_name: Option<String>,

    /// Delete only entries whose URL contains this substring.
    pub url_pattern: Option<String>,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Number of entries deleted.
    pub deleted: u64,

    /// Whether the store itself was removed.
    pub store_deleted: bool,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(worker: &Worker, cache: &CacheDb, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    let output = match (params.cache_name, params.url_pattern) {
        (None, None) => {
            return Err(Error::InvalidInput("At least one of cache_name or url_pattern must be specified".to_string()).into());
        }
        (store, Some(pattern)) => {
            if pattern.is_empty() {
                return Err(Error::InvalidInput("url_pattern must not be empty".to_string()).into());
            }
            let store = store.unwrap_or_else(|| worker.cache_name().to_string());
            let deleted = cache.purge_entries_by_url(&store, &pattern).await?;
            CachePurgeOutput { deleted, store_deleted: false }
        }
        (Some(store), None) => {
            let deleted = cache.entry_keys(&store).await?.len() as u64;
            let store_deleted = cache.delete_store(&store).await?;
            CachePurgeOutput { deleted: if store_deleted { deleted } else { 0 }, store_deleted }
        }
    };

    tracing::info!(deleted = output.deleted, store_deleted = output.store_deleted, "cache purge");
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{parse_result, test_support};
    use offcache_core::StoredResponse;

    async fn seed(db: &CacheDb, store: &str, urls: &[&str]) {
        db.open_store(store).await.unwrap();
        for url in urls {
            db.put_entry(store, "GET", url, &[], &StoredResponse::new(200, vec![], "x"))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_purge_by_pattern_defaults_to_live_store() {
        let origin = test_support::origin_with(&[]).await;
        let (worker, db) = test_support::worker(&origin, "v1", &["/"]).await;
        seed(&db, "v1", &["https://planner.example.com/img/a.png", "https://planner.example.com/app.js"]).await;
        seed(&db, "v0", &["https://planner.example.com/img/a.png"]).await;

        let params = CachePurgeParams { cache_name: None, url_pattern: Some("/img/".into()) };
        let output: CachePurgeOutput = parse_result(&purge_impl(&worker, &db, params).await.unwrap());

        assert_eq!(output.deleted, 1);
        assert!(!output.store_deleted);
        assert_eq!(db.entry_keys("v1").await.unwrap().len(), 1);
        assert_eq!(db.entry_keys("v0").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_purge_whole_store() {
        let origin = test_support::origin_with(&[]).await;
        let (worker, db) = test_support::worker(&origin, "v1", &["/"]).await;
        seed(&db, "v0", &["https://planner.example.com/a.js", "https://planner.example.com/b.js"]).await;

        let params = CachePurgeParams { cache_name: Some("v0".into()), url_pattern: None };
        let output: CachePurgeOutput = parse_result(&purge_impl(&worker, &db, params).await.unwrap());

        assert_eq!(output.deleted, 2);
        assert!(output.store_deleted);
        assert!(!db.has_store("v0").await.unwrap());
    }

    #[tokio::test]
    async fn test_purge_unknown_store() {
        let origin = test_support::origin_with(&[]).await;
        let (worker, db) = test_support::worker(&origin, "v1", &["/"]).await;

        let params = CachePurgeParams { cache_name: Some("ghost".into()), url_pattern: None };
        let output: CachePurgeOutput = parse_result(&purge_impl(&worker, &db, params).await.unwrap());
        assert_eq!(output.deleted, 0);
        assert!(!output.store_deleted);
    }

    #[tokio::test]
    async fn test_purge_no_params() {
        let origin = test_support::origin_with(&[]).await;
        let (worker, db) = test_support::worker(&origin, "v1", &["/"]).await;
        let params = CachePurgeParams { cache_name: None, url_pattern: None };

        let result = purge_impl(&worker, &db, params).await;
        assert!(result.is_err());
    }
}
