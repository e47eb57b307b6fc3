//! cache_get tool implementation.
//!
//! Looks up the live store entry for a GET of the given URL.

use offcache_client::Worker;
use offcache_client::fetch::resolve;
use offcache_core::{CacheDb, Error};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Absolute URL, or a path resolved against the application origin.
    pub url: String,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub cache_name: String,
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    /// Stored body decoded as UTF-8 (lossy).
    pub body: String,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(worker: &Worker, cache: &CacheDb, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let url = resolve(&worker.scope().origin, &params.url)
        .map_err(|e| Error::InvalidUrl(format!("{}: {e}", params.url)))?;

    let response = cache
        .match_entry(worker.cache_name(), "GET", url.as_str(), &[])
        .await?
        .ok_or_else(|| Error::CacheMiss(url.to_string()))?;

    json_result(&CacheGetOutput {
        cache_name: worker.cache_name().to_string(),
        url: url.to_string(),
        status: response.status,
        body: String::from_utf8_lossy(&response.body).into_owned(),
        headers: response.headers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{parse_result, test_support};
    use offcache_core::StoredResponse;

    #[tokio::test]
    async fn test_get_impl_missing() {
        let origin = test_support::origin_with(&[]).await;
        let (worker, db) = test_support::worker(&origin, "v1", &["/"]).await;

        let err = get_impl(&worker, &db, CacheGetParams { url: "/nonexistent.js".into() })
            .await
            .unwrap_err();
        assert!(err.message.starts_with("CACHE_MISS"));
    }

    #[tokio::test]
    async fn test_get_impl_found() {
        let origin = test_support::origin_with(&[]).await;
        let (worker, db) = test_support::worker(&origin, "v1", &["/"]).await;
        let url = format!("{}/app.js", origin.uri());
        let stored = StoredResponse::new(200, vec![("content-type".into(), "text/javascript".into())], "run()");
        db.open_store("v1").await.unwrap();
        db.put_entry("v1", "GET", &url, &[], &stored).await.unwrap();

        let result = get_impl(&worker, &db, CacheGetParams { url: "/app.js".into() }).await.unwrap();
        let output: CacheGetOutput = parse_result(&result);
        assert_eq!(output.url, url);
        assert_eq!(output.status, 200);
        assert_eq!(output.body, "run()");
    }

    #[tokio::test]
    async fn test_get_impl_ignores_other_versions() {
        let origin = test_support::origin_with(&[]).await;
        let (worker, db) = test_support::worker(&origin, "v2", &["/"]).await;
        let url = format!("{}/app.js", origin.uri());
        db.open_store("v1").await.unwrap();
        db.put_entry("v1", "GET", &url, &[], &StoredResponse::new(200, vec![], "old"))
            .await
            .unwrap();

        let result = get_impl(&worker, &db, CacheGetParams { url }).await;
        assert!(result.is_err());
    }
}
