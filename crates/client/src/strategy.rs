//! Caching strategies.
//!
//! - static assets: cache first, network on miss, no offline substitute
//! - default: network first, cached copy when the network fails
//! - backend host: network only, synthesized offline JSON on failure
//!
//! Successful (200) fetches are written to the live store on a background
//! task with a clone of the response; the caller never waits for the write.

use std::sync::{Arc, Mutex, PoisonError};

use offcache_core::{CacheDb, Error, StoredResponse};
use serde::Serialize;
use tokio::task::JoinSet;

use crate::classify::RequestClass;
use crate::fetch::Fetcher;
use crate::request::RequestDescriptor;

/// Result of a fetch event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "response", rename_all = "snake_case")]
pub enum FetchOutcome {
    /// Not intercepted; the host performs the request itself.
    PassThrough,
    Respond(StoredResponse),
}

/// Response handed to the application when the backend is unreachable.
pub fn offline_response() -> StoredResponse {
    let body = serde_json::json!({ "error": "Offline", "message": "No internet connection" });
    StoredResponse::new(503, vec![("content-type".into(), "application/json".into())], body.to_string())
}

/// Runs the strategy for a request class against the live store.
#[derive(Clone)]
pub struct StrategyExecutor {
    db: CacheDb,
    fetcher: Arc<dyn Fetcher>,
    cache_name: String,
    pending: Arc<Mutex<JoinSet<()>>>,
}

impl StrategyExecutor {
    pub fn new(db: CacheDb, fetcher: Arc<dyn Fetcher>, cache_name: impl Into<String>) -> Self {
        Self { db, fetcher, cache_name: cache_name.into(), pending: Arc::new(Mutex::new(JoinSet::new())) }
    }

    /// Dispatch on the request class.
    pub async fn handle(&self, class: RequestClass, request: &RequestDescriptor) -> Result<FetchOutcome, Error> {
        let response = match class {
            RequestClass::Bypass(reason) => {
                tracing::debug!(url = %request.url, ?reason, "pass-through");
                return Ok(FetchOutcome::PassThrough);
            }
            RequestClass::StaticAsset => self.cache_first(request).await?,
            RequestClass::Default => self.network_first(request).await?,
            RequestClass::Backend => self.network_only(request).await?,
        };
        Ok(FetchOutcome::Respond(response))
    }

    /// Serve from the live store; fetch and store on a miss.
    pub async fn cache_first(&self, request: &RequestDescriptor) -> Result<StoredResponse, Error> {
        if let Some(cached) = self.lookup(request).await {
            tracing::debug!(url = %request.url, "cache hit");
            return Ok(cached);
        }

        tracing::debug!(url = %request.url, "cache miss");
        let response = self.fetcher.fetch(request).await?;
        if response.is_cacheable() {
            self.store_in_background(request, response.clone());
        }
        Ok(response)
    }

    /// Fetch and store; fall back to the live store when the network fails.
    ///
    /// Errors that are not network failures (a malformed request) propagate
    /// without consulting the store.
    pub async fn network_first(&self, request: &RequestDescriptor) -> Result<StoredResponse, Error> {
        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.is_cacheable() {
                    self.store_in_background(request, response.clone());
                }
                Ok(response)
            }
            Err(err) if !err.is_network() => Err(err),
            Err(err) => match self.lookup(request).await {
                Some(cached) => {
                    tracing::debug!(url = %request.url, error = %err, "network failed, serving cached copy");
                    Ok(cached)
                }
                None => Err(err),
            },
        }
    }

    /// Never touches the store. Network failures become [`offline_response`].
    pub async fn network_only(&self, request: &RequestDescriptor) -> Result<StoredResponse, Error> {
        match self.fetcher.fetch(request).await {
            Ok(response) => Ok(response),
            Err(err) if err.is_network() => {
                tracing::debug!(url = %request.url, error = %err, "backend unreachable");
                Ok(offline_response())
            }
            Err(err) => Err(err),
        }
    }

    /// Wait for every background store write issued so far.
    pub async fn settle(&self) {
        let mut pending = {
            let mut guard = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *guard)
        };
        while let Some(joined) = pending.join_next().await {
            if let Err(e) = joined {
                tracing::warn!(error = %e, "background cache write panicked");
            }
        }
    }

    /// A store that cannot be read is treated as a miss.
    async fn lookup(&self, request: &RequestDescriptor) -> Option<StoredResponse> {
        match self
            .db
            .match_entry(&self.cache_name, request.method.as_str(), request.url.as_str(), &request.headers)
            .await
        {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "cache lookup failed");
                None
            }
        }
    }

    fn store_in_background(&self, request: &RequestDescriptor, response: StoredResponse) {
        let db = self.db.clone();
        let store = self.cache_name.clone();
        let method = request.method.to_string();
        let url = request.url.to_string();
        let headers = request.headers.clone();

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        while pending.try_join_next().is_some() {}
        pending.spawn(async move {
            match db.put_entry(&store, &method, &url, &headers, &response).await {
                Ok(true) => {}
                Ok(false) => tracing::debug!(url = %url, store = %store, "store no longer exists; write dropped"),
                Err(e) => tracing::warn!(url = %url, error = %e, "background cache write failed"),
            }
        });
    }
}
