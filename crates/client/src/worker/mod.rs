//! Worker lifecycle.
//!
//! A [`Worker`] owns one cache version. It moves through
//! `New → Installing → Installed → Activating → Active`, or to `Redundant`
//! when install fails or a newer version takes over. Install pre-populates the store named by the version;
//! activation deletes every other store and starts intercepting fetches.
//! Host events map to `install`, `activate`, `handle_fetch` and
//! `handle_message`.

pub mod message;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use offcache_core::{AppConfig, CacheDb, Error, StoredResponse};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

pub use message::{ControlMessage, MessageOutcome, PrecacheFailure, PrecacheReport};

use crate::classify::{Scope, classify};
use crate::fetch::{Fetcher, resolve};
use crate::request::RequestDescriptor;
use crate::strategy::{FetchOutcome, StrategyExecutor};

/// Lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    New,
    Installing,
    /// Installed and waiting to activate.
    Installed,
    Activating,
    Active,
    /// Install failed, or a newer version activated and deleted this
    /// worker's store. Requests pass through from then on.
    Redundant,
}

/// Settings fixed for the lifetime of a worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub cache_name: String,
    pub precache: Vec<Url>,
    pub scope: Scope,
    pub max_concurrency: usize,
}

impl WorkerConfig {
    /// Resolve the precache manifest against the configured origin.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let scope = Scope::from_config(config)?;
        let precache = config
            .precache_assets
            .iter()
            .map(|asset| resolve(&scope.origin, asset).map_err(|e| Error::InvalidUrl(format!("{asset}: {e}"))))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { cache_name: config.cache_name.clone(), precache, scope, max_concurrency: config.max_concurrency })
    }
}

/// Snapshot reported to the host.
#[derive(Debug, Clone, Serialize, schemars::JsonSchema)]
pub struct WorkerStatus {
    pub state: WorkerState,
    pub cache_name: String,
    pub stores: Vec<String>,
    pub entries: u64,
}

/// The offline cache controller.
pub struct Worker {
    config: WorkerConfig,
    db: CacheDb,
    fetcher: Arc<dyn Fetcher>,
    executor: StrategyExecutor,
    state: Mutex<WorkerState>,
    skip_waiting: AtomicBool,
}

impl Worker {
    pub fn new(config: WorkerConfig, db: CacheDb, fetcher: Arc<dyn Fetcher>) -> Self {
        let executor = StrategyExecutor::new(db.clone(), Arc::clone(&fetcher), config.cache_name.clone());
        Self {
            config,
            db,
            fetcher,
            executor,
            state: Mutex::new(WorkerState::New),
            skip_waiting: AtomicBool::new(false),
        }
    }

    pub fn cache_name(&self) -> &str {
        &self.config.cache_name
    }

    pub fn scope(&self) -> &Scope {
        &self.config.scope
    }

    pub fn state(&self) -> WorkerState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn status(&self) -> Result<WorkerStatus, Error> {
        Ok(WorkerStatus {
            state: self.state(),
            cache_name: self.config.cache_name.clone(),
            stores: self.db.store_names().await?,
            entries: self.db.total_entries().await?,
        })
    }

    fn set_state(&self, next: WorkerState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        tracing::info!(cache_name = %self.config.cache_name, from = ?*state, to = ?next, "worker state change");
        *state = next;
    }

    /// Move to `next` only if the current state is one of `from`.
    fn transition(&self, from: &[WorkerState], next: WorkerState) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !from.contains(&*state) {
            return Err(Error::InvalidState(format!("cannot move from {:?} to {:?}", *state, next)));
        }
        tracing::info!(cache_name = %self.config.cache_name, from = ?*state, to = ?next, "worker state change");
        *state = next;
        Ok(())
    }

    /// Install event: pre-populate the store for this version.
    ///
    /// Every manifest entry must fetch with a 2xx status, and then all of
    /// them are written in one transaction. On failure the worker becomes
    /// `Redundant` and older stores keep serving. Running install again on an
    /// installed worker rewrites the same keys.
    pub async fn install(&self) -> Result<(), Error> {
        self.transition(&[WorkerState::New, WorkerState::Installed], WorkerState::Installing)?;

        match self.precache_manifest().await {
            Ok(count) => {
                tracing::info!(cache_name = %self.config.cache_name, entries = count, "precache complete");
            }
            Err(e) => {
                tracing::warn!(cache_name = %self.config.cache_name, error = %e, "install failed");
                self.set_state(WorkerState::Redundant);
                return Err(e);
            }
        }

        if self.finish_install() {
            self.complete_activation().await?;
        }
        Ok(())
    }

    /// Leave `Installing`. Moves straight to `Activating` when skip-waiting
    /// was requested; the flag is read under the state lock so a concurrent
    /// message cannot slip between the check and the transition.
    fn finish_install(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let next = if self.skip_waiting.load(Ordering::SeqCst) {
            WorkerState::Activating
        } else {
            WorkerState::Installed
        };
        tracing::info!(cache_name = %self.config.cache_name, from = ?*state, to = ?next, "worker state change");
        *state = next;
        next == WorkerState::Activating
    }

    async fn precache_manifest(&self) -> Result<usize, Error> {
        let mut entries = Vec::with_capacity(self.config.precache.len());
        for (url, result) in self.fetch_all(self.config.precache.clone()).await {
            match result {
                Ok(response) if response.is_success() => entries.push((url.to_string(), response)),
                Ok(response) => {
                    return Err(Error::InstallFailed {
                        url: url.to_string(),
                        reason: format!("status {}", response.status),
                    });
                }
                Err(e) => return Err(Error::InstallFailed { url: url.to_string(), reason: e.to_string() }),
            }
        }

        self.db.install_entries(&self.config.cache_name, &entries).await
    }

    /// Activate event: delete every store but the current one and take
    /// control of fetches.
    ///
    /// Returns the names of the deleted stores.
    pub async fn activate(&self) -> Result<Vec<String>, Error> {
        self.transition(&[WorkerState::Installed], WorkerState::Activating)?;
        self.complete_activation().await
    }

    /// Runs once the state is `Activating`.
    async fn complete_activation(&self) -> Result<Vec<String>, Error> {
        match self.delete_stale_stores().await {
            Ok(deleted) => {
                self.set_state(WorkerState::Active);
                tracing::info!(cache_name = %self.config.cache_name, ?deleted, "activated; claiming clients");
                Ok(deleted)
            }
            Err(e) => {
                self.set_state(WorkerState::Installed);
                Err(e)
            }
        }
    }

    async fn delete_stale_stores(&self) -> Result<Vec<String>, Error> {
        let mut deleted = Vec::new();
        for name in self.db.store_names().await? {
            if name != self.config.cache_name && self.db.delete_store(&name).await? {
                tracing::debug!(store = %name, "deleted stale cache store");
                deleted.push(name);
            }
        }
        Ok(deleted)
    }

    /// Fetch event.
    ///
    /// Nothing is intercepted until the worker is active. An active worker
    /// whose store was deleted by a newer version's activation has been
    /// superseded: it becomes `Redundant` and passes requests through.
    pub async fn handle_fetch(&self, request: &RequestDescriptor) -> Result<FetchOutcome, Error> {
        if self.state() != WorkerState::Active {
            tracing::debug!(url = %request.url, state = ?self.state(), "worker not active; pass-through");
            return Ok(FetchOutcome::PassThrough);
        }

        if !self.db.has_store(&self.config.cache_name).await? {
            tracing::info!(cache_name = %self.config.cache_name, "store deleted by a newer version; superseded");
            self.set_state(WorkerState::Redundant);
            return Ok(FetchOutcome::PassThrough);
        }

        let class = classify(request, &self.config.scope);
        self.executor.handle(class, request).await
    }

    /// Message event. Unrecognized payloads are ignored.
    pub async fn handle_message(&self, payload: &serde_json::Value) -> Result<MessageOutcome, Error> {
        let Some(message) = ControlMessage::parse(payload) else {
            tracing::debug!(%payload, "ignoring unrecognized message");
            return Ok(MessageOutcome::Ignored);
        };

        match message {
            ControlMessage::SkipWaiting => {
                if self.request_skip_waiting() {
                    let deleted = self.complete_activation().await?;
                    Ok(MessageOutcome::Activated { deleted })
                } else {
                    Ok(MessageOutcome::SkipWaitingPending)
                }
            }
            ControlMessage::CacheUrls { urls } => Ok(MessageOutcome::Precached(self.cache_urls(&urls).await?)),
        }
    }

    /// Record skip-waiting and, if installed, claim the `Activating`
    /// transition under the same lock that install uses to finish.
    fn request_skip_waiting(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        self.skip_waiting.store(true, Ordering::SeqCst);
        if *state != WorkerState::Installed {
            return false;
        }
        tracing::info!(cache_name = %self.config.cache_name, from = ?*state, to = ?WorkerState::Activating, "worker state change");
        *state = WorkerState::Activating;
        true
    }

    /// Bulk pre-cache into the live store. Failures are reported per URL.
    pub async fn cache_urls(&self, urls: &[String]) -> Result<PrecacheReport, Error> {
        let mut report = PrecacheReport::default();
        let mut resolved = Vec::with_capacity(urls.len());
        for raw in urls {
            match resolve(&self.config.scope.origin, raw) {
                Ok(url) => resolved.push(url),
                Err(e) => report.failed.push(PrecacheFailure { url: raw.clone(), reason: e.to_string() }),
            }
        }

        self.db.open_store(&self.config.cache_name).await?;

        for (url, result) in self.fetch_all(resolved).await {
            let outcome = match result {
                Ok(response) if response.is_success() => {
                    match self
                        .db
                        .put_entry(&self.config.cache_name, "GET", url.as_str(), &[], &response)
                        .await
                    {
                        Ok(true) => Ok(()),
                        Ok(false) => Err("store was deleted".to_string()),
                        Err(e) => Err(e.to_string()),
                    }
                }
                Ok(response) => Err(format!("status {}", response.status)),
                Err(e) => Err(e.to_string()),
            };
            match outcome {
                Ok(()) => report.cached.push(url.to_string()),
                Err(reason) => {
                    tracing::warn!(url = %url, %reason, "bulk precache entry failed");
                    report.failed.push(PrecacheFailure { url: url.to_string(), reason });
                }
            }
        }

        Ok(report)
    }

    /// Wait for background cache writes started by fetch events.
    pub async fn settle(&self) {
        self.executor.settle().await;
    }

    /// Fetch URLs concurrently, at most `max_concurrency` at a time, and
    /// return one result per URL in input order. A task that panics yields
    /// an error for its own URL.
    async fn fetch_all(&self, urls: Vec<Url>) -> Vec<(Url, Result<StoredResponse, Error>)> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut set = JoinSet::new();

        for (index, url) in urls.iter().cloned().enumerate() {
            let fetcher = Arc::clone(&self.fetcher);
            let semaphore = Arc::clone(&semaphore);
            set.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                (index, fetcher.fetch(&RequestDescriptor::get(url)).await)
            });
        }

        let mut slots: Vec<Option<Result<StoredResponse, Error>>> = urls.iter().map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => tracing::warn!(error = %e, "precache fetch task failed"),
            }
        }

        urls.into_iter()
            .zip(slots)
            .map(|(url, slot)| {
                let result = slot.unwrap_or_else(|| Err(Error::Network(format!("{url}: fetch task aborted"))));
                (url, result)
            })
            .collect()
    }
}
