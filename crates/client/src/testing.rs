//! In-process fetcher with scripted responses for strategy and lifecycle tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use offcache_core::{Error, StoredResponse};

use crate::fetch::Fetcher;
use crate::request::RequestDescriptor;

pub(crate) struct ScriptedFetcher {
    routes: Mutex<HashMap<String, StoredResponse>>,
    rejected: Mutex<HashMap<String, String>>,
    panicking: Mutex<Vec<String>>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedFetcher {
    /// Every URL is unreachable until a route is added.
    pub(crate) fn offline() -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
            rejected: Mutex::new(HashMap::new()),
            panicking: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub(crate) fn route(&self, url: &str, response: StoredResponse) {
        self.routes.lock().unwrap().insert(url.to_string(), response);
    }

    pub(crate) fn route_ok(&self, url: &str, body: &'static str) {
        self.route(url, StoredResponse::new(200, vec![("content-type".into(), "text/plain".into())], body));
    }

    /// Drop a route, so the URL fails at the network layer.
    pub(crate) fn disconnect(&self, url: &str) {
        self.routes.lock().unwrap().remove(url);
    }

    /// Fail the URL before it reaches the network, as a malformed request does.
    pub(crate) fn reject(&self, url: &str, reason: &str) {
        self.rejected.lock().unwrap().insert(url.to_string(), reason.to_string());
    }

    /// Make the fetch task for this URL panic.
    pub(crate) fn panic_on(&self, url: &str) {
        self.panicking.lock().unwrap().push(url.to_string());
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    /// Most fetches ever running at the same time.
    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<StoredResponse, Error> {
        let url = request.url.to_string();
        self.calls.lock().unwrap().push(url.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.panicking.lock().unwrap().contains(&url) {
            panic!("fetch task for {url} panicked");
        }

        if let Some(reason) = self.rejected.lock().unwrap().get(&url) {
            return Err(Error::InvalidInput(reason.clone()));
        }
        self.routes
            .lock()
            .unwrap()
            .get(&url)
            .cloned()
            .ok_or_else(|| Error::Network(format!("{url}: connection refused")))
    }
}
