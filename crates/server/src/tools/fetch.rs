//! sw_fetch tool implementation.
//!
//! Delivers one fetch event to the worker and reports whether it was
//! intercepted and, if so, the response it produced.

use std::collections::BTreeMap;

use offcache_client::fetch::resolve;
use offcache_client::{CacheMode, Destination, FetchOutcome, Method, RequestDescriptor, RequestMode, Worker};
use offcache_core::Error;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL, or a path resolved against the application origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Request mode (default: cors).
    #[serde(default)]
    pub mode: RequestMode,

    /// Request destination (default: empty).
    #[serde(default)]
    pub destination: Destination,

    /// Cache directive (default: default).
    #[serde(default)]
    pub cache: CacheMode,
}

fn default_method() -> String {
    "GET".to_string()
}

impl SwFetchParams {
    fn into_request(self, worker: &Worker) -> Result<RequestDescriptor, Error> {
        let url = resolve(&worker.scope().origin, &self.url).map_err(|e| Error::InvalidUrl(format!("{}: {e}", self.url)))?;
        let method = Method::from_bytes(self.method.trim().to_ascii_uppercase().as_bytes())
            .map_err(|_| Error::InvalidInput(format!("invalid method: {}", self.method)))?;

        let mut request = RequestDescriptor::get(url)
            .with_method(method)
            .with_mode(self.mode)
            .with_destination(self.destination)
            .with_cache(self.cache);
        for (name, value) in self.headers {
            request = request.with_header(name, value);
        }
        Ok(request)
    }
}

/// Output from the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    /// False when the request passed through to the network untouched.
    pub intercepted: bool,

    pub status: Option<u16>,

    #[serde(default)]
    pub headers: Vec<(String, String)>,

    /// Response body decoded as UTF-8 (lossy).
    pub body: Option<String>,
}

impl From<FetchOutcome> for SwFetchOutput {
    fn from(outcome: FetchOutcome) -> Self {
        match outcome {
            FetchOutcome::PassThrough => Self { intercepted: false, status: None, headers: Vec::new(), body: None },
            FetchOutcome::Respond(response) => Self {
                intercepted: true,
                status: Some(response.status),
                body: Some(String::from_utf8_lossy(&response.body).into_owned()),
                headers: response.headers,
            },
        }
    }
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(worker: &Worker, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    let request = params.into_request(worker)?;
    tracing::debug!(method = %request.method, url = %request.url, "fetch event");

    let outcome = worker.handle_fetch(&request).await?;
    json_result(&SwFetchOutput::from(outcome))
}
