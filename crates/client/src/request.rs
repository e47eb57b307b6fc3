//! Request descriptors as delivered by the host with each fetch event.

use reqwest::Method;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

/// Request mode; `navigate` marks a full page load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    Navigate,
    SameOrigin,
    NoCors,
    #[default]
    Cors,
}

/// What the response will be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    #[default]
    Empty,
    Document,
    Script,
    Style,
    Image,
    Font,
    Manifest,
    Worker,
    Other,
}

impl Destination {
    /// Script, style, image and font responses are served cache-first.
    pub fn is_static_asset(self) -> bool {
        matches!(self, Destination::Script | Destination::Style | Destination::Image | Destination::Font)
    }
}

/// The request's cache directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum CacheMode {
    #[default]
    Default,
    NoStore,
    Reload,
    NoCache,
    ForceCache,
    OnlyIfCached,
}

/// Everything the controller knows about an intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub mode: RequestMode,
    pub destination: Destination,
    pub cache: CacheMode,
}

impl RequestDescriptor {
    /// A plain GET with default mode, destination and cache directive.
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: Vec::new(),
            mode: RequestMode::default(),
            destination: Destination::default(),
            cache: CacheMode::default(),
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_cache(mut self, cache: CacheMode) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_defaults() {
        let request = RequestDescriptor::get(Url::parse("https://example.com/").unwrap());
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.mode, RequestMode::Cors);
        assert_eq!(request.destination, Destination::Empty);
        assert_eq!(request.cache, CacheMode::Default);
        assert!(request.headers.is_empty());
    }

    #[test]
    fn test_header_lookup() {
        let request = RequestDescriptor::get(Url::parse("https://example.com/").unwrap())
            .with_header("Cache-Control", "no-cache");
        assert_eq!(request.header("cache-control"), Some("no-cache"));
        assert_eq!(request.header("pragma"), None);
    }

    #[test]
    fn test_mode_names() {
        let mode: RequestMode = serde_json::from_str("\"same-origin\"").unwrap();
        assert_eq!(mode, RequestMode::SameOrigin);
        let cache: CacheMode = serde_json::from_str("\"no-store\"").unwrap();
        assert_eq!(cache, CacheMode::NoStore);
        let destination: Destination = serde_json::from_str("\"font\"").unwrap();
        assert!(destination.is_static_asset());
        assert!(!Destination::Document.is_static_asset());
    }
}
