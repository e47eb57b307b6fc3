//! Request classification.
//!
//! Maps every request to exactly one [`RequestClass`]. Rules are checked in
//! order and the first match wins:
//!
//! 1. non-GET method → bypass
//! 2. path under the serverless functions namespace → bypass
//! 3. request asks to skip the cache → bypass
//! 4. navigation → bypass
//! 5. backend data-store host → backend (network only)
//! 6. any other cross-origin host → bypass
//! 7. script/style/image/font → static asset (cache first)
//! 8. everything else → default (network first)

use offcache_core::{AppConfig, Error};
use reqwest::Method;
use serde::Serialize;
use url::Url;

use crate::request::{CacheMode, RequestDescriptor, RequestMode};

/// Why a request was not intercepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BypassReason {
    NonGet,
    Functions,
    NoCache,
    Navigation,
    CrossOrigin,
}

/// Caching strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestClass {
    Bypass(BypassReason),
    Backend,
    StaticAsset,
    Default,
}

/// The parts of the deployment a request is classified against.
#[derive(Debug, Clone)]
pub struct Scope {
    pub origin: Url,
    pub functions_prefix: String,
    pub backend_host: String,
}

impl Scope {
    pub fn new(origin: Url, functions_prefix: impl Into<String>, backend_host: impl Into<String>) -> Self {
        Self { origin, functions_prefix: functions_prefix.into(), backend_host: backend_host.into().to_lowercase() }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self::new(origin, config.functions_prefix.clone(), config.backend_host.clone()))
    }

    pub fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.origin.origin()
    }

    pub fn is_backend(&self, url: &Url) -> bool {
        url.host_str()
            .map(|host| {
                let host = host.to_lowercase();
                host == self.backend_host
                    || host
                        .strip_suffix(self.backend_host.as_str())
                        .is_some_and(|prefix| prefix.ends_with('.'))
            })
            .unwrap_or(false)
    }

    fn is_functions_path(&self, url: &Url) -> bool {
        let prefix = self.functions_prefix.trim_end_matches('/');
        let path = url.path();
        path == prefix || path.starts_with(&format!("{prefix}/"))
    }
}

fn directive_present(value: &str, wanted: &[&str]) -> bool {
    value.split(',').any(|directive| {
        let name = directive.split('=').next().unwrap_or("").trim();
        wanted.iter().any(|w| name.eq_ignore_ascii_case(w))
    })
}

fn skips_cache(request: &RequestDescriptor) -> bool {
    if matches!(request.cache, CacheMode::Reload | CacheMode::NoStore) {
        return true;
    }
    if request
        .header("cache-control")
        .is_some_and(|v| directive_present(v, &["no-cache", "no-store"]))
    {
        return true;
    }
    request.header("pragma").is_some_and(|v| directive_present(v, &["no-cache"]))
}

/// Classify a request against the deployment scope.
pub fn classify(request: &RequestDescriptor, scope: &Scope) -> RequestClass {
    if request.method != Method::GET {
        return RequestClass::Bypass(BypassReason::NonGet);
    }
    if scope.is_functions_path(&request.url) {
        return RequestClass::Bypass(BypassReason::Functions);
    }
    if skips_cache(request) {
        return RequestClass::Bypass(BypassReason::NoCache);
    }
    if request.mode == RequestMode::Navigate {
        return RequestClass::Bypass(BypassReason::Navigation);
    }
    if !scope.is_same_origin(&request.url) {
        if scope.is_backend(&request.url) {
            return RequestClass::Backend;
        }
        return RequestClass::Bypass(BypassReason::CrossOrigin);
    }
    if request.destination.is_static_asset() {
        return RequestClass::StaticAsset;
    }
    RequestClass::Default
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Destination;

    fn scope() -> Scope {
        Scope::new(Url::parse("https://planner.example.com").unwrap(), "/.netlify/functions/", "supabase.co")
    }

    fn get(url: &str) -> RequestDescriptor {
        RequestDescriptor::get(Url::parse(url).unwrap())
    }

    #[test]
    fn test_non_get_bypasses() {
        let request = get("https://planner.example.com/app.js")
            .with_method(Method::POST)
            .with_destination(Destination::Script);
        assert_eq!(classify(&request, &scope()), RequestClass::Bypass(BypassReason::NonGet));
    }

    #[test]
    fn test_functions_namespace_bypasses() {
        let request = get("https://planner.example.com/.netlify/functions/generate-pdf");
        assert_eq!(classify(&request, &scope()), RequestClass::Bypass(BypassReason::Functions));

        let request = get("https://planner.example.com/.netlify/functions-other/x");
        assert_eq!(classify(&request, &scope()), RequestClass::Default);
    }

    #[test]
    fn test_cache_mode_bypasses() {
        let request = get("https://planner.example.com/app.css").with_cache(CacheMode::Reload);
        assert_eq!(classify(&request, &scope()), RequestClass::Bypass(BypassReason::NoCache));

        let request = get("https://planner.example.com/app.css").with_cache(CacheMode::NoStore);
        assert_eq!(classify(&request, &scope()), RequestClass::Bypass(BypassReason::NoCache));

        let request = get("https://planner.example.com/app.css").with_cache(CacheMode::ForceCache);
        assert_eq!(classify(&request, &scope()), RequestClass::Default);
    }

    #[test]
    fn test_no_cache_headers_bypass() {
        let request = get("https://planner.example.com/data").with_header("Cache-Control", "max-age=0, no-store");
        assert_eq!(classify(&request, &scope()), RequestClass::Bypass(BypassReason::NoCache));

        let request = get("https://planner.example.com/data").with_header("Pragma", "no-cache");
        assert_eq!(classify(&request, &scope()), RequestClass::Bypass(BypassReason::NoCache));

        let request = get("https://planner.example.com/data").with_header("Cache-Control", "max-age=60");
        assert_eq!(classify(&request, &scope()), RequestClass::Default);
    }

    #[test]
    fn test_navigation_bypasses() {
        let request = get("https://planner.example.com/lessons/12")
            .with_mode(RequestMode::Navigate)
            .with_destination(Destination::Document);
        assert_eq!(classify(&request, &scope()), RequestClass::Bypass(BypassReason::Navigation));
    }

    #[test]
    fn test_functions_rule_precedes_navigation() {
        let request = get("https://planner.example.com/.netlify/functions/upload").with_mode(RequestMode::Navigate);
        assert_eq!(classify(&request, &scope()), RequestClass::Bypass(BypassReason::Functions));
    }

    #[test]
    fn test_backend_host() {
        let request = get("https://abcd1234.supabase.co/rest/v1/lessons?select=*");
        assert_eq!(classify(&request, &scope()), RequestClass::Backend);

        let request = get("https://supabase.co/rest/v1/lessons");
        assert_eq!(classify(&request, &scope()), RequestClass::Backend);

        let request = get("https://notsupabase.co/rest/v1/lessons");
        assert_eq!(classify(&request, &scope()), RequestClass::Bypass(BypassReason::CrossOrigin));
    }

    #[test]
    fn test_other_cross_origin_bypasses() {
        let request = get("https://fonts.gstatic.com/s/roboto.woff2").with_destination(Destination::Font);
        assert_eq!(classify(&request, &scope()), RequestClass::Bypass(BypassReason::CrossOrigin));

        let request = get("http://planner.example.com/app.js").with_destination(Destination::Script);
        assert_eq!(classify(&request, &scope()), RequestClass::Bypass(BypassReason::CrossOrigin));
    }

    #[test]
    fn test_static_assets() {
        for destination in [Destination::Script, Destination::Style, Destination::Image, Destination::Font] {
            let request = get("https://planner.example.com/assets/x").with_destination(destination);
            assert_eq!(classify(&request, &scope()), RequestClass::StaticAsset);
        }
    }

    #[test]
    fn test_default_class() {
        let request = get("https://planner.example.com/manifest.json").with_destination(Destination::Manifest);
        assert_eq!(classify(&request, &scope()), RequestClass::Default);

        let request = get("https://planner.example.com/api/data.json");
        assert_eq!(classify(&request, &scope()), RequestClass::Default);
    }

    #[test]
    fn test_scope_from_config() {
        let scope = Scope::from_config(&AppConfig::default()).unwrap();
        assert!(scope.is_same_origin(&Url::parse("http://localhost:8888/index.html").unwrap()));
        assert!(!scope.is_same_origin(&Url::parse("http://localhost:9999/index.html").unwrap()));
    }
}
