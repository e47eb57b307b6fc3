//! Resolving manifest entries and request URLs to cache-key form.

/// Why a URL cannot be fetched or used as a cache key.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Resolve a manifest path or message URL against the application origin.
///
/// Paths are joined onto `origin`; absolute URLs replace it. Only http and
/// https are accepted. The fragment is dropped since it never reaches the
/// network and must not split one resource across two keys. The query is
/// kept verbatim.
pub fn resolve(origin: &url::Url, input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut url = origin.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(UrlError::UnsupportedScheme(url.scheme().to_string()));
    }
    if url.host_str().is_none() {
        return Err(UrlError::InvalidUrl(format!("{url}: missing host")));
    }

    url.set_fragment(None);
    Ok(url)
}
