//! Control messages posted by the host application.

use serde::{Deserialize, Serialize};

/// A recognized control message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    /// Activate without waiting for existing clients to go away.
    #[serde(rename = "SKIP_WAITING")]
    SkipWaiting,

    /// Fetch and store each URL in the live store, best effort.
    #[serde(rename = "CACHE_URLS")]
    CacheUrls { urls: Vec<String> },
}

impl ControlMessage {
    /// Parse a raw payload. Anything unrecognized yields None.
    pub fn parse(payload: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(payload.clone()).ok()
    }
}

/// Per-URL result of a bulk pre-cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct PrecacheReport {
    pub cached: Vec<String>,
    pub failed: Vec<PrecacheFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct PrecacheFailure {
    pub url: String,
    pub reason: String,
}

/// What handling a message did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MessageOutcome {
    /// Unrecognized or malformed payload.
    Ignored,
    /// Skip-waiting applied; stores removed during activation.
    Activated { deleted: Vec<String> },
    /// Skip-waiting recorded; activation follows once install completes.
    SkipWaitingPending,
    Precached(PrecacheReport),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_skip_waiting() {
        let message = ControlMessage::parse(&json!({ "type": "SKIP_WAITING" }));
        assert_eq!(message, Some(ControlMessage::SkipWaiting));
    }

    #[test]
    fn test_parse_cache_urls() {
        let message = ControlMessage::parse(&json!({ "type": "CACHE_URLS", "urls": ["/a.js", "/b.css"] }));
        assert_eq!(message, Some(ControlMessage::CacheUrls { urls: vec!["/a.js".into(), "/b.css".into()] }));
    }

    #[test]
    fn test_parse_malformed() {
        assert_eq!(ControlMessage::parse(&json!({ "type": "RELOAD" })), None);
        assert_eq!(ControlMessage::parse(&json!({ "type": "CACHE_URLS" })), None);
        assert_eq!(ControlMessage::parse(&json!({ "type": "CACHE_URLS", "urls": "/a.js" })), None);
        assert_eq!(ControlMessage::parse(&json!("SKIP_WAITING")), None);
        assert_eq!(ControlMessage::parse(&json!(null)), None);
    }

    #[test]
    fn test_outcome_serialization() {
        let value = serde_json::to_value(MessageOutcome::Ignored).unwrap();
        assert_eq!(value, json!({ "outcome": "ignored" }));

        let value = serde_json::to_value(MessageOutcome::Activated { deleted: vec!["v1".into()] }).unwrap();
        assert_eq!(value, json!({ "outcome": "activated", "deleted": ["v1"] }));
    }
}
