use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::capture::{USER_AGENT_HEADER, USER_AGENT_HEADER_TITLE};
use crate::derive::DerivedAttributes;
use crate::encode::Cell;

pub use crate::types::{AttributeName, UserAgent};

/// One raw capture: the request as seen on the wire plus the in-browser fingerprint.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCaptureRecord {
    /// Request-side view of the session.
    pub request_fingerprint: RequestFingerprint,
    /// Browser-side attribute map (`userAgent`, `screen`, `plugins`, ...), key order preserved.
    pub browser_fingerprint: Map<String, Value>,
}

/// Request headers and protocol version captured for one session.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestFingerprint {
    /// Raw header map in capture order.
    #[serde(default)]
    pub headers: IndexMap<String, String>,
    /// HTTP version string, e.g. `1.1` or `2.0`.
    pub http_version: String,
}

/// Screen dimensions read from a browser fingerprint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScreenSize {
    /// Width in CSS pixels.
    pub width: u64,
    /// Height in CSS pixels.
    pub height: u64,
}

impl RawCaptureRecord {
    /// User-agent reported by the request headers (`user-agent`, then `User-Agent`).
    pub fn header_user_agent(&self) -> Option<&str> {
        let headers = &self.request_fingerprint.headers;
        headers
            .get(USER_AGENT_HEADER)
            .or_else(|| headers.get(USER_AGENT_HEADER_TITLE))
            .map(String::as_str)
    }

    /// User-agent reported by the browser fingerprint.
    pub fn fingerprint_user_agent(&self) -> Option<&str> {
        self.browser_fingerprint
            .get("userAgent")
            .and_then(Value::as_str)
    }

    /// Screen width/height, when both are present as non-negative integers.
    pub fn screen_size(&self) -> Option<ScreenSize> {
        let screen = self.browser_fingerprint.get("screen")?;
        let width = screen.get("width").and_then(Value::as_u64)?;
        let height = screen.get("height").and_then(Value::as_u64)?;
        Some(ScreenSize { width, height })
    }
}

/// Which projection a build consumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildPath {
    /// Request headers plus the injected HTTP version node (input and header networks).
    Header,
    /// Browser fingerprint attributes (fingerprint network).
    Fingerprint,
}

/// A filtered record flattened onto a single attribute map.
#[derive(Clone, Debug)]
pub struct DeconstructedRecord {
    /// User-agent shared by both capture views.
    pub user_agent: UserAgent,
    /// Flat attribute map; header map or fingerprint map depending on `BuildPath`.
    pub attributes: IndexMap<AttributeName, Value>,
}

/// A record after value encoding, ready for schema reconciliation.
#[derive(Clone, Debug)]
pub struct PreparedRecord {
    /// Encoded attribute cells.
    pub cells: IndexMap<AttributeName, Cell>,
    /// Synthetic attributes (header and input paths only).
    pub derived: Option<DerivedAttributes>,
}
