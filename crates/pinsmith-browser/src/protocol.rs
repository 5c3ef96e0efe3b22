//! CDP wire types and the serialized session artifact.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outgoing CDP command.
#[derive(Debug, Serialize)]
pub(crate) struct CdpRequest {
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Incoming CDP message: either a response to a command or an event.
#[derive(Debug, Deserialize)]
pub(crate) struct CdpResponse {
    pub id: Option<u64>,
    pub result: Option<Value>,
    pub error: Option<CdpErrorPayload>,
    pub method: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CdpErrorPayload {
    pub code: i64,
    pub message: String,
}

/// `/json/version` payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BrowserVersion {
    #[serde(default)]
    pub browser: String,
    pub web_socket_debugger_url: String,
}

/// `/json/new` and `/json/list` page descriptor.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PageInfo {
    pub id: String,
    #[serde(default)]
    pub url: String,
}

/// Content quad of an element, as returned by `DOM.getBoxModel`.
#[derive(Debug, Deserialize)]
pub(crate) struct BoxModel {
    pub content: Vec<f64>,
}

/// One browser cookie.
///
/// Only the fields `Storage.setCookies` accepts back are kept, so a
/// captured set can be restored verbatim; everything else Chrome reports
/// is dropped on deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    /// Seconds since epoch; `-1.0` marks a session cookie.
    #[serde(default = "session_expiry")]
    pub expires: f64,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
}

fn session_expiry() -> f64 {
    -1.0
}

/// Serialized authenticated browser state — the session artifact.
///
/// Captured after a successful login, persisted as an opaque blob, and
/// restored into a fresh browser before every publish. Contains bearer
/// material.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StorageState {
    pub cookies: Vec<Cookie>,
}

impl StorageState {
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}
