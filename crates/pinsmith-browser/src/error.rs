//! CDP error types.

use thiserror::Error;

/// Errors from the CDP layer.
#[derive(Debug, Error)]
pub enum CdpError {
    /// Chrome executable could not be located.
    #[error("chrome executable not found; set [browser].chrome_path or install Chrome")]
    ChromeNotFound,

    /// Chrome failed to start.
    #[error("failed to launch chrome: {0}")]
    LaunchFailed(String),

    /// The debugging endpoint never became reachable.
    #[error("browser endpoint not reachable: {0}")]
    EndpointUnavailable(String),

    /// WebSocket transport failure.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Error reported by the protocol itself.
    #[error("CDP error: {message} (code {code})")]
    Protocol { code: i64, message: String },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error during endpoint discovery or page creation.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Navigation failed.
    #[error("navigation failed: {0}")]
    NavigationFailed(String),

    /// No element matched a selector.
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// JavaScript evaluation raised.
    #[error("JavaScript error: {0}")]
    JavaScript(String),

    /// A bounded wait expired.
    #[error("timeout: {0}")]
    Timeout(String),

    /// The browser connection was dropped.
    #[error("session closed")]
    SessionClosed,

    /// Response shape did not match the protocol.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for CdpError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        CdpError::WebSocket(e.to_string())
    }
}

impl From<reqwest::Error> for CdpError {
    fn from(e: reqwest::Error) -> Self {
        CdpError::Http(e.to_string())
    }
}
