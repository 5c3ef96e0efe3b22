//! CDP session attached to a single page.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use futures::SinkExt;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace};

use crate::client::{PendingRequest, WsSink};
use crate::error::CdpError;
use crate::protocol::{BoxModel, CdpRequest};

const CALL_TIMEOUT: Duration = Duration::from_secs(30);
const LOAD_POLL_INTERVAL: Duration = Duration::from_millis(100);
const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A session attached to a single page target.
///
/// All waits are cooperative polls: each step blocks until its
/// precondition holds or its bound expires. A `None` timeout on
/// [`PageSession::wait_for_selector`] waits indefinitely — reserved for
/// flows that are unbounded by design.
pub struct PageSession {
    target_id: String,
    session_id: String,
    /// WebSocket sender, shared with the client.
    ws_tx: Arc<tokio::sync::Mutex<WsSink>>,
    /// In-flight commands, shared with the client.
    pending: Arc<Mutex<HashMap<u64, PendingRequest>>>,
    /// Request id counter, shared with the client.
    request_id: Arc<AtomicU64>,
}

impl PageSession {
    pub(crate) fn new(
        target_id: String,
        session_id: String,
        ws_tx: Arc<tokio::sync::Mutex<WsSink>>,
        pending: Arc<Mutex<HashMap<u64, PendingRequest>>>,
        request_id: Arc<AtomicU64>,
    ) -> Self {
        Self {
            target_id,
            session_id,
            ws_tx,
            pending,
            request_id,
        }
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    /// Send a CDP command scoped to this page.
    pub(crate) async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);

        let request = CdpRequest {
            id,
            method: method.to_string(),
            params,
            session_id: Some(self.session_id.clone()),
        };

        let json = serde_json::to_string(&request)?;
        trace!("CDP session send: {json}");

        let (tx, rx) = tokio::sync::oneshot::channel();
        self.pending.lock().insert(id, PendingRequest { tx });

        {
            let mut ws = self.ws_tx.lock().await;
            ws.send(Message::Text(json.into())).await?;
        }

        match tokio::time::timeout(CALL_TIMEOUT, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(CdpError::SessionClosed),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(CdpError::Timeout(format!("request {method} timed out")))
            }
        }
    }

    pub(crate) async fn enable_domains(&self) -> Result<(), CdpError> {
        self.call("Page.enable", None).await?;
        self.call("DOM.enable", None).await?;
        self.call("Runtime.enable", None).await?;
        debug!(session_id = %self.session_id, "enabled CDP domains");
        Ok(())
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Navigate and wait for the document to load, bounded by `timeout`.
    pub async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), CdpError> {
        let result = self.call("Page.navigate", Some(json!({"url": url}))).await?;

        if let Some(error) = result.get("errorText").and_then(Value::as_str) {
            if !error.is_empty() {
                return Err(CdpError::NavigationFailed(error.to_string()));
            }
        }

        self.wait_for_load(timeout).await?;
        debug!(url, "navigated");
        Ok(())
    }

    /// Poll `document.readyState` until the page is usable.
    pub async fn wait_for_load(&self, timeout: Duration) -> Result<(), CdpError> {
        let start = Instant::now();
        loop {
            let state = self.evaluate("document.readyState").await?;
            if let Some(state) = state.as_str() {
                if state == "complete" || state == "interactive" {
                    return Ok(());
                }
            }
            if start.elapsed() > timeout {
                return Err(CdpError::Timeout("page load timed out".to_string()));
            }
            tokio::time::sleep(LOAD_POLL_INTERVAL).await;
        }
    }

    /// Address the page currently shows.
    pub async fn current_url(&self) -> Result<String, CdpError> {
        let result = self.evaluate("window.location.href").await?;
        Ok(result.as_str().unwrap_or_default().to_string())
    }

    // ========================================================================
    // JavaScript
    // ========================================================================

    /// Evaluate an expression and return its value.
    pub async fn evaluate(&self, expression: &str) -> Result<Value, CdpError> {
        let result = self
            .call(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                })),
            )
            .await?;

        if let Some(exception) = result.get("exceptionDetails") {
            let text = exception["text"].as_str().unwrap_or("unknown error");
            return Err(CdpError::JavaScript(text.to_string()));
        }

        Ok(result["result"]["value"].clone())
    }

    // ========================================================================
    // DOM queries
    // ========================================================================

    /// Node id of the first element matching the selector, if any.
    pub async fn query_selector(&self, selector: &str) -> Result<Option<i64>, CdpError> {
        let doc = self.call("DOM.getDocument", Some(json!({"depth": 0}))).await?;
        let root_id = doc["root"]["nodeId"]
            .as_i64()
            .ok_or_else(|| CdpError::InvalidResponse("missing document root".to_string()))?;

        let result = self
            .call(
                "DOM.querySelector",
                Some(json!({"nodeId": root_id, "selector": selector})),
            )
            .await?;

        match result["nodeId"].as_i64() {
            Some(0) | None => Ok(None),
            Some(node_id) => Ok(Some(node_id)),
        }
    }

    /// Wait for a selector to appear. `None` waits indefinitely.
    pub async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Option<Duration>,
    ) -> Result<i64, CdpError> {
        let start = Instant::now();
        loop {
            if let Some(node_id) = self.query_selector(selector).await? {
                return Ok(node_id);
            }
            if let Some(timeout) = timeout {
                if start.elapsed() > timeout {
                    return Err(CdpError::Timeout(format!(
                        "waiting for selector {selector:?} timed out"
                    )));
                }
            }
            tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }

    async fn box_model(&self, node_id: i64) -> Result<Option<BoxModel>, CdpError> {
        let result = self
            .call("DOM.getBoxModel", Some(json!({"nodeId": node_id})))
            .await;
        match result {
            Ok(value) => {
                let model: BoxModel = serde_json::from_value(value["model"].clone())?;
                Ok(Some(model))
            }
            // Node exists but has no layout (hidden or detached)
            Err(CdpError::Protocol { code: -32000, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    // ========================================================================
    // Interaction
    // ========================================================================

    /// Click the center of the element matching the selector.
    pub async fn click_selector(&self, selector: &str) -> Result<(), CdpError> {
        let node_id = self
            .query_selector(selector)
            .await?
            .ok_or_else(|| CdpError::ElementNotFound(selector.to_string()))?;

        let model = self
            .box_model(node_id)
            .await?
            .ok_or_else(|| CdpError::ElementNotFound(format!("{selector} (not visible)")))?;

        let (x, y) = quad_center(&model.content);
        self.click(x, y).await
    }

    /// Click at page coordinates.
    pub async fn click(&self, x: f64, y: f64) -> Result<(), CdpError> {
        for event_type in ["mousePressed", "mouseReleased"] {
            self.call(
                "Input.dispatchMouseEvent",
                Some(json!({
                    "type": event_type,
                    "x": x,
                    "y": y,
                    "button": "left",
                    "clickCount": 1,
                })),
            )
            .await?;
        }
        debug!(x, y, "clicked");
        Ok(())
    }

    /// Fill a field: focus, select existing content, insert the value.
    pub async fn fill(&self, selector: &str, value: &str) -> Result<(), CdpError> {
        let node_id = self
            .query_selector(selector)
            .await?
            .ok_or_else(|| CdpError::ElementNotFound(selector.to_string()))?;

        self.call("DOM.focus", Some(json!({"nodeId": node_id}))).await?;
        self.press_key_combo("Control+a").await?;
        self.type_text(value).await?;
        debug!(selector, chars = value.len(), "filled");
        Ok(())
    }

    /// Type text into the focused element.
    pub async fn type_text(&self, text: &str) -> Result<(), CdpError> {
        self.call("Input.insertText", Some(json!({"text": text})))
            .await?;
        Ok(())
    }

    /// Press a single key.
    pub async fn press_key(&self, key: &str) -> Result<(), CdpError> {
        for event_type in ["keyDown", "keyUp"] {
            self.call(
                "Input.dispatchKeyEvent",
                Some(json!({"type": event_type, "key": key})),
            )
            .await?;
        }
        Ok(())
    }

    /// Press a key combination such as `Control+a`.
    pub async fn press_key_combo(&self, combo: &str) -> Result<(), CdpError> {
        let parts: Vec<&str> = combo.split('+').collect();
        let modifiers = key_modifiers(&parts[..parts.len().saturating_sub(1)]);
        let key = parts.last().copied().unwrap_or_default();

        for event_type in ["keyDown", "keyUp"] {
            self.call(
                "Input.dispatchKeyEvent",
                Some(json!({"type": event_type, "key": key, "modifiers": modifiers})),
            )
            .await?;
        }
        Ok(())
    }

    /// Hand a local file to a file input, bypassing the system dialog.
    pub async fn set_file_input(&self, selector: &str, path: &str) -> Result<(), CdpError> {
        let node_id = self
            .query_selector(selector)
            .await?
            .ok_or_else(|| CdpError::ElementNotFound(selector.to_string()))?;

        self.call(
            "DOM.setFileInputFiles",
            Some(json!({"nodeId": node_id, "files": [path]})),
        )
        .await?;
        debug!(selector, path, "file attached to input");
        Ok(())
    }
}

/// Center point of a content quad.
fn quad_center(quad: &[f64]) -> (f64, f64) {
    if quad.len() >= 8 {
        let x = (quad[0] + quad[2] + quad[4] + quad[6]) / 4.0;
        let y = (quad[1] + quad[3] + quad[5] + quad[7]) / 4.0;
        (x, y)
    } else {
        (0.0, 0.0)
    }
}

/// CDP modifier bitmask from modifier names.
fn key_modifiers(modifiers: &[&str]) -> i32 {
    let mut flags = 0;
    for modifier in modifiers {
        match modifier.to_lowercase().as_str() {
            "alt" => flags |= 1,
            "control" | "ctrl" => flags |= 2,
            "meta" | "command" | "cmd" => flags |= 4,
            "shift" => flags |= 8,
            _ => {}
        }
    }
    flags
}
