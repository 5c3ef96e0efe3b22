//! CDP WebSocket client.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, trace, warn};

use crate::error::CdpError;
use crate::page::PageSession;
use crate::protocol::{BrowserVersion, CdpRequest, CdpResponse, Cookie, PageInfo};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub(crate) type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// One in-flight command waiting for its response.
pub(crate) struct PendingRequest {
    pub tx: oneshot::Sender<Result<Value, CdpError>>,
}

/// CDP client bound to one browser process.
///
/// Owns the WebSocket connection, correlates command responses by request
/// id, and exposes browser-level operations: page creation and the cookie
/// capture/restore that forms the session artifact.
pub struct CdpClient {
    /// HTTP endpoint for page creation.
    http_endpoint: String,
    /// WebSocket sender, shared with page sessions.
    ws_tx: Arc<tokio::sync::Mutex<WsSink>>,
    /// Request id counter, shared with page sessions.
    request_id: Arc<AtomicU64>,
    /// In-flight commands by request id.
    pending: Arc<Mutex<HashMap<u64, PendingRequest>>>,
    /// Background receive task.
    _recv_task: tokio::task::JoinHandle<()>,
}

impl CdpClient {
    /// Connect to a browser debugging endpoint (e.g. `http://127.0.0.1:9222`).
    pub async fn connect(endpoint: &str) -> Result<Self, CdpError> {
        let http_endpoint = endpoint.trim_end_matches('/').to_string();

        let version_url = format!("{http_endpoint}/json/version");
        debug!("fetching browser version from {version_url}");

        let version: BrowserVersion = reqwest::get(&version_url)
            .await
            .map_err(|e| CdpError::EndpointUnavailable(format!("{endpoint}: {e}")))?
            .json()
            .await
            .map_err(|e| CdpError::EndpointUnavailable(format!("{endpoint}: {e}")))?;

        debug!(browser = %version.browser, "connected to browser");

        let (ws_stream, _) =
            tokio_tungstenite::connect_async(version.web_socket_debugger_url.as_str())
                .await
                .map_err(|e| CdpError::WebSocket(e.to_string()))?;

        let (ws_sink, ws_source) = ws_stream.split();
        let ws_tx = Arc::new(tokio::sync::Mutex::new(ws_sink));
        let pending: Arc<Mutex<HashMap<u64, PendingRequest>>> =
            Arc::new(Mutex::new(HashMap::new()));

        let recv_task = {
            let pending = pending.clone();
            tokio::spawn(async move {
                Self::receive_loop(ws_source, pending).await;
            })
        };

        Ok(Self {
            http_endpoint,
            ws_tx,
            request_id: Arc::new(AtomicU64::new(1)),
            pending,
            _recv_task: recv_task,
        })
    }

    /// Route incoming messages to their waiting callers. Events are not
    /// consumed anywhere in this engine; page state is polled instead.
    async fn receive_loop(mut ws_source: WsSource, pending: Arc<Mutex<HashMap<u64, PendingRequest>>>) {
        while let Some(msg) = ws_source.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    match serde_json::from_str::<CdpResponse>(&text) {
                        Ok(response) => {
                            if let Some(id) = response.id {
                                let pending_request = pending.lock().remove(&id);
                                if let Some(request) = pending_request {
                                    let result = if let Some(error) = response.error {
                                        Err(CdpError::Protocol {
                                            code: error.code,
                                            message: error.message,
                                        })
                                    } else {
                                        Ok(response.result.unwrap_or(Value::Null))
                                    };
                                    let _ = request.tx.send(result);
                                }
                            } else if let Some(method) = response.method {
                                trace!(method, "ignoring CDP event");
                            }
                        }
                        Err(e) => {
                            warn!("failed to parse CDP message: {e}");
                        }
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!("CDP WebSocket closed");
                    break;
                }
                Err(e) => {
                    error!("CDP WebSocket error: {e}");
                    break;
                }
                _ => {}
            }
        }
    }

    /// Send a browser-level CDP command and wait for its response.
    pub(crate) async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);

        let request = CdpRequest {
            id,
            method: method.to_string(),
            params,
            session_id: None,
        };

        let json = serde_json::to_string(&request)?;
        trace!("CDP send: {json}");

        let (tx, rx) = oneshot::channel();
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

    /// Open a new page, optionally at a URL, and attach a session to it.
    pub async fn new_page(&self, url: Option<&str>) -> Result<PageSession, CdpError> {
        // Chrome requires PUT for /json/new
        let create_url = match url {
            Some(u) => format!("{}/json/new?{u}", self.http_endpoint),
            None => format!("{}/json/new", self.http_endpoint),
        };

        let client = reqwest::Client::new();
        let page_info: PageInfo = client.put(&create_url).send().await?.json().await?;
        debug!(target_id = %page_info.id, url = %page_info.url, "created page");

        let result = self
            .call(
                "Target.attachToTarget",
                Some(json!({
                    "targetId": page_info.id,
                    "flatten": true
                })),
            )
            .await?;

        let session_id = result["sessionId"]
            .as_str()
            .ok_or_else(|| CdpError::InvalidResponse("missing sessionId".to_string()))?
            .to_string();

        let session = PageSession::new(
            page_info.id,
            session_id,
            self.ws_tx.clone(),
            self.pending.clone(),
            self.request_id.clone(),
        );

        session.enable_domains().await?;

        Ok(session)
    }

    /// Close a page.
    pub async fn close_page(&self, target_id: &str) -> Result<(), CdpError> {
        self.call("Target.closeTarget", Some(json!({"targetId": target_id})))
            .await?;
        Ok(())
    }

    /// Capture all cookies from the browser.
    pub async fn get_cookies(&self) -> Result<Vec<Cookie>, CdpError> {
        let result = self.call("Storage.getCookies", None).await?;
        let cookies: Vec<Cookie> = serde_json::from_value(result["cookies"].clone())?;
        Ok(cookies)
    }

    /// Restore a captured cookie set into the browser.
    pub async fn set_cookies(&self, cookies: &[Cookie]) -> Result<(), CdpError> {
        self.call("Storage.setCookies", Some(json!({"cookies": cookies})))
            .await?;
        debug!(count = cookies.len(), "restored cookies");
        Ok(())
    }
}

impl Drop for CdpClient {
    fn drop(&mut self) {
        self._recv_task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_increment() {
        let id = AtomicU64::new(1);
        assert_eq!(id.fetch_add(1, Ordering::SeqCst), 1);
        assert_eq!(id.fetch_add(1, Ordering::SeqCst), 2);
        assert_eq!(id.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Nothing listens on this port; discovery must fail cleanly.
        let result = CdpClient::connect("http://127.0.0.1:1").await;
        assert!(matches!(result, Err(CdpError::EndpointUnavailable(_))));
    }
}
