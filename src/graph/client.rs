//! Gremlin WebSocket client
//!
//! Speaks the TinkerPop driver protocol with GraphSON 2.0 serialization.
//! Requests go out as binary frames prefixed with their MIME type. The server
//! answers with one or more JSON response messages per request id. A 407
//! status asks for SASL PLAIN credentials before the script runs.

use crate::config::GraphConfig;
use crate::graph::graphson::result_items;
use crate::graph::{EntityGraph, GraphError, GraphResult};
use async_trait::async_trait;
use base64::Engine;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const GRAPHSON_V2_MIME: &str = "application/vnd.gremlin-v2.0+json";

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Driver request message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMessage {
    pub request_id: String,
    pub op: String,
    pub processor: String,
    pub args: Value,
}

impl RequestMessage {
    pub fn eval(gremlin: &str) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            op: "eval".to_string(),
            processor: String::new(),
            args: json!({
                "gremlin": gremlin,
                "bindings": {},
                "language": "gremlin-groovy",
            }),
        }
    }

    /// SASL answer to a 407 challenge; reuses the challenged request's id.
    pub fn authentication(request_id: &str, sasl: &str) -> Self {
        Self {
            request_id: request_id.to_string(),
            op: "authentication".to_string(),
            processor: String::new(),
            args: json!({
                "sasl": sasl,
                "saslMechanism": "PLAIN",
            }),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseStatus {
    pub code: u16,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseResult {
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMessage {
    #[serde(default)]
    pub request_id: Option<String>,
    pub status: ResponseStatus,
    #[serde(default)]
    pub result: ResponseResult,
}

/// `base64("\0" + username + "\0" + password)`
pub fn sasl_plain(username: &str, password: &str) -> String {
    let mut raw = Vec::with_capacity(username.len() + password.len() + 2);
    raw.push(0);
    raw.extend_from_slice(username.as_bytes());
    raw.push(0);
    raw.extend_from_slice(password.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(raw)
}

/// Frame a request: MIME length byte, MIME type, JSON body.
pub fn encode_request(request: &RequestMessage) -> GraphResult<Vec<u8>> {
    let body = serde_json::to_vec(request)?;
    let mut frame = Vec::with_capacity(1 + GRAPHSON_V2_MIME.len() + body.len());
    frame.push(GRAPHSON_V2_MIME.len() as u8);
    frame.extend_from_slice(GRAPHSON_V2_MIME.as_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

pub fn decode_response(payload: &[u8]) -> GraphResult<ResponseMessage> {
    serde_json::from_slice(payload).map_err(|e| GraphError::Protocol(format!("bad response frame: {}", e)))
}

/// Outcome of feeding one response into an [`Exchange`]
#[derive(Debug)]
pub enum Step {
    /// More frames follow
    Pending,
    /// Send these credentials, then keep reading
    Authenticate(RequestMessage),
    Complete(Vec<Value>),
}

/// Response accumulation for one request id
#[derive(Debug)]
pub struct Exchange {
    request_id: String,
    sasl: String,
    authenticated: bool,
    items: Vec<Value>,
}

impl Exchange {
    pub fn new(request_id: &str, sasl: String) -> Self {
        Self {
            request_id: request_id.to_string(),
            sasl,
            authenticated: false,
            items: Vec::new(),
        }
    }

    pub fn on_response(&mut self, response: ResponseMessage) -> GraphResult<Step> {
        if let Some(id) = &response.request_id {
            if id != &self.request_id {
                debug!("Ignoring response for request {}", id);
                return Ok(Step::Pending);
            }
        }

        match response.status.code {
            200 => {
                self.items.extend(result_items(response.result.data));
                Ok(Step::Complete(std::mem::take(&mut self.items)))
            }
            204 => Ok(Step::Complete(std::mem::take(&mut self.items))),
            206 => {
                self.items.extend(result_items(response.result.data));
                Ok(Step::Pending)
            }
            407 if !self.authenticated => {
                self.authenticated = true;
                Ok(Step::Authenticate(RequestMessage::authentication(&self.request_id, &self.sasl)))
            }
            401 | 407 => Err(GraphError::Authentication(response.status.message)),
            code => Err(GraphError::Server {
                code,
                message: response.status.message,
            }),
        }
    }
}

fn connection_error(e: impl std::fmt::Display) -> GraphError {
    GraphError::Connection(e.to_string())
}

/// Client for a hosted Gremlin endpoint. One socket is opened lazily and reused.
pub struct GremlinClient {
    url: String,
    sasl: String,
    timeout: Duration,
    socket: Mutex<Option<Socket>>,
}

impl GremlinClient {
    pub fn new(config: &GraphConfig) -> Self {
        Self {
            url: config.url(),
            sasl: sasl_plain(&config.username(), &config.password),
            timeout: Duration::from_secs(30),
            socket: Mutex::new(None),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Point at a different endpoint, e.g. a local `ws://` server.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn connect(&self) -> GraphResult<Socket> {
        let (socket, _) = connect_async(self.url.as_str()).await.map_err(connection_error)?;
        info!("Connected to graph at {}", self.url);
        Ok(socket)
    }

    async fn exchange(&self, socket: &mut Socket, gremlin: &str) -> GraphResult<Vec<Value>> {
        let request = RequestMessage::eval(gremlin);
        let mut exchange = Exchange::new(&request.request_id, self.sasl.clone());
        socket
            .send(Message::Binary(encode_request(&request)?))
            .await
            .map_err(connection_error)?;

        while let Some(frame) = socket.next().await {
            let payload = match frame.map_err(connection_error)? {
                Message::Binary(bytes) => bytes,
                Message::Text(text) => text.into_bytes(),
                Message::Close(_) => {
                    return Err(GraphError::Connection("server closed the connection".to_string()))
                }
                _ => continue,
            };

            match exchange.on_response(decode_response(&payload)?)? {
                Step::Pending => {}
                Step::Authenticate(auth) => {
                    debug!("Answering SASL challenge");
                    socket
                        .send(Message::Binary(encode_request(&auth)?))
                        .await
                        .map_err(connection_error)?;
                }
                Step::Complete(items) => return Ok(items),
            }
        }

        Err(GraphError::Connection("connection closed mid-response".to_string()))
    }
}

#[async_trait]
impl EntityGraph for GremlinClient {
    async fn submit(&self, gremlin: &str) -> GraphResult<Vec<Value>> {
        let mut guard = self.socket.lock().await;
        if guard.is_none() {
            let socket = tokio::time::timeout(self.timeout, self.connect())
                .await
                .map_err(|_| GraphError::Connection(format!("no connection within {:?}", self.timeout)))??;
            *guard = Some(socket);
        }
        let Some(socket) = guard.as_mut() else {
            return Err(GraphError::Connection("not connected".to_string()));
        };

        let result = match tokio::time::timeout(self.timeout, self.exchange(socket, gremlin)).await {
            Ok(result) => result,
            Err(_) => Err(GraphError::Connection(format!("no response within {:?}", self.timeout))),
        };

        // A half-read socket cannot be reused
        if matches!(result, Err(GraphError::Connection(_)) | Err(GraphError::Protocol(_))) {
            warn!("Dropping graph connection after error");
            *guard = None;
        }
        result
    }
}
