//! SSE transport implementation.
//!
//! Server-Sent Events transport: clients open a long-lived event stream with
//! `GET /sse` and send JSON-RPC requests to the companion `POST /messages`
//! endpoint. The first event on the stream is an `endpoint` event naming the
//! message endpoint (with the session id baked into the query string); every
//! response is pushed to the session's stream as a `message` event, and the
//! POST itself is acknowledged with `202 Accepted`.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, mpsc};
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{TransportError, TransportResult, config::SseConfig};
use crate::core::McpServer;

/// SSE transport handler.
pub struct SseTransport {
    config: SseConfig,
}

/// JSON-RPC request structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<serde_json::Value>,
}

/// JSON-RPC response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcResponse {
    /// Create a success response.
    pub fn success(id: Option<serde_json::Value>, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: Option<serde_json::Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    /// Method not found error.
    pub fn method_not_found(id: Option<serde_json::Value>) -> Self {
        Self::error(id, -32601, "Method not found")
    }

    /// Invalid request error.
    pub fn invalid_request(id: Option<serde_json::Value>) -> Self {
        Self::error(id, -32600, "Invalid Request")
    }

    /// Invalid params error.
    pub fn invalid_params(id: Option<serde_json::Value>, msg: impl Into<String>) -> Self {
        Self::error(id, -32602, msg)
    }

    /// Internal error.
    pub fn internal_error(id: Option<serde_json::Value>, msg: impl Into<String>) -> Self {
        Self::error(id, -32603, msg)
    }
}

/// A connected SSE session.
struct Session {
    /// Sender half of the session's event stream.
    tx: mpsc::Sender<Result<Event, Infallible>>,

    /// Whether the client completed the initialize handshake.
    #[allow(dead_code)]
    initialized: bool,
}

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    /// The MCP server instance.
    server: McpServer,

    /// Transport configuration (for the advertised message endpoint).
    config: Arc<SseConfig>,

    /// Connected sessions by id.
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
}

/// Query parameters for the message endpoint.
#[derive(Debug, Deserialize)]
struct MessageQuery {
    session_id: Uuid,
}

impl SseTransport {
    /// Create a new SSE transport with the given config.
    pub fn new(config: SseConfig) -> Self {
        Self { config }
    }

    /// Get the bind address.
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Run the SSE transport.
    pub async fn run(self, server: McpServer) -> TransportResult<()> {
        let addr = self.address();

        let state = AppState {
            server,
            config: Arc::new(self.config.clone()),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        };

        // Build router
        let mut app = Router::new()
            .route(&self.config.sse_path, get(handle_sse))
            .route(&self.config.message_path, post(handle_message))
            .route("/health", get(health_check))
            .route("/", get(root_handler))
            .with_state(state);

        // Add CORS if enabled
        if self.config.enable_cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            app = app.layer(cors);
        }

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| TransportError::bind(&addr, e))?;

        let cors_status = if self.config.enable_cors {
            "enabled"
        } else {
            "disabled"
        };
        info!("Ready - listening on {} (SSE, CORS {})", addr, cors_status);
        info!("  → Events:   GET  {}", self.config.sse_path);
        info!("  → Messages: POST {}", self.config.message_path);
        info!("  → Health:   GET  /health");

        axum::serve(listener, app)
            .await
            .map_err(|e| TransportError::http(e.to_string()))?;

        Ok(())
    }
}

/// Root handler - provides API info.
async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "name": state.server.name(),
        "version": state.server.version(),
        "transport": "SSE",
        "endpoints": {
            "events": state.config.sse_path,
            "messages": state.config.message_path,
            "health": "/health"
        },
        "protocol": "JSON-RPC 2.0",
        "documentation": "Open the events endpoint, then POST JSON-RPC messages to the endpoint it announces"
    }))
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Handle a new SSE connection.
///
/// Registers a session and announces the message endpoint as the first event
/// on the stream.
async fn handle_sse(
    State(state): State<AppState>,
) -> impl IntoResponse {
    let session_id = Uuid::new_v4();
    let (tx, rx) = mpsc::channel(32);

    let endpoint = format!("{}?session_id={}", state.config.message_path, session_id);
    let _ = tx
        .send(Ok(Event::default().event("endpoint").data(endpoint)))
        .await;

    state.sessions.write().await.insert(
        session_id,
        Session {
            tx,
            initialized: false,
        },
    );

    info!("SSE connection established: session {}", session_id);

    Sse::new(ReceiverStream::new(rx)).keep_alive(KeepAlive::default())
}

/// Handle a JSON-RPC message posted by a client.
///
/// The response (if the message is a request and not a notification) is
/// pushed to the session's event stream; the POST is acknowledged with 202.
#[instrument(skip_all, fields(method = %request.method, session = %query.session_id))]
async fn handle_message(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
    Json(request): Json<JsonRpcRequest>,
) -> Response {
    info!("Received JSON-RPC message: {}", request.method);

    let tx = {
        let sessions = state.sessions.read().await;
        match sessions.get(&query.session_id) {
            Some(session) => session.tx.clone(),
            None => {
                warn!("Message for unknown session: {}", query.session_id);
                return (StatusCode::NOT_FOUND, "Unknown session").into_response();
            }
        }
    };

    // Notifications get no response pushed to the stream.
    if request.id.is_none() {
        handle_notification(&state, query.session_id, &request).await;
        return StatusCode::ACCEPTED.into_response();
    }

    let response = process_request(&state, request).await;

    let event = match serde_json::to_string(&response) {
        Ok(payload) => Event::default().event("message").data(payload),
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to serialize response: {}", e),
            )
                .into_response();
        }
    };

    if tx.send(Ok(event)).await.is_err() {
        warn!("Session {} disconnected, dropping it", query.session_id);
        state.sessions.write().await.remove(&query.session_id);
        return (StatusCode::GONE, "Session closed").into_response();
    }

    StatusCode::ACCEPTED.into_response()
}

/// Process a JSON-RPC request and return the response.
async fn process_request(state: &AppState, request: JsonRpcRequest) -> JsonRpcResponse {
    // Validate JSON-RPC version
    if request.jsonrpc != "2.0" {
        return JsonRpcResponse::invalid_request(request.id);
    }

    match request.method.as_str() {
        // Initialize the MCP session
        "initialize" => handle_initialize(state, request).await,

        // Liveness probe
        "ping" => JsonRpcResponse::success(request.id, serde_json::json!({})),

        // List available tools
        "tools/list" => handle_tools_list(state, request).await,

        // Call a tool
        "tools/call" => handle_tools_call(state, request).await,

        // Unknown method
        _ => {
            warn!("Unknown method: {}", request.method);
            JsonRpcResponse::method_not_found(request.id)
        }
    }
}

/// Handle initialize request.
async fn handle_initialize(state: &AppState, request: JsonRpcRequest) -> JsonRpcResponse {
    info!("Processing initialize request");

    let result = serde_json::json!({
        "protocolVersion": "2024-11-05",
        "capabilities": {
            "tools": {}
        },
        "serverInfo": {
            "name": state.server.name(),
            "version": state.server.version()
        },
        "instructions": "This server provides external-data lookup tools: current time, coarse IP-based location, and current weather for a coordinate."
    });

    JsonRpcResponse::success(request.id, result)
}

/// Handle tools/list request.
async fn handle_tools_list(state: &AppState, request: JsonRpcRequest) -> JsonRpcResponse {
    info!("Processing tools/list request");

    let tools = state.server.list_tools();
    let result = serde_json::json!({
        "tools": tools
    });

    JsonRpcResponse::success(request.id, result)
}

/// Handle tools/call request.
async fn handle_tools_call(state: &AppState, request: JsonRpcRequest) -> JsonRpcResponse {
    info!("Processing tools/call request");

    let params = match request.params {
        Some(p) => p,
        None => return JsonRpcResponse::invalid_params(request.id.clone(), "Missing params"),
    };

    let name = match params.get("name").and_then(|v| v.as_str()) {
        Some(n) => n.to_string(),
        None => return JsonRpcResponse::invalid_params(request.id.clone(), "Missing tool name"),
    };

    let arguments = params
        .get("arguments")
        .cloned()
        .unwrap_or(serde_json::json!({}));

    match state.server.call_tool(&name, arguments).await {
        Ok(value) => JsonRpcResponse::success(
            request.id,
            serde_json::json!({
                "content": [{ "type": "text", "text": value.to_string() }],
                "structuredContent": value,
                "isError": false
            }),
        ),
        Err(e) if e.is_protocol_error() => {
            JsonRpcResponse::invalid_params(request.id, e.to_string())
        }
        // Execution failures are tool results, not protocol errors; the
        // caller gets the summarized message only.
        Err(e) => JsonRpcResponse::success(
            request.id,
            serde_json::json!({
                "content": [{ "type": "text", "text": e.to_string() }],
                "isError": true
            }),
        ),
    }
}

/// Handle notifications (no response pushed).
async fn handle_notification(state: &AppState, session_id: Uuid, request: &JsonRpcRequest) {
    match request.method.as_str() {
        "notifications/initialized" => {
            info!("Client sent initialized notification");
            let mut sessions = state.sessions.write().await;
            if let Some(session) = sessions.get_mut(&session_id) {
                session.initialized = true;
            }
        }
        _ => {
            info!("Received notification: {}", request.method);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use std::fs;
    use tempfile::TempDir;

    fn test_state() -> (AppState, TempDir) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tool_list.yaml");
        fs::write(
            &path,
            r#"
tools:
  - name: get_current_datetime
    description: ["Returns the current local date and time."]
    inputSchema: { type: object }
    outputSchema: { type: object }
"#,
        )
        .unwrap();

        let mut config = Config::default();
        config.catalog.path = path;

        let state = AppState {
            server: McpServer::new(config).unwrap(),
            config: Arc::new(SseConfig::default()),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        };
        (state, dir)
    }

    fn request(method: &str, params: Option<serde_json::Value>) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: Some(serde_json::json!(1)),
            method: method.to_string(),
            params,
        }
    }

    #[tokio::test]
    async fn test_initialize_reports_tool_capability() {
        let (state, _dir) = test_state();
        let response = process_request(&state, request("initialize", None)).await;

        let result = response.result.unwrap();
        assert!(result.get("capabilities").unwrap().get("tools").is_some());
        assert_eq!(
            result
                .get("serverInfo")
                .and_then(|s| s.get("name"))
                .and_then(|v| v.as_str()),
            Some("weather-mcp-server")
        );
    }

    #[tokio::test]
    async fn test_tools_list_returns_catalog() {
        let (state, _dir) = test_state();
        let response = process_request(&state, request("tools/list", None)).await;

        let tools = response.result.unwrap();
        let tools = tools.get("tools").unwrap().as_array().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(
            tools[0].get("name").and_then(|v| v.as_str()),
            Some("get_current_datetime")
        );
    }

    #[tokio::test]
    async fn test_tools_call_success() {
        let (state, _dir) = test_state();
        let response = process_request(
            &state,
            request(
                "tools/call",
                Some(serde_json::json!({ "name": "get_current_datetime", "arguments": {} })),
            ),
        )
        .await;

        let result = response.result.unwrap();
        assert_eq!(result.get("isError"), Some(&serde_json::json!(false)));
        assert!(result.get("structuredContent").unwrap().get("now").is_some());
    }

    #[tokio::test]
    async fn test_tools_call_unknown_tool_is_protocol_error() {
        let (state, _dir) = test_state();
        let response = process_request(
            &state,
            request(
                "tools/call",
                Some(serde_json::json!({ "name": "not_a_tool", "arguments": {} })),
            ),
        )
        .await;

        let error = response.error.unwrap();
        assert_eq!(error.code, -32602);
        assert!(error.message.contains("not_a_tool"));
    }

    #[tokio::test]
    async fn test_tools_call_expression_rejected() {
        let (state, _dir) = test_state();
        let response = process_request(
            &state,
            request(
                "tools/call",
                Some(serde_json::json!({
                    "name": "get_current_datetime",
                    "arguments": { "expression": "1+1" }
                })),
            ),
        )
        .await;

        let error = response.error.unwrap();
        assert_eq!(error.code, -32602);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let (state, _dir) = test_state();
        let response = process_request(&state, request("resources/list", None)).await;
        assert_eq!(response.error.unwrap().code, -32601);
    }

    #[tokio::test]
    async fn test_wrong_jsonrpc_version() {
        let (state, _dir) = test_state();
        let mut req = request("tools/list", None);
        req.jsonrpc = "1.0".to_string();

        let response = process_request(&state, req).await;
        assert_eq!(response.error.unwrap().code, -32600);
    }
}
