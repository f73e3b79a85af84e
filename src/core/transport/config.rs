//! Transport configuration types.

use serde::{Deserialize, Serialize};

/// Transport configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransportConfig {
    /// Standard input/output transport (default for MCP).
    #[cfg(feature = "stdio")]
    Stdio,

    /// SSE transport: event-stream endpoint plus JSON-RPC message endpoint.
    #[cfg(feature = "sse")]
    Sse(SseConfig),
}

/// SSE transport configuration.
#[cfg(feature = "sse")]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SseConfig {
    /// Port number to listen on.
    pub port: u16,

    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Path for the event-stream endpoint.
    #[serde(default = "default_sse_path")]
    pub sse_path: String,

    /// Path for the client-to-server message endpoint.
    #[serde(default = "default_message_path")]
    pub message_path: String,

    /// Enable CORS for browser clients.
    #[serde(default = "default_cors")]
    pub enable_cors: bool,
}

#[cfg(feature = "sse")]
fn default_host() -> String {
    "127.0.0.1".to_string()
}

#[cfg(feature = "sse")]
fn default_sse_path() -> String {
    "/sse".to_string()
}

#[cfg(feature = "sse")]
fn default_message_path() -> String {
    "/messages".to_string()
}

#[cfg(feature = "sse")]
fn default_cors() -> bool {
    true
}

impl Default for TransportConfig {
    fn default() -> Self {
        #[cfg(feature = "stdio")]
        {
            return Self::Stdio;
        }

        #[cfg(all(not(feature = "stdio"), feature = "sse"))]
        {
            return Self::Sse(SseConfig::default());
        }

        #[cfg(not(any(feature = "stdio", feature = "sse")))]
        {
            compile_error!("At least one transport feature must be enabled: stdio or sse");
        }
    }
}

#[cfg(feature = "sse")]
impl Default for SseConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            host: default_host(),
            sse_path: default_sse_path(),
            message_path: default_message_path(),
            enable_cors: default_cors(),
        }
    }
}

impl TransportConfig {
    /// Create a STDIO transport config.
    #[cfg(feature = "stdio")]
    pub fn stdio() -> Self {
        Self::Stdio
    }

    /// Create an SSE transport config.
    #[cfg(feature = "sse")]
    pub fn sse(port: u16, host: impl Into<String>) -> Self {
        Self::Sse(SseConfig {
            port,
            host: host.into(),
            ..Default::default()
        })
    }

    /// Load transport config from environment variables.
    pub fn from_env() -> Self {
        let transport = std::env::var("MCP_TRANSPORT")
            .unwrap_or_default()
            .to_lowercase();

        match transport.as_str() {
            #[cfg(feature = "sse")]
            "sse" => {
                let port = std::env::var("MCP_SSE_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8000);
                let host = std::env::var("MCP_SSE_HOST").unwrap_or_else(|_| default_host());
                let enable_cors = std::env::var("MCP_SSE_CORS")
                    .map(|v| v.to_lowercase() != "false" && v != "0")
                    .unwrap_or(true);
                Self::Sse(SseConfig {
                    port,
                    host,
                    enable_cors,
                    ..Default::default()
                })
            }
            #[cfg(feature = "stdio")]
            _ => Self::Stdio,
            #[cfg(all(not(feature = "stdio"), feature = "sse"))]
            _ => Self::Sse(SseConfig::default()),
        }
    }

    /// Get a description of this transport for logging.
    pub fn description(&self) -> String {
        match self {
            #[cfg(feature = "stdio")]
            Self::Stdio => "STDIO (standard MCP mode)".to_string(),
            #[cfg(feature = "sse")]
            Self::Sse(cfg) => format!("SSE on {}:{}{}", cfg.host, cfg.port, cfg.sse_path),
        }
    }

    /// Check if this transport is the standard STDIO mode.
    pub fn is_stdio(&self) -> bool {
        #[cfg(feature = "stdio")]
        {
            matches!(self, Self::Stdio)
        }
        #[cfg(not(feature = "stdio"))]
        {
            false
        }
    }
}
