//! Configuration management for the MCP server.
//!
//! This module provides a centralized configuration structure that can be
//! populated from environment variables, configuration files, or defaults.

use super::transport::TransportConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

/// Main configuration structure for the MCP server.
///
/// This struct contains all configurable aspects of the server, organized
/// by domain for clarity and maintainability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server identification and metadata.
    pub server: ServerConfig,

    /// Tool catalog configuration.
    pub catalog: CatalogConfig,

    /// Upstream lookup services configuration.
    pub upstream: UpstreamConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Transport configuration.
    pub transport: TransportConfig,
}

/// Server identification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The name of the server as reported to clients.
    pub name: String,

    /// The version of the server.
    pub version: String,
}

/// Configuration for the declarative tool catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Path to the tool declaration file. Re-read on every listing request,
    /// so edits show up without a restart.
    pub path: PathBuf,
}

/// Configuration for the upstream lookup services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// IP-geolocation endpoint returning a JSON body with a `loc` field.
    pub geolocation_url: String,

    /// Forecast endpoint (Open-Meteo compatible API).
    pub forecast_url: String,

    /// Timezone passed to the forecast service.
    pub forecast_timezone: String,

    /// Request timeout for outbound lookups, in seconds.
    pub timeout_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    pub level: String,

    /// Whether to include timestamps in log output.
    pub with_timestamps: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./tool_list.yaml"),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            geolocation_url: "https://ipinfo.io/json".to_string(),
            forecast_url: "https://api.open-meteo.com/v1/forecast".to_string(),
            forecast_timezone: "Asia/Seoul".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "weather-mcp-server".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            catalog: CatalogConfig::default(),
            upstream: UpstreamConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                with_timestamps: true,
            },
            transport: TransportConfig::default(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables are expected to be prefixed with `MCP_`.
    /// For example: `MCP_SERVER_NAME`, `MCP_LOG_LEVEL`.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(name) = std::env::var("MCP_SERVER_NAME") {
            config.server.name = name;
        }

        if let Ok(level) = std::env::var("MCP_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Ok(path) = std::env::var("MCP_TOOL_LIST_PATH") {
            config.catalog.path = PathBuf::from(path);
            info!("Tool list path set to {}", config.catalog.path.display());
        }

        if let Ok(url) = std::env::var("MCP_GEOLOCATION_URL") {
            config.upstream.geolocation_url = url;
        }

        if let Ok(url) = std::env::var("MCP_FORECAST_URL") {
            config.upstream.forecast_url = url;
        }

        if let Ok(tz) = std::env::var("MCP_FORECAST_TIMEZONE") {
            config.upstream.forecast_timezone = tz;
        }

        if let Ok(secs) = std::env::var("MCP_UPSTREAM_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                config.upstream.timeout_secs = secs;
            }
        }

        // Load transport configuration from environment
        config.transport = TransportConfig::from_env();

        config
    }
}
