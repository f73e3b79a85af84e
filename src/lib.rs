//! MCP Server Library
//!
//! This crate provides a Model Context Protocol (MCP) server exposing a
//! small set of external-data lookup tools: current time, coarse IP-based
//! geolocation, and current weather for a coordinate.
//!
//! # Architecture
//!
//! The server is organized into the following modules:
//!
//! - **core**: Core infrastructure including configuration, error handling,
//!   the main server handler, and the transport layer
//! - **domains**: Business logic organized by bounded contexts
//!   - **tools**: the declarative tool catalog, the immutable handler
//!     registry, and the individual lookup tools
//!
//! The advertised tool list is declared in `tool_list.yaml` and re-read on
//! every listing request; dispatch resolves against a registry built once at
//! startup.
//!
//! # Example
//!
//! ```rust,no_run
//! use weather_mcp_server::{core::Config, core::McpServer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env();
//!     let server = McpServer::new(config)?;
//!     // Start the server...
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod domains;

// Re-export commonly used types for convenience
pub use core::{Config, Error, McpServer, Result};
