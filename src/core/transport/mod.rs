//! Transport layer for the MCP server.
//!
//! This module provides different transport implementations:
//! - **STDIO**: Standard input/output (default for MCP) - feature: `stdio`
//! - **SSE**: Event-stream endpoint plus JSON-RPC message endpoint - feature: `sse`
//!
//! Each transport handles the connection lifecycle and delegates
//! message processing to the MCP server handler.
//!
//! # Feature Flags
//!
//! Transport implementations are conditionally compiled based on features:
//! - `stdio` (default): STDIO transport - minimal dependencies
//! - `sse`: SSE transport - adds axum, tower, tower-http

mod config;
mod error;
mod service;

#[cfg(feature = "sse")]
pub mod sse;

#[cfg(feature = "stdio")]
pub mod stdio;

pub use config::TransportConfig;
pub use error::{TransportError, TransportResult};
pub use service::TransportService;

// Re-export configs for convenience
#[cfg(feature = "sse")]
pub use config::SseConfig;
