//! Tools domain module.
//!
//! This module handles all tool-related functionality for the MCP server.
//! Tools are executable functions that can be called by MCP clients to
//! perform external-data lookups.
//!
//! ## Architecture
//!
//! - `definitions/` - Individual tool implementations (one file per tool)
//! - `catalog.rs` - Loader for the declarative tool list (re-read per listing)
//! - `registry.rs` - Immutable handler registry and call dispatch
//! - `handlers.rs` - The `ToolHandler` trait implemented by every tool
//! - `error.rs` - Tool-specific error types
//!
//! ## Adding a New Tool
//!
//! 1. Create a new file in `definitions/` with typed params and output
//! 2. Implement `ToolHandler` for it
//! 3. Export it in `definitions/mod.rs`
//! 4. Register it in `ToolRegistry::new`
//! 5. Declare it in `tool_list.yaml` so it is advertised to clients

pub mod catalog;
pub mod definitions;
mod error;
mod handlers;
mod registry;

pub use catalog::{ToolCatalog, ToolDescriptor};
pub use error::ToolError;
pub use handlers::{ArgumentMap, ToolHandler};
pub use registry::ToolRegistry;
