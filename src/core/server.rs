//! MCP Server implementation and lifecycle management.
//!
//! This module contains the main server handler that implements the MCP
//! protocol by delegating to the tools domain.
//!
//! ## Tool Architecture
//!
//! The advertised tool list comes from the declarative catalog
//! (`tool_list.yaml`) and is re-read on every listing request. Dispatch
//! resolves against the immutable [`ToolRegistry`] built at construction.
//! The two are intentionally decoupled: editing the catalog file changes
//! what is advertised without a restart, while the set of callable handlers
//! is fixed for the life of the process.

use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler, model::*, service::RequestContext,
};
use std::sync::Arc;
use tracing::{info, instrument};

use super::config::Config;
use crate::domains::tools::{ToolCatalog, ToolError, ToolRegistry};

/// The main MCP server handler.
///
/// This struct implements the `ServerHandler` trait from rmcp and delegates
/// tool listing to the catalog loader and tool calls to the registry.
#[derive(Clone)]
pub struct McpServer {
    /// Server configuration.
    config: Arc<Config>,

    /// Immutable tool registry for dispatching calls.
    registry: Arc<ToolRegistry>,
}

impl McpServer {
    /// Create a new MCP server with the given configuration.
    pub fn new(config: Config) -> crate::core::Result<Self> {
        let config = Arc::new(config);
        let registry = Arc::new(ToolRegistry::new(config.clone())?);

        Ok(Self { config, registry })
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.config.server.name
    }

    /// Get the server version.
    pub fn version(&self) -> &str {
        &self.config.server.version
    }

    /// Get the server configuration.
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    // ========================================================================
    // SSE Transport Support Methods
    // ========================================================================

    /// List all advertised tools as plain JSON (for the SSE transport).
    ///
    /// The catalog is reloaded from the declaration file on every call.
    pub fn list_tools(&self) -> Vec<serde_json::Value> {
        ToolCatalog::load(&self.config.catalog.path).to_json()
    }

    /// Call a tool by name (for the SSE transport).
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        let arguments = match arguments {
            serde_json::Value::Object(map) => map,
            serde_json::Value::Null => serde_json::Map::new(),
            _ => {
                return Err(ToolError::invalid_arguments(
                    "tool arguments must be an object",
                ));
            }
        };

        self.registry.dispatch(name, arguments).await
    }
}

/// ServerHandler implementation for the rmcp stdio transport.
impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "This server provides external-data lookup tools: current time, \
                 coarse IP-based location, and current weather for a coordinate."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    #[instrument(skip(self, _context))]
    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        info!("Listing tools");
        let catalog = ToolCatalog::load(&self.config.catalog.path);
        Ok(ListToolsResult {
            tools: catalog.to_mcp_tools(),
            next_cursor: None,
            meta: None,
        })
    }

    #[instrument(skip(self, _context), fields(tool = %request.name))]
    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        info!("Calling tool: {}", request.name);
        let arguments = request.arguments.unwrap_or_default();

        match self.registry.dispatch(&request.name, arguments).await {
            Ok(value) => {
                let text = serde_json::to_string(&value)
                    .map_err(|e| McpError::internal_error(e.to_string(), None))?;
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            // Unknown tool or malformed arguments are protocol errors, not
            // tool results.
            Err(e) if e.is_protocol_error() => Err(McpError::invalid_params(e.to_string(), None)),
            // Execution and upstream failures surface as a summarized tool
            // error result; full detail was already logged at the source.
            Err(e) => Ok(CallToolResult::error(vec![Content::text(e.to_string())])),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn server_with_catalog(contents: &str) -> (McpServer, TempDir) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tool_list.yaml");
        fs::write(&path, contents).unwrap();

        let mut config = Config::default();
        config.catalog.path = path;
        (McpServer::new(config).unwrap(), dir)
    }

    #[test]
    fn test_list_tools_reflects_catalog() {
        let (server, _dir) = server_with_catalog(
            r#"
tools:
  - name: get_current_datetime
    description: ["Returns the current local date and time."]
    inputSchema: { type: object }
    outputSchema: { type: object }
"#,
        );

        let tools = server.list_tools();
        assert_eq!(tools.len(), 1);
        assert_eq!(
            tools[0].get("name").and_then(|v| v.as_str()),
            Some("get_current_datetime")
        );
    }

    #[test]
    fn test_list_tools_missing_catalog_is_empty() {
        let mut config = Config::default();
        config.catalog.path = "/nonexistent/tool_list.yaml".into();
        let server = McpServer::new(config).unwrap();

        assert!(server.list_tools().is_empty());
    }

    #[test]
    fn test_list_tools_picks_up_catalog_edits() {
        let (server, dir) = server_with_catalog("tools: []");
        assert!(server.list_tools().is_empty());

        fs::write(
            dir.path().join("tool_list.yaml"),
            r#"
tools:
  - name: get_current_location
    description: ["Coarse IP-based location."]
    inputSchema: { type: object }
    outputSchema: { type: object }
"#,
        )
        .unwrap();

        assert_eq!(server.list_tools().len(), 1);
    }

    #[tokio::test]
    async fn test_call_tool_unknown_name() {
        let (server, _dir) = server_with_catalog("tools: []");
        let err = server
            .call_tool("not_a_tool", serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_call_tool_rejects_non_object_arguments() {
        let (server, _dir) = server_with_catalog("tools: []");
        let err = server
            .call_tool("get_current_datetime", serde_json::json!([1, 2]))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn test_call_tool_datetime() {
        let (server, _dir) = server_with_catalog("tools: []");
        let value = server
            .call_tool("get_current_datetime", serde_json::json!({}))
            .await
            .unwrap();
        assert!(value.get("now").is_some());
    }

    #[tokio::test]
    async fn test_concurrent_listing_and_calls_are_self_consistent() {
        let (server, _dir) = server_with_catalog(
            r#"
tools:
  - name: get_current_datetime
    description: ["Returns the current local date and time."]
    inputSchema: { type: object }
    outputSchema: { type: object }
"#,
        );

        let mut tasks = Vec::new();
        for i in 0..16 {
            let server = server.clone();
            tasks.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    let tools = server.list_tools();
                    assert_eq!(tools.len(), 1);
                } else {
                    let value = server
                        .call_tool("get_current_datetime", serde_json::json!({}))
                        .await
                        .unwrap();
                    assert!(value.get("now").is_some());
                }
            }));
        }

        for task in tasks {
            task.await.unwrap();
        }
    }
}
