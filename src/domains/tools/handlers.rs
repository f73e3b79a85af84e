//! The handler trait implemented by every tool.
//!
//! Handlers receive the raw argument object from the transport and are
//! responsible for deserializing it into their own typed parameters. Unknown
//! fields are rejected at that boundary, so nothing caller-supplied reaches a
//! handler without passing through its declared input shape.

use super::error::ToolError;

/// Raw argument object as delivered by the transport.
pub type ArgumentMap = serde_json::Map<String, serde_json::Value>;

/// Trait for tool handlers registered in the [`ToolRegistry`].
///
/// Implementations are stateless apart from shared, read-only collaborators
/// (HTTP client, configuration), so a single instance serves any number of
/// concurrent calls.
///
/// [`ToolRegistry`]: super::ToolRegistry
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync {
    /// The name this tool is registered and called by.
    fn name(&self) -> &'static str;

    /// Execute the tool against the given argument object.
    ///
    /// Returns the structured result payload, or a [`ToolError`] describing
    /// why the call failed. Handlers never return partial data.
    async fn execute(&self, arguments: ArgumentMap) -> Result<serde_json::Value, ToolError>;
}
