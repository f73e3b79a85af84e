//! Current date/time tool definition.
//!
//! Returns the local wall-clock time. No inputs, no upstream call.

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domains::tools::error::ToolError;
use crate::domains::tools::handlers::{ArgumentMap, ToolHandler};

/// Timestamp format advertised in the tool's output schema.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ============================================================================
// Tool Parameters
// ============================================================================

/// Parameters for the current datetime tool. The tool takes no inputs;
/// any supplied field is rejected.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CurrentTimeParams {}

/// Structured output: the current local timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentTimeOutput {
    /// Local wall-clock time formatted as `YYYY-MM-DD HH:MM:SS`.
    pub now: String,
}

// ============================================================================
// Tool Definition
// ============================================================================

/// Current datetime tool - reports the local wall-clock time.
pub struct CurrentTimeTool;

impl CurrentTimeTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "get_current_datetime";

    pub fn new() -> Self {
        Self
    }

    /// Read the local wall clock.
    pub fn current_time(_params: &CurrentTimeParams) -> CurrentTimeOutput {
        let now = Local::now().format(TIMESTAMP_FORMAT).to_string();
        CurrentTimeOutput { now }
    }
}

impl Default for CurrentTimeTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ToolHandler for CurrentTimeTool {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn execute(&self, arguments: ArgumentMap) -> Result<serde_json::Value, ToolError> {
        let params: CurrentTimeParams =
            serde_json::from_value(serde_json::Value::Object(arguments))
                .map_err(|e| ToolError::invalid_arguments(e.to_string()))?;

        let output = Self::current_time(&params);
        info!("Reporting current datetime: {}", output.now);

        serde_json::to_value(output).map_err(|e| ToolError::execution_failed(e.to_string()))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    #[test]
    fn test_current_time_matches_declared_format() {
        let output = CurrentTimeTool::current_time(&CurrentTimeParams {});
        assert!(
            NaiveDateTime::parse_from_str(&output.now, TIMESTAMP_FORMAT).is_ok(),
            "unexpected timestamp format: {}",
            output.now
        );
    }

    #[tokio::test]
    async fn test_handler_with_empty_arguments() {
        let handler = CurrentTimeTool::new();
        let value = handler.execute(ArgumentMap::new()).await.unwrap();
        assert!(value.get("now").and_then(|v| v.as_str()).is_some());
    }

    #[tokio::test]
    async fn test_handler_rejects_unknown_fields() {
        let handler = CurrentTimeTool::new();
        let mut args = ArgumentMap::new();
        args.insert("expression".to_string(), serde_json::json!("1+1"));

        let err = handler.execute(args).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
