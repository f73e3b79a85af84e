//! Tool Registry - central registration and dispatch for all tools.
//!
//! The registry is the process-wide mapping from tool name to handler. It is
//! built once at server construction and never mutated afterward; adding a
//! tool means registering it here and restarting the process. The advertised
//! catalog (`catalog.rs`) is a separate concern: it is re-read from the
//! declaration file per request, while dispatch always resolves against this
//! immutable table.
//!
//! Per call: resolve the name (miss is a NotFound, never an execution
//! failure), hand the argument object to the handler, and on success check
//! the payload against the catalog's declared outputSchema. Schema drift is
//! logged as a warning, not turned into a request failure.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::core::config::Config;

use super::catalog::ToolCatalog;
use super::definitions::{CurrentLocationTool, CurrentTimeTool, CurrentWeatherTool};
use super::error::ToolError;
use super::handlers::{ArgumentMap, ToolHandler};

/// Tool registry - immutable name → handler table plus dispatch.
pub struct ToolRegistry {
    config: Arc<Config>,
    handlers: HashMap<&'static str, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    /// Create the registry with every known tool registered.
    ///
    /// Builds the shared HTTP client used by the lookup tools, with the
    /// configured upstream timeout.
    pub fn new(config: Arc<Config>) -> crate::core::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.upstream.timeout_secs))
            .build()?;

        let tools: Vec<Arc<dyn ToolHandler>> = vec![
            Arc::new(CurrentTimeTool::new()),
            Arc::new(CurrentLocationTool::new(client.clone(), config.clone())),
            Arc::new(CurrentWeatherTool::new(client, config.clone())),
        ];

        let handlers = tools.into_iter().map(|t| (t.name(), t)).collect();

        Ok(Self { config, handlers })
    }

    /// Get all registered tool names.
    pub fn tool_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Dispatch a call-by-name request to the matching handler.
    pub async fn dispatch(
        &self,
        name: &str,
        arguments: ArgumentMap,
    ) -> Result<serde_json::Value, ToolError> {
        let handler = self.handlers.get(name).ok_or_else(|| {
            warn!("Attempted to call unknown tool: {}", name);
            ToolError::not_found(name)
        })?;

        debug!("Dispatching tool call: {}", name);

        let value = handler.execute(arguments).await.map_err(|e| {
            error!("Tool '{}' failed: {:?}", name, e);
            e
        })?;

        self.check_output(name, &value);

        Ok(value)
    }

    /// Validate a success payload against the catalog's declared
    /// outputSchema. Mismatches are logged, never surfaced to the caller.
    fn check_output(&self, name: &str, value: &serde_json::Value) {
        let catalog = ToolCatalog::load(&self.config.catalog.path);
        let Some(descriptor) = catalog.find(name) else {
            return;
        };

        let schema = serde_json::Value::Object(descriptor.output_schema.clone());
        match jsonschema::validator_for(&schema) {
            Ok(validator) => {
                if !validator.is_valid(value) {
                    for violation in validator.iter_errors(value) {
                        warn!("Output of '{}' violates its declared schema: {}", name, violation);
                    }
                }
            }
            Err(e) => {
                warn!("Declared outputSchema for '{}' does not compile: {}", name, e);
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
