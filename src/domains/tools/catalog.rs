//! Tool catalog loader.
//!
//! The set of advertised tools is declared in an external YAML file (by
//! default `./tool_list.yaml`) with a top-level `tools` sequence. Each entry
//! carries a `name`, a `description` given as a sequence of lines, and the
//! JSON Schemas for its input and output. The catalog is re-read on every
//! listing request so edits to the file show up without a restart.
//!
//! Loading never fails the request: a missing file, unparsable YAML, or an
//! entry missing an expected field is logged and degrades to an empty
//! catalog. The whole file is discarded on a single bad entry; dispatch does
//! not depend on the catalog, so registered tools remain callable.

use std::path::Path;
use std::sync::Arc;

use rmcp::model::Tool;
use serde::Deserialize;
use serde_json::Map;
use thiserror::Error;
use tracing::{error, info};

// ============================================================================
// Declaration file format
// ============================================================================

/// Top-level shape of the tool declaration file.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    tools: Vec<CatalogEntry>,
}

/// One raw entry as written in the declaration file.
#[derive(Debug, Deserialize)]
struct CatalogEntry {
    name: String,

    /// Description lines, joined with newlines into a single string.
    description: Vec<String>,

    #[serde(rename = "inputSchema")]
    input_schema: Map<String, serde_json::Value>,

    #[serde(rename = "outputSchema")]
    output_schema: Map<String, serde_json::Value>,
}

/// Errors raised while reading the declaration file. These never escape the
/// loader; they are logged and mapped to an empty catalog.
#[derive(Debug, Error)]
enum CatalogError {
    #[error("failed to read tool list: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse tool list: {0}")]
    Parse(#[from] serde_yaml::Error),
}

// ============================================================================
// Catalog
// ============================================================================

/// A single advertised tool: name, joined description, and schemas copied
/// verbatim from the declaration file.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Map<String, serde_json::Value>,
    pub output_schema: Map<String, serde_json::Value>,
}

/// The ordered set of currently advertised tools.
///
/// Order matches declaration order in the file.
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    descriptors: Vec<ToolDescriptor>,
}

impl ToolCatalog {
    /// Create an empty catalog.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the catalog from the declaration file at `path`.
    ///
    /// Never fails: every load error is logged and yields an empty catalog.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(catalog) => {
                info!("Loaded {} tools from {}", catalog.len(), path.display());
                catalog
            }
            Err(e) => {
                error!("{} ({}): no tools will be advertised", e, path.display());
                Self::empty()
            }
        }
    }

    fn try_load(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path)?;
        let file: CatalogFile = serde_yaml::from_str(&raw)?;

        let descriptors = file
            .tools
            .into_iter()
            .map(|entry| ToolDescriptor {
                name: entry.name,
                description: entry.description.join("\n"),
                input_schema: entry.input_schema,
                output_schema: entry.output_schema,
            })
            .collect();

        Ok(Self { descriptors })
    }

    /// Number of advertised tools.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// The descriptors in declaration order.
    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    /// Find a descriptor by tool name.
    pub fn find(&self, name: &str) -> Option<&ToolDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    /// Convert the catalog into rmcp `Tool` models for the MCP listing.
    pub fn to_mcp_tools(&self) -> Vec<Tool> {
        self.descriptors
            .iter()
            .map(|d| Tool {
                name: d.name.clone().into(),
                description: Some(d.description.clone().into()),
                input_schema: Arc::new(d.input_schema.clone()),
                annotations: None,
                output_schema: Some(Arc::new(d.output_schema.clone())),
                icons: None,
                meta: None,
                title: None,
            })
            .collect()
    }

    /// Convert the catalog into plain JSON listing entries.
    pub fn to_json(&self) -> Vec<serde_json::Value> {
        self.descriptors
            .iter()
            .map(|d| {
                serde_json::json!({
                    "name": d.name,
                    "description": d.description,
                    "inputSchema": serde_json::Value::Object(d.input_schema.clone()),
                    "outputSchema": serde_json::Value::Object(d.output_schema.clone()),
                })
            })
            .collect()
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

    const VALID_CATALOG: &str = r#"
tools:
  - name: get_current_datetime
    description:
      - "Returns the current local date and time."
      - "Output format: YYYY-MM-DD HH:MM:SS."
    inputSchema:
      type: object
      properties: {}
    outputSchema:
      type: object
      properties:
        now:
          type: string
  - name: get_current_location
    description:
      - "Returns the current coarse location from the public IP address."
    inputSchema:
      type: object
      properties: {}
    outputSchema:
      type: object
      properties:
        latitude:
          type: string
        longitude:
          type: string
"#;

    fn write_catalog(dir: &TempDir, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join("tool_list.yaml");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_valid_catalog_preserves_count_and_order() {
        let dir = TempDir::new().unwrap();
        let path = write_catalog(&dir, VALID_CATALOG);

        let catalog = ToolCatalog::load(&path);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.descriptors()[0].name, "get_current_datetime");
        assert_eq!(catalog.descriptors()[1].name, "get_current_location");
    }

    #[test]
    fn test_load_joins_description_lines() {
        let dir = TempDir::new().unwrap();
        let path = write_catalog(&dir, VALID_CATALOG);

        let catalog = ToolCatalog::load(&path);
        assert_eq!(
            catalog.descriptors()[0].description,
            "Returns the current local date and time.\nOutput format: YYYY-MM-DD HH:MM:SS."
        );
    }

    #[test]
    fn test_load_copies_schemas_verbatim() {
        let dir = TempDir::new().unwrap();
        let path = write_catalog(&dir, VALID_CATALOG);

        let catalog = ToolCatalog::load(&path);
        let location = catalog.find("get_current_location").unwrap();
        let props = location.output_schema.get("properties").unwrap();
        assert!(props.get("latitude").is_some());
        assert!(props.get("longitude").is_some());
    }

    #[test]
    fn test_load_missing_file_returns_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("no_such_file.yaml");

        let catalog = ToolCatalog::load(&path);
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_load_invalid_yaml_returns_empty() {
        let dir = TempDir::new().unwrap();
        let path = write_catalog(&dir, "tools: [not: valid: yaml: {{{");

        let catalog = ToolCatalog::load(&path);
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_load_entry_missing_input_schema_discards_whole_catalog() {
        let dir = TempDir::new().unwrap();
        let path = write_catalog(
            &dir,
            r#"
tools:
  - name: good_tool
    description: ["ok"]
    inputSchema: { type: object }
    outputSchema: { type: object }
  - name: bad_tool
    description: ["missing inputSchema"]
    outputSchema: { type: object }
"#,
        );

        let catalog = ToolCatalog::load(&path);
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_to_mcp_tools_carries_schemas() {
        let dir = TempDir::new().unwrap();
        let path = write_catalog(&dir, VALID_CATALOG);

        let tools = ToolCatalog::load(&path).to_mcp_tools();
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].name.as_ref(), "get_current_datetime");
        assert!(tools[0].description.is_some());
        assert!(tools[0].output_schema.is_some());
    }

    #[test]
    fn test_to_json_listing_shape() {
        let dir = TempDir::new().unwrap();
        let path = write_catalog(&dir, VALID_CATALOG);

        let listing = ToolCatalog::load(&path).to_json();
        assert_eq!(listing.len(), 2);
        assert_eq!(
            listing[1].get("name").and_then(|v| v.as_str()),
            Some("get_current_location")
        );
        assert!(listing[1].get("inputSchema").is_some());
        assert!(listing[1].get("outputSchema").is_some());
    }

    #[test]
    fn test_find_unknown_name() {
        let dir = TempDir::new().unwrap();
        let path = write_catalog(&dir, VALID_CATALOG);

        let catalog = ToolCatalog::load(&path);
        assert!(catalog.find("not_a_tool").is_none());
    }
}
