//! Current location tool definition.
//!
//! Resolves the server's coarse location (latitude/longitude) from its
//! public IP address via a single GET to an IP-geolocation service. The
//! service reports the coordinate as a comma-separated `loc` field.
//!
//! Every failure mode (network error, non-success status, non-JSON body,
//! missing or malformed `loc`) surfaces as a typed upstream error so the
//! dispatcher never forwards an absent value into a dependent call.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::core::config::Config;
use crate::domains::tools::error::ToolError;
use crate::domains::tools::handlers::{ArgumentMap, ToolHandler};

// ============================================================================
// Tool Parameters
// ============================================================================

/// Parameters for the current location tool. The tool takes no inputs;
/// any supplied field is rejected.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CurrentLocationParams {}

/// Structured output: the coordinate derived from the public IP address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentLocationOutput {
    pub latitude: String,
    pub longitude: String,
}

/// Relevant subset of the geolocation service's JSON body.
#[derive(Debug, Deserialize)]
struct GeoIpResponse {
    /// Coordinate as `"lat,lon"`.
    loc: Option<String>,
}

// ============================================================================
// Tool Definition
// ============================================================================

/// Current location tool - coarse IP-based geolocation.
pub struct CurrentLocationTool {
    client: reqwest::Client,
    config: Arc<Config>,
}

impl CurrentLocationTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "get_current_location";

    pub fn new(client: reqwest::Client, config: Arc<Config>) -> Self {
        Self { client, config }
    }

    /// Perform the geolocation lookup.
    pub async fn fetch_location(&self) -> Result<CurrentLocationOutput, ToolError> {
        let url = &self.config.upstream.geolocation_url;
        info!("Resolving current location via {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            error!("Geolocation request failed: {:?}", e);
            ToolError::upstream(format!("geolocation request failed: {}", e))
        })?;

        let response = response.error_for_status().map_err(|e| {
            error!("Geolocation service returned an error status: {:?}", e);
            ToolError::upstream(format!("geolocation service returned an error: {}", e))
        })?;

        let body: GeoIpResponse = response.json().await.map_err(|e| {
            error!("Geolocation response was not valid JSON: {:?}", e);
            ToolError::upstream(format!("geolocation response was not valid JSON: {}", e))
        })?;

        let loc = body
            .loc
            .ok_or_else(|| ToolError::upstream("geolocation response has no 'loc' field"))?;

        let (latitude, longitude) = loc.split_once(',').ok_or_else(|| {
            ToolError::upstream(format!("malformed 'loc' field in geolocation response: {}", loc))
        })?;

        Ok(CurrentLocationOutput {
            latitude: latitude.trim().to_string(),
            longitude: longitude.trim().to_string(),
        })
    }
}

#[async_trait::async_trait]
impl ToolHandler for CurrentLocationTool {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn execute(&self, arguments: ArgumentMap) -> Result<serde_json::Value, ToolError> {
        let _params: CurrentLocationParams =
            serde_json::from_value(serde_json::Value::Object(arguments))
                .map_err(|e| ToolError::invalid_arguments(e.to_string()))?;

        let output = self.fetch_location().await?;
        info!(
            "Resolved location: latitude={}, longitude={}",
            output.latitude, output.longitude
        );

        serde_json::to_value(output).map_err(|e| ToolError::execution_failed(e.to_string()))
    }
}

// ============================================================================
// Tests
// ============================================================================
