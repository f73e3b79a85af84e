//! Current weather tool definition.
//!
//! Fetches current conditions for a coordinate from a forecast service
//! (Open-Meteo compatible API) with a single GET carrying the coordinate,
//! `current_weather=true`, and a fixed timezone. The response's
//! `current_weather` block is shaped into a flat record; `weather_code` is
//! passed through uninterpreted, mapping codes to descriptions is the
//! caller's concern.
//!
//! A response without a `current_weather` block is an upstream failure,
//! never a success with null fields.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::core::config::Config;
use crate::domains::tools::error::ToolError;
use crate::domains::tools::handlers::{ArgumentMap, ToolHandler};

// ============================================================================
// Tool Parameters
// ============================================================================

/// Parameters for the current weather tool.
///
/// Coordinates are strings, matching the output of the location tool so the
/// two compose directly. Unknown fields are rejected.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CurrentWeatherParams {
    /// Latitude of the location, decimal degrees.
    pub latitude: String,

    /// Longitude of the location, decimal degrees.
    pub longitude: String,
}

/// Structured output: current conditions at the requested coordinate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentWeatherOutput {
    pub temperature: f64,
    pub wind_speed: f64,
    pub wind_direction: f64,
    /// 0 = night, 1 = day.
    pub is_day: u8,
    pub time: String,
    /// WMO weather interpretation code, passed through uninterpreted.
    pub weather_code: i64,
}

/// Relevant subset of the forecast service's JSON body.
#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current_weather: Option<CurrentWeatherBlock>,
}

#[derive(Debug, Deserialize)]
struct CurrentWeatherBlock {
    temperature: f64,
    windspeed: f64,
    winddirection: f64,
    is_day: u8,
    time: String,
    weathercode: i64,
}

// ============================================================================
// Tool Definition
// ============================================================================

/// Current weather tool - current conditions for a coordinate.
pub struct CurrentWeatherTool {
    client: reqwest::Client,
    config: Arc<Config>,
}

impl CurrentWeatherTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "get_current_weather";

    pub fn new(client: reqwest::Client, config: Arc<Config>) -> Self {
        Self { client, config }
    }

    /// Perform the forecast lookup for the given coordinate.
    pub async fn fetch_weather(
        &self,
        latitude: &str,
        longitude: &str,
    ) -> Result<CurrentWeatherOutput, ToolError> {
        let upstream = &self.config.upstream;
        info!(
            "Fetching current weather for ({}, {}) via {}",
            latitude, longitude, upstream.forecast_url
        );

        let response = self
            .client
            .get(&upstream.forecast_url)
            .query(&[
                ("latitude", latitude),
                ("longitude", longitude),
                ("current_weather", "true"),
                ("timezone", upstream.forecast_timezone.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                error!("Forecast request failed: {:?}", e);
                ToolError::upstream(format!("forecast request failed: {}", e))
            })?;

        let response = response.error_for_status().map_err(|e| {
            error!("Forecast service returned an error status: {:?}", e);
            ToolError::upstream(format!("forecast service returned an error: {}", e))
        })?;

        let body: ForecastResponse = response.json().await.map_err(|e| {
            error!("Forecast response was not valid JSON: {:?}", e);
            ToolError::upstream(format!("forecast response could not be decoded: {}", e))
        })?;

        let current = body.current_weather.ok_or_else(|| {
            ToolError::upstream("forecast response has no 'current_weather' block")
        })?;

        Ok(CurrentWeatherOutput {
            temperature: current.temperature,
            wind_speed: current.windspeed,
            wind_direction: current.winddirection,
            is_day: current.is_day,
            time: current.time,
            weather_code: current.weathercode,
        })
    }
}

#[async_trait::async_trait]
impl ToolHandler for CurrentWeatherTool {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn execute(&self, arguments: ArgumentMap) -> Result<serde_json::Value, ToolError> {
        let params: CurrentWeatherParams =
            serde_json::from_value(serde_json::Value::Object(arguments))
                .map_err(|e| ToolError::invalid_arguments(e.to_string()))?;

        let output = self
            .fetch_weather(&params.latitude, &params.longitude)
            .await?;
        info!(
            "Current weather at ({}, {}): {}°, wind {} from {}",
            params.latitude, params.longitude,
            output.temperature, output.wind_speed, output.wind_direction
        );

        serde_json::to_value(output).map_err(|e| ToolError::execution_failed(e.to_string()))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tool_for(server: &MockServer) -> CurrentWeatherTool {
        let mut config = Config::default();
        config.upstream.forecast_url = format!("{}/v1/forecast", server.uri());
        CurrentWeatherTool::new(reqwest::Client::new(), Arc::new(config))
    }

    fn current_weather_body() -> serde_json::Value {
        serde_json::json!({
            "latitude": 37.5,
            "longitude": 127.0,
            "current_weather": {
                "temperature": 21.4,
                "windspeed": 8.6,
                "winddirection": 250.0,
                "is_day": 1,
                "time": "2024-05-01T12:00",
                "weathercode": 3
            }
        })
    }

    #[tokio::test]
    async fn test_fetch_weather_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .and(query_param("latitude", "37.5665"))
            .and(query_param("longitude", "126.9780"))
            .and(query_param("current_weather", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_weather_body()))
            .mount(&server)
            .await;

        let output = tool_for(&server)
            .fetch_weather("37.5665", "126.9780")
            .await
            .unwrap();
        assert_eq!(output.temperature, 21.4);
        assert_eq!(output.wind_speed, 8.6);
        assert_eq!(output.is_day, 1);
        assert_eq!(output.weather_code, 3);
    }

    #[tokio::test]
    async fn test_fetch_weather_missing_current_weather_block() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "latitude": 37.5,
                "longitude": 127.0
            })))
            .mount(&server)
            .await;

        let err = tool_for(&server)
            .fetch_weather("37.5", "127.0")
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_fetch_weather_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = tool_for(&server)
            .fetch_weather("37.5", "127.0")
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_handler_requires_coordinates() {
        let server = MockServer::start().await;
        let tool = tool_for(&server);

        let err = ToolHandler::execute(&tool, ArgumentMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn test_handler_rejects_expression_key() {
        let server = MockServer::start().await;
        let tool = tool_for(&server);

        let mut args = ArgumentMap::new();
        args.insert("latitude".to_string(), serde_json::json!("37.5"));
        args.insert("longitude".to_string(), serde_json::json!("127.0"));
        args.insert("expression".to_string(), serde_json::json!("1+1"));

        let err = ToolHandler::execute(&tool, args).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
