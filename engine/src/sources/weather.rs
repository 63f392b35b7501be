//! tomorrow.io weather client.
//!
//! Queries the realtime endpoint for temperature and cloud cover at the
//! configured location:
//!
//! ```text
//! GET {base}/v4/weather/realtime?location=..&apikey=..&fields=temperature,cloudCover&units=metric
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use super::WeatherSource;
use crate::config::WeatherConfig;
use crate::error::FetchError;

/// HTTP request timeout.
const REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Deserialize)]
struct RealtimeResponse {
    data: RealtimeData,
}

#[derive(Debug, Deserialize)]
struct RealtimeData {
    values: RealtimeValues,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RealtimeValues {
    temperature: f64,
    cloud_cover: f64,
}

/// Weather client for the tomorrow.io API.
#[derive(Debug, Clone)]
pub struct TomorrowIo {
    config: WeatherConfig,
    client: Client,
}

impl TomorrowIo {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: WeatherConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl WeatherSource for TomorrowIo {
    async fn current(&self, stamp: &str) -> Result<String, FetchError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(FetchError::NotConfigured("weather API key"))?;
        let location = self
            .config
            .location
            .as_deref()
            .ok_or(FetchError::NotConfigured("weather location"))?;

        info!(location, "Retrieving weather");

        let url = format!(
            "{}/v4/weather/realtime",
            self.config.base_url.trim_end_matches('/')
        );
        let response = self
            .client
            .get(&url)
            .query(&[
                ("location", location),
                ("apikey", api_key),
                ("fields", "temperature,cloudCover"),
                ("units", "metric"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(FetchError::ServerError {
                status: status.as_u16(),
                message,
            });
        }

        let body: RealtimeResponse = response
            .json()
            .await
            .map_err(|e| FetchError::InvalidResponse(e.to_string()))?;
        let values = body.data.values;

        debug!(
            temperature = values.temperature,
            cloud_cover = values.cloud_cover,
            "Weather data retrieved"
        );

        Ok(format_weather(
            location,
            values.temperature,
            values.cloud_cover,
            stamp,
        ))
    }
}

/// Formats the weather summary shown on the wallpaper.
#[must_use]
pub fn format_weather(location: &str, temperature: f64, cloud_cover: f64, stamp: &str) -> String {
    format!("Wetter in {location}: {temperature}°C, Bewölkung: {cloud_cover}%\n\nStand: {stamp}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: &str, api_key: Option<&str>, location: Option<&str>) -> TomorrowIo {
        TomorrowIo::new(WeatherConfig {
            base_url: base_url.to_string(),
            api_key: api_key.map(str::to_string),
            location: location.map(str::to_string),
        })
        .unwrap()
    }

    #[test]
    fn test_format_weather() {
        assert_eq!(
            format_weather("graz", 21.5, 40.0, "10:15:00"),
            "Wetter in graz: 21.5°C, Bewölkung: 40%\n\nStand: 10:15:00"
        );
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let weather = client("http://127.0.0.1:9", None, Some("graz"));
        let err = weather.current("10:00:00").await.unwrap_err();
        assert!(matches!(err, FetchError::NotConfigured("weather API key")));
    }

    #[tokio::test]
    async fn test_missing_location() {
        let weather = client("http://127.0.0.1:9", Some("key"), None);
        let err = weather.current("10:00:00").await.unwrap_err();
        assert!(matches!(err, FetchError::NotConfigured("weather location")));
    }

    #[tokio::test]
    async fn test_successful_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/weather/realtime"))
            .and(query_param("location", "graz"))
            .and(query_param("apikey", "key"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {
                    "time": "2030-01-01T10:00:00Z",
                    "values": { "temperature": 3.2, "cloudCover": 87 }
                },
                "location": { "lat": 47.07, "lon": 15.44 }
            })))
            .mount(&server)
            .await;

        let weather = client(&server.uri(), Some("key"), Some("graz"));
        let text = weather.current("10:00:00").await.unwrap();

        assert_eq!(
            text,
            "Wetter in graz: 3.2°C, Bewölkung: 87%\n\nStand: 10:00:00"
        );
    }

    #[tokio::test]
    async fn test_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/weather/realtime"))
            .respond_with(ResponseTemplate::new(429).set_body_string("Too Many Calls"))
            .mount(&server)
            .await;

        let weather = client(&server.uri(), Some("key"), Some("graz"));
        let err = weather.current("10:00:00").await.unwrap_err();

        assert!(matches!(
            err,
            FetchError::ServerError { status: 429, ref message } if message == "Too Many Calls"
        ));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/weather/realtime"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {}
            })))
            .mount(&server)
            .await;

        let weather = client(&server.uri(), Some("key"), Some("graz"));
        let err = weather.current("10:00:00").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidResponse(_)));
    }
}
