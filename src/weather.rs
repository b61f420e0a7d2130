//! Current outdoor weather from the OpenWeatherMap REST API.
//!
//! One GET per request and no retry; the caller decides what to do with a
//! failure.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Default OpenWeatherMap current-weather endpoint.
pub const DEFAULT_WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Environment variable holding the API key.
pub const API_KEY_VAR: &str = "OPENWEATHER_API_KEY";

/// Environment variable overriding the endpoint.
pub const BASE_URL_VAR: &str = "OPENWEATHER_BASE_URL";

/// Weather service settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherConfig {
    /// Current-weather endpoint.
    pub base_url: String,
    /// API key sent as `appid`.
    pub api_key: String,
    /// Unit system, `metric` for degrees Celsius.
    pub units: String,
}

impl WeatherConfig {
    /// Default settings with the given API key.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Read settings from `OPENWEATHER_API_KEY` and `OPENWEATHER_BASE_URL`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if no API key is set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup(API_KEY_VAR)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| Error::InvalidParameter {
                name: API_KEY_VAR.to_string(),
                value: String::new(),
            })?;

        let mut config = Self::with_api_key(api_key);
        if let Some(base_url) = lookup(BASE_URL_VAR) {
            config.base_url = base_url;
        }
        Ok(config)
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_WEATHER_URL.to_string(),
            api_key: String::new(),
            units: "metric".to_string(),
        }
    }
}

/// Current conditions for a city.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct WeatherReport {
    /// City name as reported by the service.
    pub city: String,
    /// Temperature in the configured units.
    pub temperature: f64,
    /// Relative humidity in percent.
    pub humidity: f64,
}

/// Source of current weather.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Fetch the current weather for `city`.
    async fn current_weather(&self, city: &str) -> Result<WeatherReport>;
}

#[derive(Debug, Deserialize)]
struct CurrentWeatherResponse {
    name: String,
    main: MainConditions,
}

#[derive(Debug, Deserialize)]
struct MainConditions {
    temp: f64,
    humidity: f64,
}

impl From<CurrentWeatherResponse> for WeatherReport {
    fn from(response: CurrentWeatherResponse) -> Self {
        Self {
            city: response.name,
            temperature: response.main.temp,
            humidity: response.main.humidity,
        }
    }
}

/// OpenWeatherMap client.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: reqwest::Client,
    config: WeatherConfig,
}

impl OpenWeatherClient {
    /// Create a client with its own HTTP connection pool.
    pub fn new(config: WeatherConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Create a client on an existing HTTP client.
    pub fn with_client(client: reqwest::Client, config: WeatherConfig) -> Self {
        Self { client, config }
    }

    /// Client settings.
    pub fn config(&self) -> &WeatherConfig {
        &self.config
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn current_weather(&self, city: &str) -> Result<WeatherReport> {
        if city.trim().is_empty() {
            return Err(Error::InvalidParameter {
                name: "city".to_string(),
                value: city.to_string(),
            });
        }

        debug!("Requesting current weather for {}", city);

        let response = self
            .client
            .get(&self.config.base_url)
            .query(&[
                ("q", city),
                ("units", self.config.units.as_str()),
                ("appid", self.config.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Weather request for {} failed with {}", city, status);
            return Err(Error::Weather {
                reason: format!("service answered {}", status),
            });
        }

        let body = response.bytes().await?;
        let parsed: CurrentWeatherResponse = serde_json::from_slice(&body)?;
        Ok(parsed.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OpenWeatherClient {
        OpenWeatherClient::new(WeatherConfig {
            base_url: format!("{}/data/2.5/weather", server.uri()),
            ..WeatherConfig::with_api_key("secret")
        })
    }

    #[tokio::test]
    async fn test_current_weather() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("q", "Zurich"))
            .and(query_param("units", "metric"))
            .and(query_param("appid", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "Zurich",
                "main": { "temp": 18.4, "humidity": 62, "pressure": 1015 },
                "wind": { "speed": 2.1 }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let report = client_for(&mock_server)
            .current_weather("Zurich")
            .await
            .unwrap();

        assert_eq!(
            report,
            WeatherReport {
                city: "Zurich".to_string(),
                temperature: 18.4,
                humidity: 62.0,
            }
        );
    }

    #[tokio::test]
    async fn test_error_status_is_not_retried() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "cod": "404",
                "message": "city not found"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = client_for(&mock_server).current_weather("Atlantis").await;
        assert!(matches!(result, Err(Error::Weather { .. })));
    }

    #[tokio::test]
    async fn test_unexpected_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "Bern" })))
            .mount(&mock_server)
            .await;

        let result = client_for(&mock_server).current_weather("Bern").await;
        assert!(matches!(result, Err(Error::Json(_))));
    }

    #[tokio::test]
    async fn test_empty_city_is_rejected() {
        let client = OpenWeatherClient::new(WeatherConfig::with_api_key("secret"));
        let result = client.current_weather("  ").await;
        assert!(matches!(result, Err(Error::InvalidParameter { .. })));
    }

    #[test]
    fn test_config_from_lookup() {
        let config = WeatherConfig::from_lookup(|name| match name {
            API_KEY_VAR => Some("abc".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.base_url, DEFAULT_WEATHER_URL);
        assert_eq!(config.api_key, "abc");
        assert_eq!(config.units, "metric");

        let config = WeatherConfig::from_lookup(|name| match name {
            API_KEY_VAR => Some("abc".to_string()),
            BASE_URL_VAR => Some("http://localhost:8080/weather".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.base_url, "http://localhost:8080/weather");

        assert!(matches!(
            WeatherConfig::from_lookup(|_| None),
            Err(Error::InvalidParameter { .. })
        ));
    }
}
