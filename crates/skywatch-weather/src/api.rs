//! HTTP client for the remote weather backend.
//!
//! The backend is a black box returning structured JSON; this module
//! owns the wire types and the status-code-to-error mapping. Nothing
//! outside [`crate::service`] should need to call it directly.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::instrument;

use crate::error::WeatherError;

/// Query parameters addressing a location upstream. At least one of
/// `city` or `coords` must be set.
#[derive(Debug, Clone, Default)]
pub struct LocationQuery {
    pub city: Option<String>,
    pub coords: Option<(f64, f64)>,
}

impl LocationQuery {
    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(city) = &self.city {
            params.push(("city", city.clone()));
        }
        if let Some((lat, lon)) = self.coords {
            params.push(("lat", lat.to_string()));
            params.push(("lon", lon.to_string()));
        }
        params
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiLocation {
    pub lat: f64,
    pub lon: f64,
    pub city: Option<String>,
    #[serde(default)]
    pub detailed_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConditions {
    pub temperature: f64,
    pub condition: String,
    #[serde(default)]
    pub humidity: Option<f64>,
    pub wind_speed: f64,
    pub weather_code: i32,
    #[serde(default)]
    pub precipitation: Option<f64>,
    #[serde(default)]
    pub pressure: Option<f64>,
}

/// `GET /weather/current` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentResponse {
    pub location: ApiLocation,
    pub weather: ApiConditions,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub temp_max: f64,
    pub temp_min: f64,
    pub weather_code: i32,
    pub condition: String,
    pub wind_speed: f64,
    #[serde(default)]
    pub precipitation_probability: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub pressure: Option<f64>,
}

/// `GET /weather/forecast` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastResponse {
    pub forecast: Vec<ForecastDay>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastHour {
    pub time: DateTime<Utc>,
    pub temperature: f64,
    pub weather_code: i32,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub wind_speed: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub precipitation: Option<f64>,
    #[serde(default)]
    pub precipitation_probability: Option<f64>,
}

/// `GET /weather/hourly` response.
#[derive(Debug, Clone, Deserialize)]
pub struct HourlyResponse {
    pub hourly: Vec<ForecastHour>,
}

pub struct WeatherApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl WeatherApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, WeatherError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Current conditions for a location.
    #[instrument(skip(self), level = "info")]
    pub async fn current(&self, query: &LocationQuery) -> Result<CurrentResponse, WeatherError> {
        let url = format!("{}/weather/current", self.base_url);
        let response = self.client.get(&url).query(&query.params()).send().await?;
        Self::handle_response(response).await
    }

    /// Daily forecast for a location.
    #[instrument(skip(self), level = "info")]
    pub async fn forecast(
        &self,
        query: &LocationQuery,
        days: u32,
    ) -> Result<ForecastResponse, WeatherError> {
        let url = format!("{}/weather/forecast", self.base_url);
        let mut params = query.params();
        params.push(("days", days.to_string()));
        let response = self.client.get(&url).query(&params).send().await?;
        Self::handle_response(response).await
    }

    /// Hourly forecast for a location.
    #[instrument(skip(self), level = "info")]
    pub async fn hourly(
        &self,
        query: &LocationQuery,
        hours: u32,
    ) -> Result<HourlyResponse, WeatherError> {
        let url = format!("{}/weather/hourly", self.base_url);
        let mut params = query.params();
        params.push(("hours", hours.to_string()));
        let response = self.client.get(&url).query(&params).send().await?;
        Self::handle_response(response).await
    }

    /// Helper to handle API responses and errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, WeatherError> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| WeatherError::Api(format!("JSON parse error: {}", e)))
        } else if status.as_u16() == 404 {
            let text = response.text().await.unwrap_or_default();
            Err(WeatherError::LocationNotFound(text))
        } else if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            Err(WeatherError::RateLimited(retry_after))
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(WeatherError::Api(format!("{}: {}", status, text)))
        }
    }
}
