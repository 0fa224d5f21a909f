//! Open-Meteo provider. Keyless; the upstream already serves daily
//! max/min aggregates, so no client-side aggregation is needed.

use super::WeatherProvider;
use crate::SkycastError;
use crate::config::{ProviderKind, Unit};
use crate::models::weather::wmo_description;
use crate::models::{ForecastDay, Location, WeatherResult, WeatherSnapshot};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Days requested upstream: today plus up to three future days
const FORECAST_DAYS: usize = 4;

pub struct OpenMeteoProvider {
    client: Client,
}

impl OpenMeteoProvider {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current_weather: Option<CurrentWeather>,
    daily: Option<DailyData>,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    temperature: f64,
    weathercode: i32,
}

#[derive(Debug, Deserialize)]
struct DailyData {
    #[serde(rename = "temperature_2m_max")]
    temperature_max: Vec<Option<f64>>,
    #[serde(rename = "temperature_2m_min")]
    temperature_min: Vec<Option<f64>>,
    #[serde(rename = "weathercode", default)]
    weather_code: Option<Vec<Option<i32>>>,
}

fn result_from_response(
    response: ForecastResponse,
    location: Location,
    unit: Unit,
) -> Result<WeatherResult> {
    let Some(current) = response.current_weather else {
        bail!("Open-Meteo response missing current_weather");
    };

    let mut forecast = Vec::new();
    if let Some(daily) = response.daily {
        let days = daily.temperature_max.len().min(daily.temperature_min.len());
        // Index 0 is today, which is always excluded from the forecast
        for i in 1..days.min(FORECAST_DAYS) {
            let (Some(max), Some(min)) = (daily.temperature_max[i], daily.temperature_min[i])
            else {
                continue;
            };
            let condition_code = daily
                .weather_code
                .as_ref()
                .and_then(|codes| codes.get(i).copied().flatten());
            forecast.push(ForecastDay {
                max_temperature: max,
                min_temperature: min,
                condition_code,
            });
        }
    }

    Ok(WeatherResult {
        location,
        current: WeatherSnapshot {
            temperature: current.temperature,
            condition_code: current.weathercode,
            condition_text: wmo_description(current.weathercode).to_string(),
        },
        forecast,
        unit,
        fetched_at: Utc::now(),
    })
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenMeteo
    }

    async fn fetch(
        &self,
        location: &Location,
        unit: Unit,
        _language: &str,
    ) -> Result<WeatherResult, SkycastError> {
        if !location.is_valid() {
            return Err(SkycastError::provider("invalid coordinates"));
        }

        let temperature_unit = match unit {
            Unit::Metric => "celsius",
            Unit::Imperial => "fahrenheit",
        };
        let url = format!(
            "{FORECAST_URL}?latitude={}&longitude={}&current_weather=true&daily=temperature_2m_max,temperature_2m_min,weathercode&temperature_unit={temperature_unit}&timezone=auto&forecast_days={FORECAST_DAYS}",
            location.latitude, location.longitude
        );
        debug!("Open-Meteo request URL: {}", url);

        let result: Result<WeatherResult> = async {
            let response = self.client.get(&url).send().await?;
            if !response.status().is_success() {
                bail!("Open-Meteo returned status {}", response.status());
            }
            let body: ForecastResponse = response
                .json()
                .await
                .with_context(|| "Failed to parse Open-Meteo forecast response")?;
            result_from_response(body, location.clone(), unit)
        }
        .await;

        result.map_err(|e| SkycastError::provider(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paris() -> Location {
        Location::new(48.8534, 2.3488, "Paris".to_string(), "test".to_string())
    }

    #[test]
    fn test_result_from_response_excludes_today() {
        let body: ForecastResponse = serde_json::from_str(
            r#"{
                "current_weather": {"temperature": 18.4, "weathercode": 2},
                "daily": {
                    "temperature_2m_max": [20.1, 21.5, 19.0, 17.2],
                    "temperature_2m_min": [11.0, 12.3, 10.1, 9.8],
                    "weathercode": [2, 3, 61, 0]
                }
            }"#,
        )
        .unwrap();
        let result = result_from_response(body, paris(), Unit::Metric).unwrap();

        assert_eq!(result.current.temperature, 18.4);
        assert_eq!(result.current.condition_text, "Partly cloudy");
        // Today (index 0) dropped, three future days kept
        assert_eq!(result.forecast.len(), 3);
        assert_eq!(result.forecast[0].max_temperature, 21.5);
        assert_eq!(result.forecast[0].condition_code, Some(3));
        assert_eq!(result.forecast[2].min_temperature, 9.8);
    }

    #[test]
    fn test_result_from_response_short_daily_series() {
        let body: ForecastResponse = serde_json::from_str(
            r#"{
                "current_weather": {"temperature": 5.0, "weathercode": 71},
                "daily": {
                    "temperature_2m_max": [3.0],
                    "temperature_2m_min": [-2.0]
                }
            }"#,
        )
        .unwrap();
        let result = result_from_response(body, paris(), Unit::Metric).unwrap();
        assert!(result.forecast.is_empty());
    }

    #[test]
    fn test_result_from_response_missing_current_fails() {
        let body: ForecastResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert!(result_from_response(body, paris(), Unit::Metric).is_err());
    }

    #[test]
    fn test_null_daily_values_are_skipped() {
        let body: ForecastResponse = serde_json::from_str(
            r#"{
                "current_weather": {"temperature": 10.0, "weathercode": 0},
                "daily": {
                    "temperature_2m_max": [10.0, null, 12.0],
                    "temperature_2m_min": [5.0, 4.0, null]
                }
            }"#,
        )
        .unwrap();
        let result = result_from_response(body, paris(), Unit::Metric).unwrap();
        assert!(result.forecast.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_coordinates_return_provider_error() {
        let provider = OpenMeteoProvider::new(Client::new());
        let broken = Location::new(400.0, 0.0, "Broken".to_string(), "test".to_string());
        let err = provider.fetch(&broken, Unit::Metric, "en").await.unwrap_err();
        assert!(matches!(err, SkycastError::ProviderUnavailable { .. }));
    }
}
