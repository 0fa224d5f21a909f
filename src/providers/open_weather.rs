//! OpenWeather provider. Requires an API key. The upstream only exposes
//! 3-hourly readings, so daily max/min are aggregated client-side by
//! calendar date; the representative condition per day is the midday
//! reading when present, otherwise the first reading of the date.

use super::WeatherProvider;
use crate::SkycastError;
use crate::config::{ProviderKind, Unit};
use crate::models::{ForecastDay, Location, WeatherResult, WeatherSnapshot};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Timelike, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

const FORECAST_URL: &str = "https://api.openweathermap.org/data/2.5/forecast";

/// Future days emitted after dropping today's bucket
const FORECAST_DAYS: usize = 3;

pub struct OpenWeatherProvider {
    client: Client,
    api_key: Option<String>,
}

impl OpenWeatherProvider {
    #[must_use]
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self { client, api_key }
    }
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    list: Vec<Reading>,
}

#[derive(Debug, Clone, Deserialize)]
struct Reading {
    /// Unix timestamp of the reading
    dt: i64,
    main: ReadingMain,
    weather: Vec<ReadingCondition>,
}

#[derive(Debug, Clone, Deserialize)]
struct ReadingMain {
    temp: f64,
    temp_max: f64,
    temp_min: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct ReadingCondition {
    id: i32,
    description: String,
}

impl Reading {
    fn timestamp(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.dt, 0).unwrap_or_else(Utc::now)
    }

    fn date(&self) -> NaiveDate {
        self.timestamp().date_naive()
    }
}

/// Group 3-hourly readings by calendar date and collapse each date into one
/// forecast day: max of `temp_max`, min of `temp_min` across all readings.
/// The `today` bucket is always discarded; output is chronological with
/// index 0 = next day.
fn aggregate_forecast(readings: &[Reading], today: NaiveDate) -> Vec<ForecastDay> {
    let mut days: Vec<(NaiveDate, Vec<&Reading>)> = Vec::new();
    for reading in readings {
        let date = reading.date();
        if date <= today {
            continue;
        }
        match days.last_mut() {
            Some((d, bucket)) if *d == date => bucket.push(reading),
            _ => days.push((date, vec![reading])),
        }
    }

    days.into_iter()
        .take(FORECAST_DAYS)
        .map(|(_, bucket)| {
            let max_temperature = bucket
                .iter()
                .map(|r| r.main.temp_max)
                .fold(f64::NEG_INFINITY, f64::max);
            let min_temperature = bucket
                .iter()
                .map(|r| r.main.temp_min)
                .fold(f64::INFINITY, f64::min);
            let representative = bucket
                .iter()
                .find(|r| r.timestamp().hour() == 12)
                .copied()
                .or_else(|| bucket.first().copied());
            ForecastDay {
                max_temperature,
                min_temperature,
                condition_code: representative
                    .and_then(|r| r.weather.first().map(|c| c.id)),
            }
        })
        .collect()
}

fn result_from_response(
    response: ForecastResponse,
    location: Location,
    unit: Unit,
) -> Result<WeatherResult> {
    let Some(first) = response.list.first() else {
        bail!("OpenWeather response contained no readings");
    };
    let condition = first
        .weather
        .first()
        .context("OpenWeather reading missing condition")?;

    let current = WeatherSnapshot {
        temperature: first.main.temp,
        condition_code: condition.id,
        condition_text: condition.description.clone(),
    };
    let forecast = aggregate_forecast(&response.list, first.date());

    Ok(WeatherResult {
        location,
        current,
        forecast,
        unit,
        fetched_at: Utc::now(),
    })
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenWeather
    }

    async fn fetch(
        &self,
        location: &Location,
        unit: Unit,
        language: &str,
    ) -> Result<WeatherResult, SkycastError> {
        let Some(api_key) = &self.api_key else {
            return Err(SkycastError::credential("openweather"));
        };
        if !location.is_valid() {
            return Err(SkycastError::provider("invalid coordinates"));
        }

        let units = match unit {
            Unit::Metric => "metric",
            Unit::Imperial => "imperial",
        };
        let url = format!(
            "{FORECAST_URL}?lat={}&lon={}&units={units}&lang={language}&appid={api_key}",
            location.latitude, location.longitude
        );
        debug!(
            "OpenWeather request for ({:.4}, {:.4})",
            location.latitude, location.longitude
        );

        let result: Result<WeatherResult> = async {
            let response = self.client.get(&url).send().await?;
            if !response.status().is_success() {
                bail!("OpenWeather returned status {}", response.status());
            }
            let body: ForecastResponse = response
                .json()
                .await
                .with_context(|| "Failed to parse OpenWeather forecast response")?;
            result_from_response(body, location.clone(), unit)
        }
        .await;

        result.map_err(|e| SkycastError::provider(e.to_string()))
    }
}
