//! Weather data model and display helpers

use crate::config::Unit;
use crate::models::Location;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current conditions reading
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WeatherSnapshot {
    /// Temperature in the requested unit
    pub temperature: f64,
    /// WMO weather code (or provider condition id for OpenWeather)
    pub condition_code: i32,
    /// Human-readable condition text
    pub condition_text: String,
}

/// One future day of the forecast. Index 0 is the next day; today is
/// always excluded.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ForecastDay {
    /// Daily maximum temperature in the requested unit
    pub max_temperature: f64,
    /// Daily minimum temperature in the requested unit
    pub min_temperature: f64,
    /// Representative condition code for the day, when available
    pub condition_code: Option<i32>,
}

/// Normalized result of one weather fetch. Treated as a value type and
/// never mutated after construction.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WeatherResult {
    /// Where the reading applies
    pub location: Location,
    /// Current conditions
    pub current: WeatherSnapshot,
    /// Up to three future days, chronological
    pub forecast: Vec<ForecastDay>,
    /// Unit the temperatures are expressed in
    pub unit: Unit,
    /// When this result was fetched
    pub fetched_at: DateTime<Utc>,
}

/// Convert a WMO weather code to a human-readable description
/// See: https://open-meteo.com/en/docs#weathervariables
#[must_use]
pub fn wmo_description(code: i32) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 => "Fog",
        48 => "Depositing rime fog",
        51 => "Light drizzle",
        53 => "Moderate drizzle",
        55 => "Dense drizzle",
        56 => "Light freezing drizzle",
        57 => "Dense freezing drizzle",
        61 => "Slight rain",
        63 => "Moderate rain",
        65 => "Heavy rain",
        66 => "Light freezing rain",
        67 => "Heavy freezing rain",
        71 => "Slight snow fall",
        73 => "Moderate snow fall",
        75 => "Heavy snow fall",
        77 => "Snow grains",
        80 => "Slight rain showers",
        81 => "Moderate rain showers",
        82 => "Violent rain showers",
        85 => "Slight snow showers",
        86 => "Heavy snow showers",
        95 => "Thunderstorm",
        96 => "Thunderstorm with slight hail",
        99 => "Thunderstorm with heavy hail",
        _ => "Unknown",
    }
}

/// Convert Celsius to Fahrenheit, truncated (not rounded) to an integer.
/// Applied after aggregation when a provider cannot convert upstream.
#[must_use]
pub fn celsius_to_fahrenheit(celsius: f64) -> i64 {
    (celsius * 9.0 / 5.0 + 32.0).trunc() as i64
}

/// Format a temperature for display: truncated integer plus unit symbol
#[must_use]
pub fn format_temperature(value: f64, unit: Unit) -> String {
    format!("{}{}", value.trunc() as i64, unit.symbol())
}
