//! Rendering: map a weather result and a verbosity mode to display lines.
//!
//! Pure functions only. A shorter-than-expected forecast omits lines
//! instead of erroring.

use crate::models::WeatherResult;
use crate::models::weather::format_temperature;
use serde::{Deserialize, Deserializer, Serialize};

/// Display verbosity. Closed set; unknown configuration values
/// deserialize to `Complete` instead of silently producing nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Temperature only
    Ultra,
    /// Temperature plus location
    Minimal,
    /// Temperature and condition, then location
    Essential,
    /// Single line mixing temperature and next-day range
    Compact,
    /// Location header, current line, forecast line
    #[default]
    Complete,
}

impl ViewMode {
    /// Mode lookup from a configuration string. Unrecognized values fall
    /// back to `Complete` rather than producing empty output.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "ultra" => Self::Ultra,
            "minimal" => Self::Minimal,
            "essential" => Self::Essential,
            "compact" => Self::Compact,
            _ => Self::Complete,
        }
    }
}

impl<'de> Deserialize<'de> for ViewMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(Self::parse(&value))
    }
}

/// How many future days the complete layout shows
const COMPLETE_FORECAST_DAYS: usize = 2;

/// Render a result into display lines for the launcher
#[must_use]
pub fn render(result: &WeatherResult, mode: ViewMode) -> Vec<String> {
    let temperature = format_temperature(result.current.temperature, result.unit);
    let place = result.location.display_name();

    match mode {
        ViewMode::Ultra => vec![temperature],
        ViewMode::Minimal => vec![temperature, place],
        ViewMode::Essential => vec![
            format!(
                "Current weather: {} - {}",
                temperature, result.current.condition_text
            ),
            place,
        ],
        ViewMode::Compact => {
            let mut line = temperature;
            if let Some(next) = result.forecast.first() {
                line.push_str(" → ");
                line.push_str(&day_range(next, result));
            }
            vec![line]
        }
        ViewMode::Complete => {
            let mut lines = vec![
                format!("📍 {place}"),
                format!(
                    "Current weather: {} - {}",
                    temperature, result.current.condition_text
                ),
            ];
            let ranges: Vec<String> = result
                .forecast
                .iter()
                .take(COMPLETE_FORECAST_DAYS)
                .map(|day| day_range(day, result))
                .collect();
            if !ranges.is_empty() {
                lines.push(format!("Forecast: {}", ranges.join(" | ")));
            }
            lines
        }
    }
}

fn day_range(day: &crate::models::ForecastDay, result: &WeatherResult) -> String {
    format!(
        "{}/{}{}",
        day.max_temperature.trunc() as i64,
        day.min_temperature.trunc() as i64,
        result.unit.symbol()
    )
}
