//! Weather providers
//!
//! One trait, two interchangeable implementations. Selection is by the
//! closed [`ProviderKind`] enum; the orchestrator owns the one-shot
//! fallback between them.

use crate::SkycastError;
use crate::config::{HttpConfig, ProviderKind, Unit};
use crate::geo::build_client;
use crate::models::{Location, WeatherResult};
use async_trait::async_trait;
use std::time::Duration;

pub mod open_meteo;
pub mod open_weather;

pub use open_meteo::OpenMeteoProvider;
pub use open_weather::OpenWeatherProvider;

/// A weather service returning current conditions plus a short forecast
/// for given coordinates
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Which configured provider this is
    fn kind(&self) -> ProviderKind;

    /// Fetch current conditions and up to three future days, already
    /// converted to the requested unit
    async fn fetch(
        &self,
        location: &Location,
        unit: Unit,
        language: &str,
    ) -> Result<WeatherResult, SkycastError>;
}

/// Construct the provider for a [`ProviderKind`]. Exhaustive: a new
/// variant will not compile until it is wired here.
pub fn make_provider(
    kind: ProviderKind,
    http: &HttpConfig,
    api_key: Option<&str>,
) -> Result<Box<dyn WeatherProvider>, SkycastError> {
    let client = build_client(
        Duration::from_secs(http.timeout_seconds),
        &http.user_agent,
    )
    .map_err(|e| SkycastError::config(e.to_string()))?;

    Ok(match kind {
        ProviderKind::OpenMeteo => Box::new(OpenMeteoProvider::new(client)),
        ProviderKind::OpenWeather => Box::new(OpenWeatherProvider::new(
            client,
            api_key.map(str::to_string),
        )),
    })
}
