//! `skycast` - launcher weather pipeline
//!
//! Resolves an ambiguous input (empty query, typed city name, or the
//! caller's IP) into coordinates through a chain of fallback services,
//! fetches current weather plus a short forecast from interchangeable
//! providers, caches results under a TTL, and renders display lines at
//! several verbosity levels.

pub mod cache;
pub mod config;
pub mod error;
pub mod geo;
pub mod models;
pub mod orchestrator;
pub mod providers;
pub mod render;
pub mod resolver;

// Re-export core types for public API
pub use cache::{CachePayload, CacheStore};
pub use config::{
    LocationMode, Preferences, ProviderKind, RequestContext, SkycastConfig, Unit,
};
pub use error::SkycastError;
pub use models::{ForecastDay, Location, WeatherResult, WeatherSnapshot};
pub use orchestrator::{Orchestrator, Response};
pub use providers::{OpenMeteoProvider, OpenWeatherProvider, WeatherProvider};
pub use render::{ViewMode, render};
pub use resolver::LocationResolver;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, SkycastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
