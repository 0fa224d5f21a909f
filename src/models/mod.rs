//! Data models for the weather pipeline

pub mod location;
pub mod weather;

pub use location::Location;
pub use weather::{ForecastDay, WeatherResult, WeatherSnapshot};
