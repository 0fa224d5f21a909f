//! Configuration management for the `skycast` pipeline
//!
//! Handles loading preferences from files and environment variables,
//! and provides validation for all configuration settings.

use crate::SkycastError;
use crate::render::ViewMode;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Weather provider selection. Closed set: adding a provider is a
/// compile-time-checked extension point, not a silent default branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    OpenMeteo,
    OpenWeather,
}

impl ProviderKind {
    /// The one-shot fallback partner used when this provider fails
    #[must_use]
    pub fn fallback(self) -> Self {
        match self {
            Self::OpenMeteo => Self::OpenWeather,
            Self::OpenWeather => Self::OpenMeteo,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenMeteo => write!(f, "openmeteo"),
            Self::OpenWeather => write!(f, "openweather"),
        }
    }
}

/// Temperature unit system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Metric,
    Imperial,
}

impl Unit {
    /// Degree symbol for display
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Metric => "°C",
            Self::Imperial => "°F",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Metric => write!(f, "metric"),
            Self::Imperial => write!(f, "imperial"),
        }
    }
}

/// How the location is determined when no query is typed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LocationMode {
    /// IP-based geolocation
    #[default]
    Auto,
    /// Geocode the configured static location string
    Manual,
    /// Geocode the typed query (derived, never configured directly)
    Query,
}

/// User preferences, loaded once and compared across requests to detect
/// changes that must invalidate the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    /// Selected weather provider
    #[serde(default)]
    pub provider: ProviderKind,
    /// Temperature unit system
    #[serde(default)]
    pub unit: Unit,
    /// Location mode when the query is empty
    #[serde(default)]
    pub location_mode: LocationMode,
    /// Static location string for manual mode
    #[serde(default)]
    pub static_location: String,
    /// API key for providers that require one (OpenWeather)
    #[serde(default)]
    pub api_key: Option<String>,
    /// Response language forwarded to the upstream services
    #[serde(default = "default_language")]
    pub language: String,
    /// Display verbosity
    #[serde(default)]
    pub view_mode: ViewMode,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            unit: Unit::default(),
            location_mode: LocationMode::default(),
            static_location: String::new(),
            api_key: None,
            language: default_language(),
            view_mode: ViewMode::default(),
        }
    }
}

/// HTTP client settings shared by all backends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-call timeout in seconds (each backend call, not the whole chain)
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Descriptive client identifier sent on every outbound call
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entry time-to-live in seconds
    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: u64,
    /// Optional JSON file persisting the cache across restarts.
    /// Empty string disables persistence.
    #[serde(default = "default_cache_file")]
    pub file: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_cache_ttl(),
            file: default_cache_file(),
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SkycastConfig {
    /// User preferences
    #[serde(default)]
    pub preferences: Preferences,
    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,
    /// Cache settings
    #[serde(default)]
    pub cache: CacheConfig,
}

// Default value functions
fn default_language() -> String {
    "en".to_string()
}

fn default_timeout() -> u64 {
    5
}

fn default_user_agent() -> String {
    format!("Skycast/{} (launcher weather plugin)", env!("CARGO_PKG_VERSION"))
}

fn default_cache_ttl() -> u64 {
    600
}

fn default_cache_file() -> String {
    dirs::cache_dir()
        .map(|d| d.join("skycast").join("weather.json"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_default()
}

impl SkycastConfig {
    /// Load configuration from an optional file plus `SKYCAST_*` environment
    /// variables, falling back to defaults for anything unset.
    pub fn load(config_file: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = config_file {
            builder = builder.add_source(File::with_name(path).required(false));
        }

        let settings = builder
            .add_source(Environment::with_prefix("SKYCAST").separator("__"))
            .build()
            .with_context(|| "Failed to build configuration")?;

        let config: SkycastConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Validate settings that cannot be expressed through serde defaults
    pub fn validate(&self) -> Result<(), SkycastError> {
        if self.preferences.location_mode == LocationMode::Manual
            && self.preferences.static_location.trim().is_empty()
        {
            return Err(SkycastError::config(
                "manual location mode requires a static location",
            ));
        }
        if self.http.timeout_seconds == 0 {
            return Err(SkycastError::config("timeout must be at least 1 second"));
        }
        Ok(())
    }
}

/// Per-invocation request context. Created for each query event and
/// discarded after rendering.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Free-text query as typed, possibly empty
    pub raw_query: String,
    /// Temperature unit system
    pub unit: Unit,
    /// Selected weather provider
    pub provider: ProviderKind,
    /// Effective resolution mode for this request
    pub location_mode: LocationMode,
    /// Static location string, used in manual mode
    pub static_location: String,
    /// Response language
    pub language: String,
    /// Display verbosity
    pub view_mode: ViewMode,
}

impl RequestContext {
    /// Build a context for one query event. A non-empty query always wins
    /// over the configured location mode.
    #[must_use]
    pub fn new(query: &str, prefs: &Preferences) -> Self {
        let raw_query = query.trim().to_string();
        let location_mode = if raw_query.is_empty() {
            prefs.location_mode
        } else {
            LocationMode::Query
        };
        Self {
            raw_query,
            unit: prefs.unit,
            provider: prefs.provider,
            location_mode,
            static_location: prefs.static_location.clone(),
            language: prefs.language.clone(),
            view_mode: prefs.view_mode,
        }
    }

    /// Cache-key identifier for the location part of this request: the
    /// normalized lowercase query or static location, or a fixed sentinel
    /// for IP lookups. Manual mode must carry its own identifier so that a
    /// static-location change is never served from another city's entry.
    #[must_use]
    pub fn location_identifier(&self) -> String {
        match self.location_mode {
            LocationMode::Query => self.raw_query.to_lowercase(),
            LocationMode::Manual => self.static_location.trim().to_lowercase(),
            LocationMode::Auto => "auto".to_string(),
        }
    }
}
