//! Location model for geographic coordinates and metadata

use serde::{Deserialize, Serialize};

/// A resolved geographic location. Immutable once resolved.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Location {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// City or place name
    pub city_name: String,
    /// Administrative region, empty when unknown
    pub region: String,
    /// Country code (ISO 3166-1 alpha-2), empty when unknown
    pub country_code: String,
    /// Name of the geolocation backend that produced this location
    pub source_provider: String,
}

impl Location {
    /// Create a new location
    #[must_use]
    pub fn new(latitude: f64, longitude: f64, city_name: String, source_provider: String) -> Self {
        Self {
            latitude,
            longitude,
            city_name,
            region: String::new(),
            country_code: String::new(),
            source_provider,
        }
    }

    /// Set the administrative region
    #[must_use]
    pub fn with_region(mut self, region: String) -> Self {
        self.region = region;
        self
    }

    /// Set the country code
    #[must_use]
    pub fn with_country_code(mut self, country_code: String) -> Self {
        self.country_code = country_code;
        self
    }

    /// Whether the coordinates are present and within range. Invalid
    /// locations must not be cached or passed downstream.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Format location as coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }

    /// Display label: "City, Region" or "City, CC" when available
    #[must_use]
    pub fn display_name(&self) -> String {
        if !self.region.is_empty() && self.region != self.city_name {
            format!("{}, {}", self.city_name, self.region)
        } else if !self.country_code.is_empty() {
            format!("{}, {}", self.city_name, self.country_code)
        } else {
            self.city_name.clone()
        }
    }
}
