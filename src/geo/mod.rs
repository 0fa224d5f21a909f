//! Geolocation backends: IP-based lookup and geocoding by name.
//!
//! Each backend talks to one external service and either returns a valid
//! [`Location`] or fails; the resolver decides what a failure means.

use crate::models::Location;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

pub mod geocode;
pub mod ip;

pub use geocode::{NominatimGeocoder, OpenMeteoGeocoder};
pub use ip::{IpApiBackend, IpInfoBackend};

/// A backend that infers the caller's location from its network address
#[async_trait]
pub trait IpLocate: Send + Sync {
    /// Backend name, recorded as the location's `source_provider`
    fn name(&self) -> &'static str;

    /// Look up the caller's approximate location
    async fn locate(&self, client: &Client) -> Result<Location>;
}

/// A backend that resolves a free-text place name to coordinates
#[async_trait]
pub trait Geocode: Send + Sync {
    /// Backend name, recorded as the location's `source_provider`
    fn name(&self) -> &'static str;

    /// Resolve a place name to up to `count` candidate locations,
    /// best match first
    async fn geocode(
        &self,
        client: &Client,
        query: &str,
        language: &str,
        count: usize,
    ) -> Result<Vec<Location>>;
}

/// Build the HTTP client shared by all backends. Every outbound call
/// carries a descriptive identifier and a hard timeout.
pub fn build_client(timeout: Duration, user_agent: &str) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
        .with_context(|| "Failed to create HTTP client")
}

/// Planar Euclidean distance on raw lat/lon. An accepted approximation for
/// the short distances involved in ranking nearby candidates.
#[must_use]
pub fn planar_distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    let dlat = a.0 - b.0;
    let dlon = a.1 - b.1;
    (dlat * dlat + dlon * dlon).sqrt()
}

/// Sort candidates by proximity to an origin, keeping the original order
/// when no origin is known
pub fn rank_by_distance(candidates: &mut [Location], origin: Option<(f64, f64)>) {
    let Some(origin) = origin else {
        return;
    };
    candidates.sort_by(|a, b| {
        let da = planar_distance((a.latitude, a.longitude), origin);
        let db = planar_distance((b.latitude, b.longitude), origin);
        da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planar_distance() {
        assert_eq!(planar_distance((0.0, 0.0), (3.0, 4.0)), 5.0);
        assert_eq!(planar_distance((1.0, 1.0), (1.0, 1.0)), 0.0);
    }

    #[test]
    fn test_rank_by_distance() {
        let mut candidates = vec![
            Location::new(10.0, 10.0, "Far".to_string(), "test".to_string()),
            Location::new(1.0, 1.0, "Near".to_string(), "test".to_string()),
            Location::new(5.0, 5.0, "Mid".to_string(), "test".to_string()),
        ];
        rank_by_distance(&mut candidates, Some((0.0, 0.0)));
        let names: Vec<&str> = candidates.iter().map(|c| c.city_name.as_str()).collect();
        assert_eq!(names, vec!["Near", "Mid", "Far"]);
    }

    #[test]
    fn test_rank_without_origin_keeps_order() {
        let mut candidates = vec![
            Location::new(10.0, 10.0, "First".to_string(), "test".to_string()),
            Location::new(1.0, 1.0, "Second".to_string(), "test".to_string()),
        ];
        rank_by_distance(&mut candidates, None);
        assert_eq!(candidates[0].city_name, "First");
    }
}
