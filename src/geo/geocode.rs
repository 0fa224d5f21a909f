//! Geocode-by-name backends: Open-Meteo geocoding API and Nominatim.
//! Both are keyless.

use super::Geocode;
use crate::models::Location;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

const OPEN_METEO_GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";

/// Open-Meteo geocoding API
pub struct OpenMeteoGeocoder;

#[derive(Debug, Deserialize)]
struct OpenMeteoGeocodingResponse {
    results: Option<Vec<OpenMeteoGeocodingResult>>,
}

#[derive(Debug, Deserialize)]
struct OpenMeteoGeocodingResult {
    name: String,
    latitude: f64,
    longitude: f64,
    country_code: Option<String>,
    admin1: Option<String>,
}

fn locations_from_open_meteo(response: OpenMeteoGeocodingResponse) -> Vec<Location> {
    response
        .results
        .unwrap_or_default()
        .into_iter()
        .map(|r| {
            Location::new(r.latitude, r.longitude, r.name, "open-meteo".to_string())
                .with_region(r.admin1.unwrap_or_default())
                .with_country_code(r.country_code.unwrap_or_default().to_uppercase())
        })
        .filter(Location::is_valid)
        .collect()
}

#[async_trait]
impl Geocode for OpenMeteoGeocoder {
    fn name(&self) -> &'static str {
        "open-meteo"
    }

    async fn geocode(
        &self,
        client: &Client,
        query: &str,
        language: &str,
        count: usize,
    ) -> Result<Vec<Location>> {
        let url = format!(
            "{OPEN_METEO_GEOCODING_URL}?name={}&count={count}&language={language}&format=json",
            urlencoding::encode(query)
        );
        debug!("Geocoding '{}' via Open-Meteo", query);

        let response = client.get(&url).send().await?;
        if !response.status().is_success() {
            bail!("Open-Meteo geocoding returned status {}", response.status());
        }
        let body: OpenMeteoGeocodingResponse = response
            .json()
            .await
            .with_context(|| "Failed to parse Open-Meteo geocoding response")?;

        Ok(locations_from_open_meteo(body))
    }
}

/// Nominatim (OpenStreetMap) search
pub struct NominatimGeocoder;

#[derive(Debug, Deserialize)]
struct NominatimResult {
    lat: String,
    lon: String,
    name: Option<String>,
    display_name: Option<String>,
    address: Option<NominatimAddress>,
}

#[derive(Debug, Deserialize)]
struct NominatimAddress {
    state: Option<String>,
    country_code: Option<String>,
}

fn locations_from_nominatim(results: Vec<NominatimResult>) -> Vec<Location> {
    results
        .into_iter()
        .filter_map(|r| {
            let lat: f64 = r.lat.parse().ok()?;
            let lon: f64 = r.lon.parse().ok()?;
            let name = r
                .name
                .filter(|n| !n.is_empty())
                .or_else(|| {
                    r.display_name
                        .as_ref()
                        .and_then(|d| d.split(',').next())
                        .map(str::to_string)
                })?;
            let address = r.address.unwrap_or(NominatimAddress {
                state: None,
                country_code: None,
            });
            Some(
                Location::new(lat, lon, name, "nominatim".to_string())
                    .with_region(address.state.unwrap_or_default())
                    .with_country_code(address.country_code.unwrap_or_default().to_uppercase()),
            )
        })
        .filter(Location::is_valid)
        .collect()
}

#[async_trait]
impl Geocode for NominatimGeocoder {
    fn name(&self) -> &'static str {
        "nominatim"
    }

    async fn geocode(
        &self,
        client: &Client,
        query: &str,
        language: &str,
        count: usize,
    ) -> Result<Vec<Location>> {
        let url = format!(
            "{NOMINATIM_URL}?q={}&format=jsonv2&limit={count}&addressdetails=1&accept-language={language}",
            urlencoding::encode(query)
        );
        debug!("Geocoding '{}' via Nominatim", query);

        let response = client.get(&url).send().await?;
        if !response.status().is_success() {
            bail!("Nominatim returned status {}", response.status());
        }
        let body: Vec<NominatimResult> = response
            .json()
            .await
            .with_context(|| "Failed to parse Nominatim response")?;

        Ok(locations_from_nominatim(body))
    }
}
