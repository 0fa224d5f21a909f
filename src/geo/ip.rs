//! IP-geolocation backends: ip-api.com and ipinfo.io

use super::IpLocate;
use crate::models::Location;
use anyhow::{Result, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

const IP_API_URL: &str = "http://ip-api.com/json/";
const IPINFO_URL: &str = "https://ipinfo.io/json";

/// ip-api.com lookup. Keyless; reports failures in-band via `status`.
pub struct IpApiBackend;

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    lat: Option<f64>,
    lon: Option<f64>,
    city: Option<String>,
    #[serde(rename = "regionName")]
    region_name: Option<String>,
    #[serde(rename = "countryCode")]
    country_code: Option<String>,
}

fn location_from_ip_api(body: IpApiResponse) -> Result<Location> {
    if body.status != "success" {
        bail!("ip-api reported status {}", body.status);
    }
    let (Some(lat), Some(lon)) = (body.lat, body.lon) else {
        bail!("ip-api response missing coordinates");
    };
    let location = Location::new(
        lat,
        lon,
        body.city.unwrap_or_default(),
        "ip-api".to_string(),
    )
    .with_region(body.region_name.unwrap_or_default())
    .with_country_code(body.country_code.unwrap_or_default());

    if !location.is_valid() {
        bail!("ip-api returned out-of-range coordinates");
    }
    Ok(location)
}

#[async_trait]
impl IpLocate for IpApiBackend {
    fn name(&self) -> &'static str {
        "ip-api"
    }

    async fn locate(&self, client: &Client) -> Result<Location> {
        debug!("Looking up IP location via ip-api");
        let response = client.get(IP_API_URL).send().await?;
        if !response.status().is_success() {
            bail!("ip-api returned status {}", response.status());
        }
        let body: IpApiResponse = response.json().await?;
        location_from_ip_api(body)
    }
}

/// ipinfo.io lookup. Coordinates arrive as a single "lat,lon" string.
pub struct IpInfoBackend;

#[derive(Debug, Deserialize)]
struct IpInfoResponse {
    loc: String,
    city: Option<String>,
    region: Option<String>,
    country: Option<String>,
}

fn location_from_ipinfo(body: IpInfoResponse) -> Result<Location> {
    let Some((lat, lon)) = body.loc.split_once(',') else {
        bail!("ipinfo loc field is not 'lat,lon': {}", body.loc);
    };
    let lat: f64 = lat.trim().parse()?;
    let lon: f64 = lon.trim().parse()?;

    let location = Location::new(
        lat,
        lon,
        body.city.unwrap_or_default(),
        "ipinfo".to_string(),
    )
    .with_region(body.region.unwrap_or_default())
    .with_country_code(body.country.unwrap_or_default());

    if !location.is_valid() {
        bail!("ipinfo returned out-of-range coordinates");
    }
    Ok(location)
}

#[async_trait]
impl IpLocate for IpInfoBackend {
    fn name(&self) -> &'static str {
        "ipinfo"
    }

    async fn locate(&self, client: &Client) -> Result<Location> {
        debug!("Looking up IP location via ipinfo");
        let response = client.get(IPINFO_URL).send().await?;
        if !response.status().is_success() {
            bail!("ipinfo returned status {}", response.status());
        }
        let body: IpInfoResponse = response.json().await?;
        location_from_ipinfo(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ip_api_success_body() {
        let body: IpApiResponse = serde_json::from_str(
            r#"{"status":"success","lat":-30.03,"lon":-51.23,"city":"Porto Alegre","regionName":"Rio Grande do Sul","countryCode":"BR"}"#,
        )
        .unwrap();
        let location = location_from_ip_api(body).unwrap();
        assert_eq!(location.city_name, "Porto Alegre");
        assert_eq!(location.country_code, "BR");
        assert_eq!(location.source_provider, "ip-api");
    }

    #[test]
    fn test_ip_api_failure_status() {
        let body: IpApiResponse =
            serde_json::from_str(r#"{"status":"fail","message":"private range"}"#).unwrap();
        assert!(location_from_ip_api(body).is_err());
    }

    #[test]
    fn test_ip_api_missing_coordinates() {
        let body: IpApiResponse =
            serde_json::from_str(r#"{"status":"success","city":"Nowhere"}"#).unwrap();
        assert!(location_from_ip_api(body).is_err());
    }

    #[test]
    fn test_ipinfo_loc_parsing() {
        let body: IpInfoResponse = serde_json::from_str(
            r#"{"loc":"48.8566,2.3522","city":"Paris","region":"Ile-de-France","country":"FR"}"#,
        )
        .unwrap();
        let location = location_from_ipinfo(body).unwrap();
        assert_eq!(location.latitude, 48.8566);
        assert_eq!(location.longitude, 2.3522);
        assert_eq!(location.source_provider, "ipinfo");
    }

    #[test]
    fn test_ipinfo_malformed_loc() {
        let body: IpInfoResponse =
            serde_json::from_str(r#"{"loc":"not-coordinates","city":"X"}"#).unwrap();
        assert!(location_from_ipinfo(body).is_err());
    }
}
