//! End-to-end pipeline tests over offline backends: query in, display
//! lines out, with the real resolver, cache, orchestrator, and renderer.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use skycast::geo::{Geocode, IpLocate};
use skycast::orchestrator::ProviderFactory;
use skycast::{
    CacheStore, ForecastDay, Location, LocationResolver, Orchestrator, Preferences, ProviderKind,
    Response, SkycastError, Unit, WeatherProvider, WeatherResult, WeatherSnapshot,
};
use std::sync::Arc;
use std::time::Duration;

struct UnreachableIp;

#[async_trait]
impl IpLocate for UnreachableIp {
    fn name(&self) -> &'static str {
        "unreachable-ip"
    }
    async fn locate(&self, _client: &Client) -> anyhow::Result<Location> {
        anyhow::bail!("connection refused")
    }
}

struct CityIp;

#[async_trait]
impl IpLocate for CityIp {
    fn name(&self) -> &'static str {
        "city-ip"
    }
    async fn locate(&self, _client: &Client) -> anyhow::Result<Location> {
        Ok(Location::new(
            -30.03,
            -51.23,
            "Porto Alegre".to_string(),
            "city-ip".to_string(),
        ))
    }
}

struct ParisGeocoder;

#[async_trait]
impl Geocode for ParisGeocoder {
    fn name(&self) -> &'static str {
        "paris-geo"
    }
    async fn geocode(
        &self,
        _client: &Client,
        query: &str,
        _language: &str,
        _count: usize,
    ) -> anyhow::Result<Vec<Location>> {
        if query.eq_ignore_ascii_case("paris") {
            Ok(vec![
                Location::new(48.8534, 2.3488, "Paris".to_string(), "paris-geo".to_string())
                    .with_country_code("FR".to_string()),
            ])
        } else {
            Ok(vec![])
        }
    }
}

struct CannedProvider {
    kind: ProviderKind,
    forecast_days: usize,
}

#[async_trait]
impl WeatherProvider for CannedProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }
    async fn fetch(
        &self,
        location: &Location,
        unit: Unit,
        _language: &str,
    ) -> Result<WeatherResult, SkycastError> {
        let forecast = (0..self.forecast_days)
            .map(|i| ForecastDay {
                max_temperature: 21.0 + i as f64,
                min_temperature: 11.0 + i as f64,
                condition_code: Some(61),
            })
            .collect();
        Ok(WeatherResult {
            location: location.clone(),
            current: WeatherSnapshot {
                temperature: 17.8,
                condition_code: 61,
                condition_text: "Slight rain".to_string(),
            },
            forecast,
            unit,
            fetched_at: Utc::now(),
        })
    }
}

fn pipeline(
    ip_backends: Vec<Box<dyn IpLocate>>,
    geocoders: Vec<Box<dyn Geocode>>,
    forecast_days: usize,
) -> Orchestrator {
    let resolver = LocationResolver::with_backends(
        Client::new(),
        Duration::from_millis(200),
        ip_backends,
        geocoders,
    );
    let factory: ProviderFactory = Box::new(move |kind, _http, _key| {
        Ok(Box::new(CannedProvider {
            kind,
            forecast_days,
        }))
    });
    Orchestrator::with_parts(
        skycast::config::HttpConfig::default(),
        Arc::new(CacheStore::new(Duration::from_secs(600))),
        resolver,
        factory,
        Duration::from_millis(350),
    )
}

#[tokio::test]
async fn paris_query_renders_complete_result() {
    let orchestrator = pipeline(
        vec![Box::new(UnreachableIp)],
        vec![Box::new(ParisGeocoder)],
        2,
    );
    let lines = orchestrator
        .handle_lines("Paris", &Preferences::default())
        .await;

    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("Paris"));
    assert!(lines[1].contains("17°C"));
    assert!(lines[2].contains("21/11°C"));
    assert!(lines[2].contains("22/12°C"));
}

#[tokio::test]
async fn short_forecast_omits_the_forecast_line() {
    let orchestrator = pipeline(
        vec![Box::new(UnreachableIp)],
        vec![Box::new(ParisGeocoder)],
        0,
    );
    let lines = orchestrator
        .handle_lines("Paris", &Preferences::default())
        .await;

    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|l| !l.starts_with("Forecast")));
}

#[tokio::test]
async fn ip_fallback_attributes_the_succeeding_backend() {
    let orchestrator = pipeline(
        vec![Box::new(UnreachableIp), Box::new(CityIp)],
        vec![],
        1,
    );
    // Empty query takes the IP path; the first backend fails and the
    // second one supplies the location
    let lines = orchestrator.handle_lines("", &Preferences::default()).await;
    assert!(lines[0].contains("Porto Alegre"));
}

#[tokio::test]
async fn unresolvable_location_yields_one_user_line() {
    let orchestrator = pipeline(vec![Box::new(UnreachableIp)], vec![], 1);
    let lines = orchestrator.handle_lines("", &Preferences::default()).await;
    assert_eq!(lines, vec!["Location failed".to_string()]);
}

#[tokio::test]
async fn unknown_city_yields_one_user_line() {
    let orchestrator = pipeline(vec![], vec![Box::new(ParisGeocoder)], 1);
    let lines = orchestrator
        .handle_lines("Atlantis", &Preferences::default())
        .await;
    assert_eq!(lines, vec!["Location failed".to_string()]);
}

#[tokio::test]
async fn rapid_requests_debounce_to_placeholder() {
    let orchestrator = pipeline(
        vec![Box::new(UnreachableIp)],
        vec![Box::new(ParisGeocoder)],
        1,
    );
    let prefs = Preferences::default();

    let first = orchestrator.handle("Paris", &prefs).await.unwrap();
    assert!(matches!(first, Response::Lines(_)));

    tokio::time::sleep(Duration::from_millis(100)).await;
    let second = orchestrator.handle("Paris", &prefs).await.unwrap();
    assert_eq!(second, Response::Working);

    tokio::time::sleep(Duration::from_millis(500)).await;
    let third = orchestrator.handle("Paris", &prefs).await.unwrap();
    assert!(matches!(third, Response::Lines(_)));
}
