//! Location resolution
//!
//! Turns a request context into coordinates: a typed query geocodes by
//! name, manual mode geocodes the configured static location, and
//! everything else falls back to IP-based geolocation. Each lookup walks
//! an ordered chain of backends with a per-call timeout; a backend failure
//! advances the chain, and only exhaustion of the whole chain fails the
//! resolution.

use crate::SkycastError;
use crate::config::{HttpConfig, LocationMode, RequestContext};
use crate::geo::{
    Geocode, IpApiBackend, IpInfoBackend, IpLocate, NominatimGeocoder, OpenMeteoGeocoder,
    build_client, rank_by_distance,
};
use crate::models::Location;
use reqwest::Client;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Maximum candidates a geocoder is asked for when the caller wants
/// multiple matches
const MAX_CANDIDATES: usize = 5;

/// Service for resolving request contexts into locations
pub struct LocationResolver {
    client: Client,
    call_timeout: Duration,
    ip_backends: Vec<Box<dyn IpLocate>>,
    geocoders: Vec<Box<dyn Geocode>>,
    /// Last successful IP-based fix, used to rank nearby candidates
    last_ip_location: Mutex<Option<(f64, f64)>>,
}

impl LocationResolver {
    /// Create a resolver with the default backend chains
    pub fn new(http: &HttpConfig) -> Result<Self, SkycastError> {
        let timeout = Duration::from_secs(http.timeout_seconds);
        let client = build_client(timeout, &http.user_agent)
            .map_err(|e| SkycastError::config(e.to_string()))?;
        Ok(Self::with_backends(
            client,
            timeout,
            vec![Box::new(IpApiBackend), Box::new(IpInfoBackend)],
            vec![Box::new(OpenMeteoGeocoder), Box::new(NominatimGeocoder)],
        ))
    }

    /// Create a resolver over explicit backend chains
    #[must_use]
    pub fn with_backends(
        client: Client,
        call_timeout: Duration,
        ip_backends: Vec<Box<dyn IpLocate>>,
        geocoders: Vec<Box<dyn Geocode>>,
    ) -> Self {
        Self {
            client,
            call_timeout,
            ip_backends,
            geocoders,
            last_ip_location: Mutex::new(None),
        }
    }

    /// Resolve the location for one request. First success wins:
    /// typed query > manual static location > IP lookup.
    pub async fn resolve(&self, context: &RequestContext) -> Result<Location, SkycastError> {
        debug!(
            mode = ?context.location_mode,
            query = %context.raw_query,
            "Resolving location"
        );

        let location = match context.location_mode {
            LocationMode::Query => {
                self.geocode_best(&context.raw_query, &context.language)
                    .await?
            }
            LocationMode::Manual => {
                let static_location = context.static_location.trim();
                if static_location.is_empty() {
                    return Err(SkycastError::config(
                        "manual location mode requires a static location",
                    ));
                }
                self.geocode_best(static_location, &context.language).await?
            }
            LocationMode::Auto => self.locate_by_ip().await?,
        };

        debug!(
            "Resolved '{}' at ({:.4}, {:.4}) via {}",
            location.city_name, location.latitude, location.longitude, location.source_provider
        );
        Ok(location)
    }

    /// Resolve a typed query into up to five candidates, ranked by planar
    /// distance to the last known IP location when one exists
    pub async fn candidates(
        &self,
        query: &str,
        language: &str,
    ) -> Result<Vec<Location>, SkycastError> {
        let mut candidates = self.geocode_chain(query, language, MAX_CANDIDATES).await?;
        let origin = self.last_ip_fix();
        rank_by_distance(&mut candidates, origin);
        Ok(candidates)
    }

    /// Walk the IP backend chain
    async fn locate_by_ip(&self) -> Result<Location, SkycastError> {
        for backend in &self.ip_backends {
            match timeout(self.call_timeout, backend.locate(&self.client)).await {
                Ok(Ok(location)) if location.is_valid() => {
                    if let Ok(mut fix) = self.last_ip_location.lock() {
                        *fix = Some((location.latitude, location.longitude));
                    }
                    return Ok(location);
                }
                Ok(Ok(_)) => {
                    warn!("{} returned an invalid location, trying next", backend.name());
                }
                Ok(Err(e)) => {
                    warn!("{} failed: {}, trying next", backend.name(), e);
                }
                Err(_) => {
                    warn!("{} timed out, trying next", backend.name());
                }
            }
        }
        Err(SkycastError::unresolvable(
            "every IP geolocation backend failed",
        ))
    }

    /// Walk the geocoder chain and keep the single best match
    async fn geocode_best(&self, query: &str, language: &str) -> Result<Location, SkycastError> {
        let candidates = self.geocode_chain(query, language, 1).await?;
        candidates
            .into_iter()
            .next()
            .ok_or_else(|| SkycastError::unresolvable(format!("no match for '{query}'")))
    }

    async fn geocode_chain(
        &self,
        query: &str,
        language: &str,
        count: usize,
    ) -> Result<Vec<Location>, SkycastError> {
        for backend in &self.geocoders {
            match timeout(
                self.call_timeout,
                backend.geocode(&self.client, query, language, count),
            )
            .await
            {
                Ok(Ok(candidates)) if !candidates.is_empty() => {
                    return Ok(candidates);
                }
                Ok(Ok(_)) => {
                    debug!("{} found no match for '{}', trying next", backend.name(), query);
                }
                Ok(Err(e)) => {
                    warn!("{} failed: {}, trying next", backend.name(), e);
                }
                Err(_) => {
                    warn!("{} timed out, trying next", backend.name());
                }
            }
        }
        Err(SkycastError::unresolvable(format!(
            "every geocoding backend failed for '{query}'"
        )))
    }

    fn last_ip_fix(&self) -> Option<(f64, f64)> {
        self.last_ip_location.lock().ok().and_then(|fix| *fix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Preferences;
    use anyhow::bail;
    use async_trait::async_trait;

    struct FailingIp;

    #[async_trait]
    impl IpLocate for FailingIp {
        fn name(&self) -> &'static str {
            "failing"
        }
        async fn locate(&self, _client: &Client) -> anyhow::Result<Location> {
            bail!("unreachable")
        }
    }

    struct SlowIp;

    #[async_trait]
    impl IpLocate for SlowIp {
        fn name(&self) -> &'static str {
            "slow"
        }
        async fn locate(&self, _client: &Client) -> anyhow::Result<Location> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            bail!("never reached")
        }
    }

    struct FixedIp;

    #[async_trait]
    impl IpLocate for FixedIp {
        fn name(&self) -> &'static str {
            "fixed"
        }
        async fn locate(&self, _client: &Client) -> anyhow::Result<Location> {
            Ok(Location::new(
                -30.03,
                -51.23,
                "Porto Alegre".to_string(),
                "fixed".to_string(),
            ))
        }
    }

    struct InvalidIp;

    #[async_trait]
    impl IpLocate for InvalidIp {
        fn name(&self) -> &'static str {
            "invalid"
        }
        async fn locate(&self, _client: &Client) -> anyhow::Result<Location> {
            Ok(Location::new(
                999.0,
                0.0,
                "Broken".to_string(),
                "invalid".to_string(),
            ))
        }
    }

    struct FixedGeocoder {
        results: Vec<Location>,
    }

    #[async_trait]
    impl Geocode for FixedGeocoder {
        fn name(&self) -> &'static str {
            "fixed-geo"
        }
        async fn geocode(
            &self,
            _client: &Client,
            _query: &str,
            _language: &str,
            count: usize,
        ) -> anyhow::Result<Vec<Location>> {
            Ok(self.results.iter().take(count).cloned().collect())
        }
    }

    fn resolver(
        ip_backends: Vec<Box<dyn IpLocate>>,
        geocoders: Vec<Box<dyn Geocode>>,
    ) -> LocationResolver {
        LocationResolver::with_backends(
            Client::new(),
            Duration::from_millis(100),
            ip_backends,
            geocoders,
        )
    }

    fn auto_context() -> RequestContext {
        RequestContext::new("", &Preferences::default())
    }

    #[tokio::test]
    async fn test_fallback_to_second_backend() {
        let resolver = resolver(vec![Box::new(FailingIp), Box::new(FixedIp)], vec![]);
        let location = resolver.resolve(&auto_context()).await.unwrap();
        assert_eq!(location.source_provider, "fixed");
    }

    #[tokio::test]
    async fn test_timeout_advances_chain() {
        let resolver = resolver(vec![Box::new(SlowIp), Box::new(FixedIp)], vec![]);
        let location = resolver.resolve(&auto_context()).await.unwrap();
        assert_eq!(location.source_provider, "fixed");
    }

    #[tokio::test]
    async fn test_invalid_location_advances_chain() {
        let resolver = resolver(vec![Box::new(InvalidIp), Box::new(FixedIp)], vec![]);
        let location = resolver.resolve(&auto_context()).await.unwrap();
        assert_eq!(location.source_provider, "fixed");
    }

    #[tokio::test]
    async fn test_exhausted_chain_is_unresolvable() {
        let resolver = resolver(vec![Box::new(FailingIp), Box::new(FailingIp)], vec![]);
        let err = resolver.resolve(&auto_context()).await.unwrap_err();
        assert!(matches!(err, SkycastError::LocationUnresolvable { .. }));
    }

    #[tokio::test]
    async fn test_query_uses_geocoder_chain() {
        let paris = Location::new(48.8534, 2.3488, "Paris".to_string(), "fixed-geo".to_string());
        let resolver = resolver(
            vec![Box::new(FailingIp)],
            vec![Box::new(FixedGeocoder {
                results: vec![paris.clone()],
            })],
        );
        let context = RequestContext::new("Paris", &Preferences::default());
        let location = resolver.resolve(&context).await.unwrap();
        assert_eq!(location, paris);
    }

    #[tokio::test]
    async fn test_empty_geocoder_results_advance_chain() {
        let lyon = Location::new(45.76, 4.83, "Lyon".to_string(), "fixed-geo".to_string());
        let resolver = resolver(
            vec![],
            vec![
                Box::new(FixedGeocoder { results: vec![] }),
                Box::new(FixedGeocoder {
                    results: vec![lyon],
                }),
            ],
        );
        let context = RequestContext::new("Lyon", &Preferences::default());
        let location = resolver.resolve(&context).await.unwrap();
        assert_eq!(location.city_name, "Lyon");
    }

    #[tokio::test]
    async fn test_manual_mode_without_static_location_is_config_error() {
        let resolver = resolver(vec![], vec![]);
        let mut context = auto_context();
        context.location_mode = LocationMode::Manual;
        let err = resolver.resolve(&context).await.unwrap_err();
        assert!(matches!(err, SkycastError::InvalidConfiguration { .. }));
    }

    #[tokio::test]
    async fn test_candidates_ranked_by_last_ip_fix() {
        let near = Location::new(48.9, 2.4, "Near".to_string(), "fixed-geo".to_string());
        let far = Location::new(-30.0, -51.2, "Far".to_string(), "fixed-geo".to_string());
        let resolver = resolver(
            vec![Box::new(FixedParisIp)],
            vec![Box::new(FixedGeocoder {
                results: vec![far.clone(), near.clone()],
            })],
        );
        // Seed the last IP fix near Paris
        resolver.resolve(&auto_context()).await.unwrap();

        let ranked = resolver.candidates("somewhere", "en").await.unwrap();
        assert_eq!(ranked[0].city_name, "Near");
        assert_eq!(ranked[1].city_name, "Far");
    }

    struct FixedParisIp;

    #[async_trait]
    impl IpLocate for FixedParisIp {
        fn name(&self) -> &'static str {
            "paris-ip"
        }
        async fn locate(&self, _client: &Client) -> anyhow::Result<Location> {
            Ok(Location::new(
                48.85,
                2.35,
                "Paris".to_string(),
                "paris-ip".to_string(),
            ))
        }
    }
}
