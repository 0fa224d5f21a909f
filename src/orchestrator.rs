//! Request orchestration
//!
//! One entry point for the host launcher: a query string plus the current
//! preferences in, renderable lines or a user-facing error line out. The
//! pipeline is linear: resolve location, check cache, fetch weather, store,
//! render. Rapid repeated invocations are debounced into a placeholder,
//! and a best-effort preload can warm the cache at startup.

use crate::SkycastError;
use crate::cache::{CachePayload, CacheStore, compose_key};
use crate::config::{HttpConfig, Preferences, ProviderKind, RequestContext, SkycastConfig};
use crate::models::{Location, WeatherResult};
use crate::providers::{WeatherProvider, make_provider};
use crate::render::render;
use crate::resolver::LocationResolver;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Requests arriving within this window of the previous one short-circuit
/// to a placeholder instead of issuing a duplicate fetch
const DEBOUNCE_WINDOW: Duration = Duration::from_millis(350);

/// Placeholder line shown while a debounced request settles
const WORKING_PLACEHOLDER: &str = "Fetching weather…";

/// Outcome of one query event
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Rendered display lines
    Lines(Vec<String>),
    /// Debounced; the caller should keep showing a lightweight placeholder
    Working,
}

/// Builds a weather provider for a request. Indirection so tests can
/// substitute offline providers.
pub type ProviderFactory = Box<
    dyn Fn(
            ProviderKind,
            &HttpConfig,
            Option<&str>,
        ) -> Result<Box<dyn WeatherProvider>, SkycastError>
        + Send
        + Sync,
>;

/// Request-level coordinator owning the cache, the resolver, and the
/// shared mutable state (debounce timestamp, request counter, last
/// preference snapshot).
pub struct Orchestrator {
    http: HttpConfig,
    cache: Arc<CacheStore>,
    resolver: LocationResolver,
    provider_factory: ProviderFactory,
    debounce: Duration,
    last_request: Mutex<Option<Instant>>,
    last_prefs: Mutex<Option<Preferences>>,
    request_seq: AtomicU64,
}

impl Orchestrator {
    /// Create an orchestrator from loaded configuration
    pub fn new(config: &SkycastConfig) -> Result<Self, SkycastError> {
        let ttl = Duration::from_secs(config.cache.ttl_seconds);
        let cache = if config.cache.file.is_empty() {
            Arc::new(CacheStore::new(ttl))
        } else {
            Arc::new(CacheStore::with_file(ttl, &config.cache.file))
        };
        let resolver = LocationResolver::new(&config.http)?;
        Ok(Self::with_parts(
            config.http.clone(),
            cache,
            resolver,
            Box::new(|kind, http, api_key| make_provider(kind, http, api_key)),
            DEBOUNCE_WINDOW,
        ))
    }

    /// Assemble an orchestrator from explicit parts
    #[must_use]
    pub fn with_parts(
        http: HttpConfig,
        cache: Arc<CacheStore>,
        resolver: LocationResolver,
        provider_factory: ProviderFactory,
        debounce: Duration,
    ) -> Self {
        Self {
            http,
            cache,
            resolver,
            provider_factory,
            debounce,
            last_request: Mutex::new(None),
            last_prefs: Mutex::new(None),
            request_seq: AtomicU64::new(0),
        }
    }

    /// Handle one query event. Every code path ends in either rendered
    /// lines, a placeholder, or a typed error the caller can turn into a
    /// single user-facing line.
    pub async fn handle(
        &self,
        query: &str,
        prefs: &Preferences,
    ) -> Result<Response, SkycastError> {
        if self.debounced() {
            debug!("Request debounced");
            return Ok(Response::Working);
        }
        let seq = self.request_seq.fetch_add(1, Ordering::SeqCst) + 1;

        self.invalidate_on_preference_change(prefs);

        let context = RequestContext::new(query, prefs);
        let result = self.run(&context, prefs, seq).await?;
        Ok(Response::Lines(render(&result, context.view_mode)))
    }

    /// Convenience wrapper for hosts that only speak display lines:
    /// failures collapse to one short user-facing line.
    pub async fn handle_lines(&self, query: &str, prefs: &Preferences) -> Vec<String> {
        match self.handle(query, prefs).await {
            Ok(Response::Lines(lines)) => lines,
            Ok(Response::Working) => vec![WORKING_PLACEHOLDER.to_string()],
            Err(e) => {
                warn!("Request failed: {}", e);
                vec![e.user_message()]
            }
        }
    }

    /// Warm the cache for the automatic/no-query case at process start.
    /// Best effort: failures are logged at debug and silenced.
    pub fn spawn_preload(self: Arc<Self>, prefs: Preferences) -> tokio::task::JoinHandle<()> {
        let orchestrator = self;
        tokio::spawn(async move {
            let context = RequestContext::new("", &prefs);
            let seq = orchestrator.request_seq.load(Ordering::SeqCst);
            match orchestrator.run(&context, &prefs, seq).await {
                Ok(_) => debug!("Preload populated the cache"),
                Err(e) => debug!("Preload failed: {}", e),
            }
        })
    }

    /// The linear pipeline: resolve, check cache, fetch, store
    async fn run(
        &self,
        context: &RequestContext,
        prefs: &Preferences,
        seq: u64,
    ) -> Result<WeatherResult, SkycastError> {
        let weather_key = compose_key(
            context.provider,
            context.unit,
            &context.location_identifier(),
            &context.language,
        );
        if let Some(CachePayload::Weather(result)) = self.cache.get(&weather_key) {
            return Ok(result);
        }

        let location = self.resolve_location(context).await?;
        let result = self.fetch_with_fallback(context, prefs, &location).await?;

        // A newer request supersedes this one; its result is discarded
        // from the cache but still returned.
        if self.request_seq.load(Ordering::SeqCst) == seq {
            self.cache
                .set(&weather_key, CachePayload::Weather(result.clone()));
        } else {
            debug!("Request {} superseded, result not cached", seq);
        }
        Ok(result)
    }

    /// Resolve the location, reusing a cached resolution when fresh
    async fn resolve_location(
        &self,
        context: &RequestContext,
    ) -> Result<Location, SkycastError> {
        let geo_key = format!(
            "geo-{}-{}",
            context.location_identifier(),
            context.language
        );
        if let Some(CachePayload::Location(location)) = self.cache.get(&geo_key) {
            return Ok(location);
        }

        let location = self.resolver.resolve(context).await?;
        self.cache
            .set(&geo_key, CachePayload::Location(location.clone()));
        Ok(location)
    }

    /// Fetch from the configured provider, falling back to the other
    /// provider at most once per request
    async fn fetch_with_fallback(
        &self,
        context: &RequestContext,
        prefs: &Preferences,
        location: &Location,
    ) -> Result<WeatherResult, SkycastError> {
        let api_key = prefs.api_key.as_deref();
        let primary = (self.provider_factory)(context.provider, &self.http, api_key)?;

        let primary_err = match primary
            .fetch(location, context.unit, &context.language)
            .await
        {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };

        let fallback_kind = context.provider.fallback();
        warn!(
            "{} failed ({}), falling back to {}",
            context.provider, primary_err, fallback_kind
        );
        let fallback = (self.provider_factory)(fallback_kind, &self.http, api_key)?;
        match fallback
            .fetch(location, context.unit, &context.language)
            .await
        {
            Ok(result) => Ok(result),
            Err(fallback_err) => {
                warn!("Fallback {} also failed: {}", fallback_kind, fallback_err);
                Err(primary_err)
            }
        }
    }

    /// Check and stamp the debounce window
    fn debounced(&self) -> bool {
        let mut last = match self.last_request.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let now = Instant::now();
        let within_window = last
            .map(|prev| now.duration_since(prev) < self.debounce)
            .unwrap_or(false);
        if !within_window {
            *last = Some(now);
        }
        within_window
    }

    /// Any change to the preference snapshot invalidates the whole cache
    fn invalidate_on_preference_change(&self, prefs: &Preferences) {
        let mut last = match self.last_prefs.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match last.as_ref() {
            Some(previous) if previous == prefs => {}
            Some(_) => {
                debug!("Preferences changed, invalidating cache");
                self.cache.invalidate_all();
                *last = Some(prefs.clone());
            }
            None => {
                *last = Some(prefs.clone());
            }
        }
    }
}
