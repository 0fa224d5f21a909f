//! TTL-keyed cache for resolved locations and weather results.
//!
//! Entries expire at read time; expired entries are evicted lazily on the
//! next lookup of the same key or on explicit invalidation. An optional JSON
//! file persists the cache across restarts; unreadable or malformed files
//! are ignored and the cache starts empty.

use crate::config::{ProviderKind, Unit};
use crate::models::{Location, WeatherResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Compose the cache key: `{provider}-{unit}-{locationIdentifier}-{language}`
#[must_use]
pub fn compose_key(
    provider: ProviderKind,
    unit: Unit,
    location_identifier: &str,
    language: &str,
) -> String {
    format!("{provider}-{unit}-{location_identifier}-{language}")
}

/// Cached value: either a full weather result or a resolved location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum CachePayload {
    Weather(WeatherResult),
    Location(Location),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    payload: CachePayload,
    /// Unix timestamp (seconds)
    stored_at: u64,
}

/// TTL store shared between the foreground request path and the startup
/// preload task. All access goes through one lock; callers receive clones,
/// never references into the map.
#[derive(Debug)]
pub struct CacheStore {
    ttl: Duration,
    file: Option<PathBuf>,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl CacheStore {
    /// Create an in-memory store
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            file: None,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Create a store backed by a JSON file, seeded with whatever fresh
    /// entries the file still holds. Stale entries are skipped by the
    /// normal TTL check on lookup, not purged eagerly.
    #[must_use]
    pub fn with_file(ttl: Duration, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = load_entries(&path);
        Self {
            ttl,
            file: Some(path),
            entries: Mutex::new(entries),
        }
    }

    /// Retrieve a value if it exists and has not expired
    pub fn get(&self, key: &str) -> Option<CachePayload> {
        self.get_at(key, now_secs())
    }

    /// Store a value under a key, stamped with the current time
    pub fn set(&self, key: &str, payload: CachePayload) {
        self.set_at(key, payload, now_secs());
    }

    /// Drop every entry. Called whenever a preference that participates in
    /// the key or in response semantics changes.
    pub fn invalidate_all(&self) {
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        debug!(count = entries.len(), "Invalidating all cache entries");
        entries.clear();
        self.persist(&entries);
    }

    /// TTL-checked lookup against an explicit clock
    pub(crate) fn get_at(&self, key: &str, now: u64) -> Option<CachePayload> {
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match entries.get(key) {
            Some(entry) if now.saturating_sub(entry.stored_at) < self.ttl.as_secs() => {
                debug!(key, "Cache hit");
                Some(entry.payload.clone())
            }
            Some(_) => {
                debug!(key, "Cache entry expired");
                entries.remove(key);
                None
            }
            None => {
                debug!(key, "Cache miss");
                None
            }
        }
    }

    pub(crate) fn set_at(&self, key: &str, payload: CachePayload, now: u64) {
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.insert(
            key.to_string(),
            CacheEntry {
                payload,
                stored_at: now,
            },
        );
        self.persist(&entries);
    }

    /// Best-effort write-through. Persistence failures are logged and
    /// swallowed; the in-memory cache stays authoritative.
    fn persist(&self, entries: &HashMap<String, CacheEntry>) {
        let Some(path) = &self.file else {
            return;
        };
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                debug!("Failed to create cache directory: {}", e);
                return;
            }
        }
        match serde_json::to_string(entries) {
            Ok(json) => {
                if let Err(e) = std::fs::write(path, json) {
                    debug!("Failed to persist cache: {}", e);
                }
            }
            Err(e) => debug!("Failed to serialize cache: {}", e),
        }
    }
}

fn load_entries(path: &Path) -> HashMap<String, CacheEntry> {
    match std::fs::read_to_string(path) {
        Ok(json) => match serde_json::from_str(&json) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Ignoring malformed cache file: {}", e);
                HashMap::new()
            }
        },
        Err(_) => HashMap::new(),
    }
}
