//! Bounded in-memory cache of weather bundles keyed by location.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::types::WeatherBundle;

/// Cache lookup key derived from a city name or a coordinate pair.
///
/// Two textual forms of the same place may produce different keys; that
/// is a known limitation, not an invariant violation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocationKey(String);

impl LocationKey {
    /// Key for a resolved city name.
    pub fn for_city(city: &str) -> Self {
        Self(city.trim().to_string())
    }

    /// Key for a raw coordinate pair.
    pub fn for_coords(lat: f64, lon: f64) -> Self {
        Self(format!("{},{}", lat, lon))
    }

    /// Derive a key the way every fetch path does: the city wins when
    /// present, coordinates otherwise.
    pub fn derive(city: Option<&str>, coords: Option<(f64, f64)>) -> Option<Self> {
        match (city, coords) {
            (Some(c), _) if !c.trim().is_empty() => Some(Self::for_city(c)),
            (_, Some((lat, lon))) => Some(Self::for_coords(lat, lon)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LocationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A cached weather bundle with its commit time.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub bundle: WeatherBundle,
    pub timestamp: DateTime<Utc>,
}

/// Bounded in-memory store; the oldest-by-timestamp entry is evicted
/// first when the store overflows.
#[derive(Debug)]
pub struct SnapshotCache {
    entries: HashMap<LocationKey, CacheEntry>,
    max_entries: usize,
}

impl SnapshotCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            max_entries: max_entries.max(1),
        }
    }

    pub fn get(&self, key: &LocationKey) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Age of an entry at `now`. Never negative, even if the entry's
    /// timestamp is ahead of `now`.
    pub fn age(entry: &CacheEntry, now: DateTime<Utc>) -> Duration {
        (now - entry.timestamp).max(Duration::zero())
    }

    /// Store a bundle, overwriting any entry for the same key.
    ///
    /// Timestamps are monotonically non-decreasing per key, and the
    /// size bound is re-enforced after every insert.
    pub fn insert(&mut self, key: LocationKey, bundle: WeatherBundle, now: DateTime<Utc>) {
        let timestamp = match self.entries.get(&key) {
            Some(existing) => now.max(existing.timestamp),
            None => now,
        };
        self.entries.insert(key, CacheEntry { bundle, timestamp });
        self.evict_overflow();
    }

    /// Drop entries older than `max_age`, regardless of access
    /// patterns. Returns how many were removed.
    pub fn sweep(&mut self, max_age: Duration, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| now - entry.timestamp <= max_age);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_overflow(&mut self) {
        while self.entries.len() > self.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.timestamp)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    tracing::debug!("Evicting cached weather for {}", key);
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }
}
