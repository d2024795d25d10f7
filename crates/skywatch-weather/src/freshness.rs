//! Staleness classification for cached weather entries.

use chrono::Duration;

/// Age band of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Young enough to serve without any network traffic.
    Fresh,
    /// Still servable, but a background revalidation is due.
    Stale,
    /// No longer servable as authoritative data.
    Expired,
}

/// What a read should do given the cache state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPlan {
    /// Serve the cached bundle; no network traffic.
    ServeCached,
    /// Serve the cached bundle immediately, then revalidate in the
    /// background.
    ServeThenRevalidate,
    /// Nothing servable; the caller waits for the network.
    FetchBlocking,
}

#[derive(Debug, Clone)]
pub struct FreshnessPolicy {
    pub stale_after: Duration,
    pub expire_after: Duration,
}

impl FreshnessPolicy {
    pub fn new(stale_after: Duration, expire_after: Duration) -> Self {
        Self {
            stale_after,
            expire_after,
        }
    }

    pub fn from_config(cache: &skywatch_core::CacheConfig) -> Self {
        Self::new(
            Duration::seconds(cache.stale_secs as i64),
            Duration::seconds(cache.expire_secs as i64),
        )
    }

    pub fn classify(&self, age: Duration) -> Freshness {
        if age < self.stale_after {
            Freshness::Fresh
        } else if age < self.expire_after {
            Freshness::Stale
        } else {
            Freshness::Expired
        }
    }

    /// Decide how a read is served. `force` bypasses the bands, and a
    /// missing entry always blocks on the network.
    pub fn plan(&self, age: Option<Duration>, force: bool) -> ReadPlan {
        if force {
            return ReadPlan::FetchBlocking;
        }
        match age.map(|a| self.classify(a)) {
            Some(Freshness::Fresh) => ReadPlan::ServeCached,
            Some(Freshness::Stale) => ReadPlan::ServeThenRevalidate,
            Some(Freshness::Expired) | None => ReadPlan::FetchBlocking,
        }
    }
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self::from_config(&skywatch_core::CacheConfig::default())
    }
}
