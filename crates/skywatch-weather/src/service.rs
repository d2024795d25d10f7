//! Fetch orchestration: the single entry point every refresh trigger
//! routes through.
//!
//! The service consults the freshness policy for the requested
//! location, then serves from cache, serves-and-revalidates, or blocks
//! on the network. Overlapping fetches for one key are last-write-wins
//! by commit time; the cache enforces per-key timestamp monotonicity.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use parking_lot::Mutex;
use tokio::sync::watch;

use skywatch_core::Config;

use crate::api::{LocationQuery, WeatherApiClient};
use crate::cache::{CacheEntry, LocationKey, SnapshotCache};
use crate::error::WeatherError;
use crate::freshness::{Freshness, FreshnessPolicy, ReadPlan};
use crate::normalize;
use crate::registry::LocationRegistry;
use crate::state::WeatherState;
use crate::types::{LocationSelector, WeatherBundle};

/// How a fetch should behave. The default is a visible, cache-respecting
/// fetch that lets the network rename the displayed location.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOptions {
    /// Bypass the freshness bands and always hit the network.
    pub force_refresh: bool,
    /// Keep the currently displayed city name even if this fetch is
    /// addressed by coordinates.
    pub preserve_city: bool,
    /// Do not toggle the loading indicator and never surface errors.
    pub silent: bool,
}

impl FetchOptions {
    /// Options used by background paths: silent and city-preserving.
    pub fn background() -> Self {
        Self {
            force_refresh: false,
            preserve_city: true,
            silent: true,
        }
    }
}

/// Non-freshness tunables the orchestrator needs.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub forecast_days: u32,
    pub hourly_hours: usize,
    pub now_window: Duration,
    pub sweep_max_age: Duration,
}

impl ServiceSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            forecast_days: config.forecast.daily_days,
            hourly_hours: config.forecast.hourly_hours,
            now_window: Duration::seconds(config.forecast.now_window_secs as i64),
            sweep_max_age: Duration::seconds(config.cache.sweep_max_age_secs as i64),
        }
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

struct ServiceInner {
    api: WeatherApiClient,
    cache: Arc<Mutex<SnapshotCache>>,
    registry: LocationRegistry,
    policy: FreshnessPolicy,
    settings: ServiceSettings,
    state_tx: watch::Sender<WeatherState>,
}

/// The fetch orchestrator. Cheap to clone; all clones share one cache,
/// registry, and state channel.
#[derive(Clone)]
pub struct WeatherService {
    inner: Arc<ServiceInner>,
}

impl WeatherService {
    /// Build the service and its owned parts from configuration.
    pub fn new(config: &Config, registry: LocationRegistry) -> Result<Self, WeatherError> {
        let api = WeatherApiClient::new(
            &config.api.base_url,
            StdDuration::from_secs(config.api.request_timeout_secs),
        )?;
        let cache = Arc::new(Mutex::new(SnapshotCache::new(config.cache.max_entries)));
        Ok(Self::with_parts(
            api,
            cache,
            registry,
            FreshnessPolicy::from_config(&config.cache),
            ServiceSettings::from_config(config),
        ))
    }

    /// Build the service around explicitly-owned collaborators. Lets
    /// tests seed the cache and registry with isolated instances.
    pub fn with_parts(
        api: WeatherApiClient,
        cache: Arc<Mutex<SnapshotCache>>,
        registry: LocationRegistry,
        policy: FreshnessPolicy,
        settings: ServiceSettings,
    ) -> Self {
        let (state_tx, _) = watch::channel(WeatherState::default());
        Self {
            inner: Arc::new(ServiceInner {
                api,
                cache,
                registry,
                policy,
                settings,
                state_tx,
            }),
        }
    }

    /// Subscribe to UI-facing state updates.
    pub fn subscribe(&self) -> watch::Receiver<WeatherState> {
        self.inner.state_tx.subscribe()
    }

    /// Current UI-facing state.
    pub fn state(&self) -> WeatherState {
        self.inner.state_tx.borrow().clone()
    }

    pub fn registry(&self) -> &LocationRegistry {
        &self.inner.registry
    }

    /// Freshness of the cached entry a fetch for `selector` would read,
    /// or `None` when nothing is cached.
    pub fn cached_freshness(
        &self,
        selector: &LocationSelector,
        preserve_city: bool,
    ) -> Option<Freshness> {
        let city = self.effective_city(selector, preserve_city);
        let key = LocationKey::derive(city.as_deref(), selector.coords)?;
        let cache = self.inner.cache.lock();
        let entry = cache.get(&key)?;
        Some(
            self.inner
                .policy
                .classify(SnapshotCache::age(entry, Utc::now())),
        )
    }

    /// Fetch weather for a location and publish it to subscribers.
    ///
    /// Serves from cache when the freshness policy allows it; a stale
    /// hit is served immediately and revalidated by a background task.
    /// Errors from silent fetches are logged and swallowed.
    pub async fn fetch_weather(
        &self,
        selector: LocationSelector,
        options: FetchOptions,
    ) -> Result<(), WeatherError> {
        let city = self.effective_city(&selector, options.preserve_city);
        let Some(key) = LocationKey::derive(city.as_deref(), selector.coords) else {
            return Err(WeatherError::MissingLocation);
        };

        let now = Utc::now();
        let cached: Option<CacheEntry> = self.inner.cache.lock().get(&key).cloned();
        let age = cached.as_ref().map(|entry| SnapshotCache::age(entry, now));

        match self.inner.policy.plan(age, options.force_refresh) {
            ReadPlan::ServeCached => {
                if let Some(entry) = cached {
                    tracing::debug!("Serving fresh cache for {}", key);
                    self.publish_cached(&entry);
                }
                Ok(())
            }
            ReadPlan::ServeThenRevalidate => {
                if let Some(entry) = cached {
                    tracing::debug!("Serving stale cache for {}, revalidating", key);
                    self.publish_cached(&entry);
                }
                self.spawn_revalidation(selector, options.preserve_city);
                Ok(())
            }
            ReadPlan::FetchBlocking => {
                self.set_indicator(options.silent, true);
                let result = self.fetch_and_commit(&key, city, &selector, options).await;
                self.set_indicator(options.silent, false);

                match result {
                    Ok(()) => Ok(()),
                    Err(err) => {
                        // Last resort: a not-yet-expired entry is still
                        // better than nothing. Its timestamp stays put.
                        if let (Some(entry), Some(age)) = (&cached, age) {
                            if self.inner.policy.classify(age) != Freshness::Expired {
                                tracing::warn!(
                                    "Fetch for {} failed, falling back to cache: {}",
                                    key,
                                    err
                                );
                                self.publish_cached(entry);
                            }
                        }
                        if options.silent {
                            tracing::warn!("Silent fetch for {} failed: {}", key, err);
                            Ok(())
                        } else {
                            Err(err)
                        }
                    }
                }
            }
        }
    }

    /// Drop cache entries past the sweep age. Called periodically by
    /// the session, independent of access patterns.
    pub fn run_sweep(&self) {
        let removed = self
            .inner
            .cache
            .lock()
            .sweep(self.inner.settings.sweep_max_age, Utc::now());
        if removed > 0 {
            tracing::debug!("Cache sweep removed {} entries", removed);
        }
    }

    /// The city a fetch should address: the preserved one when asked
    /// for and known, else whatever the caller supplied.
    fn effective_city(&self, selector: &LocationSelector, preserve_city: bool) -> Option<String> {
        if preserve_city {
            if let Some(city) = self.inner.registry.preserved_city() {
                return Some(city);
            }
        }
        selector.city.clone()
    }

    async fn fetch_and_commit(
        &self,
        key: &LocationKey,
        query_city: Option<String>,
        selector: &LocationSelector,
        options: FetchOptions,
    ) -> Result<(), WeatherError> {
        let settings = &self.inner.settings;
        let query = LocationQuery {
            city: query_city,
            coords: selector.coords,
        };

        let (current, forecast, hourly) = tokio::try_join!(
            self.inner.api.current(&query),
            self.inner.api.forecast(&query, settings.forecast_days),
            self.inner.api.hourly(&query, settings.hourly_hours as u32),
        )?;

        let now = Utc::now();
        let display_city = if options.preserve_city {
            self.inner.registry.preserved_city()
        } else {
            None
        };
        let bundle = normalize::build_bundle(
            &current,
            &forecast.forecast,
            &hourly.hourly,
            display_city.as_deref(),
            settings.hourly_hours,
            settings.now_window,
            now,
        );

        self.inner
            .cache
            .lock()
            .insert(key.clone(), bundle.clone(), now);
        self.inner.registry.commit(bundle.location.clone());
        self.publish_fetched(bundle, now);
        Ok(())
    }

    /// Queue a forced, silent refetch of the same location. The caller
    /// that triggered the stale serve is never blocked on this; its
    /// failures are logged inside the silent path.
    fn spawn_revalidation(&self, selector: LocationSelector, preserve_city: bool) {
        let service = self.clone();
        tokio::spawn(async move {
            let _ = service
                .fetch_weather(
                    selector,
                    FetchOptions {
                        force_refresh: true,
                        preserve_city,
                        silent: true,
                    },
                )
                .await;
        });
    }

    fn publish_cached(&self, entry: &CacheEntry) {
        self.inner.registry.commit(entry.bundle.location.clone());
        let bundle = entry.bundle.clone();
        let timestamp = entry.timestamp;
        self.inner.state_tx.send_modify(|state| {
            state.weather = Some(bundle.snapshot.clone());
            state.current_location = Some(bundle.location.clone());
            state.daily_forecast = bundle.daily.clone();
            state.hourly_forecast = bundle.hourly.clone();
            state.last_updated = Some(timestamp);
            state.is_loading = false;
        });
    }

    fn publish_fetched(&self, bundle: WeatherBundle, now: chrono::DateTime<Utc>) {
        self.inner.state_tx.send_modify(|state| {
            state.weather = Some(bundle.snapshot.clone());
            state.current_location = Some(bundle.location.clone());
            state.daily_forecast = bundle.daily.clone();
            state.hourly_forecast = bundle.hourly.clone();
            state.last_updated = Some(now);
        });
    }

    fn set_indicator(&self, silent: bool, on: bool) {
        self.inner.state_tx.send_modify(|state| {
            if silent {
                state.is_refreshing = on;
            } else {
                state.is_loading = on;
            }
        });
    }
}

impl std::fmt::Debug for WeatherService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherService")
            .field("cache_len", &self.inner.cache.lock().len())
            .finish()
    }
}
