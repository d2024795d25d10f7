//! Fan-in of refresh triggers onto the fetch orchestrator.
//!
//! Each trigger source gets its own admission policy (one-shot startup,
//! focus debounce, GPS displacement and settle filters); all of them
//! end in the same [`WeatherService::fetch_weather`] call. Concurrency
//! of the call itself is the orchestrator's problem, not ours.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use skywatch_core::Config;

use crate::error::WeatherError;
use crate::freshness::Freshness;
use crate::service::{FetchOptions, WeatherService};
use crate::types::LocationSelector;

const METERS_PER_DEGREE: f64 = 111_320.0;

/// Equirectangular distance approximation, adequate at city scale.
pub fn displacement_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let mean_lat = ((lat1 + lat2) / 2.0).to_radians();
    let x = (lon2 - lon1) * mean_lat.cos();
    let y = lat2 - lat1;
    (x * x + y * y).sqrt() * METERS_PER_DEGREE
}

/// Routes every refresh source through the orchestrator with per-source
/// admission policy.
pub struct TriggerCoordinator {
    service: WeatherService,
    default_city: String,
    min_focus_refresh: Duration,
    gps_settle: StdDuration,
    gps_min_displacement_meters: f64,
    started: AtomicBool,
    last_focus_refresh: Mutex<Option<DateTime<Utc>>>,
    gps_generation: Arc<AtomicU64>,
}

impl TriggerCoordinator {
    pub fn new(service: WeatherService, config: &Config) -> Self {
        Self {
            service,
            default_city: config.default_city.clone(),
            min_focus_refresh: Duration::seconds(config.triggers.min_focus_refresh_secs as i64),
            gps_settle: StdDuration::from_millis(config.triggers.gps_settle_ms),
            gps_min_displacement_meters: config.triggers.gps_min_displacement_meters,
            started: AtomicBool::new(false),
            last_focus_refresh: Mutex::new(None),
            gps_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Initial fetch of the default city. Runs at most once per
    /// coordinator no matter how often the shell re-invokes it.
    pub async fn start(&self) -> Result<(), WeatherError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        tracing::info!("Initial fetch for {}", self.default_city);
        self.service
            .fetch_weather(
                LocationSelector::city(&self.default_city),
                FetchOptions::default(),
            )
            .await
    }

    /// Window focus or visibility regained. Debounced, and skipped
    /// entirely while the cached entry is still fresh.
    pub async fn on_focus(&self) {
        let Some(location) = self.service.registry().current() else {
            return;
        };
        let now = Utc::now();
        {
            let last = self.last_focus_refresh.lock();
            if let Some(prev) = *last {
                if now - prev < self.min_focus_refresh {
                    return;
                }
            }
        }

        let selector = LocationSelector::for_location(&location);
        if self.service.cached_freshness(&selector, true) == Some(Freshness::Fresh) {
            return;
        }

        *self.last_focus_refresh.lock() = Some(now);
        let _ = self
            .service
            .fetch_weather(selector, FetchOptions::background())
            .await;
    }

    /// Connectivity restored. Always worth asking again; the freshness
    /// policy still decides whether the network is actually hit.
    pub async fn on_online(&self) {
        let Some(location) = self.service.registry().current() else {
            return;
        };
        let _ = self
            .service
            .fetch_weather(
                LocationSelector::for_location(&location),
                FetchOptions::background(),
            )
            .await;
    }

    /// Explicit pull-to-refresh. Visible and forced; the error comes
    /// back to the caller so the UI can tell rate limiting apart from
    /// a generic failure.
    pub async fn refresh(&self) -> Result<(), WeatherError> {
        let Some(location) = self.service.registry().current() else {
            return Err(WeatherError::MissingLocation);
        };
        self.service
            .fetch_weather(
                LocationSelector::for_location(&location),
                FetchOptions {
                    force_refresh: true,
                    preserve_city: true,
                    silent: false,
                },
            )
            .await
    }

    /// Search result or explicit city switch.
    pub async fn on_city_selected(&self, city: &str) -> Result<(), WeatherError> {
        self.service
            .fetch_weather(LocationSelector::city(city), FetchOptions::default())
            .await
    }

    /// Map click: the tapped coordinates become provisional until the
    /// fetch resolves them.
    pub async fn on_map_click(&self, lat: f64, lon: f64) -> Result<(), WeatherError> {
        self.service.registry().set_provisional(lat, lon);
        self.service
            .fetch_weather(LocationSelector::coords(lat, lon), FetchOptions::default())
            .await
    }

    /// New GPS fix from the shell's geolocation source.
    ///
    /// Fixes within the displacement threshold of the active location
    /// are dropped. Accepted fixes must stand unreplaced for the settle
    /// period before they trigger a fetch; a newer fix supersedes a
    /// pending one. Coordinates, not the city name, are authoritative
    /// for GPS-driven updates.
    pub fn on_gps_fix(&self, lat: f64, lon: f64) {
        if let Some(current) = self.service.registry().current() {
            let moved = displacement_meters(current.lat, current.lon, lat, lon);
            if moved < self.gps_min_displacement_meters {
                tracing::trace!("GPS fix moved {:.0} m, below threshold", moved);
                return;
            }
        }

        self.service.registry().set_provisional(lat, lon);
        let generation = self.gps_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generations = Arc::clone(&self.gps_generation);
        let service = self.service.clone();
        let settle = self.gps_settle;
        tokio::spawn(async move {
            tokio::time::sleep(settle).await;
            if generations.load(Ordering::SeqCst) != generation {
                return;
            }
            if let Err(err) = service
                .fetch_weather(LocationSelector::coords(lat, lon), FetchOptions::default())
                .await
            {
                tracing::warn!("GPS-driven refresh failed: {}", err);
            }
        });
    }
}
