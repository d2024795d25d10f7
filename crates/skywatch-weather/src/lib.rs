//! Weather data caching and refresh coordination for Skywatch.
//!
//! This crate is the data core a UI shell consumes: a bounded
//! stale-while-revalidate cache of weather snapshots per location, a
//! fetch orchestrator over the remote weather backend, an adaptive
//! background poll scheduler, and a coordinator that funnels every
//! refresh trigger (startup, focus, reconnect, pull-to-refresh, GPS,
//! search) through the same entry point.

pub mod api;
pub mod cache;
pub mod error;
pub mod freshness;
pub mod normalize;
pub mod registry;
pub mod scheduler;
pub mod service;
pub mod session;
pub mod state;
pub mod triggers;
pub mod types;

pub use api::{LocationQuery, WeatherApiClient};
pub use cache::{CacheEntry, LocationKey, SnapshotCache};
pub use error::WeatherError;
pub use freshness::{Freshness, FreshnessPolicy, ReadPlan};
pub use registry::LocationRegistry;
pub use scheduler::{
    ConnectionProfile, ConnectionQuality, EnvironmentProbe, PollPolicy, PollScheduler, StaticProbe,
};
pub use service::{FetchOptions, ServiceSettings, WeatherService};
pub use session::WeatherSession;
pub use state::{time_ago, WeatherState};
pub use triggers::TriggerCoordinator;
pub use types::{
    DailyForecastEntry, HourlyForecastEntry, LocationDescriptor, LocationSelector, WeatherBundle,
    WeatherSnapshot,
};
