//! Observable UI-facing state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{DailyForecastEntry, HourlyForecastEntry, LocationDescriptor, WeatherSnapshot};

/// Everything the UI renders from, published through a
/// `tokio::sync::watch` channel by the service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeatherState {
    pub weather: Option<WeatherSnapshot>,
    pub current_location: Option<LocationDescriptor>,
    pub daily_forecast: Vec<DailyForecastEntry>,
    pub hourly_forecast: Vec<HourlyForecastEntry>,
    /// A visible fetch is in flight; show a loading surface.
    pub is_loading: bool,
    /// A silent fetch is in flight; show at most a subtle spinner.
    pub is_refreshing: bool,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Humanize the age of a timestamp ("5 minutes ago").
pub fn time_ago(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - timestamp).num_seconds().max(0);
    if seconds < 60 {
        return format!("{} seconds ago", seconds);
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{} minutes ago", minutes);
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{} hours ago", hours);
    }
    format!("{} days ago", hours / 24)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_time_ago_bands() {
        let now = Utc::now();
        assert_eq!(time_ago(now - Duration::seconds(10), now), "10 seconds ago");
        assert_eq!(time_ago(now - Duration::minutes(5), now), "5 minutes ago");
        assert_eq!(time_ago(now - Duration::hours(3), now), "3 hours ago");
        assert_eq!(time_ago(now - Duration::days(2), now), "2 days ago");
    }

    #[test]
    fn test_time_ago_future_timestamp_clamps_to_zero() {
        let now = Utc::now();
        assert_eq!(time_ago(now + Duration::minutes(1), now), "0 seconds ago");
    }

    #[test]
    fn test_default_state_is_empty() {
        let state = WeatherState::default();
        assert!(state.weather.is_none());
        assert!(!state.is_loading);
        assert!(state.daily_forecast.is_empty());
    }
}
