//! Data types shared across the weather subsystem.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The location currently driving polling and display.
///
/// Committed by completed fetches; triggers may record provisional
/// coordinates ahead of the network reconciling them (see
/// [`crate::registry::LocationRegistry`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationDescriptor {
    pub lat: f64,
    pub lon: f64,
    pub city: Option<String>,
    pub detailed_address: Option<String>,
}

impl LocationDescriptor {
    /// Provisional descriptor for a raw coordinate fix (map click, GPS).
    pub fn provisional(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            city: None,
            detailed_address: None,
        }
    }
}

/// What a caller is asking to fetch: a free-text city, coordinates, or both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationSelector {
    pub city: Option<String>,
    pub coords: Option<(f64, f64)>,
}

impl LocationSelector {
    /// Select by city name.
    pub fn city(name: impl Into<String>) -> Self {
        Self {
            city: Some(name.into()),
            coords: None,
        }
    }

    /// Select by coordinate pair.
    pub fn coords(lat: f64, lon: f64) -> Self {
        Self {
            city: None,
            coords: Some((lat, lon)),
        }
    }

    /// Selector addressing an active location: its city when known,
    /// always its coordinates.
    pub fn for_location(location: &LocationDescriptor) -> Self {
        Self {
            city: location.city.clone(),
            coords: Some((location.lat, location.lon)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.city.is_none() && self.coords.is_none()
    }
}

/// Normalized current conditions for one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub temperature: f64,
    pub condition: String,
    /// Display name of the place these conditions describe.
    pub location: String,
    /// Relative humidity in percent, clamped to `[0, 100]`.
    pub humidity: u8,
    pub wind_speed: f64,
    /// Raw WMO weather classification code.
    pub weather_code: i32,
    pub temp_max: f64,
    pub temp_min: f64,
    /// Chance of rain in percent.
    pub rain_chance: u8,
    /// Surface pressure in hPa.
    pub pressure: f64,
    pub updated_at: DateTime<Utc>,
}

/// One day of the daily forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecastEntry {
    /// "Today" for the first entry, the weekday name after that.
    pub label: String,
    pub date: NaiveDate,
    pub temp_max: f64,
    pub temp_min: f64,
    pub weather_code: i32,
    pub condition: String,
    pub wind_speed: f64,
    pub humidity: u8,
    pub pressure: f64,
    pub rain_chance: u8,
}

/// One hour of the hourly forecast.
///
/// The entry closest to the current time carries `is_now` and has its
/// values overridden with live current conditions; every other entry
/// keeps its forecast-sourced values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyForecastEntry {
    pub time: DateTime<Utc>,
    pub is_now: bool,
    pub temperature: f64,
    pub weather_code: i32,
    pub condition: Option<String>,
    pub wind_speed: Option<f64>,
    pub humidity: Option<u8>,
    pub precipitation: Option<f64>,
    pub rain_chance: Option<u8>,
}

/// Everything a successful fetch produces for one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherBundle {
    pub snapshot: WeatherSnapshot,
    pub location: LocationDescriptor,
    pub daily: Vec<DailyForecastEntry>,
    pub hourly: Vec<HourlyForecastEntry>,
}
