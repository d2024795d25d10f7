//! Normalization of upstream payloads into display-ready bundles.
//!
//! Upstream data is allowed to be sparse or malformed (missing
//! humidity, NaN readings); everything here recovers with defaults
//! instead of erroring.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::api::{CurrentResponse, ForecastDay, ForecastHour};
use crate::types::{
    DailyForecastEntry, HourlyForecastEntry, LocationDescriptor, WeatherBundle, WeatherSnapshot,
};

pub const DEFAULT_HUMIDITY: u8 = 65;
pub const DEFAULT_RAIN_CHANCE: u8 = 10;
const DEFAULT_PRESSURE: f64 = 1012.0;
const DEFAULT_DAILY_PRESSURE: f64 = 1013.0;
const DEFAULT_TEMP_MAX: f64 = 24.0;
const DEFAULT_TEMP_MIN: f64 = 18.0;

/// Clamp a percent reading into `[0, 100]`, falling back to `default`
/// when the value is absent or NaN.
pub fn clamp_percent(raw: Option<f64>, default: u8) -> u8 {
    match raw {
        Some(value) if value.is_finite() => value.round().clamp(0.0, 100.0) as u8,
        _ => default,
    }
}

/// Humidity for the current conditions: the live reading when usable,
/// else today's forecast humidity, else the default.
pub fn resolve_humidity(current: Option<f64>, forecast_fallback: Option<f64>) -> u8 {
    let raw = match current {
        Some(value) if value.is_finite() => Some(value),
        _ => forecast_fallback,
    };
    clamp_percent(raw, DEFAULT_HUMIDITY)
}

/// Reduce a comma-separated display name to its final segment
/// ("Hoan Kiem, Hanoi" becomes "Hanoi").
pub fn extract_city_name(raw: &str) -> String {
    if let Some(last) = raw.rsplit(',').next() {
        if !last.trim().is_empty() {
            return last.trim().to_string();
        }
    }
    raw.trim().to_string()
}

fn day_label(index: usize, date: NaiveDate) -> String {
    if index == 0 {
        "Today".to_string()
    } else {
        date.format("%A").to_string()
    }
}

fn finite_or(raw: Option<f64>, default: f64) -> f64 {
    match raw {
        Some(value) if value.is_finite() => value,
        _ => default,
    }
}

/// Map the daily forecast; day 0 is labeled "Today", the rest by
/// weekday name.
pub fn daily_entries(days: &[ForecastDay]) -> Vec<DailyForecastEntry> {
    days.iter()
        .enumerate()
        .map(|(index, day)| DailyForecastEntry {
            label: day_label(index, day.date),
            date: day.date,
            temp_max: day.temp_max,
            temp_min: day.temp_min,
            weather_code: day.weather_code,
            condition: day.condition.clone(),
            wind_speed: day.wind_speed,
            humidity: clamp_percent(day.humidity, DEFAULT_HUMIDITY),
            pressure: finite_or(day.pressure, DEFAULT_DAILY_PRESSURE),
            rain_chance: clamp_percent(day.precipitation_probability, 0),
        })
        .collect()
}

/// Live current-conditions values substituted onto the "now" hour.
#[derive(Debug, Clone)]
pub struct NowOverride {
    pub temperature: f64,
    pub weather_code: i32,
    pub condition: Option<String>,
    pub wind_speed: Option<f64>,
    pub humidity: Option<u8>,
    pub rain_chance: Option<u8>,
}

/// Map the hourly forecast, flagging the entry within `now_window` of
/// `now` and substituting live values onto that one entry only.
pub fn hourly_entries(
    hours: &[ForecastHour],
    limit: usize,
    now: DateTime<Utc>,
    now_window: Duration,
    live: &NowOverride,
) -> Vec<HourlyForecastEntry> {
    hours
        .iter()
        .take(limit)
        .map(|hour| {
            let is_now = (hour.time - now).abs() <= now_window;
            HourlyForecastEntry {
                time: hour.time,
                is_now,
                temperature: if is_now { live.temperature } else { hour.temperature },
                weather_code: if is_now { live.weather_code } else { hour.weather_code },
                condition: if is_now && live.condition.is_some() {
                    live.condition.clone()
                } else {
                    hour.condition.clone()
                },
                wind_speed: if is_now && live.wind_speed.is_some() {
                    live.wind_speed
                } else {
                    hour.wind_speed
                },
                humidity: if is_now && live.humidity.is_some() {
                    live.humidity
                } else {
                    hour.humidity.map(|h| clamp_percent(Some(h), DEFAULT_HUMIDITY))
                },
                precipitation: hour.precipitation,
                rain_chance: if is_now && live.rain_chance.is_some() {
                    live.rain_chance
                } else {
                    hour.precipitation_probability.map(|p| clamp_percent(Some(p), 0))
                },
            }
        })
        .collect()
}

/// Build the full bundle from the three upstream responses.
///
/// `display_city` overrides the upstream place name when a caller asked
/// for city preservation; otherwise the upstream resolution wins.
pub fn build_bundle(
    current: &CurrentResponse,
    forecast: &[ForecastDay],
    hourly: &[ForecastHour],
    display_city: Option<&str>,
    hourly_limit: usize,
    now_window: Duration,
    now: DateTime<Utc>,
) -> WeatherBundle {
    let day0 = forecast.first();
    let humidity = resolve_humidity(current.weather.humidity, day0.and_then(|d| d.humidity));
    let rain_chance = clamp_percent(current.weather.precipitation, DEFAULT_RAIN_CHANCE);

    let city = display_city
        .map(str::to_string)
        .or_else(|| current.location.city.clone())
        .map(|c| extract_city_name(&c));

    let snapshot = WeatherSnapshot {
        temperature: current.weather.temperature,
        condition: current.weather.condition.clone(),
        location: city.clone().unwrap_or_default(),
        humidity,
        wind_speed: current.weather.wind_speed,
        weather_code: current.weather.weather_code,
        temp_max: day0.map(|d| d.temp_max).unwrap_or(DEFAULT_TEMP_MAX),
        temp_min: day0.map(|d| d.temp_min).unwrap_or(DEFAULT_TEMP_MIN),
        rain_chance,
        pressure: finite_or(current.weather.pressure, DEFAULT_PRESSURE),
        updated_at: current.timestamp,
    };

    let location = LocationDescriptor {
        lat: current.location.lat,
        lon: current.location.lon,
        city,
        detailed_address: current
            .location
            .detailed_address
            .clone()
            .or_else(|| current.location.city.clone()),
    };

    let live = NowOverride {
        temperature: snapshot.temperature,
        weather_code: snapshot.weather_code,
        condition: Some(snapshot.condition.clone()),
        wind_speed: Some(snapshot.wind_speed),
        humidity: Some(humidity),
        rain_chance: Some(rain_chance),
    };

    WeatherBundle {
        snapshot,
        location,
        daily: daily_entries(forecast),
        hourly: hourly_entries(hourly, hourly_limit, now, now_window, &live),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::api::{ApiConditions, ApiLocation};

    fn forecast_day(date: &str) -> ForecastDay {
        ForecastDay {
            date: date.parse().unwrap(),
            temp_max: 33.0,
            temp_min: 26.0,
            weather_code: 2,
            condition: "Partly cloudy".to_string(),
            wind_speed: 4.0,
            precipitation_probability: Some(40.0),
            humidity: Some(75.0),
            pressure: Some(1008.0),
        }
    }

    fn forecast_hour(time: DateTime<Utc>, temperature: f64) -> ForecastHour {
        ForecastHour {
            time,
            temperature,
            weather_code: 3,
            condition: Some("Overcast".to_string()),
            wind_speed: Some(2.0),
            humidity: Some(70.0),
            precipitation: Some(0.4),
            precipitation_probability: Some(35.0),
        }
    }

    fn current(humidity: Option<f64>) -> CurrentResponse {
        CurrentResponse {
            location: ApiLocation {
                lat: 21.0285,
                lon: 105.8542,
                city: Some("Hanoi".to_string()),
                detailed_address: Some("Hoan Kiem, Hanoi".to_string()),
            },
            weather: ApiConditions {
                temperature: 30.0,
                condition: "Clear".to_string(),
                humidity,
                wind_speed: 3.0,
                weather_code: 0,
                precipitation: Some(20.0),
                pressure: Some(1010.0),
            },
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_percent_clamping_table() {
        assert_eq!(clamp_percent(None, DEFAULT_HUMIDITY), 65);
        assert_eq!(clamp_percent(Some(f64::NAN), DEFAULT_HUMIDITY), 65);
        assert_eq!(clamp_percent(Some(-5.0), DEFAULT_HUMIDITY), 0);
        assert_eq!(clamp_percent(Some(150.0), DEFAULT_HUMIDITY), 100);
        assert_eq!(clamp_percent(Some(42.4), DEFAULT_HUMIDITY), 42);
        assert_eq!(clamp_percent(Some(42.6), DEFAULT_HUMIDITY), 43);
    }

    #[test]
    fn test_humidity_falls_back_to_forecast_then_default() {
        assert_eq!(resolve_humidity(Some(55.0), Some(80.0)), 55);
        assert_eq!(resolve_humidity(None, Some(80.0)), 80);
        assert_eq!(resolve_humidity(Some(f64::NAN), Some(80.0)), 80);
        assert_eq!(resolve_humidity(None, None), 65);
    }

    #[test]
    fn test_extract_city_name() {
        assert_eq!(extract_city_name("Hanoi"), "Hanoi");
        assert_eq!(extract_city_name("Hoan Kiem, Hanoi"), "Hanoi");
        assert_eq!(extract_city_name("a, b, c"), "c");
        assert_eq!(extract_city_name("  Hue  "), "Hue");
    }

    #[test]
    fn test_day_zero_is_today() {
        let days = vec![forecast_day("2026-08-06"), forecast_day("2026-08-07")];
        let entries = daily_entries(&days);

        assert_eq!(entries[0].label, "Today");
        // 2026-08-07 is a Friday
        assert_eq!(entries[1].label, "Friday");
        assert_eq!(entries[0].humidity, 75);
        assert_eq!(entries[0].rain_chance, 40);
    }

    #[test]
    fn test_now_hour_substitution_is_exclusive() {
        let now = Utc::now();
        let hours = vec![
            forecast_hour(now - Duration::minutes(5), 27.0),
            forecast_hour(now + Duration::hours(1), 26.0),
            forecast_hour(now + Duration::hours(2), 25.0),
        ];
        let live = NowOverride {
            temperature: 30.0,
            weather_code: 0,
            condition: Some("Clear".to_string()),
            wind_speed: Some(3.0),
            humidity: Some(65),
            rain_chance: Some(10),
        };

        let entries = hourly_entries(&hours, 8, now, Duration::minutes(30), &live);

        assert!(entries[0].is_now);
        assert_eq!(entries[0].temperature, 30.0);
        assert_eq!(entries[0].weather_code, 0);
        assert_eq!(entries[0].condition.as_deref(), Some("Clear"));

        assert!(!entries[1].is_now);
        assert_eq!(entries[1].temperature, 26.0);
        assert_eq!(entries[1].weather_code, 3);
        assert!(!entries[2].is_now);
        assert_eq!(entries[2].temperature, 25.0);
    }

    #[test]
    fn test_hour_outside_window_is_not_now() {
        let now = Utc::now();
        let hours = vec![forecast_hour(now + Duration::minutes(31), 27.0)];
        let live = NowOverride {
            temperature: 30.0,
            weather_code: 0,
            condition: None,
            wind_speed: None,
            humidity: None,
            rain_chance: None,
        };

        let entries = hourly_entries(&hours, 8, now, Duration::minutes(30), &live);
        assert!(!entries[0].is_now);
        assert_eq!(entries[0].temperature, 27.0);
    }

    #[test]
    fn test_hourly_limit_applied() {
        let now = Utc::now();
        let hours: Vec<_> = (0..24)
            .map(|i| forecast_hour(now + Duration::hours(i), 25.0))
            .collect();
        let live = NowOverride {
            temperature: 30.0,
            weather_code: 0,
            condition: None,
            wind_speed: None,
            humidity: None,
            rain_chance: None,
        };

        assert_eq!(hourly_entries(&hours, 8, now, Duration::minutes(30), &live).len(), 8);
    }

    #[test]
    fn test_bundle_defaults_when_forecast_empty() {
        let bundle = build_bundle(
            &current(None),
            &[],
            &[],
            None,
            8,
            Duration::minutes(30),
            Utc::now(),
        );

        assert_eq!(bundle.snapshot.temp_max, DEFAULT_TEMP_MAX);
        assert_eq!(bundle.snapshot.temp_min, DEFAULT_TEMP_MIN);
        assert_eq!(bundle.snapshot.humidity, DEFAULT_HUMIDITY);
        assert_eq!(bundle.snapshot.rain_chance, 20);
    }

    #[test]
    fn test_bundle_prefers_display_city() {
        let bundle = build_bundle(
            &current(Some(70.0)),
            &[forecast_day("2026-08-06")],
            &[],
            Some("Da Nang"),
            8,
            Duration::minutes(30),
            Utc::now(),
        );

        assert_eq!(bundle.snapshot.location, "Da Nang");
        assert_eq!(bundle.location.city.as_deref(), Some("Da Nang"));
        // The detailed address still reflects what upstream resolved.
        assert_eq!(bundle.location.detailed_address.as_deref(), Some("Hoan Kiem, Hanoi"));
    }

    #[test]
    fn test_bundle_extracts_city_from_compound_name() {
        let mut response = current(Some(70.0));
        response.location.city = Some("Hoan Kiem, Hanoi".to_string());

        let bundle = build_bundle(
            &response,
            &[],
            &[],
            None,
            8,
            Duration::minutes(30),
            Utc::now(),
        );

        assert_eq!(bundle.snapshot.location, "Hanoi");
        assert_eq!(bundle.location.city.as_deref(), Some("Hanoi"));
    }
}
