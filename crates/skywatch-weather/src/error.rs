//! Weather subsystem error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Location not found: {0}")]
    LocationNotFound(String),

    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    #[error("A city or coordinate pair is required")]
    MissingLocation,

    #[error("Weather API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl WeatherError {
    /// User-friendly error message for UI display.
    pub fn user_message(&self) -> String {
        match self {
            Self::LocationNotFound(_) => "Location not found. Please try again.".to_string(),
            Self::RateLimited(secs) => {
                format!("Too many requests. Please wait {} seconds and try again.", secs)
            }
            Self::MissingLocation => "Choose a location first.".to_string(),
            Self::Api(_) => "Could not load weather data. Please try again.".to_string(),
            Self::Network(_) => "Network error. Check your connection.".to_string(),
        }
    }

    /// Whether a later trigger (poll tick, focus, pull-to-refresh) may
    /// reasonably succeed without any user action.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::Network(_) | Self::Api(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_user_messages() {
        let err = WeatherError::LocationNotFound("Atlantis".into());
        assert!(err.user_message().contains("not found"));

        let err = WeatherError::RateLimited(30);
        assert!(err.user_message().contains("30"));
    }

    #[test]
    fn test_is_retryable() {
        assert!(WeatherError::RateLimited(10).is_retryable());
        assert!(WeatherError::Api("500".into()).is_retryable());
        assert!(!WeatherError::LocationNotFound("x".into()).is_retryable());
        assert!(!WeatherError::MissingLocation.is_retryable());
    }
}
