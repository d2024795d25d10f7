//! Shared handle to the active location.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::types::LocationDescriptor;

/// Process-wide owner of the active [`LocationDescriptor`].
///
/// Readable synchronously by non-reactive callers such as the poll
/// scheduler. Only completed fetches commit a full descriptor; map
/// clicks and GPS fixes record provisional coordinates until the
/// network reconciles them.
#[derive(Debug, Clone, Default)]
pub struct LocationRegistry {
    inner: Arc<Mutex<Option<LocationDescriptor>>>,
}

impl LocationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest resolved location.
    pub fn current(&self) -> Option<LocationDescriptor> {
        self.inner.lock().clone()
    }

    /// City to keep displaying when a caller asks for preservation.
    pub fn preserved_city(&self) -> Option<String> {
        self.inner.lock().as_ref().and_then(|loc| loc.city.clone())
    }

    /// Commit the descriptor produced by a successful fetch.
    pub fn commit(&self, location: LocationDescriptor) {
        *self.inner.lock() = Some(location);
    }

    /// Record locally-known coordinates ahead of a fetch (map click,
    /// GPS fix). Clears the city; coordinate-driven updates do not get
    /// to keep a name they did not resolve.
    pub fn set_provisional(&self, lat: f64, lon: f64) {
        *self.inner.lock() = Some(LocationDescriptor::provisional(lat, lon));
    }

    /// Drop the active location (session teardown).
    pub fn clear(&self) {
        *self.inner.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    fn hanoi() -> LocationDescriptor {
        LocationDescriptor {
            lat: 21.0285,
            lon: 105.8542,
            city: Some("Hanoi".to_string()),
            detailed_address: None,
        }
    }

    #[test]
    fn test_commit_and_read() {
        let registry = LocationRegistry::new();
        assert!(registry.current().is_none());

        registry.commit(hanoi());
        assert_eq!(registry.preserved_city().as_deref(), Some("Hanoi"));
    }

    #[test]
    fn test_provisional_clears_city() {
        let registry = LocationRegistry::new();
        registry.commit(hanoi());

        registry.set_provisional(10.82, 106.63);

        let current = registry.current().unwrap();
        assert_eq!(current.lat, 10.82);
        assert!(current.city.is_none());
        assert!(registry.preserved_city().is_none());
    }

    #[test]
    fn test_clones_share_state() {
        let registry = LocationRegistry::new();
        let clone = registry.clone();

        registry.commit(hanoi());
        assert_eq!(clone.preserved_city().as_deref(), Some("Hanoi"));

        clone.clear();
        assert!(registry.current().is_none());
    }
}
