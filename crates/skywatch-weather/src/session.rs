//! Session lifecycle: wiring, background tasks, teardown.
//!
//! One [`WeatherSession`] exists per application session. It owns the
//! cache, registry, and service, keeps the poll scheduler and the
//! periodic cache sweeper running, and cancels both on shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use skywatch_core::Config;

use crate::error::WeatherError;
use crate::registry::LocationRegistry;
use crate::scheduler::{EnvironmentProbe, PollPolicy, PollScheduler};
use crate::service::WeatherService;
use crate::state::WeatherState;
use crate::triggers::TriggerCoordinator;

pub struct WeatherSession {
    service: WeatherService,
    coordinator: Arc<TriggerCoordinator>,
    cancel: CancellationToken,
}

impl WeatherSession {
    /// Build the full stack and start its background tasks. Must be
    /// called from within a tokio runtime.
    pub fn start(
        config: &Config,
        probe: Arc<dyn EnvironmentProbe>,
    ) -> Result<Self, WeatherError> {
        let registry = LocationRegistry::new();
        let service = WeatherService::new(config, registry)?;
        let coordinator = Arc::new(TriggerCoordinator::new(service.clone(), config));
        let cancel = CancellationToken::new();

        Self::spawn_sweeper(
            service.clone(),
            Duration::from_secs(config.cache.sweep_interval_secs),
            cancel.child_token(),
        );

        let _ = PollScheduler::new(
            service.clone(),
            probe,
            PollPolicy::from_config(config),
            cancel.child_token(),
        )
        .spawn();

        Ok(Self {
            service,
            coordinator,
            cancel,
        })
    }

    /// Bounds cache memory even for locations no longer polled.
    fn spawn_sweeper(service: WeatherService, interval: Duration, cancel: CancellationToken) {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => service.run_sweep(),
                    _ = cancel.cancelled() => break,
                }
            }
        });
    }

    pub fn service(&self) -> &WeatherService {
        &self.service
    }

    pub fn triggers(&self) -> &Arc<TriggerCoordinator> {
        &self.coordinator
    }

    /// Subscribe to UI-facing state updates.
    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<WeatherState> {
        self.service.subscribe()
    }

    /// Stop background polling and sweeping and drop the active
    /// location. Idempotent.
    pub fn shutdown(&self) {
        tracing::info!("Weather session shutting down");
        self.cancel.cancel();
        self.service.registry().clear();
    }
}

impl Drop for WeatherSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::scheduler::StaticProbe;

    #[tokio::test]
    async fn test_session_starts_and_shuts_down() {
        let config = Config::default();
        let probe = Arc::new(StaticProbe::default());
        let session = WeatherSession::start(&config, probe).unwrap();

        assert!(session.service().registry().current().is_none());
        assert!(session.subscribe().borrow().weather.is_none());

        session.shutdown();
        session.shutdown(); // idempotent
    }
}
