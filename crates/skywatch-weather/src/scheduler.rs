//! Adaptive background polling for the active location.
//!
//! The interval computation is a pure function of injected environment
//! signals (visibility, connection profile, user activity); the
//! scheduler task re-reads those signals on a short recheck period and
//! installs a fresh timer whenever they change, rather than carrying
//! over time from the previous interval.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use skywatch_core::Config;

use crate::service::{FetchOptions, WeatherService};
use crate::types::LocationSelector;

/// Coarse connection quality classes that matter for polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionQuality {
    #[default]
    Fast,
    /// 2G-class links; polling backs off.
    Slow,
}

/// Network characteristics reported by the embedding shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectionProfile {
    pub save_data: bool,
    pub quality: ConnectionQuality,
}

/// Environment signals the scheduler adapts to.
///
/// The embedding shell implements this against whatever visibility and
/// input-activity sources it has. [`StaticProbe`] covers headless use.
pub trait EnvironmentProbe: Send + Sync + 'static {
    /// Whether the app surface is currently visible to the user.
    fn is_visible(&self) -> bool;

    fn connection(&self) -> ConnectionProfile;

    /// Instant of the most recent user interaction.
    fn last_activity(&self) -> DateTime<Utc>;
}

/// Probe with externally settable values, for headless shells and
/// tests.
#[derive(Debug)]
pub struct StaticProbe {
    visible: Mutex<bool>,
    connection: Mutex<ConnectionProfile>,
    last_activity: Mutex<DateTime<Utc>>,
}

impl StaticProbe {
    pub fn new(visible: bool, connection: ConnectionProfile) -> Self {
        Self {
            visible: Mutex::new(visible),
            connection: Mutex::new(connection),
            last_activity: Mutex::new(Utc::now()),
        }
    }

    pub fn set_visible(&self, visible: bool) {
        *self.visible.lock() = visible;
    }

    pub fn set_connection(&self, connection: ConnectionProfile) {
        *self.connection.lock() = connection;
    }

    /// Record a user interaction at `now`.
    pub fn touch(&self, now: DateTime<Utc>) {
        *self.last_activity.lock() = now;
    }
}

impl Default for StaticProbe {
    fn default() -> Self {
        Self::new(true, ConnectionProfile::default())
    }
}

impl EnvironmentProbe for StaticProbe {
    fn is_visible(&self) -> bool {
        *self.visible.lock()
    }

    fn connection(&self) -> ConnectionProfile {
        *self.connection.lock()
    }

    fn last_activity(&self) -> DateTime<Utc> {
        *self.last_activity.lock()
    }
}

/// Polling intervals per environment condition.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    pub active_interval: Duration,
    pub idle_interval: Duration,
    pub slow_connection_interval: Duration,
    pub save_data_interval: Duration,
    pub inactivity_threshold: chrono::Duration,
    /// How often visibility/activity/connection are re-read.
    pub recheck_interval: Duration,
}

impl PollPolicy {
    pub fn from_config(config: &Config) -> Self {
        let polling = &config.polling;
        Self {
            active_interval: Duration::from_secs(polling.active_secs),
            idle_interval: Duration::from_secs(polling.idle_secs),
            slow_connection_interval: Duration::from_secs(polling.slow_connection_secs),
            save_data_interval: Duration::from_secs(polling.save_data_secs),
            inactivity_threshold: chrono::Duration::seconds(
                polling.inactivity_threshold_secs as i64,
            ),
            recheck_interval: Duration::from_secs(polling.recheck_secs),
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Interval until the next poll, or `None` while the surface is hidden
/// (the scheduler self-suspends and re-checks on the recheck period).
pub fn poll_interval(
    policy: &PollPolicy,
    probe: &dyn EnvironmentProbe,
    now: DateTime<Utc>,
) -> Option<Duration> {
    if !probe.is_visible() {
        return None;
    }

    let connection = probe.connection();
    if connection.save_data {
        return Some(policy.save_data_interval);
    }
    if connection.quality == ConnectionQuality::Slow {
        return Some(policy.slow_connection_interval);
    }

    let idle_for = now - probe.last_activity();
    if idle_for < policy.inactivity_threshold {
        Some(policy.active_interval)
    } else {
        Some(policy.idle_interval)
    }
}

/// Drives recurring silent refreshes of the active location.
pub struct PollScheduler {
    service: WeatherService,
    probe: Arc<dyn EnvironmentProbe>,
    policy: PollPolicy,
    cancel: CancellationToken,
}

impl PollScheduler {
    pub fn new(
        service: WeatherService,
        probe: Arc<dyn EnvironmentProbe>,
        policy: PollPolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            service,
            probe,
            policy,
            cancel,
        }
    }

    /// Spawn the polling loop on the current runtime.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        let mut target: Option<Duration> = None;
        let mut elapsed = Duration::ZERO;

        loop {
            let location = self.service.registry().current();
            let current_target = location
                .as_ref()
                .and_then(|_| poll_interval(&self.policy, self.probe.as_ref(), Utc::now()));

            if current_target != target {
                // Conditions changed; install a fresh timer.
                target = current_target;
                elapsed = Duration::ZERO;
            }

            let step = match target {
                Some(t) => self.policy.recheck_interval.min(t.saturating_sub(elapsed)),
                None => self.policy.recheck_interval,
            };
            if !self.sleep_or_cancel(step).await {
                return;
            }
            elapsed += step;

            if let (Some(t), Some(location)) = (target, location) {
                if elapsed >= t {
                    elapsed = Duration::ZERO;
                    tracing::debug!(
                        "Poll tick for {}",
                        location.city.as_deref().unwrap_or("coordinates")
                    );
                    let _ = self
                        .service
                        .fetch_weather(
                            LocationSelector::for_location(&location),
                            FetchOptions::background(),
                        )
                        .await;
                }
            }
        }
    }

    /// Sleep for `duration`; returns false if cancelled meanwhile.
    async fn sleep_or_cancel(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = self.cancel.cancelled() => false,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    fn policy() -> PollPolicy {
        PollPolicy::default()
    }

    #[test]
    fn test_hidden_surface_suspends_polling() {
        let probe = StaticProbe::new(false, ConnectionProfile::default());
        assert_eq!(poll_interval(&policy(), &probe, Utc::now()), None);
    }

    #[test]
    fn test_save_data_wins_over_activity() {
        let probe = StaticProbe::new(
            true,
            ConnectionProfile {
                save_data: true,
                quality: ConnectionQuality::Fast,
            },
        );
        probe.touch(Utc::now());
        assert_eq!(
            poll_interval(&policy(), &probe, Utc::now()),
            Some(Duration::from_secs(60 * 60))
        );
    }

    #[test]
    fn test_slow_connection_backs_off() {
        let probe = StaticProbe::new(
            true,
            ConnectionProfile {
                save_data: false,
                quality: ConnectionQuality::Slow,
            },
        );
        assert_eq!(
            poll_interval(&policy(), &probe, Utc::now()),
            Some(Duration::from_secs(30 * 60))
        );
    }

    #[test]
    fn test_recent_activity_polls_faster() {
        let probe = StaticProbe::default();
        let now = Utc::now();

        probe.touch(now - chrono::Duration::minutes(1));
        assert_eq!(
            poll_interval(&policy(), &probe, now),
            Some(Duration::from_secs(10 * 60))
        );

        probe.touch(now - chrono::Duration::minutes(6));
        assert_eq!(
            poll_interval(&policy(), &probe, now),
            Some(Duration::from_secs(30 * 60))
        );
    }

    #[test]
    fn test_policy_from_config() {
        let config = Config::default();
        let policy = PollPolicy::from_config(&config);
        assert_eq!(policy.active_interval, Duration::from_secs(600));
        assert_eq!(policy.recheck_interval, Duration::from_secs(120));
        assert_eq!(policy.inactivity_threshold, chrono::Duration::minutes(5));
    }
}
