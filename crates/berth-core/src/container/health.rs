//! Health polling used during activation

use std::time::Duration;

use tokio::time::Instant;

use super::{ContainerAdapter, HealthStatus};
use crate::config::HealthSettings;
use crate::error::{BerthError, BerthResult};

/// How often and how long to wait for a healthy container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthPolicy {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl HealthPolicy {
    pub fn new(poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            poll_interval,
            timeout,
        }
    }
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self::from(&HealthSettings::default())
    }
}

impl From<&HealthSettings> for HealthPolicy {
    fn from(settings: &HealthSettings) -> Self {
        Self::new(settings.poll_interval, settings.timeout)
    }
}

/// Poll the adapter until the container reports healthy.
///
/// Probes immediately, then every `poll_interval`. Fails with
/// [`BerthError::HealthCheckTimeout`] once `timeout` has elapsed without a
/// healthy probe. The caller owns cleanup of the container.
pub async fn wait_until_healthy(
    adapter: &dyn ContainerAdapter,
    plugin_id: &str,
    policy: &HealthPolicy,
) -> BerthResult<()> {
    let started = Instant::now();
    let deadline = started + policy.timeout;
    let mut probes = 0u32;

    loop {
        probes += 1;
        let status = adapter.health(plugin_id).await;
        if status == HealthStatus::Healthy {
            tracing::debug!(plugin_id, probes, "Container reported healthy");
            return Ok(());
        }

        let now = Instant::now();
        if now >= deadline {
            tracing::warn!(plugin_id, probes, %status, "Container health check timed out");
            return Err(BerthError::HealthCheckTimeout {
                plugin_id: plugin_id.to_string(),
                waited: now.duration_since(started),
            });
        }

        let remaining = deadline - now;
        tokio::time::sleep(policy.poll_interval.min(remaining)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::MockContainerAdapter;

    #[tokio::test]
    async fn test_healthy_after_a_few_probes() {
        let mut adapter = MockContainerAdapter::new();
        let mut seq = mockall::Sequence::new();
        adapter
            .expect_health()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| HealthStatus::Starting);
        adapter
            .expect_health()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| HealthStatus::Healthy);

        let policy = HealthPolicy::new(Duration::from_millis(1), Duration::from_secs(5));
        wait_until_healthy(&adapter, "crm", &policy).await.unwrap();
    }

    #[tokio::test]
    async fn test_times_out_when_never_healthy() {
        let mut adapter = MockContainerAdapter::new();
        adapter
            .expect_health()
            .returning(|_| HealthStatus::Unhealthy);

        let policy = HealthPolicy::new(Duration::from_millis(5), Duration::from_millis(30));
        let err = wait_until_healthy(&adapter, "crm", &policy)
            .await
            .unwrap_err();
        match err {
            BerthError::HealthCheckTimeout { plugin_id, waited } => {
                assert_eq!(plugin_id, "crm");
                assert!(waited >= Duration::from_millis(30));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_policy_from_settings() {
        let policy = HealthPolicy::default();
        assert_eq!(policy.poll_interval, Duration::from_millis(500));
        assert_eq!(policy.timeout, Duration::from_secs(30));
    }
}
