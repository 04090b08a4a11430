//! Background availability probing for the external generation tool.
//!
//! Request handlers never run the tool just to find out whether it works.
//! Instead a [`Availability`] value caches the result of the last probe and
//! is refreshed on a fixed interval by [`spawn_prober`].

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::binary::ToolCommand;

#[derive(Debug, Default)]
struct ProbeRecord {
    version: Option<String>,
    last_probe: Option<u64>,
}

/// Shared availability flag plus the diagnostics of the last probe.
///
/// Starts out unavailable until the first probe lands.
#[derive(Debug, Default)]
pub struct Availability {
    available: AtomicBool,
    record: RwLock<ProbeRecord>,
}

/// Snapshot served by the `/status` endpoint.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AvailabilityStatus {
    pub available: bool,
    pub version: Option<String>,
    pub last_probe: Option<u64>,
}

impl Availability {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-set flag, mostly useful in tests.
    pub fn with_state(available: bool) -> Self {
        let availability = Self::default();
        availability.available.store(available, Ordering::Release);
        availability
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    #[cfg(test)]
    pub(crate) fn set(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    pub fn version(&self) -> Option<String> {
        self.record.read().ok().and_then(|r| r.version.clone())
    }

    pub fn status(&self) -> AvailabilityStatus {
        let (version, last_probe) = match self.record.read() {
            Ok(record) => (record.version.clone(), record.last_probe),
            Err(_) => (None, None),
        };
        AvailabilityStatus {
            available: self.is_available(),
            version,
            last_probe,
        }
    }

    /// Runs the tool's version command once and updates the flag.
    ///
    /// Never fails: every error is folded into "unavailable". Returns the new
    /// flag value.
    pub async fn probe(&self, tool: &ToolCommand, timeout: Duration) -> bool {
        let result = tool.version(timeout).await;
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .ok();

        let available = result.is_ok();
        let was_available = self.available.swap(available, Ordering::AcqRel);

        match &result {
            Ok(version) if !was_available => {
                tracing::info!(version = %version, tool = %tool.program, "Generation tool is available");
            }
            Ok(version) => {
                tracing::debug!(version = %version, "Generation tool still available");
            }
            Err(e) if was_available => {
                tracing::warn!(error = %e, tool = %tool.program, "Generation tool became unavailable");
            }
            Err(e) => {
                tracing::debug!(error = %e, "Generation tool still unavailable");
            }
        }

        if let Ok(mut record) = self.record.write() {
            record.version = result.ok();
            record.last_probe = now;
        }

        available
    }
}

/// Re-probes `tool` every `interval` until `shutdown` is cancelled.
///
/// The first probe runs one `interval` after spawning; the startup probe is
/// the caller's job.
pub fn spawn_prober(
    availability: Arc<Availability>,
    tool: ToolCommand,
    interval: Duration,
    timeout: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::debug!("Availability prober stopped");
                    break;
                }
                _ = ticker.tick() => {
                    availability.probe(&tool, timeout).await;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing_tool() -> ToolCommand {
        ToolCommand {
            program: "definitely-not-a-real-codex-binary".to_string(),
            ..ToolCommand::default()
        }
    }

    #[test]
    fn starts_unavailable() {
        let availability = Availability::new();
        assert!(!availability.is_available());
        assert_eq!(
            availability.status(),
            AvailabilityStatus { available: false, version: None, last_probe: None }
        );
    }

    #[tokio::test]
    async fn missing_binary_marks_unavailable() {
        let availability = Availability::with_state(true);
        assert!(!availability.probe(&missing_tool(), Duration::from_secs(5)).await);
        assert!(!availability.is_available());
        assert!(availability.version().is_none());
        assert!(availability.status().last_probe.is_some());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn successful_probe_records_version() {
        let tool = ToolCommand {
            program: "sh".to_string(),
            chat_args: vec![],
            version_args: vec!["-c".into(), "echo codex 0.9.1".into()],
        };
        let availability = Availability::new();
        assert!(availability.probe(&tool, Duration::from_secs(5)).await);
        assert!(availability.is_available());
        assert_eq!(availability.version().as_deref(), Some("codex 0.9.1"));
    }

    #[tokio::test]
    async fn prober_waits_one_interval_before_first_probe() {
        let availability = Arc::new(Availability::with_state(true));
        let shutdown = CancellationToken::new();
        let handle = spawn_prober(
            availability.clone(),
            missing_tool(),
            Duration::from_secs(3600),
            Duration::from_secs(5),
            shutdown.clone(),
        );

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(availability.is_available());
        assert!(availability.status().last_probe.is_none());

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn prober_reprobes_on_interval_and_stops_on_cancel() {
        let availability = Arc::new(Availability::with_state(true));
        let shutdown = CancellationToken::new();
        let handle = spawn_prober(
            availability.clone(),
            missing_tool(),
            Duration::from_millis(50),
            Duration::from_secs(5),
            shutdown.clone(),
        );

        for _ in 0..50 {
            if !availability.is_available() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(!availability.is_available());

        shutdown.cancel();
        handle.await.unwrap();
    }
}
