//! Background expiry sweep.
//!
//! A tokio task that calls [`AssetRegistry::sweep`] on a fixed interval
//! until its [`SweeperHandle`] is shut down or dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::state::registry::AssetRegistry;

/// Shortest accepted sweep interval.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Controls a running sweeper task. Dropping the handle stops the task.
pub struct SweeperHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Stop the task and wait for it to finish its current sweep.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "sweeper task ended abnormally");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Start sweeping `registry` every `interval`.
///
/// Must be called from within a tokio runtime.
pub fn spawn_sweeper(registry: Arc<AssetRegistry>, interval: Duration) -> SweeperHandle {
    let interval = interval.max(MIN_SWEEP_INTERVAL);
    let (tx, mut rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!(interval_ms = interval.as_millis() as u64, "sweeper started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    registry.sweep();
                }
                _ = &mut rx => break,
            }
        }

        debug!("sweeper stopped");
    });

    SweeperHandle {
        shutdown: Some(tx),
        task: Some(task),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{AudioFormat, PcmBuffer};
    use crate::state::asset::{AssetOrigin, EncodedAudio};
    use crate::state::clock::ManualClock;
    use crate::state::registry::RegistryLimits;

    fn registry_with_clock() -> (Arc<AssetRegistry>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let limits = RegistryLimits {
            ttl: chrono::Duration::minutes(1),
            ..Default::default()
        };
        (
            Arc::new(AssetRegistry::with_clock(limits, clock.clone())),
            clock,
        )
    }

    fn register_one(registry: &AssetRegistry) {
        let pcm = PcmBuffer::mono(vec![0.0; 8], 8000).unwrap();
        let encoded = EncodedAudio::new(vec![0; 8], AudioFormat::Wav);
        registry
            .register(pcm, encoded, AssetOrigin::Uploaded { file_name: None })
            .unwrap();
    }

    #[tokio::test]
    async fn test_sweeper_removes_expired_assets() {
        let (registry, clock) = registry_with_clock();
        register_one(&registry);
        register_one(&registry);

        let handle = spawn_sweeper(Arc::clone(&registry), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(registry.len(), 2);

        clock.advance(chrono::Duration::minutes(2));
        let mut waited = 0;
        while !registry.is_empty() && waited < 2000 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            waited += 10;
        }
        assert!(registry.is_empty());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_stops_task() {
        let (registry, clock) = registry_with_clock();
        let handle = spawn_sweeper(Arc::clone(&registry), Duration::from_millis(5));
        assert!(handle.is_running());
        handle.shutdown().await;

        // No sweeper any more: expired entries stay until touched
        register_one(&registry);
        clock.advance(chrono::Duration::minutes(2));
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(registry.len(), 1);
    }
}
