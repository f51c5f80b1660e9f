//! Health check module
//!
//! Periodically probes every backend's TCP liveness in parallel. Each probe
//! is a fire-and-forget worker that updates its own backend's `alive` flag;
//! sweeps never serialize against each other since the connect timeout is
//! far shorter than the default sweep interval.

use std::sync::Arc;
use std::time::Duration;

use log::info;
use tokio::time::interval;

use crate::balancer::Balancer;

/// Long-lived worker that fans out one probe task per backend on every
/// tick. Does nothing if probing is disabled (negative
/// `health-check-interval`).
pub struct HealthProber {
    balancer: Arc<Balancer>,
}

impl HealthProber {
    pub fn new(balancer: Arc<Balancer>) -> Self {
        Self { balancer }
    }

    /// Run the probe loop until `shutdown` fires.
    ///
    /// Emits one immediate sweep on startup, then probes again on every
    /// `probe_interval` tick. Returns immediately if probing is disabled.
    pub async fn run(&self, mut shutdown: tokio::sync::broadcast::Receiver<()>) {
        let Some(probe_interval) = self.balancer.probe_interval() else {
            info!("health checking disabled (negative health-check-interval)");
            return;
        };

        info!(
            "health checking started: {}s interval",
            probe_interval.as_secs()
        );

        self.sweep().await;

        let mut ticker = interval(probe_interval);
        ticker.tick().await; // first tick fires immediately; the sweep above already covered it

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep().await;
                }
                _ = shutdown.recv() => {
                    info!("health checking stopped");
                    break;
                }
            }
        }
    }

    /// Probe every backend concurrently and wait for all probes to finish.
    async fn sweep(&self) {
        info!("health check sweep starting ({} backends)", self.balancer.pool().all().len());

        let handles: Vec<_> = self
            .balancer
            .pool()
            .all()
            .iter()
            .cloned()
            .map(|backend| tokio::spawn(async move { backend.probe().await }))
            .collect();

        for handle in handles {
            if let Err(err) = handle.await {
                log::error!("health probe task panicked: {}", err);
            }
        }

        info!("health check sweep complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackendSpec, Config, PoolKind};
    use url::Url;

    fn balancer_with_backends(n: usize, probe_interval: Option<Duration>) -> Arc<Balancer> {
        let backends = (0..n)
            .map(|i| BackendSpec {
                url: Url::parse(&format!("http://127.0.0.1:{}", 9000 + i)).unwrap(),
                weight: 1,
                has_explicit_weight: false,
            })
            .collect();

        Arc::new(Balancer::new(Config {
            port: 9295,
            pool_kind: PoolKind::RoundRobin,
            probe_interval,
            backends,
        }))
    }

    #[tokio::test]
    async fn sweep_against_unreachable_backends_marks_them_dead() {
        let balancer = balancer_with_backends(2, Some(Duration::from_secs(10)));
        let prober = HealthProber::new(Arc::clone(&balancer));
        prober.sweep().await;

        for backend in balancer.pool().all() {
            assert!(!backend.is_alive());
        }
    }

    #[tokio::test]
    async fn run_returns_immediately_when_probing_is_disabled() {
        let balancer = balancer_with_backends(1, None);
        let prober = HealthProber::new(Arc::clone(&balancer));
        let (_tx, rx) = tokio::sync::broadcast::channel(1);

        tokio::time::timeout(Duration::from_millis(200), prober.run(rx))
            .await
            .expect("run should return promptly when disabled");

        // Probing never ran, so the initial `alive = true` default survives.
        assert!(balancer.pool().all()[0].is_alive());
    }
}
