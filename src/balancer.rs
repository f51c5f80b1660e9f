//! Load balancer module
//!
//! Composes a [`BackendPool`] selection policy with per-backend liveness:
//! `pick_backend` layers a liveness filter on top of the pool's pure
//! selection algorithm, and the request handler retries across alternates
//! up to a bounded attempt count before giving up.

use std::sync::Arc;
use std::time::Duration;

use crate::backend::{Backend, SharedBackend};
use crate::config::Config;
use crate::constants::{MAX_DISPATCH_ATTEMPTS, PICK_RETRY_MULTIPLIER};
use crate::pool::BackendPool;
use crate::proxy::{bad_gateway, BufferedRequest, ProxyResponse};

/// Composes backend selection policy with liveness and retry.
///
/// Built once at startup from [`Config`] and lives for the process
/// lifetime; backends are never added or removed.
pub struct Balancer {
    pool: BackendPool,
    n: usize,
    port: u16,
    probe_interval: Option<Duration>,
}

impl Balancer {
    pub fn new(config: Config) -> Self {
        let backends: Vec<SharedBackend> = config
            .backends
            .iter()
            .map(|spec| Arc::new(Backend::new(spec.url.clone(), spec.weight)))
            .collect();
        let n = backends.len();
        let pool = BackendPool::new(config.pool_kind, backends);

        Self {
            pool,
            n,
            port: config.port,
            probe_interval: config.probe_interval,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `Some(interval)` if probing is enabled, `None` if disabled
    /// (negative `health-check-interval` in the config file).
    pub fn probe_interval(&self) -> Option<Duration> {
        self.probe_interval
    }

    pub fn pool(&self) -> &BackendPool {
        &self.pool
    }

    /// Select one alive backend, skipping dead ones reported by the pool.
    ///
    /// Calls `pool.next()` up to `2n` times (`n` = backend count), returning
    /// the first alive backend encountered. Returns `None` if the cap is
    /// reached with no alive backend found — this bounds the search and
    /// gives every backend at least two chances under adversarial pool
    /// ordering, regardless of policy.
    fn pick_backend(&self) -> Option<SharedBackend> {
        if self.n == 0 {
            return None;
        }

        let cap = PICK_RETRY_MULTIPLIER * self.n;
        for _ in 0..=cap {
            let backend = self.pool.next();
            if backend.is_alive() {
                return Some(backend);
            }
        }
        None
    }

    /// The public entry point the HTTP listener calls per inbound request.
    ///
    /// Up to [`MAX_DISPATCH_ATTEMPTS`] iterations: pick a backend, dispatch,
    /// then check liveness. A live backend after dispatch means the attempt
    /// succeeded and its response is returned; a backend that went dead
    /// during the attempt is not retried with a partially-written response —
    /// the request body was buffered once up front precisely so a retry can
    /// safely replay it against a different backend. If every attempt is
    /// exhausted, or no alive backend can be found, the client gets `502`.
    pub async fn handle_request(&self, request: &BufferedRequest) -> ProxyResponse {
        for attempt in 1..=MAX_DISPATCH_ATTEMPTS {
            let backend = match self.pick_backend() {
                Some(backend) => backend,
                None => {
                    log::warn!(
                        "no alive backend available (attempt {}/{})",
                        attempt,
                        MAX_DISPATCH_ATTEMPTS
                    );
                    return bad_gateway();
                }
            };

            let response = backend.dispatch(request.to_request()).await;

            if backend.is_alive() {
                if let Some(response) = response {
                    log::info!("forwarded request to {}", backend.url);
                    return response;
                }
            }

            log::warn!(
                "dispatch attempt {}/{} failed against {}, retrying",
                attempt,
                MAX_DISPATCH_ATTEMPTS,
                backend.url
            );
        }

        bad_gateway()
    }
}
