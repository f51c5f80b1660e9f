//! Backend runtime state
//!
//! Tracks each upstream's liveness and in-flight request count, sharing state
//! in a thread-safe manner via atomics. Owns the proxy dispatcher bound to
//! its URL.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use url::Url;

use crate::constants::HEALTH_CHECK_TIMEOUT_MS;
use crate::proxy::{DispatchError, ProxyDispatcher, ProxyRequest, ProxyResponse};

/// Runtime state of a single upstream backend.
///
/// Uses atomics for lock-free thread-safe state sharing (Ordering::Relaxed
/// throughout — only single-atomic consistency is needed, never a
/// happens-before relation across fields).
#[derive(Debug)]
pub struct Backend {
    /// Upstream URL this backend forwards to (immutable).
    pub url: Url,
    /// Relative selection weight, always `>= 1`.
    pub weight: u32,
    /// Smooth-WRR scratch state. Only the WRR and LeastConn pools touch this,
    /// always while holding the owning pool's mutex.
    pub cur_weight: AtomicI64,
    /// Current liveness belief.
    alive: AtomicBool,
    /// In-flight request count.
    load: AtomicUsize,
    dispatcher: ProxyDispatcher,
}

impl Backend {
    pub fn new(url: Url, weight: u32) -> Self {
        let dispatcher = ProxyDispatcher::new(url.clone());
        Self {
            url,
            weight,
            cur_weight: AtomicI64::new(weight as i64),
            alive: AtomicBool::new(true),
            load: AtomicUsize::new(0),
            dispatcher,
        }
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::Relaxed);
    }

    #[inline]
    pub fn load(&self) -> usize {
        self.load.load(Ordering::Relaxed)
    }

    /// Forward `request` to this backend, tracking in-flight load around the
    /// call and flipping liveness on transport failure.
    ///
    /// Never propagates a transport error to the caller as a Rust `Err` that
    /// aborts the request path — failure is communicated purely through
    /// `is_alive()` afterward, per the dispatch contract.
    pub async fn dispatch(&self, request: ProxyRequest) -> Option<ProxyResponse> {
        let _guard = LoadGuard::new(self);

        match self.dispatcher.dispatch(request).await {
            Ok(response) => Some(response),
            Err(DispatchError::Transport(err)) => {
                log::warn!("backend {} transport failure: {}", self.url, err);
                self.set_alive(false);
                None
            }
        }
    }

    /// TCP-connect liveness probe with a bounded timeout.
    pub async fn probe(&self) {
        let host = self.url.host_str().unwrap_or("");
        let port = self
            .url
            .port_or_known_default()
            .unwrap_or(if self.url.scheme() == "https" { 443 } else { 80 });

        let result = tokio::time::timeout(
            Duration::from_millis(HEALTH_CHECK_TIMEOUT_MS),
            TcpStream::connect((host, port)),
        )
        .await;

        match result {
            Ok(Ok(_)) => self.set_alive(true),
            Ok(Err(err)) => {
                log::warn!("probe failed for {}: {}", self.url, err);
                self.set_alive(false);
            }
            Err(_) => {
                log::warn!("probe timed out for {}", self.url);
                self.set_alive(false);
            }
        }
    }
}

/// In-flight load counter RAII guard.
///
/// Increments on construction, decrements on drop — covers every dispatch
/// exit path (success, transport failure, or panic unwind) without
/// duplicating the bookkeeping at each call site.
struct LoadGuard<'a> {
    backend: &'a Backend,
}

impl<'a> LoadGuard<'a> {
    fn new(backend: &'a Backend) -> Self {
        backend.load.fetch_add(1, Ordering::Relaxed);
        Self { backend }
    }
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        self.backend.load.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Convenience alias used by the pool and balancer modules.
pub type SharedBackend = Arc<Backend>;

#[cfg(test)]
impl Backend {
    /// Force the in-flight load counter to a fixed value for pool tests that
    /// need to stage a particular load distribution without running real
    /// dispatches.
    pub(crate) fn set_load_for_test(&self, value: usize) {
        self.load.store(value, Ordering::Relaxed);
    }
}
