//! Backend selection policies.
//!
//! A small capability set — `next()` and `all()` — implemented by four
//! independent variants chosen once at startup. No shared base state: each
//! variant owns whatever locking its algorithm needs.

mod least_conn;
mod random;
mod round_robin;
mod weighted_round_robin;

use crate::backend::SharedBackend;
use crate::config::PoolKind;

use least_conn::LeastConnPool;
use random::RandomPool;
use round_robin::RoundRobinPool;
use weighted_round_robin::WeightedRoundRobinPool;

/// One of the four backend selection policies.
#[derive(Debug)]
pub enum BackendPool {
    RoundRobin(RoundRobinPool),
    WeightedRoundRobin(WeightedRoundRobinPool),
    LeastConn(LeastConnPool),
    Random(RandomPool),
}

impl BackendPool {
    pub fn new(kind: PoolKind, backends: Vec<SharedBackend>) -> Self {
        match kind {
            PoolKind::RoundRobin => BackendPool::RoundRobin(RoundRobinPool::new(backends)),
            PoolKind::WeightedRoundRobin => {
                BackendPool::WeightedRoundRobin(WeightedRoundRobinPool::new(backends))
            }
            PoolKind::LeastConn => BackendPool::LeastConn(LeastConnPool::new(backends)),
            PoolKind::Random => BackendPool::Random(RandomPool::new(backends)),
        }
    }

    /// Return one backend under this pool's policy. Does not consult
    /// liveness — the balancer layers that filter on top, keeping each
    /// policy pure and testable in isolation.
    pub fn next(&self) -> SharedBackend {
        match self {
            BackendPool::RoundRobin(p) => p.next(),
            BackendPool::WeightedRoundRobin(p) => p.next(),
            BackendPool::LeastConn(p) => p.next(),
            BackendPool::Random(p) => p.next(),
        }
    }

    /// Full backend set, in stable order. Used by the health prober.
    pub fn all(&self) -> &[SharedBackend] {
        match self {
            BackendPool::RoundRobin(p) => p.all(),
            BackendPool::WeightedRoundRobin(p) => p.all(),
            BackendPool::LeastConn(p) => p.all(),
            BackendPool::Random(p) => p.all(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Backend;
    use std::sync::Arc;
    use url::Url;

    fn backends(n: usize) -> Vec<SharedBackend> {
        (0..n)
            .map(|i| Arc::new(Backend::new(Url::parse(&format!("http://b{i}:80")).unwrap(), 1)))
            .collect()
    }

    #[test]
    fn all_reflects_the_constructed_backend_set_regardless_of_policy() {
        let pool = BackendPool::new(PoolKind::Random, backends(4));
        assert_eq!(pool.all().len(), 4);
    }

    #[test]
    fn round_robin_kind_builds_a_round_robin_pool() {
        let pool = BackendPool::new(PoolKind::RoundRobin, backends(2));
        assert!(matches!(pool, BackendPool::RoundRobin(_)));
    }
}
