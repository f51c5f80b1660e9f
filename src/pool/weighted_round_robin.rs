//! Smooth weighted round-robin, as used by nginx upstream selection.
//!
//! The core algorithm ([`smooth_weighted_next`]) is shared with the
//! least-connections pool's tie-break step, since both apply the identical
//! weighted-cursor update, just over different backend subsets.

use std::sync::atomic::Ordering;
use std::sync::Mutex;

use crate::backend::SharedBackend;

/// Pick one backend from `backends` under the smooth-WRR rule and update
/// `cur_weight` in place. Callers must serialize calls over the same backend
/// set (e.g. behind a mutex); the read-modify-write across all entries is
/// not itself atomic.
pub fn smooth_weighted_next(backends: &[SharedBackend]) -> usize {
    let total_weight: i64 = backends.iter().map(|b| b.weight as i64).sum();

    let mut best_idx = 0;
    let mut best_cur = i64::MIN;
    for (i, b) in backends.iter().enumerate() {
        let cur = b.cur_weight.load(Ordering::Relaxed);
        if cur > best_cur {
            best_cur = cur;
            best_idx = i;
        }
    }

    for (i, b) in backends.iter().enumerate() {
        if i != best_idx {
            b.cur_weight.fetch_add(b.weight as i64, Ordering::Relaxed);
        }
    }
    backends[best_idx]
        .cur_weight
        .fetch_sub(total_weight - backends[best_idx].weight as i64, Ordering::Relaxed);

    best_idx
}

#[derive(Debug)]
pub struct WeightedRoundRobinPool {
    backends: Vec<SharedBackend>,
    lock: Mutex<()>,
}

impl WeightedRoundRobinPool {
    pub fn new(backends: Vec<SharedBackend>) -> Self {
        Self {
            backends,
            lock: Mutex::new(()),
        }
    }

    pub fn next(&self) -> SharedBackend {
        let _guard = self.lock.lock().expect("wrr pool lock poisoned");
        let idx = smooth_weighted_next(&self.backends);
        self.backends[idx].clone()
    }

    pub fn all(&self) -> &[SharedBackend] {
        &self.backends
    }
}
