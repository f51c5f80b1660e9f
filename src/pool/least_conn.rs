//! Least-connections pool, ties broken by smooth WRR over the tied subset.

use std::sync::Mutex;

use crate::backend::SharedBackend;

use super::weighted_round_robin::smooth_weighted_next;

#[derive(Debug)]
pub struct LeastConnPool {
    backends: Vec<SharedBackend>,
    /// Guards the tie-break WRR step, which reads and writes `cur_weight`
    /// across the tied subset and must be serialized the same way the
    /// standalone WRR pool serializes it.
    tie_break_lock: Mutex<()>,
}

impl LeastConnPool {
    pub fn new(backends: Vec<SharedBackend>) -> Self {
        Self {
            backends,
            tie_break_lock: Mutex::new(()),
        }
    }

    pub fn next(&self) -> SharedBackend {
        // Initialize from the first backend's load, per the corrected
        // algorithm: the naive "min starts at zero, scan from index 1"
        // version never picks anything when every real load is positive.
        let min_load = self
            .backends
            .iter()
            .map(|b| b.load())
            .min()
            .expect("pool is never empty");

        let tied: Vec<SharedBackend> = self
            .backends
            .iter()
            .filter(|b| b.load() == min_load)
            .cloned()
            .collect();

        if tied.len() == 1 {
            return tied.into_iter().next().unwrap();
        }

        let _guard = self.tie_break_lock.lock().expect("least-conn tie lock poisoned");
        let idx = smooth_weighted_next(&tied);
        tied[idx].clone()
    }

    pub fn all(&self) -> &[SharedBackend] {
        &self.backends
    }
}
