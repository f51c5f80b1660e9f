//! Weighted-random pool: precomputed prefix sums, binary search per pick.

use rand::Rng;

use crate::backend::SharedBackend;

#[derive(Debug)]
pub struct RandomPool {
    backends: Vec<SharedBackend>,
    /// `acc_weights[i] = sum of weight[0..=i]`, strictly increasing,
    /// immutable after construction.
    acc_weights: Vec<u64>,
}

impl RandomPool {
    pub fn new(backends: Vec<SharedBackend>) -> Self {
        let mut running = 0u64;
        let acc_weights = backends
            .iter()
            .map(|b| {
                running += b.weight as u64;
                running
            })
            .collect();
        Self {
            backends,
            acc_weights,
        }
    }

    /// Lock-free: `rand::thread_rng()` is thread-local, so no shared mutex
    /// is needed to keep draws concurrency-safe.
    pub fn next(&self) -> SharedBackend {
        let total = *self.acc_weights.last().expect("pool is never empty");
        let r = rand::thread_rng().gen_range(0..total);
        let idx = self.acc_weights.partition_point(|&acc| acc <= r);
        self.backends[idx].clone()
    }

    pub fn all(&self) -> &[SharedBackend] {
        &self.backends
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Backend;
    use std::sync::Arc;
    use url::Url;

    fn backends(weights: &[u32]) -> Vec<SharedBackend> {
        weights
            .iter()
            .enumerate()
            .map(|(i, &w)| Arc::new(Backend::new(Url::parse(&format!("http://b{i}:80")).unwrap(), w)))
            .collect()
    }

    #[test]
    fn acc_weights_are_strictly_increasing_prefix_sums() {
        let pool = RandomPool::new(backends(&[2, 1, 3]));
        assert_eq!(pool.acc_weights, vec![2, 3, 6]);
    }

    #[test]
    fn empirical_frequency_converges_to_weight_ratio() {
        let weights = [1u32, 3, 6];
        let pool = RandomPool::new(backends(&weights));
        let total_draws = 20_000;
        let mut counts = [0usize; 3];

        for _ in 0..total_draws {
            let picked = pool.next();
            let idx = pool
                .all()
                .iter()
                .position(|b| b.url == picked.url)
                .unwrap();
            counts[idx] += 1;
        }

        let total_weight: f64 = weights.iter().map(|&w| w as f64).sum();
        for (i, &w) in weights.iter().enumerate() {
            let expected = w as f64 / total_weight;
            let observed = counts[i] as f64 / total_draws as f64;
            assert!(
                (observed - expected).abs() < 0.02,
                "backend {i}: expected ~{expected}, observed {observed}"
            );
        }
    }
}
