//! Plain round-robin pool: emits backends in strict cyclic order.

use std::sync::Mutex;

use rand::Rng;

use crate::backend::SharedBackend;

#[derive(Debug)]
pub struct RoundRobinPool {
    backends: Vec<SharedBackend>,
    cursor: Mutex<usize>,
}

impl RoundRobinPool {
    pub fn new(backends: Vec<SharedBackend>) -> Self {
        let start = if backends.is_empty() {
            0
        } else {
            rand::thread_rng().gen_range(0..backends.len())
        };
        Self {
            backends,
            cursor: Mutex::new(start),
        }
    }

    pub fn next(&self) -> SharedBackend {
        let mut cursor = self.cursor.lock().expect("round-robin cursor poisoned");
        let i = *cursor;
        *cursor = (i + 1) % self.backends.len();
        self.backends[i].clone()
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

    fn backends(n: usize) -> Vec<SharedBackend> {
        (0..n)
            .map(|i| Arc::new(Backend::new(Url::parse(&format!("http://b{i}:80")).unwrap(), 1)))
            .collect()
    }

    #[test]
    fn three_calls_return_a_permutation_of_all_backends() {
        let pool = RoundRobinPool::new(backends(3));
        let mut seen: Vec<String> = (0..3).map(|_| pool.next().url.to_string()).collect();
        seen.sort();
        let mut expected: Vec<String> = pool.all().iter().map(|b| b.url.to_string()).collect();
        expected.sort();
        assert_eq!(seen, expected);
    }

    #[test]
    fn cycles_strictly_in_order_from_the_cursor() {
        let pool = RoundRobinPool::new(backends(3));
        *pool.cursor.lock().unwrap() = 0;
        let first = pool.next().url.clone();
        let second = pool.next().url.clone();
        let third = pool.next().url.clone();
        let fourth = pool.next().url.clone();
        assert_eq!(first, fourth);
        assert_ne!(first, second);
        assert_ne!(second, third);
    }
}
