//! Per-key request coalescing.
//!
//! Concurrent callers asking for the same key await a single execution of the
//! work instead of each issuing their own upstream call or classification.

use dashmap::DashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::OnceCell;

pub struct InFlight<K, V> {
    pending: DashMap<K, Arc<OnceCell<V>>>,
}

impl<K, V> Default for InFlight<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self {
            pending: DashMap::new(),
        }
    }
}

impl<K, V> InFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            pending: DashMap::new(),
        }
    }

    /// Runs `work` unless another caller is already running it for `key`,
    /// in which case the shared result is returned.
    ///
    /// Results are not retained once every waiter has been served; callers
    /// keep their own caches for that.
    pub async fn run<F, Fut>(&self, key: K, work: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let cell = self
            .pending
            .entry(key.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let value = cell.get_or_init(work).await.clone();

        self.pending
            .remove_if(&key, |_, existing| Arc::ptr_eq(existing, &cell));
        value
    }

    /// Number of keys with work currently in progress.
    pub fn in_progress(&self) -> usize {
        self.pending.len()
    }
}
