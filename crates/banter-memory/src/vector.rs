//! In-process similarity index over embedded events.
//!
//! [`VectorIndex`] keeps at most `capacity` `(event, vector)` pairs.  When
//! full, the oldest entry is evicted regardless of how similar it is to
//! anything, so the index behaves as a recency-biased cache rather than an
//! archive.  Similarity is the raw dot product of the vectors; magnitudes
//! therefore affect ranking.
//!
//! Embedding itself is the caller's concern: the index only stores vectors it
//! is handed.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use banter_types::Event;
use tracing::debug;

/// Default number of retained entries.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Default similarity a hit must strictly exceed.
pub const DEFAULT_THRESHOLD: f32 = 0.3;

/// Capacity-bounded dot-product index.
pub struct VectorIndex {
    capacity: usize,
    threshold: f32,
    entries: Mutex<VecDeque<(Arc<Event>, Vec<f32>)>>,
}

impl Default for VectorIndex {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_THRESHOLD)
    }
}

impl VectorIndex {
    pub fn new(capacity: usize, threshold: f32) -> Self {
        Self {
            capacity: capacity.max(1),
            threshold,
            entries: Mutex::new(VecDeque::with_capacity(capacity.clamp(1, DEFAULT_CAPACITY))),
        }
    }

    fn entries(&self) -> MutexGuard<'_, VecDeque<(Arc<Event>, Vec<f32>)>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Store `vector` for `event`, evicting the oldest entry when full.
    pub fn insert(&self, event: Arc<Event>, vector: Vec<f32>) {
        let mut entries = self.entries();
        entries.push_back((event, vector));
        while entries.len() > self.capacity {
            entries.pop_front();
        }
    }

    /// Up to `k` entries most similar to `query`, best first.
    ///
    /// Only entries scoring strictly above the threshold are returned.
    /// Entries whose dimension differs from the query are ignored.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(Arc<Event>, f32)> {
        if k == 0 {
            return Vec::new();
        }
        let entries = self.entries();
        let mut hits: Vec<(Arc<Event>, f32)> = entries
            .iter()
            .filter(|(_, v)| v.len() == query.len())
            .map(|(event, v)| (Arc::clone(event), dot(query, v)))
            .filter(|(_, score)| *score > self.threshold)
            .collect();
        drop(entries);

        hits.sort_by(|a, b| b.1.total_cmp(&a.1));
        hits.truncate(k);
        debug!(hits = hits.len(), k, "vector search");
        hits
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
