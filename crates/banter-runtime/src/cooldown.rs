//! [`CooldownGate`] – per-author minimum interval between replies.
//!
//! Each author gets a deadline after the engine last considered replying to
//! them.  Higher relationship tiers shorten the interval (see
//! [`RelationshipTier::cooldown_factor`]).  Entries idle beyond a horizon are
//! pruned by the periodic sweep so the map does not grow without bound.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use banter_types::{AuthorId, RelationshipTier};

pub struct CooldownGate {
    base: Duration,
    last_reply: Mutex<HashMap<AuthorId, Instant>>,
}

impl CooldownGate {
    pub fn new(base: Duration) -> Self {
        Self {
            base,
            last_reply: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<AuthorId, Instant>> {
        self.last_reply.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Effective interval for an author of `tier`.
    pub fn interval(&self, tier: RelationshipTier) -> Duration {
        self.base.mul_f64(tier.cooldown_factor())
    }

    /// Pass the gate if the author's interval has elapsed, stamping `now`.
    ///
    /// Returns `false` (and leaves the stamp untouched) while cooling down.
    pub fn try_acquire(&self, author_id: AuthorId, tier: RelationshipTier, now: Instant) -> bool {
        let interval = self.interval(tier);
        let mut entries = self.entries();
        match entries.get(&author_id) {
            Some(last) if now.saturating_duration_since(*last) < interval => false,
            _ => {
                entries.insert(author_id, now);
                true
            }
        }
    }

    /// Drop authors idle for longer than `horizon`.  Returns the count removed.
    pub fn prune_idle(&self, horizon: Duration, now: Instant) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, last| now.saturating_duration_since(*last) <= horizon);
        before - entries.len()
    }

    pub fn tracked(&self) -> usize {
        self.entries().len()
    }
}
