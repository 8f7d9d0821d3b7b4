//! Bounded FIFO buffer of the most recent events.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use banter_types::Event;

/// Default number of events kept in the window.
pub const DEFAULT_WINDOW: usize = 250;

/// Time-ordered window over the last `capacity` events.
///
/// Pushing past capacity evicts from the front; snapshots are always returned
/// in insertion order.
pub struct RecencyWindow {
    capacity: usize,
    events: Mutex<VecDeque<Arc<Event>>>,
}

impl Default for RecencyWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl RecencyWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            events: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    fn events(&self) -> MutexGuard<'_, VecDeque<Arc<Event>>> {
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn push(&self, event: Arc<Event>) {
        let mut events = self.events();
        events.push_back(event);
        while events.len() > self.capacity {
            events.pop_front();
        }
    }

    /// The last `last_n` events, oldest first.
    pub fn snapshot(&self, last_n: usize) -> Vec<Arc<Event>> {
        let events = self.events();
        let skip = events.len().saturating_sub(last_n);
        events.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of windowed events carrying an attachment.
    pub fn attachment_count(&self) -> usize {
        self.events().iter().filter(|e| e.has_attachment).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use banter_types::{InboundMessage, Sentiment};

    fn event(text: &str) -> Arc<Event> {
        Arc::new(Event::from_inbound(
            &InboundMessage::new(1, "a", text),
            Sentiment::Neutral,
            0.5,
        ))
    }

    fn texts(events: &[Arc<Event>]) -> Vec<String> {
        events.iter().map(|e| e.text.clone()).collect()
    }

    #[test]
    fn snapshot_returns_tail_in_insertion_order() {
        let window = RecencyWindow::new(10);
        for t in ["a", "b", "c", "d"] {
            window.push(event(t));
        }
        assert_eq!(texts(&window.snapshot(2)), vec!["c", "d"]);
        assert_eq!(texts(&window.snapshot(100)), vec!["a", "b", "c", "d"]);
        assert!(window.snapshot(0).is_empty());
    }

    #[test]
    fn never_exceeds_capacity() {
        let window = RecencyWindow::new(3);
        for i in 0..10 {
            window.push(event(&i.to_string()));
            assert!(window.len() <= 3);
        }
        assert_eq!(texts(&window.snapshot(3)), vec!["7", "8", "9"]);
    }

    #[test]
    fn counts_attachments() {
        let window = RecencyWindow::default();
        window.push(event("plain"));
        window.push(Arc::new(Event::from_inbound(
            &InboundMessage::new(2, "b", "pic").with_attachment(None),
            Sentiment::Neutral,
            0.8,
        )));
        assert_eq!(window.attachment_count(), 1);
        assert_eq!(window.capacity(), DEFAULT_WINDOW);
    }
}
