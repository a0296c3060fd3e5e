use crate::core::event::Event;
use std::collections::VecDeque;
use tracing::warn;

/// FIFO buffer of events waiting for a connection
///
/// Append at the tail, flush from the head, never reorder. Unbounded unless
/// a capacity is given, in which case the oldest entry is dropped to make
/// room for a new one.
#[derive(Debug, Default)]
pub struct OutboundQueue {
    entries: VecDeque<Event>,
    capacity: Option<usize>,
}

impl OutboundQueue {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
        }
    }

    /// Append to the tail
    ///
    /// Returns the entry evicted to respect the capacity, if any.
    pub fn enqueue(&mut self, event: Event) -> Option<Event> {
        let evicted = match self.capacity {
            Some(0) => {
                warn!("Outbound queue has zero capacity, dropping event {}", event.id());
                return Some(event);
            }
            Some(cap) if self.entries.len() >= cap => self.entries.pop_front(),
            _ => None,
        };

        if let Some(ref dropped) = evicted {
            warn!(
                "Outbound queue full ({} entries), dropping oldest event {}",
                self.entries.len() + 1,
                dropped.id()
            );
        }

        self.entries.push_back(event);
        evicted
    }

    /// Remove and return every entry in FIFO order
    pub fn drain(&mut self) -> Vec<Event> {
        self.entries.drain(..).collect()
    }

    /// Put back the unsent remainder of a flush, ahead of anything queued since
    pub fn requeue_front(&mut self, events: Vec<Event>) {
        for event in events.into_iter().rev() {
            self.entries.push_front(event);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}
