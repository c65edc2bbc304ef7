use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::api::types::DropEvent;

/// FIFO buffer of pending drops.
/// The connection appends whole batches; the drop consumer takes one per tick.
/// Unbounded: if the consumer is halted the queue keeps whatever arrives.
#[derive(Debug, Default)]
pub struct DropQueue {
    events: VecDeque<DropEvent>,
}

/// The queue as shared between its single producer and single consumer.
pub type SharedDropQueue = Rc<RefCell<DropQueue>>;

impl DropQueue {
    pub fn new() -> Self {
        Self {
            events: VecDeque::with_capacity(32),
        }
    }

    pub fn shared() -> SharedDropQueue {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Append a batch, keeping its order behind everything already queued.
    pub fn enqueue_many(&mut self, events: impl IntoIterator<Item = DropEvent>) {
        self.events.extend(events);
    }

    /// Take the oldest pending drop, if any.
    pub fn dequeue_one(&mut self) -> Option<DropEvent> {
        self.events.pop_front()
    }

    /// Iterate over pending drops without consuming them.
    pub fn iter(&self) -> impl Iterator<Item = &DropEvent> {
        self.events.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}
