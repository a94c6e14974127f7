//! Override store: per-operation values that preempt declared defaults.
//!
//! Each operation has an optional single override, which persists until
//! replaced, and a FIFO queue whose head is consumed per call. The two are
//! independent: setting one never clears the other.

use crate::value::Value;
use std::collections::{HashMap, VecDeque};

/// Outcome of consulting the store for one call
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    /// Head of the queue (now consumed)
    Queued(Value),
    /// The single override
    Single(Value),
    /// Nothing set; fall through to state and defaults
    None,
}

impl Resolved {
    /// The overriding value, if any
    #[must_use]
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Queued(v) | Self::Single(v) => Some(v),
            Self::None => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct OverrideSlot {
    single: Option<Value>,
    queue: VecDeque<Value>,
}

/// Overrides for every operation on one surface
#[derive(Debug, Clone, Default)]
pub struct OverrideStore {
    slots: HashMap<String, OverrideSlot>,
}

impl OverrideStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the single override; the queue is untouched
    pub fn set_single(&mut self, operation: &str, value: Value) {
        self.slots.entry(operation.to_string()).or_default().single = Some(value);
    }

    /// Replace the whole queue; the single override is untouched
    pub fn set_queue(&mut self, operation: &str, values: impl IntoIterator<Item = Value>) {
        self.slots.entry(operation.to_string()).or_default().queue = values.into_iter().collect();
    }

    /// Consult the store for one call, consuming the queue head if present
    pub fn next(&mut self, operation: &str) -> Resolved {
        let Some(slot) = self.slots.get_mut(operation) else {
            return Resolved::None;
        };
        if let Some(head) = slot.queue.pop_front() {
            return Resolved::Queued(head);
        }
        slot.single.clone().map_or(Resolved::None, Resolved::Single)
    }

    /// Remaining queued values for an operation
    #[must_use]
    pub fn queued_len(&self, operation: &str) -> usize {
        self.slots.get(operation).map_or(0, |s| s.queue.len())
    }

    /// Whether a single override is set
    #[must_use]
    pub fn has_single(&self, operation: &str) -> bool {
        self.slots.get(operation).is_some_and(|s| s.single.is_some())
    }

    /// Drop both the single override and the queue for an operation
    pub fn clear(&mut self, operation: &str) {
        self.slots.remove(operation);
    }

    /// Check if no override of any kind is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots
            .values()
            .all(|s| s.single.is_none() && s.queue.is_empty())
    }
}
