//! Microwave FIFO: one cavity, many waiting mugs.
//!
//! Only the queue head runs; everything behind it waits in line. The timer
//! accrual itself lives with the kitchen tick, which asks `head()` who is
//! up. Removing a finished or discarded instance closes the gap without
//! disturbing the order of the rest.

use crate::id::InstanceId;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MicrowaveQueue {
    queue: VecDeque<InstanceId>,
}

impl MicrowaveQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the back of the line.
    pub fn enqueue(&mut self, instance: InstanceId) {
        self.queue.push_back(instance);
    }

    /// The instance currently entitled to the cavity.
    pub fn head(&self) -> Option<InstanceId> {
        self.queue.front().copied()
    }

    /// Remove an instance wherever it stands. Returns whether it was queued.
    pub fn remove(&mut self, instance: InstanceId) -> bool {
        let before = self.queue.len();
        self.queue.retain(|&i| i != instance);
        self.queue.len() != before
    }

    /// Zero-based place in line, 0 being the cavity.
    pub fn position(&self, instance: InstanceId) -> Option<usize> {
        self.queue.iter().position(|&i| i == instance)
    }

    pub fn contains(&self, instance: InstanceId) -> bool {
        self.position(instance).is_some()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = InstanceId> + '_ {
        self.queue.iter().copied()
    }
}
