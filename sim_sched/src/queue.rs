//! Ordered queues of process handles
//!
//! Every queue in the simulation (the ready queue and each resource's wait
//! queue) is a [`HandleQueue`]. A handle is removed from its source queue
//! before it is inserted anywhere else, so a process can never appear in
//! two queues at once.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Stable reference to a slot in the process arena
///
/// Arena slots are never reused, so a handle stays valid for the lifetime
/// of its simulation. Dereferencing a handle whose process has been
/// retired is an internal-consistency violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessHandle(pub(crate) usize);

/// Ordered queue of process handles
///
/// FIFO by construction. Policies that select by scan (SJF, STCF,
/// Priority) iterate in queue order and remove the winner by handle, which
/// keeps "first-found wins ties" equivalent to "earliest-queued wins".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleQueue {
    queue: VecDeque<ProcessHandle>,
}

impl HandleQueue {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Appends a handle at the tail
    pub fn push_back(&mut self, handle: ProcessHandle) {
        self.queue.push_back(handle);
    }

    /// Removes and returns the head
    pub fn pop_front(&mut self) -> Option<ProcessHandle> {
        self.queue.pop_front()
    }

    /// Removes `handle` wherever it sits, preserving the order of the rest
    pub fn remove(&mut self, handle: ProcessHandle) {
        self.queue.retain(|&h| h != handle);
    }

    pub fn contains(&self, handle: ProcessHandle) -> bool {
        self.queue.iter().any(|&h| h == handle)
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Iterates handles in queue order, head first
    pub fn iter(&self) -> impl Iterator<Item = ProcessHandle> + '_ {
        self.queue.iter().copied()
    }
}
