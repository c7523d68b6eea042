//! Dual-lane dispatch queue.

use std::collections::VecDeque;

use crate::jobs::{Lane, SendTask};

/// Two unbounded FIFO lanes.
///
/// [`DispatchQueue::pop_next`] checks the interactive lane on every call, so
/// interactive work queued in the middle of a broadcast runs before the
/// remaining bulk tasks.
#[derive(Debug, Default)]
pub struct DispatchQueue {
    interactive: VecDeque<SendTask>,
    bulk: VecDeque<SendTask>,
}

impl DispatchQueue {
    /// Empty queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            interactive: VecDeque::new(),
            bulk: VecDeque::new(),
        }
    }

    /// Append a task to the tail of its lane. Never blocks or rejects.
    pub fn enqueue(&mut self, task: SendTask) {
        match task.lane() {
            Lane::Interactive => self.interactive.push_back(task),
            Lane::Bulk => self.bulk.push_back(task),
        }
    }

    /// Pop the next task, interactive lane first.
    pub fn pop_next(&mut self) -> Option<SendTask> {
        self.interactive
            .pop_front()
            .or_else(|| self.bulk.pop_front())
    }

    /// Whether `lane` holds any task.
    #[must_use]
    pub fn has_pending(&self, lane: Lane) -> bool {
        self.len(lane) > 0
    }

    /// Number of tasks in `lane`.
    #[must_use]
    pub fn len(&self, lane: Lane) -> usize {
        match lane {
            Lane::Interactive => self.interactive.len(),
            Lane::Bulk => self.bulk.len(),
        }
    }

    /// Whether both lanes are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interactive.is_empty() && self.bulk.is_empty()
    }
}
