//! Priority-ordered task queue entries.

use std::cmp::Ordering;
use std::future::Future;
use std::pin::Pin;
use vigil_core::Priority;

pub(crate) type BoxedJob = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// A task waiting for a free slot.
///
/// `BinaryHeap` is a max-heap, so the ordering is reversed: the most urgent
/// class wins, then the lowest sequence number (FIFO within a class).
pub(crate) struct QueuedTask {
    pub priority: Priority,
    pub sequence: u64,
    pub job: BoxedJob,
}

impl PartialEq for QueuedTask {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}

impl Eq for QueuedTask {}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedTask {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}
