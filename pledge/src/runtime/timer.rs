use std::cmp::Ordering;
use std::time::Duration;

/// An entry in the event loop's timer queue.
///
/// `TimerEntry` points at a callback scheduled for a specific deadline. It
/// is stored in a binary heap ordered by deadline, then by scheduling
/// order, so callbacks due at the same instant run first-in first-out.
///
/// The callback itself lives in the loop's callback table; an entry whose
/// callback was cleared is skipped when popped.
pub(crate) struct TimerEntry {
    /// Loop time at which the callback becomes due.
    pub(crate) deadline: Duration,

    /// Scheduling order, unique per loop.
    pub(crate) seq: u64,

    /// Key of the callback in the loop's callback table.
    pub(crate) id: u64,
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Ord for TimerEntry {
    /// Orders timer entries by deadline, then by sequence.
    ///
    /// The comparison is **reversed** so that a `BinaryHeap<TimerEntry>`
    /// behaves as a min-heap, where the earliest entry is popped first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
