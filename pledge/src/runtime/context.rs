use crate::error::Error;

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

thread_local! {
    /// Next identifier handed to a newly created future.
    static NEXT_FUTURE_ID: Cell<u64> = const { Cell::new(1) };

    /// Next identifier handed to a failure entering the error channel.
    ///
    /// Identities are only compared for equality, so the counter is never
    /// reset: a reset would let two live failures share an id.
    static NEXT_ERROR_ID: Cell<u64> = const { Cell::new(1) };

    /// Unobserved failures waiting to be re-raised outside of the
    /// synchronous control flow that produced them.
    ///
    /// Filled by `Future::done` when a failure reaches the end of a chain
    /// with no handler; drained by the event loop after every callback, or
    /// manually with [`take_faults`].
    static FAULTS: RefCell<VecDeque<Error>> = const { RefCell::new(VecDeque::new()) };
}

/// Allocates a fresh future identifier.
pub(crate) fn next_future_id() -> u64 {
    NEXT_FUTURE_ID.with(|id| {
        let current = id.get();
        id.set(current + 1);
        current
    })
}

/// Allocates a fresh error identifier.
pub(crate) fn next_error_id() -> u64 {
    NEXT_ERROR_ID.with(|id| {
        let current = id.get();
        id.set(current + 1);
        current
    })
}

/// Queues an unobserved failure for deferred re-raise.
pub(crate) fn defer_fault(error: Error) {
    FAULTS.with(|faults| faults.borrow_mut().push_back(error));
}

/// Returns `true` if deferred faults are waiting to be re-raised.
pub(crate) fn has_faults() -> bool {
    FAULTS.with(|faults| !faults.borrow().is_empty())
}

/// Removes and returns every deferred fault of the current thread.
///
/// An [`EventLoop`](crate::EventLoop) drains this queue on its own; code
/// that drives futures without a loop can call this to surface failures
/// that reached the end of a `done` chain unhandled.
pub fn take_faults() -> Vec<Error> {
    FAULTS.with(|faults| faults.borrow_mut().drain(..).collect())
}

/// Resets the per-thread engine state.
///
/// Drops every unhandled-error subscriber and every pending deferred fault.
/// Identifier counters keep running. Intended for test harnesses that reuse
/// a thread between cases.
pub fn reset() {
    FAULTS.with(|faults| faults.borrow_mut().clear());
    crate::unhandled::clear();
}
