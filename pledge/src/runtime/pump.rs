//! The notify pump.
//!
//! Listener notification never recurses: a future entering a notify state
//! pushes its notify pass onto a thread-local work queue. The outermost
//! caller drains the queue before returning, so a settlement issued outside
//! any notify pass has fully cascaded once it returns, and a chain of any
//! length is walked with a constant stack depth.

use crate::error::Error;

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};

type Job = Box<dyn FnOnce()>;

thread_local! {
    static QUEUE: RefCell<VecDeque<Job>> = const { RefCell::new(VecDeque::new()) };

    /// Set while some frame of the current thread is draining `QUEUE`.
    static DRAINING: Cell<bool> = const { Cell::new(false) };
}

/// Clears the draining flag even if a job unwinds.
struct DrainGuard;

impl Drop for DrainGuard {
    fn drop(&mut self) {
        DRAINING.with(|draining| draining.set(false));
    }
}

/// Queues `job` and drains the queue unless a drain is already in progress.
pub(crate) fn dispatch(job: Job) {
    QUEUE.with(|queue| queue.borrow_mut().push_back(job));

    if DRAINING.with(|draining| draining.replace(true)) {
        return;
    }

    let _guard = DrainGuard;

    while let Some(job) = QUEUE.with(|queue| queue.borrow_mut().pop_front()) {
        job();
    }
}

/// Returns `true` while a notify pass is running on this thread.
pub fn is_draining() -> bool {
    DRAINING.with(|draining| draining.get())
}

/// Runs user code, turning a panic into [`Error::Panic`].
pub(crate) fn guarded<R>(f: impl FnOnce() -> Result<R, Error>) -> Result<R, Error> {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| Err(Error::from_panic(payload)))
}
