//! The process-wide unhandled-error channel.
//!
//! The engine publishes one [`UnhandledError`] per root failure that reaches
//! a chain link with no failure handler attached. Cancellations are never
//! published. Telemetry and error-reporting code subscribes here.
//!
//! The engine is single-threaded, so "process-wide" means "per thread": the
//! subscriber list is thread-local and needs no lock. Subscribers must not
//! assume delivery happens synchronously with any particular settlement.
//!
//! ```rust,ignore
//! let _subscription = pledge::unhandled::subscribe(|report| {
//!     tracing::warn!(error = %report.error, "unhandled failure");
//! });
//! ```

use crate::error::Error;
use crate::future::{ErrorIdentity, FutureId};

use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe, Location};
use std::rc::Rc;

type Subscriber = Rc<dyn Fn(&UnhandledError)>;

thread_local! {
    static SUBSCRIBERS: RefCell<Vec<(u64, Subscriber)>> = const { RefCell::new(Vec::new()) };
    static NEXT_SUBSCRIPTION: Cell<u64> = const { Cell::new(1) };
}

/// A notification about a failure nobody handled.
#[derive(Debug, Clone)]
pub struct UnhandledError {
    /// The failure value.
    pub error: Error,

    /// Identity of the root failure; stable along the chain it travelled.
    pub identity: ErrorIdentity,

    /// The future holding the failure when it met a link without a handler.
    pub future: FutureId,

    /// Where the handler-less link was registered, when known.
    pub site: Option<&'static Location<'static>>,
}

/// Keeps a subscriber registered until dropped.
#[must_use = "dropping a Subscription unsubscribes immediately"]
#[derive(Debug)]
pub struct Subscription {
    id: u64,
}

impl Subscription {
    /// Keeps the subscriber registered for the lifetime of the thread.
    pub fn detach(self) {
        std::mem::forget(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let id = self.id;
        // The channel may already be gone during thread teardown.
        let _ = SUBSCRIBERS.try_with(|subscribers| {
            subscribers.borrow_mut().retain(|(sid, _)| *sid != id)
        });
    }
}

/// Registers `subscriber` on the current thread's channel.
pub fn subscribe<F>(subscriber: F) -> Subscription
where
    F: Fn(&UnhandledError) + 'static,
{
    let id = NEXT_SUBSCRIPTION.with(|next| {
        let id = next.get();
        next.set(id + 1);
        id
    });

    SUBSCRIBERS.with(|subscribers| subscribers.borrow_mut().push((id, Rc::new(subscriber))));

    Subscription { id }
}

/// Number of subscribers currently registered on this thread.
pub fn subscriber_count() -> usize {
    SUBSCRIBERS.with(|subscribers| subscribers.borrow().len())
}

/// Delivers `report` to every subscriber.
///
/// The list is snapshotted first so a subscriber may (un)subscribe while
/// being notified. A panicking subscriber is logged and skipped.
pub(crate) fn publish(report: UnhandledError) {
    tracing::debug!(
        future = %report.future,
        error_id = report.identity.id(),
        exception = report.identity.is_exception(),
        error = %report.error,
        "unhandled failure"
    );

    let subscribers: Vec<Subscriber> = SUBSCRIBERS.with(|subscribers| {
        subscribers
            .borrow()
            .iter()
            .map(|(_, subscriber)| subscriber.clone())
            .collect()
    });

    for subscriber in subscribers {
        if panic::catch_unwind(AssertUnwindSafe(|| subscriber(&report))).is_err() {
            tracing::warn!(future = %report.future, "unhandled-error subscriber panicked");
        }
    }
}

/// Drops every subscriber of the current thread.
pub(crate) fn clear() {
    SUBSCRIBERS.with(|subscribers| subscribers.borrow_mut().clear());
}
