use super::scope::TimerScope;
use crate::error::Error;
use crate::future::{Failure, Future, Outcome};

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

/// Bounds `future` by `duration` on `scope`.
///
/// The returned future settles like `future` if it settles in time, with
/// the same failure identity. Otherwise it fails with [`Error::Timeout`]
/// and `future` is canceled. Settling first, or canceling the returned
/// future, clears the timer.
///
/// Without a future, the returned future simply fails with
/// [`Error::Timeout`] once `duration` has elapsed.
///
/// Disposing the scope before the deadline cancels the returned future,
/// and with it `future`. Dropping the last handle to `scope` disposes it.
///
/// # Examples
///
/// ```rust,ignore
/// let signal = Signal::<u32>::new();
/// let bounded = timeout(&scope, Duration::from_millis(50), signal.future());
///
/// event_loop.advance(Duration::from_millis(50));
/// assert_eq!(bounded.error(), Some(Error::Timeout));
/// assert!(signal.future().is_canceled());
/// ```
pub fn timeout<T, F>(scope: &TimerScope, duration: Duration, future: F) -> Future<T>
where
    T: Clone + 'static,
    F: Into<Option<Future<T>>>,
{
    let future = future.into();
    let timer = Rc::new(Cell::new(None));
    let weak = scope.downgrade();

    let result = {
        let timer = timer.clone();
        let guarded = future.clone();

        Future::pending(Some(Box::new(move || {
            if let Some(handle) = timer.take() {
                weak.cancel(handle);
            }

            if let Some(guarded) = guarded {
                guarded.cancel();
            }
        })))
    };

    let handle = {
        let expired = result.clone();
        let disposed = result.clone();
        let guarded = future.clone();

        scope.after_or_dispose(
            duration,
            move || {
                tracing::debug!(future = %expired.id(), ?duration, "timed out");
                expired.reject_with(Failure::rejected(Error::Timeout));

                if let Some(guarded) = guarded {
                    guarded.cancel();
                }
            },
            move || disposed.cancel(),
        )
    };

    match handle {
        Some(handle) => timer.set(Some(handle)),
        None => result.cancel(),
    }

    if let Some(future) = future {
        let result = result.clone();
        let weak = scope.downgrade();

        future.listen(Box::new(move |outcome: Outcome<T>| {
            if let Some(handle) = timer.take() {
                weak.cancel(handle);
            }

            result.settle_outcome(outcome);
        }));
    }

    result
}
