use super::scope::TimerScope;
use crate::future::{Future, Resolution};

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

/// Creates a future that succeeds once `duration` has elapsed on `scope`.
///
/// Canceling the future clears its timer. Disposing the scope first cancels
/// the future, and a scope that is already disposed yields a canceled
/// future right away.
///
/// The future does not keep `scope` alive. Dropping the last handle to the
/// scope disposes it, so a scope created inline for the call cancels the
/// sleep as soon as the statement ends.
///
/// # Examples
///
/// ```rust,ignore
/// let event_loop = EventLoop::manual();
/// let scope = event_loop.scope();
/// let nap = sleep(&scope, Duration::from_millis(10));
///
/// event_loop.advance(Duration::from_millis(10));
/// assert_eq!(nap.value(), Some(()));
/// ```
pub fn sleep(scope: &TimerScope, duration: Duration) -> Future<()> {
    let timer = Rc::new(Cell::new(None));
    let weak = scope.downgrade();

    let future = {
        let timer = timer.clone();

        Future::pending(Some(Box::new(move || {
            if let Some(handle) = timer.take() {
                weak.cancel(handle);
            }
        })))
    };

    let elapsed = future.clone();
    let disposed = future.clone();

    let handle = scope.after_or_dispose(
        duration,
        move || elapsed.resolve_with(Resolution::Value(())),
        move || disposed.cancel(),
    );

    match handle {
        Some(handle) => timer.set(Some(handle)),
        None => future.cancel(),
    }

    future
}
