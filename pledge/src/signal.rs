//! Manually completed futures.
//!
//! A [`Signal`] bridges callback-style completion into the future world: it
//! owns one [`Future`] and exposes `complete`/`fail` entry points without
//! requiring an executor closure.
//!
//! ```rust,ignore
//! let signal = Signal::new();
//! let future = signal.future();
//!
//! on_message(move |payload| signal.complete(payload));
//! ```

use crate::error::Error;
use crate::future::{Failure, Future, Resolution, Resolver};

/// A future completed by hand.
///
/// Only the first of `complete`, `complete_with`, `fail` and `cancel` has an
/// effect; the wrapped future is terminal afterwards.
pub struct Signal<T> {
    resolver: Resolver<T>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            resolver: self.resolver.clone(),
        }
    }
}

impl<T: Clone + 'static> Signal<T> {
    /// Creates a signal whose future has no cancel action.
    pub fn new() -> Self {
        Self::from_future(Future::pending(None))
    }

    /// Creates a signal whose future runs `on_cancel` when canceled before
    /// completion.
    pub fn with_cancel<C>(on_cancel: C) -> Self
    where
        C: FnOnce() + 'static,
    {
        Self::from_future(Future::pending(Some(Box::new(on_cancel))))
    }

    fn from_future(future: Future<T>) -> Self {
        Self {
            resolver: Resolver::new(future),
        }
    }

    /// Completes the wrapped future with `value`.
    pub fn complete(&self, value: T) {
        self.resolver.resolve(value);
    }

    /// Completes the wrapped future with a value or another future.
    pub fn complete_with(&self, resolution: Resolution<T>) {
        self.resolver.settle(resolution);
    }

    /// Fails the wrapped future with `error`.
    pub fn fail(&self, error: Error) {
        self.resolver.reject(error);
    }

    /// Fails the wrapped future with a failure observed elsewhere, keeping
    /// its identity.
    pub(crate) fn fail_with(&self, failure: Failure) {
        self.resolver.reject_with(failure);
    }

    /// Cancels the wrapped future.
    pub fn cancel(&self) {
        self.resolver.future().cancel();
    }

    /// Returns `true` until the wrapped future is settled or canceled.
    pub fn is_pending(&self) -> bool {
        self.resolver.is_pending()
    }

    /// The wrapped future. Every call returns the same future.
    pub fn future(&self) -> Future<T> {
        self.resolver.future()
    }
}

impl<T: Clone + 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}
