use super::core::{Future, Resolution};
use super::identity::Failure;
use crate::error::Error;

/// The completion side of a working [`Future`].
///
/// Handed to executors by [`Future::new`]. Only the first settlement
/// counts: once the future has left the working state every call is a
/// no-op. Resolvers may be cloned and moved into callbacks.
pub struct Resolver<T> {
    future: Future<T>,
}

impl<T> Clone for Resolver<T> {
    fn clone(&self) -> Self {
        Self {
            future: self.future.clone(),
        }
    }
}

impl<T: Clone + 'static> Resolver<T> {
    pub(crate) fn new(future: Future<T>) -> Self {
        Self { future }
    }

    /// Completes the future with `value`.
    pub fn resolve(&self, value: T) {
        self.future.resolve_with(Resolution::Value(value));
    }

    /// Makes the future wait for `other` and adopt its outcome.
    pub fn adopt(&self, other: Future<T>) {
        self.future.resolve_with(Resolution::Awaitable(other));
    }

    /// Settles the future with either a value or another future.
    pub fn settle(&self, resolution: Resolution<T>) {
        self.future.resolve_with(resolution);
    }

    /// Fails the future with `error`, minting a fresh error identity.
    pub fn reject(&self, error: Error) {
        self.future.reject_with(Failure::rejected(error));
    }

    /// Returns `true` while the future still accepts a settlement.
    pub fn is_pending(&self) -> bool {
        self.future.state() == super::State::Working
    }

    /// The future this resolver drives.
    pub fn future(&self) -> Future<T> {
        self.future.clone()
    }

    pub(crate) fn reject_with(&self, failure: Failure) {
        self.future.reject_with(failure);
    }
}
