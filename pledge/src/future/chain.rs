//! Continuations: chaining a future into a new one, or consuming it.

use super::core::{Future, Outcome, Resolution};
use super::identity::{Failure, FutureId};
use crate::error::Error;
use crate::runtime::{context, pump};

use std::panic::Location;

type Handler<A, U> = Box<dyn FnOnce(A) -> Result<Resolution<U>, Error>>;
type Consumer<A> = Box<dyn FnOnce(A)>;

impl<T: Clone + 'static> Future<T> {
    /// Chains a success handler and a failure handler.
    ///
    /// The returned future settles with whatever the handler that runs
    /// returns: a value, or another future whose outcome is adopted. An
    /// `Err` return or a panic fails it with an exception-sourced identity.
    ///
    /// When this future is already terminal the handler runs right away and
    /// no listener is registered. Canceling the returned future while this
    /// one is still pending cancels this one too.
    #[track_caller]
    pub fn continue_with<U, S, F>(&self, on_success: S, on_failure: F) -> Future<U>
    where
        U: Clone + 'static,
        S: FnOnce(T) -> Result<Resolution<U>, Error> + 'static,
        F: FnOnce(Error) -> Result<Resolution<U>, Error> + 'static,
    {
        self.chain(
            Box::new(on_success),
            Some(Box::new(on_failure)),
            Location::caller(),
        )
    }

    /// Chains a fallible success handler; failures pass through unchanged.
    #[track_caller]
    pub fn then<U, S>(&self, on_success: S) -> Future<U>
    where
        U: Clone + 'static,
        S: FnOnce(T) -> Result<U, Error> + 'static,
    {
        self.chain(
            Box::new(move |value| on_success(value).map(Resolution::Value)),
            None,
            Location::caller(),
        )
    }

    /// Chains an infallible success handler; failures pass through unchanged.
    #[track_caller]
    pub fn map<U, S>(&self, on_success: S) -> Future<U>
    where
        U: Clone + 'static,
        S: FnOnce(T) -> U + 'static,
    {
        self.chain(
            Box::new(move |value| Ok(Resolution::Value(on_success(value)))),
            None,
            Location::caller(),
        )
    }

    /// Chains a success handler returning another future, whose outcome the
    /// returned future adopts.
    #[track_caller]
    pub fn and_then<U, S>(&self, on_success: S) -> Future<U>
    where
        U: Clone + 'static,
        S: FnOnce(T) -> Future<U> + 'static,
    {
        self.chain(
            Box::new(move |value| Ok(Resolution::Awaitable(on_success(value)))),
            None,
            Location::caller(),
        )
    }

    /// Chains a failure handler; values pass through unchanged.
    #[track_caller]
    pub fn recover<F>(&self, on_failure: F) -> Future<T>
    where
        F: FnOnce(Error) -> Result<T, Error> + 'static,
    {
        self.chain(
            Box::new(|value| Ok(Resolution::Value(value))),
            Some(Box::new(move |error| on_failure(error).map(Resolution::Value))),
            Location::caller(),
        )
    }

    /// Chains a failure handler returning another future.
    #[track_caller]
    pub fn or_else<F>(&self, on_failure: F) -> Future<T>
    where
        F: FnOnce(Error) -> Future<T> + 'static,
    {
        self.chain(
            Box::new(|value| Ok(Resolution::Value(value))),
            Some(Box::new(move |error| Ok(Resolution::Awaitable(on_failure(error))))),
            Location::caller(),
        )
    }

    /// Observes a failure without handling it: the failure, and its
    /// identity, continue down the chain.
    #[track_caller]
    pub fn inspect_err<F>(&self, inspect: F) -> Future<T>
    where
        F: FnOnce(&Error) + 'static,
    {
        let site = Location::caller();
        let source = self.id();

        self.chain_raw(
            Box::new(|value| Ok(Resolution::Value(value))),
            Box::new(move |failure: Failure, target: &Future<T>| {
                if let Err(error) = pump::guarded(|| {
                    inspect(&failure.error);
                    Ok(())
                }) {
                    target.reject_with(Failure::thrown(error));
                    return;
                }

                failure.report(source, Some(site));
                target.reject_with(failure);
            }),
        )
    }

    /// Consumes the outcome without producing a new future.
    ///
    /// A failure reaching this point is surfaced: it is published on the
    /// [`unhandled`](crate::unhandled) channel (once per identity) and queued
    /// for a deferred re-raise, unless it is a cancellation.
    #[track_caller]
    pub fn done<S>(&self, on_success: S)
    where
        S: FnOnce(T) + 'static,
    {
        self.consume(Box::new(on_success), None, Location::caller());
    }

    /// Consumes the outcome with both handlers.
    ///
    /// A panic in either handler is surfaced the same way as an unhandled
    /// failure.
    #[track_caller]
    pub fn done_with<S, F>(&self, on_success: S, on_failure: F)
    where
        S: FnOnce(T) + 'static,
        F: FnOnce(Error) + 'static,
    {
        self.consume(
            Box::new(on_success),
            Some(Box::new(on_failure)),
            Location::caller(),
        );
    }

    fn chain<U>(
        &self,
        on_success: Handler<T, U>,
        on_failure: Option<Handler<Error, U>>,
        site: &'static Location<'static>,
    ) -> Future<U>
    where
        U: Clone + 'static,
    {
        let source = self.id();

        self.chain_raw(
            on_success,
            Box::new(move |failure: Failure, target: &Future<U>| match on_failure {
                Some(handler) => target.settle_handler(handler, failure.error),
                None => {
                    failure.report(source, Some(site));
                    target.reject_with(failure);
                }
            }),
        )
    }

    /// Shared plumbing of every chaining form.
    ///
    /// `on_failure` receives the failure with its identity, and the future
    /// it must settle.
    fn chain_raw<U>(
        &self,
        on_success: Handler<T, U>,
        on_failure: Box<dyn FnOnce(Failure, &Future<U>)>,
    ) -> Future<U>
    where
        U: Clone + 'static,
    {
        if let Some(outcome) = self.terminal_outcome() {
            return match outcome {
                Outcome::Success(value) => match pump::guarded(|| on_success(value)) {
                    Ok(resolution) => Future::from_resolution(resolution),
                    Err(error) => Future::from_failure(Failure::thrown(error)),
                },
                Outcome::Failure(failure) => {
                    let target = Future::pending(None);
                    on_failure(failure, &target);
                    target
                }
            };
        }

        let upstream = self.clone();
        let downstream = Future::pending(Some(Box::new(move || upstream.cancel())));
        let target = downstream.clone();

        self.listen(Box::new(move |outcome| match outcome {
            Outcome::Success(value) => target.settle_handler(on_success, value),
            Outcome::Failure(failure) => on_failure(failure, &target),
        }));

        downstream
    }

    fn consume(
        &self,
        on_success: Consumer<T>,
        on_failure: Option<Consumer<Error>>,
        site: &'static Location<'static>,
    ) {
        let source = self.id();

        self.listen(Box::new(move |outcome| match outcome {
            Outcome::Success(value) => {
                if let Err(error) = pump::guarded(|| {
                    on_success(value);
                    Ok(())
                }) {
                    surface(Failure::thrown(error), source, site);
                }
            }
            Outcome::Failure(failure) => match on_failure {
                Some(handler) => {
                    if let Err(error) = pump::guarded(|| {
                        handler(failure.error);
                        Ok(())
                    }) {
                        surface(Failure::thrown(error), source, site);
                    }
                }
                None => surface(failure, source, site),
            },
        }));
    }
}

/// Reports an unhandled failure at the end of a chain and queues it for a
/// deferred re-raise.
fn surface(failure: Failure, source: FutureId, site: &'static Location<'static>) {
    if failure.error.is_canceled() {
        return;
    }

    failure.report(source, Some(site));
    context::defer_fault(failure.error);
}
