use super::identity::{ErrorIdentity, Failure, FutureId};
use super::resolver::Resolver;
use super::state::State;
use crate::error::Error;
use crate::runtime::pump;

use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

/// What a resolver, or a handler, hands to a future.
///
/// Resolving with [`Resolution::Awaitable`] makes the future adopt the
/// eventual outcome of the inner future instead of completing with it.
pub enum Resolution<T> {
    /// Complete with this value.
    Value(T),
    /// Wait for this future and take over its outcome.
    Awaitable(Future<T>),
}

impl<T> From<Future<T>> for Resolution<T> {
    fn from(future: Future<T>) -> Self {
        Resolution::Awaitable(future)
    }
}

/// The settled outcome handed to listeners.
pub(crate) enum Outcome<T> {
    Success(T),
    Failure(Failure),
}

impl<T: Clone> Clone for Outcome<T> {
    fn clone(&self) -> Self {
        match self {
            Outcome::Success(value) => Outcome::Success(value.clone()),
            Outcome::Failure(failure) => Outcome::Failure(failure.clone()),
        }
    }
}

/// A pending continuation, already bound to whatever it drives.
pub(crate) type Listener<T> = Box<dyn FnOnce(Outcome<T>)>;

enum Slot<T> {
    Empty,
    Waiting(Future<T>),
    Value(T),
    Failed(Failure),
}

pub(crate) struct Inner<T> {
    id: FutureId,
    state: State,

    /// Transition requested but not yet entered by the pump.
    next: Option<State>,

    slot: Slot<T>,
    listeners: Vec<Listener<T>>,

    /// Runs once if the future is canceled while working.
    on_cancel: Option<Box<dyn FnOnce()>>,
}

impl<T: Clone> Inner<T> {
    fn outcome(&self) -> Option<Outcome<T>> {
        match &self.slot {
            Slot::Value(value) => Some(Outcome::Success(value.clone())),
            Slot::Failed(failure) => Some(Outcome::Failure(failure.clone())),
            Slot::Empty | Slot::Waiting(_) => None,
        }
    }
}

/// A value, or a failure, that becomes available at most once.
///
/// `Future` is a cheap handle: clones refer to the same state cell, which is
/// why `cancel` and listener registration take `&self`. The type is
/// single-threaded (`!Send`); all state transitions happen on the thread
/// that created it.
///
/// # Examples
///
/// ```rust,ignore
/// let doubled = Future::ready(21).map(|v| v * 2);
/// assert_eq!(doubled.value(), Some(42));
/// ```
pub struct Future<T> {
    pub(crate) inner: Rc<RefCell<Inner<T>>>,
}

impl<T> Clone for Future<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for Future<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(inner) => f
                .debug_struct("Future")
                .field("id", &inner.id)
                .field("state", &inner.state)
                .field("listeners", &inner.listeners.len())
                .finish(),
            Err(_) => f.debug_struct("Future").finish_non_exhaustive(),
        }
    }
}

impl<T> Future<T> {
    /// Returns `true` if both handles refer to the same future.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Identifier of this future.
    pub fn id(&self) -> FutureId {
        self.inner.borrow().id
    }

    /// Current state.
    pub fn state(&self) -> State {
        self.inner.borrow().state
    }

    /// Returns `true` once the outcome is known.
    pub fn is_settled(&self) -> bool {
        self.state().is_settled()
    }

    /// Returns `true` once the future has failed with the cancellation
    /// sentinel.
    pub fn is_canceled(&self) -> bool {
        matches!(&self.inner.borrow().slot, Slot::Failed(failure) if failure.error.is_canceled())
    }

    /// Identity of the failure held by this future, if it failed.
    pub fn error_identity(&self) -> Option<ErrorIdentity> {
        match &self.inner.borrow().slot {
            Slot::Failed(failure) => Some(failure.identity()),
            _ => None,
        }
    }
}

impl<T: Clone + 'static> Future<T> {
    fn from_parts(state: State, next: Option<State>, slot: Slot<T>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                id: FutureId::next(),
                state,
                next,
                slot,
                listeners: Vec::new(),
                on_cancel: None,
            })),
        }
    }

    /// Creates a working future with no executor attached.
    pub(crate) fn pending(on_cancel: Option<Box<dyn FnOnce()>>) -> Self {
        let future = Self::from_parts(State::Created, Some(State::Working), Slot::Empty);
        future.inner.borrow_mut().on_cancel = on_cancel;
        future.run();
        future
    }

    /// Creates a future driven by `executor`.
    ///
    /// The executor runs synchronously with a [`Resolver`] for the new
    /// future. Returning `Err`, or panicking, rejects the future with an
    /// exception-sourced failure.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let future = Future::new(|resolver| {
    ///     resolver.resolve(7);
    ///     Ok(())
    /// });
    /// ```
    pub fn new<E>(executor: E) -> Self
    where
        E: FnOnce(Resolver<T>) -> Result<(), Error>,
    {
        Self::start(executor, None)
    }

    /// Creates a future driven by `executor` that runs `on_cancel` if it is
    /// canceled before completing (for example to abort an in-flight request).
    pub fn with_cancel<E, C>(executor: E, on_cancel: C) -> Self
    where
        E: FnOnce(Resolver<T>) -> Result<(), Error>,
        C: FnOnce() + 'static,
    {
        Self::start(executor, Some(Box::new(on_cancel)))
    }

    fn start<E>(executor: E, on_cancel: Option<Box<dyn FnOnce()>>) -> Self
    where
        E: FnOnce(Resolver<T>) -> Result<(), Error>,
    {
        let future = Self::pending(on_cancel);
        let resolver = Resolver::new(future.clone());

        if let Err(error) = pump::guarded(|| executor(resolver)) {
            future.reject_with(Failure::thrown(error));
        }

        future
    }

    /// A future that already succeeded with `value`.
    pub fn ready(value: T) -> Self {
        Self::from_parts(State::Success, None, Slot::Value(value))
    }

    /// A future that already failed with `error`.
    pub fn failed(error: Error) -> Self {
        Self::from_failure(Failure::rejected(error))
    }

    /// A future that is already canceled.
    pub fn canceled() -> Self {
        Self::from_failure(Failure::canceled())
    }

    pub(crate) fn from_failure(failure: Failure) -> Self {
        Self::from_parts(State::Error, None, Slot::Failed(failure))
    }

    pub(crate) fn from_resolution(resolution: Resolution<T>) -> Self {
        match resolution {
            Resolution::Value(value) => Self::ready(value),
            Resolution::Awaitable(future) => future,
        }
    }

    /// The value, once the future has succeeded.
    pub fn value(&self) -> Option<T> {
        match &self.inner.borrow().slot {
            Slot::Value(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// The failure, once the future has failed.
    pub fn error(&self) -> Option<Error> {
        match &self.inner.borrow().slot {
            Slot::Failed(failure) => Some(failure.error.clone()),
            _ => None,
        }
    }

    /// The outcome, once the future has settled.
    pub fn outcome(&self) -> Option<Result<T, Error>> {
        match self.inner.borrow().outcome()? {
            Outcome::Success(value) => Some(Ok(value)),
            Outcome::Failure(failure) => Some(Err(failure.error)),
        }
    }

    /// The outcome of a terminal future, for fast paths.
    pub(crate) fn terminal_outcome(&self) -> Option<Outcome<T>> {
        let inner = self.inner.borrow();

        if inner.state.is_terminal() {
            inner.outcome()
        } else {
            None
        }
    }

    /// Cancels the future.
    ///
    /// A working future runs its cancel action and fails with
    /// [`Error::Canceled`]. A waiting future forwards the cancellation to the
    /// future it waits on first, and only fails with `Canceled` if that
    /// future's outcome has not landed meanwhile. Canceling a settled future
    /// is a no-op.
    pub fn cancel(&self) {
        let id = {
            let mut inner = self.inner.borrow_mut();

            let next = match inner.state {
                State::Working => State::Canceled,
                State::Waiting => State::WaitingCanceled,
                _ => return,
            };

            inner.next = Some(next);
            inner.id
        };

        tracing::debug!(future = %id, "cancel requested");
        self.run();
    }

    /// Registers a listener, invoking it at once if the future is terminal.
    ///
    /// During a notify pass the listener is queued behind the ones already
    /// registered so registration order is kept.
    pub(crate) fn listen(&self, listener: Listener<T>) {
        match self.terminal_outcome() {
            Some(outcome) => listener(outcome),
            None => self.inner.borrow_mut().listeners.push(listener),
        }
    }

    /// Settles a working future. Ignored in any other state.
    pub(crate) fn resolve_with(&self, resolution: Resolution<T>) {
        {
            let mut inner = self.inner.borrow_mut();

            if inner.state != State::Working || inner.next.is_some() {
                return;
            }

            match resolution {
                Resolution::Value(value) => {
                    inner.slot = Slot::Value(value);
                    inner.next = Some(State::SuccessNotify);
                }
                Resolution::Awaitable(future) if Rc::ptr_eq(&future.inner, &self.inner) => {
                    inner.slot = Slot::Failed(Failure::rejected(Error::SelfResolution));
                    inner.next = Some(State::ErrorNotify);
                }
                Resolution::Awaitable(future) => {
                    inner.slot = Slot::Waiting(future);
                    inner.next = Some(State::Waiting);
                }
            }

            inner.on_cancel = None;
        }

        self.run();
    }

    /// Fails a working future. Ignored in any other state.
    pub(crate) fn reject_with(&self, failure: Failure) {
        {
            let mut inner = self.inner.borrow_mut();

            if inner.state != State::Working || inner.next.is_some() {
                return;
            }

            inner.slot = Slot::Failed(failure);
            inner.next = Some(State::ErrorNotify);
            inner.on_cancel = None;
        }

        self.run();
    }

    /// Settles a working future with an outcome observed elsewhere,
    /// keeping the failure identity.
    pub(crate) fn settle_outcome(&self, outcome: Outcome<T>) {
        match outcome {
            Outcome::Success(value) => self.resolve_with(Resolution::Value(value)),
            Outcome::Failure(failure) => self.reject_with(failure),
        }
    }

    /// Runs a handler and settles this future with its result.
    pub(crate) fn settle_handler<A>(
        &self,
        handler: impl FnOnce(A) -> Result<Resolution<T>, Error>,
        argument: A,
    ) {
        match pump::guarded(|| handler(argument)) {
            Ok(resolution) => self.resolve_with(resolution),
            Err(error) => self.reject_with(Failure::thrown(error)),
        }
    }

    /// Takes over the outcome of the awaited upstream.
    ///
    /// Accepted while waiting, and while the cancellation is being forwarded:
    /// an upstream completion that lands first wins over the cancellation.
    fn adopt(&self, outcome: Outcome<T>) {
        {
            let mut inner = self.inner.borrow_mut();

            if !matches!(inner.state, State::Waiting | State::WaitingCanceled) {
                return;
            }

            match outcome {
                Outcome::Success(value) => {
                    inner.slot = Slot::Value(value);
                    inner.next = Some(State::SuccessNotify);
                }
                Outcome::Failure(failure) => {
                    inner.slot = Slot::Failed(failure);
                    inner.next = Some(State::ErrorNotify);
                }
            }
        }

        self.run();
    }

    /// The state-machine pump: enters requested states until none is left.
    ///
    /// Re-entrant calls, issued while an entry action runs user code, drain
    /// the same `next` slot, so requests are honored in the order the pump
    /// sees them.
    fn run(&self) {
        loop {
            let (id, state) = {
                let mut inner = self.inner.borrow_mut();

                match inner.next.take() {
                    Some(next) => {
                        inner.state = next;
                        (inner.id, next)
                    }
                    None => return,
                }
            };

            tracing::trace!(future = %id, %state, "enter");
            self.enter(state);
        }
    }

    fn enter(&self, state: State) {
        match state {
            State::Created | State::Working | State::Success | State::Error => {}

            State::Waiting => {
                let upstream = match &self.inner.borrow().slot {
                    Slot::Waiting(upstream) => upstream.clone(),
                    _ => return,
                };

                let this = self.clone();
                upstream.listen(Box::new(move |outcome| this.adopt(outcome)));
            }

            State::WaitingCanceled => {
                let upstream = match &self.inner.borrow().slot {
                    Slot::Waiting(upstream) => Some(upstream.clone()),
                    _ => None,
                };

                // An upstream settled inside a notify pass has its outcome in
                // place while its listeners are still queued; that outcome wins.
                let landed = upstream.and_then(|upstream| {
                    upstream.cancel();
                    upstream.inner.borrow().outcome()
                });

                let mut inner = self.inner.borrow_mut();
                if inner.state != State::WaitingCanceled || inner.next.is_some() {
                    return;
                }

                match landed {
                    Some(Outcome::Success(value)) => {
                        inner.slot = Slot::Value(value);
                        inner.next = Some(State::SuccessNotify);
                    }
                    Some(Outcome::Failure(failure)) => {
                        inner.slot = Slot::Failed(failure);
                        inner.next = Some(State::ErrorNotify);
                    }
                    None => inner.next = Some(State::Canceling),
                }
            }

            State::Canceled => {
                let action = self.inner.borrow_mut().on_cancel.take();

                if let Some(action) = action
                    && panic::catch_unwind(AssertUnwindSafe(action)).is_err()
                {
                    tracing::warn!(future = %self.id(), "cancel action panicked");
                }

                let mut inner = self.inner.borrow_mut();
                if inner.next.is_none() {
                    inner.next = Some(State::Canceling);
                }
            }

            State::Canceling => {
                let mut inner = self.inner.borrow_mut();
                inner.slot = Slot::Failed(Failure::canceled());
                inner.next = Some(State::ErrorNotify);
            }

            State::SuccessNotify | State::ErrorNotify => {
                let this = self.clone();
                pump::dispatch(Box::new(move || this.notify()));
            }
        }
    }

    /// One notify pass: hands the outcome to every listener in registration
    /// order, then settles into the terminal state.
    fn notify(&self) {
        loop {
            let (listeners, outcome) = {
                let mut inner = self.inner.borrow_mut();

                if inner.listeners.is_empty() {
                    inner.state = match inner.state {
                        State::SuccessNotify => State::Success,
                        State::ErrorNotify => State::Error,
                        other => other,
                    };
                    return;
                }

                let Some(outcome) = inner.outcome() else {
                    return;
                };

                (mem::take(&mut inner.listeners), outcome)
            };

            tracing::trace!(future = %self.id(), listeners = listeners.len(), "notify");

            for listener in listeners {
                listener(outcome.clone());
            }
        }
    }
}
