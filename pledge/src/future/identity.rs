use crate::error::Error;
use crate::runtime::context;
use crate::unhandled::{self, UnhandledError};

use std::cell::Cell;
use std::fmt;
use std::panic::Location;
use std::rc::Rc;

/// Identifies one future on the current thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FutureId(u64);

impl FutureId {
    pub(crate) fn next() -> Self {
        Self(context::next_future_id())
    }

    /// The raw identifier.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FutureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "future#{}", self.0)
    }
}

/// Tracks one root failure along the chain it travels.
///
/// Minted the first time a value enters the error channel and copied
/// unchanged through links that have no failure handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorIdentity {
    id: u64,
    exception: bool,
}

impl ErrorIdentity {
    fn next(exception: bool) -> Self {
        Self {
            id: context::next_error_id(),
            exception,
        }
    }

    /// The raw identifier.
    pub fn id(self) -> u64 {
        self.id
    }

    /// `true` if the failure came from an `Err` return or a panic in user
    /// code rather than from an explicit rejection.
    pub fn is_exception(self) -> bool {
        self.exception
    }
}

/// A failure together with its identity.
///
/// Clones share the `reported` flag, which is what makes reporting
/// exactly-once per root failure no matter how many hops it crosses.
#[derive(Debug, Clone)]
pub(crate) struct Failure {
    pub(crate) error: Error,
    identity: ErrorIdentity,
    reported: Rc<Cell<bool>>,
}

impl Failure {
    fn with_identity(error: Error, identity: ErrorIdentity) -> Self {
        Self {
            error,
            identity,
            reported: Rc::new(Cell::new(false)),
        }
    }

    /// An explicit rejection.
    pub(crate) fn rejected(error: Error) -> Self {
        Self::with_identity(error, ErrorIdentity::next(false))
    }

    /// A failure raised by user code (`Err` return or panic).
    pub(crate) fn thrown(error: Error) -> Self {
        Self::with_identity(error, ErrorIdentity::next(true))
    }

    /// The cancellation sentinel.
    pub(crate) fn canceled() -> Self {
        Self::rejected(Error::Canceled)
    }

    pub(crate) fn identity(&self) -> ErrorIdentity {
        self.identity
    }

    /// Publishes the failure on the unhandled channel, once per identity.
    ///
    /// Cancellations are never published.
    pub(crate) fn report(&self, future: FutureId, site: Option<&'static Location<'static>>) {
        if self.error.is_canceled() || self.reported.replace(true) {
            return;
        }

        unhandled::publish(UnhandledError {
            error: self.error.clone(),
            identity: self.identity,
            future,
            site,
        });
    }
}
