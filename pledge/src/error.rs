//! Failure values carried through the error channel of a [`Future`].
//!
//! Every failure observed by the engine is an [`Error`]. Two variants are
//! sentinels produced by the engine itself:
//!
//! - [`Error::Canceled`] is synthesized when a pending future is canceled.
//!   It is never published on the [`unhandled`](crate::unhandled) channel and
//!   is detected with [`is_canceled`].
//! - [`Error::Timeout`] is produced by [`timeout`](crate::time::timeout) and is
//!   an ordinary failure from the consumer's point of view.
//!
//! Errors are cheap to clone: one upstream failure is handed to every
//! listener of the future that holds it.
//!
//! [`Future`]: crate::Future

use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// A failure flowing through a future chain.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The future was canceled before it completed.
    #[error("Canceled")]
    Canceled,

    /// A deadline elapsed before the guarded future settled.
    #[error("operation timed out")]
    Timeout,

    /// A plain message.
    #[error("{0}")]
    Message(Rc<str>),

    /// A panic caught at a boundary where user code runs.
    #[error("panicked: {0}")]
    Panic(Rc<str>),

    /// Every failure observed by a combinator, keyed by input position or name.
    #[error("{0}")]
    Aggregate(Failures),

    /// A future was resolved with itself.
    #[error("a future cannot wait on itself")]
    SelfResolution,

    /// An event loop ran out of work while a future was still pending.
    #[error("event loop went idle while the future was still pending")]
    Stalled,

    /// Any other error value.
    #[error("{0}")]
    Other(Rc<dyn std::error::Error>),
}

impl Error {
    /// Creates an [`Error::Message`].
    pub fn msg(message: impl AsRef<str>) -> Self {
        Error::Message(Rc::from(message.as_ref()))
    }

    /// Wraps an arbitrary error value.
    pub fn other<E>(error: E) -> Self
    where
        E: std::error::Error + 'static,
    {
        Error::Other(Rc::new(error))
    }

    /// Returns `true` for the cancellation sentinel.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Error::Canceled)
    }

    /// Returns `true` for the timeout sentinel.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout)
    }

    /// Returns the keyed failures of an aggregate error.
    pub fn failures(&self) -> Option<&Failures> {
        match self {
            Error::Aggregate(failures) => Some(failures),
            _ => None,
        }
    }

    /// Converts a panic payload caught with `catch_unwind` into an error.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "opaque panic payload".to_owned()
        };

        Error::Panic(Rc::from(message))
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Error::Canceled, Error::Canceled)
            | (Error::Timeout, Error::Timeout)
            | (Error::SelfResolution, Error::SelfResolution)
            | (Error::Stalled, Error::Stalled) => true,
            (Error::Message(a), Error::Message(b)) | (Error::Panic(a), Error::Panic(b)) => a == b,
            (Error::Aggregate(a), Error::Aggregate(b)) => a == b,
            (Error::Other(a), Error::Other(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&str> for Error {
    fn from(message: &str) -> Self {
        Error::msg(message)
    }
}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Error::Message(Rc::from(message))
    }
}

/// Returns `true` if `error` is the cancellation sentinel.
pub fn is_canceled(error: &Error) -> bool {
    error.is_canceled()
}

/// Identifies one input of a combinator.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    /// Position in a sequence input.
    Index(usize),
    /// Rendered key of a map input.
    Name(Rc<str>),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(index) => write!(f, "{index}"),
            Key::Name(name) => f.write_str(name),
        }
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Name(Rc::from(name))
    }
}

/// An ordered collection of keyed failures.
///
/// Entries keep the order of the combinator's input, not the order in which
/// the failures arrived.
#[derive(Debug, Clone, PartialEq)]
pub struct Failures(Rc<[(Key, Error)]>);

impl Failures {
    pub(crate) fn new(entries: Vec<(Key, Error)>) -> Self {
        Self(Rc::from(entries))
    }

    /// Number of failures.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the collection holds no failure.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the failure recorded for `key`.
    pub fn get(&self, key: &Key) -> Option<&Error> {
        self.0
            .iter()
            .find_map(|(k, error)| (k == key).then_some(error))
    }

    /// Iterates over `(key, error)` pairs in input order.
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Error)> {
        self.0.iter().map(|(key, error)| (key, error))
    }

    /// Returns `true` if every failure is a cancellation.
    pub fn all_canceled(&self) -> bool {
        self.0.iter().all(|(_, error)| error.is_canceled())
    }
}

impl fmt::Display for Failures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} operation(s) failed", self.0.len())?;

        for (i, (key, error)) in self.0.iter().enumerate() {
            let sep = if i == 0 { ": " } else { ", " };
            write!(f, "{sep}[{key}] {error}")?;
        }

        Ok(())
    }
}
