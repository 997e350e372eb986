use std::fmt;

/// Lifecycle state of a [`Future`](crate::Future).
///
/// ```text
/// Created -> Working -> SuccessNotify -> Success
///                    -> ErrorNotify   -> Error
///                    -> Waiting -> SuccessNotify | ErrorNotify
///                               -> WaitingCanceled -> Canceling
///                    -> Canceled -> Canceling -> ErrorNotify
/// ```
///
/// Exactly one state is active at a time and transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Allocated, not yet started.
    Created,

    /// Running; waiting for its resolver to be called.
    Working,

    /// Resolved with another future and adopting its outcome.
    Waiting,

    /// Canceled while waiting; the cancellation is being forwarded upstream.
    WaitingCanceled,

    /// Canceled while working; the cancel action is running.
    Canceled,

    /// Synthesizing the cancellation failure.
    Canceling,

    /// Holds a value; listeners are being notified.
    SuccessNotify,

    /// Terminal: holds a value.
    Success,

    /// Holds a failure; listeners are being notified.
    ErrorNotify,

    /// Terminal: holds a failure.
    Error,
}

impl State {
    /// Returns `true` for [`State::Success`] and [`State::Error`].
    pub fn is_terminal(self) -> bool {
        matches!(self, State::Success | State::Error)
    }

    /// Returns `true` once the outcome is known, including notify states.
    pub fn is_settled(self) -> bool {
        matches!(
            self,
            State::SuccessNotify | State::Success | State::ErrorNotify | State::Error
        )
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::Created => "created",
            State::Working => "working",
            State::Waiting => "waiting",
            State::WaitingCanceled => "waiting_canceled",
            State::Canceled => "canceled",
            State::Canceling => "canceling",
            State::SuccessNotify => "success_notify",
            State::Success => "success",
            State::ErrorNotify => "error_notify",
            State::Error => "error",
        };

        f.write_str(name)
    }
}
