use std::time::Duration;

/// A one-shot callback handed to the platform.
pub type Callback = Box<dyn FnOnce()>;

/// A repeating callback handed to the platform.
pub type Repeating = Box<dyn FnMut()>;

/// Handle returned by a [`Platform`] for one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawHandle(pub u64);

/// The scheduling primitives a [`TimerScope`](super::TimerScope) builds on.
///
/// Only the delayed and periodic primitives are required. The next-tick and
/// frame primitives default to a zero-delay [`set_timeout`](Self::set_timeout)
/// when a platform has nothing faster.
///
/// Implementations run callbacks from their own turn, never from inside the
/// registering call.
pub trait Platform {
    /// Monotonic time since the platform's epoch.
    fn now(&self) -> Duration;

    /// Runs `callback` once after `delay`.
    fn set_timeout(&self, delay: Duration, callback: Callback) -> RawHandle;

    /// Cancels a delayed call. Unknown handles are ignored.
    fn clear_timeout(&self, handle: RawHandle);

    /// Runs `callback` every `period` until cleared.
    fn set_interval(&self, period: Duration, callback: Repeating) -> RawHandle;

    /// Cancels a periodic call. Unknown handles are ignored.
    fn clear_interval(&self, handle: RawHandle);

    /// Runs `callback` on the next scheduling turn.
    fn set_immediate(&self, callback: Callback) -> RawHandle {
        self.set_timeout(Duration::ZERO, callback)
    }

    /// Cancels a next-turn call.
    fn clear_immediate(&self, handle: RawHandle) {
        self.clear_timeout(handle);
    }

    /// Runs `callback` before the next frame.
    fn request_frame(&self, callback: Callback) -> RawHandle {
        self.set_timeout(Duration::ZERO, callback)
    }

    /// Cancels a frame callback.
    fn cancel_frame(&self, handle: RawHandle) {
        self.clear_timeout(handle);
    }
}
