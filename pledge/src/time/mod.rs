//! Timer scopes and the time-based combinators built on them.
//!
//! Everything scheduled here goes through a [`TimerScope`], which owns its
//! registrations on a [`Platform`] and cancels whatever is still
//! outstanding when it is disposed.
//!
//! It includes:
//! - [`TimerScope`] for delayed, next-turn, periodic and frame callbacks,
//! - [`Throttled`] and [`Debounced`] rate limiting wrappers,
//! - [`sleep`] and [`timeout`], which turn timers into futures.

mod debounce;
mod platform;
mod scope;
mod sleep;
mod throttle;
mod timeout;

pub use debounce::{DebounceOptions, Debounced};
pub use platform::{Callback, Platform, RawHandle, Repeating};
pub use scope::{TimerHandle, TimerScope};
pub use throttle::{ThrottleOptions, Throttled};

#[doc(inline)]
pub use sleep::sleep;

#[doc(inline)]
pub use timeout::timeout;
