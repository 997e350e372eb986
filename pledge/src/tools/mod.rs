//! Retry utilities for future-returning operations.
//!
//! This module provides a driver that re-runs a fallible operation under a
//! bounded retry budget, pausing on a [`TimerScope`](crate::time::TimerScope)
//! between attempts.
//!
//! The main entry point is [`retry`], which starts a [`RetryDriver`] from a
//! [`RetryConfig`] and returns the future exposing its outcome.

mod retry;

#[doc(inline)]
pub use retry::{RetryConfig, RetryDriver, RetryPolicy, retry};
