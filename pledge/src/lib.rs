//! # Pledge
//!
//! **Pledge** is a single-threaded, cooperatively scheduled future engine:
//! values that become available at most once, with an explicit state
//! machine, chained continuations, and cancellation that travels up the
//! chain.
//!
//! Unlike `std::future::Future`, a Pledge [`Future`] is not polled. It is a
//! shared handle to one state cell; continuations are registered on it and
//! run when it settles. Nothing here is `Send`: every future lives and
//! settles on the thread that created it.
//!
//! Pledge offers:
//!
//! - **Cancellable futures** with cancel actions and upward propagation
//! - **Error identities** so an unhandled failure is reported exactly once
//! - **Combinators**: [`all`], [`any`], [`serial`], and [`time::timeout`]
//! - **Timer scopes** that own their timers and cancel them on disposal,
//!   with throttle and debounce wrappers
//! - **A retry driver** with a bounded budget and hooks
//! - **An event loop** with a manual clock for deterministic tests
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pledge::{EventLoop, Future, time};
//! use std::time::Duration;
//!
//! let event_loop = EventLoop::new();
//! let scope = event_loop.scope();
//!
//! let greeting = time::sleep(&scope, Duration::from_millis(100))
//!     .map(|()| "hello")
//!     .inspect_err(|error| eprintln!("failed: {error}"));
//!
//! assert_eq!(event_loop.block_on(&greeting), Ok("hello"));
//! ```
//!
//! ## Modules
//!
//! - [`future`]: The state machine, chaining and cancellation
//! - [`combinator`]: `all`, `any` and `serial`
//! - [`time`]: Timer scopes, throttle, debounce, sleep and timeout
//! - [`tools`]: The retry driver
//! - [`unhandled`]: The unhandled-error channel
//! - [`runtime`]: The event loop and per-thread state

pub mod combinator;
pub mod error;
pub mod future;
pub mod runtime;
pub mod signal;
pub mod time;
pub mod tools;
pub mod unhandled;

pub use combinator::{all, all_keyed, any, any_keyed, serial};
pub use error::{Error, Failures, Key, is_canceled};
pub use future::{ErrorIdentity, Future, FutureId, Resolution, Resolver, State};
pub use runtime::{EventLoop, EventLoopBuilder};
pub use signal::Signal;
pub use time::TimerScope;
pub use tools::{RetryConfig, RetryDriver, RetryPolicy, retry};
