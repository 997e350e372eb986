//! The cancellable future state machine.
//!
//! A [`Future`] represents a value, or a failure, that becomes available at
//! most once. It is created from an executor ([`Future::new`]), obtained
//! from a [`Signal`](crate::Signal), or produced by chaining another future.
//!
//! This module provides:
//! - the [`State`] machine and its pump,
//! - chaining with [`Future::continue_with`] and its shorthands,
//! - terminal consumption with [`Future::done`],
//! - cancellation that travels up `waiting` chains,
//! - error identities that make unhandled-failure reporting exactly-once.
//!
//! Notification is driven by an explicit work queue rather than recursion,
//! so arbitrarily long synchronous chains settle with a constant stack
//! depth.

mod chain;
mod core;
mod identity;
mod resolver;
mod state;

pub(crate) use self::core::Outcome;
pub(crate) use identity::Failure;

pub use self::core::{Future, Resolution};
pub use identity::{ErrorIdentity, FutureId};
pub use resolver::Resolver;
pub use state::State;
