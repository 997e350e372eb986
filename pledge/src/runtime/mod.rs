//! Core runtime components.
//!
//! This module contains the per-thread machinery the futures run on:
//! - identifier counters and the deferred fault queue,
//! - the notify pump that walks listeners without recursion,
//! - the [`EventLoop`], an in-crate scheduling platform with a manual
//!   clock for deterministic tests.
//!
//! Most users only touch [`EventLoop`]; the rest is driven by the futures
//! themselves.

mod event_loop;
mod timer;

pub(crate) mod builder;
pub(crate) mod context;
pub(crate) mod pump;

pub use builder::EventLoopBuilder;
pub use context::{reset, take_faults};
pub use event_loop::EventLoop;
pub use pump::is_draining;
