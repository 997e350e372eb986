//! Combinators over fixed collections of futures.
//!
//! - [`all`] waits for every input and aggregates every failure,
//! - [`any`] settles with the first input that settles,
//! - [`serial`] runs future-returning tasks strictly one after another.
//!
//! The keyed forms take a `BTreeMap` and report failures under
//! [`Key::Name`](crate::error::Key::Name).
//!
//! Time-based combinators live in [`time`](crate::time).

mod all;
mod any;
mod serial;

use crate::error::Key;

use std::fmt;
use std::rc::Rc;

#[doc(inline)]
pub use all::{all, all_keyed};

#[doc(inline)]
pub use any::{any, any_keyed};

#[doc(inline)]
pub use serial::serial;

fn name_key<K: fmt::Display>(key: &K) -> Key {
    Key::Name(Rc::from(key.to_string()))
}
