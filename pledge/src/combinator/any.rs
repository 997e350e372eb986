use super::name_key;
use crate::error::{Error, Failures, Key};
use crate::future::{Failure, Future, Outcome, Resolution};

use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Settles with the first input that settles other than by cancellation.
///
/// The first success resolves the combined future with `(index, value)`.
/// A failure that lands before any success fails it with
/// [`Error::Aggregate`] holding that single failure. Cancellations are
/// skipped unless every input ends up canceled, in which case the combined
/// future is canceled.
///
/// An empty input is canceled right away: with nothing to race, no input
/// can ever settle it. [`all`](fn@super::all) instead resolves an empty
/// input with an empty vector, since every one of zero inputs has succeeded.
///
/// Inputs that lose the race are left running. Canceling the combined
/// future cancels every input.
///
/// # Examples
///
/// ```rust,ignore
/// let first = any(vec![Future::canceled(), Future::ready(2)]);
/// assert_eq!(first.value(), Some((1, 2)));
/// ```
pub fn any<T>(futures: Vec<Future<T>>) -> Future<(usize, T)>
where
    T: Clone + 'static,
{
    race(
        futures.into_iter().enumerate().collect(),
        |index| Key::Index(*index),
    )
}

/// Settles with the first input that settles, keyed by name.
///
/// Same rules as [`any`].
pub fn any_keyed<K, T>(futures: BTreeMap<K, Future<T>>) -> Future<(K, T)>
where
    K: Ord + Clone + fmt::Display + 'static,
    T: Clone + 'static,
{
    race(futures.into_iter().collect(), name_key::<K>)
}

fn race<K, T>(inputs: Vec<(K, Future<T>)>, key_of: fn(&K) -> Key) -> Future<(K, T)>
where
    K: Clone + 'static,
    T: Clone + 'static,
{
    if inputs.is_empty() {
        return Future::canceled();
    }

    let futures: Vec<Future<T>> = inputs.iter().map(|(_, future)| future.clone()).collect();

    let combined: Future<(K, T)> = Future::pending(Some(Box::new(move || {
        for future in &futures {
            future.cancel();
        }
    })));

    let total = inputs.len();
    let canceled = Rc::new(Cell::new(0));

    for (key, future) in inputs {
        let combined = combined.clone();
        let canceled = canceled.clone();

        // A combined future that already settled ignores later outcomes.
        future.listen(Box::new(move |outcome| match outcome {
            Outcome::Success(value) => combined.resolve_with(Resolution::Value((key, value))),
            Outcome::Failure(failure) if failure.error.is_canceled() => {
                canceled.set(canceled.get() + 1);

                if canceled.get() == total {
                    combined.reject_with(Failure::canceled());
                }
            }
            Outcome::Failure(failure) => {
                let failures = Failures::new(vec![(key_of(&key), failure.error)]);
                combined.reject_with(Failure::rejected(Error::Aggregate(failures)));
            }
        }));
    }

    combined
}
