use super::name_key;
use crate::error::{Error, Failures, Key};
use crate::future::{Failure, Future, Outcome, Resolution};

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::mem;
use std::rc::Rc;

/// Waits for every future in `futures`.
///
/// Resolves with the values in input order once all inputs succeeded. An
/// empty input resolves right away with an empty vector.
///
/// If an input fails the combined future still waits for the others, then:
/// - when every failure is a cancellation, it is canceled,
/// - otherwise it fails with [`Error::Aggregate`], holding every failure
///   (cancellations included) keyed by input position.
///
/// Canceling the combined future cancels every input still pending.
///
/// # Examples
///
/// ```rust,ignore
/// let both = all(vec![Future::ready(1), Future::ready(2)]);
/// assert_eq!(both.value(), Some(vec![1, 2]));
/// ```
pub fn all<T>(futures: Vec<Future<T>>) -> Future<Vec<T>>
where
    T: Clone + 'static,
{
    join(
        futures.into_iter().enumerate().collect(),
        |index| Key::Index(*index),
        |entries| entries.into_iter().map(|(_, value)| value).collect(),
    )
}

/// Waits for every future in `futures`, keyed by name.
///
/// Same rules as [`all`]; failures are keyed with [`Key::Name`] holding the
/// rendered map key.
pub fn all_keyed<K, T>(futures: BTreeMap<K, Future<T>>) -> Future<BTreeMap<K, T>>
where
    K: Ord + Clone + fmt::Display + 'static,
    T: Clone + 'static,
{
    join(
        futures.into_iter().collect(),
        name_key::<K>,
        |entries| entries.into_iter().collect(),
    )
}

struct Join<T> {
    pending: usize,
    outcomes: Vec<Option<Outcome<T>>>,
}

fn join<K, T, C>(
    inputs: Vec<(K, Future<T>)>,
    key_of: fn(&K) -> Key,
    collect: fn(Vec<(K, T)>) -> C,
) -> Future<C>
where
    K: Clone + 'static,
    T: Clone + 'static,
    C: Clone + 'static,
{
    if inputs.is_empty() {
        return Future::ready(collect(Vec::new()));
    }

    let keys: Rc<[K]> = inputs.iter().map(|(key, _)| key.clone()).collect();
    let futures: Vec<Future<T>> = inputs.iter().map(|(_, future)| future.clone()).collect();

    let combined: Future<C> = Future::pending(Some(Box::new(move || {
        for future in &futures {
            future.cancel();
        }
    })));

    let state = Rc::new(RefCell::new(Join {
        pending: inputs.len(),
        outcomes: (0..inputs.len()).map(|_| None).collect(),
    }));

    for (index, (_, future)) in inputs.into_iter().enumerate() {
        let state = state.clone();
        let combined = combined.clone();
        let keys = keys.clone();

        future.listen(Box::new(move |outcome| {
            let outcomes = {
                let mut state = state.borrow_mut();
                state.outcomes[index] = Some(outcome);
                state.pending -= 1;

                if state.pending > 0 {
                    return;
                }

                mem::take(&mut state.outcomes)
            };

            finish(&combined, &keys, outcomes, key_of, collect);
        }));
    }

    combined
}

fn finish<K, T, C>(
    combined: &Future<C>,
    keys: &[K],
    outcomes: Vec<Option<Outcome<T>>>,
    key_of: fn(&K) -> Key,
    collect: fn(Vec<(K, T)>) -> C,
) where
    K: Clone + 'static,
    T: Clone + 'static,
    C: Clone + 'static,
{
    let mut values = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();

    for (key, outcome) in keys.iter().zip(outcomes) {
        match outcome {
            Some(Outcome::Success(value)) => values.push((key.clone(), value)),
            Some(Outcome::Failure(failure)) => failures.push((key_of(key), failure.error)),
            None => {}
        }
    }

    if failures.is_empty() {
        combined.resolve_with(Resolution::Value(collect(values)));
        return;
    }

    let failures = Failures::new(failures);

    if failures.all_canceled() {
        combined.reject_with(Failure::canceled());
    } else {
        tracing::debug!(future = %combined.id(), failed = failures.len(), "join failed");
        combined.reject_with(Failure::rejected(Error::Aggregate(failures)));
    }
}
