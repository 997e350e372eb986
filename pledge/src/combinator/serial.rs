use crate::future::{Failure, Future, Outcome, Resolution};
use crate::runtime::pump;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::mem;
use std::rc::Rc;

struct Serial<T, F> {
    tasks: VecDeque<F>,
    values: Vec<T>,
    current: Option<Future<T>>,
    canceled: bool,
}

/// Runs `tasks` one after another.
///
/// Each task is invoked only once the future of the previous one has
/// succeeded; the combined future resolves with every value in order. The
/// first failure, or a panic while invoking a task, aborts the sequence and
/// becomes the result with its identity intact.
///
/// Canceling the combined future cancels the task in flight and skips the
/// rest.
///
/// # Examples
///
/// ```rust,ignore
/// let steps = serial(vec![
///     Box::new(|| Future::ready(1)) as Box<dyn FnOnce() -> Future<i32>>,
///     Box::new(|| Future::ready(2)),
/// ]);
/// assert_eq!(steps.value(), Some(vec![1, 2]));
/// ```
pub fn serial<T, F, I>(tasks: I) -> Future<Vec<T>>
where
    T: Clone + 'static,
    F: FnOnce() -> Future<T> + 'static,
    I: IntoIterator<Item = F>,
{
    let driver = Rc::new(RefCell::new(Serial {
        tasks: tasks.into_iter().collect(),
        values: Vec::new(),
        current: None,
        canceled: false,
    }));

    let weak = Rc::downgrade(&driver);
    let result = Future::pending(Some(Box::new(move || {
        let Some(driver) = weak.upgrade() else {
            return;
        };

        let current = {
            let mut driver = driver.borrow_mut();
            driver.canceled = true;
            driver.current.take()
        };

        if let Some(current) = current {
            current.cancel();
        }
    })));

    step(driver, result.clone());
    result
}

/// Starts tasks until one is still pending, then waits for it.
fn step<T, F>(driver: Rc<RefCell<Serial<T, F>>>, result: Future<Vec<T>>)
where
    T: Clone + 'static,
    F: FnOnce() -> Future<T> + 'static,
{
    loop {
        let task = {
            let mut state = driver.borrow_mut();

            if state.canceled {
                return;
            }

            state.tasks.pop_front()
        };

        let Some(task) = task else {
            let values = mem::take(&mut driver.borrow_mut().values);
            result.resolve_with(Resolution::Value(values));
            return;
        };

        let future = match pump::guarded(|| Ok(task())) {
            Ok(future) => future,
            Err(error) => {
                result.reject_with(Failure::thrown(error));
                return;
            }
        };

        match future.terminal_outcome() {
            Some(Outcome::Success(value)) => {
                driver.borrow_mut().values.push(value);
                continue;
            }
            Some(Outcome::Failure(failure)) => {
                result.reject_with(failure);
                return;
            }
            None => {}
        }

        driver.borrow_mut().current = Some(future.clone());

        future.listen(Box::new(move |outcome| {
            driver.borrow_mut().current = None;

            match outcome {
                Outcome::Success(value) => {
                    driver.borrow_mut().values.push(value);
                    step(driver, result);
                }
                Outcome::Failure(failure) => result.reject_with(failure),
            }
        }));

        return;
    }
}
