use pledge::{Error, Future, Key, Signal, State, all, all_keyed, any, any_keyed, serial};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

type Task = Box<dyn FnOnce() -> Future<i32>>;

#[test]
fn test_all_empty_resolves_immediately() {
    let combined = all::<i32>(Vec::new());

    assert_eq!(combined.state(), State::Success);
    assert_eq!(combined.value(), Some(Vec::new()));
}

#[test]
fn test_all_keeps_input_order() {
    let first = Signal::<i32>::new();
    let second = Signal::<i32>::new();

    let combined = all(vec![first.future(), second.future(), Future::ready(3)]);

    second.complete(2);
    assert_eq!(combined.state(), State::Working);

    first.complete(1);
    assert_eq!(combined.value(), Some(vec![1, 2, 3]));
}

#[test]
fn test_all_waits_for_every_input_before_failing() {
    let first = Signal::<i32>::new();
    let second = Signal::<i32>::new();

    let combined = all(vec![first.future(), second.future()]);

    second.fail(Error::msg("E"));
    assert_eq!(
        combined.state(),
        State::Working,
        "all should wait for the pending input"
    );

    first.complete(1);

    let error = combined.error().expect("combined should fail");
    let failures = error.failures().expect("failure should be an aggregate");

    assert_eq!(failures.len(), 1);
    assert_eq!(failures.get(&Key::Index(1)), Some(&Error::msg("E")));
    assert_eq!(failures.get(&Key::Index(0)), None);
}

#[test]
fn test_all_reports_every_failure() {
    let combined = all(vec![
        Future::<i32>::failed(Error::msg("a")),
        Future::ready(2),
        Future::failed(Error::msg("c")),
    ]);

    let error = combined.error().expect("combined should fail");
    let keys: Vec<Key> = error
        .failures()
        .into_iter()
        .flat_map(|failures| failures.iter().map(|(key, _)| key.clone()))
        .collect();

    assert_eq!(keys, vec![Key::Index(0), Key::Index(2)]);
}

#[test]
fn test_all_only_cancellations_is_canceled() {
    let combined = all(vec![Future::<i32>::canceled(), Future::ready(1), Future::canceled()]);

    assert!(combined.is_canceled());
}

#[test]
fn test_all_mixed_failures_include_cancellations() {
    let combined = all(vec![Future::<i32>::canceled(), Future::failed(Error::msg("E"))]);

    let error = combined.error().expect("combined should fail");
    let failures = error.failures().expect("failure should be an aggregate");

    assert_eq!(failures.len(), 2);
    assert_eq!(failures.get(&Key::Index(0)), Some(&Error::Canceled));
    assert!(!failures.all_canceled());
}

#[test]
fn test_cancel_all_cancels_pending_inputs() {
    let first = Signal::<i32>::new();
    let second = Signal::<i32>::new();
    second.complete(2);

    let combined = all(vec![first.future(), second.future()]);
    combined.cancel();

    assert!(combined.is_canceled());
    assert!(first.future().is_canceled());
    assert_eq!(second.future().value(), Some(2));
}

#[test]
fn test_all_keyed_collects_by_key() {
    let mut inputs = BTreeMap::new();
    inputs.insert("left", Future::ready(1));
    inputs.insert("right", Future::failed(Error::msg("R")));

    let combined = all_keyed(inputs);
    let error = combined.error().expect("combined should fail");
    let failures = error.failures().expect("failure should be an aggregate");

    assert_eq!(failures.get(&Key::from("right")), Some(&Error::msg("R")));

    let mut inputs = BTreeMap::new();
    inputs.insert("left", Future::ready(1));
    inputs.insert("right", Future::ready(2));

    let values = all_keyed(inputs).value().expect("combined should succeed");
    assert_eq!(values.get("left"), Some(&1));
    assert_eq!(values.get("right"), Some(&2));
}

#[test]
fn test_any_skips_cancellation() {
    let first = Signal::<i32>::new();
    let second = Signal::<i32>::new();

    let combined = any(vec![first.future(), second.future()]);

    first.cancel();
    assert_eq!(combined.state(), State::Working);

    second.complete(2);
    assert_eq!(combined.value(), Some((1, 2)));
}

#[test]
fn test_any_first_success_wins_and_losers_keep_running() {
    let first = Signal::<i32>::new();
    let second = Signal::<i32>::new();

    let combined = any(vec![first.future(), second.future()]);

    second.complete(20);
    first.complete(10);

    assert_eq!(combined.value(), Some((1, 20)));
    assert_eq!(first.future().value(), Some(10));
}

#[test]
fn test_any_all_canceled_is_canceled() {
    let combined = any(vec![Future::<i32>::canceled(), Future::canceled()]);
    assert!(combined.is_canceled());
}

#[test]
fn test_any_empty_is_canceled() {
    assert!(any::<i32>(Vec::new()).is_canceled());
    assert_eq!(all::<i32>(Vec::new()).value(), Some(Vec::new()));
}

#[test]
fn test_any_failure_before_success_fails() {
    let first = Signal::<i32>::new();
    let second = Signal::<i32>::new();

    let combined = any(vec![first.future(), second.future()]);

    first.fail(Error::msg("early"));
    second.complete(2);

    let error = combined.error().expect("combined should fail");
    let failures = error.failures().expect("failure should be an aggregate");

    assert_eq!(failures.len(), 1);
    assert_eq!(failures.get(&Key::Index(0)), Some(&Error::msg("early")));
}

#[test]
fn test_any_failure_after_success_is_ignored() {
    let first = Signal::<i32>::new();
    let second = Signal::<i32>::new();

    let combined = any(vec![first.future(), second.future()]);

    second.complete(2);
    first.fail(Error::msg("late"));

    assert_eq!(combined.value(), Some((1, 2)));
}

#[test]
fn test_cancel_any_cancels_inputs() {
    let first = Signal::<i32>::new();
    let second = Signal::<i32>::new();

    let combined = any(vec![first.future(), second.future()]);
    combined.cancel();

    assert!(combined.is_canceled());
    assert!(first.future().is_canceled());
    assert!(second.future().is_canceled());
}

#[test]
fn test_any_keyed_returns_key() {
    let mut inputs = BTreeMap::new();
    inputs.insert("slow".to_owned(), Signal::<i32>::new().future());
    inputs.insert("fast".to_owned(), Future::ready(5));

    let combined = any_keyed(inputs);
    assert_eq!(combined.value(), Some(("fast".to_owned(), 5)));
}

#[test]
fn test_serial_runs_tasks_in_order() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let gate = Signal::<i32>::new();

    let tasks: Vec<Task> = vec![
        Box::new({
            let log = log.clone();
            let gate = gate.future();
            move || {
                log.borrow_mut().push("first");
                gate
            }
        }),
        Box::new({
            let log = log.clone();
            move || {
                log.borrow_mut().push("second");
                Future::ready(2)
            }
        }),
    ];

    let combined = serial(tasks);
    assert_eq!(*log.borrow(), vec!["first"]);

    gate.complete(1);
    assert_eq!(*log.borrow(), vec!["first", "second"]);
    assert_eq!(combined.value(), Some(vec![1, 2]));
}

#[test]
fn test_serial_empty_resolves() {
    let combined = serial(Vec::<Task>::new());
    assert_eq!(combined.value(), Some(Vec::new()));
}

#[test]
fn test_serial_first_failure_aborts() {
    let invoked = Rc::new(Cell::new(false));
    let failing = Future::<i32>::failed(Error::msg("stop"));
    let identity = failing.error_identity();

    let tasks: Vec<Task> = vec![
        Box::new(|| Future::ready(1)),
        Box::new(move || failing),
        Box::new({
            let invoked = invoked.clone();
            move || {
                invoked.set(true);
                Future::ready(3)
            }
        }),
    ];

    let combined = serial(tasks);

    assert_eq!(combined.error(), Some(Error::msg("stop")));
    assert_eq!(combined.error_identity(), identity);
    assert!(!invoked.get(), "tasks after a failure must not run");
}

#[test]
fn test_serial_task_panic_fails() {
    let tasks: Vec<Task> = vec![Box::new(|| -> Future<i32> { panic!("task") })];

    let combined = serial(tasks);
    assert_eq!(combined.error(), Some(Error::Panic("task".into())));
}

#[test]
fn test_cancel_serial_cancels_current_task() {
    let current = Signal::<i32>::new();
    let invoked = Rc::new(Cell::new(false));

    let tasks: Vec<Task> = vec![
        Box::new({
            let current = current.future();
            move || current
        }),
        Box::new({
            let invoked = invoked.clone();
            move || {
                invoked.set(true);
                Future::ready(2)
            }
        }),
    ];

    let combined = serial(tasks);
    combined.cancel();

    assert!(combined.is_canceled());
    assert!(current.future().is_canceled());
    assert!(!invoked.get());
}
