use pledge::{Error, Future, Resolution, Signal, State};
use std::cell::Cell;
use std::rc::Rc;

#[test]
fn test_future_is_stable() {
    let signal = Signal::<i32>::new();

    assert!(signal.future().ptr_eq(&signal.future()));
    assert!(signal.future().ptr_eq(&signal.clone().future()));
}

#[test]
fn test_first_settlement_wins() {
    let signal = Signal::<i32>::new();
    assert!(signal.is_pending());

    signal.complete(1);
    signal.fail(Error::msg("late"));
    signal.complete(2);
    signal.cancel();

    assert!(!signal.is_pending());
    assert_eq!(signal.future().value(), Some(1));
}

#[test]
fn test_fail_settles_with_error() {
    let signal = Signal::<i32>::new();
    signal.fail(Error::msg("E"));

    assert_eq!(signal.future().state(), State::Error);
    assert_eq!(signal.future().error(), Some(Error::msg("E")));
    assert!(
        signal
            .future()
            .error_identity()
            .is_some_and(|id| !id.is_exception())
    );
}

#[test]
fn test_cancel_runs_cancel_action() {
    let canceled = Rc::new(Cell::new(0));
    let signal = Signal::<i32>::with_cancel({
        let canceled = canceled.clone();
        move || canceled.set(canceled.get() + 1)
    });

    signal.cancel();
    signal.cancel();

    assert_eq!(canceled.get(), 1);
    assert!(signal.future().is_canceled());
    assert!(!signal.is_pending());
}

#[test]
fn test_complete_with_future_waits() {
    let signal = Signal::<i32>::new();
    let inner = Signal::<i32>::new();

    signal.complete_with(Resolution::Awaitable(inner.future()));
    assert_eq!(signal.future().state(), State::Waiting);
    assert!(!signal.is_pending(), "a waiting signal is already resolved");

    inner.complete(3);
    assert_eq!(signal.future().value(), Some(3));
}

#[test]
fn test_complete_with_ready_future() {
    let signal = Signal::<i32>::new();
    signal.complete_with(Resolution::Awaitable(Future::ready(8)));

    assert_eq!(signal.future().value(), Some(8));
}
