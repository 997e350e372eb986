use pledge::time::timeout;
use pledge::{Error, EventLoop, Future, Signal};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[test]
fn test_timeout_expires_and_cancels_inner() {
    let event_loop = EventLoop::manual();
    let scope = event_loop.scope();
    let canceled = Rc::new(Cell::new(false));

    let signal = Signal::<i32>::with_cancel({
        let canceled = canceled.clone();
        move || canceled.set(true)
    });
    let bounded = timeout(&scope, ms(50), signal.future());

    event_loop.advance(ms(49));
    assert!(!bounded.is_settled());

    event_loop.advance(ms(1));
    assert_eq!(bounded.error(), Some(Error::Timeout));
    assert!(signal.future().is_canceled());
    assert!(canceled.get(), "inner cancel action should run");
}

#[test]
fn test_timeout_completes_before_deadline() {
    let event_loop = EventLoop::manual();
    let scope = event_loop.scope();
    let signal = Signal::<i32>::new();

    let bounded = timeout(&scope, ms(50), signal.future());

    event_loop.advance(ms(10));
    signal.complete(123);

    assert_eq!(bounded.value(), Some(123));
    assert_eq!(event_loop.pending(), 0, "timer should be cleared");

    event_loop.advance(ms(100));
    assert_eq!(bounded.value(), Some(123));
}

#[test]
fn test_timeout_keeps_failure_identity() {
    let event_loop = EventLoop::manual();
    let scope = event_loop.scope();
    let signal = Signal::<i32>::new();

    let bounded = timeout(&scope, ms(50), signal.future());
    signal.fail(Error::msg("inner"));

    assert_eq!(bounded.error(), Some(Error::msg("inner")));
    assert_eq!(bounded.error_identity(), signal.future().error_identity());
}

#[test]
fn test_timeout_on_settled_future() {
    let event_loop = EventLoop::manual();
    let scope = event_loop.scope();

    let bounded = timeout(&scope, ms(50), Future::ready(7));

    assert_eq!(bounded.value(), Some(7));
    assert_eq!(scope.pending(), 0);
}

#[test]
fn test_timeout_without_future_fails_after_duration() {
    let event_loop = EventLoop::manual();
    let scope = event_loop.scope();

    let bounded = timeout::<i32, _>(&scope, ms(20), None);

    assert_eq!(event_loop.block_on(&bounded), Err(Error::Timeout));
    assert_eq!(event_loop.now(), ms(20));
}

#[test]
fn test_cancel_timeout_cancels_both() {
    let event_loop = EventLoop::manual();
    let scope = event_loop.scope();
    let signal = Signal::<i32>::new();

    let bounded = timeout(&scope, ms(50), signal.future());
    bounded.cancel();

    assert!(bounded.is_canceled());
    assert!(signal.future().is_canceled());
    assert_eq!(event_loop.pending(), 0);
}

#[test]
fn test_dispose_cancels_timeout() {
    let event_loop = EventLoop::manual();
    let scope = event_loop.scope();
    let signal = Signal::<i32>::new();

    let bounded = timeout(&scope, ms(50), signal.future());
    scope.dispose();

    assert!(bounded.is_canceled());
    assert!(signal.future().is_canceled());
}

#[test]
fn test_timeout_on_disposed_scope_is_canceled() {
    let event_loop = EventLoop::manual();
    let scope = event_loop.scope();
    scope.dispose();

    let bounded = timeout::<i32, _>(&scope, ms(50), None);
    assert!(bounded.is_canceled());
}

#[test]
fn test_timeout_on_dropped_scope_cancels_both() {
    let event_loop = EventLoop::manual();
    let signal = Signal::<i32>::new();

    let bounded = timeout(&event_loop.scope(), ms(50), signal.future());

    assert!(bounded.is_canceled());
    assert!(signal.future().is_canceled());
}
