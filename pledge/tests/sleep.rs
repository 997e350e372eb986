use pledge::time::sleep;
use pledge::{EventLoop, State};
use std::time::Duration;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[test]
fn test_sleep_completes_after_duration() {
    let event_loop = EventLoop::manual();
    let scope = event_loop.scope();

    let nap = sleep(&scope, ms(30));
    assert_eq!(nap.state(), State::Working);

    assert_eq!(event_loop.block_on(&nap), Ok(()));
    assert_eq!(event_loop.now(), ms(30));
}

#[test]
fn test_sleep_chains() {
    let event_loop = EventLoop::manual();
    let scope = event_loop.scope();

    let greeting = sleep(&scope, ms(10)).map(|()| "hello");

    assert_eq!(event_loop.block_on(&greeting), Ok("hello"));
}

#[test]
fn test_cancel_sleep_clears_timer() {
    let event_loop = EventLoop::manual();
    let scope = event_loop.scope();

    let nap = sleep(&scope, ms(30));
    nap.cancel();

    assert!(nap.is_canceled());
    assert_eq!(scope.pending(), 0);
    assert_eq!(event_loop.pending(), 0);
}

#[test]
fn test_dispose_cancels_sleep() {
    let event_loop = EventLoop::manual();
    let scope = event_loop.scope();

    let nap = sleep(&scope, ms(30));
    scope.dispose();

    assert!(nap.is_canceled());
}

#[test]
fn test_sleep_on_disposed_scope_is_canceled() {
    let event_loop = EventLoop::manual();
    let scope = event_loop.scope();
    scope.dispose();

    assert!(sleep(&scope, ms(30)).is_canceled());
}

#[test]
fn test_sleep_on_dropped_scope_is_canceled() {
    let event_loop = EventLoop::manual();

    let dropped = sleep(&event_loop.scope(), ms(10));
    assert!(dropped.is_canceled());

    let scope = event_loop.scope();
    let bound = sleep(&scope, ms(10));

    event_loop.advance(ms(10));
    assert_eq!(bound.value(), Some(()));
    assert_eq!(event_loop.pending(), 0);
}
