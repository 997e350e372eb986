use pledge::{Error, Future, Resolution, Signal, State};
use std::cell::Cell;
use std::rc::Rc;

#[test]
fn test_executor_resolves_synchronously() {
    let future = Future::new(|resolver| {
        resolver.resolve(7);
        Ok(())
    });

    assert_eq!(future.state(), State::Success);
    assert_eq!(future.value(), Some(7));
    assert_eq!(future.outcome(), Some(Ok(7)));
}

#[test]
fn test_executor_without_settlement_stays_working() {
    let future: Future<i32> = Future::new(|_| Ok(()));

    assert_eq!(future.state(), State::Working);
    assert!(!future.is_settled());
    assert_eq!(future.outcome(), None);
}

#[test]
fn test_executor_error_is_exception_sourced() {
    let future: Future<i32> = Future::new(|_| Err(Error::msg("bad input")));

    assert_eq!(future.error(), Some(Error::msg("bad input")));

    let identity = future.error_identity().expect("failed future has an identity");
    assert!(identity.is_exception());
}

#[test]
fn test_executor_panic_is_caught() {
    let future: Future<i32> = Future::new(|_| panic!("kaboom"));

    assert_eq!(future.error(), Some(Error::Panic("kaboom".into())));
    assert!(future.error_identity().is_some_and(|id| id.is_exception()));
}

#[test]
fn test_explicit_rejection_is_not_exception_sourced() {
    let future: Future<i32> = Future::new(|resolver| {
        resolver.reject(Error::msg("nope"));
        Ok(())
    });

    assert_eq!(future.state(), State::Error);
    assert!(future.error_identity().is_some_and(|id| !id.is_exception()));
}

#[test]
fn test_only_first_settlement_counts() {
    let future = Future::new(|resolver| {
        resolver.resolve(1);
        resolver.resolve(2);
        resolver.reject(Error::msg("late"));
        Ok(())
    });

    assert_eq!(future.value(), Some(1));
}

#[test]
fn test_error_after_resolve_is_ignored() {
    let future = Future::new(|resolver| {
        resolver.resolve("done");
        Err(Error::msg("ignored"))
    });

    assert_eq!(future.value(), Some("done"));
}

#[test]
fn test_resolving_with_future_waits_for_it() {
    let inner = Signal::<i32>::new();
    let upstream = inner.future();

    let future = Future::new(move |resolver| {
        resolver.adopt(upstream);
        Ok(())
    });

    assert_eq!(future.state(), State::Waiting);

    inner.complete(42);
    assert_eq!(future.value(), Some(42));
    assert_eq!(future.state(), State::Success);
}

#[test]
fn test_waiting_adopts_failure_identity() {
    let inner = Signal::<i32>::new();
    let future = Future::new({
        let upstream = inner.future();
        move |resolver| {
            resolver.settle(Resolution::Awaitable(upstream));
            Ok(())
        }
    });

    inner.fail(Error::msg("upstream"));

    assert_eq!(future.error(), Some(Error::msg("upstream")));
    assert_eq!(future.error_identity(), inner.future().error_identity());
}

#[test]
fn test_self_resolution_is_rejected() {
    let signal = Signal::<i32>::new();
    signal.complete_with(Resolution::Awaitable(signal.future()));

    assert_eq!(signal.future().error(), Some(Error::SelfResolution));
}

#[test]
fn test_terminal_constructors() {
    assert_eq!(Future::ready(3).state(), State::Success);
    assert_eq!(
        Future::<i32>::failed(Error::msg("x")).error(),
        Some(Error::msg("x"))
    );
    assert!(Future::<i32>::canceled().is_canceled());
}

#[test]
fn test_cancel_runs_action_once() {
    let count = Rc::new(Cell::new(0));

    let future: Future<i32> = Future::with_cancel(|_| Ok(()), {
        let count = count.clone();
        move || count.set(count.get() + 1)
    });

    future.cancel();
    future.cancel();

    assert_eq!(count.get(), 1);
    assert!(future.is_canceled());
    assert_eq!(future.state(), State::Error);
    assert_eq!(future.error(), Some(Error::Canceled));
}

#[test]
fn test_cancel_action_dropped_after_settlement() {
    let count = Rc::new(Cell::new(0));

    let future = Future::with_cancel(
        |resolver| {
            resolver.resolve(5);
            Ok(())
        },
        {
            let count = count.clone();
            move || count.set(count.get() + 1)
        },
    );

    future.cancel();

    assert_eq!(count.get(), 0);
    assert_eq!(future.value(), Some(5));
}

#[test]
fn test_cancel_after_terminal_is_noop() {
    let ready = Future::ready(5);
    ready.cancel();
    assert_eq!(ready.state(), State::Success);
    assert_eq!(ready.value(), Some(5));

    let failed = Future::<i32>::failed(Error::msg("E"));
    let identity = failed.error_identity();
    failed.cancel();
    assert_eq!(failed.error(), Some(Error::msg("E")));
    assert_eq!(failed.error_identity(), identity);
}

#[test]
fn test_cancel_waiting_forwards_upstream() {
    let canceled = Rc::new(Cell::new(false));
    let inner = Signal::<i32>::with_cancel({
        let canceled = canceled.clone();
        move || canceled.set(true)
    });

    let future = Future::new({
        let upstream = inner.future();
        move |resolver| {
            resolver.adopt(upstream);
            Ok(())
        }
    });

    future.cancel();

    assert!(canceled.get(), "upstream cancel action should run");
    assert!(inner.future().is_canceled());
    assert!(future.is_canceled());
}

#[test]
fn test_cancel_after_adoption_landed_is_noop() {
    let inner = Signal::<i32>::new();
    let future = Future::new({
        let upstream = inner.future();
        move |resolver| {
            resolver.adopt(upstream);
            Ok(())
        }
    });

    inner.complete(9);
    future.cancel();

    assert_eq!(future.value(), Some(9));
    assert!(!inner.future().is_canceled());
}

#[test]
fn test_cancel_during_notify_keeps_landed_upstream() {
    let upstream = Signal::<i32>::new();
    let downstream = Signal::<i32>::new();
    downstream.complete_with(upstream.future().into());

    let trigger = Signal::<()>::new();
    let draining = Rc::new(Cell::new(false));

    trigger.future().done({
        let upstream = upstream.clone();
        let future = downstream.future();
        let draining = draining.clone();
        move |()| {
            draining.set(pledge::runtime::is_draining());
            upstream.complete(7);
            future.cancel();
        }
    });
    trigger.complete(());

    assert!(draining.get());
    assert_eq!(downstream.future().value(), Some(7));
    assert_eq!(upstream.future().value(), Some(7));
}

#[test]
fn test_ids_are_unique() {
    let a = Future::ready(1);
    let b = Future::ready(1);

    assert_ne!(a.id(), b.id());
    assert!(a.ptr_eq(&a.clone()));
    assert!(!a.ptr_eq(&b));
}
