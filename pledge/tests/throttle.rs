use pledge::EventLoop;
use pledge::time::{ThrottleOptions, Throttled};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

type Log = Rc<RefCell<Vec<(Duration, i32)>>>;

/// A throttled function that records when it ran and with what.
fn recorder(event_loop: &EventLoop, options: ThrottleOptions) -> (Throttled<i32, i32>, Log) {
    let log: Log = Rc::default();

    let throttled = event_loop.scope().throttle(
        {
            let log = log.clone();
            let event_loop = event_loop.clone();
            move |n: i32| {
                log.borrow_mut().push((event_loop.now(), n));
                n * 10
            }
        },
        ms(100),
        options,
    );

    (throttled, log)
}

#[test]
fn test_leading_and_trailing() {
    let event_loop = EventLoop::manual();
    let (throttled, log) = recorder(&event_loop, ThrottleOptions::default());

    assert_eq!(throttled.call(1), Some(10));

    event_loop.advance(ms(30));
    assert_eq!(throttled.call(2), Some(10), "returns the last result");

    event_loop.advance(ms(30));
    throttled.call(3);
    assert!(throttled.is_pending());

    event_loop.advance(ms(40));
    assert_eq!(*log.borrow(), vec![(ms(0), 1), (ms(100), 3)]);
    assert!(!throttled.is_pending());
}

#[test]
fn test_trailing_only_waits_a_full_window() {
    let event_loop = EventLoop::manual();
    let (throttled, log) = recorder(
        &event_loop,
        ThrottleOptions {
            leading: false,
            trailing: true,
        },
    );

    assert_eq!(throttled.call(1), None);

    event_loop.advance(ms(30));
    throttled.call(2);

    event_loop.advance(ms(69));
    assert!(log.borrow().is_empty());

    event_loop.advance(ms(1));
    assert_eq!(*log.borrow(), vec![(ms(100), 2)]);
}

#[test]
fn test_leading_only_drops_calls_inside_window() {
    let event_loop = EventLoop::manual();
    let (throttled, log) = recorder(
        &event_loop,
        ThrottleOptions {
            leading: true,
            trailing: false,
        },
    );

    throttled.call(1);
    event_loop.advance(ms(50));
    throttled.call(2);
    assert!(!throttled.is_pending());

    event_loop.advance(ms(50));
    throttled.call(3);

    event_loop.advance(ms(500));
    assert_eq!(*log.borrow(), vec![(ms(0), 1), (ms(100), 3)]);
}

#[test]
fn test_steady_calls_run_once_per_window() {
    let event_loop = EventLoop::manual();
    let (throttled, log) = recorder(&event_loop, ThrottleOptions::default());

    for n in 0..10 {
        throttled.call(n);
        event_loop.advance(ms(25));
    }

    event_loop.advance(ms(200));

    let times: Vec<Duration> = log.borrow().iter().map(|(at, _)| *at).collect();
    assert_eq!(times, vec![ms(0), ms(100), ms(200), ms(300)]);
    assert_eq!(log.borrow().last(), Some(&(ms(300), 9)));
}

#[test]
fn test_disposed_scope_drops_trailing_call() {
    let event_loop = EventLoop::manual();
    let scope = event_loop.scope();
    let log: Log = Rc::default();

    let throttled = scope.throttle(
        {
            let log = log.clone();
            move |n: i32| log.borrow_mut().push((Duration::ZERO, n))
        },
        ms(100),
        ThrottleOptions::default(),
    );

    throttled.call(1);
    throttled.call(2);
    scope.dispose();

    event_loop.advance(ms(200));
    assert_eq!(log.borrow().len(), 1);
}
