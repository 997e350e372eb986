use super::scope::{TimerHandle, TimerScope};

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

/// Options for [`TimerScope::throttle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleOptions {
    /// Invoke on the first call of a burst.
    pub leading: bool,

    /// Invoke once more at the end of a burst if calls were dropped.
    pub trailing: bool,
}

impl Default for ThrottleOptions {
    fn default() -> Self {
        Self {
            leading: true,
            trailing: true,
        }
    }
}

struct State<A, R> {
    /// Platform time of the last invocation; `None` before the first one.
    last_exec: Option<Duration>,
    last_args: Option<A>,
    last_result: Option<R>,
    timer: Option<TimerHandle>,
}

struct Throttle<A, R> {
    scope: TimerScope,
    func: RefCell<Box<dyn FnMut(A) -> R>>,
    window: Duration,
    options: ThrottleOptions,
    state: RefCell<State<A, R>>,
}

/// A function wrapper that runs at most once per window.
///
/// A call runs the wrapped function right away if a full window elapsed
/// since the last invocation and the call may lead. Otherwise, with
/// `trailing` set, one timer is armed for the rest of the window and the
/// function runs when it fires, with the arguments of the latest call.
///
/// Every call returns the result of the last actual invocation.
pub struct Throttled<A, R> {
    inner: Rc<Throttle<A, R>>,
}

impl<A, R> Clone for Throttled<A, R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A: 'static, R: Clone + 'static> Throttled<A, R> {
    pub(crate) fn new(
        scope: TimerScope,
        func: Box<dyn FnMut(A) -> R>,
        window: Duration,
        options: ThrottleOptions,
    ) -> Self {
        Self {
            inner: Rc::new(Throttle {
                scope,
                func: RefCell::new(func),
                window,
                options,
                state: RefCell::new(State {
                    last_exec: None,
                    last_args: None,
                    last_result: None,
                    timer: None,
                }),
            }),
        }
    }

    /// Calls the throttled function with `args`.
    ///
    /// Returns the result of the last invocation, which may be this one.
    pub fn call(&self, args: A) -> Option<R> {
        self.inner.state.borrow_mut().last_args = Some(args);
        Throttle::tick(&self.inner, true)
    }

    /// Returns `true` while a trailing invocation is armed.
    pub fn is_pending(&self) -> bool {
        self.inner.state.borrow().timer.is_some()
    }
}

impl<A: 'static, R: Clone + 'static> Throttle<A, R> {
    fn tick(this: &Rc<Self>, user_call: bool) -> Option<R> {
        let now = this.scope.now();

        let (elapsed, armed) = {
            let state = this.state.borrow();
            let elapsed = state.last_exec.map(|last| now.saturating_sub(last));
            (elapsed, state.timer.is_some())
        };

        let window_passed = elapsed.is_none_or(|elapsed| elapsed >= this.window);

        if window_passed && (!user_call || this.options.leading) {
            this.execute(now);
        } else if !armed && this.options.trailing {
            let wait = match (this.options.leading, elapsed) {
                (true, Some(elapsed)) => this.window.saturating_sub(elapsed),
                _ => this.window,
            };

            let weak: Weak<Self> = Rc::downgrade(this);
            let timer = this.scope.after(wait, move || {
                if let Some(this) = weak.upgrade() {
                    this.state.borrow_mut().timer = None;
                    Throttle::tick(&this, false);
                }
            });

            this.state.borrow_mut().timer = timer;
        }

        this.state.borrow().last_result.clone()
    }

    fn execute(&self, now: Duration) {
        let args = {
            let mut state = self.state.borrow_mut();

            if let Some(timer) = state.timer.take() {
                self.scope.cancel(timer);
            }

            state.last_exec = Some(now);
            state.last_args.take()
        };

        let Some(args) = args else {
            return;
        };

        // A re-entrant call from inside `func` only records its arguments.
        let Ok(mut func) = self.func.try_borrow_mut() else {
            return;
        };

        let result = func(args);
        drop(func);

        self.state.borrow_mut().last_result = Some(result);
    }
}
