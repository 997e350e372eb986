use super::scope::{TimerHandle, TimerScope};

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

/// Options for [`TimerScope::debounce`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceOptions {
    /// Invoke right away on the call that starts a burst.
    pub leading: bool,

    /// Invoke once the burst has been quiet for a full window.
    pub trailing: bool,

    /// Invoke at least this often while calls keep coming.
    pub max_wait: Option<Duration>,
}

impl Default for DebounceOptions {
    fn default() -> Self {
        Self {
            leading: false,
            trailing: true,
            max_wait: None,
        }
    }
}

struct State<A, R> {
    last_call: Option<Duration>,
    last_exec: Duration,
    last_args: Option<A>,
    last_result: Option<R>,
    timer: Option<TimerHandle>,
}

struct Debounce<A, R> {
    scope: TimerScope,
    func: RefCell<Box<dyn FnMut(A) -> R>>,
    window: Duration,
    options: DebounceOptions,
    state: RefCell<State<A, R>>,
}

/// A function wrapper that runs once calls have paused.
///
/// Each call pushes the trailing invocation back until `window` has elapsed
/// without another call. With `max_wait` set, a steady stream of calls still
/// gets an invocation once `max_wait` has passed since the previous one.
/// The trailing invocation uses the arguments of the latest call.
///
/// Every call returns the result of the last actual invocation.
pub struct Debounced<A, R> {
    inner: Rc<Debounce<A, R>>,
}

impl<A, R> Clone for Debounced<A, R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A: 'static, R: Clone + 'static> Debounced<A, R> {
    pub(crate) fn new(
        scope: TimerScope,
        func: Box<dyn FnMut(A) -> R>,
        window: Duration,
        options: DebounceOptions,
    ) -> Self {
        let now = scope.now();

        Self {
            inner: Rc::new(Debounce {
                scope,
                func: RefCell::new(func),
                window,
                options,
                state: RefCell::new(State {
                    last_call: None,
                    last_exec: now,
                    last_args: None,
                    last_result: None,
                    timer: None,
                }),
            }),
        }
    }

    /// Calls the debounced function with `args`.
    ///
    /// Returns the result of the last invocation, which may be this one.
    pub fn call(&self, args: A) -> Option<R> {
        self.inner.state.borrow_mut().last_args = Some(args);
        Debounce::tick(&self.inner, true)
    }

    /// Drops the pending trailing invocation, if any.
    pub fn cancel(&self) {
        let timer = {
            let mut state = self.inner.state.borrow_mut();
            state.last_call = None;
            state.last_args = None;
            state.timer.take()
        };

        if let Some(timer) = timer {
            self.inner.scope.cancel(timer);
        }
    }

    /// Runs the pending trailing invocation now.
    ///
    /// Returns the result of the last invocation.
    pub fn flush(&self) -> Option<R> {
        if self.is_pending() {
            self.inner.execute(self.inner.scope.now());
        }

        self.inner.state.borrow().last_result.clone()
    }

    /// Returns `true` while a trailing invocation is armed.
    pub fn is_pending(&self) -> bool {
        self.inner.state.borrow().timer.is_some()
    }
}

impl<A: 'static, R: Clone + 'static> Debounce<A, R> {
    fn tick(this: &Rc<Self>, user_call: bool) -> Option<R> {
        let now = this.scope.now();
        let window = this.window;

        let (fire, wait, armed) = {
            let mut state = this.state.borrow_mut();
            let mut fire = false;

            if user_call {
                let starts_burst = state
                    .last_call
                    .is_none_or(|last| now.saturating_sub(last) >= window);

                fire = this.options.leading && starts_burst;
                state.last_call = Some(now);
            }

            // A timer-driven tick runs with its own handle just retired.
            let armed = state.timer.is_some() || !user_call;

            let since_call = state
                .last_call
                .map_or(Duration::MAX, |last| now.saturating_sub(last));
            let since_exec = now.saturating_sub(state.last_exec);
            let mut wait = window.saturating_sub(since_call);

            if let Some(max_wait) = this.options.max_wait {
                if since_exec >= max_wait && armed {
                    fire = true;
                } else {
                    wait = wait.min(max_wait.saturating_sub(since_exec));
                }
            }

            (fire || since_call >= window, wait, armed)
        };

        if fire {
            this.execute(now);
        } else if (!armed || !user_call) && this.options.trailing {
            let weak: Weak<Self> = Rc::downgrade(this);
            let timer = this.scope.after(wait, move || {
                if let Some(this) = weak.upgrade() {
                    Debounce::tick(&this, false);
                }
            });

            this.state.borrow_mut().timer = timer;
        } else if !user_call {
            this.state.borrow_mut().timer = None;
        }

        this.state.borrow().last_result.clone()
    }

    fn execute(&self, now: Duration) {
        let args = {
            let mut state = self.state.borrow_mut();

            if let Some(timer) = state.timer.take() {
                self.scope.cancel(timer);
            }

            state.last_exec = now;
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
