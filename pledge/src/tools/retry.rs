use crate::error::Error;
use crate::future::{Failure, Future, Outcome};
use crate::runtime::pump;
use crate::signal::Signal;
use crate::time::{TimerHandle, TimerScope};

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

/// Runs `config.attempt` until it succeeds or the retry budget is spent.
///
/// Shorthand for [`RetryDriver::start`] followed by
/// [`RetryDriver::future`].
///
/// # Examples
///
/// ```rust,ignore
/// let fetched = retry(
///     RetryConfig::new(&scope, || fetch_profile())
///         .retries(2)
///         .delay(Duration::from_millis(100)),
/// );
/// ```
pub fn retry<T>(config: RetryConfig<T>) -> Future<T>
where
    T: Clone + 'static,
{
    RetryDriver::start(config).future()
}

/// The plain-data part of a retry configuration.
///
/// [`RetryConfig::before_retry`] hooks receive it mutably, so the budget
/// and the delay can change between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts allowed after the first one.
    pub retries: u32,

    /// Pause between a failed attempt and the next one.
    pub delay: Duration,

    /// Whether a restart requested by `should_restart` resets the retry
    /// counter.
    pub reset_attempts_on_restart: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            delay: Duration::ZERO,
            reset_attempts_on_restart: false,
        }
    }
}

type Attempt<T> = Box<dyn FnMut() -> Future<T>>;
type CanRetry = Box<dyn FnMut(&Error) -> bool>;
type ShouldRestart<T> = Box<dyn FnMut(&T) -> bool>;
type BeforeRetry = Box<dyn FnMut(&mut RetryPolicy)>;
type AdjustRetries = Box<dyn FnMut(&Error, u32) -> u32>;

/// Everything a [`RetryDriver`] needs.
///
/// Created with the attempt callback and the scope delays are scheduled
/// on; every other setting has a default and is set by chaining.
///
/// By default a cancellation is never retried.
pub struct RetryConfig<T> {
    scope: TimerScope,
    policy: RetryPolicy,
    hooks: Hooks<T>,
}

struct Hooks<T> {
    attempt: Attempt<T>,
    can_retry: CanRetry,
    should_restart: Option<ShouldRestart<T>>,
    before_retry: Option<BeforeRetry>,
    adjust_retries: Option<AdjustRetries>,
}

impl<T: Clone + 'static> RetryConfig<T> {
    /// Creates a configuration running `attempt`, with delays on `scope`.
    pub fn new<A>(scope: &TimerScope, attempt: A) -> Self
    where
        A: FnMut() -> Future<T> + 'static,
    {
        Self {
            scope: scope.clone(),
            policy: RetryPolicy::default(),
            hooks: Hooks {
                attempt: Box::new(attempt),
                can_retry: Box::new(|error| !error.is_canceled()),
                should_restart: None,
                before_retry: None,
                adjust_retries: None,
            },
        }
    }

    /// Sets how many times a failed attempt may be retried.
    pub fn retries(mut self, retries: u32) -> Self {
        self.policy.retries = retries;
        self
    }

    /// Sets the pause between a failure and the next attempt.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.policy.delay = delay;
        self
    }

    /// Replaces the whole plain-data policy.
    pub fn policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets whether a restart resets the retry counter.
    pub fn reset_attempts_on_restart(mut self, reset: bool) -> Self {
        self.policy.reset_attempts_on_restart = reset;
        self
    }

    /// Decides whether a failure may be retried.
    pub fn can_retry<P>(mut self, predicate: P) -> Self
    where
        P: FnMut(&Error) -> bool + 'static,
    {
        self.hooks.can_retry = Box::new(predicate);
        self
    }

    /// Checked on success; returning `true` starts the sequence again
    /// instead of completing.
    pub fn should_restart<P>(mut self, predicate: P) -> Self
    where
        P: FnMut(&T) -> bool + 'static,
    {
        self.hooks.should_restart = Some(Box::new(predicate));
        self
    }

    /// Runs before each retry and may change the policy.
    pub fn before_retry<H>(mut self, hook: H) -> Self
    where
        H: FnMut(&mut RetryPolicy) + 'static,
    {
        self.hooks.before_retry = Some(Box::new(hook));
        self
    }

    /// Maps each failure and the current budget to a new budget.
    pub fn adjust_retries<H>(mut self, hook: H) -> Self
    where
        H: FnMut(&Error, u32) -> u32 + 'static,
    {
        self.hooks.adjust_retries = Some(Box::new(hook));
        self
    }
}

impl<T> fmt::Debug for RetryConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryConfig")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

struct State<T> {
    policy: RetryPolicy,

    /// Retries performed so far, not counting the first attempt.
    retried: u32,
    calls: u32,

    current: Option<Future<T>>,
    delay: Option<TimerHandle>,
    stopped: bool,
}

struct Driver<T> {
    scope: TimerScope,
    signal: Signal<T>,
    state: RefCell<State<T>>,
    hooks: RefCell<Hooks<T>>,
}

/// Drives a retry sequence and exposes its result as one future.
///
/// Each failure of the attempt callback may lead to another attempt after
/// the configured delay, within the retry budget. The exposed future
/// completes with the first success (unless a restart is requested) and
/// fails with the last failure, identity included, once retrying stops.
///
/// Canceling the exposed future cancels the attempt in flight and any
/// pending delay, and no further attempt is made. Disposing the scope
/// while a delay is pending cancels the exposed future.
pub struct RetryDriver<T> {
    inner: Rc<Driver<T>>,
}

impl<T: Clone + 'static> RetryDriver<T> {
    /// Starts the sequence; the first attempt runs synchronously.
    pub fn start(config: RetryConfig<T>) -> Self {
        let RetryConfig {
            scope,
            policy,
            hooks,
        } = config;

        let inner = Rc::new_cyclic(|weak: &Weak<Driver<T>>| {
            let weak = weak.clone();

            Driver {
                scope,
                signal: Signal::with_cancel(move || {
                    if let Some(driver) = weak.upgrade() {
                        driver.stop();
                    }
                }),
                state: RefCell::new(State {
                    policy,
                    retried: 0,
                    calls: 0,
                    current: None,
                    delay: None,
                    stopped: false,
                }),
                hooks: RefCell::new(hooks),
            }
        });

        Driver::run(&inner);
        Self { inner }
    }

    /// The future exposing the outcome of the whole sequence.
    pub fn future(&self) -> Future<T> {
        self.inner.signal.future()
    }

    /// Number of times the attempt callback has been invoked.
    pub fn calls(&self) -> u32 {
        self.inner.state.borrow().calls
    }

    /// Number of retries performed, not counting the first attempt.
    pub fn retried(&self) -> u32 {
        self.inner.state.borrow().retried
    }

    /// Cancels the exposed future, and with it the attempt in flight.
    pub fn cancel(&self) {
        self.inner.signal.cancel();
    }
}

impl<T> fmt::Debug for RetryDriver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.state.try_borrow() {
            Ok(state) => f
                .debug_struct("RetryDriver")
                .field("calls", &state.calls)
                .field("retried", &state.retried)
                .field("stopped", &state.stopped)
                .finish(),
            Err(_) => f.debug_struct("RetryDriver").finish_non_exhaustive(),
        }
    }
}

impl<T: Clone + 'static> Driver<T> {
    fn stop(&self) {
        let (current, delay) = {
            let mut state = self.state.borrow_mut();
            state.stopped = true;
            (state.current.take(), state.delay.take())
        };

        tracing::debug!(future = %self.signal.future().id(), "retry canceled");

        if let Some(delay) = delay {
            self.scope.cancel(delay);
        }

        if let Some(current) = current {
            current.cancel();
        }
    }

    fn is_stopped(&self) -> bool {
        self.state.borrow().stopped
    }

    /// Runs a user hook, turning a panic or an `Err` into a failure of the
    /// exposed future.
    fn hook<R>(&self, f: impl FnOnce(&mut Hooks<T>) -> Result<R, Error>) -> Option<R> {
        let result = pump::guarded(|| f(&mut self.hooks.borrow_mut()));

        match result {
            Ok(value) => Some(value),
            Err(error) => {
                self.signal.fail_with(Failure::thrown(error));
                None
            }
        }
    }

    fn run(this: &Rc<Self>) {
        if this.is_stopped() {
            return;
        }

        this.state.borrow_mut().calls += 1;

        let Some(future) = this.hook(|hooks| Ok((hooks.attempt)())) else {
            return;
        };

        // The attempt callback may have canceled the sequence itself.
        if this.is_stopped() {
            future.cancel();
            return;
        }

        this.state.borrow_mut().current = Some(future.clone());

        let driver = this.clone();
        future.listen(Box::new(move |outcome| Driver::settled(&driver, outcome)));
    }

    fn settled(this: &Rc<Self>, outcome: Outcome<T>) {
        {
            let mut state = this.state.borrow_mut();
            state.current = None;

            if state.stopped {
                return;
            }
        }

        match outcome {
            Outcome::Success(value) => Driver::succeeded(this, value),
            Outcome::Failure(failure) => Driver::failed(this, failure),
        }
    }

    fn succeeded(this: &Rc<Self>, value: T) {
        let restart = this.hook(|hooks| {
            Ok(match hooks.should_restart.as_mut() {
                Some(should_restart) => should_restart(&value),
                None => false,
            })
        });

        match restart {
            Some(true) => {
                {
                    let mut state = this.state.borrow_mut();

                    if state.policy.reset_attempts_on_restart {
                        state.retried = 0;
                    }
                }

                tracing::debug!(future = %this.signal.future().id(), "retry restarted");

                // Queued so a run of ready attempts restarts without recursing.
                let driver = this.clone();
                pump::dispatch(Box::new(move || Driver::run(&driver)));
            }
            Some(false) => this.signal.complete(value),
            None => {}
        }
    }

    fn failed(this: &Rc<Self>, failure: Failure) {
        let budget = this.state.borrow().policy.retries;

        let decision = this.hook(|hooks| {
            let budget = match hooks.adjust_retries.as_mut() {
                Some(adjust) => adjust(&failure.error, budget),
                None => budget,
            };

            Ok((budget, (hooks.can_retry)(&failure.error)))
        });

        let Some((budget, retryable)) = decision else {
            return;
        };

        let retried = {
            let mut state = this.state.borrow_mut();
            state.policy.retries = budget;
            state.retried
        };

        if retried >= budget || !retryable {
            tracing::debug!(
                future = %this.signal.future().id(),
                retried,
                error = %failure.error,
                "retry gave up"
            );

            this.signal.fail_with(failure);
            return;
        }

        let mut policy = {
            let mut state = this.state.borrow_mut();
            state.retried += 1;
            state.policy
        };

        let hooked = this.hook(|hooks| {
            if let Some(before_retry) = hooks.before_retry.as_mut() {
                before_retry(&mut policy);
            }

            Ok(())
        });

        if hooked.is_none() {
            return;
        }

        this.state.borrow_mut().policy = policy;

        tracing::debug!(
            future = %this.signal.future().id(),
            retry = retried + 1,
            budget = policy.retries,
            delay = ?policy.delay,
            error = %failure.error,
            "retrying"
        );

        let next = this.clone();
        let disposed = this.clone();

        let handle = this.scope.after_or_dispose(
            policy.delay,
            move || {
                next.state.borrow_mut().delay = None;
                Driver::run(&next);
            },
            move || disposed.signal.cancel(),
        );

        match handle {
            Some(handle) => this.state.borrow_mut().delay = Some(handle),
            None => this.signal.cancel(),
        }
    }
}
