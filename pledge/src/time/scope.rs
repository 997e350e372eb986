use super::debounce::{DebounceOptions, Debounced};
use super::platform::{Callback, Platform, RawHandle};
use super::throttle::{ThrottleOptions, Throttled};
use crate::error::Error;

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};
use std::time::Duration;

/// Handle to one callback registered on a [`TimerScope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Timeout,
    Immediate,
    Interval,
    Frame,
}

struct Registration {
    kind: Kind,
    raw: RawHandle,

    /// Runs if the scope is disposed while the registration is outstanding.
    on_dispose: Option<Callback>,
}

struct Registry {
    disposed: bool,
    next_id: u64,
    timers: HashMap<TimerHandle, Registration>,
}

type ErrorHandler = Box<dyn Fn(&Error)>;

struct ScopeInner {
    platform: Rc<dyn Platform>,
    registry: RefCell<Registry>,
    on_error: ErrorHandler,
}

impl ScopeInner {
    /// Runs a scheduled callback, routing a panic to the error handler.
    fn invoke(&self, callback: impl FnOnce()) {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(callback)) {
            (self.on_error)(&Error::from_panic(payload));
        }
    }

    /// Forgets a one-shot registration that is about to fire.
    ///
    /// Returns `false` if it was canceled meanwhile.
    fn retire(&self, handle: TimerHandle) -> bool {
        self.registry.borrow_mut().timers.remove(&handle).is_some()
    }

    fn is_registered(&self, handle: TimerHandle) -> bool {
        self.registry.borrow().timers.contains_key(&handle)
    }

    fn clear(&self, registration: &Registration) {
        match registration.kind {
            Kind::Timeout => self.platform.clear_timeout(registration.raw),
            Kind::Immediate => self.platform.clear_immediate(registration.raw),
            Kind::Interval => self.platform.clear_interval(registration.raw),
            Kind::Frame => self.platform.cancel_frame(registration.raw),
        }
    }

    fn dispose(&self) {
        let mut drained: Vec<(TimerHandle, Registration)> = {
            let mut registry = self.registry.borrow_mut();

            if registry.disposed {
                return;
            }

            registry.disposed = true;
            registry.timers.drain().collect()
        };

        drained.sort_by_key(|(handle, _)| handle.0);
        tracing::debug!(outstanding = drained.len(), "timer scope disposed");

        for (_, registration) in drained {
            self.clear(&registration);

            if let Some(on_dispose) = registration.on_dispose {
                self.invoke(on_dispose);
            }
        }
    }
}

impl Drop for ScopeInner {
    /// Cancels whatever is still outstanding when the last handle goes away.
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Owns every timer, next-turn, periodic and frame callback registered
/// through it.
///
/// Disposing the scope cancels everything still outstanding; registrations
/// made afterwards are ignored and return `None`. A panic raised by a
/// scheduled callback is caught at the scheduling boundary and handed to the
/// scope's error handler (by default it is logged with `tracing`).
///
/// `TimerScope` is a cheap handle; clones share the same registrations.
/// Dropping the last handle disposes the scope. [`sleep`](super::sleep) and
/// [`timeout`](super::timeout) hold only a weak handle, so their futures
/// are canceled along with it; keep a handle bound while they are pending.
/// A [`RetryDriver`](crate::RetryDriver) keeps its scope alive until the
/// sequence settles.
///
/// # Examples
///
/// ```rust,ignore
/// let event_loop = EventLoop::manual();
/// let scope = event_loop.scope();
///
/// scope.after(Duration::from_millis(10), || println!("tick"));
/// event_loop.advance(Duration::from_millis(10));
/// ```
#[derive(Clone)]
pub struct TimerScope {
    inner: Rc<ScopeInner>,
}

impl TimerScope {
    /// Creates a scope on `platform` that logs callback panics.
    pub fn new(platform: Rc<dyn Platform>) -> Self {
        Self::with_error_handler(platform, |error| {
            tracing::error!(%error, "scheduled callback failed");
        })
    }

    /// Creates a scope on `platform` that hands callback panics to `on_error`.
    pub fn with_error_handler<H>(platform: Rc<dyn Platform>, on_error: H) -> Self
    where
        H: Fn(&Error) + 'static,
    {
        Self {
            inner: Rc::new(ScopeInner {
                platform,
                registry: RefCell::new(Registry {
                    disposed: false,
                    next_id: 1,
                    timers: HashMap::new(),
                }),
                on_error: Box::new(on_error),
            }),
        }
    }

    /// Current platform time.
    pub fn now(&self) -> Duration {
        self.inner.platform.now()
    }

    /// Returns `true` once [`dispose`](Self::dispose) has run.
    pub fn is_disposed(&self) -> bool {
        self.inner.registry.borrow().disposed
    }

    /// Number of outstanding registrations.
    pub fn pending(&self) -> usize {
        self.inner.registry.borrow().timers.len()
    }

    fn reserve(&self) -> Option<TimerHandle> {
        let mut registry = self.inner.registry.borrow_mut();

        if registry.disposed {
            tracing::debug!("registration on a disposed timer scope ignored");
            return None;
        }

        let handle = TimerHandle(registry.next_id);
        registry.next_id += 1;
        Some(handle)
    }

    fn record(
        &self,
        handle: TimerHandle,
        kind: Kind,
        raw: RawHandle,
        on_dispose: Option<Callback>,
    ) {
        self.inner.registry.borrow_mut().timers.insert(
            handle,
            Registration {
                kind,
                raw,
                on_dispose,
            },
        );
    }

    pub(crate) fn downgrade(&self) -> WeakTimerScope {
        WeakTimerScope {
            inner: Rc::downgrade(&self.inner),
        }
    }

    fn one_shot<F>(&self, handle: TimerHandle, callback: F) -> Box<dyn FnOnce()>
    where
        F: FnOnce() + 'static,
    {
        let scope: Weak<ScopeInner> = Rc::downgrade(&self.inner);

        Box::new(move || {
            let Some(scope) = scope.upgrade() else {
                return;
            };

            if scope.retire(handle) {
                scope.invoke(callback);
            }
        })
    }

    /// Runs `callback` once after `delay`.
    ///
    /// Returns `None`, and never runs the callback, if the scope is disposed.
    pub fn after<F>(&self, delay: Duration, callback: F) -> Option<TimerHandle>
    where
        F: FnOnce() + 'static,
    {
        self.schedule(delay, callback, None)
    }

    /// Like [`after`](Self::after), but runs `on_dispose` instead of
    /// `callback` if the scope is disposed before the delay elapses.
    pub(crate) fn after_or_dispose<F, D>(
        &self,
        delay: Duration,
        callback: F,
        on_dispose: D,
    ) -> Option<TimerHandle>
    where
        F: FnOnce() + 'static,
        D: FnOnce() + 'static,
    {
        self.schedule(delay, callback, Some(Box::new(on_dispose)))
    }

    fn schedule<F>(
        &self,
        delay: Duration,
        callback: F,
        on_dispose: Option<Callback>,
    ) -> Option<TimerHandle>
    where
        F: FnOnce() + 'static,
    {
        let handle = self.reserve()?;
        let raw = self
            .inner
            .platform
            .set_timeout(delay, self.one_shot(handle, callback));

        self.record(handle, Kind::Timeout, raw, on_dispose);
        Some(handle)
    }

    /// Runs `callback` on the next cooperative scheduling turn.
    pub fn soon<F>(&self, callback: F) -> Option<TimerHandle>
    where
        F: FnOnce() + 'static,
    {
        let handle = self.reserve()?;
        let raw = self
            .inner
            .platform
            .set_immediate(self.one_shot(handle, callback));

        self.record(handle, Kind::Immediate, raw, None);
        Some(handle)
    }

    /// Runs `callback` before the next frame.
    pub fn next_frame<F>(&self, callback: F) -> Option<TimerHandle>
    where
        F: FnOnce() + 'static,
    {
        let handle = self.reserve()?;
        let raw = self
            .inner
            .platform
            .request_frame(self.one_shot(handle, callback));

        self.record(handle, Kind::Frame, raw, None);
        Some(handle)
    }

    /// Runs `callback` every `period` until canceled or disposed.
    pub fn every<F>(&self, period: Duration, mut callback: F) -> Option<TimerHandle>
    where
        F: FnMut() + 'static,
    {
        let handle = self.reserve()?;
        let scope: Weak<ScopeInner> = Rc::downgrade(&self.inner);

        let raw = self.inner.platform.set_interval(
            period,
            Box::new(move || {
                let Some(scope) = scope.upgrade() else {
                    return;
                };

                if scope.is_registered(handle) {
                    scope.invoke(&mut callback);
                }
            }),
        );

        self.record(handle, Kind::Interval, raw, None);
        Some(handle)
    }

    /// Cancels one registration. Unknown, fired, or already canceled handles
    /// are ignored.
    pub fn cancel(&self, handle: TimerHandle) {
        let registration = self.inner.registry.borrow_mut().timers.remove(&handle);

        if let Some(registration) = registration {
            self.inner.clear(&registration);
        }
    }

    /// Cancels every outstanding registration and refuses new ones.
    ///
    /// Safe to call more than once.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// Wraps `func` so it runs at most once per `window`.
    ///
    /// See [`Throttled`] for the leading/trailing rules.
    pub fn throttle<A, R, F>(
        &self,
        func: F,
        window: Duration,
        options: ThrottleOptions,
    ) -> Throttled<A, R>
    where
        A: 'static,
        R: Clone + 'static,
        F: FnMut(A) -> R + 'static,
    {
        Throttled::new(self.clone(), Box::new(func), window, options)
    }

    /// Wraps `func` so it runs once calls have paused for `window`.
    ///
    /// See [`Debounced`] for the leading/trailing/max-wait rules.
    pub fn debounce<A, R, F>(
        &self,
        func: F,
        window: Duration,
        options: DebounceOptions,
    ) -> Debounced<A, R>
    where
        A: 'static,
        R: Clone + 'static,
        F: FnMut(A) -> R + 'static,
    {
        Debounced::new(self.clone(), Box::new(func), window, options)
    }
}

impl fmt::Debug for TimerScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.inner.registry.borrow();

        f.debug_struct("TimerScope")
            .field("disposed", &registry.disposed)
            .field("pending", &registry.timers.len())
            .finish()
    }
}

/// A non-owning handle to a [`TimerScope`], for cancel actions that must not
/// keep the scope alive.
#[derive(Clone)]
pub(crate) struct WeakTimerScope {
    inner: Weak<ScopeInner>,
}

impl WeakTimerScope {
    /// Cancels `handle` if the scope is still alive.
    pub(crate) fn cancel(&self, handle: TimerHandle) {
        if let Some(inner) = self.inner.upgrade() {
            TimerScope { inner }.cancel(handle);
        }
    }
}
