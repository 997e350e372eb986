use super::builder::EventLoopBuilder;
use super::context;
use super::timer::TimerEntry;
use crate::error::Error;
use crate::future::Future;
use crate::time::{Callback, Platform, RawHandle, Repeating, TimerScope};

use std::cell::{Cell, RefCell};
use std::collections::{BinaryHeap, HashMap};
use std::fmt;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

/// Shortest period an interval may have; zero would spin the loop.
const MIN_PERIOD: Duration = Duration::from_millis(1);

pub(crate) type FaultHandler = Box<dyn Fn(Error)>;

pub(crate) enum Clock {
    /// Virtual time, moved only by the loop itself.
    Manual(Cell<Duration>),

    /// Wall time since the loop was built; waiting sleeps the thread.
    System(Instant),
}

impl Clock {
    fn now(&self) -> Duration {
        match self {
            Clock::Manual(now) => now.get(),
            Clock::System(epoch) => epoch.elapsed(),
        }
    }

    fn wait_until(&self, deadline: Duration) {
        match self {
            Clock::Manual(now) => {
                if deadline > now.get() {
                    now.set(deadline);
                }
            }
            Clock::System(epoch) => {
                let remaining = deadline.saturating_sub(epoch.elapsed());

                if !remaining.is_zero() {
                    thread::sleep(remaining);
                }
            }
        }
    }
}

enum Entry {
    Once(Callback),
    Repeat {
        /// `None` while the callback runs.
        callback: Option<Repeating>,
        period: Duration,
    },
}

enum Job {
    Once(Callback),
    Repeat {
        id: u64,
        callback: Repeating,
        period: Duration,
        deadline: Duration,
    },
}

struct Queue {
    next_id: u64,
    next_seq: u64,
    timers: BinaryHeap<TimerEntry>,
    callbacks: HashMap<u64, Entry>,
}

impl Queue {
    fn push(&mut self, deadline: Duration, id: u64) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.timers.push(TimerEntry { deadline, seq, id });
    }

    /// Earliest deadline of a live callback, dropping cleared entries.
    fn next_deadline(&mut self) -> Option<Duration> {
        while let Some(entry) = self.timers.peek() {
            if self.callbacks.contains_key(&entry.id) {
                return Some(entry.deadline);
            }

            self.timers.pop();
        }

        None
    }

    /// Pops the next live entry due at `now` and scheduled before `horizon`.
    fn pop_due(&mut self, now: Duration, horizon: u64) -> Option<Job> {
        loop {
            let entry = self.timers.peek()?;

            if entry.deadline > now || entry.seq >= horizon {
                return None;
            }

            let Some(entry) = self.timers.pop() else {
                return None;
            };

            match self.callbacks.get_mut(&entry.id) {
                None => continue,
                Some(Entry::Once(_)) => {
                    if let Some(Entry::Once(callback)) = self.callbacks.remove(&entry.id) {
                        return Some(Job::Once(callback));
                    }
                }
                Some(Entry::Repeat { callback, period }) => {
                    if let Some(callback) = callback.take() {
                        return Some(Job::Repeat {
                            id: entry.id,
                            callback,
                            period: *period,
                            deadline: entry.deadline,
                        });
                    }
                }
            }
        }
    }
}

pub(crate) struct LoopInner {
    clock: Clock,
    frame_interval: Duration,
    queue: RefCell<Queue>,
    on_fault: FaultHandler,
}

impl LoopInner {
    fn schedule(&self, deadline: Duration, entry: Entry) -> RawHandle {
        let mut queue = self.queue.borrow_mut();

        let id = queue.next_id;
        queue.next_id += 1;
        queue.callbacks.insert(id, entry);
        queue.push(deadline, id);

        RawHandle(id)
    }

    fn clear(&self, handle: RawHandle) {
        let removed = self.queue.borrow_mut().callbacks.remove(&handle.0);

        // Dropping a callback may drop the last handle to a scope, which
        // clears its own registrations on this loop.
        drop(removed);
    }

    fn next_frame(&self, now: Duration) -> Duration {
        let interval = self.frame_interval.as_nanos().max(1);
        let frames = now.as_nanos() / interval + 1;
        let nanos = frames.saturating_mul(interval);

        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    fn drain_faults(&self) {
        if !context::has_faults() {
            return;
        }

        for fault in context::take_faults() {
            (self.on_fault)(fault);
        }
    }
}

impl Platform for LoopInner {
    fn now(&self) -> Duration {
        self.clock.now()
    }

    fn set_timeout(&self, delay: Duration, callback: Callback) -> RawHandle {
        self.schedule(self.now() + delay, Entry::Once(callback))
    }

    fn clear_timeout(&self, handle: RawHandle) {
        self.clear(handle);
    }

    fn set_interval(&self, period: Duration, callback: Repeating) -> RawHandle {
        let period = period.max(MIN_PERIOD);

        self.schedule(
            self.now() + period,
            Entry::Repeat {
                callback: Some(callback),
                period,
            },
        )
    }

    fn clear_interval(&self, handle: RawHandle) {
        self.clear(handle);
    }

    fn set_immediate(&self, callback: Callback) -> RawHandle {
        self.schedule(self.now(), Entry::Once(callback))
    }

    fn request_frame(&self, callback: Callback) -> RawHandle {
        let deadline = self.next_frame(self.now());
        self.schedule(deadline, Entry::Once(callback))
    }
}

/// A single-threaded event loop that schedules callbacks by deadline.
///
/// The loop implements [`Platform`], so [`TimerScope`]s can be created on
/// it with [`scope`](Self::scope). Callbacks due at the same instant run in
/// the order they were scheduled.
///
/// Two clocks are available:
/// - a *system* clock ([`EventLoop::new`]) that sleeps the thread until the
///   next deadline,
/// - a *manual* clock ([`EventLoop::manual`]) that jumps straight to the
///   next deadline, for deterministic tests.
///
/// Failures that reach the end of a `done` chain unhandled are drained
/// after every callback and handed to the loop's fault handler.
///
/// # Examples
///
/// ```rust,ignore
/// let event_loop = EventLoop::manual();
/// let scope = event_loop.scope();
///
/// let nap = sleep(&scope, Duration::from_millis(30));
/// assert_eq!(event_loop.block_on(&nap), Ok(()));
/// assert_eq!(event_loop.now(), Duration::from_millis(30));
/// ```
#[derive(Clone)]
pub struct EventLoop {
    inner: Rc<LoopInner>,
}

impl EventLoop {
    /// Creates a loop on the system clock.
    pub fn new() -> Self {
        EventLoopBuilder::new().build()
    }

    /// Creates a loop on a manual clock starting at zero.
    pub fn manual() -> Self {
        EventLoopBuilder::new().manual_clock().build()
    }

    /// Returns a builder to configure a loop.
    pub fn builder() -> EventLoopBuilder {
        EventLoopBuilder::new()
    }

    pub(crate) fn from_parts(
        clock: Clock,
        frame_interval: Duration,
        on_fault: FaultHandler,
    ) -> Self {
        Self {
            inner: Rc::new(LoopInner {
                clock,
                frame_interval,
                queue: RefCell::new(Queue {
                    next_id: 1,
                    next_seq: 0,
                    timers: BinaryHeap::new(),
                    callbacks: HashMap::new(),
                }),
                on_fault,
            }),
        }
    }

    /// Current loop time.
    pub fn now(&self) -> Duration {
        self.inner.clock.now()
    }

    /// Creates a timer scope on this loop.
    ///
    /// Dropping the returned scope disposes it, canceling any sleep or
    /// timeout registered on it. Bind it to a variable rather than passing
    /// `&event_loop.scope()` inline.
    pub fn scope(&self) -> TimerScope {
        TimerScope::new(self.platform())
    }

    /// This loop as a scheduling platform.
    pub fn platform(&self) -> Rc<dyn Platform> {
        self.inner.clone()
    }

    /// Number of scheduled callbacks, intervals included.
    pub fn pending(&self) -> usize {
        self.inner.queue.borrow().callbacks.len()
    }

    /// Runs every callback that is due now and was scheduled before this
    /// call. Callbacks they schedule wait for the next turn.
    ///
    /// Returns `true` if at least one callback ran.
    pub fn turn(&self) -> bool {
        let now = self.now();
        let horizon = self.inner.queue.borrow().next_seq;
        let mut ran = false;

        loop {
            let job = self.inner.queue.borrow_mut().pop_due(now, horizon);

            let Some(job) = job else {
                break;
            };

            ran = true;
            self.run(job);
            self.inner.drain_faults();
        }

        ran
    }

    fn run(&self, job: Job) {
        match job {
            Job::Once(callback) => callback(),
            Job::Repeat {
                id,
                mut callback,
                period,
                deadline,
            } => {
                callback();

                let cleared = {
                    let mut queue = self.inner.queue.borrow_mut();

                    match queue.callbacks.get_mut(&id) {
                        Some(Entry::Repeat { callback: slot, .. }) => {
                            *slot = Some(callback);
                            queue.push(deadline + period, id);
                            None
                        }
                        _ => Some(callback),
                    }
                };

                // Cleared while it ran; dropped outside the queue borrow.
                drop(cleared);
            }
        }
    }

    /// Runs turns until nothing is due at the current time.
    fn run_due(&self) {
        self.inner.drain_faults();
        while self.turn() {}
    }

    fn next_deadline(&self) -> Option<Duration> {
        self.inner.queue.borrow_mut().next_deadline()
    }

    /// Lets `duration` pass, running every callback that becomes due on the
    /// way at its own deadline.
    pub fn advance(&self, duration: Duration) {
        let target = self.now() + duration;

        loop {
            self.run_due();

            match self.next_deadline() {
                Some(deadline) if deadline <= target => self.inner.clock.wait_until(deadline),
                _ => break,
            }
        }

        self.inner.clock.wait_until(target);
        self.run_due();
    }

    /// Runs callbacks until none is scheduled.
    ///
    /// Never returns while an interval is active.
    pub fn run_until_idle(&self) {
        loop {
            self.run_due();

            match self.next_deadline() {
                Some(deadline) => self.inner.clock.wait_until(deadline),
                None => break,
            }
        }
    }

    /// Runs the loop until `future` settles and returns its outcome.
    ///
    /// Returns [`Error::Stalled`] if the loop runs out of callbacks while
    /// the future is still pending.
    pub fn block_on<T>(&self, future: &Future<T>) -> Result<T, Error>
    where
        T: Clone + 'static,
    {
        loop {
            self.run_due();

            if let Some(outcome) = future.outcome() {
                return outcome;
            }

            match self.next_deadline() {
                Some(deadline) => self.inner.clock.wait_until(deadline),
                None => {
                    tracing::debug!(future = %future.id(), "event loop stalled");
                    return Err(Error::Stalled);
                }
            }
        }
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let manual = matches!(self.inner.clock, Clock::Manual(_));

        f.debug_struct("EventLoop")
            .field("now", &self.now())
            .field("manual", &manual)
            .field("pending", &self.pending())
            .finish()
    }
}
