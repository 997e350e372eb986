use super::event_loop::{Clock, EventLoop, FaultHandler};
use crate::error::Error;

use std::cell::Cell;
use std::fmt;
use std::time::{Duration, Instant};

/// Builder for configuring and creating an event loop.
///
/// `EventLoopBuilder` allows customizing the loop before constructing it:
/// which clock drives it, how far apart frame callbacks are, and where
/// unhandled failures go.
///
/// # Examples
///
/// ```rust,ignore
/// let event_loop = EventLoopBuilder::new()
///     .manual_clock()
///     .frame_interval(Duration::from_millis(10))
///     .on_fault(|error| eprintln!("unhandled: {error}"))
///     .build();
/// ```
pub struct EventLoopBuilder {
    /// Drive the loop with a virtual clock instead of wall time.
    manual: bool,

    /// Distance between two frame deadlines.
    frame_interval: Duration,

    /// Receives failures that reached the end of a chain unhandled.
    on_fault: Option<FaultHandler>,
}

impl EventLoopBuilder {
    /// Creates a new `EventLoopBuilder` with default configuration.
    ///
    /// By default the loop runs on the system clock, schedules frames every
    /// 16ms, and logs unhandled failures with `tracing`.
    pub fn new() -> Self {
        Self {
            manual: false,
            frame_interval: Duration::from_millis(16),
            on_fault: None,
        }
    }

    /// Drives the loop with a manual clock starting at zero.
    ///
    /// Waiting for a deadline then moves the clock instead of sleeping.
    pub fn manual_clock(mut self) -> Self {
        self.manual = true;
        self
    }

    /// Sets the distance between two frame deadlines.
    ///
    /// # Panics
    ///
    /// Panics if `interval` is zero.
    pub fn frame_interval(mut self, interval: Duration) -> Self {
        assert!(!interval.is_zero(), "frame_interval must be > 0");

        self.frame_interval = interval;
        self
    }

    /// Sets the handler for failures that reached the end of a chain
    /// unhandled.
    pub fn on_fault<F>(mut self, handler: F) -> Self
    where
        F: Fn(Error) + 'static,
    {
        self.on_fault = Some(Box::new(handler));
        self
    }

    /// Builds the loop with the configured options.
    pub fn build(self) -> EventLoop {
        let clock = if self.manual {
            Clock::Manual(Cell::new(Duration::ZERO))
        } else {
            Clock::System(Instant::now())
        };

        let on_fault = self.on_fault.unwrap_or_else(|| {
            Box::new(|error: Error| {
                tracing::error!(%error, "unhandled failure");
            })
        });

        EventLoop::from_parts(clock, self.frame_interval, on_fault)
    }
}

impl Default for EventLoopBuilder {
    /// Creates a default `EventLoopBuilder`.
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventLoopBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoopBuilder")
            .field("manual", &self.manual)
            .field("frame_interval", &self.frame_interval)
            .field("on_fault", &self.on_fault.is_some())
            .finish()
    }
}
