use std::time::Instant;

use crate::emitter::{Idle, Subscription};
use crate::reporter::Phase;
use crate::Reporter;

/// Drives one reporter from its subscription until the run is over.
///
/// The loop sleeps on the subscription until either an event arrives or the
/// reporter's next timer is due, so interval and debounce timers fire on the
/// same thread that applies events. Nothing else ever touches the reporter.
///
/// # Example
///
/// ```rust,ignore
/// let emitter = Emitter::new();
/// let mut reporter = DefaultReporter::new(ReporterOptions::default());
/// let subscription = reporter.bootstrap(&emitter);
///
/// let handle = std::thread::spawn(move || {
///     RenderLoop::new(Box::new(reporter), subscription).run()
/// });
///
/// emitter.emit(ToolEvent::Start);
/// // ... work
/// emitter.emit(ToolEvent::Stop(None));
/// handle.join().unwrap();
/// ```
pub struct RenderLoop {
    reporter: Box<dyn Reporter>,
    subscription: Subscription,
}

impl RenderLoop {
    pub fn new(reporter: Box<dyn Reporter>, subscription: Subscription) -> Self {
        Self {
            reporter,
            subscription,
        }
    }

    /// Borrow the reporter (e.g. to inspect state between ticks).
    pub fn reporter(&self) -> &dyn Reporter {
        self.reporter.as_ref()
    }

    /// Run until the reporter is finalized.
    ///
    /// Blocks the calling thread. If every emitter is dropped before `stop`
    /// arrives, the reporter is stopped without an error so the terminal is
    /// always left in a clean state. Returns the finished reporter.
    pub fn run(mut self) -> Box<dyn Reporter> {
        while self.step() {}
        self.reporter
    }

    /// Wait for one event or timer and handle it. Returns `false` once the
    /// reporter is finalized.
    ///
    /// Use this for a custom outer loop that still wants the
    /// wait-then-dispatch logic.
    pub fn step(&mut self) -> bool {
        let timeout = self
            .reporter
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()));

        let result = match self.subscription.next(timeout) {
            Ok(event) => {
                let now = Instant::now();
                let handled = self.reporter.handle_event(event, now);
                // A busy subscription never times out; fire overdue timers here.
                let overdue = self.reporter.next_deadline().is_some_and(|d| d <= now);
                let ticked = if overdue { self.reporter.tick(now) } else { Ok(()) };
                handled.and(ticked)
            }
            Err(Idle::Timeout) => self.reporter.tick(Instant::now()),
            Err(Idle::Closed) => {
                tracing::debug!(reporter = self.reporter.name(), "emitter closed before stop");
                self.reporter.handle_base_stop(None)
            }
        };
        // A failed write drops one frame; the run itself is unaffected.
        if let Err(error) = result {
            tracing::warn!(reporter = self.reporter.name(), %error, "reporter write failed");
        }

        self.reporter.base().phase() != Phase::Finalized
    }
}
