#![doc = include_str!("../README.md")]

pub(crate) mod console;
pub(crate) mod emitter;
pub(crate) mod env;
pub(crate) mod error;
pub(crate) mod pipeline;
pub(crate) mod reporter;
pub mod reporters;
pub(crate) mod runner;
pub mod style;
pub(crate) mod task;
pub(crate) mod tool;
#[cfg(feature = "tracing")]
pub(crate) mod tracing;


use std::io::Write as _;
use std::time::Instant;

/// Re-exports of all public types and traits.
pub mod prelude {
    pub use crate::Reporter;
    pub use crate::console::Console;
    pub use crate::emitter::{Emitter, Idle, Subscription};
    pub use crate::env::Environment;
    pub use crate::error::{Error, Failure, Result};
    pub use crate::pipeline::{Context, FnRoutine, Job, Pipeline, Routine, job, routine};
    pub use crate::reporter::{Phase, ReporterBase, ReporterOptions};
    pub use crate::reporters::{CiReporter, DefaultReporter, ErrorReporter, ReporterKind};
    pub use crate::runner::RenderLoop;
    pub use crate::style::{ColorLevel, ColorType, Modifier};
    pub use crate::task::{Line, Task, TaskId, TaskStatus, Timestamp, now_millis};
    pub use crate::tool::{Tool, ToolOptions};
    #[cfg(feature = "tracing")]
    pub use crate::tracing::{ReporterLayer, reporter_layer};
    pub use crate::{EventKind, ToolEvent};
}

pub use crate::prelude::*;

/// Turns tool lifecycle events into terminal output.
///
/// A reporter owns a [`ReporterBase`] and the default methods here run the
/// whole engine over it: events mutate lines and logs, renders are
/// debounced onto a timer, and `stop` produces one final frame and the
/// summary. Variants override the policy hooks: which events they listen
/// to, whether an interval keeps redrawing, how a line is formatted, and
/// how the final output looks.
///
/// Timers are plain deadlines. Whoever drives the reporter (usually a
/// [`RenderLoop`]) waits until [`Reporter::next_deadline`] and calls
/// [`Reporter::tick`]; nothing here sleeps or spawns.
pub trait Reporter: Send {
    /// Unique name, used to reject duplicate registrations.
    fn name(&self) -> &'static str;

    fn base(&self) -> &ReporterBase;

    fn base_mut(&mut self) -> &mut ReporterBase;

    /// Event kinds [`Reporter::bootstrap`] subscribes to.
    fn events(&self) -> &'static [EventKind] {
        &EventKind::LIFECYCLE
    }

    /// Subscribes this reporter to `emitter`.
    fn bootstrap(&mut self, emitter: &Emitter) -> Subscription {
        emitter.subscribe(self.events())
    }

    /// Whether a recurring redraw runs between `start` and `stop`.
    fn should_use_interval(&self) -> bool {
        !self.base().options().ci
    }

    /// Called on `start`, after the base state is recorded.
    fn on_start(&mut self) -> std::io::Result<()> {
        Ok(())
    }

    /// Called on `stop`, after the summary is written.
    fn on_stop(&mut self) -> std::io::Result<()> {
        Ok(())
    }

    /// Called once before every frame is rendered.
    fn on_render_start(&mut self) {}

    /// Formats one line, without the trailing newline.
    fn render_line(&mut self, line: &Line) -> String {
        let base = self.base();
        let color = ReporterBase::color_type(&line.task);
        format!(
            "{}{}",
            base.indent(line.depth),
            base.style(line.task.title(), color, &[])
        )
    }

    /// Appends every current line to the pending frame.
    fn render(&mut self) {
        let lines = self.base().lines().to_vec();
        for line in &lines {
            let text = self.render_line(line);
            self.base_mut().console_mut().log(&text, 1);
        }
    }

    /// Erases the previous frame and draws the current one.
    fn handle_render(&mut self) -> std::io::Result<()> {
        self.on_render_start();
        let console = self.base_mut().console_mut();
        console.clear_lines_output()?;
        console.flush_buffered_streams()?;
        self.render();
        self.base_mut().console_mut().flush_buffered_output()
    }

    fn handle_event(&mut self, event: ToolEvent, now: Instant) -> std::io::Result<()> {
        match event {
            ToolEvent::Start => self.handle_base_start(now),
            ToolEvent::Stop(error) => self.handle_base_stop(error.as_ref()),
            ToolEvent::Log(message) => {
                self.base_mut().handle_log_message(message);
                Ok(())
            }
            ToolEvent::LogError(message) => {
                self.base_mut().handle_error_message(message);
                Ok(())
            }
            ToolEvent::Task { task, depth } => self.handle_task(Line::new(task, depth), now),
            ToolEvent::Output(text) => self.handle_output(text, now),
        }
    }

    fn handle_base_start(&mut self, now: Instant) -> std::io::Result<()> {
        if self.base().phase() != Phase::Idle {
            return Ok(());
        }
        let use_interval = self.should_use_interval();
        self.base_mut().start(now, use_interval);
        self.on_start()
    }

    fn handle_base_stop(&mut self, error: Option<&Failure>) -> std::io::Result<()> {
        if self.base().phase() == Phase::Finalized {
            return Ok(());
        }
        self.base_mut().stop();
        self.display_final_output(error)
    }

    /// A task changed: show its latest state on the next frame.
    fn handle_task(&mut self, line: Line, now: Instant) -> std::io::Result<()> {
        self.base_mut().upsert_line(line);
        self.base_mut().debounce_render(now);
        Ok(())
    }

    /// Raw output to print above the live frame.
    fn handle_output(&mut self, text: String, now: Instant) -> std::io::Result<()> {
        let base = self.base_mut();
        base.console_mut()
            .defer(move |out| out.write_all(text.as_bytes()));
        base.debounce_render(now);
        Ok(())
    }

    /// Final frame and summary. Cancels both timers first, so nothing can
    /// draw after this returns.
    fn display_final_output(&mut self, error: Option<&Failure>) -> std::io::Result<()> {
        self.base_mut().cancel_timers();
        let rendered = self.handle_render();
        let summary = self.base_mut().display_summary(error);
        let stopped = self.on_stop();
        self.base_mut().finalize();
        rendered.and(summary).and(stopped)
    }

    /// Fires whichever timers are due at `now`.
    fn tick(&mut self, now: Instant) -> std::io::Result<()> {
        if self.base().phase() != Phase::Running {
            return Ok(());
        }
        if self.base_mut().interval_due(now) {
            self.base_mut().debounce_render(now);
        }
        if self.base_mut().render_due(now) {
            let rendered = self.handle_render();
            self.base_mut().render_done();
            rendered?;
        }
        Ok(())
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.base().next_deadline()
    }
}

/// Kind of a [`ToolEvent`], used to subscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Start,
    Stop,
    Log,
    LogError,
    Task,
    Output,
}

impl EventKind {
    /// The four events every reporter listens to.
    pub const LIFECYCLE: [EventKind; 4] = [Self::Start, Self::Stop, Self::Log, Self::LogError];

    pub const ALL: [EventKind; 6] = [
        Self::Start,
        Self::Stop,
        Self::Log,
        Self::LogError,
        Self::Task,
        Self::Output,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Log => "log",
            Self::LogError => "log.error",
            Self::Task => "task",
            Self::Output => "output",
        }
    }
}

/// Something that happened during a tool run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolEvent {
    /// The run began.
    Start,
    /// The run ended, with the failure that ended it if any.
    Stop(Option<Failure>),
    /// A message to show after a successful run.
    Log(String),
    /// A message to show after the run whatever its outcome.
    LogError(String),
    /// A task was created or changed state.
    Task { task: Task, depth: usize },
    /// Raw text to print above the live frame.
    Output(String),
}

impl ToolEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Start => EventKind::Start,
            Self::Stop(_) => EventKind::Stop,
            Self::Log(_) => EventKind::Log,
            Self::LogError(_) => EventKind::LogError,
            Self::Task { .. } => EventKind::Task,
            Self::Output(_) => EventKind::Output,
        }
    }
}
