use std::time::{Duration, Instant};

use crate::console::Console;
use crate::env::Environment;
use crate::error::Failure;
use crate::style::{self, ColorLevel, ColorType, Modifier, Palette};
use crate::task::{Line, Task, TaskStatus, Timestamp, now_millis};

/// Delay between the first render request and the redraw it triggers.
pub const DEBOUNCE_DELAY: Duration = Duration::from_millis(16);
/// Cadence of the redraws that keep spinners moving between events.
pub const RENDER_INTERVAL: Duration = Duration::from_millis(100);

/// Settings a reporter renders with.
#[derive(Debug, Clone, PartialEq)]
pub struct ReporterOptions {
    pub silent: bool,
    pub footer: Option<String>,
    pub theme: String,
    /// Durations above this many milliseconds are highlighted as slow.
    pub slow_threshold: u64,
    pub ci: bool,
    pub color_level: ColorLevel,
    pub columns: Option<u16>,
    pub interval: Duration,
}

impl Default for ReporterOptions {
    fn default() -> Self {
        Self {
            silent: false,
            footer: None,
            theme: String::from("default"),
            slow_threshold: 10_000,
            ci: false,
            color_level: ColorLevel::Basic,
            columns: None,
            interval: RENDER_INTERVAL,
        }
    }
}

impl ReporterOptions {
    pub fn silent(mut self, yes: bool) -> Self {
        self.silent = yes;
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    pub fn theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = theme.into();
        self
    }

    pub fn slow_threshold(mut self, millis: u64) -> Self {
        self.slow_threshold = millis;
        self
    }

    pub fn interval(mut self, d: Duration) -> Self {
        self.interval = d;
        self
    }

    /// Takes CI mode, color level and width from a detected environment.
    pub fn environment(mut self, env: Environment) -> Self {
        self.ci = env.ci;
        self.color_level = env.color_level;
        self.columns = env.columns;
        self
    }
}

/// Where a reporter is in its single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Finalized,
}

/// A recurring timer: a period and the next deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    period: Duration,
    next: Instant,
}

impl Interval {
    fn new(now: Instant, period: Duration) -> Self {
        Self {
            period,
            next: now + period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn next(&self) -> Instant {
        self.next
    }
}

/// State shared by every reporter variant.
///
/// Holds the drawn lines, the captured logs, the console and both timers.
/// Variants own one and expose it through [`crate::Reporter::base`]; the
/// trait's default methods drive it.
#[derive(Debug)]
pub struct ReporterBase {
    options: ReporterOptions,
    palette: Palette,
    console: Console,
    lines: Vec<Line>,
    logs: Vec<String>,
    error_logs: Vec<String>,
    render_scheduled: bool,
    render_timer: Option<Instant>,
    interval_timer: Option<Interval>,
    start_time: Option<Timestamp>,
    stop_time: Option<Timestamp>,
    phase: Phase,
}

impl ReporterBase {
    /// Base writing to stdout/stderr.
    pub fn new(options: ReporterOptions) -> Self {
        Self::with_console(options, Console::stdio())
    }

    pub fn with_console(options: ReporterOptions, console: Console) -> Self {
        let palette = Palette::resolve(&options.theme, options.color_level);
        let silent = options.silent || console.is_silent();
        Self {
            palette,
            console: console.silent(silent),
            options,
            lines: Vec::new(),
            logs: Vec::new(),
            error_logs: Vec::new(),
            render_scheduled: false,
            render_timer: None,
            interval_timer: None,
            start_time: None,
            stop_time: None,
            phase: Phase::Idle,
        }
    }

    pub fn options(&self) -> &ReporterOptions {
        &self.options
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut Console {
        &mut self.console
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn start_time(&self) -> Option<Timestamp> {
        self.start_time
    }

    pub fn stop_time(&self) -> Option<Timestamp> {
        self.stop_time
    }

    pub fn set_times(&mut self, start: Timestamp, stop: Timestamp) {
        self.start_time = Some(start);
        self.stop_time = Some(stop);
    }

    // -- Lines ---------------------------------------------------------------

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn add_line(&mut self, line: Line) {
        self.lines.push(line);
    }

    /// Removes every line matching `predicate`; returns how many went.
    pub fn remove_line(&mut self, predicate: impl Fn(&Line) -> bool) -> usize {
        let before = self.lines.len();
        self.lines.retain(|line| !predicate(line));
        before - self.lines.len()
    }

    pub fn find_line(&self, predicate: impl Fn(&Line) -> bool) -> Option<&Line> {
        self.lines.iter().find(|line| predicate(line))
    }

    /// Replaces the line of the same task in place. A new line goes after
    /// the last descendant of its parent, or at the end without one.
    pub fn upsert_line(&mut self, line: Line) {
        let id = line.task.id();
        if let Some(existing) = self.lines.iter_mut().find(|l| l.task.id() == id) {
            *existing = line;
            return;
        }
        let index = line
            .task
            .parent()
            .and_then(|parent| self.lines.iter().position(|l| l.task.id() == parent))
            .map(|parent| self.subtree_end(parent));
        match index {
            Some(index) => self.lines.insert(index, line),
            None => self.lines.push(line),
        }
    }

    // Index just past the lines drawn below `index` at a greater depth.
    fn subtree_end(&self, index: usize) -> usize {
        let depth = self.lines[index].depth;
        self.lines[index + 1..]
            .iter()
            .position(|l| l.depth <= depth)
            .map_or(self.lines.len(), |offset| index + 1 + offset)
    }

    // -- Logs ----------------------------------------------------------------

    pub fn logs(&self) -> &[String] {
        &self.logs
    }

    pub fn error_logs(&self) -> &[String] {
        &self.error_logs
    }

    pub fn handle_log_message(&mut self, message: String) {
        self.logs.push(message);
    }

    pub fn handle_error_message(&mut self, message: String) {
        self.error_logs.push(message);
    }

    // -- Timers --------------------------------------------------------------

    pub fn render_scheduled(&self) -> bool {
        self.render_scheduled
    }

    pub fn render_timer(&self) -> Option<Instant> {
        self.render_timer
    }

    pub fn interval_timer(&self) -> Option<Interval> {
        self.interval_timer
    }

    /// Schedules one redraw [`DEBOUNCE_DELAY`] from `now` unless one is
    /// already pending or the reporter is not running. Returns whether this
    /// call scheduled it.
    pub fn debounce_render(&mut self, now: Instant) -> bool {
        if self.render_scheduled || self.phase != Phase::Running {
            return false;
        }
        self.render_scheduled = true;
        self.render_timer = Some(now + DEBOUNCE_DELAY);
        true
    }

    /// Earliest pending timer deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        let interval = self.interval_timer.map(|i| i.next);
        match (self.render_timer, interval) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Advances the interval timer if due; returns whether it fired.
    pub(crate) fn interval_due(&mut self, now: Instant) -> bool {
        match &mut self.interval_timer {
            Some(interval) if interval.next <= now => {
                interval.next = now + interval.period;
                true
            }
            _ => false,
        }
    }

    /// Clears the debounce deadline if due; returns whether it fired.
    pub(crate) fn render_due(&mut self, now: Instant) -> bool {
        match self.render_timer {
            Some(deadline) if deadline <= now => {
                self.render_timer = None;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn render_done(&mut self) {
        self.render_scheduled = false;
    }

    pub(crate) fn start(&mut self, now: Instant, use_interval: bool) {
        self.start_time = Some(now_millis());
        self.phase = Phase::Running;
        if use_interval {
            self.interval_timer = Some(Interval::new(now, self.options.interval));
        }
        // Anything received while idle is drawn right away.
        if !self.lines.is_empty() || self.console.pending_streams() > 0 {
            self.debounce_render(now);
        }
        tracing::debug!(interval = use_interval, "reporter started");
    }

    pub(crate) fn stop(&mut self) {
        self.stop_time = Some(now_millis());
        self.interval_timer = None;
    }

    /// Drops both timers; nothing is left to fire.
    pub fn cancel_timers(&mut self) {
        self.render_timer = None;
        self.interval_timer = None;
        self.render_scheduled = false;
    }

    pub(crate) fn finalize(&mut self) {
        self.cancel_timers();
        self.phase = Phase::Finalized;
        tracing::debug!("reporter finalized");
    }

    // -- Formatting ----------------------------------------------------------

    /// `(stop - start) / 1000` as `"4.00s"`, in the failure color when
    /// `highlight` is set and the duration exceeds the slow threshold.
    pub fn elapsed_time(&self, start: Timestamp, stop: Timestamp, highlight: bool) -> String {
        let millis = stop.saturating_sub(start);
        let time = format!("{:.2}s", millis as f64 / 1000.0);
        if highlight && millis > self.options.slow_threshold {
            self.style(&time, ColorType::Failure, &[])
        } else {
            time
        }
    }

    pub fn color_type(task: &Task) -> ColorType {
        match task.status() {
            TaskStatus::Skipped => ColorType::Warning,
            TaskStatus::Passed => ColorType::Success,
            TaskStatus::Failed => ColorType::Failure,
            TaskStatus::Pending | TaskStatus::Running => ColorType::Pending,
        }
    }

    pub fn palette(&self) -> Palette {
        self.palette
    }

    pub fn style(&self, text: &str, color: ColorType, modifiers: &[Modifier]) -> String {
        let level = self.options.color_level;
        if level == ColorLevel::None {
            return text.to_string();
        }
        let painted = style::paint(text, self.palette.get(color), level);
        modifiers
            .iter()
            .fold(painted, |text, &modifier| style::modify(&text, modifier))
    }

    pub fn indent(&self, depth: usize) -> String {
        " ".repeat(depth)
    }

    /// Keeps `text` on one terminal row when the width is known.
    pub fn fit(&self, text: &str) -> String {
        match self.options.columns {
            Some(columns) => style::truncate(text, columns as usize),
            None => text.to_string(),
        }
    }

    // -- Summary -------------------------------------------------------------

    /// Three writes to the error stream: header, message with causes, trailer.
    pub fn display_error(&mut self, error: &Failure) -> std::io::Result<()> {
        let header = self.style(" ERROR ", ColorType::Failure, &[Modifier::Inverse, Modifier::Bold]);
        let mut body = self.style(error.message(), ColorType::Failure, &[Modifier::Bold]);
        body.push('\n');
        for cause in error.causes() {
            body.push_str(&self.style(&format!("  caused by: {cause}"), ColorType::Pending, &[]));
            body.push('\n');
        }
        self.console.err(&format!("\n{header}\n"))?;
        self.console.err(&body)?;
        self.console.err("\n")
    }

    pub fn display_footer(&mut self) -> std::io::Result<()> {
        let stop = self.stop_time.unwrap_or_else(now_millis);
        let start = self.start_time.unwrap_or(stop);
        let time = self.elapsed_time(start, stop, true);
        let message = self.options.footer.as_deref().unwrap_or("Done");
        let footer = format!("[{time}] {message}\n");
        self.console.out(&footer)
    }

    pub fn display_logs(&mut self, messages: &[String]) -> std::io::Result<()> {
        if messages.is_empty() {
            return Ok(());
        }
        self.console.out(&format!("\n{}\n", messages.join("\n")))
    }

    /// The error block or footer, then whichever log buffer applies.
    ///
    /// Captured error logs take precedence over `error`: when any exist the
    /// error block is skipped and the logs are shown instead.
    pub fn display_summary(&mut self, error: Option<&Failure>) -> std::io::Result<()> {
        let error_logs = std::mem::take(&mut self.error_logs);
        let logs = std::mem::take(&mut self.logs);

        match error {
            Some(error) if error_logs.is_empty() => self.display_error(error)?,
            _ => self.display_footer()?,
        }

        if !error_logs.is_empty() {
            self.display_logs(&error_logs)
        } else if error.is_none() {
            self.display_logs(&logs)
        } else {
            Ok(())
        }
    }
}
