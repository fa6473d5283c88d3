use std::time::Instant;

use crate::console::Console;
use crate::reporter::{ReporterBase, ReporterOptions};
use crate::style::{ColorType, Modifier};
use crate::task::{Line, TaskStatus};
use crate::{EventKind, Reporter};

const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Interactive reporter: redraws the task frame in place.
///
/// Running tasks show a spinner, finished tasks their elapsed time. Nested
/// lines disappear once they pass or are skipped so the frame only grows
/// with work that is still interesting; failures stay visible.
///
/// ```text
/// ✔ build (1.20s)
/// ⠹ test
///   ⠹ unit
///   ○ integration
/// ```
#[derive(Debug)]
pub struct DefaultReporter {
    base: ReporterBase,
    frame: usize,
}

impl DefaultReporter {
    pub fn new(options: ReporterOptions) -> Self {
        Self::with_console(options, Console::stdio())
    }

    pub fn with_console(options: ReporterOptions, console: Console) -> Self {
        Self {
            base: ReporterBase::with_console(options, console),
            frame: 0,
        }
    }

    fn symbol(&self, status: TaskStatus) -> &'static str {
        match status {
            TaskStatus::Pending => "○",
            TaskStatus::Running => SPINNER[self.frame],
            TaskStatus::Skipped => "◌",
            TaskStatus::Passed => "✔",
            TaskStatus::Failed => "✖",
        }
    }
}

impl Reporter for DefaultReporter {
    fn name(&self) -> &'static str {
        "default"
    }

    fn base(&self) -> &ReporterBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ReporterBase {
        &mut self.base
    }

    fn events(&self) -> &'static [EventKind] {
        &EventKind::ALL
    }

    fn on_start(&mut self) -> std::io::Result<()> {
        if self.base.options().ci {
            return Ok(());
        }
        self.base.console_mut().hide_cursor()
    }

    fn on_stop(&mut self) -> std::io::Result<()> {
        if self.base.options().ci {
            return Ok(());
        }
        self.base.console_mut().show_cursor()
    }

    fn on_render_start(&mut self) {
        self.frame = (self.frame + 1) % SPINNER.len();
    }

    fn render_line(&mut self, line: &Line) -> String {
        let base = &self.base;
        let task = &line.task;
        let color = ReporterBase::color_type(task);

        let title = match task.status() {
            TaskStatus::Pending => base.style(task.title(), ColorType::Pending, &[]),
            TaskStatus::Running => base.style(task.title(), ColorType::Pending, &[Modifier::Bold]),
            TaskStatus::Skipped => base.style(task.title(), ColorType::Warning, &[Modifier::Dim]),
            TaskStatus::Passed => task.title().to_string(),
            TaskStatus::Failed => base.style(task.title(), ColorType::Failure, &[Modifier::Bold]),
        };

        let mut text = format!(
            "{}{} {}",
            base.indent(line.depth * 2),
            base.style(self.symbol(task.status()), color, &[]),
            title,
        );
        if let (Some(start), Some(stop)) = (task.start_time(), task.stop_time()) {
            text.push_str(&format!(" ({})", base.elapsed_time(start, stop, true)));
        }
        base.fit(&text)
    }

    fn handle_task(&mut self, line: Line, now: Instant) -> std::io::Result<()> {
        let collapse = line.depth > 0
            && matches!(line.task.status(), TaskStatus::Passed | TaskStatus::Skipped);
        let id = line.task.id();
        if collapse {
            self.base.remove_line(|l| l.task.id() == id);
        } else {
            self.base.upsert_line(line);
        }
        self.base.debounce_render(now);
        Ok(())
    }
}
