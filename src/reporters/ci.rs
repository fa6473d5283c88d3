use std::collections::{HashMap, HashSet};
use std::time::Instant;

use crate::console::Console;
use crate::reporter::{ReporterBase, ReporterOptions};
use crate::style::{ColorType, Modifier};
use crate::task::{Line, TaskId, TaskStatus};
use crate::{EventKind, Reporter};

/// Non-interactive reporter for CI logs.
///
/// Never moves the cursor and never redraws. A task is printed once, when
/// it reaches a terminal state; the line is then dropped from the frame so
/// the next render only appends. Subtasks finish before their parent, so
/// the first finished subtask prints its unfinished ancestors as headers.
///
/// ```text
/// [....] test
///   [PASS] unit (0.31s)
///   [FAIL] e2e (2.10s)
/// [FAIL] test (2.42s)
/// ```
#[derive(Debug)]
pub struct CiReporter {
    base: ReporterBase,
    // Latest state of unfinished tasks, for printing headers.
    running: HashMap<TaskId, Line>,
    headers: HashSet<TaskId>,
}

impl CiReporter {
    pub fn new(options: ReporterOptions) -> Self {
        Self::with_console(options, Console::stdio())
    }

    pub fn with_console(options: ReporterOptions, console: Console) -> Self {
        Self {
            base: ReporterBase::with_console(options, console),
            running: HashMap::new(),
            headers: HashSet::new(),
        }
    }
}

impl Reporter for CiReporter {
    fn name(&self) -> &'static str {
        "ci"
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

    fn should_use_interval(&self) -> bool {
        false
    }

    fn render_line(&mut self, line: &Line) -> String {
        let base = &self.base;
        let task = &line.task;
        let label = match task.status() {
            TaskStatus::Passed => "[PASS]",
            TaskStatus::Failed => "[FAIL]",
            TaskStatus::Skipped => "[SKIP]",
            TaskStatus::Pending | TaskStatus::Running => "[....]",
        };
        let color = ReporterBase::color_type(task);
        let mut text = format!(
            "{}{} {}",
            base.indent(line.depth * 2),
            base.style(label, color, &[Modifier::Bold]),
            task.title()
        );
        if let (Some(start), Some(stop)) = (task.start_time(), task.stop_time()) {
            let time = base.elapsed_time(start, stop, true);
            text.push_str(&format!(" {}", base.style(&format!("({time})"), ColorType::Pending, &[])));
        }
        text
    }

    /// Prints pending lines below everything already printed.
    fn handle_render(&mut self) -> std::io::Result<()> {
        self.base.console_mut().flush_buffered_streams()?;
        self.render();
        self.base.remove_line(|_| true);
        let console = self.base.console_mut();
        console.flush_buffered_output()?;
        console.commit_output();
        Ok(())
    }

    fn handle_task(&mut self, line: Line, now: Instant) -> std::io::Result<()> {
        let id = line.task.id();
        if !line.task.is_complete() {
            self.running.insert(id, line);
            return Ok(());
        }
        self.running.remove(&id);

        let mut ancestors = Vec::new();
        let mut parent = line.task.parent();
        while let Some(pid) = parent {
            if self.headers.contains(&pid) {
                break;
            }
            let Some(header) = self.running.get(&pid) else {
                break;
            };
            parent = header.task.parent();
            ancestors.push(header.clone());
        }
        for header in ancestors.into_iter().rev() {
            self.headers.insert(header.task.id());
            self.base.add_line(header);
        }

        self.base.add_line(line);
        self.base.debounce_render(now);
        Ok(())
    }
}
