use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};

/// Wall-clock milliseconds since the Unix epoch.
pub type Timestamp = u64;

/// Current wall-clock time as a [`Timestamp`].
pub fn now_millis() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as Timestamp)
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates a process-unique id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    Pending,
    Running,
    Skipped,
    Passed,
    Failed,
}

impl TaskStatus {
    /// Skipped, passed and failed tasks never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Skipped | Self::Passed | Self::Failed)
    }

    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Pending, Self::Skipped)
                | (Self::Running, Self::Passed)
                | (Self::Running, Self::Failed)
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Skipped => "skipped",
            Self::Passed => "passed",
            Self::Failed => "failed",
        })
    }
}

/// A named unit of work. Reporters only ever see clones of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    id: TaskId,
    parent: Option<TaskId>,
    title: String,
    status: TaskStatus,
    start_time: Option<Timestamp>,
    stop_time: Option<Timestamp>,
}

impl Task {
    pub fn new(title: impl Into<String>) -> Self {
        Self::with_id(TaskId::next(), title)
    }

    pub fn with_id(id: TaskId, title: impl Into<String>) -> Self {
        Self {
            id,
            parent: None,
            title: title.into(),
            status: TaskStatus::Pending,
            start_time: None,
            stop_time: None,
        }
    }

    /// Nests this task under `parent`, so reporters draw it inside the
    /// parent's subtree.
    pub fn with_parent(mut self, parent: Option<TaskId>) -> Self {
        self.parent = parent;
        self
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn parent(&self) -> Option<TaskId> {
        self.parent
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn start_time(&self) -> Option<Timestamp> {
        self.start_time
    }

    pub fn stop_time(&self) -> Option<Timestamp> {
        self.stop_time
    }

    pub fn is_running(&self) -> bool {
        self.status == TaskStatus::Running
    }

    pub fn is_complete(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn start(&mut self, at: Timestamp) -> Result<()> {
        self.transition(TaskStatus::Running)?;
        self.start_time = Some(at);
        Ok(())
    }

    pub fn pass(&mut self, at: Timestamp) -> Result<()> {
        self.transition(TaskStatus::Passed)?;
        self.stop_time = Some(at);
        Ok(())
    }

    pub fn fail(&mut self, at: Timestamp) -> Result<()> {
        self.transition(TaskStatus::Failed)?;
        self.stop_time = Some(at);
        Ok(())
    }

    pub fn skip(&mut self) -> Result<()> {
        self.transition(TaskStatus::Skipped)
    }

    fn transition(&mut self, next: TaskStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(Error::InvalidTransition {
                title: self.title.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

/// A task as drawn by a reporter: the task plus its nesting depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub task: Task,
    pub depth: usize,
}

impl Line {
    pub fn new(task: Task, depth: usize) -> Self {
        Self { task, depth }
    }
}
