use crate::task::TaskStatus;

/// Errors raised while configuring a tool or mutating tasks.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A task was asked to move out of a terminal state, or skip a step.
    #[error("task \"{title}\" cannot move from {from} to {to}")]
    InvalidTransition {
        title: String,
        from: TaskStatus,
        to: TaskStatus,
    },

    /// A reporter name that no known reporter answers to.
    #[error("unknown reporter \"{0}\" (expected \"default\" or \"ci\")")]
    UnknownReporter(String),

    /// Two reporters with the same name were registered on one tool.
    #[error("reporter \"{0}\" is already registered")]
    DuplicateReporter(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A failed task or run, as presented in the final summary.
///
/// Unlike [`Error`] this is a plain value: it is cloned to every reporter
/// subscribed to the `stop` event, so it only keeps the rendered message and
/// the messages of its cause chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    message: String,
    causes: Vec<String>,
}

impl Failure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            causes: Vec::new(),
        }
    }

    /// Captures `error` and every `source()` below it.
    pub fn from_error(error: &(dyn std::error::Error + 'static)) -> Self {
        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }
        Self {
            message: error.to_string(),
            causes,
        }
    }

    /// Adds a cause line below the message.
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.causes.push(cause.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn causes(&self) -> &[String] {
        &self.causes
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for Failure {}

impl From<&str> for Failure {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for Failure {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<Error> for Failure {
    fn from(error: Error) -> Self {
        Self::from_error(&error)
    }
}

impl From<std::io::Error> for Failure {
    fn from(error: std::io::Error) -> Self {
        Self::from_error(&error)
    }
}
