use crate::console::Console;
use crate::error::Failure;
use crate::reporter::{ReporterBase, ReporterOptions};
use crate::Reporter;

/// Placeholder reporter used before real reporters are loaded.
///
/// It draws nothing while running. On `stop` it reports a failure (error
/// block plus captured error logs) and stays silent on success.
#[derive(Debug)]
pub struct ErrorReporter {
    base: ReporterBase,
}

impl ErrorReporter {
    pub fn new(options: ReporterOptions) -> Self {
        Self::with_console(options, Console::stdio())
    }

    pub fn with_console(options: ReporterOptions, console: Console) -> Self {
        Self {
            base: ReporterBase::with_console(options, console),
        }
    }
}

impl Reporter for ErrorReporter {
    fn name(&self) -> &'static str {
        "error"
    }

    fn base(&self) -> &ReporterBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ReporterBase {
        &mut self.base
    }

    fn should_use_interval(&self) -> bool {
        false
    }

    fn render(&mut self) {}

    fn display_final_output(&mut self, error: Option<&Failure>) -> std::io::Result<()> {
        self.base.cancel_timers();
        let mut result = Ok(());
        if let Some(error) = error {
            let error_logs = self.base.error_logs().to_vec();
            result = match error_logs.is_empty() {
                true => self.base.display_error(error),
                false => self.base.display_logs(&error_logs),
            };
        }
        self.base.finalize();
        result
    }
}
