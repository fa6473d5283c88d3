//! The built-in reporters and the policy that picks between them.
//!
//! | Reporter | Output |
//! |----------|--------|
//! | [`DefaultReporter`] | Live frame redrawn in place, spinner, collapsing subtasks |
//! | [`CiReporter`] | Append-only: one line per finished task, no cursor movement |
//! | [`ErrorReporter`] | Nothing until `stop`, then only a failure |

use std::str::FromStr;

use crate::console::Console;
use crate::error::Error;
use crate::reporter::ReporterOptions;
use crate::Reporter;

mod ci;
mod default;
mod error;

pub use ci::CiReporter;
pub use default::DefaultReporter;
pub use error::ErrorReporter;

/// The reporters a configuration can ask for by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReporterKind {
    Default,
    Ci,
}

impl ReporterKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Ci => "ci",
        }
    }

    /// Builds a reporter of this kind writing to `console`.
    pub fn build(self, options: ReporterOptions, console: Console) -> Box<dyn Reporter> {
        match self {
            Self::Default => Box::new(DefaultReporter::with_console(options, console)),
            Self::Ci => Box::new(CiReporter::with_console(options, console)),
        }
    }
}

impl FromStr for ReporterKind {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "ci" => Ok(Self::Ci),
            _ => Err(Error::UnknownReporter(name.to_string())),
        }
    }
}

/// Picks the reporters for a run.
///
/// Explicitly configured reporters always win. Without any, CI runners get
/// the [`CiReporter`] and everything else the [`DefaultReporter`].
pub fn select_reporters(ci: bool, configured: &[ReporterKind]) -> Vec<ReporterKind> {
    if !configured.is_empty() {
        let mut kinds = Vec::with_capacity(configured.len());
        for &kind in configured {
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        return kinds;
    }
    if ci {
        vec![ReporterKind::Ci]
    } else {
        vec![ReporterKind::Default]
    }
}
