//! Detection of the execution environment a reporter draws into.
//!
//! Everything here reads process-global state (environment variables, the
//! tty status of stdout, the terminal size). The result is captured once in
//! an [`Environment`] and handed to reporters explicitly, so rendering code
//! never consults the environment itself.

use std::io::IsTerminal;

use crate::style::ColorLevel;

/// Variables set by common continuous-integration runners.
const CI_VARIABLES: &[&str] = &[
    "CI",
    "CONTINUOUS_INTEGRATION",
    "BUILD_NUMBER",
    "RUN_ID",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "BUILDKITE",
    "CIRCLECI",
    "TF_BUILD",
    "JENKINS_URL",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Environment {
    /// Running under a CI runner: no cursor movement, no interval redraws.
    pub ci: bool,
    /// Stdout is attached to a terminal.
    pub interactive: bool,
    pub color_level: ColorLevel,
    /// Terminal width, when known.
    pub columns: Option<u16>,
}

impl Default for Environment {
    /// A plain interactive terminal with basic colors.
    fn default() -> Self {
        Self {
            ci: false,
            interactive: true,
            color_level: ColorLevel::Basic,
            columns: None,
        }
    }
}

impl Environment {
    /// Detects the environment of the current process.
    pub fn detect() -> Self {
        let interactive = std::io::stdout().is_terminal();
        let columns = crossterm::terminal::size().ok().map(|(w, _)| w);
        Self::from_vars(|name| std::env::var(name).ok(), interactive, columns)
    }

    /// Detection from an arbitrary variable lookup; used by [`Environment::detect`].
    pub fn from_vars(
        var: impl Fn(&str) -> Option<String>, interactive: bool, columns: Option<u16>,
    ) -> Self {
        let ci = is_ci(&var);
        Self {
            ci,
            interactive,
            color_level: color_level(&var, interactive, ci),
            columns: columns.filter(|&w| w > 0),
        }
    }

    pub fn ci(mut self, yes: bool) -> Self {
        self.ci = yes;
        self
    }

    pub fn color_level(mut self, level: ColorLevel) -> Self {
        self.color_level = level;
        self
    }

    pub fn columns(mut self, columns: Option<u16>) -> Self {
        self.columns = columns;
        self
    }
}

fn is_ci(var: &impl Fn(&str) -> Option<String>) -> bool {
    CI_VARIABLES.iter().any(|name| match var(name) {
        Some(value) => !matches!(value.as_str(), "" | "0" | "false"),
        None => false,
    })
}

fn color_level(var: &impl Fn(&str) -> Option<String>, interactive: bool, ci: bool) -> ColorLevel {
    if var("NO_COLOR").is_some_and(|v| !v.is_empty()) {
        return ColorLevel::None;
    }
    if let Some(force) = var("FORCE_COLOR") {
        match force.as_str() {
            "0" | "false" => return ColorLevel::None,
            "2" => return ColorLevel::Ansi256,
            "3" => return ColorLevel::TrueColor,
            _ => return ColorLevel::Basic,
        }
    }
    if !interactive && !ci {
        return ColorLevel::None;
    }

    let term = var("TERM").unwrap_or_default();
    if term == "dumb" {
        return ColorLevel::None;
    }
    let colorterm = var("COLORTERM").unwrap_or_default();
    if colorterm == "truecolor" || colorterm == "24bit" {
        return ColorLevel::TrueColor;
    }
    if term.contains("256") {
        return ColorLevel::Ansi256;
    }
    ColorLevel::Basic
}
