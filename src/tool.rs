use std::thread::JoinHandle;
use std::time::Instant;

use crate::console::Console;
use crate::emitter::Emitter;
use crate::env::Environment;
use crate::error::{Error, Failure, Result};
use crate::pipeline::{Context, Pipeline};
use crate::reporter::ReporterOptions;
use crate::reporters::{ErrorReporter, ReporterKind, select_reporters};
use crate::runner::RenderLoop;
use crate::{Reporter, ToolEvent};

/// Settings of a tool run, as produced by the host application's config.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOptions {
    pub name: String,
    pub footer: Option<String>,
    pub silent: bool,
    pub theme: String,
    pub slow_threshold: u64,
    /// Reporter names to load; empty lets the environment decide.
    pub reporters: Vec<String>,
}

impl Default for ToolOptions {
    fn default() -> Self {
        let reporter = ReporterOptions::default();
        Self {
            name: String::from("tool"),
            footer: None,
            silent: reporter.silent,
            theme: reporter.theme,
            slow_threshold: reporter.slow_threshold,
            reporters: Vec::new(),
        }
    }
}

impl ToolOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    pub fn silent(mut self, yes: bool) -> Self {
        self.silent = yes;
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

    pub fn reporter(mut self, name: impl Into<String>) -> Self {
        self.reporters.push(name.into());
        self
    }
}

type ConsoleFactory = Box<dyn Fn() -> Console + Send>;

/// Owns the reporters and the emitter of one run.
///
/// A fresh tool carries only an [`ErrorReporter`] so that failures while
/// loading real reporters still reach the user. The placeholder is replaced
/// by the first registered reporter and never counts as configured.
///
/// ```rust,ignore
/// let tool = Tool::new(ToolOptions::new("deploy"), Environment::detect());
/// let pipeline = Pipeline::new()
///     .pipe(routine("build", |ctx| ctx.task("compile", |_| Ok(()))))
///     .pipe(routine("test", |_| Ok(())));
/// tool.run(pipeline)?;
/// ```
pub struct Tool {
    options: ToolOptions,
    environment: Environment,
    emitter: Emitter,
    reporters: Vec<Box<dyn Reporter>>,
    console: ConsoleFactory,
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("options", &self.options)
            .field("environment", &self.environment)
            .field("reporters", &self.reporter_names())
            .finish()
    }
}

impl Tool {
    pub fn new(options: ToolOptions, environment: Environment) -> Self {
        let mut tool = Self {
            options,
            environment,
            emitter: Emitter::new(),
            reporters: Vec::new(),
            console: Box::new(Console::stdio),
        };
        tool.reporters.push(Box::new(tool.placeholder()));
        tool
    }

    /// Where reporters built by this tool write, instead of stdio.
    pub fn with_console(mut self, factory: impl Fn() -> Console + Send + 'static) -> Self {
        self.console = Box::new(factory);
        let placeholder = self.placeholder();
        self.reporters.retain(|r| r.name() != "error");
        self.reporters.insert(0, Box::new(placeholder));
        self
    }

    pub fn options(&self) -> &ToolOptions {
        &self.options
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// A handle for emitting into this tool's reporters from elsewhere.
    pub fn emitter(&self) -> Emitter {
        self.emitter.clone()
    }

    pub fn reporter_names(&self) -> Vec<&'static str> {
        self.reporters.iter().map(|r| r.name()).collect()
    }

    /// Options handed to every reporter this tool builds.
    pub fn reporter_options(&self) -> ReporterOptions {
        let mut options = ReporterOptions::default()
            .environment(self.environment)
            .silent(self.options.silent)
            .theme(self.options.theme.clone())
            .slow_threshold(self.options.slow_threshold);
        options.footer = self.options.footer.clone();
        options
    }

    /// Whether a real (non-placeholder) reporter is registered.
    pub fn has_reporters(&self) -> bool {
        self.reporters.iter().any(|r| r.name() != "error")
    }

    /// Adds a reporter, replacing the placeholder.
    pub fn register_reporter(&mut self, reporter: Box<dyn Reporter>) -> Result<()> {
        let name = reporter.name();
        if self.reporters.iter().any(|r| r.name() == name && name != "error") {
            return Err(Error::DuplicateReporter(name.to_string()));
        }
        self.reporters.retain(|r| r.name() != "error");
        tracing::debug!(reporter = name, "reporter registered");
        self.reporters.push(reporter);
        Ok(())
    }

    /// Loads the reporters named in the options, or the environment's
    /// default when none are named. Does nothing if reporters were
    /// registered explicitly.
    pub fn load_reporters(&mut self) -> Result<()> {
        if self.has_reporters() {
            return Ok(());
        }
        let configured = self
            .options
            .reporters
            .iter()
            .map(|name| name.parse())
            .collect::<Result<Vec<ReporterKind>>>()?;

        for kind in select_reporters(self.environment.ci, &configured) {
            let reporter = kind.build(self.reporter_options(), (self.console)());
            self.register_reporter(reporter)?;
        }
        Ok(())
    }

    /// Runs `pipeline` with every reporter on its own render thread.
    ///
    /// Emits `start`, runs the pipeline, emits `stop` with the outcome and
    /// waits for every reporter to print its summary.
    pub fn run(mut self, mut pipeline: Pipeline) -> Result<(), Failure> {
        if let Err(error) = self.load_reporters() {
            let failure = Failure::from(error);
            self.report_setup_failure(&failure);
            return Err(failure);
        }

        let reporters = std::mem::take(&mut self.reporters);
        let handles = launch(reporters, &self.emitter, &self.options.name, |name, render_loop| {
            std::thread::Builder::new()
                .name(name)
                .spawn(move || render_loop.run())
        })?;

        let ctx = Context::new(self.emitter.clone());
        self.emitter.emit(ToolEvent::Start);
        let result = pipeline.run(&ctx);
        self.emitter.emit(ToolEvent::Stop(result.clone().err()));

        join(handles);
        result
    }

    fn placeholder(&self) -> ErrorReporter {
        ErrorReporter::with_console(self.reporter_options(), (self.console)())
    }

    // Reporters never loaded: only the placeholder can say what went wrong.
    fn report_setup_failure(&mut self, failure: &Failure) {
        let now = Instant::now();
        for reporter in self.reporters.iter_mut().filter(|r| r.name() == "error") {
            let started = reporter.handle_event(ToolEvent::Start, now);
            let stopped = reporter.handle_event(ToolEvent::Stop(Some(failure.clone())), now);
            if let Err(error) = started.and(stopped) {
                tracing::warn!(%error, "failed to report setup failure");
            }
        }
    }
}

pub(crate) type RenderHandle = JoinHandle<Box<dyn Reporter>>;

/// Bootstraps every reporter and starts its render loop through `spawn`.
///
/// If a loop fails to start, the loops already running are stopped with
/// that failure and joined before it is returned, so none of them reports
/// the run as done.
pub(crate) fn launch<S>(
    reporters: Vec<Box<dyn Reporter>>, emitter: &Emitter, prefix: &str, mut spawn: S,
) -> Result<Vec<RenderHandle>, Failure>
where
    S: FnMut(String, RenderLoop) -> std::io::Result<RenderHandle>,
{
    let mut handles = Vec::with_capacity(reporters.len());
    for mut reporter in reporters {
        let name = format!("{prefix}-{}", reporter.name());
        let subscription = reporter.bootstrap(emitter);
        match spawn(name, RenderLoop::new(reporter, subscription)) {
            Ok(handle) => handles.push(handle),
            Err(error) => {
                let failure = Failure::from(error);
                tracing::warn!(%failure, "render loop failed to start");
                emitter.emit(ToolEvent::Stop(Some(failure.clone())));
                join(handles);
                return Err(failure);
            }
        }
    }
    Ok(handles)
}

fn join(handles: Vec<RenderHandle>) {
    for handle in handles {
        if handle.join().is_err() {
            tracing::error!("render thread panicked");
        }
    }
}
