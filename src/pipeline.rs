use crate::emitter::Emitter;
use crate::error::Failure;
use crate::task::{Task, TaskId, now_millis};
use crate::ToolEvent;

/// One step of a [`Pipeline`].
///
/// ```rust,ignore
/// struct Compile;
///
/// impl Routine for Compile {
///     fn title(&self) -> String {
///         "compile".into()
///     }
///
///     fn execute(&mut self, ctx: &Context) -> Result<(), Failure> {
///         ctx.task("parse", |_| Ok(()))?;
///         ctx.task("codegen", |_| Ok(()))
///     }
/// }
/// ```
pub trait Routine: Send {
    fn title(&self) -> String;

    /// Routines returning `true` are reported as skipped and never run.
    #[allow(unused_variables)]
    fn skip(&self, ctx: &Context) -> bool {
        false
    }

    fn execute(&mut self, ctx: &Context) -> Result<(), Failure>;
}

/// A job for [`Context::parallel`].
pub type Job<'a> = Box<dyn FnOnce(&Context) -> Result<(), Failure> + Send + 'a>;

/// Boxes a closure as a [`Job`].
pub fn job<'a, F>(f: F) -> Job<'a>
where
    F: FnOnce(&Context) -> Result<(), Failure> + Send + 'a,
{
    Box::new(f)
}

/// A routine made from a title and a closure. See [`routine`].
pub struct FnRoutine<F> {
    title: String,
    run: F,
}

impl<F> Routine for FnRoutine<F>
where
    F: FnMut(&Context) -> Result<(), Failure> + Send,
{
    fn title(&self) -> String {
        self.title.clone()
    }

    fn execute(&mut self, ctx: &Context) -> Result<(), Failure> {
        (self.run)(ctx)
    }
}

/// Wraps a closure as a [`Routine`].
pub fn routine<F>(title: impl Into<String>, run: F) -> FnRoutine<F>
where
    F: FnMut(&Context) -> Result<(), Failure> + Send,
{
    FnRoutine {
        title: title.into(),
        run,
    }
}

/// Routines run one after another.
///
/// Every routine is announced as a pending task before the first one starts.
/// The first failure stops the pipeline; the routines after it are reported
/// as skipped and the failure is returned.
#[derive(Default)]
pub struct Pipeline {
    title: String,
    routines: Vec<Box<dyn Routine>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// A pipeline that can itself be piped into another as one routine.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            routines: Vec::new(),
        }
    }

    pub fn pipe(mut self, routine: impl Routine + 'static) -> Self {
        self.routines.push(Box::new(routine));
        self
    }

    pub fn len(&self) -> usize {
        self.routines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routines.is_empty()
    }

    pub fn run(&mut self, ctx: &Context) -> Result<(), Failure> {
        let tasks: Vec<Task> = self
            .routines
            .iter()
            .map(|routine| ctx.new_task(routine.title()))
            .collect();
        for task in &tasks {
            ctx.announce(task);
        }

        let mut failure = None;
        for (routine, mut task) in self.routines.iter_mut().zip(tasks) {
            if failure.is_some() || routine.skip(ctx) {
                task.skip()?;
                ctx.announce(&task);
                continue;
            }
            if let Err(error) = ctx.run_task(task, |child| routine.execute(child)) {
                failure = Some(error);
            }
        }
        failure.map_or(Ok(()), Err)
    }
}

impl Routine for Pipeline {
    fn title(&self) -> String {
        self.title.clone()
    }

    fn execute(&mut self, ctx: &Context) -> Result<(), Failure> {
        self.run(ctx)
    }
}

/// Handed to routines: creates tasks and reports through the tool's emitter.
#[derive(Debug, Clone)]
pub struct Context {
    emitter: Emitter,
    depth: usize,
    parent: Option<TaskId>,
}

impl Context {
    pub fn new(emitter: Emitter) -> Self {
        Self {
            emitter,
            depth: 0,
            parent: None,
        }
    }

    /// Nesting depth of tasks created through this context.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    /// A message shown after a successful run.
    pub fn log(&self, message: impl Into<String>) {
        self.emitter.emit(ToolEvent::Log(message.into()));
    }

    /// A message shown after the run whatever its outcome.
    pub fn log_error(&self, message: impl Into<String>) {
        self.emitter.emit(ToolEvent::LogError(message.into()));
    }

    /// Raw text printed above the live frame.
    pub fn write(&self, text: impl Into<String>) {
        self.emitter.emit(ToolEvent::Output(text.into()));
    }

    /// Runs `f` as a task nested under this context.
    pub fn task<F>(&self, title: impl Into<String>, f: F) -> Result<(), Failure>
    where
        F: FnOnce(&Context) -> Result<(), Failure>,
    {
        let task = self.new_task(title);
        self.run_task(task, f)
    }

    /// Reports a task that was not run.
    pub fn skip_task(&self, title: impl Into<String>) -> Result<(), Failure> {
        let mut task = self.new_task(title);
        task.skip()?;
        self.announce(&task);
        Ok(())
    }

    /// Runs every job as a sibling task on its own thread and waits for all
    /// of them. Returns the first failure in job order.
    ///
    /// ```rust,ignore
    /// ctx.parallel([
    ///     ("unit", job(|_| Ok(()))),
    ///     ("e2e", job(|ctx| ctx.task("browser", |_| Ok(())))),
    /// ])?;
    /// ```
    pub fn parallel<'a, T>(&self, jobs: impl IntoIterator<Item = (T, Job<'a>)>) -> Result<(), Failure>
    where
        T: Into<String>,
    {
        let jobs: Vec<(Task, Job<'a>)> = jobs
            .into_iter()
            .map(|(title, f)| (self.new_task(title), f))
            .collect();
        for (task, _) in &jobs {
            self.announce(task);
        }

        let results: Vec<Result<(), Failure>> = std::thread::scope(|scope| {
            let handles: Vec<_> = jobs
                .into_iter()
                .map(|(task, f)| {
                    let ctx = self.clone();
                    scope.spawn(move || ctx.run_task(task, f))
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|_| Err(Failure::new("parallel task panicked")))
                })
                .collect()
        });

        results.into_iter().collect()
    }

    pub(crate) fn run_task<F>(&self, mut task: Task, f: F) -> Result<(), Failure>
    where
        F: FnOnce(&Context) -> Result<(), Failure>,
    {
        task.start(now_millis())?;
        self.announce(&task);

        let child = Context {
            emitter: self.emitter.clone(),
            depth: self.depth + 1,
            parent: Some(task.id()),
        };
        let result = f(&child);

        match &result {
            Ok(()) => task.pass(now_millis())?,
            Err(_) => task.fail(now_millis())?,
        }
        self.announce(&task);
        result
    }

    fn new_task(&self, title: impl Into<String>) -> Task {
        Task::new(title).with_parent(self.parent)
    }

    fn announce(&self, task: &Task) {
        self.emitter.emit(ToolEvent::Task {
            task: task.clone(),
            depth: self.depth,
        });
    }
}
