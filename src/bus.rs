use std::borrow::Cow;
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::Instrument;

use crate::core::{Deps, OnFailure, Outputs, Settings, TaskContext};
use crate::engine::{Plan, aggregate, runner};
use crate::error::BusError;
use crate::registry::{Namespace, Registry};
use crate::resolver;
use crate::task::{TaskDef, TaskDescriptor};

/// A collection of named task graphs, one per event.
///
/// Tasks are registered under an event together with the names of the tasks
/// they depend on. Running an event executes its tasks concurrently, each one
/// as soon as its dependencies have produced their outputs, and resolves to
/// the outputs of every task keyed by name.
///
/// # Type Parameters
///
/// * `T`: The output type shared by every task of the bus.
/// * `A`: The extra arguments passed to every task of a run. Defaults to `()`.
///
/// # Example
///
/// ```rust
/// use taskbus::TaskBus;
///
/// # async fn example() -> Result<(), taskbus::BusError> {
/// let mut bus: TaskBus<i32> = TaskBus::new();
///
/// bus.register("event", "w1", &[], |_, _| async { Ok(1) })?
///     .register("event", "w2", &["w1"], |_, deps| async move { Ok(deps["w1"] + 1) })?;
///
/// let outputs = bus.run("event", ())?.await?;
/// assert_eq!(outputs["w2"], 2);
/// # Ok(())
/// # }
/// ```
pub struct TaskBus<T, A = ()> {
    settings: Settings,
    registry: Registry<T, A>,
}

impl<T, A> TaskBus<T, A>
where
    T: Clone + Send + Sync + 'static,
    A: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self::with_settings(Settings {
            name: name.into(),
            ..Settings::default()
        })
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings,
            registry: Registry::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Starts the definition of a task in `event`.
    ///
    /// Unlike [`TaskBus::register`], the name is optional here and defaults
    /// to the name of the work function.
    pub fn task(&mut self, event: &str) -> TaskDef<'_, T, A> {
        TaskDef::new(self, event)
    }

    /// Registers an asynchronous task under an explicit name, replacing any
    /// task of `event` with the same name.
    pub fn register<F, Fut>(
        &mut self,
        event: &str,
        name: &str,
        dependencies: &[&str],
        work: F,
    ) -> Result<&mut Self, BusError>
    where
        F: Fn(TaskContext<A>, Deps<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        self.task(event)
            .name(name)
            .depends_on(dependencies)
            .run(work)
    }

    pub(crate) fn insert(&mut self, event: &str, descriptor: TaskDescriptor<T, A>) {
        tracing::debug!(
            bus = %self.name(),
            event,
            task = descriptor.name(),
            dependencies = ?descriptor.dependencies(),
            "registered task"
        );
        self.registry.insert(event, descriptor);
    }

    /// Removes a task. Unknown events and names are ignored.
    pub fn unregister(&mut self, event: &str, name: &str) -> &mut Self {
        if self.registry.remove(event, name) {
            tracing::debug!(bus = %self.name(), event, task = name, "unregistered task");
        }
        self
    }

    /// A snapshot of the tasks registered under `event`, empty if the event
    /// is unknown. Later registrations and runs never change it.
    pub fn list(&self, event: &str) -> Namespace<T, A> {
        self.registry.snapshot(event)
    }

    /// Names of every event with at least one task, sorted.
    pub fn events(&self) -> Vec<String> {
        self.registry.events()
    }

    /// Renders the dependency graph of `event` as a Mermaid flowchart.
    pub fn render_mermaid(&self, event: &str) -> String {
        crate::render::render_mermaid(event, &self.registry.snapshot(event))
    }

    /// Runs every task of `event`.
    ///
    /// Cycles and missing dependencies are reported right away as the outer
    /// error, before any task executes. The returned [`Run`] resolves to the
    /// output of every task, or to the first task failure.
    pub fn run(&self, event: &str, args: A) -> Result<Run<Outputs<T>>, BusError> {
        self.launch(event, &[], args)
    }

    /// Runs the named tasks of `event` together with everything they depend
    /// on, and nothing else. Only the outputs of the named tasks are
    /// returned. An empty list of names runs the whole event.
    pub fn run_subset(
        &self,
        event: &str,
        names: &[&str],
        args: A,
    ) -> Result<Run<Outputs<T>>, BusError> {
        self.launch(event, names, args)
    }

    /// Runs a single task of `event` with its dependencies and resolves to
    /// its output alone.
    pub fn run_one(&self, event: &str, name: &str, args: A) -> Result<Run<T>, BusError> {
        let run = self.launch(event, &[name], args)?;

        let event = event.to_string();
        let name = name.to_string();

        Ok(Run::new(async move {
            let mut outputs = run.await?;
            outputs.remove(&name).ok_or_else(|| BusError::UnknownTask {
                event,
                task: name,
                required_by: None,
            })
        }))
    }

    fn launch(&self, event: &str, requested: &[&str], args: A) -> Result<Run<Outputs<T>>, BusError> {
        // The snapshot is the only registry read a run ever performs.
        let namespace = self.registry.snapshot(event);
        let subset = resolver::select_subset(event, &namespace, requested)?;
        let plan = Plan::build(self.name(), event, subset)?;

        let picked: Option<HashSet<String>> = (!requested.is_empty())
            .then(|| requested.iter().map(|name| name.to_string()).collect());

        let on_failure = self.settings.on_failure;
        let span = tracing::info_span!("run", bus = %self.name(), event, tasks = plan.len());
        let event: Arc<str> = Arc::from(event);

        let future = async move {
            let start = Instant::now();
            let mut wiring = runner::wire(plan, event, Arc::new(args));

            let handles = std::mem::take(&mut wiring.handles)
                .into_iter()
                .filter(|(name, _)| match &picked {
                    Some(picked) => picked.contains(&**name),
                    None => true,
                })
                .collect();

            match aggregate::collect(handles).await {
                Ok(outputs) => {
                    tracing::info!(elapsed = ?start.elapsed(), "run complete");
                    Ok(outputs)
                }
                Err(failure) => {
                    if on_failure == OnFailure::Abort {
                        wiring.abort_all();
                    }
                    tracing::warn!(task = failure.task(), "run failed: {:#}", failure.error());
                    Err(BusError::from(failure))
                }
            }
        };

        Ok(Run::new(future.instrument(span)))
    }
}

impl<T, A> Default for TaskBus<T, A>
where
    T: Clone + Send + Sync + 'static,
    A: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// A planned run of an event.
///
/// The graph was already validated when the run was created. Tasks are
/// spawned on the tokio runtime the first time the run is polled, so it has
/// to be awaited from within one.
#[must_use = "a run does nothing unless awaited"]
pub struct Run<O> {
    inner: BoxFuture<'static, Result<O, BusError>>,
}

impl<O> Run<O> {
    fn new(future: impl Future<Output = Result<O, BusError>> + Send + 'static) -> Self {
        Self {
            inner: future.boxed(),
        }
    }
}

impl<O> Future for Run<O> {
    type Output = Result<O, BusError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.poll_unpin(cx)
    }
}

impl<O> std::fmt::Debug for Run<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Run").finish_non_exhaustive()
    }
}
