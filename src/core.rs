use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;

/// The keyed results of a run, task name to output.
pub type Outputs<T> = HashMap<String, T>;

/// Settled results of a task's declared dependencies, keyed by task name.
pub type Deps<T> = HashMap<String, T>;

/// Type-erased work function stored in the registry.
pub(crate) type Work<T, A> =
    Arc<dyn Fn(TaskContext<A>, Deps<T>) -> BoxFuture<'static, anyhow::Result<T>> + Send + Sync>;

/// What happens to the other tasks of a run once one of them fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnFailure {
    /// Let unrelated tasks that are already running finish, and discard
    /// their outputs.
    #[default]
    Detach,
    /// Abort every task of the run that is still running.
    Abort,
}

/// Bus-wide configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Name of the bus, reported in diagnostics and errors.
    pub name: Cow<'static, str>,
    /// Failure policy applied to every run of the bus.
    pub on_failure: OnFailure,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            name: Cow::Borrowed("taskbus"),
            on_failure: OnFailure::default(),
        }
    }
}

/// Context handed to every work function.
///
/// Carries the extra arguments of the run, shared by every task of that run,
/// together with the names of the event and of the task being executed.
///
/// # Type Parameters
///
/// * `A`: The type of the run arguments. Use a tuple to pass several values.
pub struct TaskContext<A> {
    pub(crate) args: Arc<A>,
    pub(crate) event: Arc<str>,
    pub(crate) task: Arc<str>,
}

impl<A> TaskContext<A> {
    /// The arguments the run was started with.
    pub fn args(&self) -> &A {
        &self.args
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn task(&self) -> &str {
        &self.task
    }
}

impl<A> Clone for TaskContext<A> {
    fn clone(&self) -> Self {
        Self {
            args: self.args.clone(),
            event: self.event.clone(),
            task: self.task.clone(),
        }
    }
}

impl<A> std::fmt::Debug for TaskContext<A>
where
    A: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskContext")
            .field("args", &self.args)
            .field("event", &self.event)
            .field("task", &self.task)
            .finish()
    }
}
