use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared, try_join_all};
use petgraph::graph::NodeIndex;
use tokio::task::{AbortHandle, JoinError};
use tracing::{Instrument, Level};

use crate::core::{Deps, TaskContext};
use crate::engine::plan::Plan;
use crate::error::TaskFailure;

/// The late-bound result of one task. Cloned by every dependent and by the
/// aggregator, all of which observe the same outcome.
pub(crate) type Handle<T> = Shared<BoxFuture<'static, Result<T, TaskFailure>>>;

/// Every task of a run, wired and spawned.
pub(crate) struct Wiring<T> {
    pub(crate) handles: Vec<(Arc<str>, Handle<T>)>,
    pub(crate) aborts: Vec<AbortHandle>,
}

impl<T> Wiring<T> {
    /// Aborts every task of the run still in flight.
    pub(crate) fn abort_all(&self) {
        for abort in &self.aborts {
            abort.abort();
        }
    }
}

/// Wires the planned tasks together and spawns them.
///
/// Tasks are visited in plan order, so the handles of a task's dependencies
/// always exist by the time the task itself is reached. A task's handle is
/// recorded as soon as it is spawned, long before it settles, which lets its
/// dependents chain onto it right away: dependency chains run as a pipeline
/// instead of waiting on each other level by level.
///
/// Must be called from within a tokio runtime.
pub(crate) fn wire<T, A>(plan: Plan<T, A>, event: Arc<str>, args: Arc<A>) -> Wiring<T>
where
    T: Clone + Send + Sync + 'static,
    A: Send + Sync + 'static,
{
    let mut results: HashMap<NodeIndex, Handle<T>> = HashMap::with_capacity(plan.len());
    let mut handles = Vec::with_capacity(plan.len());
    let mut aborts = Vec::with_capacity(plan.len());

    for &index in &plan.order {
        let task = plan.graph[index].clone();
        let name: Arc<str> = Arc::from(task.name.as_str());

        // plan order guarantees every dependency was wired before
        let dependencies: Vec<(String, Handle<T>)> = plan
            .dependencies(index)
            .map(|dep| (plan.graph[dep].name.clone(), results[&dep].clone()))
            .collect();

        let context = TaskContext {
            args: args.clone(),
            event: event.clone(),
            task: name.clone(),
        };

        let span = tracing::span!(Level::DEBUG, "task", name = %name);
        let failed_name = name.clone();

        let continuation = async move {
            // fan-in over exactly this task's own dependencies
            let values = try_join_all(
                dependencies
                    .into_iter()
                    .map(|(dep, handle)| handle.map(move |value| value.map(|value| (dep, value)))),
            )
            .await?;

            let deps: Deps<T> = values.into_iter().collect();

            let start = Instant::now();
            let output = (task.work)(context, deps).await;
            let elapsed = start.elapsed();

            match output {
                Ok(value) => {
                    tracing::debug!(?elapsed, "task finished");
                    Ok(value)
                }
                Err(error) => {
                    tracing::warn!(?elapsed, "task failed: {error:#}");
                    Err(TaskFailure::new(task.name.as_str(), error))
                }
            }
        };

        let joined = tokio::spawn(continuation.instrument(span));
        aborts.push(joined.abort_handle());

        let handle = joined
            .map(move |joined| match joined {
                Ok(result) => result,
                Err(error) => Err(join_failure(&failed_name, error)),
            })
            .boxed()
            .shared();

        results.insert(index, handle.clone());
        handles.push((name, handle));
    }

    Wiring { handles, aborts }
}

fn join_failure(task: &Arc<str>, error: JoinError) -> TaskFailure {
    if !error.is_panic() {
        return TaskFailure::new(task.clone(), anyhow::anyhow!("Task was cancelled"));
    }

    let panic = error.into_panic();
    let msg = if let Some(s) = panic.downcast_ref::<&str>() {
        format!("Task panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("Task panicked: {s}")
    } else {
        String::from("Task panicked with unknown payload")
    };

    TaskFailure::new(task.clone(), anyhow::anyhow!(msg))
}
