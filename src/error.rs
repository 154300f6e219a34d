use std::sync::Arc;

pub use anyhow::Error as RuntimeError;
use thiserror::Error;

/// A failure raised by the work function of a single task.
///
/// The userland error is kept behind an [`Arc`] so the same failure can be
/// observed by every dependent and by the aggregator at once.
#[derive(Debug, Error, Clone)]
#[error("Task '{task}' failed: {error}")]
pub struct TaskFailure {
    pub(crate) task: Arc<str>,
    pub(crate) error: Arc<anyhow::Error>,
}

impl TaskFailure {
    pub(crate) fn new(task: impl Into<Arc<str>>, error: impl Into<anyhow::Error>) -> Self {
        Self {
            task: task.into(),
            error: Arc::new(error.into()),
        }
    }

    /// Name of the task whose work failed.
    pub fn task(&self) -> &str {
        &self.task
    }

    /// The error returned by the work function, unchanged.
    pub fn error(&self) -> &anyhow::Error {
        &self.error
    }

    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
    {
        self.error.downcast_ref::<E>()
    }
}

#[derive(Debug, Error, Clone)]
pub enum BusError {
    #[error("Empty name not allowed (event '{event}')")]
    InvalidName { event: String },

    #[error("{}", unknown_task(.event, .task, .required_by))]
    UnknownTask {
        event: String,
        task: String,
        required_by: Option<String>,
    },

    #[error(
        "Unsatisfiable dependency graph found for event '{event}' on bus '{bus}' (unresolved tasks: {})",
        .unresolved.join(", ")
    )]
    UnsatisfiableGraph {
        bus: String,
        event: String,
        unresolved: Vec<String>,
    },

    #[error(transparent)]
    Task(#[from] TaskFailure),
}

fn unknown_task(event: &str, task: &str, required_by: &Option<String>) -> String {
    match required_by {
        Some(parent) => format!("Task '{task}' required by '{parent}' not found in event '{event}'"),
        None => format!("Task '{task}' not found in event '{event}'"),
    }
}

impl BusError {
    /// Returns the task failure if this error was raised by a work function.
    pub fn as_task_failure(&self) -> Option<&TaskFailure> {
        match self {
            BusError::Task(failure) => Some(failure),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("disk on fire")]
    struct DiskOnFire;

    #[test]
    fn test_task_failure_keeps_cause() {
        let failure = TaskFailure::new("w1", DiskOnFire);
        assert_eq!(failure.task(), "w1");
        assert!(failure.downcast_ref::<DiskOnFire>().is_some());
        assert_eq!(failure.to_string(), "Task 'w1' failed: disk on fire");

        let err = BusError::from(failure.clone());
        assert!(err.as_task_failure().is_some());
        assert_eq!(err.to_string(), failure.to_string());
    }

    #[test]
    fn test_unsatisfiable_message() {
        let err = BusError::UnsatisfiableGraph {
            bus: "taskbus".into(),
            event: "event".into(),
            unresolved: vec!["w3".into(), "w4".into()],
        };
        assert_eq!(
            err.to_string(),
            "Unsatisfiable dependency graph found for event 'event' on bus 'taskbus' (unresolved tasks: w3, w4)"
        );
    }

    #[test]
    fn test_unknown_task_message() {
        let err = BusError::UnknownTask {
            event: "event".into(),
            task: "w9".into(),
            required_by: Some("w2".into()),
        };
        assert_eq!(
            err.to_string(),
            "Task 'w9' required by 'w2' not found in event 'event'"
        );
    }
}
