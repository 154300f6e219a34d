use std::collections::{BTreeSet, VecDeque};

use crate::error::BusError;
use crate::registry::Namespace;

/// Narrows a namespace down to the tasks a run actually needs.
///
/// With no requested names the whole namespace is selected. Otherwise the
/// selection is the requested tasks plus the transitive closure of their
/// dependencies, so dependencies of unrequested tasks never run.
///
/// Every dependency reachable from the selection has to exist in the
/// namespace, otherwise the run fails with [`BusError::UnknownTask`] before
/// any work is started.
pub(crate) fn select_subset<T, A>(
    event: &str,
    namespace: &Namespace<T, A>,
    requested: &[&str],
) -> Result<Namespace<T, A>, BusError> {
    if requested.is_empty() {
        for task in namespace.values() {
            if let Some(missing) = task
                .dependencies()
                .iter()
                .find(|dep| !namespace.contains_key(dep.as_str()))
            {
                return Err(BusError::UnknownTask {
                    event: event.to_string(),
                    task: missing.clone(),
                    required_by: Some(task.name().to_string()),
                });
            }
        }

        return Ok(namespace.clone());
    }

    let mut selected = BTreeSet::new();
    let mut queue: VecDeque<(&str, Option<&str>)> =
        requested.iter().map(|&name| (name, None)).collect();

    while let Some((name, required_by)) = queue.pop_front() {
        if selected.contains(name) {
            continue;
        }

        let Some(task) = namespace.get(name) else {
            return Err(BusError::UnknownTask {
                event: event.to_string(),
                task: name.to_string(),
                required_by: required_by.map(str::to_string),
            });
        };

        selected.insert(name);
        for dep in task.distinct_dependencies() {
            queue.push_back((dep, Some(task.name())));
        }
    }

    Ok(namespace
        .iter()
        .filter(|(name, _)| selected.contains(name.as_str()))
        .map(|(name, task)| (name.clone(), task.clone()))
        .collect())
}
