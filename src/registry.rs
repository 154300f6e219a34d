use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::task::TaskDescriptor;

/// Every task of one event, keyed by task name.
pub type Namespace<T, A = ()> = BTreeMap<String, Arc<TaskDescriptor<T, A>>>;

/// Per-event task bookkeeping. Holds no concurrency of its own; runs read a
/// snapshot of a namespace and never touch the registry afterwards.
pub(crate) struct Registry<T, A> {
    events: HashMap<String, Namespace<T, A>>,
}

impl<T, A> Registry<T, A> {
    pub(crate) fn new() -> Self {
        Self {
            events: HashMap::new(),
        }
    }

    /// Stores the descriptor, replacing any task with the same name.
    pub(crate) fn insert(&mut self, event: &str, descriptor: TaskDescriptor<T, A>) {
        self.events
            .entry(event.to_string())
            .or_default()
            .insert(descriptor.name.clone(), Arc::new(descriptor));
    }

    pub(crate) fn remove(&mut self, event: &str, name: &str) -> bool {
        let Some(namespace) = self.events.get_mut(event) else {
            return false;
        };

        let removed = namespace.remove(name).is_some();
        if namespace.is_empty() {
            self.events.remove(event);
        }

        removed
    }

    /// A snapshot of the event's tasks. Descriptors are shared, the map is not.
    pub(crate) fn snapshot(&self, event: &str) -> Namespace<T, A> {
        self.events.get(event).cloned().unwrap_or_default()
    }

    pub(crate) fn events(&self) -> Vec<String> {
        let mut events: Vec<_> = self.events.keys().cloned().collect();
        events.sort();
        events
    }
}

#[cfg(test)]
mod tests {
    use futures::FutureExt;

    use super::*;
    use crate::core::{Deps, TaskContext};

    fn descriptor(name: &str, dependencies: &[&str]) -> TaskDescriptor<i32> {
        TaskDescriptor {
            name: name.into(),
            dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
            work: Arc::new(|_: TaskContext<()>, _: Deps<i32>| {
                std::future::ready(Ok::<_, anyhow::Error>(0)).boxed()
            }),
        }
    }

    #[test]
    fn test_last_registration_wins() {
        let mut registry = Registry::new();
        registry.insert("event", descriptor("w1", &[]));
        registry.insert("event", descriptor("w1", &["w0"]));

        let namespace = registry.snapshot("event");
        assert_eq!(namespace.len(), 1);
        assert_eq!(namespace["w1"].dependencies(), ["w0"]);
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut registry = Registry::<i32, ()>::new();
        assert!(!registry.remove("nowhere", "w1"));

        registry.insert("event", descriptor("w1", &[]));
        assert!(!registry.remove("event", "w2"));
        assert!(registry.remove("event", "w1"));
        assert!(registry.events().is_empty());
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut registry = Registry::new();
        registry.insert("event", descriptor("w1", &[]));

        let snapshot = registry.snapshot("event");
        registry.insert("event", descriptor("w2", &[]));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.snapshot("event").len(), 2);
        assert!(registry.snapshot("unknown").is_empty());
    }

    #[test]
    fn test_events_sorted() {
        let mut registry = Registry::new();
        registry.insert("b", descriptor("w1", &[]));
        registry.insert("a", descriptor("w1", &[]));

        assert_eq!(registry.events(), ["a", "b"]);
    }
}
