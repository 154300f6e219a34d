//! Task descriptors and the builder used to register them.
use std::any::type_name;
use std::future::{Future, ready};
use std::sync::Arc;

use futures::FutureExt;

use crate::core::{Deps, TaskContext, Work};
use crate::error::BusError;
use crate::TaskBus;

/// A registered unit of work: its name, the names of the tasks it depends
/// on, and the work function itself.
///
/// Descriptors are immutable once registered. Registering another task under
/// the same name replaces the whole descriptor.
pub struct TaskDescriptor<T, A = ()> {
    pub(crate) name: String,
    pub(crate) dependencies: Vec<String>,
    pub(crate) work: Work<T, A>,
}

impl<T, A> TaskDescriptor<T, A> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dependency names, in the order they were declared.
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Dependency names with duplicates removed, keeping declaration order.
    pub(crate) fn distinct_dependencies(&self) -> impl Iterator<Item = &str> {
        self.dependencies
            .iter()
            .enumerate()
            .filter(|(i, dep)| !self.dependencies[..*i].contains(dep))
            .map(|(_, dep)| dep.as_str())
    }
}

impl<T, A> Clone for TaskDescriptor<T, A> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            dependencies: self.dependencies.clone(),
            work: self.work.clone(),
        }
    }
}

// Work functions compare by identity.
impl<T, A> PartialEq for TaskDescriptor<T, A> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.dependencies == other.dependencies
            && Arc::ptr_eq(&self.work, &other.work)
    }
}

impl<T, A> std::fmt::Debug for TaskDescriptor<T, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskDescriptor")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("work", &Arc::as_ptr(&self.work))
            .finish()
    }
}

/// The intrinsic name of a function: the last segment of its type path,
/// with generic parameters stripped.
///
/// Closures have no name of their own, so they resolve to an empty string.
pub(crate) fn intrinsic_name<F>() -> String {
    let path = type_name::<F>();

    // closures and fn pointers carry no name of their own
    if path.contains("{{closure}}") || path.contains('(') {
        return String::new();
    }

    let mut depth = 0usize;
    let plain: String = path
        .chars()
        .filter(|&c| match c {
            '<' => {
                depth += 1;
                false
            }
            '>' => {
                depth = depth.saturating_sub(1);
                false
            }
            _ => depth == 0,
        })
        .collect();

    plain.rsplit("::").next().unwrap_or_default().to_string()
}

/// Builder returned by [`TaskBus::task`].
///
/// The name is optional: if it is never set, the task is named after the
/// work function itself, so plain `fn` items can be registered without
/// repeating their name.
pub struct TaskDef<'a, T, A> {
    bus: &'a mut TaskBus<T, A>,
    event: String,
    name: Option<String>,
    dependencies: Vec<String>,
}

impl<'a, T, A> TaskDef<'a, T, A>
where
    T: Clone + Send + Sync + 'static,
    A: Send + Sync + 'static,
{
    pub(crate) fn new(bus: &'a mut TaskBus<T, A>, event: &str) -> Self {
        Self {
            bus,
            event: event.to_string(),
            name: None,
            dependencies: Vec::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn depends_on(mut self, dependencies: &[&str]) -> Self {
        self.dependencies
            .extend(dependencies.iter().map(|dep| dep.to_string()));
        self
    }

    /// Registers an asynchronous work function.
    pub fn run<F, Fut>(self, work: F) -> Result<&'a mut TaskBus<T, A>, BusError>
    where
        F: Fn(TaskContext<A>, Deps<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let name = self.name.clone().unwrap_or_else(intrinsic_name::<F>);
        let work: Work<T, A> = Arc::new(move |ctx: TaskContext<A>, deps: Deps<T>| {
            work(ctx, deps).boxed()
        });
        self.finish(name, work)
    }

    /// Registers a synchronous work function.
    pub fn compute<F>(self, work: F) -> Result<&'a mut TaskBus<T, A>, BusError>
    where
        F: Fn(TaskContext<A>, Deps<T>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let name = self.name.clone().unwrap_or_else(intrinsic_name::<F>);
        let work: Work<T, A> = Arc::new(move |ctx: TaskContext<A>, deps: Deps<T>| {
            ready(work(ctx, deps)).boxed()
        });
        self.finish(name, work)
    }

    fn finish(self, name: String, work: Work<T, A>) -> Result<&'a mut TaskBus<T, A>, BusError> {
        if name.trim().is_empty() {
            return Err(BusError::InvalidName { event: self.event });
        }

        let descriptor = TaskDescriptor {
            name,
            dependencies: self.dependencies,
            work,
        };

        self.bus.insert(&self.event, descriptor);
        Ok(self.bus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetch_user() {}

    fn generic_task<X>() {}

    #[test]
    fn test_intrinsic_name_of_fn_item() {
        assert_eq!(name_of(fetch_user), "fetch_user");
        assert_eq!(name_of(generic_task::<u8>), "generic_task");
    }

    #[test]
    fn test_intrinsic_name_of_closure() {
        assert_eq!(name_of(|| {}), "");
    }

    #[test]
    fn test_intrinsic_name_of_fn_pointer() {
        let pointer: fn(TaskContext<()>, Deps<i32>) -> anyhow::Result<i32> = |_, _| Ok(1);
        assert_eq!(name_of(pointer), "");
        assert_eq!(name_of(fetch_user as fn()), "");
    }

    #[test]
    fn test_distinct_dependencies() {
        let descriptor = TaskDescriptor::<i32> {
            name: "w4".into(),
            dependencies: vec!["w2".into(), "w3".into(), "w2".into()],
            work: Arc::new(|_: TaskContext<()>, _: Deps<i32>| {
                ready(Ok::<_, anyhow::Error>(4)).boxed()
            }),
        };

        let deps: Vec<_> = descriptor.distinct_dependencies().collect();
        assert_eq!(deps, ["w2", "w3"]);
    }

    fn name_of<F>(_: F) -> String {
        intrinsic_name::<F>()
    }
}
