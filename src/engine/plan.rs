use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use petgraph::Direction;
use petgraph::Graph;
use petgraph::graph::NodeIndex;

use crate::error::BusError;
use crate::registry::Namespace;
use crate::task::TaskDescriptor;

/// The wiring order for one run.
///
/// The graph holds one node per selected task and an edge from every
/// dependency to its dependent. `order` lists every node such that each task
/// comes after all of its dependencies, which is the order in which result
/// handles get wired together.
pub(crate) struct Plan<T, A> {
    pub(crate) graph: Graph<Arc<TaskDescriptor<T, A>>, ()>,
    pub(crate) order: Vec<NodeIndex>,
}

impl<T, A> Plan<T, A> {
    /// Builds the wiring order with a readiness queue.
    ///
    /// Each task waits on the number of distinct dependency names it
    /// declares, including names missing from the subset, which can never
    /// be satisfied. Tasks reaching zero are queued, and wiring a task
    /// releases its dependents. If the queue drains while tasks are left,
    /// no further progress is possible: the subset has a cycle or a
    /// dangling dependency and the run is rejected before any work starts.
    pub(crate) fn build(bus: &str, event: &str, subset: Namespace<T, A>) -> Result<Self, BusError> {
        let mut graph = Graph::with_capacity(subset.len(), subset.len());

        let indices: HashMap<String, NodeIndex> = subset
            .into_iter()
            .map(|(name, task)| (name, graph.add_node(task)))
            .collect();

        let mut pending = HashMap::with_capacity(indices.len());
        for &index in indices.values() {
            let task = graph[index].clone();
            let mut count = 0usize;

            for dep in task.distinct_dependencies() {
                count += 1;
                if let Some(&dep_index) = indices.get(dep) {
                    graph.add_edge(dep_index, index, ());
                }
            }

            pending.insert(index, count);
        }

        let mut ready: VecDeque<NodeIndex> = graph
            .node_indices()
            .filter(|index| pending[index] == 0)
            .collect();

        let mut order = Vec::with_capacity(graph.node_count());
        while let Some(index) = ready.pop_front() {
            order.push(index);

            for dependent in graph.neighbors_directed(index, Direction::Outgoing) {
                if let Some(count) = pending.get_mut(&dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push_back(dependent);
                    }
                }
            }
        }

        if order.len() < graph.node_count() {
            let mut unresolved: Vec<String> = graph
                .node_indices()
                .filter(|index| pending[index] > 0)
                .map(|index| graph[index].name.clone())
                .collect();
            unresolved.sort();

            return Err(BusError::UnsatisfiableGraph {
                bus: bus.to_string(),
                event: event.to_string(),
                unresolved,
            });
        }

        Ok(Self { graph, order })
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    /// The dependencies of a task, as graph nodes.
    pub(crate) fn dependencies(&self, index: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors_directed(index, Direction::Incoming)
    }
}

#[cfg(test)]
mod tests {
    use futures::FutureExt;

    use super::*;
    use crate::core::{Deps, TaskContext};

    fn namespace(tasks: &[(&str, &[&str])]) -> Namespace<i32> {
        tasks
            .iter()
            .map(|(name, deps)| {
                let descriptor = TaskDescriptor {
                    name: name.to_string(),
                    dependencies: deps.iter().map(|d| d.to_string()).collect(),
                    work: Arc::new(|_: TaskContext<()>, _: Deps<i32>| {
                        std::future::ready(Ok::<_, anyhow::Error>(0)).boxed()
                    }),
                };
                (name.to_string(), Arc::new(descriptor))
            })
            .collect()
    }

    fn position<T, A>(plan: &Plan<T, A>, name: &str) -> usize {
        plan.order
            .iter()
            .position(|&index| plan.graph[index].name == name)
            .unwrap()
    }

    #[test]
    fn test_dependencies_come_first() {
        let plan = Plan::build(
            "bus",
            "event",
            namespace(&[
                ("w1", &[]),
                ("w2", &["w1"]),
                ("w3", &["w1"]),
                ("w4", &["w2", "w3"]),
                ("w5", &["w3"]),
            ]),
        )
        .unwrap();

        assert_eq!(plan.len(), 5);
        assert!(position(&plan, "w1") < position(&plan, "w2"));
        assert!(position(&plan, "w1") < position(&plan, "w3"));
        assert!(position(&plan, "w2") < position(&plan, "w4"));
        assert!(position(&plan, "w3") < position(&plan, "w4"));
        assert!(position(&plan, "w3") < position(&plan, "w5"));
    }

    #[test]
    fn test_cycle_is_unsatisfiable() {
        let err = Plan::build(
            "bus",
            "event",
            namespace(&[("w1", &[]), ("w2", &["w1"]), ("w3", &["w4"]), ("w4", &["w3"])]),
        )
        .err()
        .unwrap();

        match err {
            BusError::UnsatisfiableGraph {
                bus,
                event,
                unresolved,
            } => {
                assert_eq!(bus, "bus");
                assert_eq!(event, "event");
                assert_eq!(unresolved, ["w3", "w4"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_self_dependency_is_unsatisfiable() {
        let err = Plan::build("bus", "event", namespace(&[("w1", &["w1"])]))
            .err()
            .unwrap();
        assert!(matches!(err, BusError::UnsatisfiableGraph { ref unresolved, .. } if unresolved == &["w1"]));
    }

    #[test]
    fn test_missing_dependency_is_unsatisfiable() {
        let err = Plan::build("bus", "event", namespace(&[("w1", &[]), ("w2", &["w0"])]))
            .err()
            .unwrap();
        assert!(matches!(err, BusError::UnsatisfiableGraph { ref unresolved, .. } if unresolved == &["w2"]));
    }

    #[test]
    fn test_downstream_of_cycle_is_reported() {
        let err = Plan::build(
            "bus",
            "event",
            namespace(&[("w3", &["w4"]), ("w4", &["w3"]), ("w5", &["w4"])]),
        )
        .err()
        .unwrap();
        assert!(matches!(err, BusError::UnsatisfiableGraph { ref unresolved, .. } if unresolved == &["w3", "w4", "w5"]));
    }

    #[test]
    fn test_empty_plan() {
        let plan = Plan::build("bus", "event", Namespace::<i32>::new()).unwrap();
        assert_eq!(plan.len(), 0);
    }
}
