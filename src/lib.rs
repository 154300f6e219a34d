#![forbid(unsafe_code)]
//! A named task dependency graph executor.
//!
//! Tasks are registered on a [`TaskBus`] under an *event* and a name,
//! together with the names of the tasks they depend on. Running an event
//! starts every task as soon as all of its dependencies have produced their
//! outputs, hands each task the outputs of exactly the tasks it depends on,
//! and resolves to a map of task name to output.
//!
//! ## Core abstractions
//!
//! * [`TaskBus`]: owns the registry of every event and starts runs.
//! * [`TaskDescriptor`]: a registered task, its dependency names and its work
//!   function.
//! * [`Run`]: a future for the outputs of a run. Creating it validates the
//!   graph, so cycles and missing dependencies are reported before any work
//!   starts.
//!
//! ## Scheduling
//!
//! Every task of a run is spawned on the tokio runtime as its own
//! continuation over its dependencies' results. The continuation of a task
//! is wired up as soon as the continuations of its dependencies exist, long
//! before they finish, so independent branches of the graph run in parallel
//! and chains run as a pipeline.
//!
//! A failing task fails the whole run with its original error. Tasks that
//! depend on it never run. What happens to unrelated tasks that are already
//! running is controlled by [`OnFailure`].
//!
//! ```rust
//! use taskbus::{Deps, TaskBus, TaskContext};
//!
//! async fn fetch_user(ctx: TaskContext<u32>, _: Deps<String>) -> anyhow::Result<String> {
//!     Ok(format!("user-{}", ctx.args()))
//! }
//!
//! # async fn example() -> Result<(), taskbus::BusError> {
//! let mut bus: TaskBus<String, u32> = TaskBus::new();
//!
//! bus.task("checkout").run(fetch_user)?;
//! bus.task("checkout")
//!     .name("greeting")
//!     .depends_on(&["fetch_user"])
//!     .compute(|_, deps| Ok(format!("hello {}", deps["fetch_user"])))?;
//!
//! let greeting = bus.run_one("checkout", "greeting", 42)?.await?;
//! assert_eq!(greeting, "hello user-42");
//! # Ok(())
//! # }
//! ```

mod bus;
mod core;
mod engine;
mod error;
mod registry;
mod render;
mod resolver;
mod task;
mod utils;

pub use crate::bus::{Run, TaskBus};
pub use crate::core::{Deps, OnFailure, Outputs, Settings, TaskContext};
pub use crate::error::*;
pub use crate::registry::Namespace;
pub use crate::task::{TaskDef, TaskDescriptor};
#[cfg(feature = "logging")]
pub use crate::utils::init_logging;
