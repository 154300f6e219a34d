//! The scheduling engine.
//!
//! A run goes through three stages:
//!
//! * [`plan`]: the selected tasks are laid out in a graph and ordered with a
//!   readiness queue. Cycles and dangling dependencies are rejected here,
//!   synchronously, before anything executes.
//! * [`runner`]: tasks are wired together in plan order. Each task becomes a
//!   spawned continuation over its own dependencies' handles, and its handle
//!   is recorded before it settles so dependents can chain onto it.
//! * [`aggregate`]: every handle is awaited and the outputs are combined into
//!   a single keyed map, or the first failure is returned.

pub(crate) mod aggregate;
pub(crate) mod plan;
pub(crate) mod runner;

pub(crate) use plan::Plan;
