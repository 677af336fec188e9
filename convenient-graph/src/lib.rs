//! Dependency graph library for build-unit scheduling.
//!
//! This crate turns a set of named units with declared dependencies into
//! build orders:
//!
//! - [`DependencyGraph`]: bidirectional adjacency over unit names
//! - [`GraphBuilder`]: graph construction with missing-dependency checks
//! - [`Scheduler`]: deterministic linear order and parallel build levels
//!   using Kahn's algorithm, with cycle reporting
//! - [`affected_units`]: the transitive dependents of a changed unit, in
//!   build order
//!
//! # Features
//!
//! - Lexicographic tie-breaking so identical inputs give identical orders
//! - Iterative algorithms, safe on very deep dependency chains
//! - Optional serde support
//!
//! # Example
//!
//! ```
//! use convenient_graph::{GraphBuilder, Scheduler};
//!
//! let graph = GraphBuilder::closed()
//!     .build([
//!         ("base", vec![]),
//!         ("a", vec!["base"]),
//!         ("b", vec!["base"]),
//!         ("c", vec!["a", "b"]),
//!     ])
//!     .unwrap();
//!
//! let scheduler = Scheduler::new(&graph);
//! assert_eq!(scheduler.linear_order().unwrap(), ["base", "a", "b", "c"]);
//! assert_eq!(
//!     scheduler.leveled_order().unwrap(),
//!     [vec!["base"], vec!["a", "b"], vec!["c"]]
//! );
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(unused_results)]

mod affected;
mod builder;
mod error;
mod graph;
mod schedule;

pub use affected::affected_units;
pub use builder::GraphBuilder;
pub use error::{GraphError, GraphResult};
pub use graph::DependencyGraph;
pub use schedule::Scheduler;
