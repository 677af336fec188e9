//! Affected-set queries: which units must be rebuilt when one changes.

use crate::error::GraphResult;
use crate::graph::DependencyGraph;
use crate::schedule::Scheduler;

/// Every unit transitively depending on `changed`, including `changed`
/// itself, in build order.
///
/// The result is the graph's full linear order filtered down to the reached
/// units, so it is always a valid build order for that subset. Unknown names
/// yield an empty list.
///
/// # Errors
///
/// Returns [`crate::GraphError::CircularDependency`] if the graph has a
/// cycle.
pub fn affected_units(graph: &DependencyGraph, changed: &str) -> GraphResult<Vec<String>> {
    let reached = graph.transitive_dependents(changed);
    if reached.is_empty() {
        return Ok(Vec::new());
    }

    let order = Scheduler::new(graph).linear_order()?;
    Ok(order
        .into_iter()
        .filter(|name| reached.contains(name.as_str()))
        .collect())
}
