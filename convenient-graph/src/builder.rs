//! Construction of a [`DependencyGraph`] with referential-integrity checks.

use crate::error::{GraphError, GraphResult};
use crate::graph::DependencyGraph;
use std::collections::BTreeSet;

/// Builds a [`DependencyGraph`] from a set of units and validates that
/// every declared dependency resolves.
///
/// A dependency that is not part of the supplied units is accepted only if
/// the existence query confirms it is a real unit elsewhere. Such units join
/// the graph as leaves: their own dependencies are not recorded.
///
/// # Example
///
/// ```
/// use convenient_graph::GraphBuilder;
///
/// let builder = GraphBuilder::new(|name: &str| name == "shared");
/// let graph = builder
///     .build([("app", vec!["lib", "shared"]), ("lib", vec![])])
///     .unwrap();
///
/// assert!(graph.contains("shared"));
/// assert_eq!(graph.dependencies("app"), vec!["lib", "shared"]);
/// ```
pub struct GraphBuilder<F> {
    exists: F,
}

impl GraphBuilder<fn(&str) -> bool> {
    /// A builder that only accepts dependencies present in the supplied set.
    #[must_use]
    pub fn closed() -> Self {
        fn never(_: &str) -> bool {
            false
        }
        Self { exists: never }
    }
}

impl<F> GraphBuilder<F>
where
    F: Fn(&str) -> bool,
{
    /// Create a builder that consults `exists` for dependencies outside the
    /// supplied unit set.
    pub fn new(exists: F) -> Self {
        Self { exists }
    }

    /// Build the graph from `(name, dependencies)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::MissingDependency`] for the first unit (in input
    /// order) that names an unknown dependency.
    pub fn build<I, N, D, S>(&self, units: I) -> GraphResult<DependencyGraph>
    where
        I: IntoIterator<Item = (N, D)>,
        N: AsRef<str>,
        D: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let units: Vec<(String, Vec<String>)> = units
            .into_iter()
            .map(|(name, deps)| {
                (
                    name.as_ref().to_string(),
                    deps.into_iter().map(|d| d.as_ref().to_string()).collect(),
                )
            })
            .collect();

        let mut graph = DependencyGraph::new();
        for (name, deps) in &units {
            graph.add_unit(name, deps);
        }

        let supplied: BTreeSet<&str> = units.iter().map(|(name, _)| name.as_str()).collect();
        for (name, deps) in &units {
            for dep in deps {
                if !supplied.contains(dep.as_str()) && !(self.exists)(dep) {
                    return Err(GraphError::MissingDependency {
                        unit: name.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        Ok(graph)
    }
}
