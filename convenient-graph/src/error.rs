//! Error types for graph construction and scheduling.

/// Errors raised before any unit is executed.
///
/// Both variants describe structurally invalid input: nothing can be
/// scheduled until the offending units are fixed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// The dependency graph contains a cycle.
    ///
    /// `cycle` lists the members in traversal order without repeating the
    /// first unit at the end.
    #[error(
        "circular dependency detected: {} -> {}",
        .cycle.join(" -> "),
        .cycle.first().map_or("", String::as_str)
    )]
    CircularDependency {
        /// Units forming the cycle.
        cycle: Vec<String>,
    },

    /// A unit depends on a name that is neither in the build set nor a
    /// known unit.
    #[error("unit `{unit}` depends on `{dependency}`, which does not exist")]
    MissingDependency {
        /// The unit declaring the dependency.
        unit: String,
        /// The dependency that could not be found.
        dependency: String,
    },
}

/// Result type for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;
