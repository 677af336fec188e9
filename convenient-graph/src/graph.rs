//! Bidirectional dependency graph keyed by unit name.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Dependency graph over unit names.
///
/// Holds the forward map (`unit -> dependencies`) and its exact transpose
/// (`unit -> dependents`). Every name that appears anywhere in the graph is a
/// key in both maps, so lookups never need to special-case leaves.
///
/// Maps are ordered so that every traversal is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DependencyGraph {
    forward: BTreeMap<String, BTreeSet<String>>,
    reverse: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` together with the units it depends on.
    ///
    /// Each dependency becomes a member of the graph even if it is never
    /// added on its own. Adding the same unit twice merges the edge sets.
    pub fn add_unit<I, S>(&mut self, name: &str, depends_on: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ensure_member(name);
        for dep in depends_on {
            let dep = dep.as_ref();
            self.ensure_member(dep);
            if let Some(deps) = self.forward.get_mut(name) {
                let _ = deps.insert(dep.to_string());
            }
            if let Some(dependents) = self.reverse.get_mut(dep) {
                let _ = dependents.insert(name.to_string());
            }
        }
    }

    fn ensure_member(&mut self, name: &str) {
        if !self.forward.contains_key(name) {
            let _ = self.forward.insert(name.to_string(), BTreeSet::new());
            let _ = self.reverse.insert(name.to_string(), BTreeSet::new());
        }
    }

    /// Direct dependencies of `name`. Empty for unknown names.
    #[must_use]
    pub fn dependencies(&self, name: &str) -> Vec<&str> {
        self.forward
            .get(name)
            .map(|deps| deps.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Direct dependents of `name`. Empty for unknown names.
    #[must_use]
    pub fn dependents(&self, name: &str) -> Vec<&str> {
        self.reverse
            .get(name)
            .map(|deps| deps.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Whether `name` is a member of the graph.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.forward.contains_key(name)
    }

    /// All member names in lexicographic order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.forward.keys().map(String::as_str).collect()
    }

    /// Number of member units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// Whether the graph has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Number of dependency edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.forward.values().map(BTreeSet::len).sum()
    }

    /// Every unit that transitively depends on `name`, including `name`
    /// itself when it is a member.
    ///
    /// Breadth-first over the reverse edges; the result carries no order.
    #[must_use]
    pub fn transitive_dependents(&self, name: &str) -> BTreeSet<&str> {
        let mut reached = BTreeSet::new();
        let Some((start, _)) = self.reverse.get_key_value(name) else {
            return reached;
        };

        let mut queue = VecDeque::new();
        let _ = reached.insert(start.as_str());
        queue.push_back(start.as_str());

        while let Some(current) = queue.pop_front() {
            if let Some(dependents) = self.reverse.get(current) {
                for dependent in dependents {
                    if reached.insert(dependent.as_str()) {
                        queue.push_back(dependent.as_str());
                    }
                }
            }
        }

        reached
    }

    pub(crate) fn forward(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.forward
    }

    pub(crate) fn reverse(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.reverse
    }
}
