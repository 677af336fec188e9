//! Deterministic build ordering with Kahn's algorithm.
//!
//! Two orders are produced from the same graph:
//!
//! - a **linear order**, where ties between ready units are broken by the
//!   lexicographically smallest name, so repeated runs over the same input
//!   always produce the same order;
//! - a **leveled order**, where every unit whose dependencies are satisfied
//!   at the same step is collected into one level. Units in a level never
//!   depend on each other and can be executed concurrently.
//!
//! Both are iterative so deep dependency chains cannot exhaust the stack.
//! When units remain after the queue drains, a cycle is extracted from the
//! leftovers and reported as [`GraphError::CircularDependency`].

use crate::error::{GraphError, GraphResult};
use crate::graph::DependencyGraph;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Computes build orders for a [`DependencyGraph`].
#[derive(Debug, Clone, Copy)]
pub struct Scheduler<'g> {
    graph: &'g DependencyGraph,
}

impl<'g> Scheduler<'g> {
    /// Create a scheduler over `graph`.
    #[must_use]
    pub fn new(graph: &'g DependencyGraph) -> Self {
        Self { graph }
    }

    /// Linear build order: every dependency precedes its dependents.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::CircularDependency`] if the graph has a cycle.
    pub fn linear_order(&self) -> GraphResult<Vec<String>> {
        let mut in_degree = self.in_degrees();
        let mut ready: BTreeSet<&'g str> = in_degree
            .iter()
            .filter(|&(_, &degree)| degree == 0)
            .map(|(&name, _)| name)
            .collect();

        let mut order = Vec::with_capacity(in_degree.len());
        while let Some(name) = ready.pop_first() {
            order.push(name.to_string());
            self.release_dependents(name, &mut in_degree, &mut ready);
        }

        if order.len() < self.graph.len() {
            return Err(self.cycle_error(&in_degree));
        }
        Ok(order)
    }

    /// Leveled build order: level `n + 1` only contains units whose
    /// dependencies all sit in levels `0..=n`. Each level is sorted.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::CircularDependency`] if the graph has a cycle.
    pub fn leveled_order(&self) -> GraphResult<Vec<Vec<String>>> {
        let mut in_degree = self.in_degrees();
        let mut ready: BTreeSet<&'g str> = in_degree
            .iter()
            .filter(|&(_, &degree)| degree == 0)
            .map(|(&name, _)| name)
            .collect();

        let mut levels = Vec::new();
        let mut scheduled = 0;
        while !ready.is_empty() {
            let level = std::mem::take(&mut ready);
            let mut next = BTreeSet::new();
            for &name in &level {
                self.release_dependents(name, &mut in_degree, &mut next);
            }
            scheduled += level.len();
            levels.push(level.into_iter().map(str::to_string).collect());
            ready = next;
        }

        if scheduled < self.graph.len() {
            return Err(self.cycle_error(&in_degree));
        }
        Ok(levels)
    }

    /// In-degree of every unit, counted as its number of dependencies.
    fn in_degrees(&self) -> BTreeMap<&'g str, usize> {
        self.graph
            .forward()
            .iter()
            .map(|(name, deps)| (name.as_str(), deps.len()))
            .collect()
    }

    /// Decrement the in-degree of each dependent of `name`, moving the ones
    /// that reach zero into `ready`. The processed unit itself is removed so
    /// that only unprocessed units remain in `in_degree`.
    fn release_dependents(
        &self,
        name: &str,
        in_degree: &mut BTreeMap<&'g str, usize>,
        ready: &mut BTreeSet<&'g str>,
    ) {
        let _ = in_degree.remove(name);
        let Some(dependents) = self.graph.reverse().get(name) else {
            return;
        };
        for dependent in dependents {
            if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                *degree = degree.saturating_sub(1);
                if *degree == 0 {
                    let _ = ready.insert(dependent.as_str());
                }
            }
        }
    }

    fn cycle_error(&self, leftover: &BTreeMap<&'g str, usize>) -> GraphError {
        let leftover: BTreeSet<&'g str> = leftover.keys().copied().collect();
        GraphError::CircularDependency {
            cycle: self.find_cycle(&leftover),
        }
    }

    /// Depth-first search restricted to `leftover`, following dependency
    /// edges in name order. The first back-edge closes the reported cycle.
    fn find_cycle(&self, leftover: &BTreeSet<&'g str>) -> Vec<String> {
        let pending_deps = |name: &str| -> Vec<&'g str> {
            let mut deps: Vec<&'g str> = self
                .graph
                .forward()
                .get(name)
                .into_iter()
                .flatten()
                .map(String::as_str)
                .filter(|dep| leftover.contains(dep))
                .collect();
            // popped from the back, smallest name first
            deps.reverse();
            deps
        };

        let mut visited: HashSet<&'g str> = HashSet::new();
        for &start in leftover {
            if !visited.insert(start) {
                continue;
            }

            let mut path: Vec<&'g str> = vec![start];
            let mut on_path: HashMap<&'g str, usize> = HashMap::from([(start, 0)]);
            let mut stack: Vec<(&'g str, Vec<&'g str>)> = vec![(start, pending_deps(start))];

            while let Some(frame) = stack.last_mut() {
                let node = frame.0;
                match frame.1.pop() {
                    Some(dep) => {
                        if let Some(&pos) = on_path.get(dep) {
                            return path[pos..].iter().map(|n| (*n).to_string()).collect();
                        }
                        if visited.insert(dep) {
                            let _ = on_path.insert(dep, path.len());
                            path.push(dep);
                            stack.push((dep, pending_deps(dep)));
                        }
                    }
                    None => {
                        let _ = stack.pop();
                        let _ = path.pop();
                        let _ = on_path.remove(node);
                    }
                }
            }
        }

        Vec::new()
    }
}
