//! Incremental rebuild planning against a [`BuildManifest`].

use crate::ContentHash;
use crate::manifest::BuildManifest;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use tracing::{debug, info};

/// Why a unit has to be rebuilt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleReason {
    /// No successful build is recorded
    NeverBuilt,
    /// The unit definition hash differs from the recorded one
    ContentChanged,
    /// The declared dependency set differs from the recorded one
    DependenciesChanged,
    /// A dependency is being rebuilt in the same run
    DependencyRebuilt(String),
    /// Every unit was requested regardless of state
    Forced,
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NeverBuilt => write!(f, "never built"),
            Self::ContentChanged => write!(f, "content changed"),
            Self::DependenciesChanged => write!(f, "dependency list changed"),
            Self::DependencyRebuilt(dep) => write!(f, "dependency `{dep}` is rebuilt"),
            Self::Forced => write!(f, "full rebuild requested"),
        }
    }
}

/// Ordered set of units to rebuild, with the reason for each.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildPlan {
    units: Vec<String>,
    reasons: BTreeMap<String, StaleReason>,
}

impl RebuildPlan {
    /// Plan that rebuilds every unit in `build_order`.
    pub fn full<S: AsRef<str>>(build_order: &[S]) -> Self {
        let mut plan = Self::default();
        for name in build_order {
            plan.push(name.as_ref(), StaleReason::Forced);
        }
        plan
    }

    fn push(&mut self, name: &str, reason: StaleReason) {
        self.units.push(name.to_string());
        let _ = self.reasons.insert(name.to_string(), reason);
    }

    /// Units to rebuild, in build order.
    #[must_use]
    pub fn units(&self) -> &[String] {
        &self.units
    }

    /// Whether `name` is part of the plan.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.reasons.contains_key(name)
    }

    /// Why `name` is rebuilt, if it is.
    #[must_use]
    pub fn reason(&self, name: &str) -> Option<&StaleReason> {
        self.reasons.get(name)
    }

    /// Number of planned units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether nothing needs rebuilding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Decides which units are stale relative to a manifest.
///
/// A unit is stale when, checked in this order:
/// 1. it has no manifest entry,
/// 2. its content hash changed,
/// 3. its dependency set changed,
/// 4. one of its dependencies is already in the plan.
///
/// Rule 4 only works if dependencies are evaluated before dependents, so the
/// walk order must be a valid build order.
#[derive(Debug, Clone, Copy)]
pub struct IncrementalPlanner<'m> {
    manifest: &'m BuildManifest,
}

impl<'m> IncrementalPlanner<'m> {
    /// Create a planner reading from `manifest`.
    #[must_use]
    pub fn new(manifest: &'m BuildManifest) -> Self {
        Self { manifest }
    }

    /// Staleness of a single unit given the set of units already planned.
    ///
    /// A unit without a known current hash is reported as changed.
    #[must_use]
    pub fn staleness<S>(
        &self,
        name: &str,
        hash: Option<&ContentHash>,
        dependencies: &BTreeSet<String>,
        rebuilding: &HashSet<S>,
    ) -> Option<StaleReason>
    where
        S: std::borrow::Borrow<str> + std::hash::Hash + Eq,
    {
        let Some(entry) = self.manifest.get(name) else {
            return Some(StaleReason::NeverBuilt);
        };
        if hash != Some(&entry.content_hash) {
            return Some(StaleReason::ContentChanged);
        }
        if &entry.dependencies != dependencies {
            return Some(StaleReason::DependenciesChanged);
        }
        dependencies
            .iter()
            .find(|dep| rebuilding.contains(dep.as_str()))
            .map(|dep| StaleReason::DependencyRebuilt(dep.clone()))
    }

    /// Walk `build_order` and collect every stale unit.
    ///
    /// Units missing from `dependencies` are treated as having none.
    pub fn plan_rebuild<S: AsRef<str>>(
        &self,
        build_order: &[S],
        hashes: &HashMap<String, ContentHash>,
        dependencies: &HashMap<String, BTreeSet<String>>,
    ) -> RebuildPlan {
        let no_deps = BTreeSet::new();
        let mut rebuilding: HashSet<String> = HashSet::new();
        let mut plan = RebuildPlan::default();

        for name in build_order {
            let name = name.as_ref();
            let deps = dependencies.get(name).unwrap_or(&no_deps);

            match self.staleness(name, hashes.get(name), deps, &rebuilding) {
                Some(reason) => {
                    debug!("  ↻ {} needs rebuild: {}", name, reason);
                    let _ = rebuilding.insert(name.to_string());
                    plan.push(name, reason);
                }
                None => debug!("  ✓ {} unchanged", name),
            }
        }

        info!(
            "Incremental plan: {} of {} units need rebuild",
            plan.len(),
            build_order.len()
        );
        plan
    }
}
