//! Build orchestration: graph, plan, compile, record.
//!
//! A build runs in four steps:
//! 1. Read the selected units from the [`UnitSource`] and build the graph
//! 2. Order the graph (linear, or in levels for parallel builds)
//! 3. Plan the rebuild against the manifest
//! 4. Compile planned units and record every success in the manifest
//!
//! Only graph errors and source errors abort a build. Compile failures are
//! collected per unit in the [`BuildResult`].

use crate::compiler::{CompileError, CompileOutput, UnitCompiler};
use crate::source::{Unit, UnitSource};
use crate::Result;
use convenient_cache::{
    BuildManifest, ContentHash, IncrementalPlanner, ManifestEntry, RebuildPlan,
};
use convenient_graph::{DependencyGraph, GraphBuilder, Scheduler};
use futures::future::join_all;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// What happens to planned units whose dependencies failed in the same run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Compile them anyway
    #[default]
    Continue,
    /// Do not compile them; record them as failed
    SkipDependents,
}

/// Build configuration
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Only rebuild stale units (otherwise rebuild everything)
    pub incremental: bool,
    /// Compile each level concurrently
    pub parallel: bool,
    /// Upper bound on concurrent compilations per level
    pub max_workers: usize,
    /// Handling of dependents of failed units
    pub failure_policy: FailurePolicy,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            incremental: true,
            parallel: false,
            max_workers: num_cpus::get(),
            failure_policy: FailurePolicy::Continue,
        }
    }
}

/// Outcome of one build run.
///
/// `compiled`, `skipped` and `failed` are disjoint and together cover
/// `build_order`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildResult {
    /// True iff no unit failed
    pub success: bool,
    /// Units compiled successfully, in completion order
    pub compiled: Vec<String>,
    /// Units that were up to date
    pub skipped: Vec<String>,
    /// Units whose compilation failed or was blocked
    pub failed: Vec<String>,
    /// Linear build order of every unit in the build. Parallel builds report
    /// the same linear order, not their levels.
    pub build_order: Vec<String>,
    /// Failure message per failed unit
    pub errors: BTreeMap<String, String>,
    /// Wall-clock duration of the run
    pub duration: Duration,
}

/// Everything known about the units of one build before compiling.
struct Snapshot {
    graph: DependencyGraph,
    units: HashMap<String, Unit>,
}

impl Snapshot {
    fn hashes(&self) -> HashMap<String, ContentHash> {
        self.units
            .iter()
            .map(|(name, unit)| (name.clone(), unit.content_hash.clone()))
            .collect()
    }

    fn dependencies(&self) -> HashMap<String, BTreeSet<String>> {
        self.units
            .iter()
            .map(|(name, unit)| (name.clone(), unit.dependencies.clone()))
            .collect()
    }
}

/// Per-run bookkeeping. The orchestrator task is its only writer.
struct BuildRun {
    plan: RebuildPlan,
    policy: FailurePolicy,
    result: BuildResult,
    broken: HashSet<String>,
}

impl BuildRun {
    fn new(build_order: Vec<String>, plan: RebuildPlan, policy: FailurePolicy) -> Self {
        Self {
            plan,
            policy,
            result: BuildResult {
                build_order,
                ..BuildResult::default()
            },
            broken: HashSet::new(),
        }
    }

    /// Split `names` into units to compile now; everything else is settled.
    fn admit(&mut self, names: &[String], graph: &DependencyGraph) -> Vec<String> {
        let mut runnable = Vec::new();
        for name in names {
            if !self.plan.contains(name) {
                debug!("  ✓ {} up to date", name);
                self.result.skipped.push(name.clone());
                continue;
            }

            if self.policy == FailurePolicy::SkipDependents {
                let blocker = graph
                    .dependencies(name)
                    .into_iter()
                    .find(|dep| self.broken.contains(*dep));
                if let Some(blocker) = blocker {
                    warn!("  ⊘ {} not compiled: dependency {} failed", name, blocker);
                    let message = format!("dependency failed: {blocker}");
                    self.fail(name, message);
                    continue;
                }
            }

            runnable.push(name.clone());
        }
        runnable
    }

    fn fail(&mut self, name: &str, message: String) {
        self.result.failed.push(name.to_string());
        let _ = self.result.errors.insert(name.to_string(), message);
        let _ = self.broken.insert(name.to_string());
    }

    /// Record the outcome of one compilation.
    fn settle(
        &mut self,
        name: &str,
        outcome: std::result::Result<CompileOutput, CompileError>,
        snapshot: &Snapshot,
        manifest: &mut BuildManifest,
    ) {
        match outcome {
            Ok(output) => {
                info!("  ✓ {} compiled ({} files)", name, output.output_files.len());
                if let Some(unit) = snapshot.units.get(name) {
                    manifest.record(
                        name,
                        ManifestEntry::new(
                            unit.content_hash.clone(),
                            unit.dependencies.clone(),
                            output.output_files,
                        ),
                    );
                }
                self.result.compiled.push(name.to_string());
            }
            Err(e) => {
                warn!("  ✗ {} failed: {}", name, e);
                self.fail(name, e.to_string());
            }
        }
    }

    fn finish(mut self, started: Instant) -> BuildResult {
        self.result.success = self.result.failed.is_empty();
        self.result.duration = started.elapsed();
        self.result
    }
}

/// Drives builds of the units provided by a [`UnitSource`].
pub struct BuildOrchestrator {
    source: Arc<dyn UnitSource>,
    compiler: Arc<dyn UnitCompiler>,
    manifest_path: PathBuf,
}

impl BuildOrchestrator {
    /// Orchestrator reading units from `source`, compiling with `compiler`
    /// and keeping build history in the manifest at `manifest_path`.
    pub fn new(
        source: Arc<dyn UnitSource>,
        compiler: Arc<dyn UnitCompiler>,
        manifest_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source,
            compiler,
            manifest_path: manifest_path.into(),
        }
    }

    /// Manifest file location
    #[must_use]
    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Read `units` (or every unit) from the source.
    fn select(&self, units: Option<&[String]>) -> Result<Vec<Unit>> {
        let names = match units {
            Some(names) => names.to_vec(),
            None => self.source.list_units()?,
        };
        names.iter().map(|name| self.source.get_unit(name)).collect()
    }

    /// Dependency graph of `units` (or every unit).
    ///
    /// Dependencies outside the selection are accepted if the source knows
    /// them; they join the graph as leaves.
    ///
    /// # Errors
    ///
    /// Fails with a missing-dependency error if a dependency exists nowhere,
    /// or with a source error if a selected unit cannot be read.
    pub fn dependency_graph(&self, units: Option<&[String]>) -> Result<DependencyGraph> {
        let selected = self.select(units)?;
        Ok(self.graph_of(&selected)?)
    }

    fn graph_of(&self, units: &[Unit]) -> convenient_graph::GraphResult<DependencyGraph> {
        let source = Arc::clone(&self.source);
        GraphBuilder::new(move |name: &str| source.unit_exists(name))
            .build(units.iter().map(|unit| (&unit.name, &unit.dependencies)))
    }

    fn snapshot(&self, units: Option<&[String]>) -> Result<Snapshot> {
        let selected = self.select(units)?;
        let graph = self.graph_of(&selected)?;

        let mut units: HashMap<String, Unit> = selected
            .into_iter()
            .map(|unit| (unit.name.clone(), unit))
            .collect();
        for name in graph.names() {
            if !units.contains_key(name) {
                let unit = self.source.get_unit(name)?;
                let _ = units.insert(name.to_string(), unit);
            }
        }

        Ok(Snapshot { graph, units })
    }

    /// Deterministic linear build order.
    ///
    /// # Errors
    ///
    /// Fails on cycles, missing dependencies and unreadable units.
    pub fn resolve_build_order(&self, units: Option<&[String]>) -> Result<Vec<String>> {
        let graph = self.dependency_graph(units)?;
        Ok(Scheduler::new(&graph).linear_order()?)
    }

    /// Build levels: units in one level are mutually independent.
    ///
    /// # Errors
    ///
    /// Fails on cycles, missing dependencies and unreadable units.
    pub fn parallel_build_order(&self, units: Option<&[String]>) -> Result<Vec<Vec<String>>> {
        let graph = self.dependency_graph(units)?;
        Ok(Scheduler::new(&graph).leveled_order()?)
    }

    /// `changed` and everything that transitively depends on it, in build
    /// order. Uses `graph` if given, otherwise the graph of all units.
    ///
    /// # Errors
    ///
    /// Fails if the graph has to be built and cannot be, or has a cycle.
    pub fn affected_units(
        &self,
        changed: &str,
        graph: Option<&DependencyGraph>,
    ) -> Result<Vec<String>> {
        match graph {
            Some(graph) => Ok(convenient_graph::affected_units(graph, changed)?),
            None => {
                let graph = self.dependency_graph(None)?;
                Ok(convenient_graph::affected_units(&graph, changed)?)
            }
        }
    }

    /// Rebuild plan a build with the same arguments would execute.
    ///
    /// # Errors
    ///
    /// Fails on cycles, missing dependencies and unreadable units.
    pub fn plan(&self, units: Option<&[String]>, incremental: bool) -> Result<RebuildPlan> {
        let snapshot = self.snapshot(units)?;
        let order = Scheduler::new(&snapshot.graph).linear_order()?;
        let manifest = BuildManifest::load(&self.manifest_path);
        Ok(Self::plan_for(&snapshot, &order, &manifest, incremental))
    }

    fn plan_for(
        snapshot: &Snapshot,
        order: &[String],
        manifest: &BuildManifest,
        incremental: bool,
    ) -> RebuildPlan {
        if incremental {
            IncrementalPlanner::new(manifest).plan_rebuild(
                order,
                &snapshot.hashes(),
                &snapshot.dependencies(),
            )
        } else {
            RebuildPlan::full(order)
        }
    }

    /// Forget all recorded builds so the next build compiles everything.
    ///
    /// Returns the number of entries removed.
    ///
    /// # Errors
    ///
    /// Fails if the emptied manifest cannot be written.
    pub fn clean(&self) -> Result<usize> {
        let mut manifest = BuildManifest::load(&self.manifest_path);
        let removed = manifest.len();
        manifest.clear();
        manifest.save()?;
        info!("Cleared {} manifest entries", removed);
        Ok(removed)
    }

    /// Build `units` (or every unit).
    ///
    /// # Errors
    ///
    /// Only cycles, missing dependencies and unreadable units abort a build;
    /// compile failures are reported in the returned [`BuildResult`].
    pub async fn build(
        &self,
        units: Option<&[String]>,
        options: &BuildOptions,
    ) -> Result<BuildResult> {
        let started = Instant::now();

        let snapshot = self.snapshot(units)?;
        let scheduler = Scheduler::new(&snapshot.graph);
        let order = scheduler.linear_order()?;
        let levels = if options.parallel {
            Some(scheduler.leveled_order()?)
        } else {
            None
        };

        let mut manifest = BuildManifest::load(&self.manifest_path);
        let plan = Self::plan_for(&snapshot, &order, &manifest, options.incremental);
        info!(
            "Building {} of {} units ({})",
            plan.len(),
            order.len(),
            if options.parallel { "parallel" } else { "sequential" }
        );

        let mut run = BuildRun::new(order.clone(), plan, options.failure_policy);
        match levels {
            Some(levels) => {
                for (index, level) in levels.iter().enumerate() {
                    debug!("Level {}: {} units", index, level.len());
                    self.run_level(&mut run, level, options.max_workers, &snapshot, &mut manifest)
                        .await;
                }
            }
            None => {
                for name in &order {
                    self.run_sequential(&mut run, name, &snapshot, &mut manifest)
                        .await;
                }
            }
        }

        if let Err(e) = manifest.save() {
            error!("Failed to save build manifest: {}", e);
        }

        let result = run.finish(started);
        info!(
            "Build finished in {:.2}s: {} compiled, {} skipped, {} failed",
            result.duration.as_secs_f64(),
            result.compiled.len(),
            result.skipped.len(),
            result.failed.len()
        );
        Ok(result)
    }

    fn spawn_compile(
        &self,
        name: &str,
        permits: Option<Arc<Semaphore>>,
    ) -> JoinHandle<CompileOutcome> {
        let compiler = Arc::clone(&self.compiler);
        let name = name.to_string();
        tokio::spawn(async move {
            let _permit = match permits {
                Some(permits) => Some(
                    permits
                        .acquire_owned()
                        .await
                        .map_err(|_| CompileError::new("worker pool closed"))?,
                ),
                None => None,
            };
            debug!("  ⚡ compiling {}", name);
            compiler.compile(&name).await
        })
    }

    async fn run_sequential(
        &self,
        run: &mut BuildRun,
        name: &str,
        snapshot: &Snapshot,
        manifest: &mut BuildManifest,
    ) {
        let runnable = run.admit(&[name.to_string()], &snapshot.graph);
        for name in runnable {
            let outcome = flatten(self.spawn_compile(&name, None).await);
            run.settle(&name, outcome, snapshot, manifest);
        }
    }

    async fn run_level(
        &self,
        run: &mut BuildRun,
        level: &[String],
        max_workers: usize,
        snapshot: &Snapshot,
        manifest: &mut BuildManifest,
    ) {
        let runnable = run.admit(level, &snapshot.graph);
        if runnable.is_empty() {
            return;
        }

        let workers = max_workers.min(runnable.len()).max(1);
        let permits = Arc::new(Semaphore::new(workers));
        debug!("  {} units on {} workers", runnable.len(), workers);

        let handles: Vec<_> = runnable
            .iter()
            .map(|name| self.spawn_compile(name, Some(Arc::clone(&permits))))
            .collect();

        // Level barrier
        let outcomes = join_all(handles).await;

        for (name, outcome) in runnable.iter().zip(outcomes) {
            run.settle(name, flatten(outcome), snapshot, manifest);
        }
    }
}

type CompileOutcome = std::result::Result<CompileOutput, CompileError>;

/// A panicking compiler is a failed unit, not a failed build.
fn flatten(joined: std::result::Result<CompileOutcome, tokio::task::JoinError>) -> CompileOutcome {
    joined.unwrap_or_else(|e| {
        if e.is_panic() {
            Err(CompileError::new("compiler panicked"))
        } else {
            Err(CompileError::new(format!("compilation aborted: {e}")))
        }
    })
}
