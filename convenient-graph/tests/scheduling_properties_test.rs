//! Scheduling properties over generated dependency graphs
//!
//! Checks the guarantees the build orchestrator relies on:
//! 1. The linear order is a permutation that respects every edge
//! 2. Levels partition the same units and strictly follow their dependencies
//! 3. Cycles are reported with cycle members only
//! 4. Affected sets come back in build order

use convenient_graph::{affected_units, DependencyGraph, GraphBuilder, GraphError, Scheduler};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet};

/// Random DAG: unit `i` may only depend on units with a smaller index, so
/// the result is acyclic. Names are shuffled so that name order and
/// topological order disagree.
fn random_dag(rng: &mut StdRng, size: usize) -> Vec<(String, Vec<String>)> {
    let mut names: Vec<String> = (0..size).map(|i| format!("unit_{i:03}")).collect();
    names.shuffle(rng);

    (0..size)
        .map(|i| {
            let deps = (0..i)
                .filter(|_| rng.gen_bool(0.2))
                .map(|j| names[j].clone())
                .collect();
            (names[i].clone(), deps)
        })
        .collect()
}

fn build(units: &[(String, Vec<String>)]) -> DependencyGraph {
    GraphBuilder::closed()
        .build(units.iter().map(|(name, deps)| (name, deps)))
        .unwrap()
}

#[test]
fn test_linear_order_respects_every_edge() {
    let mut rng = StdRng::seed_from_u64(7);
    for size in [1, 2, 5, 20, 60] {
        let units = random_dag(&mut rng, size);
        let graph = build(&units);
        let order = Scheduler::new(&graph).linear_order().unwrap();

        assert_eq!(order.len(), units.len());
        let position: HashMap<&str, usize> = order
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();
        assert_eq!(position.len(), units.len(), "order must not repeat units");

        for (name, deps) in &units {
            for dep in deps {
                assert!(
                    position[dep.as_str()] < position[name.as_str()],
                    "{dep} must be built before {name}"
                );
            }
        }
    }
}

#[test]
fn test_linear_order_is_reproducible() {
    let mut rng = StdRng::seed_from_u64(11);
    let units = random_dag(&mut rng, 40);

    let mut reversed = units.clone();
    reversed.reverse();

    let first = Scheduler::new(&build(&units)).linear_order().unwrap();
    let second = Scheduler::new(&build(&reversed)).linear_order().unwrap();
    assert_eq!(first, second, "input order must not influence the schedule");
}

#[test]
fn test_levels_partition_units_and_follow_dependencies() {
    let mut rng = StdRng::seed_from_u64(23);
    for size in [1, 3, 10, 50] {
        let units = random_dag(&mut rng, size);
        let graph = build(&units);
        let scheduler = Scheduler::new(&graph);
        let levels = scheduler.leveled_order().unwrap();

        let level_of: HashMap<&str, usize> = levels
            .iter()
            .enumerate()
            .flat_map(|(i, level)| level.iter().map(move |name| (name.as_str(), i)))
            .collect();
        let flattened: usize = levels.iter().map(Vec::len).sum();
        assert_eq!(flattened, units.len());
        assert_eq!(level_of.len(), units.len());

        for level in &levels {
            let mut sorted = level.clone();
            sorted.sort();
            assert_eq!(&sorted, level, "levels are sorted");
        }

        for (name, deps) in &units {
            let deepest_dep = deps.iter().map(|dep| level_of[dep.as_str()]).max();
            if let Some(deepest) = deepest_dep {
                assert!(level_of[name.as_str()] > deepest);
            } else {
                assert_eq!(level_of[name.as_str()], 0);
            }
        }

        let linear: HashSet<String> = scheduler.linear_order().unwrap().into_iter().collect();
        let leveled: HashSet<String> = levels.into_iter().flatten().collect();
        assert_eq!(linear, leveled);
    }
}

#[test]
fn test_cycle_members_only() {
    let mut rng = StdRng::seed_from_u64(5);
    let mut units = random_dag(&mut rng, 30);

    // close a loop between three units and hang the rest of the graph off it
    let ring = ["ring_a", "ring_b", "ring_c"];
    units.push(("ring_a".to_string(), vec!["ring_c".to_string()]));
    units.push(("ring_b".to_string(), vec!["ring_a".to_string()]));
    units.push(("ring_c".to_string(), vec!["ring_b".to_string()]));
    units[0].1.push("ring_b".to_string());

    let graph = build(&units);
    for result in [
        Scheduler::new(&graph).linear_order().map(|_| ()),
        Scheduler::new(&graph).leveled_order().map(|_| ()),
    ] {
        let Err(GraphError::CircularDependency { cycle }) = result else {
            panic!("expected a cycle");
        };
        assert_eq!(cycle.len(), 3);
        assert!(cycle.iter().all(|name| ring.contains(&name.as_str())));
        assert_ne!(cycle.first(), cycle.last(), "start is not repeated");
    }
}

#[test]
fn test_missing_dependency_is_reported_before_scheduling() {
    let units = vec![
        ("api".to_string(), vec!["auth".to_string()]),
        ("auth".to_string(), vec!["session".to_string()]),
    ];
    let err = GraphBuilder::closed()
        .build(units.iter().map(|(n, d)| (n, d)))
        .unwrap_err();
    assert_eq!(
        err,
        GraphError::MissingDependency {
            unit: "auth".to_string(),
            dependency: "session".to_string(),
        }
    );
}

#[test]
fn test_cascading_chain_scenario() {
    let graph = GraphBuilder::closed()
        .build([("api", vec!["auth"]), ("auth", vec!["types"]), ("types", vec![])])
        .unwrap();

    assert_eq!(
        affected_units(&graph, "types").unwrap(),
        vec!["types", "auth", "api"]
    );
    assert_eq!(affected_units(&graph, "auth").unwrap(), vec!["auth", "api"]);
}

#[test]
fn test_four_unit_diamond_end_to_end() {
    let graph = GraphBuilder::closed()
        .build([
            ("A", vec![]),
            ("B", vec!["A"]),
            ("C", vec!["A"]),
            ("D", vec!["B", "C"]),
        ])
        .unwrap();
    let scheduler = Scheduler::new(&graph);

    assert_eq!(scheduler.linear_order().unwrap(), vec!["A", "B", "C", "D"]);
    assert_eq!(
        scheduler.leveled_order().unwrap(),
        vec![vec!["A"], vec!["B", "C"], vec!["D"]]
    );
    assert_eq!(
        affected_units(&graph, "A").unwrap(),
        vec!["A", "B", "C", "D"]
    );
}

#[test]
fn test_affected_is_subsequence_of_linear_order() {
    let mut rng = StdRng::seed_from_u64(99);
    let units = random_dag(&mut rng, 40);
    let graph = build(&units);
    let order = Scheduler::new(&graph).linear_order().unwrap();

    for (name, _) in &units {
        let affected = affected_units(&graph, name).unwrap();
        let mut cursor = order.iter();
        for unit in &affected {
            assert!(cursor.any(|n| n == unit), "{unit} out of build order");
        }
        assert!(affected.contains(name));
    }
}
