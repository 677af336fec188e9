//! End-to-end builds of on-disk projects driven by a shell compiler
#![cfg(unix)]

use specforge::{
    BuildOptions, BuildOrchestrator, FailurePolicy, ForgeError, GraphError, Project,
};
use std::path::Path;
use std::sync::Arc;

/// Writes `gen/<unit>.out` and prints its path. Units whose spec contains
/// `FAIL` are rejected.
const COMPILER: &str = r#"
if grep -q FAIL "$SPECFORGE_SPEC"; then
  echo "rejected $SPECFORGE_UNIT" >&2
  exit 1
fi
mkdir -p gen
cp "$SPECFORGE_SPEC" "gen/$SPECFORGE_UNIT.out"
echo "gen/$SPECFORGE_UNIT.out"
"#;

fn write_project(root: &Path, units: &[(&str, &str, &[&str])]) -> std::path::PathBuf {
    let mut yaml = String::from("compiler:\n  command: sh\n  args:\n    - -c\n    - |\n");
    for line in COMPILER.lines() {
        yaml.push_str("      ");
        yaml.push_str(line);
        yaml.push('\n');
    }
    yaml.push_str("units:\n");

    std::fs::create_dir_all(root.join("specs")).unwrap();
    for (name, spec, deps) in units {
        std::fs::write(root.join(format!("specs/{name}.md")), spec).unwrap();
        yaml.push_str(&format!(
            "  {name}:\n    path: specs/{name}.md\n    depends_on: [{}]\n",
            deps.join(", ")
        ));
    }

    let path = root.join("specforge.yml");
    std::fs::write(&path, yaml).unwrap();
    path
}

fn open(project_file: &Path) -> BuildOrchestrator {
    let project = Project::load(project_file).unwrap();
    BuildOrchestrator::new(
        Arc::new(project.unit_source()),
        Arc::new(project.compiler().unwrap()),
        project.manifest_path(),
    )
}

fn layered(root: &Path) -> std::path::PathBuf {
    write_project(
        root,
        &[
            ("types", "type User", &[]),
            ("auth", "login(User)", &["types"]),
            ("api", "GET /me", &["auth"]),
            ("billing", "invoice(User)", &["types"]),
        ],
    )
}

#[tokio::test]
async fn test_build_then_rebuild_after_edit() {
    let dir = tempfile::tempdir().unwrap();
    let file = layered(dir.path());
    let forge = open(&file);

    let first = forge.build(None, &BuildOptions::default()).await.unwrap();
    assert!(first.success);
    assert_eq!(first.compiled, vec!["types", "auth", "api", "billing"]);
    assert!(dir.path().join("gen/api.out").exists());

    let second = forge.build(None, &BuildOptions::default()).await.unwrap();
    assert!(second.compiled.is_empty());
    assert_eq!(second.skipped.len(), 4);

    std::fs::write(dir.path().join("specs/auth.md"), "login(User, Token)").unwrap();
    assert_eq!(
        forge.affected_units("auth", None).unwrap(),
        vec!["auth", "api"]
    );
    let third = forge.build(None, &BuildOptions::default()).await.unwrap();
    assert_eq!(third.compiled, vec!["auth", "api"]);
    assert_eq!(third.skipped, vec!["types", "billing"]);
}

#[tokio::test]
async fn test_parallel_build_records_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let file = layered(dir.path());
    let forge = open(&file);

    assert_eq!(
        forge.parallel_build_order(None).unwrap(),
        vec![vec!["types"], vec!["auth", "billing"], vec!["api"]]
    );

    let options = BuildOptions {
        parallel: true,
        max_workers: 2,
        ..BuildOptions::default()
    };
    let result = forge.build(None, &options).await.unwrap();
    assert!(result.success);
    assert_eq!(result.compiled, vec!["types", "auth", "billing", "api"]);

    let manifest = specforge::BuildManifest::load(forge.manifest_path());
    assert_eq!(
        manifest.get("billing").unwrap().output_files,
        vec![std::path::PathBuf::from("gen/billing.out")]
    );
}

#[tokio::test]
async fn test_compile_failure_is_reported_per_unit() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_project(
        dir.path(),
        &[
            ("types", "type User", &[]),
            ("auth", "FAIL", &["types"]),
            ("api", "GET /me", &["auth"]),
        ],
    );
    let forge = open(&file);

    let result = forge.build(None, &BuildOptions::default()).await.unwrap();
    assert!(!result.success);
    assert_eq!(result.failed, vec!["auth"]);
    assert_eq!(result.errors["auth"], "rejected auth");
    assert_eq!(result.compiled, vec!["types", "api"]);

    let strict = BuildOptions {
        failure_policy: FailurePolicy::SkipDependents,
        ..BuildOptions::default()
    };
    let result = forge.build(None, &strict).await.unwrap();
    assert_eq!(result.failed, vec!["auth", "api"]);
    assert_eq!(result.skipped, vec!["types"]);
}

#[tokio::test]
async fn test_cycle_in_project_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_project(
        dir.path(),
        &[("a", "a", &["c"]), ("b", "b", &["a"]), ("c", "c", &["b"])],
    );
    let forge = open(&file);

    let err = forge.build(None, &BuildOptions::default()).await.unwrap_err();
    let ForgeError::Graph(GraphError::CircularDependency { cycle }) = err else {
        panic!("expected a cycle");
    };
    assert_eq!(cycle, vec!["a", "c", "b"]);
    assert!(!dir.path().join("gen").exists());
}

#[tokio::test]
async fn test_unreadable_spec_aborts_before_compiling() {
    let dir = tempfile::tempdir().unwrap();
    let file = layered(dir.path());
    std::fs::remove_file(dir.path().join("specs/billing.md")).unwrap();
    let forge = open(&file);

    let err = forge.build(None, &BuildOptions::default()).await.unwrap_err();
    assert!(matches!(err, ForgeError::UnitRead { ref unit, .. } if unit == "billing"));
    assert!(!dir.path().join("gen").exists());
}
