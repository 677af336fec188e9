//! `specforge.yml` project files.
//!
//! ```yaml
//! manifest: .specforge/manifest.json
//! compiler:
//!   command: ./tools/compile-unit.sh
//!   args: ["--strict"]
//! units:
//!   types:
//!     path: specs/types.md
//!   auth:
//!     path: specs/auth.md
//!     depends_on: [types]
//! ```
//!
//! Relative paths are resolved against the directory holding the project
//! file.

use crate::compiler::CommandCompiler;
use crate::source::{Unit, UnitSource};
use crate::{ForgeError, Result};
use convenient_cache::ContentHash;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::info;

/// Default manifest location, relative to the project root
pub const DEFAULT_MANIFEST: &str = ".specforge/manifest.json";

/// Parsed project file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectConfig {
    /// Manifest file location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<PathBuf>,

    /// External unit compiler
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compiler: Option<CompilerConfig>,

    /// Units by name
    #[serde(default)]
    pub units: BTreeMap<String, UnitConfig>,
}

/// Compiler command configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompilerConfig {
    /// Program to run
    pub command: String,
    /// Arguments passed before anything else
    #[serde(default)]
    pub args: Vec<String>,
}

/// One unit declaration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnitConfig {
    /// Specification file defining the unit
    pub path: PathBuf,
    /// Units this one depends on
    #[serde(default)]
    pub depends_on: BTreeSet<String>,
}

/// A project file together with the directory it lives in.
#[derive(Debug, Clone)]
pub struct Project {
    path: PathBuf,
    root: PathBuf,
    config: ProjectConfig,
}

impl Project {
    /// Load and validate the project file at `path`.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read, is not valid YAML, or declares a
    /// unit with an empty name.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ForgeError::ProjectRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: ProjectConfig =
            serde_yaml::from_str(&content).map_err(|source| ForgeError::ProjectParse {
                path: path.to_path_buf(),
                source,
            })?;

        if config.units.keys().any(|name| name.trim().is_empty()) {
            return Err(ForgeError::ProjectInvalid {
                path: path.to_path_buf(),
                message: "unit names must not be empty".to_string(),
            });
        }

        let root = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

        info!("Loaded project {} with {} units", path.display(), config.units.len());
        Ok(Self {
            path: path.to_path_buf(),
            root,
            config,
        })
    }

    /// The parsed configuration
    #[must_use]
    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Directory relative paths are resolved against
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the build manifest lives
    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.root
            .join(self.config.manifest.as_deref().unwrap_or(Path::new(DEFAULT_MANIFEST)))
    }

    /// Unit source reading the declared specification files
    #[must_use]
    pub fn unit_source(&self) -> ProjectUnitSource {
        ProjectUnitSource {
            units: self
                .config
                .units
                .iter()
                .map(|(name, unit)| {
                    let declared = UnitConfig {
                        path: self.root.join(&unit.path),
                        depends_on: unit.depends_on.clone(),
                    };
                    (name.clone(), declared)
                })
                .collect(),
        }
    }

    /// Compiler running the configured command from the project root
    ///
    /// # Errors
    ///
    /// Returns `ForgeError::ProjectInvalid` if no compiler is configured.
    pub fn compiler(&self) -> Result<CommandCompiler> {
        let config = self
            .config
            .compiler
            .as_ref()
            .ok_or_else(|| ForgeError::ProjectInvalid {
                path: self.path.clone(),
                message: "no `compiler` section".to_string(),
            })?;

        let specs: HashMap<String, PathBuf> = self
            .config
            .units
            .iter()
            .map(|(name, unit)| (name.clone(), self.root.join(&unit.path)))
            .collect();

        Ok(CommandCompiler::new(&config.command, &config.args)
            .working_dir(&self.root)
            .with_specs(specs))
    }
}

/// Units declared in a project file; hashes are SHA-256 of the spec files.
#[derive(Debug, Clone)]
pub struct ProjectUnitSource {
    units: BTreeMap<String, UnitConfig>,
}

impl UnitSource for ProjectUnitSource {
    fn list_units(&self) -> Result<Vec<String>> {
        Ok(self.units.keys().cloned().collect())
    }

    fn unit_exists(&self, name: &str) -> bool {
        self.units.contains_key(name)
    }

    fn get_unit(&self, name: &str) -> Result<Unit> {
        let declared = self
            .units
            .get(name)
            .ok_or_else(|| ForgeError::UnknownUnit(name.to_string()))?;
        let content = std::fs::read(&declared.path).map_err(|source| ForgeError::UnitRead {
            unit: name.to_string(),
            path: declared.path.clone(),
            source,
        })?;

        Ok(Unit {
            name: name.to_string(),
            content_hash: ContentHash::from_content(&content),
            dependencies: declared.depends_on.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECT: &str = "
compiler:
  command: sh
  args: ['-c', 'echo out/$SPECFORGE_UNIT']
units:
  types:
    path: specs/types.md
  auth:
    path: specs/auth.md
    depends_on: [types]
";

    fn write_project(dir: &Path, yaml: &str) -> PathBuf {
        std::fs::create_dir_all(dir.join("specs")).unwrap();
        std::fs::write(dir.join("specs/types.md"), "type User").unwrap();
        std::fs::write(dir.join("specs/auth.md"), "login").unwrap();
        let path = dir.join("specforge.yml");
        std::fs::write(&path, yaml).unwrap();
        path
    }

    #[test]
    fn test_load_project() {
        let dir = tempfile::tempdir().unwrap();
        let project = Project::load(write_project(dir.path(), PROJECT)).unwrap();

        assert_eq!(project.root(), dir.path());
        assert_eq!(project.manifest_path(), dir.path().join(DEFAULT_MANIFEST));
        assert_eq!(project.config().units.len(), 2);
        assert!(project.compiler().is_ok());
    }

    #[test]
    fn test_unit_source_hashes_spec_files() {
        let dir = tempfile::tempdir().unwrap();
        let project = Project::load(write_project(dir.path(), PROJECT)).unwrap();
        let source = project.unit_source();

        assert_eq!(source.list_units().unwrap(), vec!["auth", "types"]);
        let auth = source.get_unit("auth").unwrap();
        assert_eq!(auth.content_hash, ContentHash::from_content(b"login"));
        assert_eq!(auth.dependencies, BTreeSet::from(["types".to_string()]));

        std::fs::write(dir.path().join("specs/auth.md"), "login v2").unwrap();
        assert_ne!(source.get_unit("auth").unwrap().content_hash, auth.content_hash);
    }

    #[test]
    fn test_missing_spec_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let project = Project::load(write_project(dir.path(), PROJECT)).unwrap();
        std::fs::remove_file(dir.path().join("specs/types.md")).unwrap();

        let err = project.unit_source().get_unit("types").unwrap_err();
        assert!(matches!(err, ForgeError::UnitRead { unit, .. } if unit == "types"));
    }

    #[test]
    fn test_custom_manifest_and_missing_compiler() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_project(
            dir.path(),
            "manifest: state/m.json\nunits:\n  types:\n    path: specs/types.md\n",
        );
        let project = Project::load(path).unwrap();
        assert_eq!(project.manifest_path(), dir.path().join("state/m.json"));
        assert!(matches!(
            project.compiler(),
            Err(ForgeError::ProjectInvalid { .. })
        ));
    }

    #[test]
    fn test_invalid_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_project(dir.path(), "units: [not, a, map");
        assert!(matches!(
            Project::load(path),
            Err(ForgeError::ProjectParse { .. })
        ));
        assert!(matches!(
            Project::load(dir.path().join("absent.yml")),
            Err(ForgeError::ProjectRead { .. })
        ));
    }
}
