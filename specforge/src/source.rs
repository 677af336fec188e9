//! Where unit definitions come from.

use crate::{ForgeError, Result};
use convenient_cache::ContentHash;
use std::collections::{BTreeMap, BTreeSet};

/// Current state of one build unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    /// Unique unit name
    pub name: String,
    /// Hash of the unit's authoritative definition
    pub content_hash: ContentHash,
    /// Names of the units this one depends on
    pub dependencies: BTreeSet<String>,
}

impl Unit {
    /// Unit whose hash is computed from `content`.
    pub fn new<I, S>(name: impl Into<String>, content: &[u8], dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            content_hash: ContentHash::from_content(content),
            dependencies: dependencies.into_iter().map(Into::into).collect(),
        }
    }
}

/// Read access to the units of a project.
///
/// Implementations are queried once per scheduling call and never while
/// units are being compiled.
pub trait UnitSource: Send + Sync {
    /// Every unit the source knows, in any order.
    ///
    /// # Errors
    ///
    /// Returns an error if the unit list cannot be produced.
    fn list_units(&self) -> Result<Vec<String>>;

    /// Whether `name` exists as a real unit.
    fn unit_exists(&self, name: &str) -> bool;

    /// Current hash and dependencies of `name`.
    ///
    /// # Errors
    ///
    /// Returns `ForgeError::UnknownUnit` for names the source does not know
    /// and a read error if the definition is unavailable.
    fn get_unit(&self, name: &str) -> Result<Unit>;
}

/// Map-backed unit source.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUnitSource {
    units: BTreeMap<String, Unit>,
}

impl InMemoryUnitSource {
    /// Empty source
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a unit, builder style.
    #[must_use]
    pub fn with_unit<I, S>(mut self, name: &str, content: &str, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(Unit::new(name, content.as_bytes(), dependencies));
        self
    }

    /// Add or replace a unit.
    pub fn insert(&mut self, unit: Unit) {
        let _ = self.units.insert(unit.name.clone(), unit);
    }

    /// Replace the definition of an existing unit, keeping its dependencies.
    ///
    /// Returns false if the unit does not exist.
    pub fn set_content(&mut self, name: &str, content: &str) -> bool {
        match self.units.get_mut(name) {
            Some(unit) => {
                unit.content_hash = ContentHash::from_content(content.as_bytes());
                true
            }
            None => false,
        }
    }

    /// Drop a unit.
    pub fn remove(&mut self, name: &str) -> Option<Unit> {
        self.units.remove(name)
    }
}

impl UnitSource for InMemoryUnitSource {
    fn list_units(&self) -> Result<Vec<String>> {
        Ok(self.units.keys().cloned().collect())
    }

    fn unit_exists(&self, name: &str) -> bool {
        self.units.contains_key(name)
    }

    fn get_unit(&self, name: &str) -> Result<Unit> {
        self.units
            .get(name)
            .cloned()
            .ok_or_else(|| ForgeError::UnknownUnit(name.to_string()))
    }
}
