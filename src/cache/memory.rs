// src/cache/memory.rs

//! In-memory package cache
//!
//! Holds a flat set of package records with their declared relationships.
//! Records can be built in code or loaded from a TOML fixture:
//!
//! ```toml
//! [[package]]
//! identifier = "foo"
//! version = "1.0"
//! depends = ["libfoo"]
//!
//! [[package]]
//! identifier = "libfoo"
//! version = "1.0"
//! ```

use super::PackageCache;
use crate::error::{Error, Result};
use crate::packages::{DebPackage, Package};
use crate::queue::QueueType;
use crate::version::compare_versions;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::debug;

/// A package plus the relationships declared by its candidate version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    #[serde(flatten)]
    pub package: Package,
    #[serde(default)]
    pub depends: Vec<String>,
    #[serde(default)]
    pub conflicts: Vec<String>,
}

impl PackageRecord {
    pub fn new(package: Package) -> Self {
        Self {
            package,
            depends: Vec::new(),
            conflicts: Vec::new(),
        }
    }

    pub fn depends_on(mut self, identifier: impl Into<String>) -> Self {
        self.depends.push(identifier.into());
        self
    }

    pub fn conflicts_with(mut self, identifier: impl Into<String>) -> Self {
        self.conflicts.push(identifier.into());
        self
    }
}

/// On-disk layout of a cache fixture
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheFixture {
    #[serde(default, rename = "package")]
    pub packages: Vec<PackageRecord>,
}

/// A [`PackageCache`] backed by a map of records
#[derive(Debug, Default)]
pub struct MemoryCache {
    records: RwLock<BTreeMap<String, PackageRecord>>,
}

impl MemoryCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache holding `records`
    pub fn from_records(records: impl IntoIterator<Item = PackageRecord>) -> Self {
        let cache = Self::new();
        for record in records {
            cache.insert(record);
        }
        cache
    }

    /// Parse a TOML fixture
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let fixture: CacheFixture = toml::from_str(content)
            .map_err(|e| Error::ParseError(format!("Invalid cache fixture: {}", e)))?;
        Ok(Self::from_records(fixture.packages))
    }

    /// Load a TOML fixture from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let cache = Self::from_toml_str(&content)?;
        debug!("Loaded {} package records from {}", cache.len(), path.display());
        Ok(cache)
    }

    /// Insert or replace a record
    pub fn insert(&self, record: PackageRecord) {
        self.records
            .write()
            .insert(record.package.identifier.clone(), record);
    }

    /// Drop a record, as a cache refresh would for a vanished package
    pub fn remove(&self, identifier: &str) -> Option<PackageRecord> {
        self.records.write().remove(identifier)
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn is_installed(&self, identifier: &str) -> bool {
        self.records
            .read()
            .get(identifier)
            .is_some_and(|r| r.package.is_installed())
    }
}

impl PackageCache for MemoryCache {
    fn resolve(&self, identifier: &str) -> Option<Package> {
        self.records
            .read()
            .get(identifier)
            .map(|r| r.package.clone())
    }

    fn dependencies_of(&self, package: &Package) -> BTreeSet<String> {
        let depends = match self.records.read().get(&package.identifier) {
            Some(record) => record.depends.clone(),
            None => return BTreeSet::new(),
        };

        // Unknown dependencies stay in the set so the queue can report them
        depends
            .into_iter()
            .filter(|dep| dep != &package.identifier && !self.is_installed(dep))
            .collect()
    }

    fn conflicts_of(&self, package: &Package) -> BTreeSet<String> {
        self.records
            .read()
            .get(&package.identifier)
            .map(|r| {
                r.conflicts
                    .iter()
                    .filter(|c| *c != &package.identifier)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn is_satisfied(&self, package: &Package, queue_type: QueueType) -> bool {
        let installed = match (&package.installed_version, queue_type) {
            (_, QueueType::Install) => return true,
            (None, _) => return false,
            (Some(installed), _) => installed,
        };

        match queue_type {
            QueueType::Install | QueueType::Remove | QueueType::Reinstall => true,
            QueueType::Upgrade => {
                !package.held && compare_versions(&package.version, installed) == Ordering::Greater
            }
            QueueType::Downgrade => {
                compare_versions(&package.version, installed) == Ordering::Less
            }
        }
    }

    fn dependents_of(&self, package: &Package) -> BTreeSet<String> {
        self.records
            .read()
            .values()
            .filter(|r| r.package.is_installed() && r.depends.contains(&package.identifier))
            .map(|r| r.package.identifier.clone())
            .collect()
    }

    fn register_local(&self, deb: &DebPackage) -> Result<Package> {
        let mut package = deb.to_package();
        let mut records = self.records.write();

        // A local file replaces the candidate but not what is installed
        if let Some(existing) = records.get(&deb.identifier) {
            package.installed_version = existing.package.installed_version.clone();
            package.held = existing.package.held;
        }

        records.insert(
            package.identifier.clone(),
            PackageRecord {
                package: package.clone(),
                depends: deb.depends.clone(),
                conflicts: deb.conflicts.clone(),
            },
        );
        debug!("Registered local package {}", package);
        Ok(package)
    }
}
