// src/packages/common.rs
//! Package records shared by the cache and the queue
//!
//! A `Package` is the read-only view of one candidate version as reported by
//! the package cache. The queue only ever keeps the identifier; these records
//! are looked up again whenever issues are recomputed.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A package as reported by the package cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    /// Unique identifier (the control file's `Package` field)
    pub identifier: String,
    /// Display name, if different from the identifier
    #[serde(default)]
    pub name: Option<String>,
    /// Candidate version
    pub version: String,
    /// Target architecture (e.g., "amd64", "arm64")
    #[serde(default = "default_architecture")]
    pub architecture: String,
    /// Installed version, if the package is installed
    #[serde(default)]
    pub installed_version: Option<String>,
    /// Marked `Essential: yes`; removal is hazardous
    #[serde(default)]
    pub essential: bool,
    /// Held back from upgrades
    #[serde(default)]
    pub held: bool,
}

fn default_architecture() -> String {
    "all".to_string()
}

impl Package {
    /// Create a not-installed package with the given candidate version
    pub fn new(identifier: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            name: None,
            version: version.into(),
            architecture: default_architecture(),
            installed_version: None,
            essential: false,
            held: false,
        }
    }

    /// Mark the package as installed at `version`
    pub fn installed(mut self, version: impl Into<String>) -> Self {
        self.installed_version = Some(version.into());
        self
    }

    /// Mark the package as essential
    pub fn essential(mut self) -> Self {
        self.essential = true;
        self
    }

    /// Mark the package as held
    pub fn held(mut self) -> Self {
        self.held = true;
        self
    }

    pub fn with_architecture(mut self, architecture: impl Into<String>) -> Self {
        self.architecture = architecture.into();
        self
    }

    /// Whether any version of the package is installed
    pub fn is_installed(&self) -> bool {
        self.installed_version.is_some()
    }

    /// Name to show to users, falling back to the identifier
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.identifier)
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} {}", self.identifier, self.architecture, self.version)
    }
}

/// Split a Debian relationship field (`Depends`, `Conflicts`) into package
/// identifiers
///
/// Only the first alternative of each `|` group is kept; version constraints
/// and architecture qualifiers are dropped.
pub fn parse_relationship_field(field: &str) -> Vec<String> {
    field
        .split(',')
        .filter_map(|clause| {
            let first = clause.split('|').next()?.trim();
            let name = first
                .split(|c: char| c.is_whitespace() || c == '(' || c == '[' || c == '<')
                .next()?;
            let name = name.split(':').next()?.trim();
            if name.is_empty() {
                None
            } else {
                Some(name.to_string())
            }
        })
        .collect()
}
