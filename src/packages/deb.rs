// src/packages/deb.rs
//! Local DEB package inspection
//!
//! DEB packages are ar archives containing:
//! - debian-binary: format version string "2.0\n"
//! - control.tar[.gz|.xz|.zst]: package metadata and scripts
//! - data.tar[.gz|.xz|.zst]: actual file contents
//!
//! Inspection only validates the container and reads the control file; file
//! contents are never extracted.

use super::archive_utils::{read_limited, MemberCompression, MAX_CONTROL_SIZE};
use super::common::{parse_relationship_field, Package};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Reasons a file is not an acceptable local package
#[derive(Error, Debug)]
pub enum DebError {
    #[error("not a debian archive: {0}")]
    NotAnArchive(String),

    #[error("unsupported package format version '{0}'")]
    UnsupportedFormat(String),

    #[error("archive is missing the {0} member")]
    MissingMember(&'static str),

    #[error("unsupported compression for member '{0}'")]
    UnsupportedCompression(String),

    #[error("invalid control file: {0}")]
    InvalidControl(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fields read from a DEB control file
#[derive(Debug, Clone, Deserialize)]
struct ControlFields {
    #[serde(rename = "Package")]
    package: String,
    #[serde(rename = "Version")]
    version: String,
    #[serde(rename = "Architecture")]
    architecture: String,
    #[serde(rename = "Name", default)]
    name: Option<String>,
    #[serde(rename = "Depends", default)]
    depends: Option<String>,
    #[serde(rename = "Pre-Depends", default)]
    pre_depends: Option<String>,
    #[serde(rename = "Conflicts", default)]
    conflicts: Option<String>,
    #[serde(rename = "Essential", default)]
    essential: Option<String>,
    #[serde(rename = "Description", default)]
    description: Option<String>,
    #[serde(rename = "Installed-Size", default)]
    installed_size: Option<String>,
}

/// A validated local DEB package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DebPackage {
    /// Path to the package file
    pub path: PathBuf,
    pub identifier: String,
    pub name: Option<String>,
    pub version: String,
    pub architecture: String,
    /// Identifiers from `Pre-Depends` and `Depends`
    pub depends: Vec<String>,
    pub conflicts: Vec<String>,
    pub essential: bool,
    pub description: Option<String>,
    /// Installed size in KiB
    pub installed_size: Option<u64>,
}

impl DebPackage {
    /// Validate the archive at `path` and read its control file
    ///
    /// Any failure is reported as [`Error::InvalidLocalPackage`].
    pub fn inspect(path: impl AsRef<Path>, max_control_size: u64) -> Result<Self> {
        let path = path.as_ref();
        info!("Inspecting local package: {}", path.display());

        Self::read_archive(path, max_control_size)
            .map_err(|e| Error::invalid_local(path, e.to_string()))
    }

    /// Validate using the default control size limit
    pub fn inspect_default(path: impl AsRef<Path>) -> Result<Self> {
        Self::inspect(path, MAX_CONTROL_SIZE)
    }

    fn read_archive(path: &Path, max_control_size: u64) -> std::result::Result<Self, DebError> {
        let file = File::open(path)?;
        let mut archive = ar::Archive::new(file);

        let mut saw_format = false;
        let mut control: Option<String> = None;
        let mut saw_data = false;

        while let Some(entry) = archive.next_entry() {
            let mut entry = entry.map_err(|e| DebError::NotAnArchive(e.to_string()))?;
            let name = String::from_utf8_lossy(entry.header().identifier())
                .trim_end_matches('/')
                .to_string();
            debug!("ar member: {} ({} bytes)", name, entry.header().size());

            if !saw_format {
                if name != "debian-binary" {
                    return Err(DebError::NotAnArchive(format!(
                        "first member is '{}', expected debian-binary",
                        name
                    )));
                }
                let raw = read_limited(&mut entry, 64)?;
                let format = String::from_utf8_lossy(&raw).trim().to_string();
                if !format.starts_with("2.") {
                    return Err(DebError::UnsupportedFormat(format));
                }
                saw_format = true;
            } else if name.starts_with("control.tar") {
                let compression = MemberCompression::from_member_name(&name, "control.tar")
                    .ok_or_else(|| DebError::UnsupportedCompression(name.clone()))?;
                control = Some(read_control(&mut entry, compression, max_control_size)?);
            } else if name.starts_with("data.tar") {
                MemberCompression::from_member_name(&name, "data.tar")
                    .ok_or_else(|| DebError::UnsupportedCompression(name.clone()))?;
                saw_data = true;
            }
        }

        if !saw_format {
            return Err(DebError::NotAnArchive("archive is empty".to_string()));
        }
        let control = control.ok_or(DebError::MissingMember("control.tar"))?;
        if !saw_data {
            return Err(DebError::MissingMember("data.tar"));
        }

        Self::from_control(path, &control)
    }

    /// Build a package from the text of a control file
    fn from_control(path: &Path, control: &str) -> std::result::Result<Self, DebError> {
        let folded = fold_continuations(control);
        let mut paragraphs: Vec<ControlFields> = rfc822_like::from_str(&folded)
            .map_err(|e| DebError::InvalidControl(e.to_string()))?;
        if paragraphs.is_empty() {
            return Err(DebError::InvalidControl("empty control file".to_string()));
        }
        let fields = paragraphs.swap_remove(0);

        for (field, value) in [
            ("Package", &fields.package),
            ("Version", &fields.version),
            ("Architecture", &fields.architecture),
        ] {
            if value.trim().is_empty() {
                return Err(DebError::InvalidControl(format!("{} field is empty", field)));
            }
        }

        let mut depends = Vec::new();
        for field in [&fields.pre_depends, &fields.depends].into_iter().flatten() {
            for dep in parse_relationship_field(field) {
                if !depends.contains(&dep) {
                    depends.push(dep);
                }
            }
        }

        let package = Self {
            path: path.to_path_buf(),
            identifier: fields.package.trim().to_string(),
            name: fields.name.map(|n| n.trim().to_string()),
            version: fields.version.trim().to_string(),
            architecture: fields.architecture.trim().to_string(),
            depends,
            conflicts: fields
                .conflicts
                .as_deref()
                .map(parse_relationship_field)
                .unwrap_or_default(),
            essential: fields
                .essential
                .is_some_and(|e| e.trim().eq_ignore_ascii_case("yes")),
            description: fields
                .description
                .and_then(|d| d.lines().next().map(|l| l.trim().to_string())),
            installed_size: fields
                .installed_size
                .and_then(|s| s.trim().parse().ok()),
        };

        info!(
            "Validated local package {} {} ({})",
            package.identifier, package.version, package.architecture
        );
        Ok(package)
    }

    /// Cache record for this package, not yet installed
    pub fn to_package(&self) -> Package {
        let mut package = Package::new(&self.identifier, &self.version)
            .with_architecture(&self.architecture);
        package.name = self.name.clone();
        package.essential = self.essential;
        package
    }
}

/// Join continuation lines onto their field so every field is one line
///
/// Only the synopsis of `Description` is kept.
fn fold_continuations(control: &str) -> String {
    let mut folded = String::with_capacity(control.len());
    let mut in_description = false;

    for line in control.lines() {
        if line.starts_with([' ', '\t']) {
            if !in_description && !folded.is_empty() {
                folded.pop();
                folded.push(' ');
                folded.push_str(line.trim());
                folded.push('\n');
            }
            continue;
        }
        in_description = line.starts_with("Description:");
        folded.push_str(line);
        folded.push('\n');
    }
    folded
}

/// Decompress a control.tar member and return its `control` file
fn read_control<R: Read>(
    member: R,
    compression: MemberCompression,
    max_control_size: u64,
) -> std::result::Result<String, DebError> {
    let mut tar = tar::Archive::new(compression.decoder(member)?);

    for entry in tar.entries()? {
        let mut entry = entry?;
        let entry_path = entry.path()?.to_path_buf();
        let normalized = entry_path.strip_prefix("./").unwrap_or(&entry_path);
        if normalized == Path::new("control") {
            let raw = read_limited(&mut entry, max_control_size)?;
            return String::from_utf8(raw)
                .map_err(|_| DebError::InvalidControl("control file is not UTF-8".to_string()));
        }
    }

    Err(DebError::MissingMember("control file"))
}
