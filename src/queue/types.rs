// src/queue/types.rs

//! Public data types exposed by the queue

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use strum_macros::{Display, EnumIter, EnumString};

/// The bucket a queued package sits in
///
/// Variants are declared in display order; `queued_packages` is sorted by it.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum QueueType {
    Install,
    Remove,
    Reinstall,
    Upgrade,
    Downgrade,
}

impl QueueType {
    /// Whether packages in this bucket are absent after commit
    pub fn is_removal(self) -> bool {
        matches!(self, QueueType::Remove)
    }
}

/// Why an entry is in the queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Origin {
    /// Added by an explicit caller request naming this package
    UserRequested,
    /// Pulled in because the requesters need it (or, for removals, because it
    /// depends on a package being removed)
    AutoDependency { requesters: BTreeSet<String> },
    /// Queued for removal because the requesters conflict with it
    AutoConflict { requesters: BTreeSet<String> },
}

impl Origin {
    pub fn is_user_requested(&self) -> bool {
        matches!(self, Origin::UserRequested)
    }

    /// Requester set for auto-pulled entries
    pub fn requesters(&self) -> Option<&BTreeSet<String>> {
        match self {
            Origin::UserRequested => None,
            Origin::AutoDependency { requesters } | Origin::AutoConflict { requesters } => {
                Some(requesters)
            }
        }
    }
}

/// One queued package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueEntry {
    pub identifier: String,
    pub queue_type: QueueType,
    pub origin: Origin,
}

impl fmt::Display for QueueEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.identifier, self.queue_type)?;
        match &self.origin {
            Origin::UserRequested => write!(f, ":user"),
            Origin::AutoDependency { requesters } => write!(
                f,
                ":dependency{{{}}}",
                requesters.iter().cloned().collect::<Vec<_>>().join(",")
            ),
            Origin::AutoConflict { requesters } => write!(
                f,
                ":conflict{{{}}}",
                requesters.iter().cloned().collect::<Vec<_>>().join(",")
            ),
        }
    }
}

/// Why a queued package cannot be committed as-is
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum IssueReason {
    /// The identifier no longer resolves to a cache record
    NotFound,
    /// The installed version already matches the candidate
    AlreadyInstalled,
    /// Another queued package conflicts with this one
    Conflict { with: String },
    /// Anything else the cache or tracker could not resolve
    Unknown,
}

/// A problem attached to a queued identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Issue {
    pub identifier: String,
    #[serde(flatten)]
    pub reason: IssueReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Issue {
    pub fn new(identifier: impl Into<String>, reason: IssueReason) -> Self {
        Self {
            identifier: identifier.into(),
            reason,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            IssueReason::NotFound => write!(f, "{}: not found", self.identifier)?,
            IssueReason::AlreadyInstalled => write!(f, "{}: already installed", self.identifier)?,
            IssueReason::Conflict { with } => {
                write!(f, "{}: conflicts with {}", self.identifier, with)?
            }
            IssueReason::Unknown => write!(f, "{}: unresolved", self.identifier)?,
        }
        if let Some(detail) = &self.detail {
            write!(f, " ({})", detail)?;
        }
        Ok(())
    }
}

/// Notification published after every state-changing operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueEvent {
    /// The queue changed; re-read the views
    Changed,
}

/// Consistent view of the queue published after each mutation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueSnapshot {
    /// All entries ordered by bucket, then identifier
    pub entries: Vec<QueueEntry>,
    /// Issues keyed by identifier
    pub issues: BTreeMap<String, Vec<Issue>>,
    /// Essential packages currently queued for removal
    pub essential_removals: Vec<String>,
}

impl QueueSnapshot {
    /// Number of distinct queued identifiers
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_essential_packages(&self) -> bool {
        !self.essential_removals.is_empty()
    }

    /// Entries in one bucket
    pub fn bucket(&self, queue_type: QueueType) -> impl Iterator<Item = &QueueEntry> {
        self.entries
            .iter()
            .filter(move |e| e.queue_type == queue_type)
    }

    /// Entry for `identifier`, if queued
    pub fn entry(&self, identifier: &str) -> Option<&QueueEntry> {
        self.entries.iter().find(|e| e.identifier == identifier)
    }
}
