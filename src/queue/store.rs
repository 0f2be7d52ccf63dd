// src/queue/store.rs

//! Queue entry storage
//!
//! One slot per identifier, so an identifier can never sit in two buckets at
//! once. Provenance beyond "did the user ask for this" lives in the
//! dependency tracker.

use super::types::QueueType;
use std::collections::BTreeMap;

/// Stored state of one queued identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredEntry {
    pub queue_type: QueueType,
    pub user_requested: bool,
}

/// Outcome of placing a user-requested entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Identifier was not queued before
    Inserted,
    /// Identifier changed bucket (and is now user-requested)
    Moved { from: QueueType },
    /// Auto-pulled entry in the same bucket became user-requested
    Promoted,
    /// Already user-requested in this bucket
    Unchanged,
}

/// Map of identifier to its single bucket assignment
#[derive(Debug, Default)]
pub struct EntryStore {
    entries: BTreeMap<String, StoredEntry>,
}

impl EntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, identifier: &str) -> Option<StoredEntry> {
        self.entries.get(identifier).copied()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.contains_key(identifier)
    }

    pub fn is_user_requested(&self, identifier: &str) -> bool {
        self.entries
            .get(identifier)
            .is_some_and(|e| e.user_requested)
    }

    /// Assign `identifier` to `queue_type` as a user-requested entry,
    /// replacing any previous bucket
    pub fn place_user(&mut self, identifier: &str, queue_type: QueueType) -> Placement {
        let new_entry = StoredEntry {
            queue_type,
            user_requested: true,
        };

        match self.entries.insert(identifier.to_string(), new_entry) {
            None => Placement::Inserted,
            Some(old) if old.queue_type != queue_type => Placement::Moved {
                from: old.queue_type,
            },
            Some(old) if !old.user_requested => Placement::Promoted,
            Some(_) => Placement::Unchanged,
        }
    }

    /// Insert an auto-pulled entry; existing entries are left untouched
    ///
    /// Returns true if the identifier was newly inserted.
    pub fn place_auto(&mut self, identifier: &str, queue_type: QueueType) -> bool {
        if self.entries.contains_key(identifier) {
            return false;
        }
        self.entries.insert(
            identifier.to_string(),
            StoredEntry {
                queue_type,
                user_requested: false,
            },
        );
        true
    }

    /// Turn a user-requested entry into an auto-pulled one
    pub fn demote(&mut self, identifier: &str) {
        if let Some(entry) = self.entries.get_mut(identifier) {
            entry.user_requested = false;
        }
    }

    pub fn remove(&mut self, identifier: &str) -> Option<StoredEntry> {
        self.entries.remove(identifier)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in identifier order
    pub fn iter(&self) -> impl Iterator<Item = (&str, StoredEntry)> {
        self.entries.iter().map(|(id, e)| (id.as_str(), *e))
    }

    /// Identifiers in one bucket
    pub fn in_bucket(&self, queue_type: QueueType) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, e)| e.queue_type == queue_type)
            .map(|(id, _)| id.as_str())
            .collect()
    }
}
