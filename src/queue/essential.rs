// src/queue/essential.rs

//! Essential package guard
//!
//! Essential packages may be queued for removal; this only makes the hazard
//! visible so the caller can ask for confirmation before committing.

use super::store::EntryStore;
use super::types::QueueType;
use crate::cache::PackageCache;

/// Essential packages currently sitting in the Remove bucket
pub fn essential_removals(store: &EntryStore, cache: &dyn PackageCache) -> Vec<String> {
    store
        .in_bucket(QueueType::Remove)
        .into_iter()
        .filter(|id| cache.resolve(id).is_some_and(|p| p.essential))
        .map(str::to_string)
        .collect()
}
