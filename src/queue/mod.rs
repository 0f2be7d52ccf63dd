// src/queue/mod.rs

//! Package transaction queue
//!
//! The queue stages packages for install, removal, reinstallation, upgrade
//! or downgrade before anything is handed to the executor. It records who
//! asked for each entry (the user, or another queued package), pulls in
//! unmet dependencies and installed conflicts through the [`PackageCache`],
//! garbage-collects automatic entries once nothing needs them, and derives
//! an issue list describing why the staged set cannot be committed as-is.
//!
//! # Concurrency
//!
//! A [`Queue`] is an explicitly constructed service; share it as
//! `Arc<Queue>`. All mutations and snapshot reads go through one mutex, so a
//! reader sees either the state before a call or the state after it, never a
//! half-applied cascade. Every call that changes the observable state sends
//! exactly one [`QueueEvent::Changed`] to subscribers.
//!
//! # Example
//!
//! ```
//! use conary_queue::cache::{MemoryCache, PackageRecord};
//! use conary_queue::{Package, Queue, QueueType};
//! use std::sync::Arc;
//!
//! let cache = Arc::new(MemoryCache::from_records([
//!     PackageRecord::new(Package::new("foo", "1.0")).depends_on("libfoo"),
//!     PackageRecord::new(Package::new("libfoo", "1.0")),
//! ]));
//! let queue = Queue::new(cache.clone());
//!
//! let foo = Package::new("foo", "1.0");
//! queue.add_package(&foo, QueueType::Install);
//! assert_eq!(queue.count(), 2);
//!
//! queue.remove_package(&foo);
//! assert_eq!(queue.count(), 0);
//! ```

mod essential;
mod issues;
mod state;
mod store;
mod tracker;
mod types;

pub use types::{
    Issue, IssueReason, Origin, QueueEntry, QueueEvent, QueueSnapshot, QueueType,
};

use crate::cache::PackageCache;
use crate::config::QueueConfig;
use crate::error::Result;
use crate::packages::{DebPackage, Package};
use parking_lot::Mutex;
use state::QueueState;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Staged package transaction set
pub struct Queue {
    cache: Arc<dyn PackageCache>,
    config: QueueConfig,
    state: Mutex<QueueState>,
    event_tx: broadcast::Sender<QueueEvent>,
}

impl Queue {
    /// Create a queue with default configuration
    pub fn new(cache: Arc<dyn PackageCache>) -> Self {
        Self::with_config(cache, QueueConfig::default())
    }

    pub fn with_config(cache: Arc<dyn PackageCache>, config: QueueConfig) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));
        let state = Mutex::new(QueueState::new(config.max_dependency_depth));

        Self {
            cache,
            config,
            state,
            event_tx,
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Subscribe to change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.event_tx.subscribe()
    }

    /// Queue `package` as a user request in `queue_type`
    ///
    /// A package already queued elsewhere is moved; an automatic entry in the
    /// same bucket becomes user-requested. Requests the cache cannot satisfy
    /// are still stored and show up in [`Queue::issues`]. Returns true if the
    /// queue changed.
    pub fn add_package(&self, package: &Package, queue_type: QueueType) -> bool {
        let mut state = self.state.lock();
        if !state.add_user(&package.identifier, queue_type, self.cache.as_ref()) {
            return false;
        }
        self.commit(&mut state)
    }

    /// Drop the user request for `package`
    ///
    /// Automatic entries that only existed for `package` are removed with it.
    /// Returns false (and changes nothing) if `package` is not a user request.
    pub fn remove_package(&self, package: &Package) -> bool {
        let mut state = self.state.lock();
        if !state.remove_user(&package.identifier, self.cache.as_ref()) {
            return false;
        }
        self.commit(&mut state)
    }

    /// Whether `package` has a user-requested entry that
    /// [`Queue::remove_package`] would act on
    pub fn can_remove_package(&self, package: &Package) -> bool {
        self.state.lock().is_user_requested(&package.identifier)
    }

    /// Validate a local `.deb` and queue it for install
    ///
    /// Validation runs before the queue is locked. On failure the queue is
    /// untouched and no notification is sent.
    pub fn queue_local_package(&self, path: impl AsRef<Path>) -> Result<Package> {
        let path = path.as_ref();
        let deb = DebPackage::inspect(path, self.config.max_control_size).inspect_err(|e| {
            warn!("Rejected local package: {}", e);
        })?;
        info!("Queueing local package {} for install", deb.identifier);

        let mut state = self.state.lock();
        let package = self.cache.register_local(&deb)?;
        state.add_user(&package.identifier, QueueType::Install, self.cache.as_ref());
        // Re-registering an already queued package can still change its issues
        self.commit(&mut state);
        Ok(package)
    }

    /// Remove every entry; returns false if the queue was already empty
    pub fn clear(&self) -> bool {
        let mut state = self.state.lock();
        if !state.clear() {
            return false;
        }
        self.commit(&mut state)
    }

    /// Recompute issues after the package cache changed underneath the queue
    ///
    /// Notifies subscribers only if the result differs.
    pub fn refresh_issues(&self) -> bool {
        let mut state = self.state.lock();
        self.commit(&mut state)
    }

    /// Current issues keyed by identifier
    pub fn issues(&self) -> BTreeMap<String, Vec<Issue>> {
        self.snapshot().issues.clone()
    }

    /// All entries, ordered by bucket then identifier
    pub fn queued_packages(&self) -> Vec<QueueEntry> {
        self.snapshot().entries.clone()
    }

    /// Entries in one bucket
    pub fn queued(&self, queue_type: QueueType) -> Vec<QueueEntry> {
        self.snapshot().bucket(queue_type).cloned().collect()
    }

    /// Number of distinct queued identifiers
    pub fn count(&self) -> usize {
        self.snapshot().count()
    }

    /// True if an essential package is queued for removal
    pub fn has_essential_packages(&self) -> bool {
        self.snapshot().has_essential_packages()
    }

    pub fn essential_removals(&self) -> Vec<String> {
        self.snapshot().essential_removals.clone()
    }

    /// Consistent view of entries, issues and essential removals
    pub fn snapshot(&self) -> Arc<QueueSnapshot> {
        self.state.lock().snapshot()
    }

    /// Publish the new snapshot and notify, if anything observable changed
    fn commit(&self, state: &mut QueueState) -> bool {
        if !state.publish(self.cache.as_ref()) {
            return false;
        }
        // No subscribers is not an error
        let _ = self.event_tx.send(QueueEvent::Changed);
        true
    }
}

impl std::fmt::Debug for Queue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue")
            .field("config", &self.config)
            .field("count", &self.count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryCache, PackageRecord};
    use tokio::sync::broadcast::error::TryRecvError;

    fn queue() -> (Arc<MemoryCache>, Queue) {
        let cache = Arc::new(MemoryCache::from_records([
            PackageRecord::new(Package::new("foo", "1.0")).depends_on("libfoo"),
            PackageRecord::new(Package::new("libfoo", "1.0")),
            PackageRecord::new(Package::new("base", "1").installed("1").essential()),
        ]));
        let queue = Queue::new(cache.clone());
        (cache, queue)
    }

    #[test]
    fn test_noop_sends_nothing() {
        let (_cache, queue) = queue();
        let mut rx = queue.subscribe();
        let foo = Package::new("foo", "1.0");

        assert!(queue.add_package(&foo, QueueType::Install));
        assert_eq!(rx.try_recv(), Ok(QueueEvent::Changed));
        assert!(!queue.add_package(&foo, QueueType::Install));
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));

        assert!(!queue.remove_package(&Package::new("libfoo", "1.0")));
        assert!(!queue.can_remove_package(&Package::new("libfoo", "1.0")));
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn test_refresh_after_cache_change() {
        let (cache, queue) = queue();
        queue.add_package(&Package::new("foo", "1.0"), QueueType::Install);
        assert!(queue.issues().is_empty());
        assert!(!queue.refresh_issues());

        cache.remove("libfoo");
        let mut rx = queue.subscribe();
        assert!(queue.refresh_issues());
        assert_eq!(rx.try_recv(), Ok(QueueEvent::Changed));
        assert_eq!(queue.issues()["libfoo"][0].reason, IssueReason::NotFound);
    }

    #[test]
    fn test_clear_empty_queue_is_noop() {
        let (_cache, queue) = queue();
        let mut rx = queue.subscribe();
        assert!(!queue.clear());
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn test_config_depth_applies() {
        let cache = Arc::new(MemoryCache::from_records([
            PackageRecord::new(Package::new("a", "1")).depends_on("b"),
            PackageRecord::new(Package::new("b", "1")).depends_on("c"),
            PackageRecord::new(Package::new("c", "1")),
        ]));
        let config = QueueConfig {
            max_dependency_depth: 1,
            ..Default::default()
        };
        let queue = Queue::with_config(cache, config);
        assert_eq!(queue.config().max_dependency_depth, 1);

        queue.add_package(&Package::new("a", "1"), QueueType::Install);
        assert_eq!(queue.count(), 2);
        assert!(queue.issues().contains_key("b"));
    }

    #[test]
    fn test_essential_removal_views() {
        let (_cache, queue) = queue();
        let base = Package::new("base", "1");
        queue.add_package(&base, QueueType::Remove);
        assert!(queue.has_essential_packages());
        assert_eq!(queue.essential_removals(), vec!["base"]);
        assert_eq!(queue.queued(QueueType::Remove).len(), 1);
    }
}
