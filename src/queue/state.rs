// src/queue/state.rs

//! Mutable queue state
//!
//! Everything here runs under the queue's lock. Each operation updates the
//! entry store and the dependency tracker together and reports whether it did
//! anything; [`QueueState::publish`] then rebuilds the snapshot.
//!
//! Expansion is a worklist, not recursion: a new entry asks the cache what it
//! needs, links each target in the tracker and queues newly placed targets for
//! their own expansion. Removal goes the other way, releasing links and
//! collecting every auto entry left without a requester.

use super::essential::essential_removals;
use super::issues::compute_issues;
use super::store::{EntryStore, Placement};
use super::tracker::{Anomaly, AutoKind, DependencyTracker};
use super::types::{Origin, QueueEntry, QueueSnapshot, QueueType};
use crate::cache::PackageCache;
use crate::packages::Package;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub(crate) struct QueueState {
    store: EntryStore,
    tracker: DependencyTracker,
    snapshot: Arc<QueueSnapshot>,
    max_depth: usize,
}

impl QueueState {
    pub fn new(max_depth: usize) -> Self {
        Self {
            store: EntryStore::new(),
            tracker: DependencyTracker::new(),
            snapshot: Arc::new(QueueSnapshot::default()),
            max_depth,
        }
    }

    pub fn snapshot(&self) -> Arc<QueueSnapshot> {
        Arc::clone(&self.snapshot)
    }

    pub fn is_user_requested(&self, identifier: &str) -> bool {
        self.store.is_user_requested(identifier)
    }

    /// Queue `identifier` as user-requested in `queue_type`
    pub fn add_user(
        &mut self,
        identifier: &str,
        queue_type: QueueType,
        cache: &dyn PackageCache,
    ) -> bool {
        match self.store.place_user(identifier, queue_type) {
            Placement::Unchanged => {
                debug!("{} already queued for {}", identifier, queue_type);
                return false;
            }
            Placement::Inserted => {
                info!("Queued {} for {}", identifier, queue_type);
                self.expand(identifier, cache);
            }
            Placement::Promoted => {
                info!("{} is now explicitly queued for {}", identifier, queue_type);
                self.tracker.clear_anomalies(identifier);
                self.expand(identifier, cache);
            }
            Placement::Moved { from } => {
                info!("Moved {} from {} to {}", identifier, from, queue_type);
                // Whatever it pulled in for the old bucket no longer applies
                let orphans = self.tracker.release(identifier);
                self.expand(identifier, cache);
                let mut touched = self.collect(orphans);
                touched.push(identifier.to_string());
                self.refresh(&touched, cache);
            }
        }
        true
    }

    /// Drop the user request for `identifier`
    ///
    /// Returns false if `identifier` is absent or only auto-pulled.
    pub fn remove_user(&mut self, identifier: &str, cache: &dyn PackageCache) -> bool {
        let Some(entry) = self.store.get(identifier).filter(|e| e.user_requested) else {
            debug!("{} is not a user request, nothing to remove", identifier);
            return false;
        };

        let orphans = self.tracker.release(identifier);
        let mut touched = vec![identifier.to_string()];

        match self.tracker.kind_of(identifier) {
            Some(kind) => {
                // Still needed by other entries: keep it as their auto entry
                let bucket = auto_bucket(kind, identifier, cache);
                if entry.queue_type == bucket {
                    self.store.demote(identifier);
                } else {
                    self.store.remove(identifier);
                    self.store.place_auto(identifier, bucket);
                }
                info!(
                    "{} is still required; kept in {} as an automatic entry",
                    identifier, bucket
                );
                self.expand(identifier, cache);
            }
            None => {
                self.store.remove(identifier);
                self.tracker.forget(identifier);
                info!("Removed {} from the queue", identifier);
            }
        }

        touched.extend(self.collect(orphans));
        self.refresh(&touched, cache);
        true
    }

    /// Empty everything; false if there was nothing to clear
    pub fn clear(&mut self) -> bool {
        if self.store.is_empty() && self.tracker.is_empty() {
            return false;
        }
        info!("Clearing {} queued packages", self.store.len());
        self.store.clear();
        self.tracker.clear();
        true
    }

    /// Rebuild the snapshot; returns true if it differs from the last one
    pub fn publish(&mut self, cache: &dyn PackageCache) -> bool {
        let mut entries: Vec<QueueEntry> = self
            .store
            .iter()
            .map(|(identifier, stored)| QueueEntry {
                identifier: identifier.to_string(),
                queue_type: stored.queue_type,
                origin: self.origin_of(identifier, stored.user_requested),
            })
            .collect();
        entries.sort_by(|a, b| {
            a.queue_type
                .cmp(&b.queue_type)
                .then_with(|| a.identifier.cmp(&b.identifier))
        });

        let snapshot = QueueSnapshot {
            entries,
            issues: compute_issues(&self.store, &self.tracker, cache),
            essential_removals: essential_removals(&self.store, cache),
        };

        if *self.snapshot == snapshot {
            return false;
        }
        self.snapshot = Arc::new(snapshot);
        true
    }

    fn origin_of(&self, identifier: &str, user_requested: bool) -> Origin {
        if user_requested {
            return Origin::UserRequested;
        }
        match self.tracker.requirement(identifier) {
            Some(requirement) => {
                let requesters = requirement.requesters.clone();
                match requirement.kind {
                    AutoKind::Conflict => Origin::AutoConflict { requesters },
                    AutoKind::Dependency | AutoKind::Dependent => {
                        Origin::AutoDependency { requesters }
                    }
                }
            }
            None => {
                warn!("Automatic entry {} has no requesters", identifier);
                Origin::AutoDependency {
                    requesters: Default::default(),
                }
            }
        }
    }

    /// Pull in everything `root` needs, breadth limited by the depth guard
    fn expand(&mut self, root: &str, cache: &dyn PackageCache) {
        let mut worklist = vec![(root.to_string(), 0usize)];

        while let Some((identifier, depth)) = worklist.pop() {
            let Some(entry) = self.store.get(&identifier) else {
                continue;
            };
            let Some(package) = cache.resolve(&identifier) else {
                continue;
            };

            let targets = wanted_targets(&package, entry.queue_type, cache);
            if targets.is_empty() {
                continue;
            }
            if depth >= self.max_depth {
                warn!(
                    "Not expanding {}: dependency chain exceeds {} levels",
                    identifier, self.max_depth
                );
                self.tracker.record(
                    &identifier,
                    Anomaly::TooDeep {
                        depth: self.max_depth,
                    },
                );
                continue;
            }

            for (target, kind) in targets {
                match self.tracker.link(&identifier, &target, kind) {
                    Ok(_) => {
                        let bucket = auto_bucket(kind, &target, cache);
                        if self.store.place_auto(&target, bucket) {
                            debug!("Pulled {} into {} for {}", target, bucket, identifier);
                            worklist.push((target, depth + 1));
                        } else if depth + 1 < self.max_depth
                            && self.tracker.stopped_too_deep(&target)
                        {
                            // Reached again through a shorter chain
                            debug!("Retrying expansion of {} at depth {}", target, depth + 1);
                            self.tracker.clear_anomalies(&target);
                            worklist.push((target, depth + 1));
                        }
                    }
                    Err(_)
                        if kind == AutoKind::Dependent
                            && self
                                .store
                                .get(&target)
                                .is_some_and(|e| e.queue_type.is_removal()) =>
                    {
                        // Mutually dependent installed packages: both are
                        // already leaving, so there is nothing to follow
                        debug!("{} already queued for removal alongside {}", target, identifier);
                    }
                    Err(anomaly) => {
                        warn!("{}: {}", identifier, anomaly);
                        self.tracker.record(&identifier, anomaly);
                    }
                }
            }
        }
    }

    /// Remove auto entries in `candidates` that nothing requires any more,
    /// following the cascade; returns what was removed
    fn collect(&mut self, candidates: Vec<String>) -> Vec<String> {
        let mut removed = Vec::new();
        let mut pending = candidates;

        while let Some(identifier) = pending.pop() {
            if !self.store.contains(&identifier)
                || self.store.is_user_requested(&identifier)
                || self.tracker.is_required(&identifier)
            {
                continue;
            }
            self.store.remove(&identifier);
            debug!("Dropped {}: no longer required", identifier);
            pending.extend(self.tracker.forget(&identifier));
            removed.push(identifier);
        }
        removed
    }

    /// Retry expansion for entries whose recorded anomalies involve `touched`
    fn refresh(&mut self, touched: &[String], cache: &dyn PackageCache) {
        for requester in self.tracker.requesters_with_anomaly_about(touched) {
            self.tracker.clear_anomalies(&requester);
            if self.store.contains(&requester) {
                debug!("Re-expanding {}", requester);
                self.expand(&requester, cache);
            }
        }
    }
}

/// Targets an entry in `queue_type` pulls into the queue
fn wanted_targets(
    package: &Package,
    queue_type: QueueType,
    cache: &dyn PackageCache,
) -> Vec<(String, AutoKind)> {
    let mut targets = Vec::new();

    if queue_type.is_removal() {
        for dependent in cache.dependents_of(package) {
            targets.push((dependent, AutoKind::Dependent));
        }
    } else {
        for dependency in cache.dependencies_of(package) {
            targets.push((dependency, AutoKind::Dependency));
        }
        for conflict in cache.conflicts_of(package) {
            // Only installed conflicts need removing
            if cache.resolve(&conflict).is_some_and(|p| p.is_installed()) {
                targets.push((conflict, AutoKind::Conflict));
            }
        }
    }

    targets.retain(|(target, _)| *target != package.identifier);
    targets
}

/// Bucket an auto entry of `kind` goes into
fn auto_bucket(kind: AutoKind, target: &str, cache: &dyn PackageCache) -> QueueType {
    if kind.wants_removal() {
        QueueType::Remove
    } else if cache.resolve(target).is_some_and(|p| p.is_installed()) {
        QueueType::Upgrade
    } else {
        QueueType::Install
    }
}
