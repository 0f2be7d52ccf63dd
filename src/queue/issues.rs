// src/queue/issues.rs

//! Issue computation
//!
//! Issues are derived from the current entries, the tracker and the package
//! cache on every mutation. Nothing here keeps state between runs.

use super::store::EntryStore;
use super::tracker::DependencyTracker;
use super::types::{Issue, IssueReason, QueueType};
use crate::cache::PackageCache;
use crate::packages::Package;
use crate::version::compare_versions;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Compute the full identifier -> issues mapping
pub fn compute_issues(
    store: &EntryStore,
    tracker: &DependencyTracker,
    cache: &dyn PackageCache,
) -> BTreeMap<String, Vec<Issue>> {
    let mut found: BTreeMap<String, BTreeSet<Issue>> = BTreeMap::new();
    let mut present: BTreeMap<&str, Package> = BTreeMap::new();

    for (identifier, entry) in store.iter() {
        let Some(package) = cache.resolve(identifier) else {
            add(&mut found, Issue::new(identifier, IssueReason::NotFound));
            continue;
        };

        if matches!(entry.queue_type, QueueType::Install | QueueType::Reinstall)
            && is_already_installed(&package)
        {
            add(&mut found, Issue::new(identifier, IssueReason::AlreadyInstalled));
        } else if !cache.is_satisfied(&package, entry.queue_type) {
            add(
                &mut found,
                Issue::new(identifier, IssueReason::Unknown)
                    .with_detail(format!("cannot be queued for {}", entry.queue_type)),
            );
        }

        for (target, kind) in tracker.pulled_by(identifier) {
            let Some(target_entry) = store.get(target) else {
                continue;
            };
            if kind.wants_removal() != target_entry.queue_type.is_removal() {
                let wanted = if kind.wants_removal() { "removed" } else { "present" };
                add(
                    &mut found,
                    Issue::new(identifier, IssueReason::Unknown).with_detail(format!(
                        "needs {} to be {}, but it is queued for {}",
                        target, wanted, target_entry.queue_type
                    )),
                );
            }
        }

        for anomaly in tracker.anomalies(identifier) {
            add(
                &mut found,
                Issue::new(identifier, IssueReason::Unknown).with_detail(anomaly.describe()),
            );
        }

        if !entry.queue_type.is_removal() {
            present.insert(identifier, package);
        }
    }

    // Conflicts are checked between every pair that survives the commit
    for (identifier, package) in &present {
        for other in cache.conflicts_of(package) {
            if other == *identifier || !present.contains_key(other.as_str()) {
                continue;
            }
            add(
                &mut found,
                Issue::new(*identifier, IssueReason::Conflict { with: other.clone() }),
            );
            add(
                &mut found,
                Issue::new(
                    other.as_str(),
                    IssueReason::Conflict {
                        with: identifier.to_string(),
                    },
                ),
            );
        }
    }

    found
        .into_iter()
        .map(|(identifier, issues)| (identifier, issues.into_iter().collect()))
        .collect()
}

fn add(found: &mut BTreeMap<String, BTreeSet<Issue>>, issue: Issue) {
    found
        .entry(issue.identifier.clone())
        .or_default()
        .insert(issue);
}

fn is_already_installed(package: &Package) -> bool {
    package
        .installed_version
        .as_deref()
        .is_some_and(|installed| compare_versions(installed, &package.version) == Ordering::Equal)
}
