// tests/queue_behavior.rs

//! Queue mutation, provenance and notification tests.

mod common;

use common::{drain_events, pkg, rendered, sample_queue};
use conary_queue::{IssueReason, Origin, QueueType};
use std::collections::BTreeSet;
use std::sync::Arc;
use strum::IntoEnumIterator;

#[test]
fn test_foo_pulls_libfoo_and_releases_it() {
    let (_cache, queue) = sample_queue();
    let mut rx = queue.subscribe();

    assert!(queue.add_package(&pkg("foo"), QueueType::Install));
    assert_eq!(
        rendered(&queue.queued_packages()),
        vec!["foo:install:user", "libfoo:install:dependency{foo}"]
    );
    assert!(queue.issues().is_empty());
    assert_eq!(drain_events(&mut rx), 1);

    assert!(queue.remove_package(&pkg("foo")));
    assert!(queue.queued_packages().is_empty());
    assert_eq!(queue.count(), 0);
    assert_eq!(drain_events(&mut rx), 1);
}

#[test]
fn test_shared_dependency_survives_until_last_requester() {
    let (_cache, queue) = sample_queue();
    queue.add_package(&pkg("foo"), QueueType::Install);
    queue.add_package(&pkg("bar"), QueueType::Install);

    let snapshot = queue.snapshot();
    let libfoo = snapshot.entry("libfoo").unwrap();
    let expected: BTreeSet<String> = ["bar".to_string(), "foo".to_string()].into();
    assert_eq!(libfoo.origin.requesters(), Some(&expected));

    queue.remove_package(&pkg("foo"));
    let snapshot = queue.snapshot();
    assert_eq!(
        snapshot.entry("libfoo").unwrap().to_string(),
        "libfoo:install:dependency{bar}"
    );
    assert!(snapshot.entry("foo").is_none());

    queue.remove_package(&pkg("bar"));
    assert_eq!(queue.count(), 0);
}

#[test]
fn test_identifier_occupies_one_bucket() {
    let (_cache, queue) = sample_queue();

    for queue_type in QueueType::iter() {
        queue.add_package(&pkg("curl"), queue_type);
        queue.add_package(&pkg("foo"), queue_type);

        let entries = queue.queued_packages();
        let mut seen = BTreeSet::new();
        for entry in &entries {
            assert!(
                seen.insert(entry.identifier.clone()),
                "{} appears twice after moving to {}",
                entry.identifier,
                queue_type
            );
        }
        assert_eq!(queue.snapshot().entry("curl").unwrap().queue_type, queue_type);
    }
}

#[test]
fn test_add_is_idempotent() {
    let (_cache, queue) = sample_queue();
    let mut rx = queue.subscribe();

    queue.add_package(&pkg("bar"), QueueType::Install);
    let before = queue.snapshot();
    assert_eq!(drain_events(&mut rx), 1);

    assert!(!queue.add_package(&pkg("bar"), QueueType::Install));
    assert_eq!(*queue.snapshot(), *before);
    assert_eq!(drain_events(&mut rx), 0);
}

#[test]
fn test_essential_removal_is_visible() {
    let (_cache, queue) = sample_queue();
    assert!(!queue.has_essential_packages());

    queue.add_package(&pkg("libc6"), QueueType::Remove);
    assert!(queue.has_essential_packages());
    assert_eq!(queue.essential_removals(), vec!["libc6"]);
    // Installed packages depending on libc6 go with it
    assert_eq!(
        rendered(&queue.queued(QueueType::Remove)),
        vec!["app:remove:dependency{libc6}", "libc6:remove:user"]
    );

    queue.remove_package(&pkg("libc6"));
    assert!(!queue.has_essential_packages());
    assert_eq!(queue.count(), 0);
}

#[test]
fn test_clear_is_total() {
    let (_cache, queue) = sample_queue();
    let mut rx = queue.subscribe();
    queue.add_package(&pkg("bar"), QueueType::Install);
    queue.add_package(&pkg("ghost"), QueueType::Install);
    queue.add_package(&pkg("cyc-a"), QueueType::Install);
    queue.add_package(&pkg("libc6"), QueueType::Remove);
    assert!(!queue.issues().is_empty());
    drain_events(&mut rx);

    assert!(queue.clear());
    assert_eq!(queue.count(), 0);
    assert!(queue.queued_packages().is_empty());
    assert!(queue.issues().is_empty());
    assert!(!queue.has_essential_packages());
    assert_eq!(drain_events(&mut rx), 1);

    assert!(!queue.clear());
    assert_eq!(drain_events(&mut rx), 0);
}

#[test]
fn test_installed_conflict_is_queued_for_removal() {
    let (_cache, queue) = sample_queue();
    queue.add_package(&pkg("vim"), QueueType::Install);

    assert_eq!(
        rendered(&queue.queued_packages()),
        vec!["vim:install:user", "vim-tiny:remove:conflict{vim}"]
    );
    assert!(queue.issues().is_empty());

    queue.remove_package(&pkg("vim"));
    assert_eq!(queue.count(), 0);
}

#[test]
fn test_conflicting_entries_reported_pairwise() {
    let (_cache, queue) = sample_queue();
    queue.add_package(&pkg("vim"), QueueType::Install);
    queue.add_package(&pkg("vim-tiny"), QueueType::Reinstall);

    let issues = queue.issues();
    assert!(issues["vim"].iter().any(|i| i.reason
        == IssueReason::Conflict {
            with: "vim-tiny".to_string()
        }));
    assert!(issues["vim-tiny"].iter().any(|i| i.reason
        == IssueReason::Conflict {
            with: "vim".to_string()
        }));
    assert!(issues["vim"].iter().any(|i| i.reason == IssueReason::Unknown));

    // Withdrawing the reinstall hands vim-tiny back to the conflict removal
    queue.remove_package(&pkg("vim-tiny"));
    assert_eq!(
        queue.snapshot().entry("vim-tiny").unwrap().to_string(),
        "vim-tiny:remove:conflict{vim}"
    );
    assert!(queue.issues().is_empty());
}

#[test]
fn test_dependency_cycle_is_an_unknown_issue() {
    let (_cache, queue) = sample_queue();
    queue.add_package(&pkg("cyc-a"), QueueType::Install);

    assert_eq!(
        rendered(&queue.queued_packages()),
        vec!["cyc-a:install:user", "cyc-b:install:dependency{cyc-a}"]
    );
    let issues = queue.issues();
    let issue = &issues["cyc-b"][0];
    assert_eq!(issue.reason, IssueReason::Unknown);
    assert_eq!(
        issue.detail.as_deref(),
        Some("dependency cycle detected: cyc-b -> cyc-a -> cyc-b")
    );

    queue.remove_package(&pkg("cyc-a"));
    assert_eq!(queue.count(), 0);
    assert!(queue.issues().is_empty());
}

#[test]
fn test_required_user_entry_is_demoted() {
    let (_cache, queue) = sample_queue();
    queue.add_package(&pkg("foo"), QueueType::Install);

    assert!(!queue.can_remove_package(&pkg("libfoo")));
    assert!(queue.add_package(&pkg("libfoo"), QueueType::Install));
    assert_eq!(
        queue.snapshot().entry("libfoo").unwrap().origin,
        Origin::UserRequested
    );
    assert!(queue.can_remove_package(&pkg("libfoo")));

    assert!(queue.remove_package(&pkg("libfoo")));
    assert_eq!(
        queue.snapshot().entry("libfoo").unwrap().to_string(),
        "libfoo:install:dependency{foo}"
    );

    queue.remove_package(&pkg("foo"));
    assert_eq!(queue.count(), 0);
}

#[test]
fn test_removing_auto_entry_is_noop() {
    let (_cache, queue) = sample_queue();
    queue.add_package(&pkg("foo"), QueueType::Install);
    let mut rx = queue.subscribe();

    assert!(!queue.remove_package(&pkg("libfoo")));
    assert!(!queue.remove_package(&pkg("absent")));
    assert_eq!(queue.count(), 2);
    assert_eq!(drain_events(&mut rx), 0);
}

#[test]
fn test_moving_bucket_drops_old_dependencies() {
    let (_cache, queue) = sample_queue();
    queue.add_package(&pkg("foo"), QueueType::Install);
    assert!(queue.add_package(&pkg("foo"), QueueType::Remove));

    assert_eq!(rendered(&queue.queued_packages()), vec!["foo:remove:user"]);
    // foo is not installed, so removing it cannot be satisfied
    let issues = queue.issues();
    assert_eq!(issues["foo"][0].reason, IssueReason::Unknown);
    assert_eq!(
        issues["foo"][0].detail.as_deref(),
        Some("cannot be queued for remove")
    );
}

#[test]
fn test_issue_reasons() {
    let (_cache, queue) = sample_queue();
    queue.add_package(&pkg("ghost"), QueueType::Install);
    queue.add_package(&pkg("vim-tiny"), QueueType::Install);
    queue.add_package(&pkg("vim"), QueueType::Reinstall);
    queue.add_package(&pkg("curl"), QueueType::Upgrade);

    let issues = queue.issues();
    assert_eq!(issues["ghost"][0].reason, IssueReason::NotFound);
    assert_eq!(issues["vim-tiny"][0].reason, IssueReason::AlreadyInstalled);
    assert!(issues["vim"].iter().any(|i| i.reason == IssueReason::Unknown));
    assert!(!issues.contains_key("curl"));
    assert_eq!(queue.count(), 4);
}

#[test]
fn test_concurrent_callers_leave_consistent_state() {
    let (_cache, queue) = sample_queue();
    let queue = Arc::new(queue);

    std::thread::scope(|scope| {
        for id in ["foo", "bar", "vim", "cyc-a"] {
            let queue = Arc::clone(&queue);
            scope.spawn(move || {
                for _ in 0..50 {
                    queue.add_package(&pkg(id), QueueType::Install);
                    let snapshot = queue.snapshot();
                    let ids: BTreeSet<_> =
                        snapshot.entries.iter().map(|e| &e.identifier).collect();
                    assert_eq!(ids.len(), snapshot.count());
                    queue.remove_package(&pkg(id));
                }
            });
        }
    });

    assert_eq!(queue.count(), 0);
    assert!(queue.issues().is_empty());
}
