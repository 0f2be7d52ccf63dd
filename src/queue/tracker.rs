// src/queue/tracker.rs

//! Dependency tracker
//!
//! Keeps the requester bookkeeping for auto-pulled entries as two explicit
//! maps instead of implicit reference counts:
//!
//! - `required`: target -> which requesters currently need it, and why
//! - `pulled`: requester -> targets it linked
//!
//! Releasing a requester strips it from every requirement it holds and hands
//! back the targets whose requester set became empty. The caller decides
//! whether those targets actually leave the queue (they may be user-requested
//! on their own), which keeps the cascade auditable without a package cache.
//!
//! Links that would close a cycle in the requester graph are refused. The
//! refusal is recorded as an [`Anomaly`] against the requester so it can be
//! reported as an issue instead of recursing forever.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Why an auto entry was pulled into the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoKind {
    /// An unmet dependency of a package being installed or changed
    Dependency,
    /// An installed package that conflicts with a package being installed
    Conflict,
    /// An installed package that depends on a package being removed
    Dependent,
}

impl AutoKind {
    /// Whether the requirement is met by removing the target
    pub fn wants_removal(self) -> bool {
        matches!(self, AutoKind::Conflict | AutoKind::Dependent)
    }
}

/// Live requirement on one auto-pulled target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub kind: AutoKind,
    pub requesters: BTreeSet<String>,
}

/// Something the tracker refused to follow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anomaly {
    /// Following the link would make a package its own transitive requester
    Cycle { path: Vec<String> },
    /// Expansion stopped at the configured depth
    TooDeep { depth: usize },
}

impl Anomaly {
    /// Whether this anomaly involves `identifier`
    pub fn mentions(&self, identifier: &str) -> bool {
        match self {
            Anomaly::Cycle { path } => path.iter().any(|p| p == identifier),
            Anomaly::TooDeep { .. } => false,
        }
    }

    pub fn describe(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomaly::Cycle { path } => write!(f, "dependency cycle detected: {}", path.join(" -> ")),
            Anomaly::TooDeep { depth } => {
                write!(f, "dependency chain deeper than {} levels", depth)
            }
        }
    }
}

/// Requester bookkeeping for auto-pulled queue entries
#[derive(Debug, Default)]
pub struct DependencyTracker {
    required: BTreeMap<String, Requirement>,
    pulled: BTreeMap<String, BTreeSet<String>>,
    anomalies: BTreeMap<String, Vec<Anomaly>>,
}

impl DependencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `requester` needs `target`
    ///
    /// Returns `Ok(true)` when the target had no requirement before, `Ok(false)`
    /// when an existing requirement gained (or already had) this requester, and
    /// `Err` with a cycle anomaly when the link would close a loop. The kind of
    /// an existing requirement is kept.
    pub fn link(&mut self, requester: &str, target: &str, kind: AutoKind) -> Result<bool, Anomaly> {
        if self
            .pulled
            .get(requester)
            .is_some_and(|targets| targets.contains(target))
        {
            return Ok(false);
        }

        if requester == target {
            return Err(Anomaly::Cycle {
                path: vec![requester.to_string(), target.to_string()],
            });
        }

        if let Some(path) = self.path_between(target, requester) {
            let mut cycle = vec![requester.to_string()];
            cycle.extend(path);
            return Err(Anomaly::Cycle { path: cycle });
        }

        self.pulled
            .entry(requester.to_string())
            .or_default()
            .insert(target.to_string());

        let mut created = false;
        self.required
            .entry(target.to_string())
            .or_insert_with(|| {
                created = true;
                Requirement {
                    kind,
                    requesters: BTreeSet::new(),
                }
            })
            .requesters
            .insert(requester.to_string());

        Ok(created)
    }

    /// Strip `requester` from everything it linked
    ///
    /// Returns the targets left without any requester. Anomalies recorded
    /// against the requester are dropped as well.
    pub fn release(&mut self, requester: &str) -> Vec<String> {
        self.anomalies.remove(requester);

        let Some(targets) = self.pulled.remove(requester) else {
            return Vec::new();
        };

        let mut orphans = Vec::new();
        for target in targets {
            if let Some(requirement) = self.required.get_mut(&target) {
                requirement.requesters.remove(requester);
                if requirement.requesters.is_empty() {
                    self.required.remove(&target);
                    orphans.push(target);
                }
            }
        }
        orphans
    }

    /// Remove every trace of an identifier that left the queue
    ///
    /// Returns the targets it was the last requester of.
    pub fn forget(&mut self, identifier: &str) -> Vec<String> {
        let orphans = self.release(identifier);
        if let Some(requirement) = self.required.remove(identifier) {
            for requester in requirement.requesters {
                if let Some(targets) = self.pulled.get_mut(&requester) {
                    targets.remove(identifier);
                    if targets.is_empty() {
                        self.pulled.remove(&requester);
                    }
                }
            }
        }
        orphans
    }

    pub fn requirement(&self, target: &str) -> Option<&Requirement> {
        self.required.get(target)
    }

    pub fn kind_of(&self, target: &str) -> Option<AutoKind> {
        self.required.get(target).map(|r| r.kind)
    }

    pub fn is_required(&self, target: &str) -> bool {
        self.required.contains_key(target)
    }

    /// Targets linked by `requester`, with the kind of their requirement
    pub fn pulled_by(&self, requester: &str) -> Vec<(&str, AutoKind)> {
        self.pulled
            .get(requester)
            .into_iter()
            .flatten()
            .filter_map(|target| {
                self.required
                    .get(target)
                    .map(|requirement| (target.as_str(), requirement.kind))
            })
            .collect()
    }

    /// Attach an anomaly to `requester`; duplicates are ignored
    pub fn record(&mut self, requester: &str, anomaly: Anomaly) {
        let recorded = self.anomalies.entry(requester.to_string()).or_default();
        if !recorded.contains(&anomaly) {
            recorded.push(anomaly);
        }
    }

    pub fn anomalies(&self, requester: &str) -> &[Anomaly] {
        self.anomalies
            .get(requester)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether expansion of `requester` was cut short by the depth guard
    pub fn stopped_too_deep(&self, requester: &str) -> bool {
        self.anomalies(requester)
            .iter()
            .any(|a| matches!(a, Anomaly::TooDeep { .. }))
    }

    /// Requesters holding an anomaly that involves any of `identifiers`
    pub fn requesters_with_anomaly_about(&self, identifiers: &[String]) -> Vec<String> {
        self.anomalies
            .iter()
            .filter(|(_, anomalies)| {
                anomalies
                    .iter()
                    .any(|a| identifiers.iter().any(|id| a.mentions(id)))
            })
            .map(|(requester, _)| requester.clone())
            .collect()
    }

    pub fn clear_anomalies(&mut self, requester: &str) {
        self.anomalies.remove(requester);
    }

    pub fn clear(&mut self) {
        self.required.clear();
        self.pulled.clear();
        self.anomalies.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.pulled.is_empty() && self.anomalies.is_empty()
    }

    /// Requester chain from `from` to `to` following pulled links, if any
    fn path_between(&self, from: &str, to: &str) -> Option<Vec<String>> {
        let mut visited = BTreeSet::new();
        let mut stack = vec![vec![from.to_string()]];

        while let Some(path) = stack.pop() {
            let current = path.last()?.clone();
            if current == to {
                return Some(path);
            }
            if !visited.insert(current.clone()) {
                continue;
            }
            for next in self.pulled.get(&current).into_iter().flatten() {
                if !visited.contains(next) {
                    let mut extended = path.clone();
                    extended.push(next.clone());
                    stack.push(extended);
                }
            }
        }
        None
    }
}
