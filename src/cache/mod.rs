// src/cache/mod.rs

//! Package cache interface
//!
//! The queue never walks dependency graphs itself. Every question about
//! package state (does it exist, what does it need, what does it conflict
//! with, can it be placed in a given bucket) is delegated to a
//! [`PackageCache`]. Production callers back this with their solver;
//! [`MemoryCache`] is a self-contained implementation for tests and the CLI.

mod memory;

pub use memory::{CacheFixture, MemoryCache, PackageRecord};

use crate::error::Result;
use crate::packages::{DebPackage, Package};
use crate::queue::QueueType;
use std::collections::BTreeSet;

/// View of the package universe consulted by the queue
///
/// The queue only reads through this trait, except for
/// [`PackageCache::register_local`], which `Queue::queue_local_package` calls
/// to make an inspected `.deb` resolvable before queueing it.
pub trait PackageCache: Send + Sync {
    /// Look up the current candidate record for `identifier`
    fn resolve(&self, identifier: &str) -> Option<Package>;

    /// Dependencies of `package` that the installed system does not already
    /// satisfy
    fn dependencies_of(&self, package: &Package) -> BTreeSet<String>;

    /// Packages `package` declares a conflict with
    fn conflicts_of(&self, package: &Package) -> BTreeSet<String>;

    /// Whether `package` can be placed in `queue_type` given its current state
    fn is_satisfied(&self, package: &Package, queue_type: QueueType) -> bool;

    /// Installed packages that would break if `package` were removed
    ///
    /// Default implementation reports none.
    fn dependents_of(&self, _package: &Package) -> BTreeSet<String> {
        BTreeSet::new()
    }

    /// Make a validated local package resolvable and return its record
    ///
    /// This is the only write the queue performs on the cache.
    fn register_local(&self, deb: &DebPackage) -> Result<Package>;
}
