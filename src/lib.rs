// src/lib.rs

//! Conary package transaction queue
//!
//! Stages packages for install, removal, reinstallation, upgrade and
//! downgrade ahead of a commit, tracking which entries the user asked for and
//! which were pulled in to satisfy dependencies or conflicts.
//!
//! # Architecture
//!
//! - [`Queue`]: the service callers share; serializes every mutation and
//!   publishes one change event per logical operation
//! - [`cache::PackageCache`]: the package universe the queue consults; never
//!   mutated by the queue itself
//! - [`packages::DebPackage`]: local `.deb` validation for
//!   [`Queue::queue_local_package`]
//! - [`version::DebVersion`]: Debian version ordering used by the cache

pub mod cache;
pub mod config;
mod error;
pub mod packages;
pub mod queue;
pub mod version;

pub use cache::{MemoryCache, PackageCache, PackageRecord};
pub use config::QueueConfig;
pub use error::{Error, Result};
pub use packages::{DebPackage, Package};
pub use queue::{
    Issue, IssueReason, Origin, Queue, QueueEntry, QueueEvent, QueueSnapshot, QueueType,
};
pub use version::{compare_versions, DebVersion};
