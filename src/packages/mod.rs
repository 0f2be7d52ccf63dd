// src/packages/mod.rs

//! Package records and local package validation
//!
//! [`Package`] is the read-only record the queue and cache exchange.
//! [`DebPackage`] validates a local `.deb` before it may be queued.

pub mod archive_utils;
pub mod common;
pub mod deb;

pub use common::{parse_relationship_field, Package};
pub use deb::{DebError, DebPackage};
