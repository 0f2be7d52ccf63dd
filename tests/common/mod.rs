// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use conary_queue::cache::{MemoryCache, PackageRecord};
use conary_queue::{Package, Queue, QueueEntry, QueueEvent};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Package universe used by most queue tests
///
/// - `foo` needs `libfoo`; `bar` needs `libfoo` and `libbar`
/// - `vim` conflicts with the installed `vim-tiny`
/// - `libc6` is installed and essential; `app` is installed and needs it
/// - `cyc-a` and `cyc-b` depend on each other
pub fn sample_cache() -> Arc<MemoryCache> {
    Arc::new(MemoryCache::from_records([
        PackageRecord::new(Package::new("foo", "1.0")).depends_on("libfoo"),
        PackageRecord::new(Package::new("bar", "2.0"))
            .depends_on("libfoo")
            .depends_on("libbar"),
        PackageRecord::new(Package::new("libfoo", "1.0")),
        PackageRecord::new(Package::new("libbar", "1.0")),
        PackageRecord::new(Package::new("vim", "9.1")).conflicts_with("vim-tiny"),
        PackageRecord::new(Package::new("vim-tiny", "9.0").installed("9.0")),
        PackageRecord::new(Package::new("libc6", "2.36").installed("2.36").essential())
            .depends_on("base-files"),
        PackageRecord::new(Package::new("app", "3.0").installed("3.0")).depends_on("libc6"),
        PackageRecord::new(Package::new("curl", "8.5").installed("8.4")),
        PackageRecord::new(Package::new("cyc-a", "1")).depends_on("cyc-b"),
        PackageRecord::new(Package::new("cyc-b", "1")).depends_on("cyc-a"),
    ]))
}

/// A queue over [`sample_cache`]
pub fn sample_queue() -> (Arc<MemoryCache>, Queue) {
    let cache = sample_cache();
    let queue = Queue::new(cache.clone());
    (cache, queue)
}

/// Package handle for `identifier`; the queue only looks at the identifier
pub fn pkg(identifier: &str) -> Package {
    Package::new(identifier, "0")
}

/// Queue entries rendered as `id:bucket:origin` strings
pub fn rendered(entries: &[QueueEntry]) -> Vec<String> {
    entries.iter().map(|e| e.to_string()).collect()
}

/// Count and drain pending notifications
pub fn drain_events(rx: &mut broadcast::Receiver<QueueEvent>) -> usize {
    let mut count = 0;
    while rx.try_recv().is_ok() {
        count += 1;
    }
    count
}

/// Control file for a small valid package
pub fn control_file(package: &str, version: &str, depends: Option<&str>) -> String {
    let mut control = format!(
        "Package: {}\nVersion: {}\nArchitecture: amd64\nMaintainer: Test <test@example.com>\n",
        package, version
    );
    if let Some(depends) = depends {
        control.push_str(&format!("Depends: {}\n", depends));
    }
    control.push_str("Description: test package\n");
    control
}

fn tar_with(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, *content).unwrap();
    }
    builder.into_inner().unwrap()
}

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Write a `.deb` with the given control file into `dir`
pub fn write_deb(dir: &Path, file_name: &str, control: &str) -> PathBuf {
    let path = dir.join(file_name);
    let members = [
        ("debian-binary", b"2.0\n".to_vec()),
        (
            "control.tar.gz",
            gzip(&tar_with(&[("./control", control.as_bytes())])),
        ),
        ("data.tar.gz", gzip(&tar_with(&[]))),
    ];

    let mut builder = ar::Builder::new(File::create(&path).unwrap());
    for (name, data) in &members {
        let header = ar::Header::new(name.as_bytes().to_vec(), data.len() as u64);
        builder.append(&header, &data[..]).unwrap();
    }
    path
}
