// src/main.rs

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use conary_queue::cache::{MemoryCache, PackageCache};
use conary_queue::{DebPackage, Origin, Package, Queue, QueueConfig, QueueSnapshot, QueueType};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "conary-queue")]
#[command(author, version, about = "Stage package transactions and report what blocks them", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a local .deb and print its control metadata
    Inspect {
        /// Path to the package file
        package_path: PathBuf,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Build a queue against a package cache fixture and print the result
    Plan {
        /// TOML cache fixture ([[package]] entries)
        #[arg(long)]
        cache: PathBuf,
        /// Queue configuration file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Queue for install
        #[arg(long, value_name = "ID")]
        install: Vec<String>,
        /// Queue for removal
        #[arg(long, value_name = "ID")]
        remove: Vec<String>,
        /// Queue for reinstallation
        #[arg(long, value_name = "ID")]
        reinstall: Vec<String>,
        /// Queue for upgrade
        #[arg(long, value_name = "ID")]
        upgrade: Vec<String>,
        /// Queue for downgrade
        #[arg(long, value_name = "ID")]
        downgrade: Vec<String>,
        /// Queue a local .deb for install
        #[arg(long, value_name = "PATH")]
        local: Vec<PathBuf>,
        /// Withdraw an earlier request (applied after all additions)
        #[arg(long, value_name = "ID")]
        drop: Vec<String>,
        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Requested queue operations, in application order
#[derive(Debug, Default, PartialEq, Eq)]
struct PlanRequest {
    adds: Vec<(String, QueueType)>,
    local: Vec<PathBuf>,
    drops: Vec<String>,
}

impl PlanRequest {
    fn is_empty(&self) -> bool {
        self.adds.is_empty() && self.local.is_empty() && self.drops.is_empty()
    }
}

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Inspect { package_path, json }) => cmd_inspect(&package_path, json),
        Some(Commands::Plan {
            cache,
            config,
            install,
            remove,
            reinstall,
            upgrade,
            downgrade,
            local,
            drop,
            json,
        }) => {
            let mut request = PlanRequest::default();
            for (ids, queue_type) in [
                (install, QueueType::Install),
                (reinstall, QueueType::Reinstall),
                (upgrade, QueueType::Upgrade),
                (downgrade, QueueType::Downgrade),
                (remove, QueueType::Remove),
            ] {
                request
                    .adds
                    .extend(ids.into_iter().map(|id| (id, queue_type)));
            }
            request.local = local;
            request.drops = drop;

            cmd_plan(&cache, config.as_deref(), &request, json)
        }
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "conary-queue",
                &mut std::io::stdout(),
            );
            Ok(())
        }
        None => {
            // No command provided, show help
            println!("conary-queue v{}", env!("CARGO_PKG_VERSION"));
            println!("Run 'conary-queue --help' for usage information");
            Ok(())
        }
    }
}

fn cmd_inspect(path: &Path, json: bool) -> Result<()> {
    let deb = DebPackage::inspect_default(path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&deb)?);
        return Ok(());
    }

    println!("Package: {}", deb.identifier);
    if let Some(name) = &deb.name {
        println!("  Name: {}", name);
    }
    println!("  Version: {}", deb.version);
    println!("  Architecture: {}", deb.architecture);
    if deb.essential {
        println!("  Essential: yes");
    }
    if !deb.depends.is_empty() {
        println!("  Depends: {}", deb.depends.join(", "));
    }
    if !deb.conflicts.is_empty() {
        println!("  Conflicts: {}", deb.conflicts.join(", "));
    }
    if let Some(size) = deb.installed_size {
        println!("  Installed-Size: {} KiB", size);
    }
    if let Some(description) = &deb.description {
        println!("  Description: {}", description);
    }
    Ok(())
}

fn cmd_plan(
    cache_path: &Path,
    config_path: Option<&Path>,
    request: &PlanRequest,
    json: bool,
) -> Result<()> {
    let config = match config_path {
        Some(path) => QueueConfig::load(path)
            .with_context(|| format!("Failed to load queue config {}", path.display()))?,
        None => QueueConfig::default(),
    };
    let cache = Arc::new(
        MemoryCache::load(cache_path)
            .with_context(|| format!("Failed to load cache fixture {}", cache_path.display()))?,
    );
    info!("Loaded {} packages from {}", cache.len(), cache_path.display());

    if request.is_empty() {
        println!("Nothing requested");
        return Ok(());
    }

    let queue = Queue::with_config(cache.clone(), config);
    debug!(
        "Expanding dependencies up to {} levels",
        queue.config().max_dependency_depth
    );
    let snapshot = apply_request(&queue, cache.as_ref(), request)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&*snapshot)?);
    } else {
        print_snapshot(&snapshot);
    }
    Ok(())
}

/// Apply `request` to `queue` and return the resulting snapshot
fn apply_request(
    queue: &Queue,
    cache: &dyn PackageCache,
    request: &PlanRequest,
) -> Result<Arc<QueueSnapshot>> {
    // Unknown identifiers are still queued so they show up as issues
    let lookup = |id: &str| cache.resolve(id).unwrap_or_else(|| Package::new(id, ""));

    for (id, queue_type) in &request.adds {
        queue.add_package(&lookup(id), *queue_type);
    }
    for path in &request.local {
        let package = queue
            .queue_local_package(path)
            .with_context(|| format!("Failed to queue {}", path.display()))?;
        info!("Queued local package {} ({})", package.display_name(), package);
    }
    for id in &request.drops {
        let package = lookup(id);
        if !queue.can_remove_package(&package) {
            anyhow::bail!("{} was not requested and cannot be dropped", id);
        }
        queue.remove_package(&package);
    }

    Ok(queue.snapshot())
}

fn print_snapshot(snapshot: &QueueSnapshot) {
    if snapshot.is_empty() {
        println!("Queue is empty");
        return;
    }

    println!("Queued packages ({}):", snapshot.count());
    for entry in &snapshot.entries {
        println!(
            "  {:<10} {:<30} {}",
            entry.queue_type.to_string(),
            entry.identifier,
            describe_origin(&entry.origin)
        );
    }

    if !snapshot.issues.is_empty() {
        println!();
        println!("Issues:");
        for issue in snapshot.issues.values().flatten() {
            println!("  {}", issue);
        }
    }

    if snapshot.has_essential_packages() {
        println!();
        println!(
            "WARNING: essential packages queued for removal: {}",
            snapshot.essential_removals.join(", ")
        );
    }
}

fn describe_origin(origin: &Origin) -> String {
    match origin {
        Origin::UserRequested => "(requested)".to_string(),
        Origin::AutoDependency { requesters } => format!(
            "(dependency of {})",
            requesters.iter().cloned().collect::<Vec<_>>().join(", ")
        ),
        Origin::AutoConflict { requesters } => format!(
            "(conflicts with {})",
            requesters.iter().cloned().collect::<Vec<_>>().join(", ")
        ),
    }
}
