//! Course cache - operator tool for the reference data cache
//!
//! Reports on cached namespaces, clears them without a redeploy, and refills
//! them from an HTTP origin.

use std::error::Error;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use coursecache::cache::{CacheStatus, LocalCache};
use coursecache::cli::{clear_targets, resolve_config, Cli, CliError, Command};
use coursecache::origin::HttpOrigin;
use coursecache::store::{FileStore, RetryingStore};

/// Sends log output to stderr, filtered by `RUST_LOG` (default `warn`)
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn format_millis(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| millis.to_string())
}

fn format_remaining(millis: i64) -> String {
    let minutes = millis / 60_000;
    let (days, hours, minutes) = (minutes / 1_440, (minutes % 1_440) / 60, minutes % 60);
    if days > 0 {
        format!("{}d {}h", days, hours)
    } else {
        format!("{}h {}m", hours, minutes)
    }
}

fn describe(namespace: &str, status: &CacheStatus) -> String {
    if !status.has_valid_entry {
        return format!("{}: no valid entry ({:?})", namespace, status.state);
    }
    let mut line = format!("{}: valid", namespace);
    if let Some(count) = status.record_count {
        line.push_str(&format!(", {} records", count));
    }
    if let (Some(expires), Some(remaining)) =
        (status.expires_at_epoch_millis, status.millis_remaining)
    {
        line.push_str(&format!(
            ", expires {} (in {})",
            format_millis(expires),
            format_remaining(remaining)
        ));
    }
    line
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let files = match cli.cache_dir {
        Some(dir) => FileStore::with_dir(dir),
        None => FileStore::new().ok_or(CliError::NoCacheDir)?,
    };
    let cache = LocalCache::new(Arc::new(RetryingStore::new(files)));

    match cli.command {
        Command::Status {
            namespaces,
            json,
            overrides,
        } => {
            let mut report = serde_json::Map::new();
            for namespace in &namespaces {
                let config = resolve_config(namespace, &overrides)?;
                let status = cache.status(&config).await?;
                if json {
                    report.insert(namespace.clone(), serde_json::to_value(&status)?);
                } else {
                    println!("{}", describe(namespace, &status));
                }
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
        }
        Command::Clear { namespaces, all } => {
            let targets = clear_targets(&namespaces, all)?;
            let cleared = cache.invalidate_all(&targets).await?;
            println!(
                "Cleared {} namespace(s); {} already empty",
                cleared,
                targets.len() - cleared
            );
        }
        Command::Fetch {
            namespace,
            url,
            overrides,
        } => {
            let config = resolve_config(&namespace, &overrides)?;
            let origin = HttpOrigin::new(url);
            let cached = cache
                .get(&config, || origin.fetch::<serde_json::Value>())
                .await?;
            let source = if cached.from_cache { "cache" } else { "origin" };
            eprintln!("{}: served from {}", namespace, source);
            println!("{}", serde_json::to_string_pretty(&cached.into_inner())?);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
