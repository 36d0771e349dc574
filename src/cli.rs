//! Command-line interface for the cache operator tool
//!
//! Parses arguments with clap and resolves namespaces to cache configurations,
//! either from the built-in presets or from `--ttl-days`/`--schema-version`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use thiserror::Error;

use crate::cache::{CacheConfig, ConfigError, Namespace};
use crate::catalog;

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// Namespace has no preset and the overrides are incomplete
    #[error("Unknown namespace '{0}': pass both --ttl-days and --schema-version")]
    UnknownNamespace(String),

    #[error("Invalid cache configuration: {0}")]
    Config(#[from] ConfigError),

    /// No home directory to derive a cache directory from
    #[error("Cannot determine a cache directory; pass --cache-dir")]
    NoCacheDir,
}

/// Course cache - inspect, clear and refill cached reference data
#[derive(Parser, Debug)]
#[command(name = "coursecache")]
#[command(about = "Inspect, clear and refill the course-review reference data cache")]
#[command(version)]
pub struct Cli {
    /// Directory holding cache files (defaults to the XDG cache directory)
    #[arg(long, value_name = "DIR", global = true)]
    pub cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show whether namespaces hold a valid entry and when it expires
    Status {
        #[arg(required = true, value_name = "NAMESPACE")]
        namespaces: Vec<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Remove cached entries so the next read goes to the origin
    ///
    /// Examples:
    ///   coursecache clear professors
    ///   coursecache clear timetable_winter timetable_fall
    ///   coursecache clear --all
    Clear {
        #[arg(
            required_unless_present = "all",
            conflicts_with = "all",
            value_name = "NAMESPACE"
        )]
        namespaces: Vec<String>,

        /// Clear every built-in namespace
        #[arg(long)]
        all: bool,
    },

    /// Read a namespace through the cache, fetching from URL on a miss
    Fetch {
        #[arg(value_name = "NAMESPACE")]
        namespace: String,

        /// URL returning the full dataset as JSON
        #[arg(long)]
        url: String,

        #[command(flatten)]
        overrides: Overrides,
    },
}

/// Per-invocation overrides of a namespace's preset
#[derive(Args, Debug, Clone, Default)]
pub struct Overrides {
    /// Entry lifetime in days
    #[arg(long, value_name = "DAYS")]
    pub ttl_days: Option<u32>,

    /// Schema version tag to expect
    #[arg(long, value_name = "VERSION")]
    pub schema_version: Option<String>,
}

/// Builds the configuration for `namespace`
///
/// Presets supply defaults that the overrides replace. Namespaces without a
/// preset need both overrides.
pub fn resolve_config(namespace: &str, overrides: &Overrides) -> Result<CacheConfig, CliError> {
    let base = catalog::preset(namespace);
    let ttl = overrides
        .ttl_days
        .map(catalog::days)
        .or_else(|| base.as_ref().map(CacheConfig::ttl));
    let version = overrides
        .schema_version
        .clone()
        .or_else(|| base.as_ref().map(|c| c.schema_version().to_string()));

    match (ttl, version) {
        (Some(ttl), Some(version)) => Ok(CacheConfig::new(namespace, ttl, version)?),
        _ => Err(CliError::UnknownNamespace(namespace.to_string())),
    }
}

/// Namespaces targeted by `clear`
pub fn clear_targets(namespaces: &[String], all: bool) -> Result<Vec<Namespace>, CliError> {
    if all {
        return Ok(catalog::all_presets()
            .into_iter()
            .map(|c| c.namespace().clone())
            .collect());
    }
    namespaces
        .iter()
        .map(|n| Namespace::parse(n).map_err(CliError::from))
        .collect()
}
