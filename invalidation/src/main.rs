//! cover-plan - print the CDN paths to invalidate after a site sync.
//!
//! Reads newline-separated lists of changed and unchanged keys and writes one
//! invalidation path per line to stdout. Logs go to stderr.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cdn_invalidation::{plan, Collector, IndexDocument, PlanOptions, SiteConfig};

/// Compute the smallest set of CDN invalidation paths for a site sync
#[derive(Parser)]
#[command(name = "cover-plan")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// .s3_website.yaml file or the directory containing it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Index document name (overrides the config)
    #[arg(long)]
    index_document: Option<String>,

    /// File listing changed keys, one per line
    changed: PathBuf,

    /// File listing unchanged keys, one per line
    unchanged: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut options = match &cli.config {
        Some(path) => {
            let (config, _) = SiteConfig::load(path)
                .with_context(|| format!("Failed to load config: {}", path.display()))?;
            PlanOptions::from(&config)
        }
        None => PlanOptions::default(),
    };
    if let Some(name) = cli.index_document {
        options.index_document = Some(IndexDocument::new(name));
    }

    let collector = Collector::new();
    for key in read_keys(&cli.changed)? {
        collector.changed(key);
    }
    if let Some(path) = &cli.unchanged {
        for key in read_keys(path)? {
            collector.unchanged(key);
        }
    }

    let plan = plan(&collector.into_classification(), &options)?;

    let mut out = std::io::stdout().lock();
    for path in &plan {
        writeln!(out, "{}", path)?;
    }
    Ok(())
}

fn read_keys(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read key list: {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect())
}
