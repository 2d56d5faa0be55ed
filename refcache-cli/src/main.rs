//! refcache command-line tool
//!
//! Normalizes JSON responses into an entity table, rebuilds nested views
//! from one, and reads fingerprints out of a persisted store.
//!
//! Usage:
//!   refcache normalize --schema schema.json --registry entities.json response.json
//!   refcache ingest --store cache.json --fingerprint /articles -s schema.json -r entities.json response.json
//!   refcache select --store cache.json --fingerprint /articles -s schema.json -r entities.json

use anyhow::Result;
use clap::Parser;
use refcache_cli::{Cli, run};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let output = run(&cli)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
