//! Argument parsing and command logic for the `refcache` binary.
//!
//! Every command reads JSON files, does its work through the library crates
//! and returns a JSON value for `main` to print.

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use refcache_model::{EntityTable, Schema, SchemaRegistry};
use refcache_normalizr::{NormalizeOptions, denormalize, normalize_with};
use refcache_store::{SelectorConfig, Store, persist, select_with};
use refcache_types::{Fingerprint, Timestamp};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "refcache")]
#[command(about = "Normalize JSON responses into an entity cache and read them back")]
pub struct Cli {
    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Flatten a nested document into a result skeleton and entity table
    Normalize {
        #[command(flatten)]
        schemas: SchemaArgs,

        /// Normalization options (JSON)
        #[arg(long)]
        options: Option<PathBuf>,

        /// Document to normalize
        input: PathBuf,
    },

    /// Rebuild a nested value from a skeleton and an entity table
    Denormalize {
        #[command(flatten)]
        schemas: SchemaArgs,

        /// Entity table (JSON)
        #[arg(short, long)]
        entities: PathBuf,

        /// Result skeleton to expand
        skeleton: PathBuf,
    },

    /// Normalize a response and commit it to a store file
    Ingest {
        #[command(flatten)]
        schemas: SchemaArgs,

        /// Store file; created if missing
        #[arg(long)]
        store: PathBuf,

        /// Fingerprint the response is stored under
        #[arg(short, long)]
        fingerprint: String,

        /// Normalization options (JSON)
        #[arg(long)]
        options: Option<PathBuf>,

        /// Seconds until the stored result goes stale
        #[arg(long, default_value = "60")]
        ttl_secs: u64,

        /// Response document
        input: PathBuf,
    },

    /// Read one fingerprint out of a store file
    Select {
        #[command(flatten)]
        schemas: SchemaArgs,

        /// Store file
        #[arg(long)]
        store: PathBuf,

        /// Fingerprint to read
        #[arg(short, long)]
        fingerprint: String,

        /// Request params as inline JSON, used for primary-key lookups
        #[arg(short, long)]
        params: Option<String>,

        /// Selector configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// Schema describing the document shape (JSON)
    #[arg(short, long)]
    pub schema: PathBuf,

    /// Entity definitions, `{"entities": [...]}`
    #[arg(short, long)]
    pub registry: Option<PathBuf>,
}

impl SchemaArgs {
    /// Loads both files and checks that every entity the schema reaches is
    /// registered.
    fn load(&self) -> Result<(Schema, SchemaRegistry)> {
        let schema: Schema = read_json(&self.schema, "schema")?;
        let registry = match &self.registry {
            Some(path) => SchemaRegistry::from_json(&read_text(path, "registry")?)
                .with_context(|| format!("Invalid registry in {}", path.display()))?,
            None => SchemaRegistry::new(),
        };
        registry
            .validate(&schema)
            .context("Schema does not match the registry")?;
        Ok((schema, registry))
    }
}

/// Executes a parsed command line.
pub fn run(cli: &Cli) -> Result<Value> {
    match &cli.command {
        Command::Normalize {
            schemas,
            options,
            input,
        } => {
            let (schema, registry) = schemas.load()?;
            let options = read_optional::<NormalizeOptions>(options.as_deref(), "options")?;
            let input: Value = read_json(input, "input")?;
            let normalized = normalize_with(&input, &schema, &registry, &options)?;
            Ok(serde_json::to_value(normalized)?)
        }
        Command::Denormalize {
            schemas,
            entities,
            skeleton,
        } => {
            let (schema, registry) = schemas.load()?;
            let entities: EntityTable = read_json(entities, "entity table")?;
            let skeleton: Value = read_json(skeleton, "skeleton")?;
            let view = denormalize(&skeleton, &schema, &registry, &entities)?;
            Ok(serde_json::to_value(view)?)
        }
        Command::Ingest {
            schemas,
            store,
            fingerprint,
            options,
            ttl_secs,
            input,
        } => {
            let (schema, registry) = schemas.load()?;
            let options = read_optional::<NormalizeOptions>(options.as_deref(), "options")?;
            let input: Value = read_json(input, "input")?;
            let fingerprint = Fingerprint::parse(fingerprint)?;
            let current = if store.exists() {
                persist::load(store)
                    .with_context(|| format!("Failed to load store {}", store.display()))?
            } else {
                Store::new()
            };

            let now = Timestamp::now();
            let next = current.ingest(
                &fingerprint,
                &input,
                &schema,
                &registry,
                &options,
                now,
                now.plus(Duration::from_secs(*ttl_secs)),
            )?;
            persist::save(&next, store)
                .with_context(|| format!("Failed to save store {}", store.display()))?;
            info!("Stored {} at v{}", fingerprint, next.version());

            Ok(json!({
                "version": next.version(),
                "result": next.result(fingerprint.as_str()),
            }))
        }
        Command::Select {
            schemas,
            store,
            fingerprint,
            params,
            config,
        } => {
            let (schema, registry) = schemas.load()?;
            let config = read_optional::<SelectorConfig>(config.as_deref(), "selector config")?;
            let fingerprint = Fingerprint::parse(fingerprint)?;
            let params: Option<Value> = params
                .as_deref()
                .map(serde_json::from_str)
                .transpose()
                .context("--params is not valid JSON")?;
            if !store.exists() {
                bail!("Store {} does not exist", store.display());
            }
            let store = persist::load(store)
                .with_context(|| format!("Failed to load store {}", store.display()))?;

            let selection = select_with(
                &store,
                &fingerprint,
                &schema,
                &registry,
                params.as_ref(),
                &config,
            )?;
            Ok(serde_json::to_value(selection)?)
        }
    }
}

fn read_text(path: &Path, what: &str) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {} from {}", what, path.display()))
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let text = read_text(path, what)?;
    serde_json::from_str(&text).with_context(|| format!("Invalid {} in {}", what, path.display()))
}

fn read_optional<T: DeserializeOwned + Default>(path: Option<&Path>, what: &str) -> Result<T> {
    match path {
        Some(path) => read_json(path, what),
        None => Ok(T::default()),
    }
}
