//! AFL Models - command line entry point

use afl_models::{ModelStore, ModelsConfig};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "afl-models")]
#[command(about = "Manage the local cache of AFL analytics models", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the cache root
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Override the release repository (owner/name)
    #[arg(long)]
    repo: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Log format (json or pretty)
    #[arg(long, default_value = "pretty")]
    log_format: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List known core and stat models
    List,
    /// Show which models are cached
    Status {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Load a model, downloading it if needed
    Load {
        name: String,
        /// Download even if a cached copy exists
        #[arg(long)]
        refresh: bool,
    },
    /// Delete cached files (all, core or stat)
    Clear { scope: String },
    /// Print the cache path a model is stored at
    Path { name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    match cli.log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(&cli.log_level)
                .with_writer(std::io::stderr)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(&cli.log_level)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    // Load configuration
    let mut config = ModelsConfig::load(cli.config)?;

    // CLI overrides
    if let Some(dir) = cli.cache_dir {
        config.cache_dir = Some(dir);
    }
    if let Some(repo) = cli.repo {
        config.repository = repo;
    }

    config.validate()?;

    tracing::debug!(
        cache_root = ?config.cache_root(),
        repository = %config.repository,
        "Configuration loaded"
    );

    let store = ModelStore::new(config);

    match cli.command {
        Command::List => {
            let available = store.list_available_models();
            println!("Core models:");
            for (name, description) in &available.core_models {
                println!("  {:<8} {}", name, description);
            }
            println!("Stat models:");
            for name in &available.stat_models {
                println!("  {}", name);
            }
        }
        Command::Status { json } => {
            let status = store.check_cache_status();
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("Cache root: {}", store.cache_root().display());
                println!("{:<26} {:<6} {:<7} {:>9}", "MODEL", "TYPE", "CACHED", "SIZE (MB)");
                for entry in status {
                    println!(
                        "{:<26} {:<6} {:<7} {:>9.2}",
                        entry.model,
                        entry.category.to_string(),
                        if entry.cached { "yes" } else { "no" },
                        entry.size_mb
                    );
                }
            }
        }
        Command::Load { name, refresh } => {
            let handle = store
                .load_model(&name, refresh)
                .await
                .with_context(|| format!("Failed to load model '{}'", name))?;
            println!("model:    {}", handle.descriptor.name);
            println!("file:     {}", handle.path.display());
            println!("release:  {}", handle.descriptor.tag());
            println!("size:     {} bytes", handle.size_bytes);
            println!(
                "format:   {:?} v{}, {} (written by R {})",
                handle.header.format,
                handle.header.version,
                handle.header.compression,
                handle.header.writer_version
            );
        }
        Command::Clear { scope } => {
            let report = store.clear_cache(&scope)?;
            println!(
                "Removed {} file(s) from the {} cache",
                report.files_removed, report.scope
            );
        }
        Command::Path { name } => {
            println!("{}", store.model_path(&name)?.display());
        }
    }

    Ok(())
}
