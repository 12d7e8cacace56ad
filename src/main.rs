//! WolfList - Distributed Object Listing Engine
//!
//! Command line front end for listing buckets stored on local disks.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wolflist::config::WolfListConfig;
use wolflist::listing::{ListObjectsInfo, ListingEngine};
use wolflist::walk::TreeWalkResult;

/// WolfList - Distributed Object Listing Engine
#[derive(Parser)]
#[command(name = "wolflist")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "wolflist.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error), overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List one page (or all pages) of a bucket
    List(ListArgs),

    /// Stream every key under a prefix as the walk produces it
    Walk {
        /// Bucket to walk
        bucket: String,

        /// Key prefix
        #[arg(short, long, default_value = "")]
        prefix: String,

        /// Resume after this key
        #[arg(short, long, default_value = "")]
        marker: String,

        /// Descend into sub-directories
        #[arg(short, long)]
        recursive: bool,
    },

    /// Initialize a new configuration file
    Init {
        /// Output path for configuration file
        #[arg(short, long, default_value = "wolflist.toml")]
        output: PathBuf,

        /// Node ID
        #[arg(long, default_value = "node-1")]
        node_id: String,
    },

    /// Validate configuration file
    Validate,

    /// Show node information
    Info,
}

#[derive(Args)]
struct ListArgs {
    /// Bucket to list
    bucket: String,

    /// Key prefix
    #[arg(short, long, default_value = "")]
    prefix: String,

    /// Resume after this key
    #[arg(short, long, default_value = "")]
    marker: String,

    /// Delimiter, "/" to group keys by directory
    #[arg(short, long, default_value = "")]
    delimiter: String,

    /// Maximum keys per page
    #[arg(long, default_value_t = 1000)]
    max_keys: i64,

    /// Keep fetching pages until the listing is complete
    #[arg(long)]
    all: bool,

    /// Print pages as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging settings come from the config file when it is readable
    let file_config = WolfListConfig::from_file(&cli.config).ok();
    let level = cli
        .log_level
        .clone()
        .or_else(|| file_config.as_ref().map(|c| c.logging.level.clone()))
        .unwrap_or_else(|| "warn".to_string());
    let format = file_config
        .as_ref()
        .map(|c| c.logging.format.clone())
        .unwrap_or_else(|| "pretty".to_string());
    init_logging(&level, &format);

    match cli.command {
        Commands::List(args) => run_list(cli.config, args).await,
        Commands::Walk {
            bucket,
            prefix,
            marker,
            recursive,
        } => run_walk(cli.config, bucket, prefix, marker, recursive).await,
        Commands::Init { output, node_id } => run_init(output, node_id),
        Commands::Validate => run_validate(cli.config),
        Commands::Info => run_info(cli.config),
    }
}

/// Initialize logging
fn init_logging(level: &str, format: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    // Listing output goes to stdout, logs to stderr
    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        "compact" => registry
            .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
            .init(),
        _ => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

fn load_config(config_path: &Path) -> anyhow::Result<WolfListConfig> {
    WolfListConfig::from_file(config_path).with_context(|| {
        format!("Failed to load configuration from {}", config_path.display())
    })
}

/// List a bucket page by page
async fn run_list(config_path: PathBuf, args: ListArgs) -> anyhow::Result<()> {
    let config = load_config(&config_path)?;
    let engine = ListingEngine::from_config(&config);
    tracing::debug!("Listing {} with {} disks", args.bucket, config.storage.disks.len());

    let mut marker = args.marker.clone();
    loop {
        let page = tokio::select! {
            page = engine.list_objects(&args.bucket, &args.prefix, &marker, &args.delimiter, args.max_keys) => {
                page.with_context(|| format!("Failed to list bucket {}", args.bucket))?
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received interrupt, stopping listing");
                return Ok(());
            }
        };

        print_page(&page, args.json)?;

        match page.next_marker {
            Some(next) if args.all && page.is_truncated => marker = next,
            _ => break,
        }
    }

    Ok(())
}

fn print_page(page: &ListObjectsInfo, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(page)?);
        return Ok(());
    }

    for prefix in &page.prefixes {
        println!("PRE {}", prefix);
    }
    for object in &page.objects {
        println!("    {}", object);
    }
    if let Some(next) = &page.next_marker {
        tracing::info!("Page truncated, next marker: {}", next);
    }
    Ok(())
}

/// Stream a walk until it completes or is interrupted
async fn run_walk(
    config_path: PathBuf,
    bucket: String,
    prefix: String,
    marker: String,
    recursive: bool,
) -> anyhow::Result<()> {
    let config = load_config(&config_path)?;
    let engine = ListingEngine::from_config(&config);
    let mut walk = engine.walk(&bucket, &prefix, &marker, recursive);

    let mut count = 0usize;
    loop {
        tokio::select! {
            result = walk.next() => match result {
                Some(TreeWalkResult::Entry { entry, .. }) => {
                    println!("{}", entry);
                    count += 1;
                }
                Some(TreeWalkResult::Error(e)) => {
                    return Err(e).with_context(|| format!("Walk of {} failed", bucket));
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received interrupt, cancelling walk");
                walk.cancel();
                break;
            }
        }
    }

    match walk.join().await {
        Ok(()) => tracing::info!("Walk of {} complete: {} keys", bucket, count),
        Err(e) if e.is_aborted() => tracing::info!("Walk of {} cancelled after {} keys", bucket, count),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Initialize a configuration file
fn run_init(output: PathBuf, node_id: String) -> anyhow::Result<()> {
    let config_content = format!(
        r#"# WolfList Configuration
# Generated configuration file

[node]
id = "{node_id}"

[storage]
# Disk roots, tried in order when a directory listing fails over
disks = ["/var/lib/wolflist/disk1"]
# fs: one file per object; xl: one directory per object with xl.json
layout = "fs"
# objects or uploads
kind = "objects"

[listing]
page_size = 1000
pool_timeout_secs = 300

[logging]
level = "info"
format = "pretty"
"#
    );

    std::fs::write(&output, config_content)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Configuration file created: {}", output.display());
    println!("\nEdit the file to point storage.disks at your data.");
    println!("Then list with: wolflist --config {} list <bucket>", output.display());

    Ok(())
}

/// Validate configuration
fn run_validate(config_path: PathBuf) -> anyhow::Result<()> {
    match WolfListConfig::from_file(&config_path) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!("  Node ID: {}", config.node.id);
            println!("  Disks: {}", config.storage.disks.len());
            println!("  Layout: {:?} / {:?}", config.storage.layout, config.storage.kind);
            println!("  Page Size: {}", config.listing.page_size);
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration error: {}", e);
            Err(e.into())
        }
    }
}

/// Show node information
fn run_info(config_path: PathBuf) -> anyhow::Result<()> {
    let config = load_config(&config_path)?;

    println!("WolfList Node Information");
    println!("=========================");
    println!();
    println!("Node ID:          {}", config.node.id);
    println!();
    println!("Storage Configuration:");
    for (i, disk) in config.storage.disks.iter().enumerate() {
        println!("  Disk {}:         {}", i, disk.display());
    }
    println!("  Layout:         {:?}", config.storage.layout);
    println!("  Kind:           {:?}", config.storage.kind);
    println!();
    println!("Listing Configuration:");
    println!("  Page Size:      {}", config.listing.page_size);
    println!("  Pool Timeout:   {} s", config.listing.pool_timeout_secs);

    Ok(())
}
