//! exstore inspection tool
//!
//! Reads a data directory without ever resetting it.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use exstore::{EngineConfig, Storage, StorageResult};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(name = "exstore")]
#[command(about = "Inspect an exstore data directory")]
#[command(version)]
struct Args {
    /// Data directory (overrides the config file)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show vector arena usage, and hash index shape when an index is named
    Stats {
        #[arg(short, long)]
        index: Option<String>,
    },

    /// Look up a key in a hash index (prints 0 when absent)
    Lookup {
        /// Index name
        index: String,
        key: String,
    },

    /// List the ids stored for a key in a multi-value index
    Find {
        /// Index name
        index: String,
        key: String,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,exstore=debug"));
    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> StorageResult<()> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    config.reset = false;

    tracing::info!("exstore v{}", exstore::VERSION);
    let mut storage = Storage::open(config)?;

    match args.command {
        Commands::Stats { index } => {
            let stats = storage.arena_mut().stats()?;
            println!("vector arena:");
            println!("  pages:         {}", stats.pages);
            println!("  free pages:    {}", stats.free_pages);
            println!("  large vectors: {} ({} pages)", stats.large_vectors, stats.large_pages);
            for (class, count) in stats.small_pages.iter().enumerate() {
                if *count > 0 {
                    println!("  capacity {:>4}: {} pages", 1u32 << class, count);
                }
            }

            if let Some(name) = index {
                let index = storage.open_existing_index(&name)?;
                println!("index {}:", name);
                println!("  entries:        {}", index.len());
                println!("  global depth:   {}", index.global_depth());
                println!("  directory size: {}", index.directory_len());
                println!("  bucket pages:   {}", index.bucket_pages());
            }
        }
        Commands::Lookup { index, key } => {
            let mut index = storage.open_existing_index(&index)?;
            println!("{}", index.at(&key)?);
        }
        Commands::Find { index, key } => {
            let mut index = storage.open_existing_multi_index(&index)?;
            let ids = index.find_all(storage.arena_mut(), &key)?;
            let ids: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
            println!("{}", ids.join(" "));
        }
    }
    Ok(())
}
