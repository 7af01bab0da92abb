//! sstkv CLI
//!
//! Command-line interface operating directly on a data directory.

use std::collections::BTreeMap;
use std::process;

use clap::{Parser, Subcommand};
use sstkv::{Config, Engine, ListedRecord};
use tracing_subscriber::{fmt, EnvFilter};

/// sstkv CLI
#[derive(Parser, Debug)]
#[command(name = "sstkv")]
#[command(about = "CLI for the sstkv log-structured key-value store")]
#[command(version)]
struct Args {
    /// Data directory holding the segment files
    #[arg(short, long, default_value = "./sstkv_data")]
    data_dir: String,

    /// Segment rollover threshold in bytes
    #[arg(short, long, default_value = "4194304")]
    threshold: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Put {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Overwrite a key-value pair
    Update {
        key: String,
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Print every record stored in the segments
    List,

    /// Print segment ids, newest first
    Segments,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::builder()
        .data_dir(&args.data_dir)
        .segment_size_threshold(args.threshold)
        .build();

    let engine = match Engine::open(config) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run(&engine, args.command) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn run(engine: &Engine, command: Commands) -> sstkv::Result<()> {
    match command {
        Commands::Get { key } => match engine.get(&key)? {
            Some(value) => println!("{}", value),
            None => println!("(nil)"),
        },
        Commands::Put { key, value } => {
            let locator = engine.put(&key, &value)?;
            println!("OK ({}.sst @ {})", locator.segment_id, locator.offset);
        }
        Commands::Update { key, value } => {
            let locator = engine.update(&key, &value)?;
            println!("OK ({}.sst @ {})", locator.segment_id, locator.offset);
        }
        Commands::Del { key } => {
            engine.delete(&key)?;
            println!("OK");
        }
        Commands::List => print_listing(&engine.list_all()?),
        Commands::Segments => {
            for id in engine.segment_ids()? {
                println!("{}.sst", id);
            }
        }
    }
    Ok(())
}

fn print_listing(records: &[ListedRecord]) {
    let mut by_segment: BTreeMap<u64, Vec<&ListedRecord>> = BTreeMap::new();
    for record in records {
        by_segment.entry(record.segment_id).or_default().push(record);
    }

    for (segment_id, records) in by_segment {
        println!("{}.sst contains:", segment_id);
        for r in records {
            println!(
                "[key: {}, value: {}, time: {}]",
                r.key,
                r.value.as_deref().unwrap_or("(deleted)"),
                r.timestamp
            );
        }
        println!();
    }

    println!("Totally have {} key-values.", records.len());
}
