//! # MPT CLI
//!
//! Command-line interface for building Merkle Patricia Tries from JSON and
//! working with blocks and chains.
//!
//! Usage:
//!   mpt root <pairs.json>
//!   mpt get <pairs.json> <key>
//!   mpt dump <pairs.json>
//!   mpt block <pairs.json> --height 1 --timestamp 1234567890 --parent genesis
//!   mpt chain <chain.json>
//!
//! A pairs file is a flat JSON object of string keys to string values.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "mpt")]
#[command(author, version, about = "Merkle Patricia Trie toolkit")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log filter directive (e.g. `debug`, `mpt_trie=trace`)
    #[arg(long, global = true, env = "MPT_LOG", default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the root hash and size of a trie
    Root {
        /// Path to the pairs JSON file
        pairs: PathBuf,
    },
    /// Look up one key
    Get {
        pairs: PathBuf,
        key: String,
    },
    /// List the trie's nodes depth-first
    Dump {
        pairs: PathBuf,
    },
    /// Form a block over a trie and print it as JSON
    Block {
        pairs: PathBuf,

        #[arg(long)]
        height: i32,

        /// UNIX timestamp in seconds
        #[arg(long)]
        timestamp: i64,

        /// Parent block hash
        #[arg(long, default_value = "genesis")]
        parent: String,
    },
    /// Decode a chain JSON file, summarize it and re-encode it
    Chain {
        /// Path to the chain JSON file
        file: PathBuf,
    },
}

fn init_logging(level: &str) {
    let directive = level
        .parse::<Directive>()
        .unwrap_or_else(|_| LevelFilter::INFO.into());
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(directive)
                .parse_lossy(level),
        )
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed setting tracing subscriber: {e}");
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let result = match &cli.command {
        Commands::Root { pairs } => commands::root(pairs),
        Commands::Get { pairs, key } => commands::get(pairs, key),
        Commands::Dump { pairs } => commands::dump(pairs),
        Commands::Block {
            pairs,
            height,
            timestamp,
            parent,
        } => commands::block(pairs, *height, *timestamp, parent),
        Commands::Chain { file } => commands::chain(file),
    };

    match result {
        Ok(out) => {
            println!("{}", out.trim_end());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
