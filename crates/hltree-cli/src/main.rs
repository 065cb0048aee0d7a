//! `hltree`: list containers and move single fields in and out of them.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect and edit hltree containers")]
struct Args {
    /// Print debugging output and report store errors
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every node in a container with its kind
    List {
        /// Container to list
        file: PathBuf,
    },
    /// Write a sidecar pair (<prefix>.info, <prefix>.data) into a new container
    Encode {
        /// Prefix of the sidecar files to read
        #[arg(short, long)]
        input: PathBuf,
        /// Container to create
        #[arg(short, long)]
        output: PathBuf,
        /// Zlib compression level for datasets
        #[arg(short = 'z', long, default_value_t = 6, value_parser = clap::value_parser!(u32).range(0..=9))]
        level: u32,
    },
    /// Fetch one attribute or dataset into a sidecar pair
    Decode {
        /// Container to read
        #[arg(short, long)]
        input: PathBuf,
        /// Name of the attribute or dataset, e.g. /g/d
        #[arg(short, long)]
        field: String,
        /// Prefix of the sidecar files to write
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = hltree::Config::default().with_store_errors(args.debug);
    match args.cmd {
        Command::List { file } => {
            for line in commands::list(&file, &config)? {
                println!("{line}");
            }
        }
        Command::Encode {
            input,
            output,
            level,
        } => commands::encode(&input, &output, level, config)?,
        Command::Decode {
            input,
            field,
            output,
        } => commands::decode(&input, &field, &output, config)?,
    }
    Ok(())
}
