use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "keyfs",
    about = "Hierarchical keys over a transactional key-value store",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database file; overrides the configured path
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Store a value at a key
    Put(PutArgs),
    /// Print the value stored at a key
    Get(KeyArgs),
    /// Delete the value stored at a key
    Rm(KeyArgs),
    /// Exit with status 1 unless a value is stored at the key
    Exists(KeyArgs),
    /// List the children of a directory
    Ls(LsArgs),
    /// Describe a key as a file or a directory
    Stat(KeyArgs),
}

#[derive(Args)]
pub struct PutArgs {
    pub key: String,
    /// Value to store; read from stdin when neither this nor --file is given
    #[arg(conflicts_with = "file")]
    pub value: Option<String>,
    /// Read the value from a file
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Args)]
pub struct KeyArgs {
    pub key: String,
}

#[derive(Args)]
pub struct LsArgs {
    pub prefix: String,
    #[arg(short, long)]
    pub recursive: bool,
}
