use std::io::{self, Read, Write};
use std::process::ExitCode;

use anyhow::Context;
use colored::Colorize;
use keyfs_engine::KvEngine;
use keyfs_storage::{Storage, StorageConfig};
use serde_json::json;
use tracing::debug;

use crate::cli::*;

/// How a command ended when it did not fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Ok,
    /// `exists` found nothing.
    Absent,
}

impl From<Status> for ExitCode {
    fn from(status: Status) -> Self {
        match status {
            Status::Ok => ExitCode::SUCCESS,
            Status::Absent => ExitCode::from(1),
        }
    }
}

pub fn run_command(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = storage_config(&cli)?;
    let storage = config
        .open()
        .with_context(|| format!("opening {} store at {}", config.engine, config.path.display()))?;
    let stdout = io::stdout();
    let status = execute(&storage, &cli.command, cli.format, &mut stdout.lock())?;
    Ok(status.into())
}

fn storage_config(cli: &Cli) -> anyhow::Result<StorageConfig> {
    let mut config = match &cli.config {
        Some(path) => StorageConfig::load(path)?,
        None => StorageConfig::default(),
    };
    if let Some(db) = &cli.db {
        config.path = db.clone();
    }
    debug!(?config, "resolved configuration");
    Ok(config)
}

pub fn execute<E: KvEngine>(
    storage: &Storage<E>,
    command: &Command,
    format: OutputFormat,
    out: &mut impl Write,
) -> anyhow::Result<Status> {
    match command {
        Command::Put(args) => cmd_put(storage, args, format, out),
        Command::Get(args) => cmd_get(storage, &args.key, format, out),
        Command::Rm(args) => cmd_rm(storage, &args.key, format, out),
        Command::Exists(args) => cmd_exists(storage, &args.key, format, out),
        Command::Ls(args) => cmd_ls(storage, args, format, out),
        Command::Stat(args) => cmd_stat(storage, &args.key, format, out),
    }
}

fn read_value(args: &PutArgs) -> anyhow::Result<Vec<u8>> {
    if let Some(value) = &args.value {
        return Ok(value.clone().into_bytes());
    }
    if let Some(path) = &args.file {
        return std::fs::read(path).with_context(|| format!("reading {}", path.display()));
    }
    let mut value = Vec::new();
    io::stdin().read_to_end(&mut value).context("reading stdin")?;
    Ok(value)
}

fn cmd_put<E: KvEngine>(
    storage: &Storage<E>,
    args: &PutArgs,
    format: OutputFormat,
    out: &mut impl Write,
) -> anyhow::Result<Status> {
    let value = read_value(args)?;
    storage.store(&args.key, &value)?;
    match format {
        OutputFormat::Text => writeln!(
            out,
            "{} stored {} ({} bytes)",
            "✓".green().bold(),
            args.key.bold(),
            value.len()
        )?,
        OutputFormat::Json => {
            writeln!(out, "{}", json!({ "key": args.key, "stored": value.len() }))?
        }
    }
    Ok(Status::Ok)
}

fn cmd_get<E: KvEngine>(
    storage: &Storage<E>,
    key: &str,
    format: OutputFormat,
    out: &mut impl Write,
) -> anyhow::Result<Status> {
    let value = storage.load(key)?;
    match format {
        OutputFormat::Text => out.write_all(&value)?,
        OutputFormat::Json => {
            let text = std::str::from_utf8(&value).ok();
            writeln!(out, "{}", json!({ "key": key, "size": value.len(), "value": text }))?;
        }
    }
    Ok(Status::Ok)
}

fn cmd_rm<E: KvEngine>(
    storage: &Storage<E>,
    key: &str,
    format: OutputFormat,
    out: &mut impl Write,
) -> anyhow::Result<Status> {
    storage.delete(key)?;
    match format {
        OutputFormat::Text => writeln!(out, "{} deleted {}", "✓".green().bold(), key.bold())?,
        OutputFormat::Json => writeln!(out, "{}", json!({ "key": key, "deleted": true }))?,
    }
    Ok(Status::Ok)
}

fn cmd_exists<E: KvEngine>(
    storage: &Storage<E>,
    key: &str,
    format: OutputFormat,
    out: &mut impl Write,
) -> anyhow::Result<Status> {
    let exists = storage.exists(key);
    match format {
        OutputFormat::Text if exists => writeln!(out, "{}", "yes".green())?,
        OutputFormat::Text => writeln!(out, "{}", "no".red())?,
        OutputFormat::Json => writeln!(out, "{}", json!({ "key": key, "exists": exists }))?,
    }
    Ok(if exists { Status::Ok } else { Status::Absent })
}

fn cmd_ls<E: KvEngine>(
    storage: &Storage<E>,
    args: &LsArgs,
    format: OutputFormat,
    out: &mut impl Write,
) -> anyhow::Result<Status> {
    let entries = storage.list(&args.prefix, args.recursive)?;
    match format {
        OutputFormat::Text => {
            for entry in &entries {
                writeln!(out, "{entry}")?;
            }
        }
        OutputFormat::Json => writeln!(out, "{}", json!(entries))?,
    }
    Ok(Status::Ok)
}

fn cmd_stat<E: KvEngine>(
    storage: &Storage<E>,
    key: &str,
    format: OutputFormat,
    out: &mut impl Write,
) -> anyhow::Result<Status> {
    let info = storage.stat(key)?;
    match format {
        OutputFormat::Text => match info.size_estimate {
            Some(size) if info.is_terminal => {
                writeln!(out, "{}  {}  ~{} bytes", info.key.bold(), "file".cyan(), size)?
            }
            _ => writeln!(out, "{}  {}", info.key.bold(), "dir".blue())?,
        },
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string(&info)?)?,
    }
    Ok(Status::Ok)
}
