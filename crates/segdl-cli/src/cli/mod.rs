//! CLI for the segdl download engine.

mod commands;

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use segdl_core::config;
use std::path::PathBuf;

use commands::{run_config, run_get, run_inspect};

/// Top-level CLI for segdl.
#[derive(Debug, Parser)]
#[command(name = "segdl")]
#[command(about = "segdl: resumable segmented HTTP downloader", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download a URL. Ctrl-C stops and keeps the file resumable.
    Get(GetArgs),

    /// Show the resume state stored in a partially downloaded file.
    Inspect {
        /// Path to the partial download.
        path: PathBuf,
    },

    /// Print the config file path and the effective configuration.
    Config,
}

#[derive(Debug, Args)]
pub struct GetArgs {
    /// URL to download; `url|Name=value&...` adds request headers.
    pub url: String,

    /// Directory to save into (default: current directory).
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Filename to save as (default: from the server or URL).
    #[arg(short, long, value_name = "NAME")]
    pub output: Option<String>,

    /// Extra request header, `Name: value`. May be repeated.
    #[arg(short = 'H', long = "header", value_name = "HEADER", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Start over even if the file holds resume state.
    #[arg(long)]
    pub no_resume: bool,

    /// Concurrent connections (default from config).
    #[arg(short, long, value_name = "N")]
    pub connections: Option<usize>,

    /// Part size in bytes (default from config).
    #[arg(long, value_name = "BYTES")]
    pub part_size: Option<u64>,

    /// Start scheduling this far (percent) into the file.
    #[arg(long, value_name = "PCT", value_parser = parse_percent)]
    pub start_from: Option<f64>,
}

fn parse_header(s: &str) -> Result<(String, String)> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| anyhow!("expected `Name: value`, got `{}`", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow!("header name is empty"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

fn parse_percent(s: &str) -> Result<f64> {
    let pct: f64 = s.parse()?;
    if !(0.0..=100.0).contains(&pct) {
        return Err(anyhow!("percentage must be between 0 and 100"));
    }
    Ok(pct)
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Get(args) => run_get(&cfg, args).await?,
            CliCommand::Inspect { path } => run_inspect(&path)?,
            CliCommand::Config => run_config(&cfg)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
