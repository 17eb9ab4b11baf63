//! CLI for the uplink uploader.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use uplink_core::config;

use commands::{run_config, run_probe, run_upload};

/// Top-level CLI for the uplink uploader.
#[derive(Debug, Parser)]
#[command(name = "uplink")]
#[command(about = "uplink: single-request uploads with retry and connectivity fallback", long_about = None)]
pub struct Cli {
    /// Trace-level logging for uplink crates (RUST_LOG still wins).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Upload a file in one request body, retrying per config.
    Upload(UploadArgs),

    /// Run the connectivity check against the configured probe URLs.
    Probe,

    /// Print the config file path and the effective configuration.
    Config,
}

#[derive(Debug, Args)]
pub struct UploadArgs {
    /// Upload endpoint (HTTP/HTTPS).
    pub url: String,

    /// File whose bytes become the request body.
    pub file: PathBuf,

    /// Upload token; sent as `Authorization: UpToken <token>` and enables reporting.
    #[arg(long)]
    pub token: Option<String>,

    /// Connect to this IP instead of resolving the URL host.
    #[arg(long)]
    pub ip: Option<String>,

    /// Extra request header, repeatable.
    #[arg(long = "header", value_name = "NAME:VALUE")]
    pub headers: Vec<String>,

    /// Override `retry.max_retries` from the config.
    #[arg(long, value_name = "N")]
    pub retries: Option<u32>,

    /// Object key recorded in logs and reports (defaults to the file name).
    #[arg(long)]
    pub key: Option<String>,

    /// Ask for HTTP/3 even if the config does not.
    #[arg(long)]
    pub http3: bool,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match self.command {
            CliCommand::Upload(args) => run_upload(&cfg, args).await?,
            CliCommand::Probe => run_probe(&cfg).await?,
            CliCommand::Config => run_config(&cfg)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
