//! CLI command implementations.

pub mod classify;
pub mod config;
pub mod decode;
pub mod demo;
pub mod encode;

use clap::{Args, Subcommand};

/// Arguments for the encode command.
#[derive(Args)]
pub struct EncodeArgs {
    /// Cache-Control value as sent by the origin.
    pub cache_control: String,
}

/// Arguments for the decode command.
#[derive(Args)]
pub struct DecodeArgs {
    /// Stored header as `name: value`. Repeat for several headers.
    #[arg(short = 'H', long = "header", required = true)]
    pub headers: Vec<String>,
}

/// Arguments for the classify command.
#[derive(Args)]
pub struct ClassifyArgs {
    /// Entry age in seconds.
    #[arg(long)]
    pub age: u64,

    /// Real max-age in seconds.
    #[arg(long)]
    pub max_age: u64,

    /// stale-while-revalidate window in seconds.
    #[arg(long)]
    pub swr: Option<u64>,

    /// stale-if-error window in seconds.
    #[arg(long)]
    pub sie: Option<u64>,
}

/// Arguments for the demo command.
#[derive(Args)]
pub struct DemoArgs {
    /// Clock times (seconds) at which requests are sent.
    #[arg(long, value_delimiter = ',', default_value = "0,0,3,13")]
    pub at: Vec<u64>,

    /// max-age the demo origin sends.
    #[arg(long, default_value = "1")]
    pub max_age: u64,

    /// stale-while-revalidate the demo origin sends.
    #[arg(long, default_value = "5")]
    pub swr: u64,

    /// stale-if-error the demo origin sends.
    #[arg(long, default_value = "0")]
    pub sie: u64,

    /// Clock times at which the origin answers 500.
    #[arg(long, value_delimiter = ',')]
    pub fail_at: Vec<u64>,

    /// Request path.
    #[arg(long, default_value = "/")]
    pub path: String,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,
    /// Initialize a new config file.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Validate the config file.
    Validate,
}
