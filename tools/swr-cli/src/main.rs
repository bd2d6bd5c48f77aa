//! SWR CLI - Command line tool for the stale-while-revalidate middleware.
//!
//! Commands:
//! - `swr encode` - Show the headers stored for a `Cache-Control` value
//! - `swr decode` - Show the headers a client sees for a stored entry
//! - `swr classify` - Classify caching values as fresh, stale, or expired
//! - `swr demo` - Replay requests against a demo origin on a manual clock
//! - `swr config` - Manage configuration

mod commands;
mod config;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use swr::swr_observability::{init_logging, LogLevel};

use commands::{ClassifyArgs, ConfigArgs, DecodeArgs, DemoArgs, EncodeArgs};

/// SWR CLI - Inspect and demonstrate stale-while-revalidate caching
#[derive(Parser)]
#[command(name = "swr")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a Cache-Control value for storage
    Encode(EncodeArgs),

    /// Decode stored headers for a client
    Decode(DecodeArgs),

    /// Classify an entry's freshness
    Classify(ClassifyArgs),

    /// Run requests through the middleware against a demo origin
    Demo(DemoArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let output = output::Output::new(cli.verbose, cli.json);

    let config_path = cli.config.as_deref();
    let ctx = context::Context::load(config_path, output)?;

    let mut logging = ctx.config.logging.clone();
    if cli.verbose {
        logging.level = logging.level.min(LogLevel::Debug);
    }
    if let Err(e) = init_logging(&logging) {
        ctx.output.debug(&format!("{:#}", e));
    }

    let result = match cli.command {
        Commands::Encode(args) => commands::encode::run(args, &ctx).await,
        Commands::Decode(args) => commands::decode::run(args, &ctx).await,
        Commands::Classify(args) => commands::classify::run(args, &ctx).await,
        Commands::Demo(args) => commands::demo::run(args, &ctx).await,
        Commands::Config(args) => commands::config::run(args, &ctx).await,
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
