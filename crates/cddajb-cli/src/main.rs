//! # cddajb CLI
//!
//! Command-line interface and HTTP backend for the cddajb JSON browser.
//!
//! ## Commands
//!
//! - `cddajb serve` - Index the data tree and serve it over HTTP
//! - `cddajb types` - List every blob type
//! - `cddajb search <pattern>` - Search ids by regular expression
//! - `cddajb show <type> <id>` - Print the blobs for a type/id pair
//! - `cddajb status` - Rebuild once and print the rebuild report
//!
//! ## Example Usage
//!
//! ```bash
//! # Serve the game data checked out in /srv/cdda
//! cddajb --config cddajb.toml serve
//!
//! # Find every id mentioning "bow"
//! cddajb --root /srv/cdda search bow
//! ```

mod app;
mod commands;
mod server;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// cddajb - JSON blob browser backend
#[derive(Parser)]
#[command(name = "cddajb")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Data root (overrides the configuration file)
    #[arg(short, long, global = true, env = "CDDAJB_ROOT")]
    root: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Seconds to wait for the index to build (one-shot commands)
    #[arg(long, default_value = "300", global = true)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index the data tree and serve it over HTTP
    Serve {
        /// Address to listen on (overrides the configuration file)
        #[arg(short, long)]
        bind: Option<std::net::SocketAddr>,
    },

    /// List every blob type
    Types,

    /// Search ids by case-insensitive regular expression
    Search {
        /// Search pattern
        pattern: String,

        /// Treat the pattern as plain text
        #[arg(short, long)]
        literal: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// Print the blobs stored under a type and id
    Show {
        /// Blob type (e.g. "GUN")
        type_name: String,

        /// Blob id
        id: String,
    },

    /// Rebuild once and print the rebuild report
    Status,
}

#[derive(Clone, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match &cli.config {
        Some(path) => cddajb_core::Config::load_from(path)?,
        None => cddajb_core::Config::load()?,
    };
    if let Some(root) = &cli.root {
        config.data.root = root.clone();
    }

    // Setup logging
    let log_level = if cli.quiet {
        "error".to_string()
    } else {
        match cli.verbose {
            0 => config.general.log_level.clone(),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)))
        .init();

    let timeout = std::time::Duration::from_secs(cli.timeout);

    // Execute command
    match cli.command {
        Commands::Serve { bind } => commands::serve::run(config, bind),
        Commands::Types => commands::types::run(config, timeout),
        Commands::Search {
            pattern,
            literal,
            output,
        } => commands::search::run(config, timeout, &pattern, literal, output),
        Commands::Show { type_name, id } => commands::show::run(config, timeout, &type_name, &id),
        Commands::Status => commands::status::run(config, timeout),
    }
}
