//! devicewatch - browse openFDA device adverse events from the command line.
//!
//! # Examples
//!
//! ```bash
//! # Most reported modalities
//! devicewatch choices modality --limit 20
//!
//! # Raw facet on any field
//! devicewatch fields device.device_class
//!
//! # Events for one manufacturer, class 2 devices only
//! devicewatch search --by manufacturer "ACME MEDICAL" --device-class 2 --limit 25
//!
//! # Free-text expression
//! devicewatch search-raw 'device.generic_name:"STENT"' --pretty
//! ```

mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use config::{Config, LogFormat};

/// Browse openFDA device adverse events.
#[derive(Parser)]
#[command(name = "devicewatch")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Distinct values of an arbitrary field, most frequent first.
    Fields(commands::FieldsArgs),

    /// Selectable values for a filter.
    Choices(commands::ChoicesArgs),

    /// Events matching a manufacturer, model or modality.
    Search(commands::SearchArgs),

    /// Events matching a free-text search expression.
    SearchRaw(commands::SearchRawArgs),
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so stdout stays pipeable JSON.
    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;
    init_tracing(config.log_format);
    tracing::debug!("Using {:?}", config.fda);

    commands::run(cli, config).await
}
