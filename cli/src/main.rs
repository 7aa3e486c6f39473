//! # pickr CLI
//!
//! Command-line host for pickr - a searchable select control.
//!
//! ## Usage
//!
//! - `pickr` - Start interactive mode over the built-in dataset
//! - `pickr --data countries.json --multiple` - Interactive mode over a data file
//! - `pickr script events.txt` - Replay scripted events and print what the control emits
//!
//! The interactive mode draws the control in the terminal with crossterm.

use anyhow::Result;
use clap::{Parser, Subcommand};
use pickr_core::ReferenceMode;
use std::path::PathBuf;
use std::time::Duration;

mod commands;
mod config;
mod data;
mod interactive;

use commands::{interactive_command, script_command};
use config::CliConfigLoader;
use data::DataOptions;

/// pickr - A searchable select control in your terminal
#[derive(Parser)]
#[command(name = "pickr")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "A searchable select control written in Rust")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file or directory path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// JSON file with an array of entities (built-in list when omitted)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Allow selecting more than one item
    #[arg(long, global = true)]
    multiple: bool,

    /// Fetch the dataset once and filter locally
    #[arg(long, global = true)]
    client_mode: bool,

    /// What the value holds: id or entity
    #[arg(long, global = true)]
    reference_mode: Option<ReferenceMode>,

    /// Minimum term length before searching
    #[arg(long, global = true)]
    min_length: Option<usize>,

    /// Debounce delay in milliseconds
    #[arg(long, global = true)]
    debounce_ms: Option<u64>,

    /// Maximum number of candidates shown
    #[arg(long, global = true)]
    max_results: Option<usize>,

    /// Placeholder shown while nothing is selected
    #[arg(long, global = true)]
    placeholder: Option<String>,

    /// Entity field holding the id
    #[arg(long, global = true, default_value = "id")]
    id_field: String,

    /// Entity field holding the display text
    #[arg(long, global = true, default_value = "text")]
    text_field: String,

    /// Simulated backend latency in milliseconds
    #[arg(long, global = true)]
    latency_ms: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a script of host events and print the emitted events as JSON
    Script {
        /// Script file, one command per line
        file: PathBuf,
    },
}

/// Build a configuration loader from CLI arguments
fn build_config_loader(cli: &Cli) -> CliConfigLoader {
    let mut loader = CliConfigLoader::new();

    if let Some(config_path) = &cli.config {
        loader = loader.with_config_override(config_path.clone());
    }

    if cli.multiple {
        loader = loader.with_multiple_override(true);
    }

    if cli.client_mode {
        loader = loader.with_client_mode_override(true);
    }

    if let Some(mode) = cli.reference_mode {
        loader = loader.with_reference_mode_override(mode);
    }

    if let Some(min_length) = cli.min_length {
        loader = loader.with_min_length_override(min_length);
    }

    if let Some(debounce_ms) = cli.debounce_ms {
        loader = loader.with_debounce_override(debounce_ms);
    }

    if let Some(max_results) = cli.max_results {
        loader = loader.with_max_results_override(max_results);
    }

    if let Some(placeholder) = &cli.placeholder {
        loader = loader.with_placeholder_override(placeholder.clone());
    }

    loader
}

fn build_data_options(cli: &Cli) -> DataOptions {
    DataOptions {
        path: cli.data.clone(),
        id_field: cli.id_field.clone(),
        text_field: cli.text_field.clone(),
        latency: cli.latency_ms.map(Duration::from_millis),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so they stay out of the terminal view and script output
    if std::env::var_os("RUST_LOG").is_some() {
        pickr_core::init_tracing();
    } else {
        pickr_core::init_tracing_with_debug(cli.verbose);
    }

    let config_loader = build_config_loader(&cli);
    let data = build_data_options(&cli);

    match cli.command {
        Some(Commands::Script { file }) => script_command(file, config_loader, data).await,
        None => interactive_command(config_loader, data).await,
    }
}
