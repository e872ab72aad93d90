//! Command-line interface definitions and parsing

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// JSON file with the persisted settings (overrides `settings_file`)
    #[arg(short, long)]
    pub settings: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Answer host notifications read from stdin, one JSON object per line
    Serve {
        /// Accept notifications from this extension id
        #[arg(long)]
        host_id: Option<String>,
        /// Name to register with
        #[arg(long)]
        name: Option<String>,
    },
    /// Print the event types registered for the settings
    ListeningTypes,
}
