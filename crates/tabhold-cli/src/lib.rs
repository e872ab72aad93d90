//! tabhold CLI library
//!
//! Command-line wiring and the stdin/stdout bridge that runs the tab
//! activation arbiter next to a browser host.

pub mod bridge;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use bridge::{serve, BridgeHost, BridgeInput, BridgeOutput};
pub use cli::{Cli, Commands};
pub use commands::CommandDispatcher;
pub use config::{load_settings_file, CliConfig};
pub use error::{CliError, Result};
