//! Command-line argument parsing
//!
//! `iplocator [-c FILE]` starts the server; `generate-config` writes a
//! sample configuration instead.

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "iplocator", version, about = "IP to country/city lookup service")]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Print or write a sample configuration file
    GenerateConfig {
        /// Output file; prints to stdout when omitted
        output: Option<String>,
    },
}

impl Cli {
    /// Resolved command, defaulting to `serve`
    pub fn command(&self) -> &Command {
        self.command.as_ref().unwrap_or(&Command::Serve)
    }
}
