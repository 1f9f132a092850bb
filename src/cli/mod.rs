//! CLI module for Placeboard
//!
//! Provides commands:
//! - `serve`: Start the canvas server (default)
//! - `check`: Validate a canvas PNG without uploading it

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod check;

/// Placeboard canvas server CLI
#[derive(Parser, Debug)]
#[command(name = "placeboard")]
#[command(about = "Collaborative pixel canvas server")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the server (default)
    Serve,
    /// Check that a PNG is a valid replacement canvas
    Check {
        /// Path to the PNG file
        image: PathBuf,
    },
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Check { image }) => check::run(&image).await,
        Some(Commands::Serve) | None => crate::server::run().await,
    }
}
