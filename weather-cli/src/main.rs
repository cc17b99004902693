//! Binary crate for the `cep-weather` services.
//!
//! This crate focuses on:
//! - Parsing CLI arguments and loading configuration
//! - Installing logging and trace export
//! - Running the Input or Orchestrator service, or a one-off lookup

use clap::Parser;

mod cli;
mod telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();
    cmd.run().await
}
