//! oligocalc CLI — primer thermodynamics via the IDT melt calculator.
//!
//! Annotates a CSV of DNA sequences with Tm, dG, dH and dS, or computes a
//! single sequence from the command line.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
