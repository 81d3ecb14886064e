//! Binary entry point for kpilens CLI

use anyhow::Result;
use clap::Parser;
use kpilens_cli::Main;

fn main() -> Result<()> {
    kpilens_cli::Cli::parse().main()
}
