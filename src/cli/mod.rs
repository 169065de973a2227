//! Command-line interface definitions.

mod check;
mod output;
mod run;

use clap::{Parser, Subcommand};

use crate::error::Result;

/// Cross-venue prediction-market arbitrage detection core.
#[derive(Parser, Debug)]
#[command(name = "duoedge")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the detection core (streams both venues, serves the inspection API).
    Run,
    /// Load and validate configuration from the environment, then exit.
    CheckConfig,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Run => run::execute().await,
            Commands::CheckConfig => check::execute_config(),
        }
    }
}
