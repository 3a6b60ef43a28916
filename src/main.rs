mod auth;
mod cli;
mod config;
mod error;
mod output;
mod pipeline;
mod providers;
mod reports;
#[cfg(test)]
mod test_support;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting Pipeforge - CI Pipeline Generator");
    cli.execute().await?;

    Ok(())
}
