use anyhow::Result;
use clap::Parser;

mod auth;
mod cli;
mod config;
mod error;
mod handlers;
mod logging;
mod router;
mod schemas;

mod openapi_tests;
mod tests;

use cli::Cli;
use config::Settings;

/// Main entry point for the Cashbook application.
#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load()?;

    // Initialize tracing
    logging::init(&settings.logging)?;

    let cli = Cli::parse();
    cli.run(settings).await?;

    Ok(())
}
