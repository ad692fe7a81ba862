//! Binary crate for the `weather-gateway` tool.
//!
//! This crate focuses on:
//! - Serving the city list and forecast API over HTTP
//! - Calling a running gateway from the command line
//! - Interactive provider configuration

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod client;
mod routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cmd = cli::Cli::parse();
    cmd.run().await
}
