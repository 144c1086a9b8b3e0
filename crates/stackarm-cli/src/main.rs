mod cli;
mod commands;
mod output;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let opts = commands::Options {
        config:  cli.config,
        timeout: Duration::from_secs(cli.timeout_secs),
        local:   cli.local,
        output:  cli.output,
    };

    match cli.command {
        Command::Environment => commands::environment(&opts).await,
        Command::ResourceGroup => commands::resource_group(&opts).await,
        Command::StorageAccount => commands::storage_account(&opts).await,
        Command::KeyvaultSecret => commands::keyvault_secret(&opts).await,
    }
}
