use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "stackarm",
    about = "Resource-management samples against an Azure Stack Hub endpoint",
    version
)]
pub struct Cli {
    /// Settings file (JSON, or YAML by extension).
    #[arg(long, env = "STACKARM_CONFIG", default_value = "../azureAppSpConfig.json", global = true)]
    pub config: PathBuf,

    /// Timeout applied to every HTTP request.
    #[arg(
        long,
        env = "STACKARM_TIMEOUT_SECS",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..),
        global = true
    )]
    pub timeout_secs: u64,

    /// Run against in-memory collaborators instead of a live endpoint.
    #[arg(long, global = true)]
    pub local: bool,

    /// How to render sample reports.
    #[arg(long, default_value = "text", global = true)]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve the cloud's metadata endpoints and print the descriptor.
    Environment,

    /// Create, tag, list and delete resource groups.
    ResourceGroup,

    /// Create storage accounts, regenerate a key, list and delete.
    StorageAccount,

    /// Create a key vault, set and get a secret, delete the vault.
    KeyvaultSecret,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
