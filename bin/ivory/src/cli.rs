use std::path::PathBuf;

use alloy_core::primitives::Address;
use clap::{Args, Parser, Subcommand};
use ivory_deploy::Network;
use tracing::level_filters::LevelFilter;

/// The network targeted when none is given.
const DEFAULT_NETWORK: Network = Network::Localhost;

#[derive(Parser)]
#[command(name = "ivory")]
#[command(author, version, about = "Deploy and wire the Ivory protocol units")]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, global = true, env = "IVORY_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to a configuration file. Defaults to `Ivory.toml` in the working directory when it
    /// exists.
    #[arg(long, alias = "conf", global = true, env = "IVORY_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the deployment stages against a network.
    Deploy(DeployArgs),

    /// List the units recorded for a network.
    Units(NetworkArgs),

    /// List the accounts held by a network's node.
    Accounts(NetworkArgs),

    /// Send test tokens from the signer to an account. Mumbai only.
    SendTestTokens(SendTestTokensArgs),

    /// Print the effective configuration as TOML.
    Config,
}

#[derive(Args)]
pub struct NetworkArgs {
    /// The target network.
    #[arg(short, long, env = "IVORY_NETWORK", default_value_t = DEFAULT_NETWORK)]
    pub network: Network,
}

#[derive(Args)]
pub struct DeployArgs {
    #[command(flatten)]
    pub target: NetworkArgs,

    /// Only run stages carrying one of these tags (comma separated). Runs every stage when empty.
    #[arg(long, env = "IVORY_TAGS", value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Run against an in-memory ledger and registry instead of the network's node.
    #[arg(long, env = "IVORY_DRY_RUN", default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct SendTestTokensArgs {
    #[command(flatten)]
    pub target: NetworkArgs,

    /// Whole tokens to send of each test token.
    #[arg(long)]
    pub amount: u64,

    /// Account receiving the tokens.
    #[arg(long)]
    pub receiver: Address,
}
