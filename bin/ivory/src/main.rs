//! ivory deploys the Ivory protocol units to a local or live network, one stage at a time.

mod cli;

use std::path::Path;

use alloy_core::primitives::{Address, address};
use anyhow::{Context, Result, bail};
use clap::Parser;
use comfy_table::Table;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use ivory_deploy::{
    ArtifactStore, DeployConfig, InMemoryLedger, LedgerClient, Network, Orchestrator, Registry,
    RpcLedger, Signer, TagFilter, Unit, config::CONFIG_FILENAME, protocol,
    registry::REGISTRY_FILENAME, send_test_tokens,
};

use cli::{Cli, Command, DeployArgs, SendTestTokensArgs};

/// First account of the hardhat and anvil development mnemonic.
const DEV_SIGNER: Address = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Deploy(args) => deploy(&config, args).await,
        Command::Units(args) => list_units(&config, args.network),
        Command::Accounts(args) => list_accounts(&config, args.network).await,
        Command::SendTestTokens(args) => send_tokens(&config, args).await,
        Command::Config => {
            let rendered =
                toml::to_string_pretty(&config).context("failed to render configuration")?;
            println!("{rendered}");
            Ok(())
        }
    }
}

/// Layer the defaults, the configuration file and `IVORY_` environment variables.
fn load_config(path: Option<&Path>) -> Result<DeployConfig> {
    let file = match path {
        Some(path) => {
            if !path.exists() {
                bail!("configuration file {} does not exist", path.display());
            }
            Toml::file(path)
        }
        None => Toml::file(CONFIG_FILENAME),
    };

    let config: DeployConfig = Figment::from(Serialized::defaults(DeployConfig::default()))
        .merge(file)
        .merge(Env::prefixed("IVORY_").split("__"))
        .extract()
        .context("failed to load configuration")?;

    tracing::debug!(
        deployments_dir = %config.deployments_dir.display(),
        artifacts_dir = %config.artifacts_dir.display(),
        networks = config.networks.len(),
        "Configuration loaded"
    );

    Ok(config)
}

/// Connect to the network's node and check it serves the expected chain.
async fn connect(config: &DeployConfig, network: Network) -> Result<RpcLedger> {
    let url = config
        .network(network)
        .and_then(|settings| settings.url.clone())
        .with_context(|| format!("no RPC url configured for network `{network}`"))?;

    let ledger = RpcLedger::new(url, ArtifactStore::new(&config.artifacts_dir))
        .context("failed to create RPC client")?;

    let chain_id = ledger
        .chain_id()
        .await
        .with_context(|| format!("failed to reach {}", ledger.url()))?;
    let expected = config.expected_chain_id(network);
    if chain_id != expected {
        bail!(
            "node at {} serves chain {chain_id}, expected {expected} for network `{network}`",
            ledger.url()
        );
    }

    Ok(ledger)
}

/// The configured signer, or the node's first account.
async fn resolve_signer(
    config: &DeployConfig,
    network: Network,
    ledger: &RpcLedger,
) -> Result<Signer> {
    if let Some(address) = config.network(network).and_then(|settings| settings.signer) {
        return Ok(Signer::new(address));
    }

    let accounts = ledger
        .accounts()
        .await
        .context("failed to list node accounts")?;
    let address = accounts
        .first()
        .copied()
        .with_context(|| format!("node at {} holds no accounts", ledger.url()))?;

    Ok(Signer::new(address))
}

async fn deploy(config: &DeployConfig, args: DeployArgs) -> Result<()> {
    let network = args.target.network;
    let stages = protocol::stages(&config.protocol);
    let tags = TagFilter::new(args.tags);

    if args.dry_run {
        let signer = config
            .network(network)
            .and_then(|settings| settings.signer)
            .unwrap_or(DEV_SIGNER);
        let orchestrator = Orchestrator::new(network, Signer::new(signer)).with_tags(tags);
        let mut registry = Registry::in_memory(network);
        let ledger = InMemoryLedger::new();

        tracing::info!(%network, "Dry run against an in-memory ledger");
        run(&orchestrator, &stages, &mut registry, &ledger).await?;
        print_units(registry.units());
        return Ok(());
    }

    let ledger = connect(config, network).await?;
    let signer = resolve_signer(config, network, &ledger).await?;
    let orchestrator = Orchestrator::new(network, signer).with_tags(tags);

    let registry_dir = config.registry_dir(network);
    let mut registry = Registry::open(&registry_dir, network).with_context(|| {
        format!("failed to open registry in {}", registry_dir.display())
    })?;

    run(&orchestrator, &stages, &mut registry, &ledger).await?;
    print_units(registry.units());

    Ok(())
}

async fn run(
    orchestrator: &Orchestrator,
    stages: &[Box<dyn ivory_deploy::Stage>],
    registry: &mut Registry,
    ledger: &dyn LedgerClient,
) -> Result<()> {
    let report = orchestrator.run_all(stages, registry, ledger).await?;

    tracing::info!(
        network = %orchestrator.network(),
        stages_run = report.executed.len(),
        stages_skipped = report.skipped.len(),
        units_created = report.units_created(),
        calls_sent = report.calls_sent(),
        "Deployment finished"
    );
    for (stage, reason) in &report.skipped {
        tracing::debug!(stage = %stage, %reason, "Skipped stage");
    }

    Ok(())
}

fn list_units(config: &DeployConfig, network: Network) -> Result<()> {
    let registry_dir = config.registry_dir(network);
    if !registry_dir.join(REGISTRY_FILENAME).exists() {
        println!("No units recorded for network `{network}`");
        return Ok(());
    }

    let registry = Registry::open(&registry_dir, network).with_context(|| {
        format!("failed to open registry in {}", registry_dir.display())
    })?;
    print_units(registry.units());

    Ok(())
}

async fn send_tokens(config: &DeployConfig, args: SendTestTokensArgs) -> Result<()> {
    let network = args.target.network;
    let registry_dir = config.registry_dir(network);
    if !registry_dir.join(REGISTRY_FILENAME).exists() {
        bail!("no units recorded for network `{network}`, deploy the test tokens first");
    }

    let ledger = connect(config, network).await?;
    let signer = resolve_signer(config, network, &ledger).await?;
    let mut registry = Registry::open(&registry_dir, network).with_context(|| {
        format!("failed to open registry in {}", registry_dir.display())
    })?;

    let outcome = send_test_tokens(
        network,
        &signer,
        &mut registry,
        &ledger,
        args.receiver,
        args.amount,
    )
    .await?;
    println!(
        "Sent {} test token transfers to {}",
        outcome.calls_sent, args.receiver
    );

    Ok(())
}

async fn list_accounts(config: &DeployConfig, network: Network) -> Result<()> {
    let ledger = connect(config, network).await?;
    let accounts = ledger
        .accounts()
        .await
        .context("failed to list node accounts")?;

    for account in accounts {
        println!("{account}");
    }

    Ok(())
}

fn print_units<'a>(units: impl Iterator<Item = &'a Unit>) {
    let mut table = Table::new();
    table.set_header(vec!["Name", "Kind", "Address", "Transaction"]);

    for unit in units {
        table.add_row(vec![
            unit.name.clone(),
            unit.kind.clone(),
            unit.identity.to_string(),
            unit.transaction_hash
                .map(|hash| hash.to_string())
                .unwrap_or_default(),
        ]);
    }

    println!("{table}");
}
