//! Orchestration tests against the in-memory ledger.
//!
//! Run with: cargo test --test orchestrator_test

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use alloy_core::primitives::{Address, address};
use anyhow::Result;
use async_trait::async_trait;
use ivory_deploy::{
    DeployError, InMemoryLedger, LedgerError, Network, NetworkFilter, Orchestrator, Registry,
    SkipReason, Stage, StageContext, TagFilter, Value, run_all,
};
use tempdir::TempDir;

const CREATOR: Address = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

fn signer() -> ivory_deploy::Signer {
    ivory_deploy::Signer::new(CREATOR)
}

/// Creates `Treasury` and toggles it once.
struct TreasuryStage;

#[async_trait]
impl Stage for TreasuryStage {
    fn name(&self) -> &str {
        "treasury"
    }

    fn tags(&self) -> &[&str] {
        &["core", "treasury"]
    }

    fn applies(&self, _network: Network) -> bool {
        true
    }

    async fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), DeployError> {
        ctx.deploy("Treasury", "Treasury", vec![]).await?;
        ctx.execute_once("Treasury", "toggleMinting", vec![]).await?;
        Ok(())
    }
}

/// Creates `Pool` from the treasury's address, then points the treasury at it.
struct PoolStage;

#[async_trait]
impl Stage for PoolStage {
    fn name(&self) -> &str {
        "pool"
    }

    fn tags(&self) -> &[&str] {
        &["core", "pool"]
    }

    fn applies(&self, _network: Network) -> bool {
        true
    }

    async fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), DeployError> {
        let treasury = ctx.address("Treasury")?;
        let pool = ctx
            .deploy("Pool", "Pool", vec![treasury.into()])
            .await?
            .identity;
        ctx.execute("Treasury", "setPool", vec![pool.into()]).await?;
        ctx.execute_once("Treasury", "addPool", vec![pool.into()])
            .await?;
        Ok(())
    }
}

/// Counts its invocations; only runs on live networks.
struct LiveOnlyStage {
    runs: Arc<AtomicUsize>,
}

#[async_trait]
impl Stage for LiveOnlyStage {
    fn name(&self) -> &str {
        "live-only"
    }

    fn applies(&self, network: Network) -> bool {
        NetworkFilter::Live.matches(network)
    }

    async fn run(&self, _ctx: &mut StageContext<'_>) -> Result<(), DeployError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn core_stages() -> Vec<Box<dyn Stage>> {
    vec![Box::new(TreasuryStage), Box::new(PoolStage)]
}

#[tokio::test]
async fn test_dependent_stages_record_identities() -> Result<()> {
    let ledger = InMemoryLedger::new();
    let mut registry = Registry::in_memory(Network::Localhost);

    let report = run_all(
        &core_stages(),
        Network::Localhost,
        signer(),
        &mut registry,
        &ledger,
    )
    .await?;

    assert_eq!(registry.len(), 2);
    let treasury = registry.get("Treasury")?.identity;
    let pool = registry.get("Pool")?;
    assert_eq!(pool.creation_args, vec![Value::Address(treasury)]);
    assert_eq!(report.units_created(), 2);
    assert_eq!(report.calls_sent(), 3);

    let creations = ledger.creations().await;
    assert_eq!(creations[1].args, vec![Value::Address(treasury)]);
    assert!(creations.iter().all(|record| record.signer == CREATOR));

    Ok(())
}

#[tokio::test]
async fn test_failed_create_names_the_stage() -> Result<()> {
    let ledger = InMemoryLedger::new().failing_create("Treasury");
    let mut registry = Registry::in_memory(Network::Localhost);

    let failure = run_all(
        &core_stages(),
        Network::Localhost,
        signer(),
        &mut registry,
        &ledger,
    )
    .await
    .unwrap_err();

    assert_eq!(failure.stage, "treasury");
    assert_eq!(failure.step, 1);
    match &failure.error {
        DeployError::RemoteFailure {
            stage,
            step,
            source,
            ..
        } => {
            assert_eq!(stage, "treasury");
            assert_eq!(*step, 1);
            assert!(matches!(source, LedgerError::Rejected(_)));
        }
        other => panic!("expected a remote failure, got {other:?}"),
    }
    assert!(registry.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_rerun_converges_without_new_creations() -> Result<()> {
    let dir = TempDir::new("ivory-rerun")?;
    let ledger = InMemoryLedger::new();
    let stages = core_stages();

    let first = {
        let mut registry = Registry::open(dir.path(), Network::Localhost)?;
        run_all(&stages, Network::Localhost, signer(), &mut registry, &ledger).await?;
        registry.units().cloned().collect::<Vec<_>>()
    };

    let mut registry = Registry::open(dir.path(), Network::Localhost)?;
    let report = run_all(&stages, Network::Localhost, signer(), &mut registry, &ledger).await?;

    assert_eq!(registry.units().cloned().collect::<Vec<_>>(), first);
    assert_eq!(ledger.creations().await.len(), 2);
    assert_eq!(report.units_created(), 0);

    // Only the plain setter is sent again; one-shot calls come from the journal.
    let calls = ledger.calls().await;
    assert_eq!(calls.len(), 4);
    assert_eq!(calls[3].operation, "setPool");
    assert_eq!(
        report
            .executed
            .iter()
            .map(|outcome| outcome.calls_skipped)
            .sum::<usize>(),
        2
    );

    Ok(())
}

#[tokio::test]
async fn test_partial_failure_resumes_after_completed_steps() -> Result<()> {
    let ledger = InMemoryLedger::new().failing_call("setPool");
    let mut registry = Registry::in_memory(Network::Localhost);
    let stages = core_stages();

    let failure = run_all(&stages, Network::Localhost, signer(), &mut registry, &ledger)
        .await
        .unwrap_err();

    assert_eq!(failure.stage, "pool");
    assert_eq!(failure.step, 2);
    assert!(registry.has("Treasury"));
    assert!(registry.has("Pool"));

    ledger.clear_failures().await;
    let report = run_all(&stages, Network::Localhost, signer(), &mut registry, &ledger).await?;

    assert_eq!(ledger.creations().await.len(), 2);
    assert_eq!(report.units_created(), 0);
    let operations: Vec<_> = ledger
        .calls()
        .await
        .into_iter()
        .map(|call| call.operation)
        .collect();
    assert_eq!(operations, ["toggleMinting", "setPool", "addPool"]);

    Ok(())
}

#[tokio::test]
async fn test_stage_outside_network_filter_never_runs() -> Result<()> {
    let runs = Arc::new(AtomicUsize::new(0));
    let stages: Vec<Box<dyn Stage>> = vec![
        Box::new(LiveOnlyStage { runs: runs.clone() }),
        Box::new(TreasuryStage),
    ];
    let ledger = InMemoryLedger::new();
    let mut registry = Registry::in_memory(Network::Hardhat);

    let report = run_all(&stages, Network::Hardhat, signer(), &mut registry, &ledger).await?;

    assert_eq!(runs.load(Ordering::SeqCst), 0);
    assert_eq!(
        report.skipped,
        vec![("live-only".to_string(), SkipReason::Network)]
    );
    assert!(registry.has("Treasury"));

    Ok(())
}

#[tokio::test]
async fn test_tag_filter_selects_stages() -> Result<()> {
    let ledger = InMemoryLedger::new();
    let mut registry = Registry::in_memory(Network::Localhost);

    let report = Orchestrator::new(Network::Localhost, signer())
        .with_tags(TagFilter::new(["treasury"]))
        .run_all(&core_stages(), &mut registry, &ledger)
        .await?;

    assert_eq!(report.executed.len(), 1);
    assert_eq!(report.skipped, vec![("pool".to_string(), SkipReason::Tags)]);
    assert!(registry.has("Treasury"));
    assert!(!registry.has("Pool"));

    Ok(())
}

#[tokio::test]
async fn test_missing_dependency_is_not_found() -> Result<()> {
    let ledger = InMemoryLedger::new();
    let mut registry = Registry::in_memory(Network::Localhost);
    let stages: Vec<Box<dyn Stage>> = vec![Box::new(PoolStage)];

    let failure = run_all(&stages, Network::Localhost, signer(), &mut registry, &ledger)
        .await
        .unwrap_err();

    assert_eq!(failure.step, 1);
    assert!(matches!(
        failure.error,
        DeployError::NotFound { ref name } if name == "Treasury"
    ));
    assert!(ledger.creations().await.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_registry_drift_is_reported() -> Result<()> {
    let ledger = InMemoryLedger::new();
    let mut registry = Registry::in_memory(Network::Localhost);
    run_all(
        &core_stages(),
        Network::Localhost,
        signer(),
        &mut registry,
        &ledger,
    )
    .await?;

    /// Recreates `Pool` with different arguments.
    struct DriftedPoolStage;

    #[async_trait]
    impl Stage for DriftedPoolStage {
        fn name(&self) -> &str {
            "drifted-pool"
        }

        fn applies(&self, _network: Network) -> bool {
            true
        }

        async fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), DeployError> {
            ctx.deploy("Pool", "Pool", vec![Value::Address(Address::ZERO)])
                .await?;
            Ok(())
        }
    }

    let stages: Vec<Box<dyn Stage>> = vec![Box::new(DriftedPoolStage)];
    let failure = run_all(&stages, Network::Localhost, signer(), &mut registry, &ledger)
        .await
        .unwrap_err();

    assert!(matches!(failure.error, DeployError::AlreadyExists { .. }));
    assert_eq!(ledger.creations().await.len(), 2);

    Ok(())
}

/// Pauses and unpauses the pool with the same one-shot call.
struct PauseCycleStage;

#[async_trait]
impl Stage for PauseCycleStage {
    fn name(&self) -> &str {
        "pause-cycle"
    }

    fn applies(&self, _network: Network) -> bool {
        true
    }

    async fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), DeployError> {
        ctx.deploy("Pool", "Pool", vec![]).await?;
        ctx.execute_once("Pool", "toggleMinting", vec![]).await?;
        ctx.execute_once("Pool", "toggleMinting", vec![]).await?;
        Ok(())
    }
}

#[tokio::test]
async fn test_repeated_one_shot_call_runs_each_time() -> Result<()> {
    let ledger = InMemoryLedger::new();
    let mut registry = Registry::in_memory(Network::Localhost);
    let stages: Vec<Box<dyn Stage>> = vec![Box::new(PauseCycleStage)];

    let first = run_all(&stages, Network::Localhost, signer(), &mut registry, &ledger).await?;

    assert_eq!(first.calls_sent(), 2);
    assert_eq!(first.executed[0].calls_skipped, 0);
    assert_eq!(first.executed[0].steps, 3);
    assert_eq!(registry.applied_calls(), 2);

    let second = run_all(&stages, Network::Localhost, signer(), &mut registry, &ledger).await?;

    assert_eq!(second.calls_sent(), 0);
    assert_eq!(second.executed[0].calls_skipped, 2);
    let operations: Vec<_> = ledger
        .calls()
        .await
        .into_iter()
        .map(|call| call.operation)
        .collect();
    assert_eq!(operations, ["toggleMinting", "toggleMinting"]);

    Ok(())
}
