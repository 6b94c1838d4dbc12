//! Runs a fixed sequence of stages against one network.

use std::collections::BTreeSet;

use crate::{
    DeployError, LedgerClient, Network, Registry, Signer, Stage, StageContext, StageOutcome,
};

/// A stage that stopped the run.
///
/// The underlying error is kept as-is in `error`; the failure only adds where it happened.
#[derive(Debug, thiserror::Error)]
#[error("stage `{stage}` failed at step {step}")]
pub struct StageFailure {
    pub stage: String,
    pub step: usize,
    #[source]
    pub error: DeployError,
}

/// Why a stage did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum SkipReason {
    /// The stage's network filter excludes the target network.
    Network,
    /// None of the stage's tags was selected.
    Tags,
}

/// What a complete run did, stage by stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub executed: Vec<StageOutcome>,
    pub skipped: Vec<(String, SkipReason)>,
}

impl RunReport {
    pub fn units_created(&self) -> usize {
        self.executed.iter().map(|outcome| outcome.units_created).sum()
    }

    pub fn calls_sent(&self) -> usize {
        self.executed.iter().map(|outcome| outcome.calls_sent).sum()
    }
}

/// Selects stages by tag. An empty filter selects every stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFilter {
    tags: BTreeSet<String>,
}

impl TagFilter {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    pub fn selects(&self, stage_tags: &[&str]) -> bool {
        self.tags.is_empty() || stage_tags.iter().any(|tag| self.tags.contains(*tag))
    }
}

/// Drives stages in their declared order.
///
/// Re-running the same stages against a registry that already holds some units only performs
/// the remaining work: creations are idempotent by name and one-shot calls are journaled.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    network: Network,
    signer: Signer,
    tags: TagFilter,
}

impl Orchestrator {
    pub fn new(network: Network, signer: Signer) -> Self {
        Self {
            network,
            signer,
            tags: TagFilter::default(),
        }
    }

    pub fn with_tags(mut self, tags: TagFilter) -> Self {
        self.tags = tags;
        self
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Run every selected stage that applies to the network, stopping at the first failure.
    pub async fn run_all(
        &self,
        stages: &[Box<dyn Stage>],
        registry: &mut Registry,
        ledger: &dyn LedgerClient,
    ) -> Result<RunReport, StageFailure> {
        let mut report = RunReport::default();

        tracing::info!(
            network = %self.network,
            signer = %self.signer.address,
            stages = stages.len(),
            "Starting deployment"
        );

        for stage in stages {
            let name = stage.name();

            if !self.tags.selects(stage.tags()) {
                tracing::debug!(stage = name, tags = ?stage.tags(), "Stage not selected, skipping");
                report.skipped.push((name.to_string(), SkipReason::Tags));
                continue;
            }

            if !stage.applies(self.network) {
                tracing::info!(
                    stage = name,
                    network = %self.network,
                    "Stage does not apply to network, skipping"
                );
                report.skipped.push((name.to_string(), SkipReason::Network));
                continue;
            }

            tracing::info!(stage = name, "Running stage");

            let mut ctx = StageContext::new(name, self.network, &self.signer, registry, ledger);
            match stage.run(&mut ctx).await {
                Ok(()) => {
                    let outcome = ctx.into_outcome();
                    tracing::info!(
                        stage = name,
                        steps = outcome.steps,
                        units_created = outcome.units_created,
                        units_reused = outcome.units_reused,
                        calls_sent = outcome.calls_sent,
                        calls_skipped = outcome.calls_skipped,
                        "Stage complete"
                    );
                    report.executed.push(outcome);
                }
                Err(error) => {
                    let step = ctx.current_step();
                    tracing::error!(stage = name, step, error = %error, "Stage failed");
                    return Err(StageFailure {
                        stage: name.to_string(),
                        step,
                        error,
                    });
                }
            }
        }

        tracing::info!(
            executed = report.executed.len(),
            skipped = report.skipped.len(),
            units_created = report.units_created(),
            calls_sent = report.calls_sent(),
            "Deployment complete"
        );

        Ok(report)
    }
}

/// Run `stages` against `network` with every tag selected.
pub async fn run_all(
    stages: &[Box<dyn Stage>],
    network: Network,
    signer: Signer,
    registry: &mut Registry,
    ledger: &dyn LedgerClient,
) -> Result<RunReport, StageFailure> {
    Orchestrator::new(network, signer)
        .run_all(stages, registry, ledger)
        .await
}
