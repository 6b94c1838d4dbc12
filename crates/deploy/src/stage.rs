//! Stages and the context their procedures run in.

use alloy_core::primitives::Address;
use async_trait::async_trait;

use crate::{
    DeployError, LedgerClient, Network, Receipt, Registry, Signer, Unit, Value,
    registry::call_key, value::display_args,
};

/// An ordered, named batch of create and configure steps.
///
/// Stage authors own idempotence of their configuration calls: calls that are not safe to
/// repeat go through [`StageContext::execute_once`].
#[async_trait]
pub trait Stage: Send + Sync {
    /// The name used in logs and failure reports.
    fn name(&self) -> &str;

    /// Tags used to select stages from the command line.
    fn tags(&self) -> &[&str] {
        &[]
    }

    /// Whether this stage runs on `network`.
    fn applies(&self, network: Network) -> bool;

    /// Run the stage's steps, strictly in sequence.
    async fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), DeployError>;
}

/// What a completed stage did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageOutcome {
    pub stage: String,
    pub steps: usize,
    pub units_created: usize,
    pub units_reused: usize,
    pub calls_sent: usize,
    pub calls_skipped: usize,
}

/// Handle a stage's procedure uses to reach the registry and the ledger.
///
/// Every [`deploy`](Self::deploy), [`execute`](Self::execute) and
/// [`execute_once`](Self::execute_once) is one step, counted from 1 whether or not a request is
/// actually sent.
pub struct StageContext<'a> {
    network: Network,
    signer: &'a Signer,
    registry: &'a mut Registry,
    ledger: &'a dyn LedgerClient,
    outcome: StageOutcome,
}

impl<'a> StageContext<'a> {
    pub fn new(
        stage: &str,
        network: Network,
        signer: &'a Signer,
        registry: &'a mut Registry,
        ledger: &'a dyn LedgerClient,
    ) -> Self {
        Self {
            network,
            signer,
            registry,
            ledger,
            outcome: StageOutcome {
                stage: stage.to_string(),
                ..Default::default()
            },
        }
    }

    pub fn stage(&self) -> &str {
        &self.outcome.stage
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn signer(&self) -> &Signer {
        self.signer
    }

    /// The step currently being prepared or executed.
    pub fn current_step(&self) -> usize {
        self.outcome.steps + 1
    }

    /// Fetch a previously created unit.
    pub fn get(&self, name: &str) -> Result<Unit, DeployError> {
        self.registry.get(name).cloned()
    }

    /// Address of a previously created unit.
    pub fn address(&self, name: &str) -> Result<Address, DeployError> {
        self.registry.get(name).map(|unit| unit.identity)
    }

    /// Create `name` from `kind`, unless it already exists with the same arguments.
    pub async fn deploy(
        &mut self,
        name: &str,
        kind: &str,
        args: Vec<Value>,
    ) -> Result<Unit, DeployError> {
        if let Some(existing) = self.registry.verify(name, kind, &args)? {
            tracing::info!(
                stage = %self.outcome.stage,
                step = self.current_step(),
                unit = name,
                address = %existing.identity,
                "Reusing existing unit"
            );
            let existing = existing.clone();
            self.outcome.units_reused += 1;
            self.outcome.steps += 1;
            return Ok(existing);
        }

        tracing::info!(
            stage = %self.outcome.stage,
            step = self.current_step(),
            unit = name,
            kind,
            args = %display_args(&args),
            "Creating unit"
        );

        let (identity, receipt) = self
            .ledger
            .create(self.signer, kind, &args)
            .await
            .map_err(|source| self.remote_failure(format!("create `{name}` ({kind})"), source))?;

        let unit = self.registry.create(
            Unit::new(name, kind, args, identity).with_transaction(receipt.transaction_hash),
        )?;

        tracing::info!(
            stage = %self.outcome.stage,
            unit = name,
            address = %unit.identity,
            tx_hash = %receipt.transaction_hash,
            gas_used = receipt.gas_used,
            "Unit created"
        );

        self.outcome.units_created += 1;
        self.outcome.steps += 1;
        Ok(unit)
    }

    /// Invoke `operation` on the unit registered as `name`.
    pub async fn execute(
        &mut self,
        name: &str,
        operation: &str,
        args: Vec<Value>,
    ) -> Result<Receipt, DeployError> {
        let target = self.get(name)?;
        let receipt = self.send_call(&target, operation, &args).await?;
        self.outcome.steps += 1;
        Ok(receipt)
    }

    /// Invoke `operation` on `name` unless a previous run already applied this step.
    ///
    /// The journal key combines the stage, the step index and the call, so repeating an
    /// identical call later in the stage sends it again. Returns `None` when the call was skipped.
    pub async fn execute_once(
        &mut self,
        name: &str,
        operation: &str,
        args: Vec<Value>,
    ) -> Result<Option<Receipt>, DeployError> {
        let key = call_key(
            &self.outcome.stage,
            self.current_step(),
            name,
            operation,
            &args,
        );
        if self.registry.is_applied(&key) {
            tracing::info!(
                stage = %self.outcome.stage,
                step = self.current_step(),
                unit = name,
                operation,
                "Call already applied, skipping"
            );
            self.outcome.calls_skipped += 1;
            self.outcome.steps += 1;
            return Ok(None);
        }

        let target = self.get(name)?;
        let receipt = self.send_call(&target, operation, &args).await?;
        self.registry.mark_applied(key)?;
        self.outcome.steps += 1;
        Ok(Some(receipt))
    }

    async fn send_call(
        &mut self,
        target: &Unit,
        operation: &str,
        args: &[Value],
    ) -> Result<Receipt, DeployError> {
        tracing::info!(
            stage = %self.outcome.stage,
            step = self.current_step(),
            unit = %target.name,
            operation,
            args = %display_args(args),
            "Calling unit"
        );

        let receipt = self
            .ledger
            .call(self.signer, target, operation, args)
            .await
            .map_err(|source| {
                self.remote_failure(format!("call `{}.{operation}`", target.name), source)
            })?;

        tracing::debug!(
            stage = %self.outcome.stage,
            unit = %target.name,
            operation,
            tx_hash = %receipt.transaction_hash,
            gas_used = receipt.gas_used,
            "Call confirmed"
        );

        self.outcome.calls_sent += 1;
        Ok(receipt)
    }

    fn remote_failure(&self, request: String, source: crate::LedgerError) -> DeployError {
        DeployError::RemoteFailure {
            stage: self.outcome.stage.clone(),
            step: self.current_step(),
            request,
            source,
        }
    }

    pub(crate) fn into_outcome(self) -> StageOutcome {
        self.outcome
    }
}
