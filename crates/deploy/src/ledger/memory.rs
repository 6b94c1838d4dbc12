//! In-process ledger used for dry runs and tests.

use std::collections::{HashMap, HashSet};

use alloy_core::primitives::{Address, keccak256};
use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{LedgerClient, Receipt, Signer};
use crate::{LedgerError, Unit, Value};

/// Gas reported for every request.
const GAS_PER_REQUEST: u64 = 21_000;

/// A create request accepted by the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRecord {
    pub signer: Address,
    pub kind: String,
    pub args: Vec<Value>,
    pub address: Address,
}

/// A call request accepted by the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    pub signer: Address,
    pub target: Address,
    pub kind: String,
    pub operation: String,
    pub args: Vec<Value>,
}

#[derive(Debug, Default)]
struct LedgerState {
    nonce: u64,
    block_number: u64,
    deployed: HashMap<Address, String>,
    creations: Vec<CreateRecord>,
    calls: Vec<CallRecord>,
    failing_kinds: HashSet<String>,
    failing_operations: HashSet<String>,
}

impl LedgerState {
    fn mine(&mut self) -> Receipt {
        self.block_number += 1;
        Receipt {
            transaction_hash: keccak256(self.block_number.to_be_bytes()),
            block_number: self.block_number,
            gas_used: GAS_PER_REQUEST,
        }
    }
}

/// Deterministic ledger that keeps every unit in memory.
///
/// Addresses are derived from the signer and a running nonce, like contract creation on an
/// account-based chain. Calls to addresses it did not create are rejected.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every create request for `kind`.
    pub fn failing_create(mut self, kind: impl Into<String>) -> Self {
        self.state.get_mut().failing_kinds.insert(kind.into());
        self
    }

    /// Reject every call of `operation`.
    pub fn failing_call(mut self, operation: impl Into<String>) -> Self {
        self.state.get_mut().failing_operations.insert(operation.into());
        self
    }

    /// Accept every request from now on.
    pub async fn clear_failures(&self) {
        let mut state = self.state.lock().await;
        state.failing_kinds.clear();
        state.failing_operations.clear();
    }

    /// Accepted create requests, in submission order.
    pub async fn creations(&self) -> Vec<CreateRecord> {
        self.state.lock().await.creations.clone()
    }

    /// Accepted call requests, in submission order.
    pub async fn calls(&self) -> Vec<CallRecord> {
        self.state.lock().await.calls.clone()
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn create(
        &self,
        signer: &Signer,
        kind: &str,
        args: &[Value],
    ) -> Result<(Address, Receipt), LedgerError> {
        let mut state = self.state.lock().await;
        if state.failing_kinds.contains(kind) {
            return Err(LedgerError::Rejected(format!("creation of `{kind}`")));
        }

        let mut preimage = signer.address.to_vec();
        preimage.extend_from_slice(&state.nonce.to_be_bytes());
        let address = Address::from_slice(&keccak256(&preimage)[12..]);
        state.nonce += 1;

        state.deployed.insert(address, kind.to_string());
        state.creations.push(CreateRecord {
            signer: signer.address,
            kind: kind.to_string(),
            args: args.to_vec(),
            address,
        });

        Ok((address, state.mine()))
    }

    async fn call(
        &self,
        signer: &Signer,
        target: &Unit,
        operation: &str,
        args: &[Value],
    ) -> Result<Receipt, LedgerError> {
        let mut state = self.state.lock().await;
        if !state.deployed.contains_key(&target.identity) {
            return Err(LedgerError::UnknownTarget(target.identity));
        }
        if state.failing_operations.contains(operation) {
            return Err(LedgerError::Rejected(format!(
                "call of `{}.{operation}`",
                target.name
            )));
        }

        state.nonce += 1;
        state.calls.push(CallRecord {
            signer: signer.address,
            target: target.identity,
            kind: target.kind.clone(),
            operation: operation.to_string(),
            args: args.to_vec(),
        });

        Ok(state.mine())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_addresses_are_distinct_per_creation() {
        let ledger = InMemoryLedger::new();
        let signer = Signer::new(Address::repeat_byte(0x01));

        let (first, receipt) = ledger.create(&signer, "Treasury", &[]).await.unwrap();
        let (second, _) = ledger.create(&signer, "Treasury", &[]).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(receipt.block_number, 1);
        assert_eq!(ledger.creations().await.len(), 2);
    }

    #[tokio::test]
    async fn test_call_to_unknown_target_is_rejected() {
        let ledger = InMemoryLedger::new();
        let signer = Signer::new(Address::repeat_byte(0x01));
        let unit = Unit::new("Treasury", "Treasury", vec![], Address::repeat_byte(0x99));

        let err = ledger
            .call(&signer, &unit, "addPool", &[])
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::UnknownTarget(_)));
        assert!(ledger.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_injected_failures_clear() {
        let ledger = InMemoryLedger::new().failing_create("Pool");
        let signer = Signer::new(Address::repeat_byte(0x01));

        assert!(ledger.create(&signer, "Pool", &[]).await.is_err());
        ledger.clear_failures().await;
        assert!(ledger.create(&signer, "Pool", &[]).await.is_ok());
    }
}
