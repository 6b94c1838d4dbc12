//! Ledger client: the collaborator that submits create and call requests.

use alloy_core::primitives::{Address, B256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{LedgerError, Unit, Value};

mod artifacts;
pub mod memory;
pub mod rpc;

pub use artifacts::{Artifact, ArtifactStore};
pub use memory::InMemoryLedger;
pub use rpc::RpcLedger;

/// The account every request is submitted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signer {
    pub address: Address,
}

impl Signer {
    pub fn new(address: Address) -> Self {
        Self { address }
    }
}

/// Confirmation of a mined request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub transaction_hash: B256,
    pub block_number: u64,
    pub gas_used: u64,
}

/// Executes requests against a target environment.
///
/// Both operations block until the request's outcome is known. Implementations never retry a
/// request on their own.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Create a unit of `kind` with the given constructor arguments.
    async fn create(
        &self,
        signer: &Signer,
        kind: &str,
        args: &[Value],
    ) -> Result<(Address, Receipt), LedgerError>;

    /// Invoke `operation` on an existing unit.
    async fn call(
        &self,
        signer: &Signer,
        target: &Unit,
        operation: &str,
        args: &[Value],
    ) -> Result<Receipt, LedgerError>;
}
