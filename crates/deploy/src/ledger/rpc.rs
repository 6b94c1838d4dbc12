//! Ledger client for a JSON-RPC node with unlocked accounts.

use std::time::Duration;

use alloy_core::primitives::{Address, B256, Bytes, U64};
use async_trait::async_trait;
use backon::{ConstantBuilder, Retryable};
use serde::Deserialize;
use url::Url;

use super::{ArtifactStore, LedgerClient, Receipt, Signer};
use crate::{
    LedgerError, Unit, Value,
    rpc::{create_client, json_rpc_call},
};

/// Default interval between receipt polls.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Default number of receipt polls before giving up on a transaction.
const DEFAULT_MAX_POLLS: usize = 240;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: B256,
    block_number: U64,
    gas_used: U64,
    #[serde(default)]
    status: Option<U64>,
    #[serde(default)]
    contract_address: Option<Address>,
}

impl From<&RpcReceipt> for Receipt {
    fn from(receipt: &RpcReceipt) -> Self {
        Self {
            transaction_hash: receipt.transaction_hash,
            block_number: receipt.block_number.to::<u64>(),
            gas_used: receipt.gas_used.to::<u64>(),
        }
    }
}

/// A mined receipt with status 0 is a reverted request. Pre-Byzantium receipts carry no status.
fn ensure_success(receipt: RpcReceipt) -> Result<RpcReceipt, LedgerError> {
    if receipt.status == Some(U64::ZERO) {
        return Err(LedgerError::Reverted(receipt.transaction_hash));
    }
    Ok(receipt)
}

/// Submits requests through `eth_sendTransaction` and waits for them to be mined.
///
/// Templates are looked up in an [`ArtifactStore`] by kind. The node must hold the signer's key
/// (a hardhat or anvil development node).
#[derive(Debug)]
pub struct RpcLedger {
    client: reqwest::Client,
    url: Url,
    artifacts: ArtifactStore,
    poll_interval: Duration,
    max_polls: usize,
}

impl RpcLedger {
    pub fn new(url: Url, artifacts: ArtifactStore) -> Result<Self, LedgerError> {
        Ok(Self {
            client: create_client()?,
            url,
            artifacts,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_polls: DEFAULT_MAX_POLLS,
        })
    }

    /// Override how receipts are polled.
    pub fn with_polling(mut self, interval: Duration, max_polls: usize) -> Self {
        self.poll_interval = interval;
        self.max_polls = max_polls;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Accounts the node holds keys for.
    pub async fn accounts(&self) -> Result<Vec<Address>, LedgerError> {
        json_rpc_call(&self.client, self.url.as_str(), "eth_accounts", vec![]).await
    }

    /// Chain id reported by the node.
    pub async fn chain_id(&self) -> Result<u64, LedgerError> {
        let chain_id: U64 =
            json_rpc_call(&self.client, self.url.as_str(), "eth_chainId", vec![]).await?;
        Ok(chain_id.to::<u64>())
    }

    async fn submit(
        &self,
        signer: &Signer,
        to: Option<Address>,
        data: Bytes,
    ) -> Result<RpcReceipt, LedgerError> {
        let mut tx = serde_json::json!({
            "from": signer.address,
            "data": data,
        });
        if let Some(to) = to {
            tx["to"] = serde_json::json!(to);
        }

        let hash: B256 = json_rpc_call(
            &self.client,
            self.url.as_str(),
            "eth_sendTransaction",
            vec![tx],
        )
        .await?;
        tracing::debug!(tx_hash = %hash, "Transaction submitted");

        let receipt = self.wait_for_receipt(hash).await?;
        ensure_success(receipt)
    }

    /// Poll for the receipt of a submitted transaction. Only a pending receipt is polled again.
    async fn wait_for_receipt(&self, hash: B256) -> Result<RpcReceipt, LedgerError> {
        let ledger = self;
        let fetch = move || async move {
            let receipt: Option<RpcReceipt> = json_rpc_call(
                &ledger.client,
                ledger.url.as_str(),
                "eth_getTransactionReceipt",
                vec![serde_json::json!(hash)],
            )
            .await?;
            receipt.ok_or(LedgerError::Pending(hash))
        };

        fetch
            .retry(
                ConstantBuilder::default()
                    .with_delay(self.poll_interval)
                    .with_max_times(self.max_polls),
            )
            .when(|err| matches!(err, LedgerError::Pending(_)))
            .notify(|_, delay| {
                tracing::trace!(tx_hash = %hash, ?delay, "Receipt not available yet");
            })
            .await
    }
}

#[async_trait]
impl LedgerClient for RpcLedger {
    async fn create(
        &self,
        signer: &Signer,
        kind: &str,
        args: &[Value],
    ) -> Result<(Address, Receipt), LedgerError> {
        let artifact = self.artifacts.load(kind).await?;
        let data = artifact.encode_create(args)?;

        let receipt = self.submit(signer, None, data).await?;
        let address = receipt
            .contract_address
            .ok_or(LedgerError::MissingAddress(receipt.transaction_hash))?;

        Ok((address, Receipt::from(&receipt)))
    }

    async fn call(
        &self,
        signer: &Signer,
        target: &Unit,
        operation: &str,
        args: &[Value],
    ) -> Result<Receipt, LedgerError> {
        let artifact = self.artifacts.load(&target.kind).await?;
        let data = artifact.encode_call(operation, args)?;

        let receipt = self.submit(signer, Some(target.identity), data).await?;
        Ok(Receipt::from(&receipt))
    }
}
