//! Test token faucet for the public testnet.

use alloy_core::primitives::Address;

use crate::{
    DeployError, LedgerClient, Network, NetworkFilter, Registry, Signer, StageContext,
    StageOutcome,
    params::scale_units,
    protocol::{DOLLAR, SHARE},
};

/// Name the faucet's steps are logged and reported under.
pub const FAUCET: &str = "send-test-tokens";

/// Decimals of every token the faucet hands out.
const TOKEN_DECIMALS: u8 = 18;

/// Units the faucet draws from, with the operation that moves tokens to the receiver.
const TRANSFERS: &[(&str, &str)] = &[
    (SHARE, "transfer"),
    (DOLLAR, "transfer"),
    ("MockCollateral", "mint"),
    ("MockFirebirdPair_DOLLAR_USDC", "transfer"),
    ("MockFirebirdPair_SHARE_USDC", "transfer"),
];

/// Send `amount` whole tokens of every test token to `receiver`.
///
/// Only available on Mumbai. The tokens are looked up in `registry`; every transfer is sent
/// again when the faucet is invoked again.
pub async fn send_test_tokens(
    network: Network,
    signer: &Signer,
    registry: &mut Registry,
    ledger: &dyn LedgerClient,
    receiver: Address,
    amount: u64,
) -> Result<StageOutcome, DeployError> {
    if !NetworkFilter::Only(vec![Network::Mumbai]).matches(network) {
        return Err(DeployError::UnsupportedNetwork {
            operation: FAUCET,
            network,
        });
    }

    let amount = scale_units(amount, TOKEN_DECIMALS)?;
    tracing::info!(%network, %receiver, %amount, "Sending test tokens");

    let mut ctx = StageContext::new(FAUCET, network, signer, registry, ledger);
    for (unit, operation) in TRANSFERS {
        ctx.execute(unit, operation, vec![receiver.into(), amount.into()])
            .await?;
    }

    let outcome = ctx.into_outcome();
    tracing::info!(calls_sent = outcome.calls_sent, "Test tokens sent");
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use alloy_core::primitives::U256;

    use super::*;
    use crate::{InMemoryLedger, Unit, Value};

    fn creator() -> Signer {
        Signer::new(Address::repeat_byte(0x01))
    }

    /// A Mumbai registry holding every faucet token.
    async fn funded_registry(ledger: &InMemoryLedger) -> Registry {
        let mut registry = Registry::in_memory(Network::Mumbai);
        for (name, _) in TRANSFERS {
            let (address, _) = ledger.create(&creator(), name, &[]).await.unwrap();
            registry
                .create(Unit::new(*name, *name, vec![], address))
                .unwrap();
        }
        registry
    }

    #[tokio::test]
    async fn test_sends_every_token_on_mumbai() {
        let ledger = InMemoryLedger::new();
        let mut registry = funded_registry(&ledger).await;
        let receiver = Address::repeat_byte(0x42);

        let outcome = send_test_tokens(
            Network::Mumbai,
            &creator(),
            &mut registry,
            &ledger,
            receiver,
            3,
        )
        .await
        .unwrap();

        assert_eq!(outcome.calls_sent, 5);
        assert_eq!(outcome.steps, 5);

        let amount = U256::from(3u64) * U256::from(10u64).pow(U256::from(18u64));
        let calls = ledger.calls().await;
        let operations: Vec<_> = calls.iter().map(|call| call.operation.as_str()).collect();
        assert_eq!(
            operations,
            ["transfer", "transfer", "mint", "transfer", "transfer"]
        );
        assert!(calls.iter().all(|call| {
            call.args == vec![Value::Address(receiver), Value::Uint(amount)]
        }));
        assert_eq!(calls[2].kind, "MockCollateral");
    }

    #[tokio::test]
    async fn test_rejects_other_networks() {
        let ledger = InMemoryLedger::new();
        let mut registry = Registry::in_memory(Network::Localhost);

        let err = send_test_tokens(
            Network::Localhost,
            &creator(),
            &mut registry,
            &ledger,
            Address::repeat_byte(0x42),
            1,
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            DeployError::UnsupportedNetwork {
                network: Network::Localhost,
                ..
            }
        ));
        assert!(ledger.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_token_is_not_found() {
        let ledger = InMemoryLedger::new();
        let mut registry = Registry::in_memory(Network::Mumbai);

        let err = send_test_tokens(
            Network::Mumbai,
            &creator(),
            &mut registry,
            &ledger,
            Address::repeat_byte(0x42),
            1,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DeployError::NotFound { ref name } if name == SHARE));
    }
}
