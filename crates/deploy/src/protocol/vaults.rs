use std::sync::Arc;

use async_trait::async_trait;

use super::*;
use crate::{DeployError, StageContext};

const TAGS: &[&str] = &[MOCK_TAG, "vaults"];

/// Creates the Aave treasury vault and hands its ownership to a new vault controller.
pub struct VaultsStage {
    config: Arc<ProtocolConfig>,
}

impl VaultsStage {
    pub fn new(config: Arc<ProtocolConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Stage for VaultsStage {
    fn name(&self) -> &str {
        "vaults"
    }

    fn tags(&self) -> &[&str] {
        TAGS
    }

    fn applies(&self, network: Network) -> bool {
        local_only(network)
    }

    async fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), DeployError> {
        let addresses = &self.config.addresses;
        let treasury = ctx.address(TREASURY)?;
        let collateral_reserve = ctx.address(COLLATERAL_RESERVE)?;
        let share = ctx.address(SHARE)?;

        let vault = ctx
            .deploy(TREASURY_VAULT_AAVE, "TreasuryVaultAave", vec![])
            .await?
            .identity;
        ctx.execute_once(
            TREASURY_VAULT_AAVE,
            "initialize",
            vec![
                addresses.usdc.into(),
                treasury.into(),
                addresses.aave_lending_pool.into(),
                addresses.aave_incentives_controller.into(),
            ],
        )
        .await?;

        let controller = ctx
            .deploy(VAULT_CONTROLLER, "VaultController", vec![])
            .await?
            .identity;
        ctx.execute_once(
            VAULT_CONTROLLER,
            "initialize",
            vec![
                vault.into(),
                addresses.operator.into(),
                collateral_reserve.into(),
                share.into(),
            ],
        )
        .await?;
        ctx.execute_once(
            VAULT_CONTROLLER,
            "setSwapOptions",
            vec![
                addresses.router_quickswap.into(),
                vec![addresses.wmatic, addresses.usdc].into(),
            ],
        )
        .await?;
        ctx.execute_once(
            VAULT_CONTROLLER,
            "setSwapOptions",
            vec![
                addresses.router_firebird.into(),
                vec![addresses.usdc, share].into(),
            ],
        )
        .await?;

        ctx.execute_once(
            TREASURY_VAULT_AAVE,
            "transferOwnership",
            vec![controller.into()],
        )
        .await?;

        Ok(())
    }
}
