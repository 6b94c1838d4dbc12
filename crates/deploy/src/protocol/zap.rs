use std::sync::Arc;

use async_trait::async_trait;

use super::*;
use crate::{DeployError, StageContext};

const TAGS: &[&str] = &[MOCK_TAG, "zap"];

/// Creates the zap pool, paused, and points it at the Firebird router.
pub struct ZapStage {
    config: Arc<ProtocolConfig>,
}

impl ZapStage {
    pub fn new(config: Arc<ProtocolConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Stage for ZapStage {
    fn name(&self) -> &str {
        "zap"
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
        let oracle_collateral = ctx.address(COLLATERAL_ORACLE)?;
        let dollar = ctx.address(DOLLAR)?;
        let share = ctx.address(SHARE)?;

        ctx.deploy(ZAP_POOL, "ZapPool", vec![]).await?;
        ctx.execute_once(
            ZAP_POOL,
            "initialize",
            vec![
                treasury.into(),
                dollar.into(),
                share.into(),
                addresses.usdc.into(),
                oracle_collateral.into(),
            ],
        )
        .await?;
        ctx.execute_once(ZAP_POOL, "toggleMinting", vec![]).await?;
        ctx.execute(
            ZAP_POOL,
            "setRouter",
            vec![
                addresses.router_firebird.into(),
                vec![addresses.usdc, share].into(),
            ],
        )
        .await?;

        Ok(())
    }
}
