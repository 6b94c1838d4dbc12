//! Reward farms: one stage creates a farm, a later one opens it.

use alloy_core::primitives::Address;
use async_trait::async_trait;

use super::*;
use crate::{
    DeployError, StageContext,
    config::{AssetRef, FarmConfig},
};

fn resolve_asset(ctx: &StageContext<'_>, asset: &AssetRef) -> Result<Address, DeployError> {
    match asset {
        AssetRef::Address(address) => Ok(*address),
        AssetRef::Unit(name) => ctx.address(name),
    }
}

/// Creates a share-emitting farm and registers it with the consolidated fund.
pub struct FarmStage {
    name: &'static str,
    tags: [&'static str; 2],
    unit: &'static str,
    farm: FarmConfig,
}

impl FarmStage {
    pub fn new(name: &'static str, unit: &'static str, farm: FarmConfig) -> Self {
        Self {
            name,
            tags: [MOCK_TAG, name],
            unit,
            farm,
        }
    }
}

#[async_trait]
impl Stage for FarmStage {
    fn name(&self) -> &str {
        self.name
    }

    fn tags(&self) -> &[&str] {
        &self.tags
    }

    fn applies(&self, network: Network) -> bool {
        local_only(network)
    }

    async fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), DeployError> {
        let reward_per_block = self.farm.emission.reward_per_block()?;
        let share = ctx.address(SHARE)?;
        let consolidated_fund = ctx.address(CONSOLIDATED_FUND)?;

        tracing::debug!(
            stage = self.name,
            unit = self.unit,
            %reward_per_block,
            "Resolved farm emission"
        );

        let master_chef = ctx
            .deploy(
                self.unit,
                "MasterChef",
                vec![
                    share.into(),
                    consolidated_fund.into(),
                    reward_per_block.into(),
                    self.farm.start_block.into(),
                ],
            )
            .await?
            .identity;

        ctx.execute_once(
            CONSOLIDATED_FUND,
            "addPool",
            vec![master_chef.into(), share.into()],
        )
        .await?;

        Ok(())
    }
}

/// Sets a farm's start block and its allocation entries.
pub struct FarmStartStage {
    name: &'static str,
    tags: [&'static str; 2],
    unit: &'static str,
    farm: FarmConfig,
}

impl FarmStartStage {
    pub fn new(name: &'static str, unit: &'static str, farm: FarmConfig) -> Self {
        Self {
            name,
            tags: [MOCK_TAG, name],
            unit,
            farm,
        }
    }
}

#[async_trait]
impl Stage for FarmStartStage {
    fn name(&self) -> &str {
        self.name
    }

    fn tags(&self) -> &[&str] {
        &self.tags
    }

    fn applies(&self, network: Network) -> bool {
        local_only(network)
    }

    async fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), DeployError> {
        ctx.execute_once(
            self.unit,
            "setStartBlockOnce",
            vec![self.farm.start_block.into()],
        )
        .await?;

        for allocation in &self.farm.allocations {
            let token = resolve_asset(ctx, &allocation.asset)?;
            ctx.execute_once(
                self.unit,
                "add",
                vec![allocation.alloc_point.into(), token.into()],
            )
            .await?;
        }

        ctx.execute(self.unit, "massUpdatePools", vec![]).await?;

        Ok(())
    }
}
