//! Core protocol units: timelock, treasury and its policies, the two tokens and the USDC pool.

use std::sync::Arc;

use async_trait::async_trait;

use super::*;
use crate::{DeployError, StageContext, Value, params::hours};

const TAGS: &[&str] = &[MOCK_TAG, "main"];

/// Creates and wires the treasury, its policies, both tokens and the USDC pool.
///
/// The pool is created with minting and redeeming paused.
pub struct MainStage {
    config: Arc<ProtocolConfig>,
}

impl MainStage {
    pub fn new(config: Arc<ProtocolConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Stage for MainStage {
    fn name(&self) -> &str {
        "main"
    }

    fn tags(&self) -> &[&str] {
        TAGS
    }

    fn applies(&self, network: Network) -> bool {
        local_only(network)
    }

    async fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), DeployError> {
        let config = &self.config;
        let addresses = &config.addresses;
        let creator = ctx.signer().address;
        let policy = config.treasury_policy.to_args()?;
        let timelock_delay = hours(config.timelock_delay_hours)?;

        tracing::info!(
            stage = ctx.stage(),
            network = %ctx.network(),
            "Deploying main contracts"
        );

        ctx.deploy(
            TIMELOCK,
            "Timelock",
            vec![creator.into(), timelock_delay.into()],
        )
        .await?;
        ctx.deploy(MULTICALL, "Multicall", vec![]).await?;

        let treasury = ctx.deploy(TREASURY, "Treasury", vec![]).await?.identity;

        let treasury_policy = ctx
            .deploy(TREASURY_POLICY, "TreasuryPolicy", vec![])
            .await?
            .identity;
        let mut initialize: Vec<Value> = vec![treasury.into()];
        initialize.extend(policy);
        ctx.execute_once(TREASURY_POLICY, "initialize", initialize)
            .await?;

        let collateral_ratio_policy = ctx
            .deploy(COLLATERAL_RATIO_POLICY, "CollateralRatioPolicy", vec![])
            .await?
            .identity;
        ctx.execute_once(COLLATERAL_RATIO_POLICY, "toggleCollateralRatio", vec![])
            .await?;

        let collateral_reserve = ctx
            .deploy(COLLATERAL_RESERVE, "CollateralReserve", vec![])
            .await?
            .identity;
        ctx.execute_once(COLLATERAL_RESERVE, "initialize", vec![treasury.into()])
            .await?;

        let treasury_fund = ctx
            .deploy(TREASURY_FUND, "TreasuryFund", vec![])
            .await?
            .identity;
        ctx.execute(
            TREASURY_FUND,
            "setOperator",
            vec![addresses.operator.into()],
        )
        .await?;

        let dollar = ctx.deploy(DOLLAR, "Dollar", vec![]).await?.identity;
        ctx.execute_once(
            DOLLAR,
            "initialize",
            vec![
                config.dollar.name.as_str().into(),
                config.dollar.symbol.as_str().into(),
                treasury.into(),
            ],
        )
        .await?;

        let share = ctx.deploy(SHARE, "Share", vec![]).await?.identity;
        // The creator holds the community reward allocation.
        ctx.execute_once(
            SHARE,
            "initialize",
            vec![
                config.share.name.as_str().into(),
                config.share.symbol.as_str().into(),
                treasury.into(),
                treasury_fund.into(),
                creator.into(),
                config.vesting_start_time.into(),
            ],
        )
        .await?;

        let pool_usdc = ctx.deploy(POOL_USDC, "Pool", vec![]).await?.identity;
        ctx.execute_once(
            POOL_USDC,
            "initialize",
            vec![
                dollar.into(),
                share.into(),
                addresses.usdc.into(),
                treasury.into(),
            ],
        )
        .await?;
        ctx.execute_once(POOL_USDC, "toggleMinting", vec![]).await?;
        ctx.execute_once(POOL_USDC, "toggleRedeeming", vec![])
            .await?;

        let consolidated_fund = ctx
            .deploy(CONSOLIDATED_FUND, "ConsolidatedFund", vec![])
            .await?
            .identity;

        ctx.execute_once(TREASURY_FUND, "initialize", vec![share.into()])
            .await?;
        ctx.execute(
            TREASURY_FUND,
            "setOperator",
            vec![addresses.operator.into()],
        )
        .await?;

        ctx.execute_once(
            COLLATERAL_RATIO_POLICY,
            "initialize",
            vec![treasury.into(), dollar.into()],
        )
        .await?;

        // Profit sharing goes to the consolidated fund; the operator is the controller.
        ctx.execute_once(
            TREASURY,
            "initialize",
            vec![
                dollar.into(),
                share.into(),
                addresses.usdc.into(),
                treasury_policy.into(),
                collateral_ratio_policy.into(),
                collateral_reserve.into(),
                consolidated_fund.into(),
                addresses.operator.into(),
            ],
        )
        .await?;
        ctx.execute_once(TREASURY, "addPool", vec![pool_usdc.into()])
            .await?;

        Ok(())
    }
}
