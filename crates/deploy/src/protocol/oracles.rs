//! Pair, collateral and price oracles, and their wiring into the treasury side.

use std::sync::Arc;

use async_trait::async_trait;

use super::*;
use crate::{DeployError, StageContext, params::minutes};

const TAGS: &[&str] = &[MOCK_TAG, "oracles"];

pub struct OraclesStage {
    config: Arc<ProtocolConfig>,
}

impl OraclesStage {
    pub fn new(config: Arc<ProtocolConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Stage for OraclesStage {
    fn name(&self) -> &str {
        "oracles"
    }

    fn tags(&self) -> &[&str] {
        TAGS
    }

    fn applies(&self, network: Network) -> bool {
        local_only(network)
    }

    async fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), DeployError> {
        let addresses = &self.config.addresses;
        let decimals = self.config.price_oracle_decimals;
        let dollar = ctx.address(DOLLAR)?;
        let share = ctx.address(SHARE)?;

        let oracle_dollar_usdc = ctx
            .deploy(
                PAIR_ORACLE_DOLLAR_USDC,
                "PairOracle",
                vec![addresses.lp_dollar_usdc.into()],
            )
            .await?
            .identity;
        ctx.execute(
            PAIR_ORACLE_DOLLAR_USDC,
            "setOperator",
            vec![addresses.operator.into()],
        )
        .await?;

        let oracle_share_usdc = ctx
            .deploy(
                PAIR_ORACLE_SHARE_USDC,
                "PairOracle",
                vec![addresses.lp_share_usdc.into()],
            )
            .await?
            .identity;
        ctx.execute(
            PAIR_ORACLE_SHARE_USDC,
            "setPeriod",
            vec![minutes(self.config.oracle_period_minutes)?.into()],
        )
        .await?;
        ctx.execute(
            PAIR_ORACLE_SHARE_USDC,
            "setOperator",
            vec![addresses.operator.into()],
        )
        .await?;

        let oracle_collateral = ctx
            .deploy(
                COLLATERAL_ORACLE,
                "CollateralOracle",
                vec![addresses.price_feed_usdc_usd.into()],
            )
            .await?
            .identity;

        let oracle_dollar = ctx
            .deploy(
                DOLLAR_ORACLE,
                "PriceOracle",
                vec![
                    dollar.into(),
                    oracle_dollar_usdc.into(),
                    oracle_collateral.into(),
                    decimals.into(),
                ],
            )
            .await?
            .identity;

        let oracle_share = ctx
            .deploy(
                SHARE_ORACLE,
                "PriceOracle",
                vec![
                    share.into(),
                    oracle_share_usdc.into(),
                    oracle_collateral.into(),
                    decimals.into(),
                ],
            )
            .await?
            .identity;

        ctx.execute(
            COLLATERAL_RATIO_POLICY,
            "setOracleDollar",
            vec![oracle_dollar.into()],
        )
        .await?;
        ctx.execute(POOL_USDC, "setOracle", vec![oracle_collateral.into()])
            .await?;
        ctx.execute(TREASURY, "setOracleDollar", vec![oracle_dollar.into()])
            .await?;
        ctx.execute(TREASURY, "setOracleShare", vec![oracle_share.into()])
            .await?;
        ctx.execute(
            TREASURY,
            "setOracleCollateral",
            vec![oracle_collateral.into()],
        )
        .await?;

        Ok(())
    }
}
