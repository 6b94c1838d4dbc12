use async_trait::async_trait;

use super::*;
use crate::{DeployError, StageContext};

const TAGS: &[&str] = &[MOCK_TAG, "spot-price"];

/// Creates the read-only spot price helper.
pub struct SpotPriceStage;

#[async_trait]
impl Stage for SpotPriceStage {
    fn name(&self) -> &str {
        "spot-price"
    }

    fn tags(&self) -> &[&str] {
        TAGS
    }

    fn applies(&self, network: Network) -> bool {
        local_only(network)
    }

    async fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), DeployError> {
        ctx.deploy(SPOT_PRICE_GETTER, "SpotPriceGetter", vec![])
            .await?;
        Ok(())
    }
}
