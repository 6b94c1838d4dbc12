//! The Ivory protocol stage set.
//!
//! Stages only read constants from the [`ProtocolConfig`] they are built with, so the same
//! procedures deploy against any environment the configuration describes.

use std::sync::Arc;

use crate::{Network, NetworkFilter, ProtocolConfig, Stage};

mod farms;
mod oracles;
mod spot_price;
mod treasury;
mod vaults;
mod zap;

pub use farms::{FarmStage, FarmStartStage};
pub use oracles::OraclesStage;
pub use spot_price::SpotPriceStage;
pub use treasury::MainStage;
pub use vaults::VaultsStage;
pub use zap::ZapStage;

/// Tag shared by every stage of the local protocol deployment.
pub const MOCK_TAG: &str = "mock";

pub const TIMELOCK: &str = "Timelock";
pub const MULTICALL: &str = "Multicall";
pub const TREASURY: &str = "Treasury";
pub const TREASURY_POLICY: &str = "TreasuryPolicy";
pub const COLLATERAL_RATIO_POLICY: &str = "CollateralRatioPolicy";
pub const COLLATERAL_RESERVE: &str = "CollateralReserve";
pub const TREASURY_FUND: &str = "TreasuryFund";
pub const DOLLAR: &str = "Dollar";
pub const SHARE: &str = "Share";
pub const POOL_USDC: &str = "PoolUSDC";
pub const CONSOLIDATED_FUND: &str = "ConsolidatedFund";
pub const SPOT_PRICE_GETTER: &str = "SpotPriceGetter";
pub const PAIR_ORACLE_DOLLAR_USDC: &str = "PairOracle_DOLLAR_USDC";
pub const PAIR_ORACLE_SHARE_USDC: &str = "PairOracle_SHARE_USDC";
pub const COLLATERAL_ORACLE: &str = "CollateralOracle";
pub const DOLLAR_ORACLE: &str = "DollarOracle";
pub const SHARE_ORACLE: &str = "ShareOracle";
pub const ZAP_POOL: &str = "ZapPool";
pub const MASTER_CHEF_0: &str = "MasterChef_IVORY_0";
pub const MASTER_CHEF_1: &str = "MasterChef_IVORY_1";
pub const TREASURY_VAULT_AAVE: &str = "TreasuryVaultAave";
pub const VAULT_CONTROLLER: &str = "VaultController";

/// Networks the protocol stages run on.
fn local_only(network: Network) -> bool {
    NetworkFilter::Local.matches(network)
}

/// Build the full stage sequence, in deployment order.
pub fn stages(config: &ProtocolConfig) -> Vec<Box<dyn Stage>> {
    let config = Arc::new(config.clone());

    vec![
        Box::new(MainStage::new(config.clone())),
        Box::new(SpotPriceStage),
        Box::new(OraclesStage::new(config.clone())),
        Box::new(ZapStage::new(config.clone())),
        Box::new(FarmStage::new(
            "farm-0",
            MASTER_CHEF_0,
            config.farm_0.clone(),
        )),
        Box::new(FarmStage::new(
            "farm-1",
            MASTER_CHEF_1,
            config.farm_1.clone(),
        )),
        Box::new(VaultsStage::new(config.clone())),
        Box::new(FarmStartStage::new(
            "farm-0-start",
            MASTER_CHEF_0,
            config.farm_0.clone(),
        )),
        Box::new(FarmStartStage::new(
            "farm-1-start",
            MASTER_CHEF_1,
            config.farm_1.clone(),
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_and_tags() {
        let stages = stages(&ProtocolConfig::default());
        let names: Vec<_> = stages.iter().map(|stage| stage.name()).collect();

        assert_eq!(
            names,
            [
                "main",
                "spot-price",
                "oracles",
                "zap",
                "farm-0",
                "farm-1",
                "vaults",
                "farm-0-start",
                "farm-1-start",
            ]
        );
        for stage in &stages {
            assert_eq!(stage.tags(), [MOCK_TAG, stage.name()]);
        }
    }

    #[test]
    fn test_stages_are_local_only() {
        for stage in stages(&ProtocolConfig::default()) {
            assert!(stage.applies(Network::Hardhat));
            assert!(stage.applies(Network::Localhost));
            assert!(!stage.applies(Network::Mumbai));
            assert!(!stage.applies(Network::Matic));
        }
    }
}
