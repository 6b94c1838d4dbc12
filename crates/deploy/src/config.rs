//! Deployment configuration.
//!
//! The defaults reproduce the local development setup; every external address and tunable
//! constant the protocol stages consume lives here rather than in the stage bodies.

use std::{collections::BTreeMap, path::PathBuf};

use alloy_core::primitives::{Address, address};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    Network,
    params::{EmissionSchedule, TreasuryPolicyParams},
};

/// The default name for the configuration file.
pub const CONFIG_FILENAME: &str = "Ivory.toml";

/// Top-level configuration of a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Directory holding one registry per network.
    pub deployments_dir: PathBuf,
    /// Hardhat artifacts directory the templates are loaded from.
    pub artifacts_dir: PathBuf,
    /// Connection settings, keyed by network name.
    pub networks: BTreeMap<String, NetworkConfig>,
    /// Constants consumed by the protocol stages.
    pub protocol: ProtocolConfig,
}

impl Default for DeployConfig {
    fn default() -> Self {
        let local = |url: &str| NetworkConfig {
            url: Url::parse(url).ok(),
            signer: None,
            chain_id: None,
        };

        Self {
            deployments_dir: PathBuf::from("deployments"),
            artifacts_dir: PathBuf::from("artifacts"),
            networks: BTreeMap::from([
                (Network::Hardhat.to_string(), local("http://127.0.0.1:8545")),
                (Network::Localhost.to_string(), local("http://localhost:8545")),
            ]),
            protocol: ProtocolConfig::default(),
        }
    }
}

impl DeployConfig {
    pub fn network(&self, network: Network) -> Option<&NetworkConfig> {
        self.networks.get(&network.to_string())
    }

    /// Chain id the node for `network` must report.
    ///
    /// A configured override wins, so a local node forking mainnet can report chain 1.
    pub fn expected_chain_id(&self, network: Network) -> u64 {
        self.network(network)
            .and_then(|settings| settings.chain_id)
            .unwrap_or_else(|| network.chain_id())
    }

    /// Directory of the registry for `network`.
    pub fn registry_dir(&self, network: Network) -> PathBuf {
        self.deployments_dir.join(network.to_string())
    }
}

/// How to reach a network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// JSON-RPC endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<Url>,
    /// Account requests are sent from. Defaults to the node's first account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer: Option<Address>,
    /// Chain id the node reports, when it differs from the network's own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
}

/// Name and symbol of a token unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
}

/// Addresses of pre-existing units the protocol is wired to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalAddresses {
    pub usdc: Address,
    pub wmatic: Address,
    pub operator: Address,
    pub lp_dollar_usdc: Address,
    pub lp_share_usdc: Address,
    pub price_feed_usdc_usd: Address,
    pub router_firebird: Address,
    pub router_quickswap: Address,
    pub aave_lending_pool: Address,
    pub aave_incentives_controller: Address,
}

impl Default for ExternalAddresses {
    fn default() -> Self {
        Self {
            usdc: address!("0x2791Bca1f2de4661ED88A30C99A7a9449Aa84174"),
            wmatic: address!("0x0d500b1d8e8ef31e21c99d1db9a6444d3adf1270"),
            operator: address!("0x974AC76c7870d941AafB03a716e1fec498808291"),
            lp_dollar_usdc: address!("0xd70f14f13ef3590e537bbd225754248965a3593c"),
            lp_share_usdc: address!("0x10995233Ef7b3abd1a2706a86FFeA456ebae8796"),
            price_feed_usdc_usd: address!("0xfE4A8cc5b5B2366C1B58Bea3858e81843581b2F7"),
            router_firebird: address!("0xF6fa9Ea1f64f1BBfA8d71f7f43fAF6D45520bfac"),
            router_quickswap: address!("0xa5E0829CaCEd8fFDD4De3c43696c57F7D7A678ff"),
            aave_lending_pool: address!("0x8dff5e27ea6b7ac08ebfdf9eb090f32ee9a30fcf"),
            aave_incentives_controller: address!("0x357D51124f59836DeD84c8a1730D72B749d8BC23"),
        }
    }
}

/// A token staked in a farm: either a unit created by a stage or an external address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssetRef {
    Address(Address),
    Unit(String),
}

/// One allocation entry of a farm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    /// Share of the farm's emission, out of the farm's total allocation points.
    pub alloc_point: u64,
    pub asset: AssetRef,
}

/// A reward farm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FarmConfig {
    pub emission: EmissionSchedule,
    pub start_block: u64,
    pub allocations: Vec<Allocation>,
}

/// Constants consumed by the protocol stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    pub addresses: ExternalAddresses,
    pub treasury_policy: TreasuryPolicyParams,
    pub dollar: TokenMetadata,
    pub share: TokenMetadata,
    /// Delay of the timelock, in hours.
    pub timelock_delay_hours: u64,
    /// TWAP period of the share pair oracle, in minutes.
    pub oracle_period_minutes: u64,
    /// Decimal precision handed to the price oracles.
    pub price_oracle_decimals: u64,
    /// Unix timestamp at which share vesting starts.
    pub vesting_start_time: u64,
    pub farm_0: FarmConfig,
    pub farm_1: FarmConfig,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        let addresses = ExternalAddresses::default();
        let emission = EmissionSchedule {
            daily_emission: 383_562,
            decimals: 18,
            block_interval_secs: 2,
        };

        Self {
            treasury_policy: TreasuryPolicyParams::default(),
            dollar: TokenMetadata {
                name: "Tower Stablecoin".to_string(),
                symbol: "TOWER".to_string(),
            },
            share: TokenMetadata {
                name: "Ivory Token".to_string(),
                symbol: "IVORY".to_string(),
            },
            timelock_delay_hours: 12,
            oracle_period_minutes: 10,
            price_oracle_decimals: 12,
            // Friday, October 8, 2021 12:00:00 PM UTC
            vesting_start_time: 1_633_694_400,
            farm_0: FarmConfig {
                emission,
                start_block: 0,
                allocations: vec![
                    Allocation {
                        alloc_point: 25_000,
                        asset: AssetRef::Unit(crate::protocol::SHARE.to_string()),
                    },
                    Allocation {
                        alloc_point: 75_000,
                        asset: AssetRef::Address(addresses.lp_share_usdc),
                    },
                ],
            },
            farm_1: FarmConfig {
                emission,
                start_block: 0,
                allocations: vec![Allocation {
                    alloc_point: 100_000,
                    asset: AssetRef::Address(addresses.lp_dollar_usdc),
                }],
            },
            addresses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_round_trips_through_json() {
        let config = DeployConfig::default();
        let json = serde_json::to_string(&config).unwrap();

        assert_eq!(serde_json::from_str::<DeployConfig>(&json).unwrap(), config);
    }

    #[test]
    fn test_asset_ref_accepts_unit_names_and_addresses() {
        let unit: AssetRef = serde_json::from_str("\"Share\"").unwrap();
        let address: AssetRef =
            serde_json::from_str("\"0x10995233Ef7b3abd1a2706a86FFeA456ebae8796\"").unwrap();

        assert_eq!(unit, AssetRef::Unit("Share".to_string()));
        assert_eq!(
            address,
            AssetRef::Address(ExternalAddresses::default().lp_share_usdc)
        );
    }

    #[test]
    fn test_live_networks_have_no_default_endpoint() {
        let config = DeployConfig::default();

        assert!(config.network(Network::Localhost).unwrap().url.is_some());
        assert!(config.network(Network::Matic).is_none());
        assert_eq!(
            config.registry_dir(Network::Localhost),
            PathBuf::from("deployments/localhost")
        );
    }

    #[test]
    fn test_chain_id_override() {
        let mut config = DeployConfig::default();
        assert_eq!(
            config.expected_chain_id(Network::Hardhat),
            Network::Hardhat.chain_id()
        );

        config
            .networks
            .get_mut(&Network::Hardhat.to_string())
            .unwrap()
            .chain_id = Some(1);

        assert_eq!(config.expected_chain_id(Network::Hardhat), 1);
        assert_eq!(
            config.expected_chain_id(Network::Localhost),
            Network::Localhost.chain_id()
        );
    }
}
