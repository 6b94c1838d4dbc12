//! Target networks and the per-stage network predicate.

use serde::{Deserialize, Serialize};

/// A network a deployment can target.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Network {
    /// The in-process development network.
    Hardhat,
    /// A development node listening on the local machine.
    Localhost,
    /// Polygon Mumbai testnet.
    Mumbai,
    /// Polygon mainnet, staging deployment.
    MaticStaging,
    /// Polygon mainnet.
    Matic,
}

impl Network {
    /// Whether this network holds real value.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Mumbai | Self::MaticStaging | Self::Matic)
    }

    /// Whether this network is a local development network.
    pub fn is_local(&self) -> bool {
        !self.is_live()
    }

    /// The chain id a node for this network is expected to report.
    pub fn chain_id(&self) -> u64 {
        match self {
            Self::Hardhat | Self::Localhost => 31337,
            Self::Mumbai => 80001,
            Self::MaticStaging | Self::Matic => 137,
        }
    }
}

/// Predicate deciding which networks a stage applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkFilter {
    Any,
    Local,
    Live,
    Only(Vec<Network>),
}

impl NetworkFilter {
    pub fn matches(&self, network: Network) -> bool {
        match self {
            Self::Any => true,
            Self::Local => network.is_local(),
            Self::Live => network.is_live(),
            Self::Only(networks) => networks.contains(&network),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_network_names_round_trip() {
        for network in Network::iter() {
            assert_eq!(Network::from_str(&network.to_string()).unwrap(), network);
        }
        assert_eq!(Network::from_str("matic_staging").unwrap(), Network::MaticStaging);
        assert!(Network::from_str("ropsten").is_err());
    }

    #[test]
    fn test_local_filter_excludes_live_networks() {
        let filter = NetworkFilter::Local;

        assert!(filter.matches(Network::Hardhat));
        assert!(filter.matches(Network::Localhost));
        assert!(!filter.matches(Network::Mumbai));
        assert!(!filter.matches(Network::Matic));
    }

    #[test]
    fn test_only_filter() {
        let filter = NetworkFilter::Only(vec![Network::Mumbai]);

        assert!(filter.matches(Network::Mumbai));
        assert!(!filter.matches(Network::MaticStaging));
        assert!(NetworkFilter::Any.matches(Network::Matic));
        assert!(NetworkFilter::Live.matches(Network::MaticStaging));
    }
}
