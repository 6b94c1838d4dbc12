//! Parameter resolution.
//!
//! Translates human-meaningful constants (parts-per-million ratios, daily emission totals, time
//! windows) into the exact integers that create and call requests take. Every function here is
//! pure.

use alloy_core::primitives::U256;
use serde::{Deserialize, Serialize};

use crate::{ResolverError, Value};

/// One whole unit expressed in parts-per-million.
pub const PPM: u64 = 1_000_000;

/// Seconds in a day.
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Number of blocks produced per day at the given block interval.
pub fn blocks_per_day(block_interval_secs: u64) -> Result<u64, ResolverError> {
    if block_interval_secs == 0 {
        return Err(ResolverError::NonPositiveDivisor {
            what: "block interval",
        });
    }
    Ok(SECONDS_PER_DAY / block_interval_secs)
}

/// Scale a whole-token amount by `10^decimals`.
pub fn scale_units(amount: u64, decimals: u8) -> Result<U256, ResolverError> {
    let overflow = ResolverError::Overflow {
        what: "scaled amount",
    };
    let factor = U256::from(10u64)
        .checked_pow(U256::from(decimals))
        .ok_or(overflow.clone())?;
    U256::from(amount).checked_mul(factor).ok_or(overflow)
}

/// Per-block reward from a scaled daily emission, truncated toward zero.
pub fn reward_per_block(daily_emission: U256, blocks_per_day: u64) -> Result<U256, ResolverError> {
    if blocks_per_day == 0 {
        return Err(ResolverError::NonPositiveDivisor {
            what: "blocks per day",
        });
    }
    Ok(daily_emission / U256::from(blocks_per_day))
}

/// Validate a parts-per-million ratio.
pub fn ppm(what: &'static str, value: u64) -> Result<U256, ResolverError> {
    if value > PPM {
        return Err(ResolverError::OutOfRange {
            what,
            value,
            max: PPM,
        });
    }
    Ok(U256::from(value))
}

/// A window of `n` hours, in seconds.
pub fn hours(n: u64) -> Result<u64, ResolverError> {
    n.checked_mul(3600)
        .ok_or(ResolverError::Overflow { what: "hours" })
}

/// A window of `n` minutes, in seconds.
pub fn minutes(n: u64) -> Result<u64, ResolverError> {
    n.checked_mul(60)
        .ok_or(ResolverError::Overflow { what: "minutes" })
}

/// Token emission of a reward farm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmissionSchedule {
    /// Whole tokens emitted per day.
    pub daily_emission: u64,
    /// Decimals of the emitted token.
    pub decimals: u8,
    /// Estimated seconds between blocks.
    pub block_interval_secs: u64,
}

impl EmissionSchedule {
    pub fn reward_per_block(&self) -> Result<U256, ResolverError> {
        let daily = scale_units(self.daily_emission, self.decimals)?;
        reward_per_block(daily, blocks_per_day(self.block_interval_secs)?)
    }
}

/// Fee and collateral ratios of the treasury policy, in parts-per-million.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryPolicyParams {
    pub mint_fee: u64,
    pub redeem_fee: u64,
    pub excess_collateral_safety_margin: u64,
    pub idle_collateral_utilization_ratio: u64,
    pub reserved_collateral_threshold: u64,
}

impl Default for TreasuryPolicyParams {
    fn default() -> Self {
        Self {
            mint_fee: 3000,
            redeem_fee: 4000,
            excess_collateral_safety_margin: 150_000,
            idle_collateral_utilization_ratio: 800_000,
            reserved_collateral_threshold: 150_000,
        }
    }
}

impl TreasuryPolicyParams {
    /// Resolve into the trailing arguments of `TreasuryPolicy.initialize`.
    pub fn to_args(&self) -> Result<Vec<Value>, ResolverError> {
        Ok(vec![
            ppm("mint fee", self.mint_fee)?.into(),
            ppm("redeem fee", self.redeem_fee)?.into(),
            ppm(
                "excess collateral safety margin",
                self.excess_collateral_safety_margin,
            )?
            .into(),
            ppm(
                "idle collateral utilization ratio",
                self.idle_collateral_utilization_ratio,
            )?
            .into(),
            ppm(
                "reserved collateral threshold",
                self.reserved_collateral_threshold,
            )?
            .into(),
        ])
    }
}
