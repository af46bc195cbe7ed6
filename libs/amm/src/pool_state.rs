//! Pool snapshot value objects
//!
//! Everything here is supplied by the caller (decoded from on-chain state by
//! the surrounding SDK) and never mutated by the engine.

use crate::error::{Result, ValidationError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type AssetId = u64;

pub const BPS_DENOMINATOR: u32 = 10_000;

/// Pool member asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub decimals: u32,
}

impl Asset {
    pub fn new(id: AssetId, decimals: u32) -> Self {
        Self { id, decimals }
    }

    pub fn liquidity(&self, amount: u128) -> Liquidity {
        Liquidity::new(amount, self.decimals)
    }
}

/// Reserve amount in base units, tagged with the decimals used for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Liquidity {
    pub amount: u128,
    pub decimals: u32,
}

impl Liquidity {
    pub fn new(amount: u128, decimals: u32) -> Self {
        Self { amount, decimals }
    }

    /// Display value; `None` if it does not fit a `Decimal`
    pub fn to_decimal(&self) -> Option<Decimal> {
        let mantissa = i128::try_from(self.amount).ok()?;
        Decimal::try_from_i128_with_scale(mantissa, self.decimals).ok()
    }
}

/// Display ratio `numerator / denominator`, `None` when undefined
pub fn decimal_ratio(numerator: Liquidity, denominator: Liquidity) -> Option<Decimal> {
    let numerator = numerator.to_decimal()?;
    let denominator = denominator.to_decimal()?;
    numerator.checked_div(denominator)
}

/// Current pool balances and pool token supply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PoolReserves {
    pub total_primary: u128,
    pub total_secondary: u128,
    pub total_liquidity: u128,
}

impl PoolReserves {
    pub fn new(total_primary: u128, total_secondary: u128, total_liquidity: u128) -> Self {
        Self {
            total_primary,
            total_secondary,
            total_liquidity,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_liquidity == 0
    }

    /// Pool tokens exist exactly when both reserves are funded
    pub fn validate(&self) -> Result<()> {
        let reserves_empty = self.total_primary == 0 || self.total_secondary == 0;
        if reserves_empty != self.is_empty() {
            return Err(ValidationError::InvalidReserves {
                total_primary: self.total_primary,
                total_secondary: self.total_secondary,
                total_liquidity: self.total_liquidity,
            }
            .into());
        }
        Ok(())
    }
}

/// Basis-point fee schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeeParams {
    pub trade_fee_bps: u32,
    /// Part of `trade_fee_bps` that leaves the pool for the protocol
    pub protocol_fee_bps: u32,
}

impl FeeParams {
    pub fn new(trade_fee_bps: u32, protocol_fee_bps: u32) -> Self {
        Self {
            trade_fee_bps,
            protocol_fee_bps,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.trade_fee_bps >= BPS_DENOMINATOR || self.protocol_fee_bps > self.trade_fee_bps {
            return Err(ValidationError::InvalidFee {
                trade_fee_bps: self.trade_fee_bps,
                protocol_fee_bps: self.protocol_fee_bps,
            }
            .into());
        }
        Ok(())
    }
}

/// Linear ramp of the stableswap amplification coefficient
///
/// `initial_a` and `future_a` are already scaled by `precision`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmplifierParams {
    pub initial_a: u64,
    pub initial_a_time: i64,
    pub future_a: u64,
    pub future_a_time: i64,
    pub precision: u128,
}

impl AmplifierParams {
    /// Fixed amplifier with no ramp
    pub fn constant(a: u64, precision: u128) -> Self {
        Self {
            initial_a: a,
            initial_a_time: 0,
            future_a: a,
            future_a_time: 0,
            precision,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.initial_a_time > self.future_a_time {
            return Err(ValidationError::InvalidAmplifier {
                reason: "ramp ends before it starts",
            }
            .into());
        }
        if self.precision == 0 {
            return Err(ValidationError::InvalidAmplifier {
                reason: "precision must be positive",
            }
            .into());
        }
        Ok(())
    }

    /// Amplifier in effect at unix time `now`
    ///
    /// Interpolates linearly over the ramp and clamps to the ramp's range, so
    /// any `now` past `future_a_time` yields `future_a`.
    pub fn amplifier_at(&self, now: i64) -> u64 {
        let dt = i128::from(self.future_a_time) - i128::from(self.initial_a_time);
        if dt <= 0 || self.future_a == self.initial_a {
            return self.future_a;
        }

        // Clamping time to the ramp clamps the value to [min(A), max(A)]
        let elapsed = (i128::from(now) - i128::from(self.initial_a_time)).clamp(0, dt) as u128;
        let dv = self.future_a.abs_diff(self.initial_a);
        // elapsed <= 2^64 and dv < 2^64, so the product fits
        let step = (elapsed * u128::from(dv) / dt as u128) as u64;

        if self.future_a > self.initial_a {
            self.initial_a + step
        } else {
            self.initial_a - step
        }
    }
}

/// Pool family, fixed when the pool is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolType {
    ConstantProduct,
    Stableswap(AmplifierParams),
}

impl PoolType {
    pub fn name(&self) -> &'static str {
        match self {
            PoolType::ConstantProduct => "constant-product",
            PoolType::Stableswap(_) => "stableswap",
        }
    }
}

/// Complete snapshot a calculator is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolState {
    pub primary_asset: Asset,
    pub secondary_asset: Asset,
    pub reserves: PoolReserves,
    pub fees: FeeParams,
    pub pool_type: PoolType,
    /// Unix seconds at which the snapshot is evaluated
    pub timestamp: i64,
}

impl PoolState {
    pub fn constant_product(
        primary_asset: Asset,
        secondary_asset: Asset,
        reserves: PoolReserves,
        trade_fee_bps: u32,
    ) -> Self {
        Self {
            primary_asset,
            secondary_asset,
            reserves,
            fees: FeeParams::new(trade_fee_bps, 0),
            pool_type: PoolType::ConstantProduct,
            timestamp: 0,
        }
    }

    pub fn stableswap(
        primary_asset: Asset,
        secondary_asset: Asset,
        reserves: PoolReserves,
        fees: FeeParams,
        amplifier: AmplifierParams,
        timestamp: i64,
    ) -> Self {
        Self {
            primary_asset,
            secondary_asset,
            reserves,
            fees,
            pool_type: PoolType::Stableswap(amplifier),
            timestamp,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.reserves.validate()?;
        self.fees.validate()?;
        if let PoolType::Stableswap(amplifier) = &self.pool_type {
            amplifier.validate()?;
        }
        Ok(())
    }
}
