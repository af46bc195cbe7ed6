//! Constant product (`x*y=k`) math with exact integer rounding
//!
//! Gross outputs round down and required inputs round up, so a preview never
//! promises more than the contract will pay.

use crate::error::{AmmError, InsufficientLiquidityError, Result, ValidationError};
use crate::integer_math::{isqrt, mul_div_ceil, mul_div_floor, to_u128};
use crate::pool_state::{decimal_ratio, Liquidity, PoolReserves};
use crate::pool_traits::SwapCalculator;
use ethers_core::types::U256;
use rust_decimal::Decimal;

/// Constant product calculator; stateless, all inputs are explicit
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantProductCalculator;

impl ConstantProductCalculator {
    pub fn new() -> Self {
        Self
    }
}

impl SwapCalculator for ConstantProductCalculator {
    fn price(&self, liq_a: Liquidity, liq_b: Liquidity) -> Option<Decimal> {
        if liq_a.amount == 0 || liq_b.amount == 0 {
            return Some(Decimal::ZERO);
        }
        decimal_ratio(liq_b, liq_a)
    }

    /// `liq_out * amount_deposited / (liq_in + amount_deposited)`, floored
    fn swap_gross_received(
        &self,
        liq_in: u128,
        liq_out: u128,
        amount_deposited: u128,
    ) -> Result<u128> {
        let denominator = liq_in
            .checked_add(amount_deposited)
            .ok_or_else(|| AmmError::overflow("constant product swap"))?;
        if denominator == 0 {
            return Err(ValidationError::EmptyPool.into());
        }
        mul_div_floor(liq_out, amount_deposited, denominator)
    }

    /// `liq_in * gross_received / (liq_out - gross_received)`, rounded up
    fn swap_amount_deposited(
        &self,
        liq_in: u128,
        liq_out: u128,
        gross_received: u128,
    ) -> Result<u128> {
        if gross_received >= liq_out {
            return Err(ValidationError::LiquidityExceeded {
                requested: gross_received,
                available: liq_out,
            }
            .into());
        }
        mul_div_ceil(liq_in, gross_received, liq_out - gross_received)
    }

    /// First deposit mints `sqrt(a * b)`; later deposits mint pro rata on the
    /// scarcer side and leave any excess of the other asset in the pool.
    fn minted_liquidity_tokens(
        &self,
        added_primary: u128,
        added_secondary: u128,
        reserves: &PoolReserves,
    ) -> Result<u128> {
        let minted = if reserves.is_empty() {
            let product = U256::from(added_primary) * U256::from(added_secondary);
            to_u128(isqrt(product), "initial liquidity")?
        } else {
            let from_primary = mul_div_floor(
                added_primary,
                reserves.total_liquidity,
                reserves.total_primary,
            )?;
            let from_secondary = mul_div_floor(
                added_secondary,
                reserves.total_liquidity,
                reserves.total_secondary,
            )?;
            from_primary.min(from_secondary)
        };

        if minted == 0 {
            return Err(InsufficientLiquidityError::ZeroMinted.into());
        }
        Ok(minted)
    }
}
