//! Single-asset liquidity provision for constant-product pools
//!
//! A zap swaps part of the input into the other asset and deposits both legs.
//! The swap leg `s` solves
//!
//! ```text
//! (10000 - P) s^2 + ((20000 - F) X - z (F - P)) s - 10000 z X = 0
//! ```
//!
//! where `z` is the input amount, `X` the pool reserve of the input asset, `F`
//! the trade fee and `P` the protocol fee in basis points. After the swap the
//! two legs sit in the pool's ratio, so nothing is left over.

use crate::error::{AmmError, Result, ValidationError};
use crate::integer_math::{signed, solve_quadratic_floor, to_u128, unsigned};
use crate::liquidity::LiquidityAddition;
use crate::pool_calculator::{validate_slippage, PoolCalculator};
use crate::pool_state::{Asset, FeeParams, PoolReserves, PoolType, BPS_DENOMINATOR};
use crate::swap::Swap;
use ethers_core::types::U256;
use serde::Serialize;
use tracing::debug;

/// Portion of `zap_amount` to swap so that both legs land in the pool ratio
///
/// The root is clamped to `[0, zap_amount]`.
pub fn swap_amount_deposited_from_zapping(
    zap_amount: u128,
    total_in: u128,
    fees: &FeeParams,
) -> Result<u128> {
    fees.validate()?;
    if zap_amount == 0 {
        return Ok(0);
    }

    let bps = U256::from(BPS_DENOMINATOR);
    let trade_fee = U256::from(fees.trade_fee_bps);
    let protocol_fee = U256::from(fees.protocol_fee_bps);
    let z = U256::from(zap_amount);
    let x = U256::from(total_in);

    let product = |lhs: U256, rhs: U256| {
        lhs.checked_mul(rhs)
            .ok_or_else(|| AmmError::overflow("zap coefficient"))
    };

    let a = signed(bps - protocol_fee)?;
    let b = signed(product(bps * 2 - trade_fee, x)?)?
        .checked_sub(signed(product(z, trade_fee - protocol_fee)?)?)
        .ok_or_else(|| AmmError::overflow("zap coefficient"))?;
    let c = signed(product(product(bps, z)?, x)?)?
        .checked_neg()
        .ok_or_else(|| AmmError::overflow("zap coefficient"))?;

    let root = solve_quadratic_floor(a, b, c)?;
    if root.is_negative() {
        return Ok(0);
    }
    let swap_deposited = to_u128(unsigned(root, "zap root")?, "zap root")?;
    Ok(swap_deposited.min(zap_amount))
}

/// How a zap splits its input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ZapPlan {
    pub swap_deposited: u128,
    pub primary_add_liquidity: u128,
    pub secondary_add_liquidity: u128,
}

impl ZapPlan {
    /// Checks that the swap leg plus the input-side deposit use exactly `input`
    pub fn verify_conservation(&self, input: u128, input_is_primary: bool) -> Result<()> {
        let liquidity_leg = if input_is_primary {
            self.primary_add_liquidity
        } else {
            self.secondary_add_liquidity
        };
        if self.swap_deposited.checked_add(liquidity_leg) != Some(input) {
            return Err(AmmError::ConservationViolated {
                swap_leg: self.swap_deposited,
                liquidity_leg,
                input,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Zap {
    pub asset: Asset,
    pub amount: u128,
    pub slippage_bps: u32,
    pub plan: ZapPlan,
    pub swap: Swap,
    /// Deposit priced against the pool as it stands after the swap leg
    pub liquidity_addition: LiquidityAddition,
}

impl Zap {
    pub fn new(
        calculator: &PoolCalculator,
        asset: Asset,
        amount: u128,
        slippage_bps: u32,
    ) -> Result<Self> {
        if let PoolType::Stableswap(_) = calculator.pool_type() {
            return Err(ValidationError::UnsupportedPoolType {
                operation: "zap",
                pool_type: calculator.pool_type().name(),
            }
            .into());
        }
        validate_slippage(slippage_bps)?;
        let input_is_primary = calculator.is_primary(&asset)?;
        if calculator.is_empty() {
            return Err(ValidationError::EmptyPool.into());
        }

        let (total_in, total_out) = calculator.reserves_for(&asset)?;
        let fees = calculator.state().fees;
        let swap_deposited = swap_amount_deposited_from_zapping(amount, total_in, &fees)?;
        let swap = Swap::exact_deposit(calculator, asset, swap_deposited, slippage_bps)?;

        let received = swap.effect.amount_received;
        let gross = calculator.gross_amount_from_deposit(&asset, swap_deposited)?;
        let protocol_fee = calculator.protocol_fee_from_gross(gross)?;
        let leaving = received
            .checked_add(protocol_fee)
            .ok_or_else(|| AmmError::overflow("zap post-swap reserves"))?;
        let new_in = total_in
            .checked_add(swap_deposited)
            .ok_or_else(|| AmmError::overflow("zap post-swap reserves"))?;
        let new_out = total_out.checked_sub(leaving).ok_or(ValidationError::LiquidityExceeded {
            requested: leaving,
            available: total_out,
        })?;

        let kept = amount - swap_deposited;
        let total_liquidity = calculator.state().reserves.total_liquidity;
        let (reserves, plan) = if input_is_primary {
            (
                PoolReserves::new(new_in, new_out, total_liquidity),
                ZapPlan {
                    swap_deposited,
                    primary_add_liquidity: kept,
                    secondary_add_liquidity: received,
                },
            )
        } else {
            (
                PoolReserves::new(new_out, new_in, total_liquidity),
                ZapPlan {
                    swap_deposited,
                    primary_add_liquidity: received,
                    secondary_add_liquidity: kept,
                },
            )
        };
        plan.verify_conservation(amount, input_is_primary)?;

        let after_swap = calculator.with_reserves(reserves)?;
        let liquidity_addition = LiquidityAddition::new(
            &after_swap,
            plan.primary_add_liquidity,
            plan.secondary_add_liquidity,
        )?;

        debug!(
            asset = asset.id,
            amount,
            swap_deposited,
            minted = liquidity_addition.effect.minted_liquidity_tokens,
            "zap planned"
        );

        Ok(Self {
            asset,
            amount,
            slippage_bps,
            plan,
            swap,
            liquidity_addition,
        })
    }
}
