//! Liquidity addition and removal effects

use crate::error::{Result, ValidationError};
use crate::integer_math::mul_div_floor;
use crate::pool_calculator::{Calculator, PoolCalculator};
use rust_decimal::Decimal;
use serde::Serialize;

/// Outcome of a hypothetical deposit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiquidityAdditionEffect {
    pub minted_liquidity_tokens: u128,
    /// Amplifier the stableswap computation used
    pub amplifier: Option<u64>,
    /// Stableswap only: positive when the deposit improves pool balance
    pub bonus_pct: Decimal,
}

#[derive(Debug, Clone)]
pub struct LiquidityAddition {
    pub primary_amount: u128,
    pub secondary_amount: u128,
    pub effect: LiquidityAdditionEffect,
}

impl LiquidityAddition {
    pub fn new(
        calculator: &PoolCalculator,
        primary_amount: u128,
        secondary_amount: u128,
    ) -> Result<Self> {
        let reserves = &calculator.state().reserves;
        let effect = match calculator.calculator() {
            Calculator::ConstantProduct(_) => LiquidityAdditionEffect {
                minted_liquidity_tokens: calculator
                    .minted_liquidity_tokens(primary_amount, secondary_amount)?,
                amplifier: None,
                bonus_pct: Decimal::ZERO,
            },
            Calculator::Stableswap(stableswap) => {
                let mint = stableswap.add_liquidity(primary_amount, secondary_amount, reserves)?;
                LiquidityAdditionEffect {
                    minted_liquidity_tokens: mint.minted_liquidity_tokens,
                    amplifier: Some(stableswap.amplifier()),
                    bonus_pct: mint.bonus_pct,
                }
            }
        };

        Ok(Self {
            primary_amount,
            secondary_amount,
            effect,
        })
    }
}

/// Outcome of burning pool tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiquidityRemovalEffect {
    pub liquidity_tokens: u128,
    pub primary_amount: u128,
    pub secondary_amount: u128,
}

#[derive(Debug, Clone)]
pub struct LiquidityRemoval {
    pub effect: LiquidityRemovalEffect,
}

impl LiquidityRemoval {
    /// Pro-rata share of both reserves, rounded down
    pub fn new(calculator: &PoolCalculator, liquidity_tokens: u128) -> Result<Self> {
        let reserves = &calculator.state().reserves;
        if calculator.is_empty() {
            return Err(ValidationError::EmptyPool.into());
        }
        if liquidity_tokens > reserves.total_liquidity {
            return Err(ValidationError::ExcessLiquidityTokens {
                requested: liquidity_tokens,
                available: reserves.total_liquidity,
            }
            .into());
        }

        Ok(Self {
            effect: LiquidityRemovalEffect {
                liquidity_tokens,
                primary_amount: mul_div_floor(
                    reserves.total_primary,
                    liquidity_tokens,
                    reserves.total_liquidity,
                )?,
                secondary_amount: mul_div_floor(
                    reserves.total_secondary,
                    liquidity_tokens,
                    reserves.total_liquidity,
                )?,
            },
        })
    }
}
