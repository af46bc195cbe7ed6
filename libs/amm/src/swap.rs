//! Swap effect builder
//!
//! A `Swap` is a hypothetical trade against a snapshot: the effect lists what
//! the trader deposits and receives, the minimum acceptable output for the
//! chosen slippage, and how both assets' prices move.

use crate::error::{Result, ValidationError};
use crate::pool_calculator::{signed_delta, validate_slippage, PoolCalculator};
use crate::pool_state::{decimal_ratio, Asset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which side of the trade the caller fixes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapMode {
    /// `amount` is deposited; the output is computed
    ExactDeposit,
    /// `amount` is received after fee; the deposit is computed
    ExactReceive,
}

/// Outcome of a hypothetical swap
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwapEffect {
    pub amount_deposited: u128,
    /// Net of trade fee
    pub amount_received: u128,
    pub minimum_amount_received: u128,
    /// Trade fee in units of the received asset
    pub fee: u128,
    /// Received per deposited, in display units
    pub price: Option<Decimal>,
    pub primary_price_after_swap: Option<Decimal>,
    pub secondary_price_after_swap: Option<Decimal>,
    pub primary_price_impact_pct: Option<Decimal>,
    pub secondary_price_impact_pct: Option<Decimal>,
}

#[derive(Debug, Clone)]
pub struct Swap {
    pub asset_deposited: Asset,
    pub asset_received: Asset,
    pub amount: u128,
    pub slippage_bps: u32,
    pub mode: SwapMode,
    pub effect: SwapEffect,
}

impl Swap {
    pub fn new(
        calculator: &PoolCalculator,
        asset_deposited: Asset,
        amount: u128,
        slippage_bps: u32,
        mode: SwapMode,
    ) -> Result<Self> {
        validate_slippage(slippage_bps)?;
        let asset_received = calculator.other_asset(&asset_deposited)?;
        if calculator.is_empty() {
            return Err(ValidationError::EmptyPool.into());
        }

        let effect = build_effect(
            calculator,
            &asset_deposited,
            &asset_received,
            amount,
            slippage_bps,
            mode,
        )?;

        Ok(Self {
            asset_deposited,
            asset_received,
            amount,
            slippage_bps,
            mode,
            effect,
        })
    }

    pub fn exact_deposit(
        calculator: &PoolCalculator,
        asset_deposited: Asset,
        amount_deposited: u128,
        slippage_bps: u32,
    ) -> Result<Self> {
        Self::new(
            calculator,
            asset_deposited,
            amount_deposited,
            slippage_bps,
            SwapMode::ExactDeposit,
        )
    }

    pub fn exact_receive(
        calculator: &PoolCalculator,
        asset_deposited: Asset,
        amount_received: u128,
        slippage_bps: u32,
    ) -> Result<Self> {
        Self::new(
            calculator,
            asset_deposited,
            amount_received,
            slippage_bps,
            SwapMode::ExactReceive,
        )
    }
}

fn build_effect(
    calculator: &PoolCalculator,
    asset_deposited: &Asset,
    asset_received: &Asset,
    amount: u128,
    slippage_bps: u32,
    mode: SwapMode,
) -> Result<SwapEffect> {
    let (amount_deposited, gross_received, amount_received) = match mode {
        SwapMode::ExactDeposit => {
            let gross = calculator.gross_amount_from_deposit(asset_deposited, amount)?;
            (amount, gross, calculator.apply_trade_fee(gross)?)
        }
        SwapMode::ExactReceive => {
            let deposited = calculator.amount_deposited_for_net(asset_deposited, amount)?;
            (deposited, calculator.remove_trade_fee(amount)?, amount)
        }
    };

    // The fee stays in the pool, only the net amount leaves
    let (primary_delta, secondary_delta) = if calculator.is_primary(asset_deposited)? {
        (signed_delta(amount_deposited)?, -signed_delta(amount_received)?)
    } else {
        (-signed_delta(amount_received)?, signed_delta(amount_deposited)?)
    };
    let primary = calculator.primary_asset();
    let secondary = calculator.secondary_asset();

    Ok(SwapEffect {
        amount_deposited,
        amount_received,
        minimum_amount_received: calculator.minimum_amount_received(amount_received, slippage_bps)?,
        fee: gross_received - amount_received,
        price: decimal_ratio(
            asset_received.liquidity(amount_received),
            asset_deposited.liquidity(amount_deposited),
        ),
        primary_price_after_swap: calculator.price_after_liquidity_change(
            &primary,
            primary_delta,
            secondary_delta,
        )?,
        secondary_price_after_swap: calculator.price_after_liquidity_change(
            &secondary,
            primary_delta,
            secondary_delta,
        )?,
        primary_price_impact_pct: calculator.price_impact_pct(
            &primary,
            primary_delta,
            secondary_delta,
        )?,
        secondary_price_impact_pct: calculator.price_impact_pct(
            &secondary,
            primary_delta,
            secondary_delta,
        )?,
    })
}
