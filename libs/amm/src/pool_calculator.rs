//! Pool-type-agnostic calculator façade
//!
//! The concrete calculator is picked once from the snapshot's `PoolType` and
//! never re-checked per call. Fee handling, slippage, prices and price impact
//! live here because they are identical for every pool family.

use crate::config::EngineConfig;
use crate::constant_product::ConstantProductCalculator;
use crate::error::{AmmError, Result, ValidationError};
use crate::integer_math::{mul_div_ceil, mul_div_floor};
use crate::pool_state::{Asset, Liquidity, PoolReserves, PoolState, PoolType, BPS_DENOMINATOR};
use crate::pool_traits::SwapCalculator;
use crate::stableswap::StableswapCalculator;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

/// Calculator selected for the pool family
#[derive(Debug, Clone)]
pub enum Calculator {
    ConstantProduct(ConstantProductCalculator),
    Stableswap(StableswapCalculator),
}

impl SwapCalculator for Calculator {
    fn price(&self, liq_a: Liquidity, liq_b: Liquidity) -> Option<Decimal> {
        match self {
            Calculator::ConstantProduct(calc) => calc.price(liq_a, liq_b),
            Calculator::Stableswap(calc) => calc.price(liq_a, liq_b),
        }
    }

    fn swap_gross_received(
        &self,
        liq_in: u128,
        liq_out: u128,
        amount_deposited: u128,
    ) -> Result<u128> {
        match self {
            Calculator::ConstantProduct(calc) => {
                calc.swap_gross_received(liq_in, liq_out, amount_deposited)
            }
            Calculator::Stableswap(calc) => {
                calc.swap_gross_received(liq_in, liq_out, amount_deposited)
            }
        }
    }

    fn swap_amount_deposited(
        &self,
        liq_in: u128,
        liq_out: u128,
        gross_received: u128,
    ) -> Result<u128> {
        match self {
            Calculator::ConstantProduct(calc) => {
                calc.swap_amount_deposited(liq_in, liq_out, gross_received)
            }
            Calculator::Stableswap(calc) => {
                calc.swap_amount_deposited(liq_in, liq_out, gross_received)
            }
        }
    }

    fn minted_liquidity_tokens(
        &self,
        added_primary: u128,
        added_secondary: u128,
        reserves: &PoolReserves,
    ) -> Result<u128> {
        match self {
            Calculator::ConstantProduct(calc) => {
                calc.minted_liquidity_tokens(added_primary, added_secondary, reserves)
            }
            Calculator::Stableswap(calc) => {
                calc.minted_liquidity_tokens(added_primary, added_secondary, reserves)
            }
        }
    }
}

/// Calculator bound to one pool snapshot
#[derive(Debug, Clone)]
pub struct PoolCalculator {
    state: PoolState,
    config: EngineConfig,
    calculator: Calculator,
}

pub(crate) fn validate_slippage(slippage_bps: u32) -> Result<()> {
    if slippage_bps > BPS_DENOMINATOR {
        return Err(ValidationError::InvalidSlippage { slippage_bps }.into());
    }
    Ok(())
}

pub(crate) fn signed_delta(amount: u128) -> Result<i128> {
    i128::try_from(amount).map_err(|_| AmmError::overflow("reserve delta"))
}

fn apply_delta(reserve: u128, delta: i128) -> Result<u128> {
    reserve.checked_add_signed(delta).ok_or_else(|| {
        if delta < 0 {
            ValidationError::LiquidityExceeded {
                requested: delta.unsigned_abs(),
                available: reserve,
            }
            .into()
        } else {
            AmmError::overflow("reserve delta")
        }
    })
}

impl PoolCalculator {
    pub fn new(state: PoolState) -> Result<Self> {
        Self::with_config(state, &EngineConfig::default())
    }

    pub fn with_config(state: PoolState, config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        state.validate()?;

        let calculator = match state.pool_type {
            PoolType::ConstantProduct => {
                Calculator::ConstantProduct(ConstantProductCalculator::new())
            }
            PoolType::Stableswap(params) => Calculator::Stableswap(StableswapCalculator::new(
                params,
                state.fees,
                state.timestamp,
                config,
            )?),
        };

        debug!(
            pool_type = state.pool_type.name(),
            primary_asset = state.primary_asset.id,
            secondary_asset = state.secondary_asset.id,
            "pool calculator ready"
        );

        Ok(Self {
            state,
            config: config.clone(),
            calculator,
        })
    }

    /// Same pool with hypothetical reserves
    pub fn with_reserves(&self, reserves: PoolReserves) -> Result<Self> {
        let state = PoolState {
            reserves,
            ..self.state
        };
        Self::with_config(state, &self.config)
    }

    pub fn state(&self) -> &PoolState {
        &self.state
    }

    pub fn calculator(&self) -> &Calculator {
        &self.calculator
    }

    pub fn pool_type(&self) -> &PoolType {
        &self.state.pool_type
    }

    pub fn primary_asset(&self) -> Asset {
        self.state.primary_asset
    }

    pub fn secondary_asset(&self) -> Asset {
        self.state.secondary_asset
    }

    pub fn is_empty(&self) -> bool {
        self.state.reserves.is_empty()
    }

    /// Amplifier in effect for stableswap pools
    pub fn amplifier(&self) -> Option<u64> {
        match &self.calculator {
            Calculator::ConstantProduct(_) => None,
            Calculator::Stableswap(calc) => Some(calc.amplifier()),
        }
    }

    /// Whether `asset` is the primary asset; errors for non-members
    pub fn is_primary(&self, asset: &Asset) -> Result<bool> {
        if asset.id == self.state.primary_asset.id {
            Ok(true)
        } else if asset.id == self.state.secondary_asset.id {
            Ok(false)
        } else {
            Err(ValidationError::UnknownAsset { asset_id: asset.id }.into())
        }
    }

    pub fn other_asset(&self, asset: &Asset) -> Result<Asset> {
        Ok(if self.is_primary(asset)? {
            self.state.secondary_asset
        } else {
            self.state.primary_asset
        })
    }

    /// `(liq_in, liq_out)` when `asset` is deposited
    pub fn reserves_for(&self, asset: &Asset) -> Result<(u128, u128)> {
        let reserves = &self.state.reserves;
        Ok(if self.is_primary(asset)? {
            (reserves.total_primary, reserves.total_secondary)
        } else {
            (reserves.total_secondary, reserves.total_primary)
        })
    }

    pub fn gross_amount_from_deposit(
        &self,
        asset: &Asset,
        amount_deposited: u128,
    ) -> Result<u128> {
        let (liq_in, liq_out) = self.reserves_for(asset)?;
        self.calculator
            .swap_gross_received(liq_in, liq_out, amount_deposited)
    }

    pub fn amount_deposited_from_gross(
        &self,
        asset: &Asset,
        gross_received: u128,
    ) -> Result<u128> {
        let (liq_in, liq_out) = self.reserves_for(asset)?;
        self.calculator
            .swap_amount_deposited(liq_in, liq_out, gross_received)
    }

    /// `floor(gross * (10000 - fee) / 10000)`
    pub fn apply_trade_fee(&self, gross_amount: u128) -> Result<u128> {
        let fee_bps = self.state.fees.trade_fee_bps;
        mul_div_floor(
            gross_amount,
            u128::from(BPS_DENOMINATOR - fee_bps),
            u128::from(BPS_DENOMINATOR),
        )
    }

    /// Smallest gross amount whose net after fee is at least `net_amount`
    pub fn remove_trade_fee(&self, net_amount: u128) -> Result<u128> {
        let fee_bps = self.state.fees.trade_fee_bps;
        mul_div_ceil(
            net_amount,
            u128::from(BPS_DENOMINATOR),
            u128::from(BPS_DENOMINATOR - fee_bps),
        )
    }

    pub fn fee_from_gross(&self, gross_amount: u128) -> Result<u128> {
        Ok(gross_amount - self.apply_trade_fee(gross_amount)?)
    }

    /// Part of the trade fee that leaves the pool
    pub fn protocol_fee_from_gross(&self, gross_amount: u128) -> Result<u128> {
        mul_div_floor(
            gross_amount,
            u128::from(self.state.fees.protocol_fee_bps),
            u128::from(BPS_DENOMINATOR),
        )
    }

    pub fn net_amount_received(
        &self,
        asset_deposited: &Asset,
        amount_deposited: u128,
    ) -> Result<u128> {
        let gross = self.gross_amount_from_deposit(asset_deposited, amount_deposited)?;
        self.apply_trade_fee(gross)
    }

    /// Deposit of `asset_deposited` needed to receive `net_amount` after fee
    pub fn amount_deposited_for_net(
        &self,
        asset_deposited: &Asset,
        net_amount: u128,
    ) -> Result<u128> {
        let (_, liq_out) = self.reserves_for(asset_deposited)?;
        let gross = self.remove_trade_fee(net_amount)?;
        if gross >= liq_out {
            return Err(ValidationError::LiquidityExceeded {
                requested: gross,
                available: liq_out,
            }
            .into());
        }
        self.amount_deposited_from_gross(asset_deposited, gross)
    }

    /// `net - floor(net * slippage / 10000)`
    pub fn minimum_amount_received(&self, net_amount: u128, slippage_bps: u32) -> Result<u128> {
        validate_slippage(slippage_bps)?;
        let tolerance = mul_div_floor(
            net_amount,
            u128::from(slippage_bps),
            u128::from(BPS_DENOMINATOR),
        )?;
        Ok(net_amount - tolerance)
    }

    fn price_for_reserves(
        &self,
        asset: &Asset,
        primary: u128,
        secondary: u128,
    ) -> Result<Option<Decimal>> {
        let primary = self.state.primary_asset.liquidity(primary);
        let secondary = self.state.secondary_asset.liquidity(secondary);
        Ok(if self.is_primary(asset)? {
            self.calculator.price(primary, secondary)
        } else {
            self.calculator.price(secondary, primary)
        })
    }

    /// Display price of `asset` in units of the other asset
    pub fn price(&self, asset: &Asset) -> Result<Option<Decimal>> {
        let reserves = &self.state.reserves;
        self.price_for_reserves(asset, reserves.total_primary, reserves.total_secondary)
    }

    /// Price of `asset` once the reserves move by the given deltas
    pub fn price_after_liquidity_change(
        &self,
        asset: &Asset,
        primary_delta: i128,
        secondary_delta: i128,
    ) -> Result<Option<Decimal>> {
        let reserves = &self.state.reserves;
        let primary = apply_delta(reserves.total_primary, primary_delta)?;
        let secondary = apply_delta(reserves.total_secondary, secondary_delta)?;
        self.price_for_reserves(asset, primary, secondary)
    }

    /// `(price_after / price_before - 1) * 100`
    pub fn price_impact_pct(
        &self,
        asset: &Asset,
        primary_delta: i128,
        secondary_delta: i128,
    ) -> Result<Option<Decimal>> {
        let before = self.price(asset)?;
        let after = self.price_after_liquidity_change(asset, primary_delta, secondary_delta)?;
        Ok(match (before, after) {
            (Some(before), Some(after)) => after
                .checked_div(before)
                .and_then(|ratio| ratio.checked_sub(Decimal::ONE))
                .and_then(|change| change.checked_mul(dec!(100))),
            _ => None,
        })
    }

    pub fn minted_liquidity_tokens(
        &self,
        added_primary: u128,
        added_secondary: u128,
    ) -> Result<u128> {
        self.calculator
            .minted_liquidity_tokens(added_primary, added_secondary, &self.state.reserves)
    }

    /// Stableswap deposit bonus; constant product pools have none
    pub fn add_liquidity_bonus_pct(
        &self,
        added_primary: u128,
        added_secondary: u128,
    ) -> Result<Decimal> {
        match &self.calculator {
            Calculator::ConstantProduct(_) => Ok(Decimal::ZERO),
            Calculator::Stableswap(calc) => {
                calc.add_liquidity_bonus_pct(added_primary, added_secondary, &self.state.reserves)
            }
        }
    }
}
