//! # AMM Trade Simulation Engine
//!
//! ## Purpose
//!
//! Pure, deterministic math for previewing trades against two-asset liquidity
//! pools before a transaction is submitted. Given a snapshot of pool reserves,
//! fees and amplifier parameters, the engine computes swap outputs, minted
//! liquidity tokens, display prices, price impact and single-asset ("zap")
//! deposits for constant-product and stableswap pools.
//!
//! ## Integration Points
//!
//! - **Input**: [`PoolState`] snapshots supplied by the caller; the engine never
//!   reads a ledger and never mutates the snapshot
//! - **Output**: effect values ([`SwapEffect`], [`LiquidityAdditionEffect`],
//!   [`LiquidityRemovalEffect`], [`ZapPlan`]) that the caller turns into
//!   contract arguments
//! - **Configuration**: [`EngineConfig`] for the stableswap iteration bound,
//!   invariant coefficient form and price-probe retry policy
//!
//! ## Numeric Contract
//!
//! - Every token amount is an unsigned integer in the asset's smallest unit
//! - Invariant and quadratic math runs on 256-bit integers; rounding matches
//!   the on-chain contracts bit for bit
//! - Only display prices use [`Decimal`], and those never feed back into the
//!   integer trade path
//!
//! ## Example
//!
//! ```
//! use amm_sim::{Asset, PoolCalculator, PoolReserves, PoolState, Swap};
//!
//! let state = PoolState::constant_product(
//!     Asset::new(1, 6),
//!     Asset::new(2, 6),
//!     PoolReserves::new(20_000, 20_000, 20_000),
//!     30,
//! );
//! let pool = PoolCalculator::new(state)?;
//! let swap = Swap::exact_deposit(&pool, pool.primary_asset(), 1_000, 100)?;
//! assert_eq!(swap.effect.amount_received, 949);
//! # Ok::<(), amm_sim::AmmError>(())
//! ```

pub mod config;
pub mod constant_product;
pub mod error;
pub mod integer_math;
pub mod liquidity;
pub mod pool_calculator;
pub mod pool_state;
pub mod pool_traits;
pub mod stableswap;
pub mod swap;
pub mod zap;

pub use config::{AmplifierForm, EngineConfig, PriceProbeConfig, StableswapConfig};
pub use constant_product::ConstantProductCalculator;
pub use error::{AmmError, InsufficientLiquidityError, Result, ValidationError};
pub use liquidity::{
    LiquidityAddition, LiquidityAdditionEffect, LiquidityRemoval, LiquidityRemovalEffect,
};
pub use pool_calculator::{Calculator, PoolCalculator};
pub use pool_state::{
    AmplifierParams, Asset, AssetId, FeeParams, Liquidity, PoolReserves, PoolState, PoolType,
    BPS_DENOMINATOR,
};
pub use pool_traits::SwapCalculator;
pub use stableswap::{StableswapCalculator, StableswapMint};
pub use swap::{Swap, SwapEffect, SwapMode};
pub use zap::{swap_amount_deposited_from_zapping, Zap, ZapPlan};

/// Common types for display values
pub use rust_decimal::Decimal;
pub use rust_decimal_macros::dec;
