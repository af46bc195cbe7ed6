//! Error taxonomy for trade simulation
//!
//! Three families matter to callers: solver non-convergence (recoverable,
//! usually by retrying with different inputs), invalid caller input (never
//! retried) and liquidity shortfalls (user-facing, never retried). Arithmetic
//! overflow of the 256-bit intermediates is reported separately.

use thiserror::Error;

/// Invalid caller input or pool snapshot
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Slippage tolerance outside `[0, 10000]` basis points
    #[error("Slippage must be between 0 and 10000 bps, got {slippage_bps}")]
    InvalidSlippage { slippage_bps: u32 },

    /// Asset is neither the primary nor the secondary asset of the pool
    #[error("Asset {asset_id} is not a member of this pool")]
    UnknownAsset { asset_id: u64 },

    /// Operation requires liquidity but the pool has none
    #[error("Pool is empty")]
    EmptyPool,

    /// Requested amount cannot be taken out of the available reserve
    #[error("Requested {requested} exceeds available liquidity {available}")]
    LiquidityExceeded { requested: u128, available: u128 },

    /// Reserves contradict the pool token supply
    #[error(
        "Inconsistent reserves: primary {total_primary}, secondary {total_secondary}, \
         liquidity {total_liquidity}"
    )]
    InvalidReserves {
        total_primary: u128,
        total_secondary: u128,
        total_liquidity: u128,
    },

    /// Fee parameters out of range
    #[error("Invalid fees: trade fee {trade_fee_bps} bps, protocol fee {protocol_fee_bps} bps")]
    InvalidFee {
        trade_fee_bps: u32,
        protocol_fee_bps: u32,
    },

    /// Amplifier ramp or precision is unusable
    #[error("Invalid amplifier: {reason}")]
    InvalidAmplifier { reason: &'static str },

    /// Operation is not defined for this pool family
    #[error("Operation '{operation}' is not supported for {pool_type} pools")]
    UnsupportedPoolType {
        operation: &'static str,
        pool_type: &'static str,
    },

    /// Leading coefficient of a quadratic must be positive
    #[error("Quadratic leading coefficient must be positive")]
    InvalidQuadratic,

    /// Quadratic has a negative discriminant
    #[error("Quadratic has no real root")]
    NoRealRoot,

    /// Engine configuration cannot drive the solver or the price estimate
    #[error("Invalid engine configuration: {reason}")]
    InvalidConfig { reason: &'static str },

    /// Burning more pool tokens than exist
    #[error("Cannot remove {requested} liquidity tokens, pool supply is {available}")]
    ExcessLiquidityTokens { requested: u128, available: u128 },
}

/// Liquidity shortfalls surfaced to the end user
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InsufficientLiquidityError {
    /// Balance-correction fee would drive a post-fee balance negative
    #[error("Pool liquidity too low to cover add liquidity fee")]
    FeeExceedsLiquidity,

    /// Deposit would mint no pool tokens
    #[error("Amount of minted liquidity tokens must be greater than 0")]
    ZeroMinted,
}

/// Engine error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AmmError {
    /// Newton-Raphson iteration bound exhausted
    #[error("Stableswap invariant did not converge after {iterations} iterations")]
    Convergence { iterations: usize },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    InsufficientLiquidity(#[from] InsufficientLiquidityError),

    /// Intermediate value does not fit the integer type
    #[error("Arithmetic overflow in {operation}")]
    Overflow { operation: &'static str },

    /// Divisor evaluated to zero
    #[error("Division by zero in {operation}")]
    DivisionByZero { operation: &'static str },

    /// Zap legs do not add up to the input amount
    #[error("Zap legs {swap_leg} + {liquidity_leg} do not sum to input {input}")]
    ConservationViolated {
        swap_leg: u128,
        liquidity_leg: u128,
        input: u128,
    },
}

impl AmmError {
    pub(crate) fn overflow(operation: &'static str) -> Self {
        AmmError::Overflow { operation }
    }

    /// Whether retrying with different inputs can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, AmmError::Convergence { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AmmError::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, AmmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(AmmError::Convergence { iterations: 255 }.is_retryable());
        assert!(!AmmError::from(ValidationError::EmptyPool).is_retryable());
        assert!(AmmError::from(ValidationError::EmptyPool).is_validation());
        assert!(!AmmError::from(InsufficientLiquidityError::ZeroMinted).is_validation());
    }

    #[test]
    fn test_fee_message_is_user_facing() {
        let err = AmmError::from(InsufficientLiquidityError::FeeExceedsLiquidity);
        assert_eq!(
            err.to_string(),
            "Pool liquidity too low to cover add liquidity fee"
        );
    }
}
