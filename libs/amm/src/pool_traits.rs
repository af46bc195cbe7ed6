//! Swap capability shared by every pool family

use crate::error::Result;
use crate::pool_state::{Liquidity, PoolReserves};
use rust_decimal::Decimal;

/// Unified interface the pool calculator dispatches to
///
/// Reserves are always passed as `(liq_in, liq_out)`: the balance of the
/// deposited asset first.
pub trait SwapCalculator {
    /// Display price of asset A in units of asset B; `None` when unavailable
    fn price(&self, liq_a: Liquidity, liq_b: Liquidity) -> Option<Decimal>;

    /// Amount taken out of the pool for `amount_deposited`, before trade fee
    fn swap_gross_received(&self, liq_in: u128, liq_out: u128, amount_deposited: u128)
        -> Result<u128>;

    /// Deposit needed for the pool to release `gross_received` before fee
    fn swap_amount_deposited(&self, liq_in: u128, liq_out: u128, gross_received: u128)
        -> Result<u128>;

    /// Pool tokens minted for a deposit of both assets
    fn minted_liquidity_tokens(
        &self,
        added_primary: u128,
        added_secondary: u128,
        reserves: &PoolReserves,
    ) -> Result<u128>;
}
