//! Integer-only math primitives
//!
//! Every token amount produced by this crate flows through these helpers, so
//! they must round exactly like the on-chain fixed-point code: floor square
//! roots, floor/ceil divisions over 256-bit intermediates, and a quadratic
//! solver that picks the cancellation-free branch.

use crate::error::{AmmError, Result, ValidationError};
use ethers_core::types::{Sign, I256, U256};

/// Largest `r` such that `r * r <= n`
pub fn isqrt(n: U256) -> U256 {
    if n < U256::from(2u8) {
        return n;
    }

    if n < U256::from(16u8) {
        // Root is at most 3: guess the two low bits directly
        let n = n.low_u64();
        let mut root = 0u64;
        let mut bit = 2u64;
        while bit > 0 {
            let candidate = root | bit;
            if candidate * candidate <= n {
                root = candidate;
            }
            bit >>= 1;
        }
        return U256::from(root);
    }

    // 2^ceil(bits/2) is never below the root, so the iterates decrease
    let mut x = U256::one() << ((n.bits() + 1) / 2);
    loop {
        let y = (n / x + x) >> 1;
        let diff = if y > x { y - x } else { x - y };
        if diff <= U256::one() {
            let r = x.min(y);
            let too_big = r.checked_mul(r).map_or(true, |square| square > n);
            return if too_big { r - U256::one() } else { r };
        }
        x = y;
    }
}

/// Floor of the larger root of `a*x^2 + b*x + c = 0`
///
/// `a` must be positive. For `b <= 0` the textbook `(-b + sqrt(d)) / 2a` has
/// no cancellation; for `b > 0` the equivalent `-2c / (b + sqrt(d))` is used
/// instead.
pub fn solve_quadratic_floor(a: I256, b: I256, c: I256) -> Result<I256> {
    if a <= I256::zero() {
        return Err(ValidationError::InvalidQuadratic.into());
    }

    let b_squared = b
        .checked_mul(b)
        .ok_or_else(|| AmmError::overflow("quadratic discriminant"))?;
    let four_ac = a
        .checked_mul(c)
        .and_then(|ac| ac.checked_mul(I256::from_raw(U256::from(4u8))))
        .ok_or_else(|| AmmError::overflow("quadratic discriminant"))?;
    let discriminant = b_squared
        .checked_sub(four_ac)
        .ok_or_else(|| AmmError::overflow("quadratic discriminant"))?;
    if discriminant.is_negative() {
        return Err(ValidationError::NoRealRoot.into());
    }

    let root = signed(isqrt(discriminant.into_raw()))?;
    let two = I256::from_raw(U256::from(2u8));

    if b <= I256::zero() {
        let numerator = b
            .checked_neg()
            .and_then(|neg_b| neg_b.checked_add(root))
            .ok_or_else(|| AmmError::overflow("quadratic root"))?;
        let denominator = a
            .checked_mul(two)
            .ok_or_else(|| AmmError::overflow("quadratic root"))?;
        floor_div(numerator, denominator)
    } else {
        let numerator = c
            .checked_mul(two)
            .and_then(|two_c| two_c.checked_neg())
            .ok_or_else(|| AmmError::overflow("quadratic root"))?;
        let denominator = b
            .checked_add(root)
            .ok_or_else(|| AmmError::overflow("quadratic root"))?;
        floor_div(numerator, denominator)
    }
}

/// Signed division rounding toward negative infinity
pub fn floor_div(numerator: I256, denominator: I256) -> Result<I256> {
    if denominator.is_zero() {
        return Err(AmmError::DivisionByZero {
            operation: "floor_div",
        });
    }

    let negative = numerator.is_negative() != denominator.is_negative();
    let (_, num_abs) = numerator.into_sign_and_abs();
    let (_, den_abs) = denominator.into_sign_and_abs();
    let quotient = num_abs / den_abs;

    if negative && !num_abs.is_zero() {
        let rounded = if (num_abs % den_abs).is_zero() {
            quotient
        } else {
            quotient + U256::one()
        };
        I256::checked_from_sign_and_abs(Sign::Negative, rounded)
            .ok_or_else(|| AmmError::overflow("floor_div"))
    } else {
        signed(quotient)
    }
}

/// `floor(a * b / d)` with a 256-bit intermediate product
pub fn mul_div_floor(a: u128, b: u128, d: u128) -> Result<u128> {
    if d == 0 {
        return Err(AmmError::DivisionByZero {
            operation: "mul_div_floor",
        });
    }
    to_u128(U256::from(a) * U256::from(b) / U256::from(d), "mul_div_floor")
}

/// `ceil(a * b / d)` with a 256-bit intermediate product
pub fn mul_div_ceil(a: u128, b: u128, d: u128) -> Result<u128> {
    if d == 0 {
        return Err(AmmError::DivisionByZero {
            operation: "mul_div_ceil",
        });
    }
    let product = U256::from(a) * U256::from(b);
    let divisor = U256::from(d);
    let mut quotient = product / divisor;
    if !(product % divisor).is_zero() {
        quotient += U256::one();
    }
    to_u128(quotient, "mul_div_ceil")
}

/// Narrow to `u128`, reporting `operation` on overflow
pub fn to_u128(value: U256, operation: &'static str) -> Result<u128> {
    if value.bits() > 128 {
        return Err(AmmError::overflow(operation));
    }
    Ok(value.low_u128())
}

/// Non-negative `U256` as `I256`
pub fn signed(value: U256) -> Result<I256> {
    I256::checked_from_sign_and_abs(Sign::Positive, value)
        .ok_or_else(|| AmmError::overflow("signed conversion"))
}

/// `I256` known to be non-negative as `U256`
pub fn unsigned(value: I256, operation: &'static str) -> Result<U256> {
    if value.is_negative() {
        return Err(AmmError::overflow(operation));
    }
    Ok(value.into_raw())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn i(value: i128) -> I256 {
        let sign = if value < 0 { Sign::Negative } else { Sign::Positive };
        I256::checked_from_sign_and_abs(sign, U256::from(value.unsigned_abs())).unwrap()
    }

    #[test]
    fn test_isqrt_small_values() {
        let expected = [0u64, 1, 1, 1, 2, 2, 2, 2, 2, 3, 3, 3, 3, 3, 3, 3, 4, 4];
        for (n, root) in expected.iter().enumerate() {
            assert_eq!(isqrt(U256::from(n as u64)), U256::from(*root), "isqrt({n})");
        }
    }

    #[test]
    fn test_isqrt_perfect_squares_and_neighbours() {
        for r in [4u128, 17, 1_000, 10_000, 65_535, 1 << 40, u64::MAX as u128] {
            let square = U256::from(r) * U256::from(r);
            assert_eq!(isqrt(square), U256::from(r));
            assert_eq!(isqrt(square - U256::one()), U256::from(r - 1));
            assert_eq!(isqrt(square + U256::one()), U256::from(r));
        }
    }

    #[test]
    fn test_isqrt_full_width() {
        let root = isqrt(U256::MAX);
        assert_eq!(root, U256::from(u128::MAX));
    }

    #[test]
    fn test_quadratic_negative_b_branch() {
        // x^2 - 5x + 6 = 0 -> roots 2 and 3
        assert_eq!(solve_quadratic_floor(i(1), i(-5), i(6)).unwrap(), i(3));
        // x^2 - 2 = 0 -> floor(sqrt 2)
        assert_eq!(solve_quadratic_floor(i(1), i(0), i(-2)).unwrap(), i(1));
    }

    #[test]
    fn test_quadratic_positive_b_branch() {
        // x^2 + 2x - 15 = 0 -> roots 3 and -5
        assert_eq!(solve_quadratic_floor(i(1), i(2), i(-15)).unwrap(), i(3));
        // 2x^2 + 3x - 100 = 0 -> larger root ~6.3666
        assert_eq!(solve_quadratic_floor(i(2), i(3), i(-100)).unwrap(), i(6));
        // x^2 + 5x + 6 = 0 -> larger root -2
        assert_eq!(solve_quadratic_floor(i(1), i(5), i(6)).unwrap(), i(-2));
    }

    #[test]
    fn test_quadratic_rejects_bad_input() {
        assert_eq!(
            solve_quadratic_floor(i(0), i(1), i(1)),
            Err(ValidationError::InvalidQuadratic.into())
        );
        assert_eq!(
            solve_quadratic_floor(i(1), i(0), i(1)),
            Err(ValidationError::NoRealRoot.into())
        );
    }

    #[test]
    fn test_floor_div_rounds_down() {
        assert_eq!(floor_div(i(7), i(2)).unwrap(), i(3));
        assert_eq!(floor_div(i(-7), i(2)).unwrap(), i(-4));
        assert_eq!(floor_div(i(-8), i(2)).unwrap(), i(-4));
        assert_eq!(floor_div(i(7), i(-2)).unwrap(), i(-4));
        assert!(floor_div(i(1), i(0)).is_err());
    }

    #[test]
    fn test_mul_div_rounding() {
        assert_eq!(mul_div_floor(20_000, 1_000, 21_000).unwrap(), 952);
        assert_eq!(mul_div_ceil(20_000, 1_000, 21_000).unwrap(), 953);
        assert_eq!(mul_div_ceil(10, 10, 5).unwrap(), 20);
        assert_eq!(mul_div_floor(u128::MAX, 2, 4).unwrap(), u128::MAX / 2);
        assert!(mul_div_floor(u128::MAX, 2, 1).is_err());
    }
}
