//! Invariant Math Property Tests
//!
//! Properties of the integer math and both swap calculators that must hold
//! for every reserve snapshot, not just the hand-picked vectors.

use amm_sim::integer_math::{isqrt, solve_quadratic_floor};
use amm_sim::{
    AmplifierParams, ConstantProductCalculator, EngineConfig, FeeParams, StableswapCalculator,
    SwapCalculator,
};
use ethers_core::types::{I256, U256};
use proptest::prelude::*;

prop_compose! {
    fn reserve()
        (amount in 1_000_000u128..1_000_000_000_000u128) -> u128 {
        amount
    }
}

prop_compose! {
    /// Reserves where the output side is at least as deep as the input side
    fn constant_product_reserves()
        (liq_in in reserve())
        (liq_in in Just(liq_in), liq_out in liq_in..=liq_in * 4, dx in 1..=liq_in / 10)
        -> (u128, u128, u128) {
        (liq_in, liq_out, dx)
    }
}

prop_compose! {
    fn stableswap_reserves()
        (liq_in in reserve())
        (liq_in in Just(liq_in), liq_out in liq_in / 2..=liq_in * 2, dx in 1..=liq_in / 10)
        -> (u128, u128, u128) {
        (liq_in, liq_out, dx)
    }
}

prop_compose! {
    fn amplifier_ramp()
        (
            initial_a in 1u64..10_000,
            future_a in 1u64..10_000,
            start in 0i64..1_000_000,
            duration in 1i64..1_000_000,
        ) -> AmplifierParams {
        AmplifierParams {
            initial_a,
            initial_a_time: start,
            future_a,
            future_a_time: start + duration,
            precision: 1,
        }
    }
}

fn stableswap(amp: u64) -> StableswapCalculator {
    StableswapCalculator::new(
        AmplifierParams::constant(amp, 1),
        FeeParams::new(0, 0),
        0,
        &EngineConfig::default(),
    )
    .unwrap()
}

proptest! {
    #[test]
    fn prop_isqrt_is_floor_root(n in any::<u128>()) {
        let root = isqrt(U256::from(n));
        let next = root + U256::one();
        prop_assert!(root * root <= U256::from(n));
        prop_assert!(next * next > U256::from(n));
    }

    #[test]
    fn prop_isqrt_of_square(r in any::<u64>()) {
        let r = U256::from(r);
        prop_assert_eq!(isqrt(r * r), r);
    }

    #[test]
    fn prop_quadratic_root_is_floor(root in 0u64..1_000_000_000, other in 1u64..1_000_000_000) {
        // (x - root)(x + other) = x^2 + (other - root) x - root * other
        let int = |v: u64| I256::from_raw(U256::from(v));
        let b = int(other).checked_sub(int(root)).unwrap();
        let c = int(root).checked_mul(int(other)).unwrap().checked_neg().unwrap();
        let solved = solve_quadratic_floor(int(1), b, c).unwrap();
        prop_assert_eq!(solved, int(root));
    }

    #[test]
    fn prop_constant_product_without_fee_keeps_product(
        (liq_in, liq_out, dx) in constant_product_reserves(),
    ) {
        let calc = ConstantProductCalculator::new();
        let gross = calc.swap_gross_received(liq_in, liq_out, dx).unwrap();
        let k = liq_in * liq_out;
        prop_assert!((liq_in + dx) * (liq_out - gross) >= k);
        prop_assert!((liq_in + dx) * (liq_out - gross - 1) < k);
    }

    #[test]
    fn prop_constant_product_fee_grows_product(
        (liq_in, liq_out, dx) in constant_product_reserves(),
        fee_bps in 1u128..1_000,
    ) {
        let calc = ConstantProductCalculator::new();
        let gross = calc.swap_gross_received(liq_in, liq_out, dx).unwrap();
        prop_assume!(gross > 0);
        let net = gross * (10_000 - fee_bps) / 10_000;
        prop_assert!((liq_in + dx) * (liq_out - net) > liq_in * liq_out);
    }

    #[test]
    fn prop_constant_product_round_trip((liq_in, liq_out, dx) in constant_product_reserves()) {
        let calc = ConstantProductCalculator::new();
        let gross = calc.swap_gross_received(liq_in, liq_out, dx).unwrap();
        prop_assume!(gross > 0);
        let deposited = calc.swap_amount_deposited(liq_in, liq_out, gross).unwrap();
        prop_assert!(deposited <= dx);
        prop_assert!(dx - deposited <= 1);
        // The rounded-up deposit still buys the full gross amount
        prop_assert!(calc.swap_gross_received(liq_in, liq_out, deposited).unwrap() >= gross);
    }

    #[test]
    fn prop_stableswap_round_trip(
        (liq_in, liq_out, dx) in stableswap_reserves(),
        amp in 1u64..2_000,
    ) {
        let calc = stableswap(amp);
        let gross = calc.swap_gross_received(liq_in, liq_out, dx).unwrap();
        prop_assume!(gross > 0);
        let deposited = calc.swap_amount_deposited(liq_in, liq_out, gross).unwrap();
        prop_assert!(deposited.abs_diff(dx) <= 1);
    }

    #[test]
    fn prop_stableswap_output_bounded_by_reserve(
        (liq_in, liq_out, dx) in stableswap_reserves(),
        amp in 1u64..2_000,
    ) {
        let gross = stableswap(amp).swap_gross_received(liq_in, liq_out, dx).unwrap();
        prop_assert!(gross < liq_out);
    }

    #[test]
    fn prop_amplifier_follows_ramp(
        params in amplifier_ramp(),
        t1 in -100i64..3_000_000,
        t2 in -100i64..3_000_000,
    ) {
        let (early, late) = (t1.min(t2), t1.max(t2));
        let (a_early, a_late) = (params.amplifier_at(early), params.amplifier_at(late));

        if params.future_a >= params.initial_a {
            prop_assert!(a_early <= a_late);
        } else {
            prop_assert!(a_early >= a_late);
        }
        let low = params.initial_a.min(params.future_a);
        let high = params.initial_a.max(params.future_a);
        prop_assert!((low..=high).contains(&a_early));
        prop_assert_eq!(params.amplifier_at(params.future_a_time + late.abs()), params.future_a);
    }
}
