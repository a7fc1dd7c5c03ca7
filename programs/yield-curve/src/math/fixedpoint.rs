// SPDX-License-Identifier: MIT

use anchor_lang::prelude::*;
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{One, Signed, ToPrimitive, Zero};
use primitive_types::U256;

use crate::error::ErrorCode;

/// Upper bound on the bracketing steps taken by `approx_nth_root`.
///
/// The search needs roughly 3.3 steps per decimal digit of the argument, so this
/// covers arguments well past a thousand digits.
pub const MAX_ROOT_ITERATIONS: u32 = 4096;

/**
 * @dev Arithmetic over 18 decimal fixed point numbers, mirroring the ledger representation.
 *
 * Values are plain `BigInt`s holding `v = decimal * 10^18`. Intermediate products are unbounded, so none of these
 * operations can overflow; the ledger width only matters when converting back with `to_u256`.
 *
 * Exponents and root indices are plain integer counts, not fixed point numbers: `pow(x, 2)` squares `x`.
 */
pub struct FixedPoint;

impl FixedPoint {
    pub const ONE: u64 = 1_000_000_000_000_000_000; // 18 decimal places
    pub const DECIMALS: u32 = 18;

    /// `10^DECIMALS`, i.e. `ONE` as a `BigInt`.
    pub fn scale() -> BigInt {
        BigInt::from(10u8).pow(Self::DECIMALS)
    }

    /// Lifts a whole number into the scaled representation.
    pub fn from_integer(value: i64) -> BigInt {
        BigInt::from(value) * Self::scale()
    }

    /**
     * @dev Returns a * b, truncating toward zero.
     */
    pub fn mul(a: &BigInt, b: &BigInt) -> BigInt {
        (a * b) / Self::scale()
    }

    /**
     * @dev Returns n / d, truncating toward zero. Reverts on a zero divisor.
     */
    pub fn div(n: &BigInt, d: &BigInt) -> Result<BigInt> {
        require!(!d.is_zero(), ErrorCode::DivisionByZero);

        Ok((n * Self::scale()) / d)
    }

    /**
     * @dev Returns base^exponent for an integer exponent, computed exactly as
     * base^exponent / ONE^(exponent - 1) with a single final truncation.
     *
     * An exponent of zero yields ONE, the same 0^0 convention as the natural exp/log library.
     */
    pub fn pow(base: &BigInt, exponent: u32) -> BigInt {
        match exponent {
            0 => Self::scale(),
            1 => base.clone(),
            _ => base.pow(exponent) / Self::scale().pow(exponent - 1),
        }
    }

    /**
     * @dev Returns the largest fixed point value `r` with pow(r, n) <= num, i.e. floor(num^(1/n)) at 18 decimals.
     *
     * `num` must represent a decimal strictly greater than 1.0. The search starts at 1.0 and walks towards the root
     * with a step of (num - 1.0) / divisor, doubling the divisor every iteration and never stepping less than one raw
     * unit. It stops once both brackets hold:
     *
     *   pow(r, n) <= num < pow(r + 1, n)
     *
     * The step does not always halve the remaining interval and its direction depends on which bracket fails, so the
     * loop is capped at `MAX_ROOT_ITERATIONS` and reports `NonConvergence` instead of spinning.
     */
    pub fn approx_nth_root(num: &BigInt, n: u32) -> Result<BigInt> {
        let one = Self::scale();
        if num <= &one {
            msg!("approx_nth_root: argument {} is not above 1.0", num);
            return err!(ErrorCode::RootOutOfDomain);
        }
        require!(n >= 1, ErrorCode::InvalidArgument);
        if n == 1 {
            return Ok(num.clone());
        }

        let unit = BigInt::one();
        let diff = num - &one;
        let mut divisor = BigInt::from(4u8);
        let mut approx = one;

        let mut top_satisfies = &Self::pow(&(&approx + &unit), n) > num;
        let mut bottom_satisfies = &Self::pow(&approx, n) <= num;

        let mut iterations = 0u32;
        while !(top_satisfies && bottom_satisfies) {
            if iterations == MAX_ROOT_ITERATIONS {
                msg!("approx_nth_root: no bracket for n={} after {} iterations", n, iterations);
                return err!(ErrorCode::NonConvergence);
            }
            iterations += 1;

            let shift = std::cmp::max(&diff / &divisor, unit.clone());
            if !top_satisfies {
                approx += shift;
            } else if !bottom_satisfies {
                approx -= shift;
            }
            divisor <<= 1;

            top_satisfies = &Self::pow(&(&approx + &unit), n) > num;
            bottom_satisfies = &Self::pow(&approx, n) <= num;
        }

        Ok(approx)
    }

    /**
     * @dev Lifts a ledger word into the scaled domain. The word is taken as already scaled.
     */
    pub fn from_u256(value: U256) -> BigInt {
        let bytes: Vec<u8> = value.0.iter().flat_map(|limb| limb.to_le_bytes()).collect();
        BigInt::from_biguint(Sign::Plus, BigUint::from_bytes_le(&bytes))
    }

    /**
     * @dev Lowers a scaled value back into a ledger word. Reverts if it is negative or does not fit in 256 bits.
     */
    pub fn to_u256(value: &BigInt) -> Result<U256> {
        require!(!value.is_negative(), ErrorCode::MathOverflow);
        require!(value.bits() <= 256, ErrorCode::MathOverflow);

        let (_, bytes) = value.to_bytes_le();
        let mut limbs = [0u64; 4];
        for (limb, chunk) in limbs.iter_mut().zip(bytes.chunks(8)) {
            let mut word = [0u8; 8];
            word[..chunk.len()].copy_from_slice(chunk);
            *limb = u64::from_le_bytes(word);
        }
        Ok(U256(limbs))
    }

    /// Lossy view of a scaled value as a binary64 decimal, for comparing against the floating point reference model.
    pub fn to_f64(value: &BigInt) -> f64 {
        let one = Self::scale();
        let whole = (value / &one).to_f64().unwrap_or(f64::NAN);
        let frac = (value % &one).to_f64().unwrap_or(f64::NAN);
        whole + frac / Self::ONE as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anchor_lang::error::Error;
    use proptest::prelude::*;

    fn wad(value: i64) -> BigInt {
        FixedPoint::from_integer(value)
    }

    #[test]
    fn test_mul_basic() {
        // 2.0 * 3.0 = 6.0
        assert_eq!(FixedPoint::mul(&wad(2), &wad(3)), wad(6));
    }

    #[test]
    fn test_mul_truncates_toward_zero() {
        // 1e-18 * 0.5 = 0.5e-18, truncated
        let half = BigInt::from(500_000_000_000_000_000u64);
        assert_eq!(FixedPoint::mul(&BigInt::from(1), &half), BigInt::zero());
        assert_eq!(FixedPoint::mul(&BigInt::from(-1), &half), BigInt::zero());
        // -1.5 * 1.000000000000000001 keeps its sign and drops the tail
        let a = BigInt::from(-1_500_000_000_000_000_000i128);
        let b = BigInt::from(1_000_000_000_000_000_001u64);
        assert_eq!(FixedPoint::mul(&a, &b), BigInt::from(-1_500_000_000_000_000_001i128));
    }

    #[test]
    fn test_div_basic() {
        // 6.0 / 3.0 = 2.0
        assert_eq!(FixedPoint::div(&wad(6), &wad(3)).unwrap(), wad(2));
        // 1.0 / 3.0 = 0.333333333333333333
        assert_eq!(
            FixedPoint::div(&wad(1), &wad(3)).unwrap(),
            BigInt::from(333_333_333_333_333_333u64)
        );
    }

    #[test]
    fn test_div_by_zero() {
        let err = FixedPoint::div(&wad(6), &BigInt::zero()).unwrap_err();
        assert_eq!(err, Error::from(ErrorCode::DivisionByZero));
    }

    #[test]
    fn test_pow_small_exponents() {
        let x = BigInt::from(1_500_000_000_000_000_000u64); // 1.5
        assert_eq!(FixedPoint::pow(&x, 0), FixedPoint::scale());
        assert_eq!(FixedPoint::pow(&x, 1), x);
        assert_eq!(FixedPoint::pow(&x, 2), BigInt::from(2_250_000_000_000_000_000u64));
        assert_eq!(FixedPoint::pow(&x, 3), BigInt::from(3_375_000_000_000_000_000u64));
    }

    #[test]
    fn test_pow_truncates_once() {
        // (1 + 1e-18)^2 = 1 + 2e-18 + 1e-36; a single truncation keeps the 2e-18
        let x = BigInt::from(1_000_000_000_000_000_001u64);
        assert_eq!(FixedPoint::pow(&x, 2), BigInt::from(1_000_000_000_000_000_002u64));
        // 0.000000001^3 underflows to zero
        let tiny = BigInt::from(1_000_000_000u64);
        assert_eq!(FixedPoint::pow(&tiny, 3), BigInt::zero());
    }

    #[test]
    fn test_nth_root_square() {
        // sqrt(4.0) = 2.0 exactly
        let root = FixedPoint::approx_nth_root(&wad(4), 2).unwrap();
        assert_eq!(root, wad(2));
    }

    #[test]
    fn test_nth_root_identity_index() {
        let num = BigInt::from(7_250_000_000_000_000_000u64);
        assert_eq!(FixedPoint::approx_nth_root(&num, 1).unwrap(), num);
    }

    #[test]
    fn test_nth_root_irrational() {
        // cbrt(2.0) = 1.259921049894873164...
        let root = FixedPoint::approx_nth_root(&wad(2), 3).unwrap();
        assert_eq!(root, BigInt::from(1_259_921_049_894_873_164u64));
        assert!(FixedPoint::pow(&root, 3) <= wad(2));
        assert!(FixedPoint::pow(&(&root + 1), 3) > wad(2));
    }

    #[test]
    fn test_nth_root_just_above_one() {
        // Anything within one raw unit of 1.0 roots to 1.0
        let num = FixedPoint::scale() + 1;
        assert_eq!(FixedPoint::approx_nth_root(&num, 2).unwrap(), FixedPoint::scale());
        assert_eq!(FixedPoint::approx_nth_root(&num, 5).unwrap(), FixedPoint::scale());
    }

    #[test]
    fn test_nth_root_large_argument() {
        // 1e59 as a decimal, well past the ledger word
        let num = BigInt::from(10).pow(77);
        let root = FixedPoint::approx_nth_root(&num, 3).unwrap();
        assert!(FixedPoint::pow(&root, 3) <= num);
        assert!(FixedPoint::pow(&(&root + 1), 3) > num);
        assert_eq!(root, "46415888336127788924100763509194465765".parse::<BigInt>().unwrap());
        println!("cbrt(1e59) = {}", root);
    }

    #[test]
    fn test_nth_root_rejects_values_at_or_below_one() {
        let err = FixedPoint::approx_nth_root(&FixedPoint::scale(), 2).unwrap_err();
        assert_eq!(err, Error::from(ErrorCode::RootOutOfDomain));
        let err = FixedPoint::approx_nth_root(&BigInt::from(500_000_000_000_000_000u64), 2).unwrap_err();
        assert_eq!(err, Error::from(ErrorCode::RootOutOfDomain));
        let err = FixedPoint::approx_nth_root(&BigInt::from(-4), 2).unwrap_err();
        assert_eq!(err, Error::from(ErrorCode::RootOutOfDomain));
    }

    #[test]
    fn test_scale_matches_one() {
        assert_eq!(FixedPoint::scale(), BigInt::from(FixedPoint::ONE));
    }

    #[test]
    fn test_nth_root_iteration_cap() {
        // Walking a 1500 digit argument down to its root takes far more than the cap
        let err = FixedPoint::approx_nth_root(&BigInt::from(2).pow(5000), 2).unwrap_err();
        assert_eq!(err, Error::from(ErrorCode::NonConvergence));
    }

    #[test]
    fn test_nth_root_rejects_index_zero() {
        let err = FixedPoint::approx_nth_root(&wad(4), 0).unwrap_err();
        assert_eq!(err, Error::from(ErrorCode::InvalidArgument));
    }

    #[test]
    fn test_nth_root_of_exact_powers() {
        for a in 2i64..20 {
            for n in 2u32..7 {
                let num = FixedPoint::pow(&wad(a), n);
                assert_eq!(FixedPoint::approx_nth_root(&num, n).unwrap(), wad(a), "a={} n={}", a, n);
            }
        }
    }

    #[test]
    fn test_u256_round_trip() {
        let word = U256::from(123_456_789u64) * U256::from(FixedPoint::ONE);
        let value = FixedPoint::from_u256(word);
        assert_eq!(value, wad(123_456_789));
        assert_eq!(FixedPoint::to_u256(&value).unwrap(), word);

        assert_eq!(FixedPoint::from_u256(U256::MAX), (BigInt::one() << 256) - 1);
        assert_eq!(FixedPoint::to_u256(&((BigInt::one() << 256) - 1)).unwrap(), U256::MAX);
    }

    #[test]
    fn test_to_u256_out_of_range() {
        let err = FixedPoint::to_u256(&BigInt::from(-1)).unwrap_err();
        assert_eq!(err, Error::from(ErrorCode::MathOverflow));
        let err = FixedPoint::to_u256(&(BigInt::one() << 256)).unwrap_err();
        assert_eq!(err, Error::from(ErrorCode::MathOverflow));
    }

    #[test]
    fn test_to_f64() {
        assert_eq!(FixedPoint::to_f64(&BigInt::from(2_500_000_000_000_000_000u64)), 2.5);
        assert_eq!(FixedPoint::to_f64(&BigInt::from(-250_000_000_000_000_000i64)), -0.25);
    }

    proptest! {
        #[test]
        fn prop_nth_root_brackets(extra in 1u128..u128::MAX / 2, n in 2u32..10) {
            let num = FixedPoint::scale() + BigInt::from(extra);
            let root = FixedPoint::approx_nth_root(&num, n).unwrap();
            prop_assert!(FixedPoint::pow(&root, n) <= num);
            prop_assert!(FixedPoint::pow(&(&root + 1), n) > num);
        }

        #[test]
        fn prop_div_then_mul_within_truncation(a in 0u64..u64::MAX, b in 1u64..u64::MAX) {
            let a = BigInt::from(a);
            let b = BigInt::from(b);
            let back = FixedPoint::mul(&FixedPoint::div(&a, &b).unwrap(), &b);
            // div drops less than one raw unit, which mul scales by b / ONE before its own truncation
            let slack = &b / FixedPoint::scale() + 1;
            prop_assert!(back <= a);
            prop_assert!(&a - &back <= slack);
        }

        #[test]
        fn prop_pow_one_is_identity(raw in any::<i128>()) {
            let x = BigInt::from(raw);
            prop_assert_eq!(FixedPoint::pow(&x, 1), x);
        }
    }
}
