// SPDX-License-Identifier: MIT

use anchor_lang::prelude::*;
use static_assertions::const_assert_eq;

use crate::error::ErrorCode;

/**
 * @dev Exponential integral Ei(x), the principal value of the integral of e^t / t from -infinity to x.
 *
 * Three algorithms are used depending on the magnitude of the argument:
 *
 *   x < -5          continued fraction
 *   -5 <= x <= 6.8  power series
 *   6.8 < x < 50    argument addition series around the nearest integer
 *   x >= 50         continued fraction
 *
 * All of them iterate until successive approximations agree to `CONVERGENCE_EPSILON` relative, and give up with
 * `NonConvergence` after `MAX_SERIES_ITERATIONS`.
 */
pub struct ExpIntegral;

// 2^-63, the unit roundoff of an 80 bit extended mantissa. Below binary64 resolution, so every loop effectively runs
// until its update stops changing the result.
pub const CONVERGENCE_EPSILON: f64 = 1.084_202_172_485_504_434e-19;

pub const MAX_SERIES_ITERATIONS: u32 = 10_000;

// Euler–Mascheroni constant
pub const EULER_GAMMA: f64 = 0.577_215_664_901_532_860_606_5;

pub const CONTINUED_FRACTION_BELOW: f64 = -5.0;
pub const POWER_SERIES_UP_TO: f64 = 6.8;
pub const CONTINUED_FRACTION_FROM: f64 = 50.0;

pub const FIRST_ANCHOR: i32 = 7;
pub const LAST_ANCHOR: i32 = 50;
pub const EI_TABLE_LEN: usize = 44;

const_assert_eq!(EI_TABLE_LEN, (LAST_ANCHOR - FIRST_ANCHOR + 1) as usize);

// Ei(k) for k = 7, 8, ..., 50
pub static EI_TABLE: [f64; EI_TABLE_LEN] = [
    1.915047433355013959531e2,  4.403798995348382689974e2,
    1.037878290717089587658e3,  2.492228976241877759138e3,
    6.071406374098611507965e3,  1.495953266639752885229e4,
    3.719768849068903560439e4,  9.319251363396537129882e4,
    2.349558524907683035782e5,  5.955609986708370018502e5,
    1.516637894042516884433e6,  3.877904330597443502996e6,
    9.950907251046844760026e6,  2.561565266405658882048e7,
    6.612718635548492136250e7,  1.711446713003636684975e8,
    4.439663698302712208698e8,  1.154115391849182948287e9,
    3.005950906525548689841e9,  7.842940991898186370453e9,
    2.049649711988081236484e10, 5.364511859231469415605e10,
    1.405991957584069047340e11, 3.689732094072741970640e11,
    9.694555759683939661662e11, 2.550043566357786926147e12,
    6.714640184076497558707e12, 1.769803724411626854310e13,
    4.669055014466159544500e13, 1.232852079912097685431e14,
    3.257988998672263996790e14, 8.616388199965786544948e14,
    2.280446200301902595341e15, 6.039718263611241578359e15,
    1.600664914324504111070e16, 4.244796092136850759368e16,
    1.126348290166966760275e17, 2.990444718632336675058e17,
    7.943916035704453771510e17, 2.111342388647824195000e18,
    5.614329680810343111535e18, 1.493630213112993142255e19,
    3.975442747903744836007e19, 1.058563689713169096306e20,
];

impl ExpIntegral {
    /**
     * @dev Ei(x) for any finite x. Ei(0) is -infinity, which is returned as a value rather than an error.
     *
     * Reverts on non-finite input, on a result too large for binary64 (x above roughly 709, where e^x overflows), and
     * when the selected algorithm does not converge.
     */
    pub fn ei(x: f64) -> Result<f64> {
        require!(x.is_finite(), ErrorCode::InvalidArgument);
        if x == 0.0 {
            return Ok(f64::NEG_INFINITY);
        }

        let budget = MAX_SERIES_ITERATIONS;
        let value = if x < CONTINUED_FRACTION_BELOW {
            Self::continued_fraction(x, budget)?
        } else if x <= POWER_SERIES_UP_TO {
            Self::power_series(x, budget)?
        } else if x < CONTINUED_FRACTION_FROM {
            Self::argument_addition_series(x, budget)?
        } else {
            Self::continued_fraction(x, budget)?
        };

        require!(value.is_finite(), ErrorCode::MathOverflow);
        Ok(value)
    }

    /**
     * @dev Continued fraction expansion of -e^x * E1(-x), evaluated with the forward recurrence
     *
     *   A(j+1) = b * A(j) + a * A(j-1),  B(j+1) = b * B(j) + a * B(j-1)
     *
     * with a = 1, b = 1 - x for the first convergent, then a = -j^2 and b increasing by 2. Both sequences are scaled
     * down by B(j+1) whenever it exceeds one in magnitude.
     *
     * Every A(j) is linear in the first numerator, so e^x is applied to the final quotient instead of seeding the
     * recurrence with it. Seeding with a subnormal e^x (x below about -708) leaves the stop test comparing rounding
     * noise against zero.
     */
    fn continued_fraction(x: f64, max_iterations: u32) -> Result<f64> {
        let mut am1 = 1.0;
        let mut a0 = 0.0;
        let mut bm1 = 0.0;
        let mut b0 = 1.0;
        let mut a = 1.0;
        let mut b = 1.0 - x;
        let mut ap1 = b * a0 + a * am1;
        let mut bp1 = b * b0 + a * bm1;
        let mut j = 1.0;

        let mut iterations = 0u32;
        while (ap1 * b0 - a0 * bp1).abs() > CONVERGENCE_EPSILON * (a0 * bp1).abs() {
            if iterations == max_iterations {
                msg!("Ei continued fraction did not converge at x={} after {} iterations", x, iterations);
                return err!(ErrorCode::NonConvergence);
            }
            iterations += 1;

            if bp1.abs() > 1.0 {
                am1 = a0 / bp1;
                a0 = ap1 / bp1;
                bm1 = b0 / bp1;
                b0 = 1.0;
            } else {
                am1 = a0;
                a0 = ap1;
                bm1 = b0;
                b0 = bp1;
            }
            a = -j * j;
            b += 2.0;
            ap1 = b * a0 + a * am1;
            bp1 = b * b0 + a * bm1;
            j += 1.0;
        }

        Ok(-ap1 / bp1 * x.exp())
    }

    /**
     * @dev Ei(x) = gamma + ln|x| - e^x * S, where
     *
     *   S = sum_{n>=1} H(n) * (-x)^n / n!
     *
     * and H(n) is the n-th harmonic number. H(n), (-x)^n and n! are carried along between terms.
     */
    fn power_series(x: f64, max_iterations: u32) -> Result<f64> {
        let mut xn = -x;
        let mut sn = -x;
        let mut sm1 = 0.0;
        let mut hsum = 1.0;
        let mut y = 1.0;
        let mut factorial = 1.0;

        let mut iterations = 0u32;
        while (sn - sm1).abs() > CONVERGENCE_EPSILON * sm1.abs() {
            if iterations == max_iterations {
                msg!("Ei power series did not converge at x={} after {} iterations", x, iterations);
                return err!(ErrorCode::NonConvergence);
            }
            iterations += 1;

            sm1 = sn;
            y += 1.0;
            xn *= -x;
            factorial *= y;
            hsum += 1.0 / y;
            sn += hsum * xn / factorial;
        }

        Ok(EULER_GAMMA + x.abs().ln() - x.exp() * sn)
    }

    /**
     * @dev Ei(k + dx) = Ei(k) + e^k * S, with k the nearest integer to x, Ei(k) read from `EI_TABLE`, and
     *
     *   S = sum_{j>=0} j! * (e^dx * sum_{m<=j} (-dx)^m / m! - 1) / k^(j+1)
     *
     * The bracketed factor is the truncation error of e^-dx scaled by e^dx. Forming it as a difference of two values
     * near one loses every significant digit once j grows, after which j! / k^(j+1) amplifies the noise, so it is
     * computed from the tail of the series instead: -e^dx * sum_{m>j} (-dx)^m / m!.
     */
    fn argument_addition_series(x: f64, max_iterations: u32) -> Result<f64> {
        let k = (x + 0.5) as i32;
        require!(
            (FIRST_ANCHOR..=LAST_ANCHOR).contains(&k),
            ErrorCode::InvalidArgument
        );
        let xx = k as f64;
        let dx = x - xx;
        let edx = dx.exp();

        let mut sn = dx.exp_m1() / xx;
        let mut term = f64::MAX;
        let mut factorial = 1.0;
        let mut xxj = xx;
        let mut j = 0u32;

        while term.abs() > CONVERGENCE_EPSILON * sn.abs() {
            if j == max_iterations {
                msg!("Ei argument addition did not converge at x={} after {} iterations", x, j);
                return err!(ErrorCode::NonConvergence);
            }
            j += 1;

            factorial *= j as f64;
            xxj *= xx;
            term = -factorial * edx * exp_neg_tail(dx, j) / xxj;
            sn += term;
        }

        Ok(EI_TABLE[(k - FIRST_ANCHOR) as usize] + sn * xx.exp())
    }
}

// sum_{m>j} (-dx)^m / m!, for |dx| <= 0.5
fn exp_neg_tail(dx: f64, j: u32) -> f64 {
    let mut term = 1.0;
    for m in 1..=j + 1 {
        term *= -dx / m as f64;
    }

    let mut sum = term;
    let mut m = j + 1;
    loop {
        m += 1;
        term *= -dx / m as f64;
        if term == 0.0 || term.abs() <= f64::EPSILON * sum.abs() {
            return sum;
        }
        sum += term;
    }
}
