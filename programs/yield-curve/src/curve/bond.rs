use anchor_lang::prelude::*;

use crate::error::ErrorCode;
use crate::math::expint::ExpIntegral;

/// Reserve snapshot of the yield-token bonding curve.
///
/// The curve prices yield reserve `Y` against the underlying with
///
///   price(Y) = 1 - APYo^(-P * r / (Y + c)),  c = L * w,  P = f * (L + c)
///
/// and trades settle against its antiderivative `k_minus_u`, so the cost of any
/// trade is a difference of two closed-form evaluations. This is the binary64
/// reference model; the ledger runs its own fixed point version.
///
/// Snapshots are plain values: callers re-derive one per trade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveSnapshot {
    /// Yield reserve `Y`
    pub yield_reserve: f64,
    /// Liquidity parameter `L`
    pub liquidity: f64,
    /// Fraction of the term still remaining `r`
    pub time_remaining: f64,
    /// Weight `w` of the virtual liquidity
    pub weight: f64,
    /// Fee / scale factor `f`
    pub fee_scale: f64,
    /// Oracle implied growth multiplier, e.g. 1.05 for 5%
    pub oracle_apy: f64,
}

impl CurveSnapshot {
    pub fn new(
        yield_reserve: f64,
        liquidity: f64,
        time_remaining: f64,
        weight: f64,
        fee_scale: f64,
        oracle_apy: f64,
    ) -> Result<Self> {
        let snapshot = Self {
            yield_reserve,
            liquidity,
            time_remaining,
            weight,
            fee_scale,
            oracle_apy,
        };
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Same curve, re-derived at another yield reserve.
    pub fn with_yield_reserve(&self, yield_reserve: f64) -> Self {
        Self {
            yield_reserve,
            ..*self
        }
    }

    /// Virtual liquidity `c = L * w`
    pub fn virtual_liquidity(&self) -> f64 {
        self.liquidity * self.weight
    }

    /// `P * r`, with `P = f * (L + c)`
    fn scaled_time(&self) -> f64 {
        let c = self.virtual_liquidity();
        self.fee_scale * (self.liquidity + c) * self.time_remaining
    }

    fn validate(&self) -> Result<()> {
        require!(
            self.yield_reserve.is_finite()
                && self.liquidity.is_finite()
                && self.time_remaining.is_finite()
                && self.weight.is_finite()
                && self.fee_scale.is_finite()
                && self.oracle_apy.is_finite(),
            ErrorCode::InvalidArgument
        );
        require!(self.oracle_apy > 0.0, ErrorCode::InvalidArgument);
        require!(
            self.yield_reserve + self.virtual_liquidity() > 0.0,
            ErrorCode::InvalidReserve
        );
        Ok(())
    }

    /**
     * Antiderivative of the price in `Y`:
     *
     *   K - U = -(c + Y) * APYo^(-P r / (Y + c)) - P r ln(APYo) * Ei(-P r ln(APYo) / (Y + c)) + Y
     *
     * When the Ei argument vanishes, or rounds to zero against a deep reserve, the Ei term takes its limit, zero.
     */
    pub fn k_minus_u(&self) -> Result<f64> {
        self.validate()?;

        let y = self.yield_reserve;
        let depth = y + self.virtual_liquidity();
        let pr = self.scaled_time();
        let pr_ln_apy = pr * self.oracle_apy.ln();

        let discounted = -depth * self.oracle_apy.powf(-pr / depth);
        let ei_arg = -pr_ln_apy / depth;
        let ei_term = if ei_arg == 0.0 {
            0.0
        } else {
            pr_ln_apy * ExpIntegral::ei(ei_arg)?
        };

        let value = discounted - ei_term + y;
        require!(value.is_finite(), ErrorCode::MathOverflow);
        Ok(value)
    }

    /// Underlying paid out for depositing `yield_in` more yield reserve.
    pub fn uout(&self, yield_in: f64) -> Result<f64> {
        require!(yield_in.is_finite(), ErrorCode::InvalidArgument);

        let after = self.with_yield_reserve(self.yield_reserve + yield_in);
        Ok(after.k_minus_u()? - self.k_minus_u()?)
    }

    /// Underlying required to withdraw `yield_out` from the yield reserve.
    pub fn uin(&self, yield_out: f64) -> Result<f64> {
        require!(yield_out.is_finite(), ErrorCode::InvalidArgument);

        let after = self.with_yield_reserve(self.yield_reserve - yield_out);
        Ok(self.k_minus_u()? - after.k_minus_u()?)
    }

    /// Spot price of yield reserve at this snapshot, the derivative of `k_minus_u`.
    pub fn marginal_price(&self) -> Result<f64> {
        self.validate()?;

        let depth = self.yield_reserve + self.virtual_liquidity();
        Ok(1.0 - self.oracle_apy.powf(-self.scaled_time() / depth))
    }
}
