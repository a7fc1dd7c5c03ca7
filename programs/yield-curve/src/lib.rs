//! Numerical core of the yield-token AMM.
//!
//! - [`math::fixedpoint`]: 18 decimal fixed point arithmetic matching the ledger, including the bracketing Nth root
//!   used for geometric price grids.
//! - [`math::expint`]: the exponential integral `Ei(x)`.
//! - [`curve::bond`]: the bonding-curve cost model (`uin` / `uout`) built on `Ei`.

pub mod error;
pub mod math;
pub mod curve;

pub use curve::CurveSnapshot;
pub use error::ErrorCode;
pub use math::expint::ExpIntegral;
pub use math::fixedpoint::FixedPoint;
