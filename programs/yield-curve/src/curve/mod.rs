pub mod bond;

pub use bond::CurveSnapshot;
