pub mod fixedpoint;
pub mod expint;
