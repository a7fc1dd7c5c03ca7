use anchor_lang::prelude::*;

#[error_code]
pub enum ErrorCode {
    #[msg("Math overflow")]
    MathOverflow,
    #[msg("Division by zero")]
    DivisionByZero,
    #[msg("Root argument must exceed 1.0")]
    RootOutOfDomain,
    #[msg("Invalid argument")]
    InvalidArgument,
    #[msg("Iteration did not converge within its budget")]
    NonConvergence,
    #[msg("Reserve plus liquidity weight must be positive")]
    InvalidReserve,
}
