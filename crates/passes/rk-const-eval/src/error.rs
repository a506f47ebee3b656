//! Fold errors

use thiserror::Error;

/// Errors raised while folding literal operands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FoldError {
    /// Result does not fit the default integer, or a shift/conversion is out of range
    #[error("arithmetic overflow in constant expression")]
    Overflow,

    /// Integer division or remainder by zero
    #[error("division by zero in constant expression")]
    DivisionByZero,
}
