//! Constant folding over primitive literal values
//!
//! The default integer folds with overflow checking; explicitly sized
//! integers wrap at their width; `float` and `double` follow IEEE semantics.
//! Boolean operators never short-circuit since both operands are already
//! values.

mod cast;
mod error;
mod fold;

pub use cast::fold_cast;
pub use error::FoldError;
pub use fold::{fold_binary, fold_unary};
