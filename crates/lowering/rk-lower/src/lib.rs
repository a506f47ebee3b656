//! Syntax to intermediate tree lowering
//!
//! [`LoweringContext`] owns the per-compile lowering state. It resolves type
//! references and names, checks operators, calls and casts, folds constant
//! subexpressions and rewrites structured statements into the block, branch
//! and exit vocabulary of the intermediate tree.
//!
//! # Architecture
//!
//! - **Frames**: one per function body (or initializer) being lowered. Frames
//!   of anonymous functions sit on top of their enclosing function's frame,
//!   which is how captures are detected.
//! - **Lookup**: lexical scopes first, then class hierarchies, then the other
//!   compilation units.
//! - **Surrogates**: a function whose variables are captured gets a hidden
//!   class hosting them; capturing closures become its methods.
//! - **Constants**: resolved lazily with cycle detection.
#![allow(clippy::multiple_inherent_impl, reason = "LoweringContext methods are grouped by the construct they lower")]

mod call;
mod closure;
mod coerce;
mod constant;
mod context;
mod control;
mod expr;
mod function;
mod lookup;
mod loops;
mod ops;
mod stmt;
mod types;

#[cfg(test)]
mod tests;

pub use context::{DeclarationHost, LoweringContext};
pub use lookup::{Member, MemberKind, declared_member, search_member};

use serde::{Deserialize, Serialize};

/// Conditional compilation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    /// Assertions kept, `ifdef debug` taken
    #[default]
    Debug,
    /// Assertions dropped, `ifdef release` taken
    Release,
}

/// Settings the lowering passes read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LowerOptions {
    /// Which `assert` and `ifdef` branches survive
    pub build_mode: BuildMode,
    /// Fold constant subexpressions outside of constant contexts too
    pub fold_constants: bool,
    /// Reserved constructor name
    pub constructor_name: String,
    /// Reserved destructor name
    pub destructor_name: String,
}

impl Default for LowerOptions {
    fn default() -> Self {
        Self {
            build_mode: BuildMode::Debug,
            fold_constants: true,
            constructor_name: "constructor".to_string(),
            destructor_name: "destructor".to_string(),
        }
    }
}
