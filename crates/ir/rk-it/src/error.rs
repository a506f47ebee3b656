//! Fatal errors

use rk_span::SourceLocation;
use thiserror::Error;

/// Internal invariant violation; aborts the whole compile
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InternalError {
    /// The syntax tree breaks the parser/core contract
    #[error("malformed syntax tree at {location}: {detail}")]
    MalformedSyntax {
        /// Offending node
        location: SourceLocation,
        /// What was wrong
        detail: String,
    },

    /// Lowering state required an active function that is missing
    #[error("no function is being compiled")]
    NoActiveFunction,

    /// An IT invariant does not hold
    #[error("intermediate tree invariant violated: {0}")]
    Invariant(String),
}

impl InternalError {
    /// Malformed syntax at `location`
    pub fn malformed(location: SourceLocation, detail: impl Into<String>) -> Self {
        Self::MalformedSyntax {
            location,
            detail: detail.into(),
        }
    }
}
