//! Entity collection
//!
//! Turns the declarations of a compilation unit into entities of the
//! [`Program`](rk_it::Program) and drives their bodies through lowering.
//! Work is split into [`Pass`]es so that a driver can run every unit through
//! one pass before any unit starts the next; types declared in one unit are
//! then visible to the base-type references and signatures of all others.
//!
//! Declarations nested inside function bodies go through the same passes at
//! once, via the [`Collector`] acting as the lowering's
//! [`DeclarationHost`].
#![allow(clippy::multiple_inherent_impl, reason = "UnitCollector methods are grouped by pass")]

mod define;
mod inheritance;
mod unit;
mod verify;

#[cfg(test)]
mod tests;

pub use inheritance::InheritanceValidator;
pub use unit::UnitCollector;

use rk_it::{InternalError, ScopeId};
use rk_lower::{DeclarationHost, LoweringContext};
use rk_syntax::Declaration;
use std::fmt;
use std::slice;
use tracing::trace;

/// Collector passes, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pass {
    /// Create classes, interfaces and enums with their generic parameters
    Skeletons,
    /// Resolve base types and break inheritance cycles
    Hierarchy,
    /// Create fields, methods, properties, functions, variables and constants
    Definitions,
    /// Check interface conformance and overrides
    Verification,
    /// Resolve every constant
    Constants,
    /// Lower initializers and function bodies
    Bodies,
}

impl Pass {
    /// Every pass, in execution order
    pub const ALL: [Self; 6] = [
        Self::Skeletons,
        Self::Hierarchy,
        Self::Definitions,
        Self::Verification,
        Self::Constants,
        Self::Bodies,
    ];
}

impl fmt::Display for Pass {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Skeletons => "skeletons",
            Self::Hierarchy => "hierarchy",
            Self::Definitions => "definitions",
            Self::Verification => "verification",
            Self::Constants => "constants",
            Self::Bodies => "bodies",
        };
        formatter.write_str(name)
    }
}

/// Hoists declarations found in function bodies
#[derive(Debug, Clone, Copy, Default)]
pub struct Collector;

impl Collector {
    /// Collector for hoisted declarations
    pub fn new() -> Self {
        Self
    }
}

impl DeclarationHost for Collector {
    fn hoist(
        &self,
        ctx: &mut LoweringContext<'_>,
        scope: ScopeId,
        declaration: &Declaration,
    ) -> Result<(), InternalError> {
        trace!(
            declaration = %ctx.program.name(declaration.name),
            kind = declaration.kind.describe(),
            "hoisting nested declaration"
        );
        let mut collector = UnitCollector::new(slice::from_ref(declaration), scope);
        for pass in Pass::ALL {
            collector.run(pass, ctx)?;
        }
        Ok(())
    }
}
