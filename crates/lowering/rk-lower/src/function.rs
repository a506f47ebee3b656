//! Function bodies

use crate::LoweringContext;
use rk_it::{FunctionId, InternalError};
use rk_syntax::Block;
use tracing::trace;

impl LoweringContext<'_> {
    /// Lower the body of a named function, method or accessor
    ///
    /// # Errors
    ///
    /// Fails on internal invariant violations only.
    pub fn compile_function(&mut self, function: FunctionId, body: &Block) -> Result<(), InternalError> {
        self.lower_function_body(function, body, true).map(|_| ())
    }

    /// Lower `body` as the root block of `function` in a new frame
    ///
    /// Returns whether the body read variables of an enclosing frame.
    pub(crate) fn lower_function_body(
        &mut self,
        function: FunctionId,
        body: &Block,
        barrier: bool,
    ) -> Result<bool, InternalError> {
        let scope = self.program.functions[function].scope;
        let root = self.program.new_block(scope, None, Some(function), body.location);
        self.program.blocks[root].name = body.label;
        self.program.functions[function].body = Some(root);

        self.push_frame(Some(function), root, barrier);
        let lowered = self.lower_statements(&body.statements);
        let frame = self.pop_frame()?;
        lowered?;
        self.finish_frame(&frame)?;

        trace!(
            function = %self.program.function_name(function),
            statements = self.program.blocks[root].statements.len(),
            capturing = frame.capturing,
            "compiled function"
        );
        Ok(frame.capturing)
    }
}
