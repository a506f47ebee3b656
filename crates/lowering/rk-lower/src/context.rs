//! Lowering context and frame stack

use crate::LowerOptions;
use crate::lookup::Member;
use rk_intern::Symbol;
use rk_it::{
    BlockId, ClassId, Expr, ExprKind, FunctionId, InternalError, Program, Reporter, ScopeId,
    SemanticError, Stmt, TyId, VariableDef, VariableId, VariableKind, Visibility,
};
use rk_span::SourceLocation;
use rk_syntax::Declaration;
use rustc_hash::FxHashMap;
use std::fmt;
use std::mem;

/// Handles declarations nested inside function bodies
///
/// Nested classes, enums and functions go through the same declaration
/// passes as unit-level ones; the collector implements this so lowering does
/// not depend on it.
pub trait DeclarationHost {
    /// Declare, verify and compile `declaration` inside block scope `scope`
    ///
    /// # Errors
    ///
    /// Propagates internal errors from lowering the declaration's bodies.
    fn hoist(
        &self,
        ctx: &mut LoweringContext<'_>,
        scope: ScopeId,
        declaration: &Declaration,
    ) -> Result<(), InternalError>;
}

/// State of one function body (or initializer) being lowered
#[derive(Debug)]
pub(crate) struct Frame {
    /// Function being lowered; `None` for initializer and constant contexts
    pub function: Option<FunctionId>,
    /// Block statements are appended to
    pub block: BlockId,
    /// Lookups never reach past this frame into enclosing frames
    pub barrier: bool,
    /// Some variable of an enclosing frame is referenced from here
    pub capturing: bool,
    /// Class hosting this function's captured variables
    pub surrogate: Option<ClassId>,
    /// Member lookup cache keyed by receiver type and name
    pub members: FxHashMap<(TyId, Symbol), Option<Member>>,
}

/// Initializer of a global or field awaiting lowering
#[derive(Debug, Clone)]
pub(crate) struct PendingInitializer {
    pub expr: rk_syntax::Expr,
    pub scope: ScopeId,
    /// The variable had an explicit type
    pub declared: bool,
    /// Lowering is in progress
    pub active: bool,
}

/// Context for lowering syntax into the intermediate tree
pub struct LoweringContext<'ctx> {
    /// Program being built
    pub program: &'ctx mut Program,
    /// Diagnostic output
    reporter: Reporter<'ctx>,
    /// Build settings
    pub(crate) options: LowerOptions,
    /// Handler for nested declarations
    host: Option<&'ctx dyn DeclarationHost>,
    /// Innermost frame last
    pub(crate) frames: Vec<Frame>,
    /// Constant contexts force folding while this is non-zero
    pub(crate) const_depth: u32,
    /// Counter for synthesized names
    next_hidden: u32,
    /// Global and field initializers not yet lowered
    pub(crate) initializers: FxHashMap<VariableId, PendingInitializer>,
}

impl<'ctx> LoweringContext<'ctx> {
    /// Context lowering into `program`, reporting through `reporter`
    pub fn new(program: &'ctx mut Program, reporter: Reporter<'ctx>, options: LowerOptions) -> Self {
        Self {
            program,
            reporter,
            options,
            host: None,
            frames: Vec::new(),
            const_depth: 0,
            next_hidden: 0,
            initializers: FxHashMap::default(),
        }
    }

    /// Route nested declarations to `host`
    #[must_use]
    pub fn with_host(mut self, host: &'ctx dyn DeclarationHost) -> Self {
        self.host = Some(host);
        self
    }

    /// Options in effect
    pub fn options(&self) -> &LowerOptions {
        &self.options
    }

    /// Report a semantic error
    pub fn error(&mut self, location: SourceLocation, error: SemanticError) {
        self.reporter.error(location, &error);
    }

    /// Errors reported so far
    pub fn error_count(&self) -> usize {
        self.reporter.count()
    }

    pub(crate) fn host(&self) -> Option<&'ctx dyn DeclarationHost> {
        self.host
    }

    // ---- names and types ----

    pub(crate) fn text(&self, sym: Symbol) -> String {
        self.program.name(sym)
    }

    pub(crate) fn describe(&self, ty: TyId) -> String {
        self.program.display_ty(ty)
    }

    /// Fresh name for a synthesized entity
    pub(crate) fn hidden_name(&mut self, prefix: &str) -> Symbol {
        let index = self.next_hidden;
        self.next_hidden += 1;
        self.program.sym(&format!("${prefix}{index}"))
    }

    pub(crate) fn error_expr(&mut self, location: SourceLocation) -> Expr {
        let ty = self.program.error_ty();
        Expr::new(ExprKind::Error, ty, location)
    }

    pub(crate) fn is_reserved(&self, name: Symbol) -> bool {
        let text = self.text(name);
        text == self.options.constructor_name || text == self.options.destructor_name
    }

    /// Folding is on for this expression
    pub(crate) fn folding(&self) -> bool {
        self.options.fold_constants || self.const_depth > 0
    }

    // ---- frames ----

    pub(crate) fn frame(&self) -> Result<&Frame, InternalError> {
        self.frames.last().ok_or(InternalError::NoActiveFunction)
    }

    pub(crate) fn frame_mut(&mut self) -> Result<&mut Frame, InternalError> {
        self.frames.last_mut().ok_or(InternalError::NoActiveFunction)
    }

    pub(crate) fn push_frame(&mut self, function: Option<FunctionId>, block: BlockId, barrier: bool) {
        self.frames.push(Frame {
            function,
            block,
            barrier,
            capturing: false,
            surrogate: None,
            members: FxHashMap::default(),
        });
    }

    pub(crate) fn pop_frame(&mut self) -> Result<Frame, InternalError> {
        self.frames.pop().ok_or(InternalError::NoActiveFunction)
    }

    /// Run `body` in a fresh initializer frame rooted in `scope`
    pub(crate) fn with_detached_frame<R>(
        &mut self,
        scope: ScopeId,
        location: SourceLocation,
        body: impl FnOnce(&mut Self) -> Result<R, InternalError>,
    ) -> Result<R, InternalError> {
        let block = self.program.new_block(scope, None, None, location);
        self.push_frame(None, block, true);
        let result = body(self);
        self.pop_frame()?;
        result
    }

    pub(crate) fn current_block(&self) -> Result<BlockId, InternalError> {
        Ok(self.frame()?.block)
    }

    pub(crate) fn current_scope(&self) -> Result<ScopeId, InternalError> {
        Ok(self.program.blocks[self.current_block()?].scope)
    }

    pub(crate) fn current_function(&self) -> Result<Option<FunctionId>, InternalError> {
        Ok(self.frame()?.function)
    }

    // ---- blocks ----

    pub(crate) fn push_stmt(&mut self, stmt: Stmt) -> Result<(), InternalError> {
        let block = self.current_block()?;
        self.program.blocks[block].statements.push(stmt);
        Ok(())
    }

    /// New block nested in the current one; statements are not linked
    pub(crate) fn child_block(&mut self, location: SourceLocation) -> Result<BlockId, InternalError> {
        let frame = self.frame()?;
        let (parent, function) = (frame.block, frame.function);
        let scope = self.program.blocks[parent].scope;
        Ok(self.program.new_block(scope, Some(parent), function, location))
    }

    /// Make `block` current while `body` runs
    pub(crate) fn in_block<R>(
        &mut self,
        block: BlockId,
        body: impl FnOnce(&mut Self) -> Result<R, InternalError>,
    ) -> Result<R, InternalError> {
        let previous = mem::replace(&mut self.frame_mut()?.block, block);
        let result = body(self);
        self.frame_mut()?.block = previous;
        result
    }

    /// Declare a local in the current block, reporting duplicates
    pub(crate) fn declare_local(
        &mut self,
        name: Symbol,
        ty: TyId,
        location: SourceLocation,
    ) -> Result<Option<VariableId>, InternalError> {
        let block = self.current_block()?;
        let scope = self.program.blocks[block].scope;
        if self.program.blocks[block].locals.contains_key(&name)
            || self.program.lookup_in(scope, name).is_some()
        {
            let name = self.text(name);
            self.error(location, SemanticError::DuplicateDeclaration { name });
            return Ok(None);
        }
        let function = self.current_function()?;
        let variable = self.program.variables.alloc(VariableDef {
            name,
            location,
            visibility: Visibility::Private,
            ty,
            kind: VariableKind::Local(block),
            function,
            captured: false,
            initializer: None,
        });
        self.program.blocks[block].locals.insert(name, variable);
        Ok(Some(variable))
    }

    /// Hidden local holding an intermediate value
    pub(crate) fn hidden_local(
        &mut self,
        prefix: &str,
        ty: TyId,
        location: SourceLocation,
    ) -> Result<VariableId, InternalError> {
        let name = self.hidden_name(prefix);
        self.declare_local(name, ty, location)?
            .ok_or_else(|| InternalError::Invariant(format!("hidden local `${prefix}` collided")))
    }

    /// Reference to a local of the current frame
    pub(crate) fn local_expr(&self, variable: VariableId, location: SourceLocation) -> Expr {
        Expr::new(ExprKind::Local(variable), self.program.variables[variable].ty, location)
    }

    /// `target = value` as a statement of the current block
    pub(crate) fn push_assign(&mut self, target: Expr, value: Expr) -> Result<(), InternalError> {
        let ty = target.ty;
        let location = target.location;
        self.push_stmt(Stmt::Expr(Expr::new(
            ExprKind::Assign {
                target: Box::new(target),
                value: Box::new(value),
            },
            ty,
            location,
        )))
    }
}

impl fmt::Debug for LoweringContext<'_> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("LoweringContext")
            .field("frames", &self.frames.len())
            .field("reporter", &self.reporter)
            .finish_non_exhaustive()
    }
}
