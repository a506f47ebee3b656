//! Statement lowering
//!
//! Statements are appended to the current block of the innermost frame.
//! Structured statements create child blocks and link them with
//! [`Stmt::Block`] or [`Stmt::Branch`]; nested declarations are handed to the
//! declaration host and produce no statement at all.

use crate::{BuildMode, LoweringContext};
use rk_it::{
    BlockId, ConstantDef, ConstantState, Entity, Expr, ExprKind, InternalError, SemanticError,
    Stmt, TyKind, Visibility,
};
use rk_span::SourceLocation;
use rk_syntax::{Block, ConditionalBranch, LocalVarDecl, StmtKind};

/// Condition of one link of a branch chain
pub(crate) enum Guard<'a> {
    /// Lowered when the link is reached
    Syntax(&'a rk_syntax::Expr),
    /// Already lowered
    Lowered(Expr),
}

impl LoweringContext<'_> {
    pub(crate) fn lower_statements(&mut self, statements: &[rk_syntax::Stmt]) -> Result<(), InternalError> {
        statements.iter().try_for_each(|stmt| self.lower_stmt(stmt))
    }

    fn lower_stmt(&mut self, stmt: &rk_syntax::Stmt) -> Result<(), InternalError> {
        let location = stmt.location;
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                let expr = self.lower_expr(expr)?;
                self.push_stmt(Stmt::Expr(expr))
            }
            StmtKind::Var(decl) => self.lower_var(decl, location),
            StmtKind::Block(block) => {
                let block = self.lower_block(block)?;
                self.push_stmt(Stmt::Block(block))
            }
            StmtKind::If(if_stmt) => {
                let branches: Vec<_> = if_stmt
                    .branches
                    .iter()
                    .map(|ConditionalBranch { condition, body }| (Guard::Syntax(condition), body))
                    .collect();
                self.lower_chain(branches, if_stmt.otherwise.as_ref(), location)
            }
            StmtKind::While(stmt) => self.lower_while(stmt, location),
            StmtKind::For(stmt) => self.lower_for(stmt, location),
            StmtKind::Foreach(stmt) => self.lower_foreach(stmt, location),
            StmtKind::Switch(stmt) => self.lower_switch(stmt, location),
            StmtKind::Try(stmt) => self.lower_try(stmt),
            StmtKind::Break(label) => self.lower_break(*label, location),
            StmtKind::Continue(label) => self.lower_continue(*label, location),
            StmtKind::Return(value) => self.lower_return(value.as_ref(), location),
            StmtKind::Throw(value) => self.lower_throw(value, location),
            StmtKind::Assert { condition, message } => self.lower_assert(condition, message.as_ref(), location),
            StmtKind::Ifdef { symbol, then, otherwise } => {
                let defined = if *symbol == self.program.names.debug {
                    self.options.build_mode == BuildMode::Debug
                } else if *symbol == self.program.names.release {
                    self.options.build_mode == BuildMode::Release
                } else {
                    false
                };
                let taken = if defined { Some(then) } else { otherwise.as_ref() };
                match taken {
                    Some(block) => {
                        let block = self.lower_block(block)?;
                        self.push_stmt(Stmt::Block(block))
                    }
                    None => Ok(()),
                }
            }
            StmtKind::Declaration(declaration) => {
                let host = self.host().ok_or_else(|| {
                    InternalError::Invariant("nested declaration without a declaration host".into())
                })?;
                let scope = self.current_scope()?;
                host.hoist(self, scope, declaration)
            }
        }
    }

    /// Lower `block` into a new child of the current block (not linked)
    pub(crate) fn lower_block(&mut self, block: &Block) -> Result<BlockId, InternalError> {
        let id = self.child_block(block.location)?;
        self.lower_block_into(id, block)?;
        Ok(id)
    }

    /// Lower the statements of `block` into the existing block `id`
    pub(crate) fn lower_block_into(&mut self, id: BlockId, block: &Block) -> Result<(), InternalError> {
        if block.label.is_some() {
            self.program.blocks[id].name = block.label;
        }
        self.in_block(id, |ctx| ctx.lower_statements(&block.statements))
    }

    fn lower_var(&mut self, decl: &LocalVarDecl, location: SourceLocation) -> Result<(), InternalError> {
        if self.is_reserved(decl.name) {
            let name = self.text(decl.name);
            self.error(location, SemanticError::ReservedIdentifier { name });
        }
        let scope = self.current_scope()?;
        let declared = self.resolve_optional_type(scope, decl.ty.as_ref());
        if decl.is_const {
            return self.lower_local_constant(decl, declared, location);
        }
        let initializer = match &decl.initializer {
            Some(initializer) => {
                let value = self.lower_expr(initializer)?;
                Some(self.require_value(value))
            }
            None => None,
        };
        let ty = match (declared, &initializer) {
            (Some(ty), _) => ty,
            (None, Some(value)) if !matches!(self.program.ty(value.ty), TyKind::Null) => value.ty,
            (None, _) => {
                let name = self.text(decl.name);
                self.error(location, SemanticError::UntypedVariable { name });
                self.program.error_ty()
            }
        };
        let initializer = initializer.map(|value| self.coerce(value, ty));
        let Some(variable) = self.declare_local(decl.name, ty, location)? else {
            return Ok(());
        };
        match initializer {
            Some(value) => {
                let target = self.local_expr(variable, location);
                self.push_assign(target, value)
            }
            None => Ok(()),
        }
    }

    /// `const` locals become resolved constants of the block scope
    fn lower_local_constant(
        &mut self,
        decl: &LocalVarDecl,
        declared: Option<rk_it::TyId>,
        location: SourceLocation,
    ) -> Result<(), InternalError> {
        let name = self.text(decl.name);
        let Some(initializer) = &decl.initializer else {
            self.error(location, SemanticError::NonConstantValue { name });
            return Ok(());
        };
        let value = self.lower_folded(initializer)?;
        let value = match declared {
            Some(ty) => self.coerce(value, ty),
            None => value,
        };
        let state = match &value.kind {
            ExprKind::Literal(literal) => ConstantState::Resolved(literal.clone()),
            ExprKind::Error => ConstantState::Failed,
            _ => {
                self.error(location, SemanticError::NonConstantValue { name: name.clone() });
                ConstantState::Failed
            }
        };
        let block = self.current_block()?;
        let scope = self.program.blocks[block].scope;
        if self.program.blocks[block].locals.contains_key(&decl.name) {
            self.error(location, SemanticError::DuplicateDeclaration { name });
            return Ok(());
        }
        let constant = self.program.constants.alloc(ConstantDef {
            name: decl.name,
            location,
            visibility: Visibility::Private,
            scope,
            owner: None,
            declared_ty: declared,
            ty: value.ty,
            state,
        });
        if self.program.declare(scope, decl.name, Entity::Constant(constant)).is_err() {
            self.error(location, SemanticError::DuplicateDeclaration { name });
        }
        Ok(())
    }

    /// `if c1 {..} else if c2 {..} else {..}`: each false branch holds the next link
    pub(crate) fn lower_chain(
        &mut self,
        branches: Vec<(Guard<'_>, &Block)>,
        otherwise: Option<&Block>,
        location: SourceLocation,
    ) -> Result<(), InternalError> {
        let mut branches = branches.into_iter();
        let Some((guard, body)) = branches.next() else {
            if let Some(otherwise) = otherwise {
                let block = self.lower_block(otherwise)?;
                self.push_stmt(Stmt::Block(block))?;
            }
            return Ok(());
        };
        let rest: Vec<_> = branches.collect();
        let condition = match guard {
            Guard::Syntax(condition) => self.lower_condition(condition)?,
            Guard::Lowered(condition) => condition,
        };
        let then_block = self.lower_block(body)?;
        if self.folding() {
            match condition.literal() {
                Some(rk_it::Value::Bool(true)) => {
                    self.lower_dead_chain(rest, otherwise)?;
                    return self.push_stmt(Stmt::Block(then_block));
                }
                Some(rk_it::Value::Bool(false)) => return self.lower_chain(rest, otherwise, location),
                _ => {}
            }
        }
        let else_block = if rest.is_empty() && otherwise.is_none() {
            None
        } else {
            let block = self.child_block(location)?;
            self.in_block(block, |ctx| ctx.lower_chain(rest, otherwise, location))?;
            Some(block)
        };
        self.push_stmt(Stmt::Branch {
            condition,
            then_block,
            else_block,
        })
    }

    /// Check unreachable links without linking them
    fn lower_dead_chain(&mut self, branches: Vec<(Guard<'_>, &Block)>, otherwise: Option<&Block>) -> Result<(), InternalError> {
        for (guard, body) in branches {
            if let Guard::Syntax(condition) = guard {
                self.lower_condition(condition)?;
            }
            self.lower_block(body)?;
        }
        if let Some(otherwise) = otherwise {
            self.lower_block(otherwise)?;
        }
        Ok(())
    }

    fn lower_return(&mut self, value: Option<&rk_syntax::Expr>, location: SourceLocation) -> Result<(), InternalError> {
        let function = self.current_function()?.ok_or(InternalError::NoActiveFunction)?;
        let expected = self.program.functions[function].return_type;
        let value = match (expected, value) {
            (None, None) => None,
            (None, Some(value)) => {
                self.lower_expr(value)?;
                self.error(location, SemanticError::UnexpectedReturnValue);
                None
            }
            (Some(ty), None) => {
                let ty = self.describe(ty);
                self.error(location, SemanticError::MissingReturnValue { ty });
                None
            }
            (Some(ty), Some(value)) => {
                let value = self.lower_expr(value)?;
                Some(self.coerce(value, ty))
            }
        };
        self.check_transfer(None, location)?;
        self.push_stmt(Stmt::Return(value))
    }

    fn lower_throw(&mut self, value: &rk_syntax::Expr, location: SourceLocation) -> Result<(), InternalError> {
        let value = self.lower_expr(value)?;
        if value.is_error() {
            return Ok(());
        }
        let exception = self.program.prelude.exception;
        if self
            .program
            .class_of(value.ty)
            .is_some_and(|class| self.program.derives_from(class, exception))
        {
            return self.push_stmt(Stmt::Throw(value));
        }
        if matches!(self.program.ty(value.ty), TyKind::Primitive(kind) if kind.is_integer()) {
            let int = self.program.int_ty();
            let code = self.coerce(value, int);
            return self.push_stmt(Stmt::ThrowNumeric(code));
        }
        let ty = self.describe(value.ty);
        self.error(location, SemanticError::InvalidThrow { ty });
        Ok(())
    }

    /// Debug builds throw an `Exception` carrying the message when the
    /// condition is false; release builds only check the operands.
    fn lower_assert(
        &mut self,
        condition: &rk_syntax::Expr,
        message: Option<&rk_syntax::Expr>,
        location: SourceLocation,
    ) -> Result<(), InternalError> {
        let condition = self.lower_condition(condition)?;
        let string = self.program.string_ty();
        let message = match message {
            Some(message) => {
                let message = self.lower_expr(message)?;
                Some(self.coerce(message, string))
            }
            None => None,
        };
        if self.options.build_mode == BuildMode::Release {
            return Ok(());
        }
        if matches!(condition.literal(), Some(rk_it::Value::Bool(true))) {
            return Ok(());
        }
        let message = message.unwrap_or_else(|| {
            Expr::new(
                ExprKind::Literal(rk_it::Value::String("assertion failed".to_string())),
                string,
                location,
            )
        });
        let failed = self.child_block(location)?;
        self.in_block(failed, |ctx| {
            let exception = ctx.program.prelude.exception;
            let exception_ty = ctx.program.self_ty(exception);
            let holder = ctx.hidden_local("assert", exception_ty, location)?;
            let created = Expr::new(
                ExprKind::New {
                    constructor: None,
                    args: Vec::new(),
                },
                exception_ty,
                location,
            );
            ctx.push_assign(ctx.local_expr(holder, location), created)?;
            let message_name = ctx.program.sym("Message");
            let field = ctx.program.classes[exception]
                .fields
                .get(&message_name)
                .copied()
                .ok_or_else(|| InternalError::Invariant("exception class has no message field".into()))?;
            let target = Expr::new(
                ExprKind::Field {
                    target: Box::new(ctx.local_expr(holder, location)),
                    field,
                },
                string,
                location,
            );
            ctx.push_assign(target, message)?;
            ctx.push_stmt(Stmt::Throw(ctx.local_expr(holder, location)))
        })?;
        let condition = self.negate(condition);
        self.push_stmt(Stmt::Branch {
            condition,
            then_block: failed,
            else_block: None,
        })
    }
}
