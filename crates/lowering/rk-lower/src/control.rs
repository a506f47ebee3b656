//! `switch`, `try` and the jumps `break`, `continue`
//!
//! A jump is an exit of some enclosing block. Exits may not cross a
//! `finally` block, which is the only kind of block marked non-transferable.

use crate::LoweringContext;
use crate::stmt::Guard;
use rk_intern::Symbol;
use rk_it::{
    BinaryOp, BlockId, ExitKind, Expr, ExprKind, Handler, HandlerKind, InternalError,
    SemanticError, Stmt, Value,
};
use rk_span::SourceLocation;
use rk_syntax::{CaseRange, CatchClause, CatchKind, SwitchStmt, TryStmt};
use tracing::trace;

impl LoweringContext<'_> {
    /// The subject is stored once in a hidden local; every case tests that
    /// local, and the cases form an else-if chain ending in `default`.
    pub(crate) fn lower_switch(&mut self, stmt: &SwitchStmt, location: SourceLocation) -> Result<(), InternalError> {
        let subject = self.lower_expr(&stmt.subject)?;
        let subject = self.require_value(subject);
        let holder = self.hidden_local("switch", subject.ty, location)?;
        self.push_assign(self.local_expr(holder, location), subject)?;

        let mut branches = Vec::with_capacity(stmt.cases.len());
        let mut all_constant = true;
        for case in &stmt.cases {
            let mut test: Option<Expr> = None;
            for range in &case.ranges {
                let subject = self.local_expr(holder, case.location);
                let (matched, constant) = self.case_test(subject, range, case.location)?;
                all_constant &= constant;
                test = Some(match test {
                    Some(previous) => self.binary(BinaryOp::Or, previous, matched, case.location),
                    None => matched,
                });
            }
            let test = test.ok_or_else(|| InternalError::malformed(case.location, "switch case without values"))?;
            branches.push((Guard::Lowered(test), &case.body));
        }
        if all_constant && !branches.is_empty() {
            trace!(cases = branches.len(), "switch with constant cases lowered as a branch chain");
        }
        self.lower_chain(branches, stmt.default.as_ref(), location)
    }

    /// `subject == lower`, or `lower <= subject and subject <= upper`
    fn case_test(&mut self, subject: Expr, range: &CaseRange, location: SourceLocation) -> Result<(Expr, bool), InternalError> {
        let lower = self.lower_expr(&range.lower)?;
        let Some(upper) = &range.upper else {
            let constant = lower.literal().is_some();
            return Ok((self.binary(BinaryOp::Eq, subject, lower, location), constant));
        };
        let upper = self.lower_expr(upper)?;
        let constant = lower.literal().is_some() && upper.literal().is_some();
        let above = self.binary(BinaryOp::Ge, subject.clone(), lower, location);
        let below = self.binary(BinaryOp::Le, subject, upper, location);
        Ok((self.binary(BinaryOp::And, above, below, location), constant))
    }

    pub(crate) fn lower_try(&mut self, stmt: &TryStmt) -> Result<(), InternalError> {
        let body = self.lower_block(&stmt.body)?;
        let mut handlers = Vec::with_capacity(stmt.catches.len());
        for clause in &stmt.catches {
            if let Some(handler) = self.lower_handler(clause)? {
                handlers.push(handler);
            }
        }
        let finally = match &stmt.finally {
            Some(finally) => {
                let block = self.child_block(finally.location)?;
                self.program.blocks[block].transferable = false;
                self.lower_block_into(block, finally)?;
                Some(block)
            }
            None => None,
        };
        trace!(handlers = handlers.len(), finally = finally.is_some(), "try lowered");
        self.push_stmt(Stmt::Try {
            body,
            handlers,
            finally,
        })
    }

    /// Lower one catch clause; clauses with an invalid matcher are checked
    /// but dropped
    fn lower_handler(&mut self, clause: &CatchClause) -> Result<Option<Handler>, InternalError> {
        let location = clause.location;
        let matcher = match &clause.kind {
            CatchKind::Range(range) => self.catch_range(range, location)?,
            CatchKind::Typed(ty) => {
                let scope = self.current_scope()?;
                let ty = self.resolve_type(scope, ty);
                let exception = self.program.prelude.exception;
                let valid = self.program.is_error(ty)
                    || self
                        .program
                        .class_of(ty)
                        .is_some_and(|class| self.program.derives_from(class, exception));
                if valid {
                    Some(HandlerKind::Typed(ty))
                } else {
                    let ty = self.describe(ty);
                    self.error(location, SemanticError::InvalidCatchType { ty });
                    None
                }
            }
            CatchKind::All => Some(HandlerKind::All),
        };
        let info_ty = match &matcher {
            Some(HandlerKind::Range { .. }) => self.program.int_ty(),
            Some(HandlerKind::Typed(ty)) => *ty,
            Some(HandlerKind::All) => {
                let exception = self.program.prelude.exception;
                self.program.self_ty(exception)
            }
            None => self.program.error_ty(),
        };
        let block = self.child_block(clause.body.location)?;
        if let Some(name) = clause.info {
            if self.is_reserved(name) {
                let name = self.text(name);
                self.error(location, SemanticError::ReservedIdentifier { name });
            }
            self.in_block(block, |ctx| {
                if let Some(info) = ctx.declare_local(name, info_ty, location)? {
                    let target = ctx.local_expr(info, location);
                    ctx.push_assign(target, Expr::new(ExprKind::Caught, info_ty, location))?;
                }
                Ok(())
            })?;
        }
        self.lower_block_into(block, &clause.body)?;
        Ok(matcher.map(|matcher| Handler { matcher, body: block }))
    }

    /// Numeric catch bounds must fold to integers
    fn catch_range(&mut self, range: &CaseRange, location: SourceLocation) -> Result<Option<HandlerKind>, InternalError> {
        let int = self.program.int_ty();
        let lower = self.lower_folded(&range.lower)?;
        let lower = self.coerce(lower, int);
        let upper = match &range.upper {
            Some(upper) => {
                let upper = self.lower_folded(upper)?;
                self.coerce(upper, int)
            }
            None => lower.clone(),
        };
        if lower.is_error() || upper.is_error() {
            return Ok(None);
        }
        match (lower.kind, upper.kind) {
            (ExprKind::Literal(lower @ Value::Int(_)), ExprKind::Literal(upper @ Value::Int(_))) => {
                Ok(Some(HandlerKind::Range { lower, upper }))
            }
            _ => {
                self.error(
                    location,
                    SemanticError::NonConstantValue {
                        name: "catch range".to_string(),
                    },
                );
                Ok(None)
            }
        }
    }

    pub(crate) fn lower_break(&mut self, label: Option<Symbol>, location: SourceLocation) -> Result<(), InternalError> {
        let target = match label {
            Some(label) => match self.named_block(label)? {
                Some(block) => block,
                None => {
                    let label = self.text(label);
                    self.error(location, SemanticError::UnknownLabel { label });
                    return Ok(());
                }
            },
            None => match self.innermost_loop()? {
                Some(block) => self.program.blocks[block].break_target.unwrap_or(block),
                None => {
                    self.error(location, SemanticError::BreakOutsideLoop);
                    return Ok(());
                }
            },
        };
        self.check_transfer(Some(target), location)?;
        self.push_stmt(Stmt::Exit {
            block: target,
            kind: ExitKind::Break,
        })
    }

    /// `continue` leaves the body block of the loop, falling through to its
    /// step and test
    pub(crate) fn lower_continue(&mut self, label: Option<Symbol>, location: SourceLocation) -> Result<(), InternalError> {
        let found = match label {
            Some(label) => match self.named_block(label)? {
                Some(block) => Some(block).filter(|&block| self.program.blocks[block].is_loop),
                None => {
                    let label = self.text(label);
                    self.error(location, SemanticError::UnknownLabel { label });
                    return Ok(());
                }
            },
            None => self.innermost_loop()?,
        };
        let Some(target) = found.and_then(|block| self.program.blocks[block].continue_target) else {
            self.error(location, SemanticError::ContinueOutsideLoop);
            return Ok(());
        };
        self.check_transfer(Some(target), location)?;
        self.push_stmt(Stmt::Exit {
            block: target,
            kind: ExitKind::Continue,
        })
    }

    fn named_block(&self, label: Symbol) -> Result<Option<BlockId>, InternalError> {
        let current = self.current_block()?;
        Ok(self
            .program
            .block_chain(current)
            .find(|&block| self.program.blocks[block].name == Some(label)))
    }

    fn innermost_loop(&self) -> Result<Option<BlockId>, InternalError> {
        let current = self.current_block()?;
        Ok(self.program.block_chain(current).find(|&block| self.program.blocks[block].is_loop))
    }

    /// Report a jump from the current block to the end of `target` (or out
    /// of the function) that would leave a `finally` block
    pub(crate) fn check_transfer(&mut self, target: Option<BlockId>, location: SourceLocation) -> Result<(), InternalError> {
        let current = self.current_block()?;
        let mut crosses_finally = false;
        for block in self.program.block_chain(current) {
            if !self.program.blocks[block].transferable {
                crosses_finally = true;
                break;
            }
            if Some(block) == target {
                break;
            }
        }
        if crosses_finally {
            self.error(location, SemanticError::TransferOutOfFinally);
        }
        Ok(())
    }
}
