//! Loop lowering
//!
//! Every loop becomes a block with `is_loop` set that restarts at its end.
//! The loop's own statements decide whether to go round again; the user's
//! body is a nested block so `continue` can leave it and fall through to the
//! step and the test.
//!
//! ```text
//! while c { body }       =>  branch c { loop L { { body } ; branch !c { exit L } } }
//! for i = a to b { .. }  =>  { i = a ; branch i <= b { loop L { {..} ; i += 1 ; branch !(i <= b) { exit L } } } }
//! ```

use crate::LoweringContext;
use crate::lookup::{Member, MemberKind};
use rk_intern::Symbol;
use rk_it::{
    BinaryOp, BlockId, ExitKind, Expr, ExprKind, InternalError, SemanticError, Stmt, TyId, TyKind,
    Value, VariableId,
};
use rk_span::SourceLocation;
use rk_subst::{instantiate_ancestor, member_view};
use rk_syntax::{Block, ForStmt, ForeachStmt, WhileStmt};
use tracing::trace;

/// Shared state of the nested loops walking a multi-dimensional array
struct ArrayWalk<'a> {
    array: VariableId,
    element: TyId,
    lengths: Vec<VariableId>,
    indices: Vec<VariableId>,
    variable: Symbol,
    body: &'a Block,
    label: Option<Symbol>,
    location: SourceLocation,
}

impl LoweringContext<'_> {
    /// Unlinked loop block nested in the current block
    fn build_loop(
        &mut self,
        label: Option<Symbol>,
        location: SourceLocation,
        fill: impl FnOnce(&mut Self, BlockId) -> Result<(), InternalError>,
    ) -> Result<BlockId, InternalError> {
        let block = self.child_block(location)?;
        let data = &mut self.program.blocks[block];
        data.is_loop = true;
        data.name = label;
        self.in_block(block, |ctx| fill(ctx, block))?;
        Ok(block)
    }

    /// Loop linked into the current block, entered only when `guard` holds
    fn emit_loop(
        &mut self,
        guard: Option<Expr>,
        label: Option<Symbol>,
        location: SourceLocation,
        fill: impl FnOnce(&mut Self, BlockId) -> Result<(), InternalError>,
    ) -> Result<BlockId, InternalError> {
        let Some(condition) = guard else {
            let block = self.build_loop(label, location, fill)?;
            self.push_stmt(Stmt::Block(block))?;
            return Ok(block);
        };
        let guarded = self.child_block(location)?;
        let block = self.in_block(guarded, |ctx| {
            let block = ctx.build_loop(label, location, fill)?;
            ctx.push_stmt(Stmt::Block(block))?;
            Ok(block)
        })?;
        self.push_stmt(Stmt::Branch {
            condition,
            then_block: guarded,
            else_block: None,
        })?;
        Ok(block)
    }

    /// User body of loop `block`, with an optional element alias
    fn loop_body(&mut self, block: BlockId, body: &Block, alias: Option<(Symbol, Expr)>) -> Result<BlockId, InternalError> {
        let inner = self.child_block(body.location)?;
        self.program.blocks[block].continue_target = Some(inner);
        if let Some((name, alias)) = alias {
            self.program.blocks[inner].virtuals.insert(name, alias);
        }
        self.lower_block_into(inner, body)?;
        self.push_stmt(Stmt::Block(inner))?;
        Ok(inner)
    }

    /// Leave `target` unless `condition` holds
    fn exit_unless(&mut self, condition: Expr, target: BlockId) -> Result<(), InternalError> {
        let exit = Stmt::Exit {
            block: target,
            kind: ExitKind::Break,
        };
        match condition.literal() {
            Some(Value::Bool(true)) => return Ok(()),
            Some(Value::Bool(false)) => return self.push_stmt(exit),
            _ => {}
        }
        let location = condition.location;
        let then_block = self.child_block(location)?;
        self.program.blocks[then_block].statements.push(exit);
        let condition = self.negate(condition);
        self.push_stmt(Stmt::Branch {
            condition,
            then_block,
            else_block: None,
        })
    }

    fn literal_bool(&self, expr: &Expr) -> Option<bool> {
        if self.folding() { expr.literal().and_then(Value::as_bool) } else { None }
    }

    pub(crate) fn lower_while(&mut self, stmt: &WhileStmt, location: SourceLocation) -> Result<(), InternalError> {
        let condition = self.lower_condition(&stmt.condition)?;
        let constant = self.literal_bool(&condition);
        if constant == Some(false) && !stmt.skip_first_check {
            trace!("while loop never runs; body checked only");
            self.build_loop(stmt.label, location, |ctx, block| ctx.loop_body(block, &stmt.body, None).map(|_| ()))?;
            return Ok(());
        }
        let guard = (constant.is_none() && !stmt.skip_first_check).then(|| condition.clone());
        self.emit_loop(guard, stmt.label, location, |ctx, block| {
            ctx.loop_body(block, &stmt.body, None)?;
            ctx.exit_unless(condition, block)
        })?;
        Ok(())
    }

    /// Counted loop over an inclusive range
    ///
    /// The limit and step are evaluated once, before the counter is declared.
    /// A negative step counts down. When all three bounds are literals the
    /// entry test is decided here: a loop that never runs is only checked,
    /// and one that runs at least once needs no guard.
    pub(crate) fn lower_for(&mut self, stmt: &ForStmt, location: SourceLocation) -> Result<(), InternalError> {
        let int = self.program.int_ty();
        let initial = self.lower_expr(&stmt.initial)?;
        let initial = self.coerce(initial, int);
        let limit = self.lower_expr(&stmt.limit)?;
        let limit = self.coerce(limit, int);
        let step = match &stmt.step {
            Some(step) => {
                let step = self.lower_expr(step)?;
                self.coerce(step, int)
            }
            None => Expr::new(ExprKind::Literal(Value::Int(1)), int, location),
        };
        if self.is_reserved(stmt.variable) {
            let name = self.text(stmt.variable);
            self.error(location, SemanticError::ReservedIdentifier { name });
        }

        let bounds = match (initial.literal(), limit.literal(), step.literal()) {
            (Some(initial), Some(limit), Some(step)) if self.folding() => {
                initial.as_i128().zip(limit.as_i128()).zip(step.as_i128())
            }
            _ => None,
        };
        let runs = bounds.map(|((initial, limit), step)| if step < 0 { initial >= limit } else { initial <= limit });

        let wrapper = self.child_block(location)?;
        self.in_block(wrapper, |ctx| {
            let counter = match ctx.declare_local(stmt.variable, int, location)? {
                Some(counter) => counter,
                None => ctx.hidden_local("counter", int, location)?,
            };
            ctx.push_assign(ctx.local_expr(counter, location), initial)?;
            let limit = ctx.stable_value("limit", limit)?;
            let step = ctx.stable_value("step", step)?;

            let count = ctx.local_expr(counter, location);
            let test = match step.literal().and_then(Value::signum) {
                Some(sign) => {
                    let op = if sign < 0 { BinaryOp::Ge } else { BinaryOp::Le };
                    ctx.binary(op, count, limit.clone(), location)
                }
                None => {
                    let zero = Expr::new(ExprKind::Literal(Value::Int(0)), int, location);
                    let upward = ctx.binary(BinaryOp::Ge, step.clone(), zero, location);
                    let below = ctx.binary(BinaryOp::Le, count.clone(), limit.clone(), location);
                    let above = ctx.binary(BinaryOp::Ge, count, limit.clone(), location);
                    let bool_ty = ctx.program.bool_ty();
                    Expr::new(
                        ExprKind::Conditional {
                            condition: Box::new(upward),
                            then: Box::new(below),
                            otherwise: Box::new(above),
                        },
                        bool_ty,
                        location,
                    )
                }
            };
            let guard = runs.is_none().then(|| test.clone());
            let fill = |ctx: &mut Self, block: BlockId| {
                ctx.loop_body(block, &stmt.body, None)?;
                let increment = Expr::new(
                    ExprKind::CompoundAssign {
                        op: BinaryOp::Add,
                        target: Box::new(ctx.local_expr(counter, location)),
                        value: Box::new(step),
                    },
                    int,
                    location,
                );
                ctx.push_stmt(Stmt::Expr(increment))?;
                ctx.exit_unless(test, block)
            };
            if runs == Some(false) {
                ctx.build_loop(stmt.label, location, fill)?;
            } else {
                ctx.emit_loop(guard, stmt.label, location, fill)?;
            }
            Ok(())
        })?;
        if runs == Some(false) {
            trace!("for loop never runs; body checked only");
            return Ok(());
        }
        self.push_stmt(Stmt::Block(wrapper))
    }

    /// Literals stay inline; anything else is evaluated once into a hidden local
    fn stable_value(&mut self, prefix: &str, value: Expr) -> Result<Expr, InternalError> {
        if value.literal().is_some() || value.is_error() {
            return Ok(value);
        }
        let location = value.location;
        let holder = self.hidden_local(prefix, value.ty, location)?;
        self.push_assign(self.local_expr(holder, location), value)?;
        Ok(self.local_expr(holder, location))
    }

    pub(crate) fn lower_foreach(&mut self, stmt: &ForeachStmt, location: SourceLocation) -> Result<(), InternalError> {
        let collection = self.lower_expr(&stmt.collection)?;
        if self.is_reserved(stmt.variable) {
            let name = self.text(stmt.variable);
            self.error(location, SemanticError::ReservedIdentifier { name });
        }
        if collection.is_error() {
            return self.unreachable_foreach(stmt, location);
        }
        match self.program.ty(collection.ty).clone() {
            TyKind::Array { element, dimensions } => self.foreach_array(stmt, collection, element, dimensions, location),
            TyKind::Class(_) | TyKind::Instance { .. } => self.foreach_iterator(stmt, collection, location),
            _ => {
                let ty = self.describe(collection.ty);
                self.error(location, SemanticError::NotIterable { ty });
                self.unreachable_foreach(stmt, location)
            }
        }
    }

    /// Check the body of a foreach over an invalid collection
    fn unreachable_foreach(&mut self, stmt: &ForeachStmt, location: SourceLocation) -> Result<(), InternalError> {
        let placeholder = self.error_expr(location);
        self.build_loop(stmt.label, location, |ctx, block| {
            ctx.loop_body(block, &stmt.body, Some((stmt.variable, placeholder))).map(|_| ())
        })?;
        Ok(())
    }

    /// One counter per dimension, walked as nested loops in row-major order
    fn foreach_array(
        &mut self,
        stmt: &ForeachStmt,
        collection: Expr,
        element: TyId,
        dimensions: u32,
        location: SourceLocation,
    ) -> Result<(), InternalError> {
        let int = self.program.int_ty();
        let wrapper = self.child_block(location)?;
        self.in_block(wrapper, |ctx| {
            let array = ctx.hidden_local("array", collection.ty, location)?;
            ctx.push_assign(ctx.local_expr(array, location), collection)?;
            let mut walk = ArrayWalk {
                array,
                element,
                lengths: Vec::new(),
                indices: Vec::new(),
                variable: stmt.variable,
                body: &stmt.body,
                label: stmt.label,
                location,
            };
            for dimension in 0..dimensions {
                let length = ctx.hidden_local("length", int, location)?;
                let measured = Expr::new(
                    ExprKind::ArrayLength {
                        array: Box::new(ctx.local_expr(array, location)),
                        dimension: (dimensions > 1).then_some(dimension),
                    },
                    int,
                    location,
                );
                ctx.push_assign(ctx.local_expr(length, location), measured)?;
                let index = ctx.hidden_local("index", int, location)?;
                let zero = Expr::new(ExprKind::Literal(Value::Int(0)), int, location);
                ctx.push_assign(ctx.local_expr(index, location), zero)?;
                walk.lengths.push(length);
                walk.indices.push(index);
            }
            ctx.array_level(&walk, 0, None)
        })?;
        self.push_stmt(Stmt::Block(wrapper))
    }

    /// Loop over dimension `level`; `outer` is the outermost loop block
    fn array_level(&mut self, walk: &ArrayWalk<'_>, level: usize, outer: Option<BlockId>) -> Result<(), InternalError> {
        let location = walk.location;
        let int = self.program.int_ty();
        let index = walk.indices[level];
        let length = walk.lengths[level];
        if level > 0 {
            let zero = Expr::new(ExprKind::Literal(Value::Int(0)), int, location);
            self.push_assign(self.local_expr(index, location), zero)?;
        }
        let test = self.binary(BinaryOp::Lt, self.local_expr(index, location), self.local_expr(length, location), location);
        let label = if level == 0 { walk.label } else { None };
        self.emit_loop(Some(test.clone()), label, location, |ctx, block| {
            let root = outer.unwrap_or(block);
            if outer.is_some() {
                ctx.program.blocks[block].break_target = Some(root);
            }
            if level + 1 == walk.indices.len() {
                let indices = walk.indices.iter().map(|&counter| ctx.local_expr(counter, location)).collect();
                let alias = Expr::new(
                    ExprKind::ArrayElement {
                        array: Box::new(ctx.local_expr(walk.array, location)),
                        indices,
                    },
                    walk.element,
                    location,
                );
                let body = ctx.loop_body(block, walk.body, Some((walk.variable, alias)))?;
                ctx.program.blocks[root].continue_target = Some(body);
            } else {
                ctx.array_level(walk, level + 1, Some(root))?;
            }
            let one = Expr::new(ExprKind::Literal(Value::Int(1)), int, location);
            let increment = Expr::new(
                ExprKind::CompoundAssign {
                    op: BinaryOp::Add,
                    target: Box::new(ctx.local_expr(index, location)),
                    value: Box::new(one),
                },
                int,
                location,
            );
            ctx.push_stmt(Stmt::Expr(increment))?;
            ctx.exit_unless(test, block)
        })?;
        Ok(())
    }

    /// Collections exposing `GetIterator()` returning an `Iterator<T>`
    fn foreach_iterator(&mut self, stmt: &ForeachStmt, collection: Expr, location: SourceLocation) -> Result<(), InternalError> {
        let get_iterator = self.program.names.get_iterator;
        let method = match self.find_member(collection.ty, get_iterator) {
            Some(member @ Member { kind: MemberKind::Method(function), .. }) => {
                let def = &self.program.functions[function];
                match def.return_type {
                    Some(ret) if def.params.is_empty() && def.generics.is_empty() => Some((member, function, ret)),
                    _ => None,
                }
            }
            _ => None,
        };
        let Some((member, function, ret)) = method else {
            let ty = self.describe(collection.ty);
            self.error(location, SemanticError::NotIterable { ty });
            return self.unreachable_foreach(stmt, location);
        };
        self.check_access(&member, location)?;
        let view = member_view(self.program, collection.ty, member.owner);
        let iterator_ty = view.apply(&mut self.program.types, ret);
        let iterator_class = self.program.prelude.iterator;
        let element = instantiate_ancestor(self.program, iterator_ty, iterator_class)
            .and_then(|ty| self.program.type_args(ty).first().copied());
        let Some(element) = element else {
            let ty = self.describe(collection.ty);
            self.error(location, SemanticError::NotIterable { ty });
            return self.unreachable_foreach(stmt, location);
        };

        let wrapper = self.child_block(location)?;
        self.in_block(wrapper, |ctx| {
            let iterator = ctx.hidden_local("iterator", iterator_ty, location)?;
            let created = Expr::new(
                ExprKind::Call {
                    function,
                    target: Some(Box::new(collection)),
                    args: Vec::new(),
                },
                iterator_ty,
                location,
            );
            ctx.push_assign(ctx.local_expr(iterator, location), created)?;
            let bool_ty = ctx.program.bool_ty();
            let move_next = Expr::new(
                ExprKind::Call {
                    function: ctx.program.prelude.iterator_move_next,
                    target: Some(Box::new(ctx.local_expr(iterator, location))),
                    args: Vec::new(),
                },
                bool_ty,
                location,
            );
            let current = Expr::new(
                ExprKind::Property {
                    target: Some(Box::new(ctx.local_expr(iterator, location))),
                    property: ctx.program.prelude.iterator_current,
                },
                element,
                location,
            );
            ctx.emit_loop(None, stmt.label, location, |ctx, block| {
                ctx.exit_unless(move_next, block)?;
                ctx.loop_body(block, &stmt.body, Some((stmt.variable, current)))
                    .map(|_| ())
            })?;
            Ok(())
        })?;
        self.push_stmt(Stmt::Block(wrapper))
    }
}
