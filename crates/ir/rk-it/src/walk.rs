//! Traversal of lowered bodies

use crate::body::{Expr, ExprKind, Stmt};
use crate::entity::BlockId;
use crate::program::Program;

/// Visitor over blocks, statements and expressions
///
/// Every method defaults to recursing into children, so implementors only
/// override the nodes they care about and call the matching `walk_*` function
/// to keep descending.
pub trait Visitor {
    /// Visit a block and, by default, its statements
    fn visit_block(&mut self, program: &Program, block: BlockId) {
        walk_block(self, program, block);
    }

    /// Visit a statement and, by default, its blocks and expressions
    fn visit_stmt(&mut self, program: &Program, stmt: &Stmt) {
        walk_stmt(self, program, stmt);
    }

    /// Visit an expression and, by default, its operands
    fn visit_expr(&mut self, program: &Program, expr: &Expr) {
        walk_expr(self, program, expr);
    }
}

/// Visit every statement of `block`
pub fn walk_block<V: Visitor + ?Sized>(visitor: &mut V, program: &Program, block: BlockId) {
    for stmt in &program.blocks[block].statements {
        visitor.visit_stmt(program, stmt);
    }
}

/// Visit the blocks and expressions directly inside `stmt`
pub fn walk_stmt<V: Visitor + ?Sized>(visitor: &mut V, program: &Program, stmt: &Stmt) {
    match stmt {
        Stmt::Expr(expr) | Stmt::Throw(expr) | Stmt::ThrowNumeric(expr) => {
            visitor.visit_expr(program, expr);
        }
        Stmt::Return(value) => {
            if let Some(value) = value {
                visitor.visit_expr(program, value);
            }
        }
        Stmt::Block(block) => visitor.visit_block(program, *block),
        Stmt::Branch {
            condition,
            then_block,
            else_block,
        } => {
            visitor.visit_expr(program, condition);
            visitor.visit_block(program, *then_block);
            if let Some(else_block) = else_block {
                visitor.visit_block(program, *else_block);
            }
        }
        Stmt::Exit { .. } => {}
        Stmt::Try {
            body,
            handlers,
            finally,
        } => {
            visitor.visit_block(program, *body);
            for handler in handlers {
                visitor.visit_block(program, handler.body);
            }
            if let Some(finally) = finally {
                visitor.visit_block(program, *finally);
            }
        }
    }
}

/// Visit the direct subexpressions of `expr`
pub fn walk_expr<V: Visitor + ?Sized>(visitor: &mut V, program: &Program, expr: &Expr) {
    match &expr.kind {
        ExprKind::Literal(_)
        | ExprKind::Local(_)
        | ExprKind::Param(_)
        | ExprKind::Captured { .. }
        | ExprKind::Global(_)
        | ExprKind::This
        | ExprKind::SurrogateInstance(_)
        | ExprKind::FunctionRef(_)
        | ExprKind::Caught
        | ExprKind::Error => {}
        ExprKind::Field { target, .. } | ExprKind::BoundMethod { target, .. } => {
            visitor.visit_expr(program, target);
        }
        ExprKind::Property { target, .. } => {
            if let Some(target) = target {
                visitor.visit_expr(program, target);
            }
        }
        ExprKind::ArrayElement { array, indices } => {
            visitor.visit_expr(program, array);
            for index in indices {
                visitor.visit_expr(program, index);
            }
        }
        ExprKind::ArrayLength { array, .. } => visitor.visit_expr(program, array),
        ExprKind::Call { target, args, .. } => {
            if let Some(target) = target {
                visitor.visit_expr(program, target);
            }
            for arg in args {
                visitor.visit_expr(program, arg);
            }
        }
        ExprKind::CallValue { callee, args } => {
            visitor.visit_expr(program, callee);
            for arg in args {
                visitor.visit_expr(program, arg);
            }
        }
        ExprKind::New { args, .. } => {
            for arg in args {
                visitor.visit_expr(program, arg);
            }
        }
        ExprKind::NewArray { lengths } => {
            for length in lengths {
                visitor.visit_expr(program, length);
            }
        }
        ExprKind::Unary { operand, .. } => visitor.visit_expr(program, operand),
        ExprKind::Binary { left, right, .. } => {
            visitor.visit_expr(program, left);
            visitor.visit_expr(program, right);
        }
        ExprKind::Assign { target, value } | ExprKind::CompoundAssign { target, value, .. } => {
            visitor.visit_expr(program, target);
            visitor.visit_expr(program, value);
        }
        ExprKind::Cast { expr, .. } | ExprKind::TypeCheck { expr, .. } => {
            visitor.visit_expr(program, expr);
        }
        ExprKind::Conditional {
            condition,
            then,
            otherwise,
        } => {
            visitor.visit_expr(program, condition);
            visitor.visit_expr(program, then);
            visitor.visit_expr(program, otherwise);
        }
    }
}

/// Node counts of a lowered body
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BodyStats {
    /// Blocks reached
    pub blocks: usize,
    /// Blocks flagged as loops
    pub loops: usize,
    /// Statements
    pub statements: usize,
    /// Expressions, including nested ones
    pub expressions: usize,
    /// Error placeholders
    pub error_expressions: usize,
}

impl Visitor for BodyStats {
    fn visit_block(&mut self, program: &Program, block: BlockId) {
        self.blocks += 1;
        if program.blocks[block].is_loop {
            self.loops += 1;
        }
        walk_block(self, program, block);
    }

    fn visit_stmt(&mut self, program: &Program, stmt: &Stmt) {
        self.statements += 1;
        walk_stmt(self, program, stmt);
    }

    fn visit_expr(&mut self, program: &Program, expr: &Expr) {
        self.expressions += 1;
        if expr.is_error() {
            self.error_expressions += 1;
        }
        walk_expr(self, program, expr);
    }
}

impl BodyStats {
    /// Counts for the body rooted at `block`
    pub fn of_block(program: &Program, block: BlockId) -> Self {
        let mut stats = Self::default();
        stats.visit_block(program, block);
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::ExitKind;
    use crate::value::Value;
    use rk_intern::Interner;
    use rk_span::SourceLocation;

    #[test]
    fn test_stats_count_nested_loops() {
        let interner = Interner::new();
        let mut program = Program::new(&interner);
        let unit = program.add_unit(interner.intern("main"));
        let location = SourceLocation::builtin();
        let root = program.new_block(unit, None, None, location);
        let body = program.new_block(unit, Some(root), None, location);
        program.blocks[body].is_loop = true;
        let bool_ty = program.bool_ty();
        let condition = Expr::new(ExprKind::Literal(Value::Bool(true)), bool_ty, location);
        program.blocks[body].statements.push(Stmt::Branch {
            condition,
            then_block: root,
            else_block: None,
        });
        program.blocks[body].statements.push(Stmt::Exit {
            block: body,
            kind: ExitKind::Break,
        });
        let outer = program.new_block(unit, None, None, location);
        program.blocks[outer].statements.push(Stmt::Block(body));

        let stats = BodyStats::of_block(&program, outer);
        assert_eq!(stats.loops, 1);
        assert_eq!(stats.statements, 3);
        assert_eq!(stats.expressions, 1);
        assert_eq!(stats.blocks, 3);
    }
}
