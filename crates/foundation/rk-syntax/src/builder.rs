//! Convenience constructors for CST nodes
//!
//! Parsers and tests build trees through [`SyntaxBuilder`] instead of spelling
//! out every struct literal. Each node gets a fresh location on its own line
//! so diagnostics remain distinguishable.

use crate::decl::{
    AccessorDecl, ClassDecl, CompilationUnit, Declaration, DeclarationKind, EnumDecl,
    EnumMemberDecl, FunctionDecl, GenericParamDecl, ParamDecl, PropertyDecl, VariableDecl,
};
use crate::expr::{AnonymousFunction, Argument, Expr, ExprKind, Literal};
use crate::stmt::{
    Block, CaseRange, CatchClause, CatchKind, ConditionalBranch, ForStmt, ForeachStmt, IfStmt,
    LocalVarDecl, Stmt, StmtKind, SwitchCase, SwitchStmt, TryStmt, WhileStmt,
};
use crate::ty::{FnParamRef, TypeRef, TypeRefKind};
use crate::{BinaryOp, UnaryOp, Visibility};
use rk_intern::{Interner, Symbol};
use rk_span::{FileId, SourceLocation};
use std::cell::Cell;

/// Builder for CST nodes of one source file
#[derive(Debug)]
pub struct SyntaxBuilder {
    interner: Interner,
    file: FileId,
    line: Cell<u32>,
}

impl SyntaxBuilder {
    /// Builder for nodes of `file`
    pub fn new(interner: &Interner, file: FileId) -> Self {
        Self {
            interner: interner.clone(),
            file,
            line: Cell::new(0),
        }
    }

    /// Interner symbols are created in
    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    /// Intern `text`
    pub fn sym(&self, text: &str) -> Symbol {
        self.interner.intern(text)
    }

    /// Next location (one line below the previous one)
    pub fn loc(&self) -> SourceLocation {
        let line = self.line.get() + 1;
        self.line.set(line);
        SourceLocation::new(self.file, line, 1)
    }

    fn path(&self, text: &str) -> Vec<Symbol> {
        text.split('#').map(|segment| self.sym(segment)).collect()
    }

    // ---- types ----

    /// Named type; `#` separates scope qualifiers
    pub fn ty(&self, name: &str) -> TypeRef {
        self.generic_ty(name, Vec::new())
    }

    /// Named type with generic arguments
    pub fn generic_ty(&self, name: &str, args: Vec<TypeRef>) -> TypeRef {
        TypeRef {
            kind: TypeRefKind::Named {
                unit: None,
                path: self.path(name),
                args,
            },
            location: self.loc(),
        }
    }

    /// Named type inside the global scope of another unit
    pub fn unit_ty(&self, unit: &str, name: &str) -> TypeRef {
        TypeRef {
            kind: TypeRefKind::Named {
                unit: Some(self.sym(unit)),
                path: self.path(name),
                args: Vec::new(),
            },
            location: self.loc(),
        }
    }

    /// `element[]` with `dimensions` dimensions
    pub fn array_ty(&self, element: TypeRef, dimensions: u32) -> TypeRef {
        TypeRef {
            kind: TypeRefKind::Array {
                element: Box::new(element),
                dimensions,
            },
            location: self.loc(),
        }
    }

    /// `function(params): ret`; each parameter flags by-reference passing
    pub fn fn_ty(&self, params: Vec<(TypeRef, bool)>, ret: Option<TypeRef>) -> TypeRef {
        TypeRef {
            kind: TypeRefKind::Function {
                params: params
                    .into_iter()
                    .map(|(ty, by_ref)| FnParamRef { ty, by_ref })
                    .collect(),
                ret: ret.map(Box::new),
            },
            location: self.loc(),
        }
    }

    // ---- expressions ----

    /// Expression at the next location
    pub fn expr(&self, kind: ExprKind) -> Expr {
        Expr {
            kind,
            location: self.loc(),
        }
    }

    /// Integer literal
    pub fn int(&self, value: u64) -> Expr {
        self.expr(ExprKind::Literal(Literal::Integer(value)))
    }

    /// Integer literal, negated through a unary minus when below zero
    pub fn signed(&self, value: i64) -> Expr {
        let literal = self.int(value.unsigned_abs());
        if value < 0 {
            self.unary(UnaryOp::Neg, literal)
        } else {
            literal
        }
    }

    /// Floating point literal
    pub fn float(&self, value: f64) -> Expr {
        self.expr(ExprKind::Literal(Literal::Float(value)))
    }

    /// String literal
    pub fn string(&self, value: &str) -> Expr {
        self.expr(ExprKind::Literal(Literal::String(value.to_string())))
    }

    /// Character literal
    pub fn char(&self, value: char) -> Expr {
        self.expr(ExprKind::Literal(Literal::Char(value)))
    }

    /// `true` or `false`
    pub fn bool(&self, value: bool) -> Expr {
        self.expr(ExprKind::Literal(Literal::Bool(value)))
    }

    /// `null`
    pub fn null(&self) -> Expr {
        self.expr(ExprKind::Literal(Literal::Null))
    }

    /// Unqualified name
    pub fn name(&self, name: &str) -> Expr {
        self.expr(ExprKind::Name(self.sym(name)))
    }

    /// `A#B#C`
    pub fn scoped(&self, path: &str) -> Expr {
        self.expr(ExprKind::Scoped {
            unit: None,
            path: self.path(path),
        })
    }

    /// `global(unit)#path`
    pub fn global(&self, unit: &str, path: &str) -> Expr {
        self.expr(ExprKind::Scoped {
            unit: Some(self.sym(unit)),
            path: self.path(path),
        })
    }

    /// `this`
    pub fn this(&self) -> Expr {
        self.expr(ExprKind::This)
    }

    /// `target.name`
    pub fn member(&self, target: Expr, name: &str) -> Expr {
        self.expr(ExprKind::Member {
            target: Box::new(target),
            name: self.sym(name),
        })
    }

    /// `target[indices]`
    pub fn index(&self, target: Expr, indices: Vec<Expr>) -> Expr {
        self.expr(ExprKind::Index {
            target: Box::new(target),
            indices,
        })
    }

    /// Call with by-value arguments and no generic arguments
    pub fn call(&self, callee: Expr, args: Vec<Expr>) -> Expr {
        self.call_with(callee, Vec::new(), args.into_iter().map(Self::arg).collect())
    }

    /// Call with explicit generic arguments and argument modes
    pub fn call_with(&self, callee: Expr, generic_args: Vec<TypeRef>, args: Vec<Argument>) -> Expr {
        self.expr(ExprKind::Call {
            callee: Box::new(callee),
            generic_args,
            args,
        })
    }

    /// By-value argument
    pub fn arg(value: Expr) -> Argument {
        Argument {
            value,
            by_ref: false,
        }
    }

    /// By-reference argument
    pub fn ref_arg(value: Expr) -> Argument {
        Argument {
            value,
            by_ref: true,
        }
    }

    /// `new ty(args)`
    pub fn new_object(&self, ty: TypeRef, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::New {
            ty,
            args: args.into_iter().map(Self::arg).collect(),
        })
    }

    /// `new element[lengths]`
    pub fn new_array(&self, element: TypeRef, lengths: Vec<Expr>) -> Expr {
        self.expr(ExprKind::NewArray { element, lengths })
    }

    /// Unary operation
    pub fn unary(&self, op: UnaryOp, operand: Expr) -> Expr {
        self.expr(ExprKind::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    /// Binary operation
    pub fn binary(&self, op: BinaryOp, left: Expr, right: Expr) -> Expr {
        self.expr(ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    /// `target = value`
    pub fn assign(&self, target: Expr, value: Expr) -> Expr {
        self.expr(ExprKind::Assign {
            op: None,
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    /// `target op= value`
    pub fn compound(&self, op: BinaryOp, target: Expr, value: Expr) -> Expr {
        self.expr(ExprKind::Assign {
            op: Some(op),
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    /// `(ty) expr`
    pub fn cast(&self, ty: TypeRef, expr: Expr) -> Expr {
        self.expr(ExprKind::Cast {
            ty,
            expr: Box::new(expr),
        })
    }

    /// `expr is ty`
    pub fn is(&self, expr: Expr, ty: TypeRef) -> Expr {
        self.expr(ExprKind::Is {
            expr: Box::new(expr),
            ty,
        })
    }

    /// `condition ? then : otherwise`
    pub fn conditional(&self, condition: Expr, then: Expr, otherwise: Expr) -> Expr {
        self.expr(ExprKind::Conditional {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    /// Anonymous function
    pub fn lambda(&self, params: Vec<ParamDecl>, return_type: Option<TypeRef>, body: Block) -> Expr {
        self.expr(ExprKind::AnonymousFunction(Box::new(AnonymousFunction {
            params,
            return_type,
            body,
        })))
    }

    // ---- statements ----

    /// Statement at the next location
    pub fn stmt(&self, kind: StmtKind) -> Stmt {
        Stmt {
            kind,
            location: self.loc(),
        }
    }

    /// Unlabeled block
    pub fn block(&self, statements: Vec<Stmt>) -> Block {
        Block {
            label: None,
            statements,
            location: self.loc(),
        }
    }

    /// Block `break` can leave by label
    pub fn labeled_block(&self, label: &str, statements: Vec<Stmt>) -> Block {
        Block {
            label: Some(self.sym(label)),
            statements,
            location: self.loc(),
        }
    }

    /// Expression statement
    pub fn expr_stmt(&self, expr: Expr) -> Stmt {
        self.stmt(StmtKind::Expr(expr))
    }

    /// Nested block statement
    pub fn block_stmt(&self, block: Block) -> Stmt {
        self.stmt(StmtKind::Block(block))
    }

    /// Local variable
    pub fn var(&self, name: &str, ty: Option<TypeRef>, initializer: Option<Expr>) -> Stmt {
        self.stmt(StmtKind::Var(LocalVarDecl {
            name: self.sym(name),
            ty,
            initializer,
            is_const: false,
        }))
    }

    /// Local constant
    pub fn const_var(&self, name: &str, ty: Option<TypeRef>, initializer: Expr) -> Stmt {
        self.stmt(StmtKind::Var(LocalVarDecl {
            name: self.sym(name),
            ty,
            initializer: Some(initializer),
            is_const: true,
        }))
    }

    /// `if`/`elif` chain with an optional `else`
    pub fn if_else(&self, branches: Vec<(Expr, Block)>, otherwise: Option<Block>) -> Stmt {
        self.stmt(StmtKind::If(IfStmt {
            branches: branches
                .into_iter()
                .map(|(condition, body)| ConditionalBranch { condition, body })
                .collect(),
            otherwise,
        }))
    }

    /// `while` loop
    pub fn while_loop(&self, condition: Expr, body: Block) -> Stmt {
        self.stmt(StmtKind::While(WhileStmt {
            condition,
            body,
            skip_first_check: false,
            label: None,
        }))
    }

    /// `do`/`while` loop
    pub fn do_while(&self, condition: Expr, body: Block) -> Stmt {
        self.stmt(StmtKind::While(WhileStmt {
            condition,
            body,
            skip_first_check: true,
            label: None,
        }))
    }

    /// Counted `for` loop
    pub fn for_loop(
        &self,
        variable: &str,
        initial: Expr,
        limit: Expr,
        step: Option<Expr>,
        body: Block,
    ) -> Stmt {
        self.stmt(StmtKind::For(ForStmt {
            variable: self.sym(variable),
            initial,
            limit,
            step,
            body,
            label: None,
        }))
    }

    /// `foreach` over `collection`
    pub fn foreach(&self, variable: &str, collection: Expr, body: Block) -> Stmt {
        self.stmt(StmtKind::Foreach(ForeachStmt {
            variable: self.sym(variable),
            collection,
            body,
            label: None,
        }))
    }

    /// `switch` with an optional default
    pub fn switch(&self, subject: Expr, cases: Vec<SwitchCase>, default: Option<Block>) -> Stmt {
        self.stmt(StmtKind::Switch(SwitchStmt {
            subject,
            cases,
            default,
        }))
    }

    /// Switch case; each range is a single value or `lower..upper`
    pub fn case(&self, ranges: Vec<(Expr, Option<Expr>)>, body: Block) -> SwitchCase {
        SwitchCase {
            ranges: ranges
                .into_iter()
                .map(|(lower, upper)| CaseRange { lower, upper })
                .collect(),
            body,
            location: self.loc(),
        }
    }

    /// `try` with handlers and an optional `finally`
    pub fn try_catch(&self, body: Block, catches: Vec<CatchClause>, finally: Option<Block>) -> Stmt {
        self.stmt(StmtKind::Try(TryStmt {
            body,
            catches,
            finally,
        }))
    }

    /// Catch-all clause
    pub fn catch_all(&self, info: Option<&str>, body: Block) -> CatchClause {
        self.catch_clause(CatchKind::All, info, body)
    }

    /// Clause catching exceptions of `ty`
    pub fn catch_typed(&self, ty: TypeRef, info: Option<&str>, body: Block) -> CatchClause {
        self.catch_clause(CatchKind::Typed(ty), info, body)
    }

    /// Clause catching numeric codes in a range
    pub fn catch_range(
        &self,
        lower: Expr,
        upper: Option<Expr>,
        info: Option<&str>,
        body: Block,
    ) -> CatchClause {
        self.catch_clause(CatchKind::Range(CaseRange { lower, upper }), info, body)
    }

    fn catch_clause(&self, kind: CatchKind, info: Option<&str>, body: Block) -> CatchClause {
        CatchClause {
            kind,
            info: info.map(|name| self.sym(name)),
            body,
            location: self.loc(),
        }
    }

    /// `break`, optionally naming a block
    pub fn break_stmt(&self, label: Option<&str>) -> Stmt {
        self.stmt(StmtKind::Break(label.map(|name| self.sym(name))))
    }

    /// `continue`, optionally naming a loop
    pub fn continue_stmt(&self, label: Option<&str>) -> Stmt {
        self.stmt(StmtKind::Continue(label.map(|name| self.sym(name))))
    }

    /// `return`
    pub fn ret(&self, value: Option<Expr>) -> Stmt {
        self.stmt(StmtKind::Return(value))
    }

    /// `throw`
    pub fn throw(&self, value: Expr) -> Stmt {
        self.stmt(StmtKind::Throw(value))
    }

    /// `assert`
    pub fn assert(&self, condition: Expr, message: Option<Expr>) -> Stmt {
        self.stmt(StmtKind::Assert { condition, message })
    }

    /// `ifdef symbol`
    pub fn ifdef(&self, symbol: &str, then: Block, otherwise: Option<Block>) -> Stmt {
        self.stmt(StmtKind::Ifdef {
            symbol: self.sym(symbol),
            then,
            otherwise,
        })
    }

    /// Declaration nested in a body
    pub fn decl_stmt(&self, declaration: Declaration) -> Stmt {
        self.stmt(StmtKind::Declaration(Box::new(declaration)))
    }

    // ---- declarations ----

    /// Declaration of `name` with default visibility
    pub fn declaration(&self, name: &str, kind: DeclarationKind) -> Declaration {
        Declaration {
            name: self.sym(name),
            visibility: Visibility::Public,
            location: self.loc(),
            kind,
        }
    }

    /// Unconstrained generic parameters
    pub fn generics(&self, names: &[&str]) -> Vec<GenericParamDecl> {
        names
            .iter()
            .map(|name| GenericParamDecl {
                name: self.sym(name),
                location: self.loc(),
            })
            .collect()
    }

    /// Class deriving from `bases`
    pub fn class(&self, name: &str, bases: Vec<TypeRef>, members: Vec<Declaration>) -> Declaration {
        self.declaration(
            name,
            DeclarationKind::Class(ClassDecl {
                bases,
                members,
                ..ClassDecl::default()
            }),
        )
    }

    /// Generic class
    pub fn generic_class(
        &self,
        name: &str,
        generics: &[&str],
        bases: Vec<TypeRef>,
        members: Vec<Declaration>,
    ) -> Declaration {
        self.declaration(
            name,
            DeclarationKind::Class(ClassDecl {
                generics: self.generics(generics),
                bases,
                members,
                ..ClassDecl::default()
            }),
        )
    }

    /// Interface
    pub fn interface(&self, name: &str, bases: Vec<TypeRef>, members: Vec<Declaration>) -> Declaration {
        self.declaration(
            name,
            DeclarationKind::Class(ClassDecl {
                is_interface: true,
                bases,
                members,
                ..ClassDecl::default()
            }),
        )
    }

    /// Enum with an optional underlying type
    pub fn enumeration(
        &self,
        name: &str,
        underlying: Option<TypeRef>,
        members: Vec<(&str, Option<Expr>)>,
    ) -> Declaration {
        let members = members
            .into_iter()
            .map(|(member, value)| EnumMemberDecl {
                name: self.sym(member),
                value,
                location: self.loc(),
            })
            .collect();
        self.declaration(name, DeclarationKind::Enum(EnumDecl { underlying, members }))
    }

    /// By-value parameter
    pub fn param(&self, name: &str, ty: TypeRef) -> ParamDecl {
        ParamDecl {
            name: self.sym(name),
            ty,
            by_ref: false,
            location: self.loc(),
        }
    }

    /// By-reference parameter
    pub fn ref_param(&self, name: &str, ty: TypeRef) -> ParamDecl {
        ParamDecl {
            by_ref: true,
            ..self.param(name, ty)
        }
    }

    /// Function or method
    pub fn function(
        &self,
        name: &str,
        params: Vec<ParamDecl>,
        return_type: Option<TypeRef>,
        body: Option<Block>,
    ) -> Declaration {
        self.declaration(
            name,
            DeclarationKind::Function(FunctionDecl {
                params,
                return_type,
                body,
                ..FunctionDecl::default()
            }),
        )
    }

    /// Generic function or method
    pub fn generic_function(
        &self,
        name: &str,
        generics: &[&str],
        params: Vec<ParamDecl>,
        return_type: Option<TypeRef>,
        body: Option<Block>,
    ) -> Declaration {
        self.declaration(
            name,
            DeclarationKind::Function(FunctionDecl {
                generics: self.generics(generics),
                params,
                return_type,
                body,
                ..FunctionDecl::default()
            }),
        )
    }

    /// Method marked as overriding its base member
    pub fn override_function(
        &self,
        name: &str,
        params: Vec<ParamDecl>,
        return_type: Option<TypeRef>,
        body: Option<Block>,
    ) -> Declaration {
        let mut declaration = self.function(name, params, return_type, body);
        if let DeclarationKind::Function(function) = &mut declaration.kind {
            function.is_override = true;
        }
        declaration
    }

    /// Variable or field
    pub fn variable(&self, name: &str, ty: Option<TypeRef>, initializer: Option<Expr>) -> Declaration {
        self.declaration(
            name,
            DeclarationKind::Variable(VariableDecl {
                ty,
                initializer,
                is_const: false,
            }),
        )
    }

    /// Constant
    pub fn constant(&self, name: &str, ty: Option<TypeRef>, initializer: Expr) -> Declaration {
        self.declaration(
            name,
            DeclarationKind::Variable(VariableDecl {
                ty,
                initializer: Some(initializer),
                is_const: true,
            }),
        )
    }

    /// Property with optional getter and setter bodies
    pub fn property(
        &self,
        name: &str,
        ty: TypeRef,
        getter: Option<Option<Block>>,
        setter: Option<Option<Block>>,
    ) -> Declaration {
        let accessor = |body| AccessorDecl {
            body,
            location: self.loc(),
        };
        self.declaration(
            name,
            DeclarationKind::Property(PropertyDecl {
                ty,
                getter: getter.map(accessor),
                setter: setter.map(accessor),
                is_override: false,
            }),
        )
    }

    /// `declaration` with `visibility`
    pub fn with_visibility(mut declaration: Declaration, visibility: Visibility) -> Declaration {
        declaration.visibility = visibility;
        declaration
    }

    /// Compilation unit
    pub fn unit(&self, name: &str, declarations: Vec<Declaration>) -> CompilationUnit {
        CompilationUnit {
            name: self.sym(name),
            file: self.file,
            declarations,
        }
    }
}
