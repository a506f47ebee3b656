use crate::{BuildMode, LowerOptions, LoweringContext};
use rk_intern::Interner;
use rk_it::walk::{Visitor, walk_expr};
use rk_it::{
    BlockId, CastKind, ClassId, ClassKind, Diagnostics, Entity, ExitKind, Expr, ExprKind,
    FunctionId, FunctionKind, GenericOwner, HandlerKind, PrimitiveKind, Program, Reporter, ScopeId,
    Stmt, TyId, TyKind, Value, VariableDef, VariableKind, Visibility,
};
use rk_span::{SourceFiles, SourceLocation};
use rk_syntax::{BinaryOp, Block, SyntaxBuilder};

struct Fixture {
    files: SourceFiles,
    syntax: SyntaxBuilder,
    program: Program,
    unit: ScopeId,
    diagnostics: Diagnostics,
}

impl Fixture {
    fn new() -> Self {
        let interner = Interner::new();
        let mut files = SourceFiles::new();
        let file = files.add("test.rk");
        let mut program = Program::new(&interner);
        let unit = program.add_unit(interner.intern("Main"));
        Self {
            files,
            syntax: SyntaxBuilder::new(&interner, file),
            program,
            unit,
            diagnostics: Diagnostics::new(),
        }
    }

    fn function(&mut self, name: &str, params: &[(&str, TyId)], ret: Option<TyId>) -> FunctionId {
        let location = SourceLocation::builtin();
        let name = self.program.sym(name);
        let function = self.program.new_function(name, location, FunctionKind::Free, self.unit);
        self.program
            .declare(self.unit, name, Entity::Function(function))
            .expect("fresh function name");
        for &(param, ty) in params {
            let param = self.program.sym(param);
            self.program
                .add_param(function, param, ty, false, location)
                .expect("fresh parameter name");
        }
        self.program.functions[function].return_type = ret;
        function
    }

    /// Generic `name<T>(param: T): T`, or `name<T>(): T` without a parameter
    fn generic_function(&mut self, name: &str, param: Option<&str>) -> FunctionId {
        let location = SourceLocation::builtin();
        let function = self.function(name, &[], None);
        let generic = self.program.sym("T");
        let generic = self
            .program
            .add_generic_param(GenericOwner::Function(function), generic, location);
        let generic_ty = self.program.intern(TyKind::Param(generic));
        if let Some(param) = param {
            let param = self.program.sym(param);
            self.program
                .add_param(function, param, generic_ty, false, location)
                .expect("fresh parameter name");
        }
        self.program.functions[function].return_type = Some(generic_ty);
        function
    }

    fn class(&mut self, name: &str, base: Option<ClassId>) -> ClassId {
        let name = self.program.sym(name);
        let class = self
            .program
            .new_class(name, SourceLocation::builtin(), self.unit, ClassKind::Class);
        assert!(self.program.attach_class(class, self.unit));
        let base = match base {
            Some(base) => self.program.self_ty(base),
            None => self.program.root_ty(),
        };
        self.program.classes[class].superclass = Some(base);
        class
    }

    fn field(&mut self, class: ClassId, name: &str, ty: TyId, visibility: Visibility) {
        let name = self.program.sym(name);
        let field = self.program.variables.alloc(VariableDef {
            name,
            location: SourceLocation::builtin(),
            visibility,
            ty,
            kind: VariableKind::Field(class),
            function: None,
            captured: false,
            initializer: None,
        });
        let scope = self.program.classes[class].scope;
        self.program
            .declare(scope, name, Entity::Variable(field))
            .expect("fresh field name");
        self.program.classes[class].fields.insert(name, field);
    }

    fn method(&mut self, class: ClassId, name: &str) -> FunctionId {
        let name = self.program.sym(name);
        self.program
            .new_method(class, name, SourceLocation::builtin(), FunctionKind::Method)
    }

    fn compile(&mut self, function: FunctionId, body: &Block) -> BlockId {
        self.compile_with(function, body, LowerOptions::default())
    }

    fn compile_with(&mut self, function: FunctionId, body: &Block, options: LowerOptions) -> BlockId {
        let reporter = Reporter::new(&mut self.diagnostics, &self.files, None);
        let mut ctx = LoweringContext::new(&mut self.program, reporter, options);
        ctx.compile_function(function, body).expect("no internal error");
        self.program.functions[function].body.expect("body lowered")
    }

    fn statements(&self, block: BlockId) -> &[Stmt] {
        &self.program.blocks[block].statements
    }

    fn only_block(&self, stmt: &Stmt) -> BlockId {
        match stmt {
            Stmt::Block(block) => *block,
            other => panic!("expected a nested block, found {other:?}"),
        }
    }

    fn guarded(&self, stmt: &Stmt) -> BlockId {
        match stmt {
            Stmt::Branch {
                then_block,
                else_block: None,
                ..
            } => *then_block,
            other => panic!("expected a guard branch, found {other:?}"),
        }
    }

    fn local_ty(&self, block: BlockId, name: &str) -> TyId {
        let local = self.program.blocks[block].locals[&self.program.sym(name)];
        self.program.variables[local].ty
    }

    fn messages(&self) -> Vec<&str> {
        self.diagnostics.messages()
    }
}

/// Value assigned by a lowered `var` statement
fn assigned(stmt: &Stmt) -> &Expr {
    match stmt {
        Stmt::Expr(Expr {
            kind: ExprKind::Assign { value, .. },
            ..
        }) => value,
        other => panic!("expected an assignment, found {other:?}"),
    }
}

/// Counts assignments whose value matches a predicate
struct AssignCounter<F: Fn(&Expr) -> bool> {
    matches: F,
    count: usize,
}

impl<F: Fn(&Expr) -> bool> Visitor for AssignCounter<F> {
    fn visit_expr(&mut self, program: &Program, expr: &Expr) {
        if let ExprKind::Assign { value, .. } = &expr.kind {
            if (self.matches)(value) {
                self.count += 1;
            }
        }
        walk_expr(self, program, expr);
    }
}

#[test]
fn test_while_loop_is_guarded_and_retests_at_end() {
    let mut fx = Fixture::new();
    let int = fx.program.int_ty();
    let function = fx.function("count", &[("n", int)], None);
    let b = &fx.syntax;
    let body = b.block(vec![
        b.var("i", None, Some(b.int(0))),
        b.while_loop(
            b.binary(BinaryOp::Lt, b.name("i"), b.name("n")),
            b.block(vec![b.expr_stmt(b.assign(
                b.name("i"),
                b.binary(BinaryOp::Add, b.name("i"), b.int(1)),
            ))]),
        ),
    ]);
    let root = fx.compile(function, &body);

    assert!(fx.messages().is_empty(), "{:?}", fx.messages());
    let statements = fx.statements(root);
    assert_eq!(statements.len(), 2);
    let guard = fx.guarded(&statements[1]);
    let looped = fx.only_block(&fx.statements(guard)[0]);
    assert!(fx.program.blocks[looped].is_loop);
    let inner = fx.statements(looped);
    assert_eq!(inner.len(), 2);
    let exit = fx.guarded(&inner[1]);
    assert!(matches!(
        fx.statements(exit),
        [Stmt::Exit { block, kind: ExitKind::Break }] if *block == looped
    ));
}

#[test]
fn test_while_true_needs_no_guard_or_test() {
    let mut fx = Fixture::new();
    let function = fx.function("spin", &[], None);
    let b = &fx.syntax;
    let body = b.block(vec![b.while_loop(b.bool(true), b.block(vec![b.break_stmt(None)]))]);
    let root = fx.compile(function, &body);

    let looped = fx.only_block(&fx.statements(root)[0]);
    assert!(fx.program.blocks[looped].is_loop);
    let inner = fx.statements(looped);
    assert_eq!(inner.len(), 1);
    let user = fx.only_block(&inner[0]);
    assert!(matches!(
        fx.statements(user),
        [Stmt::Exit { block, kind: ExitKind::Break }] if *block == looped
    ));
}

#[test]
fn test_continue_exits_the_loop_body() {
    let mut fx = Fixture::new();
    let bool_ty = fx.program.bool_ty();
    let function = fx.function("skip", &[("go", bool_ty)], None);
    let b = &fx.syntax;
    let body = b.block(vec![b.while_loop(b.name("go"), b.block(vec![b.continue_stmt(None)]))]);
    let root = fx.compile(function, &body);

    let guard = fx.guarded(&fx.statements(root)[0]);
    let looped = fx.only_block(&fx.statements(guard)[0]);
    let user = fx.only_block(&fx.statements(looped)[0]);
    assert_eq!(fx.program.blocks[looped].continue_target, Some(user));
    assert!(matches!(
        fx.statements(user),
        [Stmt::Exit { block, kind: ExitKind::Continue }] if *block == user
    ));
}

#[test]
fn test_for_with_literal_bounds_enters_unconditionally() {
    let mut fx = Fixture::new();
    let function = fx.function("ten", &[], None);
    let b = &fx.syntax;
    let body = b.block(vec![b.for_loop("i", b.int(1), b.int(10), None, b.block(vec![]))]);
    let root = fx.compile(function, &body);

    assert!(fx.messages().is_empty(), "{:?}", fx.messages());
    let wrapper = fx.only_block(&fx.statements(root)[0]);
    assert_eq!(fx.program.blocks[wrapper].locals.len(), 1);
    let statements = fx.statements(wrapper);
    assert_eq!(statements.len(), 2);
    let looped = fx.only_block(&statements[1]);
    assert!(fx.program.blocks[looped].is_loop);
}

#[test]
fn test_for_that_never_runs_is_elided() {
    let mut fx = Fixture::new();
    let function = fx.function("never", &[], None);
    let b = &fx.syntax;
    let body = b.block(vec![b.for_loop("i", b.int(10), b.int(1), None, b.block(vec![]))]);
    let root = fx.compile(function, &body);

    assert!(fx.messages().is_empty(), "{:?}", fx.messages());
    assert!(fx.statements(root).is_empty());
}

#[test]
fn test_for_with_runtime_bounds_stores_limit_and_step() {
    let mut fx = Fixture::new();
    let int = fx.program.int_ty();
    let function = fx.function("range", &[("n", int), ("s", int)], None);
    let b = &fx.syntax;
    let body = b.block(vec![b.for_loop("i", b.int(0), b.name("n"), Some(b.name("s")), b.block(vec![]))]);
    let root = fx.compile(function, &body);

    assert!(fx.messages().is_empty(), "{:?}", fx.messages());
    let wrapper = fx.only_block(&fx.statements(root)[0]);
    assert_eq!(fx.program.blocks[wrapper].locals.len(), 3);
    let statements = fx.statements(wrapper);
    assert_eq!(statements.len(), 4);
    assert!(matches!(
        &statements[3],
        Stmt::Branch { condition, .. } if matches!(condition.kind, ExprKind::Conditional { .. })
    ));
}

#[test]
fn test_switch_evaluates_subject_once() {
    let mut fx = Fixture::new();
    let int = fx.program.int_ty();
    let function = fx.function("pick", &[("x", int)], None);
    let b = &fx.syntax;
    let body = b.block(vec![b.switch(
        b.name("x"),
        vec![
            b.case(vec![(b.int(1), Some(b.int(3)))], b.block(vec![])),
            b.case(vec![(b.int(10), None)], b.block(vec![])),
        ],
        Some(b.block(vec![])),
    )]);
    let root = fx.compile(function, &body);

    assert!(fx.messages().is_empty(), "{:?}", fx.messages());
    let mut counter = AssignCounter {
        matches: |value: &Expr| matches!(value.kind, ExprKind::Param(_)),
        count: 0,
    };
    counter.visit_block(&fx.program, root);
    assert_eq!(counter.count, 1);

    let statements = fx.statements(root);
    assert_eq!(statements.len(), 2);
    let Stmt::Branch { condition, else_block: Some(second), .. } = &statements[1] else {
        panic!("expected the range test, found {:?}", statements[1]);
    };
    assert!(matches!(condition.kind, ExprKind::Binary { op: BinaryOp::And, .. }));
    let Stmt::Branch { condition, else_block: Some(default), .. } = &fx.statements(*second)[0] else {
        panic!("expected the equality test");
    };
    assert!(matches!(condition.kind, ExprKind::Binary { op: BinaryOp::Eq, .. }));
    assert!(matches!(fx.statements(*default), [Stmt::Block(_)]));
}

#[test]
fn test_jump_diagnostics() {
    let mut fx = Fixture::new();
    let function = fx.function("jumps", &[], None);
    let b = &fx.syntax;
    let body = b.block(vec![
        b.break_stmt(None),
        b.continue_stmt(None),
        b.break_stmt(Some("outer")),
        b.while_loop(
            b.bool(true),
            b.block(vec![b.try_catch(
                b.block(vec![b.break_stmt(None)]),
                vec![],
                Some(b.block(vec![b.break_stmt(None)])),
            )]),
        ),
    ]);
    fx.compile(function, &body);

    expect_test::expect![[r#"
        [
            "`break` outside of a loop or named block",
            "`continue` outside of a loop",
            "no enclosing block named `outer`",
            "control cannot leave a finally-protected block",
        ]
    "#]]
    .assert_debug_eq(&fx.messages());
}

#[test]
fn test_labeled_block_break() {
    let mut fx = Fixture::new();
    let function = fx.function("labeled", &[], None);
    let b = &fx.syntax;
    let body = b.block(vec![b.block_stmt(b.labeled_block("done", vec![b.break_stmt(Some("done"))]))]);
    let root = fx.compile(function, &body);

    assert!(fx.messages().is_empty(), "{:?}", fx.messages());
    let named = fx.only_block(&fx.statements(root)[0]);
    assert!(matches!(
        fx.statements(named),
        [Stmt::Exit { block, kind: ExitKind::Break }] if *block == named
    ));
}

#[test]
fn test_return_value_checks() {
    let mut fx = Fixture::new();
    let int = fx.program.int_ty();
    let valued = fx.function("valued", &[], Some(int));
    let empty = fx.function("empty", &[], None);
    let b = &fx.syntax;
    let missing = b.block(vec![b.ret(None)]);
    let unexpected = b.block(vec![b.ret(Some(b.int(1)))]);
    fx.compile(valued, &missing);
    fx.compile(empty, &unexpected);

    assert_eq!(
        fx.messages(),
        [
            "function must return a value of type `int`",
            "function returns no value, but a value is returned",
        ]
    );
}

#[test]
fn test_assert_throws_in_debug_and_vanishes_in_release() {
    let mut fx = Fixture::new();
    let int = fx.program.int_ty();
    let debug = fx.function("checked", &[("x", int)], None);
    let release = fx.function("unchecked", &[("x", int)], None);
    let b = &fx.syntax;
    let body = b.block(vec![b.assert(b.binary(BinaryOp::Gt, b.name("x"), b.int(0)), None)]);

    let root = fx.compile(debug, &body);
    let failed = fx.guarded(&fx.statements(root)[0]);
    assert!(matches!(
        fx.statements(failed),
        [Stmt::Expr(_), Stmt::Expr(_), Stmt::Throw(_)]
    ));

    let options = LowerOptions {
        build_mode: BuildMode::Release,
        ..LowerOptions::default()
    };
    let root = fx.compile_with(release, &body, options);
    assert!(fx.statements(root).is_empty());
    assert!(fx.messages().is_empty(), "{:?}", fx.messages());
}

#[test]
fn test_ifdef_follows_build_mode() {
    let mut fx = Fixture::new();
    let function = fx.function("modes", &[], None);
    let b = &fx.syntax;
    let body = b.block(vec![b.ifdef(
        "release",
        b.block(vec![b.var("fast", Some(b.ty("int")), None)]),
        Some(b.block(vec![b.var("slow", Some(b.ty("int")), None)])),
    )]);
    let root = fx.compile(function, &body);

    let taken = fx.only_block(&fx.statements(root)[0]);
    let slow = fx.program.sym("slow");
    assert!(fx.program.blocks[taken].locals.contains_key(&slow));
}

#[test]
fn test_literal_if_keeps_only_the_taken_branch() {
    let mut fx = Fixture::new();
    let function = fx.function("fixed", &[], None);
    let b = &fx.syntax;
    let body = b.block(vec![b.if_else(
        vec![(b.bool(true), b.block(vec![b.var("a", None, Some(b.int(1)))]))],
        Some(b.block(vec![b.var("c", None, Some(b.int(2)))])),
    )]);
    let root = fx.compile(function, &body);

    let taken = fx.only_block(&fx.statements(root)[0]);
    let a = fx.program.sym("a");
    assert!(fx.program.blocks[taken].locals.contains_key(&a));
    assert_eq!(fx.statements(root).len(), 1);
}

#[test]
fn test_local_constant_folds_into_uses() {
    let mut fx = Fixture::new();
    let function = fx.function("consts", &[], None);
    let b = &fx.syntax;
    let body = b.block(vec![
        b.const_var("k", None, b.binary(BinaryOp::Mul, b.int(2), b.int(3))),
        b.var("y", None, Some(b.name("k"))),
    ]);
    let root = fx.compile(function, &body);

    assert!(fx.messages().is_empty(), "{:?}", fx.messages());
    let [Stmt::Expr(assign)] = fx.statements(root) else {
        panic!("expected a single assignment");
    };
    let ExprKind::Assign { value, .. } = &assign.kind else {
        panic!("expected an assignment");
    };
    assert_eq!(value.literal(), Some(&Value::Int(6)));
}

#[test]
fn test_variable_without_type_needs_a_typed_initializer() {
    let mut fx = Fixture::new();
    let function = fx.function("untyped", &[], None);
    let b = &fx.syntax;
    let body = b.block(vec![b.var("z", None, Some(b.null())), b.var("w", None, None)]);
    fx.compile(function, &body);

    assert_eq!(
        fx.messages(),
        [
            "variable `z` needs a type or an initializer",
            "variable `w` needs a type or an initializer",
        ]
    );
}

#[test]
fn test_throw_forms() {
    let mut fx = Fixture::new();
    let function = fx.function("raise", &[], None);
    let b = &fx.syntax;
    let body = b.block(vec![b.throw(b.int(5)), b.throw(b.string("oops"))]);
    let root = fx.compile(function, &body);

    assert!(matches!(fx.statements(root), [Stmt::ThrowNumeric(_)]));
    assert_eq!(fx.messages(), ["`string` cannot be thrown"]);
}

#[test]
fn test_foreach_over_array_aliases_the_element() {
    let mut fx = Fixture::new();
    let int = fx.program.int_ty();
    let array = fx.program.array_ty(int, 1);
    let function = fx.function("sum", &[("items", array)], None);
    let b = &fx.syntax;
    let body = b.block(vec![
        b.var("total", None, Some(b.int(0))),
        b.foreach(
            "item",
            b.name("items"),
            b.block(vec![b.expr_stmt(b.compound(BinaryOp::Add, b.name("total"), b.name("item")))]),
        ),
    ]);
    let root = fx.compile(function, &body);

    assert!(fx.messages().is_empty(), "{:?}", fx.messages());
    let wrapper = fx.only_block(&fx.statements(root)[1]);
    assert_eq!(fx.program.blocks[wrapper].locals.len(), 3);
    let item = fx.program.sym("item");
    let alias = fx
        .program
        .blocks
        .values()
        .find_map(|block| block.virtuals.get(&item))
        .expect("element alias");
    assert!(matches!(&alias.kind, ExprKind::ArrayElement { indices, .. } if indices.len() == 1));
}

#[test]
fn test_foreach_over_matrix_breaks_out_of_every_level() {
    let mut fx = Fixture::new();
    let int = fx.program.int_ty();
    let matrix = fx.program.array_ty(int, 2);
    let function = fx.function("scan", &[("grid", matrix)], None);
    let b = &fx.syntax;
    let body = b.block(vec![b.foreach("cell", b.name("grid"), b.block(vec![b.break_stmt(None)]))]);
    fx.compile(function, &body);

    assert!(fx.messages().is_empty(), "{:?}", fx.messages());
    let loops: Vec<_> = fx
        .program
        .blocks
        .iter()
        .filter(|(_, block)| block.is_loop)
        .map(|(id, _)| id)
        .collect();
    assert_eq!(loops.len(), 2);
    let (outer, inner) = (loops[0], loops[1]);
    assert_eq!(fx.program.blocks[inner].break_target, Some(outer));
    let exits = fx
        .program
        .blocks
        .values()
        .flat_map(|block| block.statements.iter())
        .filter(|stmt| matches!(stmt, Stmt::Exit { block, kind: ExitKind::Break } if *block == outer))
        .count();
    assert!(exits >= 1);
}

#[test]
fn test_foreach_over_integer_is_rejected() {
    let mut fx = Fixture::new();
    let int = fx.program.int_ty();
    let function = fx.function("bad", &[("n", int)], None);
    let b = &fx.syntax;
    let body = b.block(vec![b.foreach("x", b.name("n"), b.block(vec![b.expr_stmt(b.name("x"))]))]);
    fx.compile(function, &body);

    assert_eq!(fx.messages(), ["`int` cannot be iterated"]);
}

#[test]
fn test_capturing_closure_becomes_surrogate_method() {
    let mut fx = Fixture::new();
    let function = fx.function("outer", &[], None);
    let b = &fx.syntax;
    let body = b.block(vec![
        b.var("x", None, Some(b.int(1))),
        b.var(
            "read",
            None,
            Some(b.lambda(vec![], Some(b.ty("int")), b.block(vec![b.ret(Some(b.name("x")))]))),
        ),
    ]);
    let root = fx.compile(function, &body);

    assert!(fx.messages().is_empty(), "{:?}", fx.messages());
    let surrogate = fx.program.functions[function].surrogate.expect("surrogate");
    let x = fx.program.blocks[root].locals[&fx.program.sym("x")];
    assert_eq!(fx.program.classes[surrogate].captures, [x]);
    assert!(fx.program.variables[x].captured);
    assert_eq!(fx.program.class_name(surrogate), "outer$surrogate");

    let Stmt::Expr(assign) = &fx.statements(root)[1] else {
        panic!("expected the closure assignment");
    };
    let ExprKind::Assign { value, .. } = &assign.kind else {
        panic!("expected an assignment");
    };
    let ExprKind::BoundMethod { function: closure, .. } = value.kind else {
        panic!("expected a bound surrogate method, found {value:?}");
    };
    assert_eq!(fx.program.functions[closure].owner, Some(surrogate));
}

#[test]
fn test_non_capturing_closure_is_a_plain_function() {
    let mut fx = Fixture::new();
    let function = fx.function("outer", &[], None);
    let b = &fx.syntax;
    let body = b.block(vec![b.var(
        "one",
        None,
        Some(b.lambda(vec![], Some(b.ty("int")), b.block(vec![b.ret(Some(b.int(1)))]))),
    )]);
    let root = fx.compile(function, &body);

    assert!(fx.program.functions[function].surrogate.is_none());
    let Stmt::Expr(assign) = &fx.statements(root)[0] else {
        panic!("expected the closure assignment");
    };
    assert!(matches!(
        &assign.kind,
        ExprKind::Assign { value, .. } if matches!(value.kind, ExprKind::FunctionRef(_))
    ));
}

#[test]
fn test_nested_capture_chains_surrogates() {
    let mut fx = Fixture::new();
    let function = fx.function("outer", &[], None);
    let b = &fx.syntax;
    let innermost = b.lambda(vec![], Some(b.ty("int")), b.block(vec![b.ret(Some(b.name("x")))]));
    let middle = b.lambda(vec![], None, b.block(vec![b.var("get", None, Some(innermost))]));
    let body = b.block(vec![b.var("x", None, Some(b.int(1))), b.var("run", None, Some(middle))]);
    fx.compile(function, &body);

    assert!(fx.messages().is_empty(), "{:?}", fx.messages());
    let outer = fx.program.functions[function].surrogate.expect("outer surrogate");
    let chained: Vec<_> = fx
        .program
        .classes
        .values()
        .filter(|class| class.outer == Some(outer))
        .collect();
    assert_eq!(chained.len(), 1);

    struct FindCapture(Option<u32>);
    impl Visitor for FindCapture {
        fn visit_expr(&mut self, program: &Program, expr: &Expr) {
            if let ExprKind::Captured { hops, .. } = expr.kind {
                self.0 = Some(hops);
            }
            walk_expr(self, program, expr);
        }
    }
    let mut found = FindCapture(None);
    for (_, def) in fx.program.functions.iter() {
        if let (FunctionKind::Closure, Some(body)) = (def.kind, def.body) {
            found.visit_block(&fx.program, body);
        }
    }
    assert_eq!(found.0, Some(1));
}

#[test]
fn test_hidden_members_rejected_outside_their_class() {
    let mut fx = Fixture::new();
    let int = fx.program.int_ty();
    let vault = fx.class("Vault", None);
    fx.field(vault, "secret", int, Visibility::Private);
    fx.field(vault, "code", int, Visibility::Protected);
    fx.field(vault, "label", int, Visibility::Public);
    let vault_ty = fx.program.self_ty(vault);
    let function = fx.function("peek", &[("vault", vault_ty)], None);
    let b = &fx.syntax;
    let body = b.block(vec![
        b.var("secret", None, Some(b.member(b.name("vault"), "secret"))),
        b.var("code", None, Some(b.member(b.name("vault"), "code"))),
        b.var("label", None, Some(b.member(b.name("vault"), "label"))),
    ]);
    let root = fx.compile(function, &body);

    assert_eq!(
        fx.messages(),
        [
            "`secret` is private and cannot be accessed here",
            "`code` is protected and cannot be accessed here",
        ]
    );
    assert!(matches!(assigned(&fx.statements(root)[0]).kind, ExprKind::Field { .. }));
    assert_eq!(fx.local_ty(root, "label"), int);
}

#[test]
fn test_protected_members_visible_to_subclasses() {
    let mut fx = Fixture::new();
    let int = fx.program.int_ty();
    let vault = fx.class("Vault", None);
    fx.field(vault, "secret", int, Visibility::Private);
    fx.field(vault, "code", int, Visibility::Protected);
    let heir = fx.class("Heir", Some(vault));
    let open = fx.method(vault, "open");
    let inspect = fx.method(heir, "inspect");
    let b = &fx.syntax;
    let own = b.block(vec![
        b.var("mine", None, Some(b.member(b.this(), "secret"))),
        b.var("shared", None, Some(b.name("code"))),
    ]);
    let inherited = b.block(vec![
        b.var("qualified", None, Some(b.member(b.this(), "code"))),
        b.var("bare", None, Some(b.name("code"))),
        b.var("stolen", None, Some(b.member(b.this(), "secret"))),
    ]);
    fx.compile(open, &own);
    assert!(fx.messages().is_empty(), "{:?}", fx.messages());
    fx.compile(inspect, &inherited);

    assert_eq!(fx.messages(), ["`secret` is private and cannot be accessed here"]);
}

#[test]
fn test_explicit_numeric_casts_narrow() {
    let mut fx = Fixture::new();
    let int = fx.program.int_ty();
    let u8_ty = fx.program.primitive(PrimitiveKind::U8);
    let function = fx.function("narrow", &[("wide", int)], None);
    let b = &fx.syntax;
    let body = b.block(vec![
        b.var("small", None, Some(b.cast(b.ty("u8"), b.name("wide")))),
        b.var("folded", None, Some(b.cast(b.ty("u8"), b.int(300)))),
        b.var("implicit", Some(b.ty("u8")), Some(b.name("wide"))),
        b.var("absent", None, Some(b.cast(b.ty("int"), b.null()))),
    ]);
    let root = fx.compile(function, &body);

    assert_eq!(
        fx.messages(),
        ["type mismatch: expected `u8`, found `int`", "cannot cast `null` to `int`"]
    );
    let statements = fx.statements(root);
    let small = assigned(&statements[0]);
    assert_eq!(small.ty, u8_ty);
    assert!(matches!(small.kind, ExprKind::Cast { kind: CastKind::Numeric, .. }));
    assert!(matches!(assigned(&statements[1]).kind, ExprKind::Literal(Value::U8(44))));
}

#[test]
fn test_enum_casts_go_through_the_underlying_type() {
    let mut fx = Fixture::new();
    let int = fx.program.int_ty();
    let color = fx.class("Color", None);
    fx.program.classes[color].enum_of = Some(PrimitiveKind::Int);
    let color_ty = fx.program.self_ty(color);
    let function = fx.function("paint", &[("color", color_ty), ("index", int)], None);
    let b = &fx.syntax;
    let body = b.block(vec![
        b.var("raw", None, Some(b.cast(b.ty("int"), b.name("color")))),
        b.var("back", None, Some(b.cast(b.ty("Color"), b.name("index")))),
        b.var("fixed", None, Some(b.cast(b.ty("Color"), b.int(2)))),
        b.var("implicit", Some(b.ty("int")), Some(b.name("color"))),
    ]);
    let root = fx.compile(function, &body);

    assert_eq!(fx.messages(), ["type mismatch: expected `int`, found `Color`"]);
    let statements = fx.statements(root);
    let raw = assigned(&statements[0]);
    assert_eq!(raw.ty, int);
    assert!(matches!(raw.kind, ExprKind::Cast { kind: CastKind::EnumToUnderlying, .. }));
    let back = assigned(&statements[1]);
    assert_eq!(back.ty, color_ty);
    assert!(matches!(back.kind, ExprKind::Cast { kind: CastKind::UnderlyingToEnum, .. }));
    let fixed = assigned(&statements[2]);
    assert_eq!(fixed.ty, color_ty);
    assert!(matches!(fixed.kind, ExprKind::Literal(Value::Int(2))));
}

#[test]
fn test_reference_casts_and_type_checks() {
    let mut fx = Fixture::new();
    let int = fx.program.int_ty();
    let bool_ty = fx.program.bool_ty();
    let animal = fx.class("Animal", None);
    let dog = fx.class("Dog", Some(animal));
    fx.class("Rock", None);
    let (animal_ty, dog_ty) = (fx.program.self_ty(animal), fx.program.self_ty(dog));
    let function = fx.function("sort", &[("pet", animal_ty), ("puppy", dog_ty), ("count", int)], None);
    let b = &fx.syntax;
    let body = b.block(vec![
        b.var("down", None, Some(b.cast(b.ty("Dog"), b.name("pet")))),
        b.var("up", None, Some(b.cast(b.ty("Animal"), b.name("puppy")))),
        b.var("test", None, Some(b.is(b.name("pet"), b.ty("Dog")))),
        b.var("stone", None, Some(b.cast(b.ty("Rock"), b.name("pet")))),
        b.var("number", None, Some(b.is(b.name("count"), b.ty("Dog")))),
    ]);
    let root = fx.compile(function, &body);

    assert_eq!(
        fx.messages(),
        ["cannot cast `Animal` to `Rock`", "cannot cast `int` to `Dog`"]
    );
    let statements = fx.statements(root);
    let down = assigned(&statements[0]);
    assert_eq!(down.ty, dog_ty);
    assert!(matches!(down.kind, ExprKind::Cast { kind: CastKind::Downcast, .. }));
    let up = assigned(&statements[1]);
    assert_eq!(up.ty, animal_ty);
    assert!(matches!(up.kind, ExprKind::Cast { kind: CastKind::Upcast, .. }));
    let test = assigned(&statements[2]);
    assert_eq!(test.ty, bool_ty);
    assert!(matches!(&test.kind, ExprKind::TypeCheck { ty, .. } if *ty == dog_ty));
    assert!(assigned(&statements[4]).is_error());
}

#[test]
fn test_implicit_conversion_applies_once() {
    let mut fx = Fixture::new();
    let int = fx.program.int_ty();
    let double = fx.program.primitive(PrimitiveKind::Double);
    let animal = fx.class("Animal", None);
    let dog = fx.class("Dog", Some(animal));
    let (animal_ty, dog_ty) = (fx.program.self_ty(animal), fx.program.self_ty(dog));
    let function = fx.function("convert", &[("count", int), ("puppy", dog_ty)], None);
    let params = fx.program.functions[function].params.clone();
    let location = SourceLocation::builtin();
    {
        let reporter = Reporter::new(&mut fx.diagnostics, &fx.files, None);
        let mut ctx = LoweringContext::new(&mut fx.program, reporter, LowerOptions::default());
        let cases = [
            (params[0], int, double, CastKind::Numeric),
            (params[1], dog_ty, animal_ty, CastKind::Upcast),
        ];
        for (param, from, to, kind) in cases {
            let once = ctx.coerce(Expr::new(ExprKind::Param(param), from, location), to);
            assert!(matches!(once.kind, ExprKind::Cast { kind: applied, .. } if applied == kind));
            for again in [ctx.coerce(once.clone(), to), ctx.explicit_cast(once.clone(), to, location)] {
                assert_eq!(again.ty, to);
                let ExprKind::Cast { expr, .. } = &again.kind else {
                    panic!("conversion dropped: {again:?}");
                };
                assert!(matches!(expr.kind, ExprKind::Param(inner) if inner == param));
            }
        }
    }
    assert!(fx.messages().is_empty(), "{:?}", fx.messages());
}

#[test]
fn test_generic_calls_substitute_and_infer() {
    let mut fx = Fixture::new();
    let int = fx.program.int_ty();
    let double = fx.program.primitive(PrimitiveKind::Double);
    fx.generic_function("identity", Some("value"));
    fx.generic_function("make", None);
    let function = fx.function("run", &[], None);
    let b = &fx.syntax;
    let body = b.block(vec![
        b.var("inferred", None, Some(b.call(b.name("identity"), vec![b.int(3)]))),
        b.var(
            "explicit",
            None,
            Some(b.call_with(b.name("identity"), vec![b.ty("double")], vec![SyntaxBuilder::arg(b.int(3))])),
        ),
        b.var(
            "counted",
            None,
            Some(b.call_with(
                b.name("identity"),
                vec![b.ty("int"), b.ty("int")],
                vec![SyntaxBuilder::arg(b.int(3))],
            )),
        ),
        b.var("unbound", Some(b.ty("int")), Some(b.call(b.name("make"), vec![]))),
    ]);
    let root = fx.compile(function, &body);

    assert_eq!(
        fx.messages(),
        [
            "`identity` expects 1 generic argument(s), found 2",
            "cannot infer generic parameter `T` of `make`",
        ]
    );
    assert_eq!(fx.local_ty(root, "inferred"), int);
    assert_eq!(fx.local_ty(root, "explicit"), double);
    let statements = fx.statements(root);
    let ExprKind::Call { args, .. } = &assigned(&statements[1]).kind else {
        panic!("expected a call, found {:?}", statements[1]);
    };
    let [arg] = args.as_slice() else {
        panic!("expected one argument, found {args:?}");
    };
    assert!(matches!(&arg.kind, ExprKind::Literal(value) if *value == Value::Double(3.0)));
    assert!(assigned(&statements[2]).is_error());
    assert!(assigned(&statements[3]).is_error());
}

#[test]
fn test_named_catch_binds_the_caught_value_first() {
    let mut fx = Fixture::new();
    let exception = fx.program.prelude.exception;
    let exception_ty = fx.program.self_ty(exception);
    let function = fx.function("guard", &[], None);
    let b = &fx.syntax;
    let body = b.block(vec![b.try_catch(
        b.block(vec![b.throw(b.int(1))]),
        vec![b.catch_all(Some("failure"), b.block(vec![b.var("copy", None, Some(b.name("failure")))]))],
        None,
    )]);
    let root = fx.compile(function, &body);

    assert!(fx.messages().is_empty(), "{:?}", fx.messages());
    let Stmt::Try { handlers, .. } = &fx.statements(root)[0] else {
        panic!("expected a try, found {:?}", fx.statements(root));
    };
    let [handler] = handlers.as_slice() else {
        panic!("expected one handler, found {handlers:?}");
    };
    assert_eq!(handler.matcher, HandlerKind::All);
    let failure = fx.program.blocks[handler.body].locals[&fx.program.sym("failure")];
    assert_eq!(fx.program.variables[failure].ty, exception_ty);
    assert_eq!(fx.local_ty(handler.body, "copy"), exception_ty);
    let statements = fx.statements(handler.body);
    assert_eq!(statements.len(), 2);
    let Stmt::Expr(Expr {
        kind: ExprKind::Assign { target, value },
        ..
    }) = &statements[0]
    else {
        panic!("expected the binding, found {:?}", statements[0]);
    };
    assert!(matches!(target.kind, ExprKind::Local(local) if local == failure));
    assert!(matches!(value.kind, ExprKind::Caught));
}
