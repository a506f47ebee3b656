//! Anonymous functions capturing locals

use integration_tests::TestFixture;
use rk_it::{ExprKind, FunctionKind, Stmt};
use rk_syntax::{BinaryOp, SyntaxBuilder};

#[test]
fn test_capture_in_free_function_uses_surrogate_method() {
    let mut fixture = TestFixture::new();
    let b = fixture.add_file("closure.rk");
    let unit = b.unit(
        "App",
        vec![b.function(
            "F",
            vec![],
            Some(b.ty("int")),
            Some(b.block(vec![
                b.var("base", None, Some(b.int(40))),
                b.var(
                    "add",
                    None,
                    Some(b.lambda(
                        vec![b.param("n", b.ty("int"))],
                        Some(b.ty("int")),
                        b.block(vec![b.ret(Some(b.binary(BinaryOp::Add, b.name("base"), b.name("n"))))]),
                    )),
                ),
                b.ret(Some(b.call(b.name("add"), vec![b.int(2)]))),
            ])),
        )],
    );
    let compiled = fixture.compile(&[unit]).unwrap();

    assert!(compiled.messages().is_empty(), "{:?}", compiled.messages());
    let program = compiled.program();
    let function = compiled.function("App", &["F"]).unwrap();
    let surrogate = compiled.class("App", &["F$surrogate"]).unwrap();
    assert_eq!(program.functions[function].surrogate, Some(surrogate));
    assert_eq!(program.classes[surrogate].captures.len(), 1);

    let body = compiled.body("App", &["F"]).unwrap();
    let Stmt::Expr(assign) = &program.blocks[body].statements[1] else {
        panic!("expected the closure assignment");
    };
    let ExprKind::Assign { value, .. } = &assign.kind else {
        panic!("expected an assignment");
    };
    let ExprKind::BoundMethod { function: closure, .. } = value.kind else {
        panic!("expected a bound surrogate method, found {value:?}");
    };
    assert_eq!(program.functions[closure].kind, FunctionKind::Closure);
    assert_eq!(program.functions[closure].owner, Some(surrogate));
}

#[test]
fn test_capture_in_method_attaches_surrogate_to_class() {
    let mut fixture = TestFixture::new();
    let b = fixture.add_file("closure.rk");
    let tick = |b: &SyntaxBuilder| {
        b.function(
            "Tick",
            vec![],
            None,
            Some(b.block(vec![
                b.var("step", Some(b.ty("int")), Some(b.int(1))),
                b.var(
                    "apply",
                    None,
                    Some(b.lambda(vec![], None, b.block(vec![b.var("copy", None, Some(b.name("step")))]))),
                ),
            ])),
        )
    };
    let unit = b.unit(
        "App",
        vec![b.class(
            "Clock",
            vec![],
            vec![b.variable("count", Some(b.ty("int")), None), tick(&b)],
        )],
    );
    let compiled = fixture.compile(&[unit]).unwrap();

    assert!(compiled.messages().is_empty(), "{:?}", compiled.messages());
    let surrogate = compiled.class("App", &["Clock", "Tick$surrogate"]).unwrap();
    assert!(compiled.program().classes[surrogate].is_surrogate());
    assert!(compiled.class("App", &["Tick$surrogate"]).is_none());
}

#[test]
fn test_closure_without_captures_stays_free() {
    let mut fixture = TestFixture::new();
    let b = fixture.add_file("closure.rk");
    let unit = b.unit(
        "App",
        vec![b.function(
            "G",
            vec![],
            None,
            Some(b.block(vec![b.var(
                "twice",
                None,
                Some(b.lambda(
                    vec![b.param("n", b.ty("int"))],
                    Some(b.ty("int")),
                    b.block(vec![b.ret(Some(b.binary(BinaryOp::Mul, b.name("n"), b.int(2))))]),
                )),
            )])),
        )],
    );
    let compiled = fixture.compile(&[unit]).unwrap();

    assert!(compiled.messages().is_empty(), "{:?}", compiled.messages());
    assert!(compiled.class("App", &["G$surrogate"]).is_none());
    let function = compiled.function("App", &["G"]).unwrap();
    assert!(compiled.program().functions[function].surrogate.is_none());
}
