use crate::{Collector, Pass, UnitCollector};
use expect_test::expect;
use rk_intern::Interner;
use rk_it::{BodyStats, ConstantState, Diagnostics, Entity, Program, Reporter, TyKind, Value};
use rk_lower::{LowerOptions, LoweringContext};
use rk_span::SourceFiles;
use rk_syntax::{CompilationUnit, Declaration, DeclarationKind, SyntaxBuilder, Visibility};

struct Fixture {
    interner: Interner,
    files: SourceFiles,
    syntax: SyntaxBuilder,
}

struct Collected {
    program: Program,
    diagnostics: Diagnostics,
}

impl Fixture {
    fn new() -> Self {
        let interner = Interner::new();
        let mut files = SourceFiles::new();
        let file = files.add("shapes.rk");
        Self {
            syntax: SyntaxBuilder::new(&interner, file),
            interner,
            files,
        }
    }

    fn unit(&self, declarations: Vec<Declaration>) -> CompilationUnit {
        self.syntax.unit("Main", declarations)
    }

    fn collect(&self, units: &[CompilationUnit]) -> Collected {
        let mut program = Program::new(&self.interner);
        let mut diagnostics = Diagnostics::new();
        let host = Collector::new();
        {
            let reporter = Reporter::new(&mut diagnostics, &self.files, None);
            let mut ctx = LoweringContext::new(&mut program, reporter, LowerOptions::default()).with_host(&host);
            let mut collectors: Vec<UnitCollector<'_>> = units
                .iter()
                .map(|unit| UnitCollector::for_unit(ctx.program, unit))
                .collect();
            for pass in Pass::ALL {
                for collector in &mut collectors {
                    collector.run(pass, &mut ctx).expect("no internal error");
                }
            }
        }
        Collected { program, diagnostics }
    }
}

impl Collected {
    fn messages(&self) -> String {
        self.diagnostics.messages().join("\n")
    }

    fn entity(&self, path: &[&str]) -> Entity {
        let (first, rest) = path.split_first().expect("non-empty path");
        let unit = self.program.units[&self.program.sym("Main")];
        let mut entity = self
            .program
            .lookup_in(unit, self.program.sym(first))
            .expect("unit-level entity");
        for segment in rest {
            let Entity::Class(class) = entity else {
                panic!("`{segment}` looked up in a non-class");
            };
            let scope = self.program.classes[class].scope;
            entity = self
                .program
                .lookup_in(scope, self.program.sym(segment))
                .expect("member entity");
        }
        entity
    }

    fn class(&self, name: &str) -> rk_it::ClassId {
        match self.entity(&[name]) {
            Entity::Class(class) => class,
            other => panic!("`{name}` is {other:?}"),
        }
    }

    fn function(&self, path: &[&str]) -> rk_it::FunctionId {
        match self.entity(path) {
            Entity::Function(function) => function,
            other => panic!("{path:?} is {other:?}"),
        }
    }
}

fn abstract_function(declaration: Declaration) -> Declaration {
    let mut declaration = declaration;
    if let DeclarationKind::Function(function) = &mut declaration.kind {
        function.is_abstract = true;
    }
    declaration
}

fn as_interface(declaration: Declaration) -> Declaration {
    let mut declaration = declaration;
    if let DeclarationKind::Class(class) = &mut declaration.kind {
        class.is_interface = true;
    }
    declaration
}

fn abstract_class(declaration: Declaration) -> Declaration {
    let mut declaration = declaration;
    if let DeclarationKind::Class(class) = &mut declaration.kind {
        class.is_abstract = true;
    }
    declaration
}

fn sealed(declaration: Declaration) -> Declaration {
    let mut declaration = declaration;
    if let DeclarationKind::Class(class) = &mut declaration.kind {
        class.is_sealed = true;
    }
    declaration
}

#[test]
fn test_circular_inheritance_is_cut_at_first_class() {
    let fx = Fixture::new();
    let b = &fx.syntax;
    let unit = fx.unit(vec![
        b.class("A", vec![b.ty("B")], vec![]),
        b.class("B", vec![b.ty("A")], vec![]),
    ]);
    let out = fx.collect(&[unit]);

    expect![[r#"circular inheritance: A -> B -> A"#]].assert_eq(&out.messages());
    let (a, b) = (out.class("A"), out.class("B"));
    let object = out.program.prelude.object;
    assert_eq!(out.program.superclass(a), Some(object));
    assert_eq!(out.program.superclass_chain(b), vec![b, a, object]);
}

#[test]
fn test_base_type_errors() {
    let fx = Fixture::new();
    let b = &fx.syntax;
    let unit = fx.unit(vec![
        sealed(b.class("Final", vec![], vec![])),
        b.class("Derived", vec![b.ty("Final")], vec![]),
        b.class("Left", vec![], vec![]),
        b.class("Right", vec![], vec![]),
        b.class("Both", vec![b.ty("Left"), b.ty("Right")], vec![]),
        b.interface("IJoined", vec![b.ty("IPlain")], vec![]),
        b.interface("IPlain", vec![], vec![]),
        b.class("Loop", vec![b.ty("Loop")], vec![]),
        b.enumeration("Color", None, vec![("Red", None)]),
        b.class("Tinted", vec![b.ty("Color")], vec![]),
    ]);
    let out = fx.collect(&[unit]);

    expect![[r#"
        class `Derived` cannot inherit from sealed class `Final`
        class `Both` inherits from more than one class (multiple inheritance)
        interface `IJoined` cannot declare base types
        class `Loop` cannot inherit from itself
        `Color` is not a class or interface"#]]
    .assert_eq(&out.messages());
    let both = out.class("Both");
    assert_eq!(out.program.superclass(both), Some(out.class("Left")));
    let derived = out.class("Derived");
    assert_eq!(out.program.superclass(derived), Some(out.program.prelude.object));
    assert_eq!(out.program.classes[out.class("IJoined")].superclass, None);
}

#[test]
fn test_missing_interface_member() {
    let fx = Fixture::new();
    let b = &fx.syntax;
    let unit = fx.unit(vec![
        b.interface(
            "IDrawable",
            vec![],
            vec![
                b.function("Draw", vec![], None, None),
                b.property("Layer", b.ty("int"), Some(None), None),
            ],
        ),
        b.class(
            "Widget",
            vec![b.ty("IDrawable")],
            vec![b.property("Layer", b.ty("int"), Some(Some(b.block(vec![b.ret(Some(b.int(1)))]))), None)],
        ),
    ]);
    let out = fx.collect(&[unit]);

    expect![[r#"class `Widget` does not implement `Draw` of interface `IDrawable` (missing implementation)"#]]
        .assert_eq(&out.messages());
}

#[test]
fn test_interface_of_abstract_base_checked_in_concrete_subclass() {
    let fx = Fixture::new();
    let b = &fx.syntax;
    let unit = fx.unit(vec![
        b.interface("IShape", vec![], vec![b.function("M", vec![], None, None)]),
        abstract_class(b.class("Base", vec![b.ty("IShape")], vec![])),
        abstract_class(b.class("Middle", vec![b.ty("Base")], vec![])),
        b.class("Derived", vec![b.ty("Middle")], vec![]),
        b.class(
            "Drawn",
            vec![b.ty("Base")],
            vec![b.function("M", vec![], None, Some(b.block(vec![])))],
        ),
        b.class("Leaf", vec![b.ty("Drawn")], vec![]),
    ]);
    let out = fx.collect(&[unit]);

    expect![[r#"class `Derived` does not implement `M` of interface `IShape` (missing implementation)"#]]
        .assert_eq(&out.messages());
}

#[test]
fn test_generic_interface_implemented_through_superclass() {
    let fx = Fixture::new();
    let b = &fx.syntax;
    let unit = fx.unit(vec![
        b.generic_class(
            "Box",
            &["T"],
            vec![],
            vec![b.function("Put", vec![b.param("item", b.ty("T"))], None, Some(b.block(vec![])))],
        ),
        as_interface(b.generic_class(
            "ISink",
            &["E"],
            vec![],
            vec![b.function("Put", vec![b.param("item", b.ty("E"))], None, None)],
        )),
        b.class(
            "Names",
            vec![b.generic_ty("Box", vec![b.ty("string")]), b.generic_ty("ISink", vec![b.ty("string")])],
            vec![],
        ),
        b.class(
            "Numbers",
            vec![b.generic_ty("Box", vec![b.ty("string")]), b.generic_ty("ISink", vec![b.ty("int")])],
            vec![],
        ),
    ]);
    let out = fx.collect(&[unit]);

    expect![[r#"class `Numbers` does not implement `Put` of interface `ISink` (missing implementation)"#]]
        .assert_eq(&out.messages());
}

#[test]
fn test_override_rules() {
    let fx = Fixture::new();
    let b = &fx.syntax;
    let empty = || b.block(vec![]);
    let unit = fx.unit(vec![
        b.class(
            "Base",
            vec![],
            vec![
                b.function("Draw", vec![], None, Some(empty())),
                b.function("Size", vec![], Some(b.ty("int")), Some(b.block(vec![b.ret(Some(b.int(1)))]))),
                b.variable("Count", Some(b.ty("int")), None),
                SyntaxBuilder::with_visibility(b.function("Hook", vec![], None, Some(empty())), Visibility::Protected),
                b.function("Reset", vec![], None, Some(empty())),
            ],
        ),
        b.class(
            "Derived",
            vec![b.ty("Base")],
            vec![
                b.override_function("Draw", vec![b.param("scale", b.ty("int"))], None, Some(empty())),
                b.function("Size", vec![], Some(b.ty("int")), Some(b.block(vec![b.ret(Some(b.int(2)))]))),
                b.override_function("Missing", vec![], None, Some(empty())),
                b.variable("Count", Some(b.ty("int")), None),
                SyntaxBuilder::with_visibility(b.override_function("Hook", vec![], None, Some(empty())), Visibility::Private),
                b.override_function("Reset", vec![], None, Some(empty())),
            ],
        ),
    ]);
    let out = fx.collect(&[unit]);

    expect![[r#"
        `Derived.Count` conflicts with an inherited member of the same name
        `Derived.Draw` does not match the signature of the member it overrides
        `Derived.Size` conflicts with an inherited member of the same name
        `Derived.Missing` is marked override but overrides nothing
        `Derived.Hook` narrows the accessibility of the member it overrides"#]]
    .assert_eq(&out.messages());
}

#[test]
fn test_generic_override_is_compared_through_the_subclass() {
    let fx = Fixture::new();
    let b = &fx.syntax;
    let add = |ty: &str| b.override_function("Add", vec![b.param("item", b.ty(ty))], None, Some(b.block(vec![])));
    let unit = fx.unit(vec![
        b.generic_class(
            "List",
            &["T"],
            vec![],
            vec![b.function("Add", vec![b.param("item", b.ty("T"))], None, Some(b.block(vec![])))],
        ),
        b.class("Words", vec![b.generic_ty("List", vec![b.ty("string")])], vec![add("string")]),
        b.class("Counts", vec![b.generic_ty("List", vec![b.ty("int")])], vec![add("string")]),
    ]);
    let out = fx.collect(&[unit]);

    expect![[r#"`Counts.Add` does not match the signature of the member it overrides"#]].assert_eq(&out.messages());
}

#[test]
fn test_enum_members_count_up_from_previous() {
    let fx = Fixture::new();
    let b = &fx.syntax;
    let unit = fx.unit(vec![
        b.enumeration(
            "Color",
            None,
            vec![("Red", None), ("Green", None), ("Blue", Some(b.int(10))), ("Violet", None)],
        ),
        b.enumeration("Mode", Some(b.ty("string")), vec![("On", None)]),
    ]);
    let out = fx.collect(&[unit]);

    expect![[r#"`string` is not a valid enum underlying type"#]].assert_eq(&out.messages());
    let values: Vec<Option<Value>> = ["Red", "Green", "Blue", "Violet"]
        .iter()
        .map(|member| match out.entity(&["Color", member]) {
            Entity::Constant(constant) => out.program.constants[constant].value().cloned(),
            other => panic!("{member} is {other:?}"),
        })
        .collect();
    assert_eq!(
        values,
        vec![Some(Value::Int(0)), Some(Value::Int(1)), Some(Value::Int(10)), Some(Value::Int(11))]
    );
    let color = out.class("Color");
    let Entity::Constant(red) = out.entity(&["Color", "Red"]) else {
        panic!("Red is a constant");
    };
    assert!(matches!(out.program.ty(out.program.constants[red].ty), TyKind::Class(class) if *class == color));
}

#[test]
fn test_circular_constants_reported_once() {
    let fx = Fixture::new();
    let b = &fx.syntax;
    let unit = fx.unit(vec![
        b.constant("First", None, b.name("Second")),
        b.constant("Second", None, b.name("First")),
        b.constant("Third", Some(b.ty("int")), b.binary(rk_syntax::BinaryOp::Mul, b.int(6), b.int(7))),
    ]);
    let out = fx.collect(&[unit]);

    expect![[r#"circular constant reference involving `First`"#]].assert_eq(&out.messages());
    for name in ["First", "Second"] {
        let Entity::Constant(constant) = out.entity(&[name]) else {
            panic!("{name} is a constant");
        };
        assert!(matches!(out.program.constants[constant].state, ConstantState::Failed));
    }
    let Entity::Constant(third) = out.entity(&["Third"]) else {
        panic!("Third is a constant");
    };
    assert_eq!(out.program.constants[third].value(), Some(&Value::Int(42)));
}

#[test]
fn test_special_functions_and_reserved_names() {
    let fx = Fixture::new();
    let b = &fx.syntax;
    let unit = fx.unit(vec![
        b.class(
            "Widget",
            vec![],
            vec![
                b.function("constructor", vec![b.param("size", b.ty("int"))], None, Some(b.block(vec![]))),
                b.function("destructor", vec![], None, Some(b.block(vec![]))),
            ],
        ),
        b.function("destructor", vec![], None, Some(b.block(vec![]))),
    ]);
    let out = fx.collect(&[unit]);

    expect![[r#"
        `destructor` is reserved for constructors and destructors
        `constructor` must not declare parameters, generic parameters or a return type"#]]
    .assert_eq(&out.messages());
    let widget = out.class("Widget");
    let constructor = out.program.classes[widget].methods[&out.program.sym("constructor")];
    assert_eq!(out.program.functions[constructor].kind, rk_it::FunctionKind::Constructor);
}

#[test]
fn test_missing_bodies() {
    let fx = Fixture::new();
    let b = &fx.syntax;
    let unit = fx.unit(vec![
        b.class(
            "Shape",
            vec![],
            vec![abstract_function(b.function("Area", vec![], Some(b.ty("int")), None))],
        ),
        b.function("orphan", vec![], Some(b.ty("int")), None),
    ]);
    let out = fx.collect(&[unit]);

    expect![[r#"
        `orphan` must have a body
        abstract member `Area` in non-abstract class `Shape`"#]]
    .assert_eq(&out.messages());
}

#[test]
fn test_foreach_over_iterator_class() {
    let fx = Fixture::new();
    let b = &fx.syntax;
    let unit = fx.unit(vec![
        b.class(
            "Countdown",
            vec![b.generic_ty("Iterator", vec![b.ty("int")])],
            vec![
                b.variable("left", Some(b.ty("int")), None),
                b.function(
                    "MoveNext",
                    vec![],
                    Some(b.ty("bool")),
                    Some(b.block(vec![b.ret(Some(b.binary(rk_syntax::BinaryOp::Gt, b.name("left"), b.int(0))))])),
                ),
                b.property("Current", b.ty("int"), Some(Some(b.block(vec![b.ret(Some(b.name("left")))]))), None),
            ],
        ),
        b.class(
            "Timer",
            vec![],
            vec![b.function(
                "GetIterator",
                vec![],
                Some(b.ty("Countdown")),
                Some(b.block(vec![b.ret(Some(b.new_object(b.ty("Countdown"), vec![])))])),
            )],
        ),
        b.function(
            "total",
            vec![b.param("timer", b.ty("Timer"))],
            Some(b.ty("int")),
            Some(b.block(vec![
                b.var("sum", None, Some(b.int(0))),
                b.foreach(
                    "tick",
                    b.name("timer"),
                    b.block(vec![b.expr_stmt(b.compound(rk_syntax::BinaryOp::Add, b.name("sum"), b.name("tick")))]),
                ),
                b.ret(Some(b.name("sum"))),
            ])),
        ),
    ]);
    let out = fx.collect(&[unit]);

    assert!(out.diagnostics.is_empty(), "{}", out.messages());
    let total = out.function(&["total"]);
    let body = out.program.functions[total].body.expect("compiled");
    let stats = BodyStats::of_block(&out.program, body);
    assert!(stats.loops >= 1);
    assert_eq!(stats.error_expressions, 0);
}

#[test]
fn test_nested_declarations_are_hoisted() {
    let fx = Fixture::new();
    let b = &fx.syntax;
    let unit = fx.unit(vec![b.function(
        "outer",
        vec![],
        Some(b.ty("int")),
        Some(b.block(vec![
            b.decl_stmt(b.function("inner", vec![], Some(b.ty("int")), Some(b.block(vec![b.ret(Some(b.int(2)))])))),
            b.decl_stmt(b.enumeration("Level", None, vec![("Low", None), ("High", None)])),
            b.ret(Some(b.call(b.name("inner"), vec![]))),
        ])),
    )]);
    let out = fx.collect(&[unit]);

    assert!(out.diagnostics.is_empty(), "{}", out.messages());
    let inner = out
        .program
        .functions
        .iter()
        .find(|(_, def)| out.program.name(def.name) == "inner")
        .map(|(id, _)| id)
        .expect("inner function collected");
    assert!(out.program.functions[inner].body.is_some());
    let outer = out.function(&["outer"]);
    let outer_root = out.program.functions[outer].body.expect("compiled");
    assert_eq!(BodyStats::of_block(&out.program, outer_root).error_expressions, 0);
}

#[test]
fn test_globals_take_initializer_types() {
    let fx = Fixture::new();
    let b = &fx.syntax;
    let unit = fx.unit(vec![
        b.variable("limit", None, Some(b.int(10))),
        b.variable("nothing", None, None),
        b.function("get", vec![], Some(b.ty("int")), Some(b.block(vec![b.ret(Some(b.name("limit")))]))),
    ]);
    let out = fx.collect(&[unit]);

    expect![[r#"variable `nothing` needs a type or an initializer"#]].assert_eq(&out.messages());
    let Entity::Variable(limit) = out.entity(&["limit"]) else {
        panic!("limit is a variable");
    };
    let int = out.program.types.get(out.program.variables[limit].ty).clone();
    assert_eq!(int, TyKind::Primitive(rk_it::PrimitiveKind::Int));
    assert!(out.program.variables[limit].initializer.is_some());
}
