//! Enum members and lazily resolved constants

use expect_test::expect;
use integration_tests::{Compiled, TestFixture};
use rk_it::{Entity, Value};
use rk_syntax::BinaryOp;

fn value_of(compiled: &Compiled, unit: &str, path: &[&str]) -> Option<Value> {
    match compiled.output.lookup(unit, path)? {
        Entity::Constant(constant) => compiled.program().constants[constant].value().cloned(),
        _ => None,
    }
}

#[test]
fn test_enum_members_default_to_previous_plus_one() {
    let mut fixture = TestFixture::new();
    let b = fixture.add_file("enums.rk");
    let unit = b.unit(
        "App",
        vec![b.enumeration(
            "Priority",
            Some(b.ty("u8")),
            vec![
                ("Low", None),
                ("Normal", None),
                ("High", Some(b.int(8))),
                ("Urgent", None),
                ("Critical", Some(b.scoped("Priority#Urgent"))),
            ],
        )],
    );
    let compiled = fixture.compile(&[unit]).unwrap();

    assert!(compiled.messages().is_empty(), "{:?}", compiled.messages());
    let values: Vec<Option<Value>> = ["Low", "Normal", "High", "Urgent"]
        .iter()
        .map(|member| value_of(&compiled, "App", &["Priority", member]))
        .collect();
    assert_eq!(
        values,
        vec![Some(Value::U8(0)), Some(Value::U8(1)), Some(Value::U8(8)), Some(Value::U8(9))]
    );
    assert_eq!(value_of(&compiled, "App", &["Priority", "Critical"]), Some(Value::U8(9)));
}

#[test]
fn test_constants_resolve_out_of_order() {
    let mut fixture = TestFixture::new();
    let b = fixture.add_file("constants.rk");
    let unit = b.unit(
        "App",
        vec![
            b.constant("Area", None, b.binary(BinaryOp::Mul, b.name("Width"), b.name("Height"))),
            b.constant("Width", Some(b.ty("int")), b.int(6)),
            b.constant("Height", Some(b.ty("int")), b.binary(BinaryOp::Add, b.name("Width"), b.int(1))),
        ],
    );
    let compiled = fixture.compile(&[unit]).unwrap();

    assert!(compiled.messages().is_empty(), "{:?}", compiled.messages());
    assert_eq!(value_of(&compiled, "App", &["Area"]), Some(Value::Int(42)));
}

#[test]
fn test_circular_constant_reported_once() {
    let mut fixture = TestFixture::new();
    let b = fixture.add_file("constants.rk");
    let unit = b.unit(
        "App",
        vec![
            b.constant("Ping", None, b.binary(BinaryOp::Add, b.name("Pong"), b.int(1))),
            b.constant("Pong", None, b.binary(BinaryOp::Add, b.name("Ping"), b.int(1))),
            b.function(
                "read",
                vec![],
                Some(b.ty("int")),
                Some(b.block(vec![b.ret(Some(b.name("Ping")))])),
            ),
        ],
    );
    let compiled = fixture.compile(&[unit]).unwrap();

    assert_eq!(compiled.diagnostics.count_containing("circular constant"), 1);
    assert_eq!(value_of(&compiled, "App", &["Ping"]), None);
    assert_eq!(value_of(&compiled, "App", &["Pong"]), None);
}

#[test]
fn test_default_integer_overflow_in_constant() {
    let mut fixture = TestFixture::new();
    let b = fixture.add_file("constants.rk");
    let unit = b.unit(
        "App",
        vec![b.constant(
            "TooBig",
            None,
            b.binary(BinaryOp::Add, b.int(9_223_372_036_854_775_807), b.int(1)),
        )],
    );
    let compiled = fixture.compile(&[unit]).unwrap();

    expect![[r#"
        [
            "arithmetic overflow in constant expression",
        ]
    "#]]
    .assert_debug_eq(&compiled.messages());
}
