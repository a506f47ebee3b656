//! Class hierarchy scenarios across the full pipeline

use expect_test::expect;
use integration_tests::{TestFixture, hierarchy_is_acyclic};

#[test]
fn test_two_class_cycle_is_reported_once_and_cut() {
    let mut fixture = TestFixture::new();
    let b = fixture.add_file("cycle.rk");
    let unit = b.unit(
        "App",
        vec![
            b.class("A", vec![b.ty("B")], vec![b.function("Touch", vec![], None, Some(b.block(vec![])))]),
            b.class("B", vec![b.ty("A")], vec![]),
        ],
    );
    let compiled = fixture.compile(&[unit]).unwrap();

    expect![[r#"
        [
            "circular inheritance: A -> B -> A",
        ]
    "#]]
    .assert_debug_eq(&compiled.messages());
    let program = compiled.program();
    let a = compiled.class("App", &["A"]).unwrap();
    assert_eq!(program.superclass(a), Some(program.prelude.object));
    assert!(hierarchy_is_acyclic(program, program.classes.len()));
}

#[test]
fn test_cycle_spanning_units_is_reported_once() {
    let mut fixture = TestFixture::new();
    let first = fixture.add_file("first.rk");
    let one = first.unit("One", vec![first.class("Left", vec![first.unit_ty("Two", "Right")], vec![])]);
    let second = fixture.add_file("second.rk");
    let two = second.unit("Two", vec![second.class("Right", vec![second.unit_ty("One", "Left")], vec![])]);
    let compiled = fixture.compile(&[one, two]).unwrap();

    // The cycle only closes once unit Two wires `Right`, so Two reports it.
    assert_eq!(compiled.messages(), ["circular inheritance: Right -> Left -> Right"]);
    assert_eq!(compiled.diagnostics.iter().next().unwrap().file, "second.rk");
    let program = compiled.program();
    let right = compiled.class("Two", &["Right"]).unwrap();
    assert_eq!(program.superclass(right), Some(program.prelude.object));
    assert!(hierarchy_is_acyclic(program, program.classes.len()));
}

#[test]
fn test_cycle_reached_through_a_descendant_in_another_unit() {
    let mut fixture = TestFixture::new();
    let first = fixture.add_file("first.rk");
    let one = first.unit("One", vec![first.class("Y", vec![first.unit_ty("Two", "Z")], vec![])]);
    let second = fixture.add_file("second.rk");
    let two = second.unit(
        "Two",
        vec![
            second.class("D", vec![second.unit_ty("One", "Y")], vec![]),
            second.class("Z", vec![second.unit_ty("One", "Y")], vec![]),
        ],
    );
    let compiled = fixture.compile(&[one, two]).unwrap();

    assert_eq!(compiled.messages(), ["circular inheritance: Z -> Y -> Z"]);
    let program = compiled.program();
    let z = compiled.class("Two", &["Z"]).unwrap();
    assert_eq!(program.superclass(z), Some(program.prelude.object));
    assert!(hierarchy_is_acyclic(program, program.classes.len()));
}

#[test]
fn test_long_cycle_with_descendants() {
    let mut fixture = TestFixture::new();
    let b = fixture.add_file("ring.rk");
    let unit = b.unit(
        "App",
        vec![
            b.class("Leaf", vec![b.ty("Ring1")], vec![]),
            b.class("Ring1", vec![b.ty("Ring2")], vec![]),
            b.class("Ring2", vec![b.ty("Ring3")], vec![]),
            b.class("Ring3", vec![b.ty("Ring1")], vec![]),
            b.class("Fine", vec![], vec![]),
        ],
    );
    let compiled = fixture.compile(&[unit]).unwrap();

    assert_eq!(compiled.diagnostics.count_containing("circular inheritance"), 1);
    let program = compiled.program();
    assert!(hierarchy_is_acyclic(program, program.classes.len()));
    let leaf = compiled.class("App", &["Leaf"]).unwrap();
    assert_eq!(program.superclass_chain(leaf).last(), Some(&program.prelude.object));
}

#[test]
fn test_missing_interface_function() {
    let mut fixture = TestFixture::new();
    let b = fixture.add_file("shapes.rk");
    let unit = b.unit(
        "App",
        vec![
            b.interface("IShape", vec![], vec![b.function("M", vec![], None, None)]),
            b.class("Square", vec![b.ty("IShape")], vec![]),
            b.class(
                "Circle",
                vec![b.ty("IShape")],
                vec![b.function("M", vec![], None, Some(b.block(vec![])))],
            ),
        ],
    );
    let compiled = fixture.compile(&[unit]).unwrap();

    expect![[r#"
        [
            "class `Square` does not implement `M` of interface `IShape` (missing implementation)",
        ]
    "#]]
    .assert_debug_eq(&compiled.messages());
}

#[test]
fn test_implementation_inherited_from_superclass() {
    let mut fixture = TestFixture::new();
    let b = fixture.add_file("shapes.rk");
    let unit = b.unit(
        "App",
        vec![
            b.interface("IShape", vec![], vec![b.function("Area", vec![], Some(b.ty("int")), None)]),
            b.class(
                "Base",
                vec![],
                vec![b.function("Area", vec![], Some(b.ty("int")), Some(b.block(vec![b.ret(Some(b.int(0)))])))],
            ),
            b.class("Derived", vec![b.ty("Base"), b.ty("IShape")], vec![]),
        ],
    );
    let compiled = fixture.compile(&[unit]).unwrap();

    assert!(compiled.messages().is_empty(), "{:?}", compiled.messages());
    let derived = compiled.class("App", &["Derived"]).unwrap();
    assert_eq!(compiled.program().classes[derived].interfaces.len(), 1);
}
