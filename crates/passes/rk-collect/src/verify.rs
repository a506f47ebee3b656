//! Hierarchy verification
//!
//! Every concrete class must implement the members of the interfaces it
//! names and of those named by its abstract ancestors, and every member must agree with the superclass member of the same
//! name: `override` members need a base member with an equal signature and
//! no narrower visibility, other members may not reuse an inherited name.
//! Signatures are compared as function types after viewing both sides through
//! the class being checked, so `class IntList : List<int>` overriding
//! `Add(T)` must declare `Add(int)`.

use crate::unit::UnitCollector;
use rk_intern::Symbol;
use rk_it::{ClassId, FunctionId, Program, PropertyId, SemanticError, TyId, TyKind, Visibility};
use rk_lower::{LoweringContext, Member, MemberKind, declared_member};
use rk_span::SourceLocation;
use rk_subst::{Substitution, member_view};

impl UnitCollector<'_> {
    pub(crate) fn verify_hierarchy(&self, ctx: &mut LoweringContext<'_>) {
        for pending in &self.classes {
            let def = &ctx.program.classes[pending.class];
            if def.is_interface() || def.is_enum() {
                continue;
            }
            let is_abstract = def.is_abstract;
            verify_overrides(ctx, pending.class);
            if !is_abstract {
                verify_interfaces(ctx, pending.class);
            }
        }
    }
}

/// Interfaces `class` must satisfy itself
///
/// A concrete ancestor verifies its own interfaces, so the walk up the
/// superclass chain stops at the first one.
fn required_interfaces(program: &Program, class: ClassId) -> Vec<ClassId> {
    let mut interfaces: Vec<ClassId> = Vec::new();
    for (depth, owner) in program.superclass_chain(class).into_iter().enumerate() {
        let def = &program.classes[owner];
        if depth > 0 && !def.is_abstract {
            break;
        }
        for interface in def.interfaces.iter().filter_map(|&ty| program.class_of(ty)) {
            if !interfaces.contains(&interface) {
                interfaces.push(interface);
            }
        }
    }
    interfaces
}

fn verify_interfaces(ctx: &mut LoweringContext<'_>, class: ClassId) {
    let location = ctx.program.classes[class].location;
    let interfaces = required_interfaces(ctx.program, class);
    for interface in interfaces {
        let def = &ctx.program.classes[interface];
        let methods: Vec<FunctionId> = def.methods.values().copied().collect();
        let properties: Vec<PropertyId> = def.properties.values().copied().collect();

        let mut missing: Vec<Symbol> = Vec::new();
        for required in methods {
            if !implements_method(ctx.program, class, required) {
                missing.push(ctx.program.functions[required].name);
            }
        }
        for required in properties {
            if !implements_property(ctx.program, class, required) {
                missing.push(ctx.program.properties[required].name);
            }
        }
        for member in missing {
            let error = SemanticError::MissingImplementation {
                class: ctx.program.class_name(class),
                member: ctx.program.name(member),
                interface: ctx.program.class_name(interface),
            };
            ctx.error(location, error);
        }
    }
}

/// First member named `name` in `class` or its superclasses
fn find_in_chain(program: &Program, class: ClassId, name: Symbol) -> Option<Member> {
    program.superclass_chain(class).into_iter().find_map(|owner| {
        declared_member(program, owner, name).map(|kind| Member { kind, owner })
    })
}

fn implements_method(program: &mut Program, class: ClassId, required: FunctionId) -> bool {
    let name = program.functions[required].name;
    match find_in_chain(program, class, name) {
        Some(Member {
            kind: MemberKind::Method(candidate),
            ..
        }) => {
            let def = &program.functions[candidate];
            let usable = def.visibility == Visibility::Public && !def.is_abstract;
            usable && same_signature(program, class, required, candidate)
        }
        _ => false,
    }
}

fn implements_property(program: &mut Program, class: ClassId, required: PropertyId) -> bool {
    let name = program.properties[required].name;
    let Some(Member {
        kind: MemberKind::Property(candidate),
        ..
    }) = find_in_chain(program, class, name)
    else {
        return false;
    };
    let (wanted, offered) = (&program.properties[required], &program.properties[candidate]);
    let usable = (wanted.getter.is_none() || offered.getter.is_some())
        && (wanted.setter.is_none() || offered.setter.is_some())
        && offered.visibility == Visibility::Public;
    usable && same_property_type(program, class, required, candidate)
}

/// Type of a member as seen from `class`
fn view_from(program: &mut Program, class: ClassId, owner: Option<ClassId>) -> Substitution {
    let Some(owner) = owner else {
        return Substitution::new();
    };
    let receiver = program.self_ty(class);
    member_view(program, receiver, owner)
}

/// Whether `candidate` has the signature `expected` has when viewed from
/// `class`; generic parameters of `expected` are renamed to those of
/// `candidate` by position
fn same_signature(program: &mut Program, class: ClassId, expected: FunctionId, candidate: FunctionId) -> bool {
    let expected_generics = program.functions[expected].generics.clone();
    let candidate_generics = program.functions[candidate].generics.clone();
    if expected_generics.len() != candidate_generics.len() {
        return false;
    }
    let (expected_owner, candidate_owner) = (program.functions[expected].owner, program.functions[candidate].owner);
    let mut expected_view = view_from(program, class, expected_owner);
    let renamed: Vec<TyId> = candidate_generics
        .iter()
        .map(|&param| program.intern(TyKind::Param(param)))
        .collect();
    expected_view.extend(&Substitution::from_lists(&expected_generics, &renamed));
    let candidate_view = view_from(program, class, candidate_owner);

    let expected = program.signature_ty(expected);
    let expected = expected_view.apply(&mut program.types, expected);
    let candidate = program.signature_ty(candidate);
    let candidate = candidate_view.apply(&mut program.types, candidate);
    expected == candidate
}

fn same_property_type(program: &mut Program, class: ClassId, expected: PropertyId, candidate: PropertyId) -> bool {
    let (expected, candidate) = (&program.properties[expected], &program.properties[candidate]);
    let (expected_owner, expected_ty) = (expected.owner, expected.ty);
    let (candidate_owner, candidate_ty) = (candidate.owner, candidate.ty);
    let expected_view = view_from(program, class, expected_owner);
    let candidate_view = view_from(program, class, candidate_owner);
    let expected = expected_view.apply(&mut program.types, expected_ty);
    let candidate = candidate_view.apply(&mut program.types, candidate_ty);
    expected == candidate
}

fn verify_overrides(ctx: &mut LoweringContext<'_>, class: ClassId) {
    let Some(base) = ctx.program.superclass(class) else {
        return;
    };
    let def = &ctx.program.classes[class];
    let mut members: Vec<(Symbol, MemberKind)> = Vec::new();
    members.extend(def.fields.iter().map(|(&name, &field)| (name, MemberKind::Field(field))));
    members.extend(
        def.methods
            .iter()
            .map(|(&name, &method)| (name, MemberKind::Method(method))),
    );
    members.extend(
        def.properties
            .iter()
            .map(|(&name, &property)| (name, MemberKind::Property(property))),
    );

    for (name, member) in members {
        let inherited = find_in_chain(ctx.program, base, name);
        match member {
            MemberKind::Method(function) if ctx.program.functions[function].is_special() => {}
            MemberKind::Method(function) => {
                let def = &ctx.program.functions[function];
                let (is_override, visibility, location) = (def.is_override, def.visibility, def.location);
                let check = match inherited.map(|member| member.kind) {
                    Some(MemberKind::Method(base_method)) if is_override => {
                        if !same_signature(ctx.program, class, base_method, function) {
                            Some(Mismatch::Signature)
                        } else if visibility < ctx.program.functions[base_method].visibility {
                            Some(Mismatch::Narrowed)
                        } else {
                            None
                        }
                    }
                    found => classify(is_override, found.is_some()),
                };
                report(ctx, class, name, location, check);
            }
            MemberKind::Property(property) => {
                let def = &ctx.program.properties[property];
                let (is_override, visibility, location) = (def.is_override, def.visibility, def.location);
                let check = match inherited.map(|member| member.kind) {
                    Some(MemberKind::Property(base_property)) if is_override => {
                        if !same_property_type(ctx.program, class, base_property, property) {
                            Some(Mismatch::Signature)
                        } else if visibility < ctx.program.properties[base_property].visibility {
                            Some(Mismatch::Narrowed)
                        } else {
                            None
                        }
                    }
                    found => classify(is_override, found.is_some()),
                };
                report(ctx, class, name, location, check);
            }
            MemberKind::Field(field) => {
                let location = ctx.program.variables[field].location;
                report(ctx, class, name, location, classify(false, inherited.is_some()));
            }
            MemberKind::Constant(_) | MemberKind::Class(_) => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mismatch {
    NoBase,
    Hides,
    Signature,
    Narrowed,
}

/// Outcome when the inherited member is absent or of another kind
fn classify(is_override: bool, inherited: bool) -> Option<Mismatch> {
    match (is_override, inherited) {
        (true, false) => Some(Mismatch::NoBase),
        (_, true) => Some(Mismatch::Hides),
        (false, false) => None,
    }
}

fn report(ctx: &mut LoweringContext<'_>, class: ClassId, member: Symbol, location: SourceLocation, check: Option<Mismatch>) {
    let Some(mismatch) = check else {
        return;
    };
    let class = ctx.program.class_name(class);
    let member = ctx.program.name(member);
    let error = match mismatch {
        Mismatch::NoBase => SemanticError::OverrideWithoutBase { class, member },
        Mismatch::Hides => SemanticError::HidesBaseMember { class, member },
        Mismatch::Signature => SemanticError::OverrideSignatureMismatch { class, member },
        Mismatch::Narrowed => SemanticError::OverrideNarrowsAccess { class, member },
    };
    ctx.error(location, error);
}
