//! Anonymous functions and captured variables
//!
//! A function whose locals are referenced from a nested anonymous function
//! gets a surrogate class. Captured variables live in the surrogate, and each
//! capturing anonymous function becomes a method of the surrogate of the
//! function it is written in. When a capture crosses several anonymous
//! functions, their surrogates are chained through `outer` links and the
//! captured read records how many links to follow.

use crate::LoweringContext;
use crate::context::Frame;
use rk_it::{
    ClassId, ClassKind, Entity, Expr, ExprKind, FunctionKind, GenericOwner, InternalError,
    SemanticError, TyId, TyKind, VariableId, Visibility,
};
use rk_span::SourceLocation;
use rk_syntax::AnonymousFunction;
use tracing::trace;

impl LoweringContext<'_> {
    pub(crate) fn lower_anonymous_function(
        &mut self,
        function: &AnonymousFunction,
        location: SourceLocation,
    ) -> Result<Expr, InternalError> {
        let scope = self.current_scope()?;
        let name = self.hidden_name("closure");
        let closure = self.program.new_function(name, location, FunctionKind::Closure, scope);
        self.program.functions[closure].visibility = Visibility::Private;
        let closure_scope = self.program.functions[closure].scope;
        for param in &function.params {
            let ty = self.resolve_type(closure_scope, &param.ty);
            if self.is_reserved(param.name) {
                let name = self.text(param.name);
                self.error(param.location, SemanticError::ReservedIdentifier { name });
            }
            if self
                .program
                .add_param(closure, param.name, ty, param.by_ref, param.location)
                .is_err()
            {
                let name = self.text(param.name);
                self.error(param.location, SemanticError::DuplicateDeclaration { name });
            }
        }
        self.program.functions[closure].return_type =
            self.resolve_optional_type(closure_scope, function.return_type.as_ref());

        let capturing = self.lower_function_body(closure, &function.body, false)?;
        let signature = self.program.signature_ty(closure);
        if !capturing {
            return Ok(Expr::new(ExprKind::FunctionRef(closure), signature, location));
        }

        let surrogate = self
            .frame()?
            .surrogate
            .ok_or_else(|| InternalError::Invariant("capturing closure without an enclosing surrogate".into()))?;
        self.program.functions[closure].owner = Some(surrogate);
        self.program.classes[surrogate].methods.insert(name, closure);
        let surrogate_scope = self.program.classes[surrogate].scope;
        if self.program.declare(surrogate_scope, name, Entity::Function(closure)).is_err() {
            return Err(InternalError::Invariant(format!(
                "closure `{}` declared twice in its surrogate",
                self.text(name)
            )));
        }
        trace!(closure = %self.text(name), surrogate = %self.program.class_name(surrogate), "closure bound to surrogate");
        let instance_ty = self.surrogate_instance_ty(surrogate);
        let target = Expr::new(ExprKind::SurrogateInstance(surrogate), instance_ty, location);
        Ok(Expr::new(
            ExprKind::BoundMethod {
                target: Box::new(target),
                function: closure,
            },
            signature,
            location,
        ))
    }

    /// Type of the surrogate instance, generic over the enclosing function's parameters
    fn surrogate_instance_ty(&mut self, surrogate: ClassId) -> TyId {
        let Some(function) = self.program.classes[surrogate].surrogate_of else {
            return self.program.intern(TyKind::Class(surrogate));
        };
        let mirrored: Vec<_> = self.program.functions[function]
            .surrogate_generics
            .iter()
            .map(|&(param, _)| param)
            .collect();
        if mirrored.is_empty() {
            return self.program.intern(TyKind::Class(surrogate));
        }
        let args = mirrored
            .into_iter()
            .map(|param| self.program.intern(TyKind::Param(param)))
            .collect();
        self.program.intern(TyKind::Instance {
            class: surrogate,
            args,
        })
    }

    /// Record that the innermost frame reads `variable` owned by frame
    /// `owner_index`, returning the number of `outer` links to follow
    pub(crate) fn record_capture(&mut self, variable: VariableId, owner_index: usize) -> Result<u32, InternalError> {
        let innermost = self
            .frames
            .len()
            .checked_sub(1)
            .filter(|&innermost| innermost > owner_index)
            .ok_or_else(|| InternalError::Invariant("capture from a frame that is not nested".into()))?;
        self.program.variables[variable].captured = true;
        for frame in &mut self.frames[owner_index + 1..=innermost] {
            frame.capturing = true;
        }
        for index in owner_index..innermost {
            self.ensure_surrogate(index)?;
        }
        for index in owner_index + 1..innermost {
            let (inner, outer) = (self.frames[index].surrogate, self.frames[index - 1].surrogate);
            if let (Some(inner), Some(outer)) = (inner, outer) {
                self.program.classes[inner].outer = Some(outer);
            }
        }
        let host = self.frames[owner_index]
            .surrogate
            .ok_or_else(|| InternalError::Invariant("captured variable without a surrogate".into()))?;
        if !self.program.classes[host].captures.contains(&variable) {
            self.program.classes[host].captures.push(variable);
        }
        u32::try_from(innermost - owner_index - 1).map_err(|_| InternalError::Invariant("capture depth overflow".into()))
    }

    /// Surrogate of the function lowered by frame `index`, created on demand
    ///
    /// The class is not attached to its scope until the frame is finished.
    fn ensure_surrogate(&mut self, index: usize) -> Result<ClassId, InternalError> {
        if let Some(surrogate) = self.frames[index].surrogate {
            return Ok(surrogate);
        }
        let function = self.frames[index]
            .function
            .ok_or_else(|| InternalError::Invariant("surrogate requested outside a function frame".into()))?;
        let def = &self.program.functions[function];
        let (owner, function_scope, location, generics) = (def.owner, def.scope, def.location, def.generics.clone());
        let parent = match owner {
            Some(owner) => self.program.classes[owner].scope,
            None => self.program.scopes[function_scope].parent.unwrap_or(function_scope),
        };
        let mut name = self.program.sym(&format!("{}$surrogate", self.program.function_name(function)));
        if self.program.lookup_in(parent, name).is_some() {
            name = self.hidden_name("surrogate");
        }
        let surrogate = self.program.new_class(name, location, parent, ClassKind::Class);
        let root = self.program.root_ty();
        let class = &mut self.program.classes[surrogate];
        class.superclass = Some(root);
        class.surrogate_of = Some(function);
        class.attached = false;
        class.visibility = Visibility::Private;
        for param in generics {
            let param_name = self.program.generic_params[param].name;
            let mirror = self.program.add_generic_param(GenericOwner::Class(surrogate), param_name, location);
            self.program.functions[function].surrogate_generics.push((param, mirror));
        }
        self.frames[index].surrogate = Some(surrogate);
        trace!(function = %self.program.function_name(function), "surrogate created");
        Ok(surrogate)
    }

    /// Attach the surrogate of a finished frame to its declaring scope
    pub(crate) fn finish_frame(&mut self, frame: &Frame) -> Result<(), InternalError> {
        let Some(surrogate) = frame.surrogate else {
            return Ok(());
        };
        let class_scope = self.program.classes[surrogate].scope;
        let parent = self.program.scopes[class_scope]
            .parent
            .ok_or_else(|| InternalError::Invariant("surrogate without a declaring scope".into()))?;
        if !self.program.attach_class(surrogate, parent) {
            return Err(InternalError::Invariant(format!(
                "surrogate `{}` collides with an existing declaration",
                self.program.class_name(surrogate)
            )));
        }
        if let Some(function) = frame.function {
            self.program.functions[function].surrogate = Some(surrogate);
        }
        trace!(
            surrogate = %self.program.class_name(surrogate),
            captures = self.program.classes[surrogate].captures.len(),
            "surrogate attached"
        );
        Ok(())
    }
}
