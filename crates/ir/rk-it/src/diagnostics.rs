//! Diagnostic reporting
//!
//! Semantic errors never stop a compile. They are rendered through
//! [`SemanticError`]'s `Display` and handed to a [`DiagnosticSink`] as
//! `(message, file, line, column)`.

use rk_span::{SourceFiles, SourceLocation};
use std::fmt;
use thiserror::Error;

/// Receiver of semantic diagnostics
pub trait DiagnosticSink {
    /// Receive one rendered diagnostic
    fn report(&mut self, message: &str, file: &str, line: u32, column: u32);
}

impl<F> DiagnosticSink for F
where
    F: FnMut(&str, &str, u32, u32),
{
    fn report(&mut self, message: &str, file: &str, line: u32, column: u32) {
        self(message, file, line, column);
    }
}

/// One collected diagnostic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Rendered message
    pub message: String,
    /// Name of the source file
    pub file: String,
    /// One-based line
    pub line: u32,
    /// One-based column
    pub column: u32,
}

/// Sink that keeps every diagnostic
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Diagnostics in report order
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// Number of diagnostics kept
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing was reported
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Messages only, in report order
    pub fn messages(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.message.as_str()).collect()
    }

    /// Number of diagnostics whose message contains `needle`
    pub fn count_containing(&self, needle: &str) -> usize {
        self.items
            .iter()
            .filter(|item| item.message.contains(needle))
            .count()
    }
}

impl DiagnosticSink for Diagnostics {
    fn report(&mut self, message: &str, file: &str, line: u32, column: u32) {
        self.items.push(Diagnostic {
            message: message.to_string(),
            file: file.to_string(),
            line,
            column,
        });
    }
}

/// Forwards errors to a sink, resolving file names and applying a cap
pub struct Reporter<'a> {
    sink: &'a mut dyn DiagnosticSink,
    files: &'a SourceFiles,
    limit: Option<usize>,
    count: usize,
}

impl<'a> Reporter<'a> {
    /// Reporter forwarding at most `limit` diagnostics to `sink`
    pub fn new(sink: &'a mut dyn DiagnosticSink, files: &'a SourceFiles, limit: Option<usize>) -> Self {
        Self {
            sink,
            files,
            limit,
            count: 0,
        }
    }

    /// Count `error` and forward it unless the cap is reached
    pub fn error(&mut self, location: SourceLocation, error: &SemanticError) {
        self.count += 1;
        if self.limit.is_some_and(|limit| self.count > limit) {
            return;
        }
        self.sink.report(
            &error.to_string(),
            self.files.name(location.file),
            location.line,
            location.column,
        );
    }

    /// Errors reported so far, including suppressed ones
    pub fn count(&self) -> usize {
        self.count
    }
}

impl fmt::Debug for Reporter<'_> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Reporter")
            .field("limit", &self.limit)
            .field("count", &self.count)
            .finish_non_exhaustive()
    }
}

/// Recoverable semantic errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemanticError {
    /// No visible entity has the name
    #[error("undefined name `{name}`")]
    UndefinedName {
        /// Name as written
        name: String,
    },

    /// A type reference names nothing
    #[error("undefined type `{name}`")]
    UndefinedType {
        /// Name as written
        name: String,
    },

    /// A type reference names a value
    #[error("`{name}` is not a type")]
    NotAType {
        /// Name as written
        name: String,
    },

    /// A type appears where a value is expected
    #[error("type `{name}` cannot be used as a value")]
    TypeUsedAsValue {
        /// Name as written
        name: String,
    },

    /// Member access on a type without that member
    #[error("`{ty}` has no member `{name}`")]
    UndefinedMember {
        /// Type searched
        ty: String,
        /// Missing member
        name: String,
    },

    /// Second declaration of a name in one scope
    #[error("`{name}` is already declared in this scope")]
    DuplicateDeclaration {
        /// Name as written
        name: String,
    },

    /// No implicit conversion between the two types
    #[error("type mismatch: expected `{expected}`, found `{found}`")]
    TypeMismatch {
        /// Type the context requires
        expected: String,
        /// Type of the expression
        found: String,
    },

    /// Binary operator outside its operand table
    #[error("operator `{op}` cannot be applied to `{left}` and `{right}`")]
    InvalidOperands {
        /// Operator symbol
        op: String,
        /// Left operand type
        left: String,
        /// Right operand type
        right: String,
    },

    /// Unary operator outside its operand table
    #[error("operator `{op}` cannot be applied to `{operand}`")]
    InvalidOperand {
        /// Operator symbol
        op: String,
        /// Operand type
        operand: String,
    },

    /// Explicit cast between unrelated types
    #[error("cannot cast `{from}` to `{to}`")]
    InvalidCast {
        /// Source type
        from: String,
        /// Target type
        to: String,
    },

    /// Call of a value without a function type
    #[error("`{ty}` is not callable")]
    NotCallable {
        /// Type as displayed
        ty: String,
    },

    /// Call with the wrong number of arguments
    #[error("`{name}` expects {expected} argument(s), found {found}")]
    ArgumentCount {
        /// Called function
        name: String,
        /// Declared parameter count
        expected: usize,
        /// Arguments given
        found: usize,
    },

    /// By-reference parameter given a plain argument
    #[error("argument {index} of `{name}` must be passed by reference")]
    ArgumentNotByRef {
        /// Called function
        name: String,
        /// One-based argument position
        index: usize,
    },

    /// By-value parameter given a by-reference argument
    #[error("argument {index} of `{name}` must not be passed by reference")]
    ArgumentByRef {
        /// Called function
        name: String,
        /// One-based argument position
        index: usize,
    },

    /// By-reference argument that is not a variable, field or element
    #[error("by-reference argument {index} of `{name}` is not assignable storage")]
    ByRefNotStorage {
        /// Called function
        name: String,
        /// One-based argument position
        index: usize,
    },

    /// Assignment to something that is not storage
    #[error("expression is not assignable")]
    NotAssignable,

    /// Assignment to a constant
    #[error("`{name}` is a constant and cannot be assigned")]
    AssignToConstant {
        /// Name as written
        name: String,
    },

    /// Generic instantiation with the wrong number of arguments
    #[error("`{ty}` expects {expected} generic argument(s), found {found}")]
    GenericArgumentCount {
        /// Generic type or function
        ty: String,
        /// Declared parameter count
        expected: usize,
        /// Arguments given
        found: usize,
    },

    /// Generic call whose arguments leave a parameter unbound
    #[error("cannot infer generic parameter `{param}` of `{name}`")]
    CannotInferGeneric {
        /// Called function
        name: String,
        /// Unbound parameter
        param: String,
    },

    /// `this` in a free function or initializer
    #[error("`this` is only available inside methods")]
    ThisOutsideMethod,

    /// `new` on an abstract class or interface
    #[error("cannot instantiate abstract class or interface `{class}`")]
    AbstractInstantiation {
        /// Class name
        class: String,
    },

    /// Indexing a non-array value
    #[error("`{ty}` is not an array")]
    NotAnArray {
        /// Type as displayed
        ty: String,
    },

    /// Index count differs from the array rank
    #[error("array of {expected} dimension(s) indexed with {found} index(es)")]
    IndexCount {
        /// Rank of the array
        expected: u32,
        /// Indices given
        found: usize,
    },

    /// Read of a write-only property
    #[error("property `{name}` has no getter")]
    NoGetter {
        /// Name as written
        name: String,
    },

    /// Write of a read-only property
    #[error("property `{name}` has no setter")]
    NoSetter {
        /// Name as written
        name: String,
    },

    /// Member not visible from the reference site
    #[error("`{member}` is {visibility} and cannot be accessed here")]
    IllegalAccess {
        /// Qualified member name
        member: String,
        /// Declared visibility
        visibility: String,
    },

    /// More than one class among the base types
    #[error("class `{class}` inherits from more than one class (multiple inheritance)")]
    MultipleInheritance {
        /// Class name
        class: String,
    },

    /// Class names itself as a base
    #[error("class `{class}` cannot inherit from itself")]
    SelfInheritance {
        /// Class name
        class: String,
    },

    /// Base class declared sealed
    #[error("class `{class}` cannot inherit from sealed class `{base}`")]
    SealedBase {
        /// Class name
        class: String,
        /// Sealed base class
        base: String,
    },

    /// Base type that is neither a class nor an interface
    #[error("`{name}` is not a class or interface")]
    NotAClass {
        /// Name as written
        name: String,
    },

    /// Interface listing base types
    #[error("interface `{interface}` cannot declare base types")]
    InterfaceWithBase {
        /// Interface declaring bases
        interface: String,
    },

    /// Superclass chain that loops back on itself
    #[error("circular inheritance: {cycle}")]
    CircularInheritance {
        /// Classes of the cycle, `A -> B -> A`
        cycle: String,
    },

    /// Concrete class lacking an interface member
    #[error("class `{class}` does not implement `{member}` of interface `{interface}` (missing implementation)")]
    MissingImplementation {
        /// Class lacking the member
        class: String,
        /// Missing member
        member: String,
        /// Interface name
        interface: String,
    },

    /// `override` with nothing to override
    #[error("`{class}.{member}` is marked override but overrides nothing")]
    OverrideWithoutBase {
        /// Class name
        class: String,
        /// Member name
        member: String,
    },

    /// Override whose signature differs from the base member
    #[error("`{class}.{member}` does not match the signature of the member it overrides")]
    OverrideSignatureMismatch {
        /// Class name
        class: String,
        /// Member name
        member: String,
    },

    /// Override less visible than the base member
    #[error("`{class}.{member}` narrows the accessibility of the member it overrides")]
    OverrideNarrowsAccess {
        /// Class name
        class: String,
        /// Member name
        member: String,
    },

    /// Member reusing an inherited name without overriding it
    #[error("`{class}.{member}` conflicts with an inherited member of the same name")]
    HidesBaseMember {
        /// Class name
        class: String,
        /// Member name
        member: String,
    },

    /// Abstract member declared in a concrete class
    #[error("abstract member `{member}` in non-abstract class `{class}`")]
    AbstractInConcrete {
        /// Class name
        class: String,
        /// Member name
        member: String,
    },

    /// Non-abstract function without a body
    #[error("`{name}` must have a body")]
    MissingBody {
        /// Name as written
        name: String,
    },

    /// Reserved constructor or destructor name used for something else
    #[error("`{name}` is reserved for constructors and destructors")]
    ReservedIdentifier {
        /// Name as written
        name: String,
    },

    /// Constructor or destructor with parameters, generics or a return type
    #[error("`{name}` must not declare parameters, generic parameters or a return type")]
    SpecialFunctionSignature {
        /// Name as written
        name: String,
    },

    /// Constant whose value depends on itself
    #[error("circular constant reference involving `{name}`")]
    CircularConstant {
        /// First constant re-entered
        name: String,
    },

    /// Value that must fold to a literal but does not
    #[error("`{name}` requires a constant value")]
    NonConstantValue {
        /// Constant or context needing the value
        name: String,
    },

    /// Enum underlying type that is not an integer
    #[error("`{ty}` is not a valid enum underlying type")]
    InvalidEnumType {
        /// Type as displayed
        ty: String,
    },

    /// Folded arithmetic left the range of its type
    #[error("arithmetic overflow in constant expression")]
    Overflow,

    /// Folded division or remainder by zero
    #[error("division by zero in constant expression")]
    DivisionByZero,

    /// `return` with a value in a function without a return type
    #[error("function returns no value, but a value is returned")]
    UnexpectedReturnValue,

    /// Bare `return` in a function with a return type
    #[error("function must return a value of type `{ty}`")]
    MissingReturnValue {
        /// Declared return type
        ty: String,
    },

    /// Variable with neither a type nor an initializer
    #[error("variable `{name}` needs a type or an initializer")]
    UntypedVariable {
        /// Name as written
        name: String,
    },

    /// `break` with no loop or block to leave
    #[error("`break` outside of a loop or named block")]
    BreakOutsideLoop,

    /// `continue` with no loop to restart
    #[error("`continue` outside of a loop")]
    ContinueOutsideLoop,

    /// Labeled `break` without a matching block
    #[error("no enclosing block named `{label}`")]
    UnknownLabel {
        /// Label as written
        label: String,
    },

    /// Jump or return leaving a try body guarded by `finally`
    #[error("control cannot leave a finally-protected block")]
    TransferOutOfFinally,

    /// `foreach` over a value with no array type or iterator
    #[error("`{ty}` cannot be iterated")]
    NotIterable {
        /// Type as displayed
        ty: String,
    },

    /// Typed catch clause naming a non-exception type
    #[error("catch type `{ty}` does not derive from the exception class")]
    InvalidCatchType {
        /// Type as displayed
        ty: String,
    },

    /// `throw` of a value that is neither an exception nor a code
    #[error("`{ty}` cannot be thrown")]
    InvalidThrow {
        /// Type as displayed
        ty: String,
    },
}
