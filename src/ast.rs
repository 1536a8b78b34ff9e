//! External interfaces consumed from the parser/binder side (§6):
//! `SourceFileProvider` and `SyntaxTree`, plus the tagged-variant AST
//! representation the core pattern-matches over instead of driving a
//! visitor with side effects (§9).

use std::sync::Arc;

/// Path to a compilation unit, as handed out by a [`SourceFileProvider`].
pub type FilePath = Arc<str>;

/// Immutable `{file, offset, length}` triple used as an AST-node-stable
/// identity key across all four stages.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct TokenRange {
    pub file: FilePath,
    pub offset: u32,
    pub length: u32,
}

impl TokenRange {
    pub fn new(file: FilePath, offset: u32, length: u32) -> Self {
        Self {
            file,
            offset,
            length,
        }
    }
}

/// Enumerates the compilation units available to a build and loads them.
pub trait SourceFileProvider: Send + Sync {
    fn list_source_files(&self) -> Vec<FilePath>;
    fn load_unit(&self, file: &FilePath) -> Option<Arc<dyn SyntaxTree>>;
}

/// A single `report(message)` sink (§6). The core never blocks on it and
/// never inspects its return value.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, message: &str);
}

/// A `ProgressReporter` that discards every message, for callers that do
/// not want progress output.
pub struct NullProgressReporter;

impl ProgressReporter for NullProgressReporter {
    fn report(&self, _message: &str) {}
}

/// Declared-modifier bits the binder exposes for a declaration. Distinct
/// from the internally computed [`crate::model::method::MethodModifiers`]:
/// this is what the source says, the other is what CHA derives from it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeclaredModifiers {
    pub is_public: bool,
    pub is_protected: bool,
    pub is_private: bool,
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_final: bool,
    pub is_native: bool,
    pub is_default: bool,
    pub is_varargs: bool,
}

/// A type declaration: class, interface, enum, or anonymous class.
#[derive(Clone, Debug)]
pub struct TypeDeclNode {
    pub token_range: TokenRange,
    pub kind: TypeDeclKind,
    /// Simple or binary name; empty for anonymous classes.
    pub name: String,
    pub is_annotation: bool,
    pub modifiers: DeclaredModifiers,
    /// Symbolic type parameters declared directly on this type (`["T"]`).
    pub type_parameters: Vec<String>,
    pub super_type: Option<TokenRange>,
    pub interfaces: Vec<TokenRange>,
    pub members: Vec<MemberNode>,
    /// Present only for anonymous classes: the instance-creation expression
    /// whose body this declaration is.
    pub anonymous_creation: Option<TokenRange>,
    /// Present iff this declaration is method-local: the enclosing method
    /// or constructor's token-range. Stage 3 climbs past the lexically
    /// enclosing class to find a surrounding method if and only if this is
    /// set (§4.2's "method-local inner class" rule).
    pub enclosing_method: Option<TokenRange>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeDeclKind {
    Class,
    Interface,
    Enum,
    AnonymousClass,
}

#[derive(Clone, Debug)]
pub enum MemberNode {
    Field(FieldDeclNode),
    Method(MethodDeclNode),
    Initializer(InitializerNode),
    Nested(TypeDeclNode),
    EnumConstant(EnumConstantNode),
}

#[derive(Clone, Debug)]
pub struct FieldDeclNode {
    pub token_range: TokenRange,
    pub name: String,
    pub modifiers: DeclaredModifiers,
    /// Call sites, instance creations, and qualified names found in this
    /// field's initializer expression, if any.
    pub initializer: Option<BodyNode>,
}

#[derive(Clone, Debug)]
pub struct MethodDeclNode {
    pub token_range: TokenRange,
    pub name: String,
    pub modifiers: DeclaredModifiers,
    pub is_constructor: bool,
    pub return_type: Option<TokenRange>,
    pub params: Vec<ParamNode>,
    pub body: Option<BodyNode>,
}

#[derive(Clone, Debug)]
pub struct ParamNode {
    pub token_range: TokenRange,
    pub type_ref: Option<TokenRange>,
    /// True for the last parameter of a varargs declaration (`T...`).
    pub is_variadic: bool,
}

/// An instance- or static-initializer block.
#[derive(Clone, Debug)]
pub struct InitializerNode {
    pub token_range: TokenRange,
    pub is_static: bool,
    pub body: BodyNode,
}

#[derive(Clone, Debug)]
pub struct EnumConstantNode {
    pub token_range: TokenRange,
    pub name: String,
    pub args: Vec<TokenRange>,
}

/// The call sites reachable from a method body, field initializer, or
/// initializer block. The pipeline only needs the flattened list of sites,
/// never full control flow (§4.4: "for every call site inside its body").
#[derive(Clone, Debug, Default)]
pub struct BodyNode {
    pub call_sites: Vec<CallSiteNode>,
}

#[derive(Clone, Debug)]
pub enum CallSiteNode {
    MethodInvocation {
        token_range: TokenRange,
        receiver: Option<TokenRange>,
        name: String,
        args: Vec<TokenRange>,
    },
    InstanceCreation {
        token_range: TokenRange,
        class_name: String,
        args: Vec<TokenRange>,
        /// The anonymous class body, if this is `new Foo() { ... }`.
        anonymous_body: Option<TokenRange>,
    },
    ThisInvocation {
        token_range: TokenRange,
        args: Vec<TokenRange>,
    },
    SuperInvocation {
        token_range: TokenRange,
        args: Vec<TokenRange>,
    },
    SuperMethodInvocation {
        token_range: TokenRange,
        name: String,
        args: Vec<TokenRange>,
    },
    EnumConstant {
        token_range: TokenRange,
        name: String,
        args: Vec<TokenRange>,
    },
    QualifiedName {
        token_range: TokenRange,
        name: String,
    },
}

impl CallSiteNode {
    pub fn token_range(&self) -> &TokenRange {
        match self {
            CallSiteNode::MethodInvocation { token_range, .. }
            | CallSiteNode::InstanceCreation { token_range, .. }
            | CallSiteNode::ThisInvocation { token_range, .. }
            | CallSiteNode::SuperInvocation { token_range, .. }
            | CallSiteNode::SuperMethodInvocation { token_range, .. }
            | CallSiteNode::EnumConstant { token_range, .. }
            | CallSiteNode::QualifiedName { token_range, .. } => token_range,
        }
    }
}

/// A parsed compilation unit. Implementations are provided by the external
/// parser (§6); the core only ever reads the type declarations out.
pub trait SyntaxTree: Send + Sync {
    fn file(&self) -> &FilePath;
    fn type_declarations(&self) -> &[TypeDeclNode];
    /// Imported package/type names, used for test-framework exclusion
    /// detection (§6).
    fn imports(&self) -> &[String];
}
