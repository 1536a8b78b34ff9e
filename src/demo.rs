//! Canned scenarios for the demonstration CLI's `--demo` flag, each wiring a
//! handful of [`javacha::ast`] nodes directly in Rust instead of parsing
//! real source, and registering just enough binder/type-calculator
//! knowledge for the pipeline to resolve every call site.

use std::sync::Arc;

use javacha::ast::{
    BodyNode, CallSiteNode, DeclaredModifiers, MemberNode, MethodDeclNode, ParamNode, SyntaxTree,
    TokenRange, TypeDeclKind, TypeDeclNode,
};
use javacha::reference_impl::{InMemoryBinder, InMemorySyntaxTree, InMemoryTypeCalculator, NamedType};

/// Monotonic token-range allocator for one synthetic file.
struct Tokens {
    file: Arc<str>,
    next: u32,
}

impl Tokens {
    fn new(file: &str) -> Self {
        Self { file: file.into(), next: 0 }
    }

    fn next(&mut self) -> TokenRange {
        let range = TokenRange::new(self.file.clone(), self.next, 1);
        self.next += 1;
        range
    }
}

fn empty_modifiers() -> DeclaredModifiers {
    DeclaredModifiers::default()
}

fn method(
    tokens: &mut Tokens,
    name: &str,
    params: Vec<ParamNode>,
    body: Option<BodyNode>,
    modifiers: DeclaredModifiers,
    is_constructor: bool,
) -> MethodDeclNode {
    MethodDeclNode {
        token_range: tokens.next(),
        name: name.to_string(),
        modifiers,
        is_constructor,
        return_type: None,
        params,
        body,
    }
}

fn body(call_sites: Vec<CallSiteNode>) -> BodyNode {
    BodyNode { call_sites }
}

fn type_decl(
    tokens: &mut Tokens,
    kind: TypeDeclKind,
    name: &str,
    super_type: Option<TokenRange>,
    interfaces: Vec<TokenRange>,
    members: Vec<MemberNode>,
) -> TypeDeclNode {
    TypeDeclNode {
        token_range: tokens.next(),
        kind,
        name: name.to_string(),
        is_annotation: false,
        modifiers: empty_modifiers(),
        type_parameters: Vec::new(),
        super_type,
        interfaces,
        members,
        anonymous_creation: None,
        enclosing_method: None,
    }
}

/// A base class method overridden once by a subclass, called through a
/// receiver of the declared subclass's type.
pub fn single_override(
    binder: &InMemoryBinder,
    types: &InMemoryTypeCalculator,
) -> Vec<Arc<dyn SyntaxTree>> {
    let mut tokens = Tokens::new("demo/SingleOverride.java");

    let base_id = binder.declare_class("Base", None, &[]);
    let sub_id = binder.declare_class("Sub", Some(base_id.clone()), &[]);
    let main_id = binder.declare_class("Main", None, &[]);

    let base_greet = method(&mut tokens, "greet", Vec::new(), Some(body(Vec::new())), empty_modifiers(), false);
    let base_decl = type_decl(&mut tokens, TypeDeclKind::Class, "Base", None, Vec::new(), vec![MemberNode::Method(base_greet)]);
    binder.bind_type_ref(base_decl.token_range.clone(), base_id.clone());

    let sub_greet = method(&mut tokens, "greet", Vec::new(), Some(body(Vec::new())), empty_modifiers(), false);
    let sub_super_ref = tokens.next();
    binder.bind_type_ref(sub_super_ref.clone(), base_id.clone());
    let sub_decl = type_decl(&mut tokens, TypeDeclKind::Class, "Sub", Some(sub_super_ref), Vec::new(), vec![MemberNode::Method(sub_greet)]);
    binder.bind_type_ref(sub_decl.token_range.clone(), sub_id.clone());

    let creation_type_ref = tokens.next();
    binder.bind_type_ref(creation_type_ref.clone(), sub_id.clone());
    let receiver_ref = tokens.next();
    let sub_type = Arc::new(NamedType::new("Sub", Some(sub_id.clone())).with_super("Base"));
    types.set_type(receiver_ref.clone(), sub_type);

    let call_site = CallSiteNode::MethodInvocation {
        token_range: tokens.next(),
        receiver: Some(receiver_ref),
        name: "greet".to_string(),
        args: Vec::new(),
    };
    let creation = CallSiteNode::InstanceCreation {
        token_range: creation_type_ref,
        class_name: "Sub".to_string(),
        args: Vec::new(),
        anonymous_body: None,
    };
    let main_run = method(
        &mut tokens,
        "run",
        Vec::new(),
        Some(body(vec![creation, call_site])),
        empty_modifiers(),
        false,
    );
    let main_decl = type_decl(&mut tokens, TypeDeclKind::Class, "Main", None, Vec::new(), vec![MemberNode::Method(main_run)]);
    binder.bind_type_ref(main_decl.token_range.clone(), main_id);

    vec![Arc::new(InMemorySyntaxTree {
        file: tokens.file.clone(),
        declarations: vec![base_decl, sub_decl, main_decl],
        imports: Vec::new(),
    })]
}

/// A diamond interface hierarchy (`Top` <- `Left`, `Right` <- `Bottom`),
/// with `Bottom` the sole implementing class, to exercise `reachable_subs`
/// fanning across multiple interface paths.
pub fn diamond_interfaces(
    binder: &InMemoryBinder,
    types: &InMemoryTypeCalculator,
) -> Vec<Arc<dyn SyntaxTree>> {
    let mut tokens = Tokens::new("demo/Diamond.java");

    let top_id = binder.declare_class("Top", None, &[]);
    let left_id = binder.declare_class("Left", None, &[top_id.clone()]);
    let right_id = binder.declare_class("Right", None, &[top_id.clone()]);
    let bottom_id = binder.declare_class("Bottom", None, &[left_id.clone(), right_id.clone()]);
    let main_id = binder.declare_class("Main", None, &[]);

    let top_method = method(&mut tokens, "op", Vec::new(), None, {
        let mut m = empty_modifiers();
        m.is_abstract = true;
        m
    }, false);
    let top_decl = type_decl(&mut tokens, TypeDeclKind::Interface, "Top", None, Vec::new(), vec![MemberNode::Method(top_method)]);
    binder.bind_type_ref(top_decl.token_range.clone(), top_id.clone());

    let left_iface_ref = tokens.next();
    binder.bind_type_ref(left_iface_ref.clone(), top_id.clone());
    let left_decl = type_decl(&mut tokens, TypeDeclKind::Interface, "Left", None, vec![left_iface_ref], Vec::new());
    binder.bind_type_ref(left_decl.token_range.clone(), left_id.clone());

    let right_iface_ref = tokens.next();
    binder.bind_type_ref(right_iface_ref.clone(), top_id.clone());
    let right_decl = type_decl(&mut tokens, TypeDeclKind::Interface, "Right", None, vec![right_iface_ref], Vec::new());
    binder.bind_type_ref(right_decl.token_range.clone(), right_id.clone());

    let bottom_left_ref = tokens.next();
    binder.bind_type_ref(bottom_left_ref.clone(), left_id.clone());
    let bottom_right_ref = tokens.next();
    binder.bind_type_ref(bottom_right_ref.clone(), right_id.clone());
    let bottom_op = method(&mut tokens, "op", Vec::new(), Some(body(Vec::new())), empty_modifiers(), false);
    let bottom_decl = type_decl(
        &mut tokens,
        TypeDeclKind::Class,
        "Bottom",
        None,
        vec![bottom_left_ref, bottom_right_ref],
        vec![MemberNode::Method(bottom_op)],
    );
    binder.bind_type_ref(bottom_decl.token_range.clone(), bottom_id.clone());

    let creation_type_ref = tokens.next();
    binder.bind_type_ref(creation_type_ref.clone(), bottom_id.clone());
    let receiver_ref = tokens.next();
    let bottom_type = Arc::new(
        NamedType::new("Bottom", Some(bottom_id.clone()))
            .with_super("Left")
            .with_super("Right"),
    );
    types.set_type(receiver_ref.clone(), bottom_type);

    let creation = CallSiteNode::InstanceCreation {
        token_range: creation_type_ref,
        class_name: "Bottom".to_string(),
        args: Vec::new(),
        anonymous_body: None,
    };
    let call_site = CallSiteNode::MethodInvocation {
        token_range: tokens.next(),
        receiver: Some(receiver_ref),
        name: "op".to_string(),
        args: Vec::new(),
    };
    let main_run = method(&mut tokens, "run", Vec::new(), Some(body(vec![creation, call_site])), empty_modifiers(), false);
    let main_decl = type_decl(&mut tokens, TypeDeclKind::Class, "Main", None, Vec::new(), vec![MemberNode::Method(main_run)]);
    binder.bind_type_ref(main_decl.token_range.clone(), main_id);

    vec![Arc::new(InMemorySyntaxTree {
        file: tokens.file.clone(),
        declarations: vec![top_decl, left_decl, right_decl, bottom_decl, main_decl],
        imports: Vec::new(),
    })]
}

/// A constructor with no explicit `this()`/`super()` call, exercising the
/// synthetic default constructor link.
pub fn constructor_chain(
    binder: &InMemoryBinder,
    _types: &InMemoryTypeCalculator,
) -> Vec<Arc<dyn SyntaxTree>> {
    let mut tokens = Tokens::new("demo/ConstructorChain.java");

    let base_id = binder.declare_class("Base", None, &[]);
    let sub_id = binder.declare_class("Sub", Some(base_id.clone()), &[]);

    let base_decl = type_decl(&mut tokens, TypeDeclKind::Class, "Base", None, Vec::new(), Vec::new());
    binder.bind_type_ref(base_decl.token_range.clone(), base_id.clone());

    let sub_super_ref = tokens.next();
    binder.bind_type_ref(sub_super_ref.clone(), base_id);
    let sub_ctor = method(
        &mut tokens,
        "Sub",
        vec![ParamNode { token_range: tokens.next(), type_ref: None, is_variadic: false }],
        Some(body(Vec::new())),
        empty_modifiers(),
        true,
    );
    let sub_decl = type_decl(&mut tokens, TypeDeclKind::Class, "Sub", Some(sub_super_ref), Vec::new(), vec![MemberNode::Method(sub_ctor)]);
    binder.bind_type_ref(sub_decl.token_range.clone(), sub_id);

    vec![Arc::new(InMemorySyntaxTree {
        file: tokens.file.clone(),
        declarations: vec![base_decl, sub_decl],
        imports: Vec::new(),
    })]
}

/// A `new Runnable() { ... }` anonymous-class instance creation.
pub fn anonymous_class(
    binder: &InMemoryBinder,
    _types: &InMemoryTypeCalculator,
) -> Vec<Arc<dyn SyntaxTree>> {
    let mut tokens = Tokens::new("demo/Anonymous.java");

    let runnable_id = binder.declare_class("Runnable", None, &[]);
    let main_id = binder.declare_class("Main", None, &[]);

    let runnable_method = method(&mut tokens, "run", Vec::new(), None, {
        let mut m = empty_modifiers();
        m.is_abstract = true;
        m
    }, false);
    let runnable_decl = type_decl(&mut tokens, TypeDeclKind::Interface, "Runnable", None, Vec::new(), vec![MemberNode::Method(runnable_method)]);
    binder.bind_type_ref(runnable_decl.token_range.clone(), runnable_id.clone());

    let anon_run = method(&mut tokens, "run", Vec::new(), Some(body(Vec::new())), empty_modifiers(), false);
    let anon_decl = TypeDeclNode {
        token_range: tokens.next(),
        kind: TypeDeclKind::AnonymousClass,
        name: String::new(),
        is_annotation: false,
        modifiers: empty_modifiers(),
        type_parameters: Vec::new(),
        super_type: None,
        interfaces: Vec::new(),
        members: vec![MemberNode::Method(anon_run)],
        anonymous_creation: None,
        enclosing_method: None,
    };

    let creation_type_ref = tokens.next();
    binder.bind_type_ref(creation_type_ref.clone(), runnable_id);
    let creation = CallSiteNode::InstanceCreation {
        token_range: creation_type_ref,
        class_name: "Runnable".to_string(),
        args: Vec::new(),
        anonymous_body: Some(anon_decl.token_range.clone()),
    };
    let main_run = method(&mut tokens, "run", Vec::new(), Some(body(vec![creation])), empty_modifiers(), false);
    let main_decl = type_decl(
        &mut tokens,
        TypeDeclKind::Class,
        "Main",
        None,
        Vec::new(),
        vec![MemberNode::Method(main_run), MemberNode::Nested(anon_decl)],
    );
    binder.bind_type_ref(main_decl.token_range.clone(), main_id);

    vec![Arc::new(InMemorySyntaxTree {
        file: tokens.file.clone(),
        declarations: vec![runnable_decl, main_decl],
        imports: Vec::new(),
    })]
}
