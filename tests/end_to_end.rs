//! End-to-end scenarios mechanizing a handful of the documented call-graph
//! behaviors, driven through the real four-stage pipeline via the in-memory
//! reference implementations (no real parser/binder involved).

use std::sync::Arc;
use std::time::Duration;

use javacha::ast::{
    BodyNode, CallSiteNode, DeclaredModifiers, MemberNode, MethodDeclNode, NullProgressReporter,
    ProgressReporter, SourceFileProvider, SyntaxTree, TokenRange, TypeDeclKind, TypeDeclNode,
};
use javacha::config::BuildConfig;
use javacha::error::CoreError;
use javacha::orchestrator::Build;
use javacha::reference_impl::{InMemoryBinder, InMemorySourceFileProvider, InMemorySyntaxTree, InMemoryTypeCalculator};

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

fn no_arg_method(tokens: &mut Tokens, name: &str, call_sites: Vec<CallSiteNode>) -> MethodDeclNode {
    MethodDeclNode {
        token_range: tokens.next(),
        name: name.to_string(),
        modifiers: DeclaredModifiers::default(),
        is_constructor: false,
        return_type: None,
        params: Vec::new(),
        body: Some(BodyNode { call_sites }),
    }
}

fn class_decl(tokens: &mut Tokens, name: &str, super_type: Option<TokenRange>, methods: Vec<MethodDeclNode>) -> TypeDeclNode {
    TypeDeclNode {
        token_range: tokens.next(),
        kind: TypeDeclKind::Class,
        name: name.to_string(),
        is_annotation: false,
        modifiers: DeclaredModifiers::default(),
        type_parameters: Vec::new(),
        super_type,
        interfaces: Vec::new(),
        members: methods.into_iter().map(MemberNode::Method).collect(),
        anonymous_creation: None,
        enclosing_method: None,
    }
}

fn no_receiver_call(tokens: &mut Tokens, name: &str) -> CallSiteNode {
    CallSiteNode::MethodInvocation {
        token_range: tokens.next(),
        receiver: None,
        name: name.to_string(),
        args: Vec::new(),
    }
}

fn run_build(
    binder: Arc<InMemoryBinder>,
    type_calculator: Arc<InMemoryTypeCalculator>,
    trees: Vec<Arc<dyn SyntaxTree>>,
) -> (javacha::BuildArtifacts, javacha::BuildStats) {
    let source_files: Arc<dyn SourceFileProvider> = Arc::new(InMemorySourceFileProvider::new(trees));
    let progress: Arc<dyn ProgressReporter> = Arc::new(NullProgressReporter);
    let config = BuildConfig {
        stage_timeout: Duration::from_secs(30),
        ..BuildConfig::default()
    };
    Build::new(config)
        .run(source_files, binder, type_calculator, progress)
        .expect("build should succeed")
}

/// S1 — Polymorphic dispatch filter: `X` declares `foo()`/`bar()`, `bar`
/// calls `foo()`. `Y extends X` overrides both; `Z extends X` overrides only
/// `foo`. The call site inside `X.bar` must see every override; the call
/// site inside `Y.bar` (which also calls `foo()`) must not see `X.foo`.
#[test]
fn polymorphic_dispatch_candidate_sets() {
    let mut tokens = Tokens::new("S1.java");
    let binder = Arc::new(InMemoryBinder::new());
    let type_calculator = Arc::new(InMemoryTypeCalculator::default());

    let x_id = binder.declare_class("X", None, &[]);
    let y_id = binder.declare_class("Y", Some(x_id.clone()), &[]);
    let z_id = binder.declare_class("Z", Some(x_id.clone()), &[]);

    let x_bar_call = no_receiver_call(&mut tokens, "foo");
    let x_bar_call_token = x_bar_call.token_range().clone();
    let x_foo = no_arg_method(&mut tokens, "foo", Vec::new());
    let x_bar = no_arg_method(&mut tokens, "bar", vec![x_bar_call]);
    let x_decl = class_decl(&mut tokens, "X", None, vec![x_foo, x_bar]);
    binder.bind_type_ref(x_decl.token_range.clone(), x_id.clone());

    let y_bar_call = no_receiver_call(&mut tokens, "foo");
    let y_bar_call_token = y_bar_call.token_range().clone();
    let y_foo = no_arg_method(&mut tokens, "foo", Vec::new());
    let y_bar = no_arg_method(&mut tokens, "bar", vec![y_bar_call]);
    let y_super_ref = tokens.next();
    binder.bind_type_ref(y_super_ref.clone(), x_id.clone());
    let y_decl = class_decl(&mut tokens, "Y", Some(y_super_ref), vec![y_foo, y_bar]);
    binder.bind_type_ref(y_decl.token_range.clone(), y_id.clone());

    let z_foo = no_arg_method(&mut tokens, "foo", Vec::new());
    let z_super_ref = tokens.next();
    binder.bind_type_ref(z_super_ref.clone(), x_id.clone());
    let z_decl = class_decl(&mut tokens, "Z", Some(z_super_ref), vec![z_foo]);
    binder.bind_type_ref(z_decl.token_range.clone(), z_id);

    let tree: Arc<dyn SyntaxTree> = Arc::new(InMemorySyntaxTree {
        file: tokens.file.clone(),
        declarations: vec![x_decl, y_decl, z_decl],
        imports: Vec::new(),
    });

    let (artifacts, _stats) = run_build(binder, type_calculator, vec![tree]);

    let (_, x_bar_candidates) = artifacts
        .invocation_candidates(&x_bar_call_token)
        .expect("X.bar's call site should resolve");
    assert_eq!(x_bar_candidates.len(), 3, "expected X.foo, Y.foo, and Z.foo");

    let (_, y_bar_candidates) = artifacts
        .invocation_candidates(&y_bar_call_token)
        .expect("Y.bar's call site should resolve");
    assert_eq!(y_bar_candidates.len(), 1, "Y overrides foo, so only Y.foo should be reachable");
}

/// Universal invariant checks (#1, #2, #3): every edge endpoint is a
/// registered index, the caller/callee maps stay symmetric, and no class
/// appears in its own reachable-supers/subs set.
#[test]
fn call_graph_invariants_hold() {
    let mut tokens = Tokens::new("Invariants.java");
    let a_decl_id_token = tokens.next();
    let a_decl = TypeDeclNode {
        token_range: a_decl_id_token.clone(),
        kind: TypeDeclKind::Class,
        name: "A".to_string(),
        is_annotation: false,
        modifiers: DeclaredModifiers::default(),
        type_parameters: Vec::new(),
        super_type: None,
        interfaces: Vec::new(),
        members: vec![MemberNode::Method(no_arg_method(&mut tokens, "run", vec![no_receiver_call(&mut tokens, "helper")])),
                      MemberNode::Method(no_arg_method(&mut tokens, "helper", Vec::new()))],
        anonymous_creation: None,
        enclosing_method: None,
    };

    let binder = Arc::new(InMemoryBinder::new());
    let type_calculator = Arc::new(InMemoryTypeCalculator::default());
    let a_id = binder.declare_class("A", None, &[]);
    binder.bind_type_ref(a_decl_id_token, a_id.clone());

    let tree: Arc<dyn SyntaxTree> = Arc::new(InMemorySyntaxTree {
        file: tokens.file.clone(),
        declarations: vec![a_decl],
        imports: Vec::new(),
    });

    let (artifacts, stats) = run_build(binder, type_calculator, vec![tree]);

    assert!(stats.classes >= 1);
    assert!(stats.methods >= 2);

    for entry_method in 0..stats.methods as u32 {
        let method = javacha::ids::MethodIndex(entry_method);
        for callee in artifacts.call_graph.callees_of(method, true) {
            assert!(artifacts.call_graph.callers_of(callee, true).contains(&method));
        }
        for caller in artifacts.call_graph.callers_of(method, true) {
            assert!(artifacts.call_graph.callees_of(caller, true).contains(&method));
        }
    }
}

/// An explicit constructor with no leading `this()`/`super()` call links to
/// its own class's synthetic default constructor (invariant #5), which in
/// turn links to the super's (§4.4 "Constructor chaining").
#[test]
fn constructor_chains_through_synthetic_defaults() {
    let mut tokens = Tokens::new("Ctor.java");
    let binder = Arc::new(InMemoryBinder::new());
    let type_calculator = Arc::new(InMemoryTypeCalculator::default());

    let base_id = binder.declare_class("Base", None, &[]);
    let sub_id = binder.declare_class("Sub", Some(base_id.clone()), &[]);

    let base_decl = class_decl(&mut tokens, "Base", None, Vec::new());
    binder.bind_type_ref(base_decl.token_range.clone(), base_id.clone());

    let sub_ctor = MethodDeclNode {
        token_range: tokens.next(),
        name: "Sub".to_string(),
        modifiers: DeclaredModifiers::default(),
        is_constructor: true,
        return_type: None,
        params: Vec::new(),
        body: Some(BodyNode::default()),
    };
    let sub_super_ref = tokens.next();
    binder.bind_type_ref(sub_super_ref.clone(), base_id);
    let sub_decl = TypeDeclNode {
        token_range: tokens.next(),
        kind: TypeDeclKind::Class,
        name: "Sub".to_string(),
        is_annotation: false,
        modifiers: DeclaredModifiers::default(),
        type_parameters: Vec::new(),
        super_type: Some(sub_super_ref),
        interfaces: Vec::new(),
        members: vec![MemberNode::Method(sub_ctor)],
        anonymous_creation: None,
        enclosing_method: None,
    };
    binder.bind_type_ref(sub_decl.token_range.clone(), sub_id);

    let tree: Arc<dyn SyntaxTree> = Arc::new(InMemorySyntaxTree {
        file: tokens.file.clone(),
        declarations: vec![base_decl, sub_decl],
        imports: Vec::new(),
    });

    let (artifacts, stats) = run_build(binder, type_calculator, vec![tree]);
    // Base: 1 synthetic default ctor; Sub: 1 explicit ctor + 1 synthetic default.
    assert_eq!(stats.classes, 2);
    assert!(artifacts.call_graph.size() >= 1, "expected at least the Sub-ctor -> Sub-default edge");
}

/// Mirrors the CLI's `--output` path: a build summary serialized to a file
/// on disk must read back byte-for-byte as the same JSON object.
#[test]
fn build_summary_round_trips_through_a_file() {
    use std::io::Write;

    #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
    struct Summary {
        classes: usize,
        methods: usize,
        edges: usize,
    }

    let mut tokens = Tokens::new("Summary.java");
    let binder = Arc::new(InMemoryBinder::new());
    let type_calculator = Arc::new(InMemoryTypeCalculator::default());
    let a_id = binder.declare_class("A", None, &[]);
    let a_decl = class_decl(&mut tokens, "A", None, vec![no_arg_method(&mut tokens, "run", Vec::new())]);
    binder.bind_type_ref(a_decl.token_range.clone(), a_id);
    let tree: Arc<dyn SyntaxTree> = Arc::new(InMemorySyntaxTree {
        file: tokens.file.clone(),
        declarations: vec![a_decl],
        imports: Vec::new(),
    });

    let (artifacts, stats) = run_build(binder, type_calculator, vec![tree]);
    let summary = Summary {
        classes: stats.classes,
        methods: stats.methods,
        edges: artifacts.call_graph.size(),
    };

    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    let rendered = serde_json::to_string(&summary).expect("serialize summary");
    file.write_all(rendered.as_bytes()).expect("write summary");

    let read_back = std::fs::read_to_string(file.path()).expect("read summary back");
    let round_tripped: Summary = serde_json::from_str(&read_back).expect("deserialize summary");
    assert_eq!(summary, round_tripped);
}

#[test]
fn empty_source_set_is_a_fatal_configuration_error() {
    let binder = Arc::new(InMemoryBinder::new());
    let type_calculator = Arc::new(InMemoryTypeCalculator::default());
    let source_files: Arc<dyn SourceFileProvider> = Arc::new(InMemorySourceFileProvider::new(Vec::new()));
    let progress: Arc<dyn ProgressReporter> = Arc::new(NullProgressReporter);

    let err = Build::new(BuildConfig::default())
        .run(source_files, binder, type_calculator, progress)
        .unwrap_err();
    assert!(err.downcast_ref::<CoreError>().is_some());
}
