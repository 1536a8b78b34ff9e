//! Stage 4 (§4.4): parallel per-file call-site analysis and edge emission,
//! once every file has finished Stage 3. The one cross-file structural pass
//! — linking each synthetic default constructor to its super's zero-arg
//! constructor — runs once, sequentially, after the per-file fan-out.

use std::collections::BTreeSet;

use rayon::prelude::*;

use crate::ast::{
    CallSiteNode, FieldDeclNode, InitializerNode, MemberNode, MethodDeclNode, SyntaxTree,
    TokenRange, TypeDeclKind, TypeDeclNode,
};
use crate::context::AnalysisContext;
use crate::ids::{ClassId, MethodIndex};
use crate::invocation;
use crate::method_identity;
use crate::model::method::MethodModifiers;
use crate::overload::{self, Candidate};
use crate::typedesc::TypeDescriptor;

pub fn run(ctx: &AnalysisContext, trees: &[std::sync::Arc<dyn SyntaxTree>]) -> anyhow::Result<()> {
    trees.par_iter().try_for_each(|tree| process_file(ctx, tree.as_ref()))?;
    link_constructors_structurally(ctx);
    Ok(())
}

fn process_file(ctx: &AnalysisContext, tree: &dyn SyntaxTree) -> anyhow::Result<()> {
    for decl in tree.type_declarations() {
        walk_decl(ctx, decl);
    }
    Ok(())
}

fn walk_decl(ctx: &AnalysisContext, node: &TypeDeclNode) {
    if node.is_annotation {
        return;
    }

    if let Some(class_id) = resolved_class_id(ctx, node) {
        if !ctx.class_graph.is_class_excluded(&class_id) {
            let super_id = ctx.class_graph.immediate_super.get(&class_id).map(|v| v.clone());
            for member in &node.members {
                match member {
                    MemberNode::Method(method) => process_method(ctx, &class_id, method, super_id.as_ref()),
                    MemberNode::Field(field) => process_field(ctx, &class_id, field),
                    MemberNode::Initializer(init) => process_initializer(ctx, &class_id, init),
                    MemberNode::EnumConstant(econst) => {
                        process_enum_constant(ctx, &class_id, &econst.token_range, &econst.args)
                    }
                    MemberNode::Nested(_) => {}
                }
            }
        }
    }

    for member in &node.members {
        if let MemberNode::Nested(inner) = member {
            walk_decl(ctx, inner);
        }
    }
}

fn resolved_class_id(ctx: &AnalysisContext, node: &TypeDeclNode) -> Option<ClassId> {
    if matches!(node.kind, TypeDeclKind::AnonymousClass) {
        return ctx
            .class_graph
            .anonymous_class_by_token
            .get(&node.token_range)
            .map(|v| v.clone());
    }
    ctx.binder.resolve_type(&node.token_range).and_then(|b| b.class).map(|c| c.class_id)
}

fn process_method(ctx: &AnalysisContext, class_id: &ClassId, node: &MethodDeclNode, super_id: Option<&ClassId>) {
    let Some(caller) = ctx.methods.index_for_token(&node.token_range) else {
        return;
    };

    if node.is_constructor {
        link_explicit_constructor(ctx, class_id, caller, node);
    }

    let Some(body) = &node.body else {
        return;
    };
    for site in &body.call_sites {
        process_call_site(ctx, class_id, caller, site, Some(node.name.as_str()), super_id);
    }
}

/// Links an explicit (non-synthetic) constructor to its class's synthetic
/// default constructor, unless its body opens with `this()`/`super()`
/// (§4.4 "Constructor chaining").
fn link_explicit_constructor(ctx: &AnalysisContext, class_id: &ClassId, caller: MethodIndex, node: &MethodDeclNode) {
    let chains_explicitly = node
        .body
        .as_ref()
        .map(|b| {
            b.call_sites
                .iter()
                .any(|cs| matches!(cs, CallSiteNode::ThisInvocation { .. } | CallSiteNode::SuperInvocation { .. }))
        })
        .unwrap_or(false);
    if chains_explicitly {
        return;
    }
    let Some(info) = ctx.class_graph.classes.get(class_id) else {
        return;
    };
    let default_ctor = info.default_constructor;
    if default_ctor.is_valid() && default_ctor != caller {
        emit_edge(ctx, caller, default_ctor);
    }
}

fn process_field(ctx: &AnalysisContext, class_id: &ClassId, field: &FieldDeclNode) {
    let Some(init) = &field.initializer else {
        return;
    };
    process_initializer_body(ctx, class_id, init.call_sites.iter(), field.modifiers.is_static);
}

fn process_initializer(ctx: &AnalysisContext, class_id: &ClassId, init: &InitializerNode) {
    process_initializer_body(ctx, class_id, init.body.call_sites.iter(), init.is_static);
}

/// Attributes every call site found in a field initializer or initializer
/// block to the class's default (instance) or static synthetic constructor
/// (§4.4 "Field initializers and initializer blocks").
fn process_initializer_body<'a>(
    ctx: &AnalysisContext,
    class_id: &ClassId,
    sites: impl Iterator<Item = &'a CallSiteNode>,
    is_static: bool,
) {
    let Some(info) = ctx.class_graph.classes.get(class_id) else {
        return;
    };
    let target = if is_static {
        info.static_constructor.unwrap_or(info.default_constructor)
    } else {
        info.default_constructor
    };
    if !target.is_valid() {
        return;
    }
    let super_id = ctx.class_graph.immediate_super.get(class_id).map(|v| v.clone());
    for site in sites {
        process_call_site(ctx, class_id, target, site, None, super_id.as_ref());
    }
}

/// Enum constant declarations induce an edge from the enum's static
/// constructor to the matching constructor of the enum class itself (§4.4).
fn process_enum_constant(ctx: &AnalysisContext, class_id: &ClassId, token_range: &TokenRange, args: &[TokenRange]) {
    let Some(info) = ctx.class_graph.classes.get(class_id) else {
        return;
    };
    let static_ctor = info.static_constructor.unwrap_or(info.default_constructor);
    if !static_ctor.is_valid() {
        return;
    }
    let site = CallSiteNode::EnumConstant {
        token_range: token_range.clone(),
        name: info.simple_name.clone(),
        args: args.to_vec(),
    };
    let identity = method_identity::identity_of_call_site(ctx, &site, None, None);
    if let Some((servicing, candidates)) = resolve_constructor(ctx, class_id, &identity) {
        emit_edge(ctx, static_ctor, servicing);
        ctx.record_invocation_candidates(token_range.clone(), servicing, candidates);
    }
}

fn process_call_site(
    ctx: &AnalysisContext,
    class_id: &ClassId,
    caller: MethodIndex,
    site: &CallSiteNode,
    enclosing_method_name: Option<&str>,
    enclosing_super: Option<&ClassId>,
) {
    match site {
        CallSiteNode::MethodInvocation { token_range, receiver, .. } => {
            let identity = method_identity::identity_of_call_site(ctx, site, enclosing_method_name, enclosing_super);
            let receiver_type = receiver.as_ref().and_then(|r| ctx.type_calculator.type_of(r));
            resolve_and_emit_virtual(ctx, class_id, caller, token_range, &identity, receiver_type.as_deref());
        }
        CallSiteNode::InstanceCreation {
            token_range,
            class_name,
            args,
            anonymous_body,
        } => {
            handle_instance_creation(ctx, caller, token_range, class_name, args, anonymous_body.as_ref());
        }
        CallSiteNode::ThisInvocation { token_range, .. } => {
            let identity = method_identity::identity_of_call_site(ctx, site, enclosing_method_name, enclosing_super);
            if let Some((servicing, candidates)) = resolve_constructor(ctx, class_id, &identity) {
                emit_edge(ctx, caller, servicing);
                ctx.record_invocation_candidates(token_range.clone(), servicing, candidates);
            }
        }
        CallSiteNode::SuperInvocation { token_range, .. } => {
            let Some(super_id) = enclosing_super else { return };
            let identity = method_identity::identity_of_call_site(ctx, site, enclosing_method_name, Some(super_id));
            if let Some((servicing, candidates)) = resolve_constructor(ctx, super_id, &identity) {
                emit_edge(ctx, caller, servicing);
                ctx.record_invocation_candidates(token_range.clone(), servicing, candidates);
            }
        }
        CallSiteNode::SuperMethodInvocation { token_range, .. } => {
            // Super-qualified method calls bind statically; they never fan
            // out across overrides the way a plain virtual call does.
            let Some(super_id) = enclosing_super else { return };
            let identity = method_identity::identity_of_call_site(ctx, site, enclosing_method_name, Some(super_id));
            if let Some(servicing) = resolve_servicing(ctx, super_id, &identity, false) {
                emit_edge(ctx, caller, servicing);
                ctx.record_invocation_candidates(token_range.clone(), servicing, std::iter::once(servicing).collect());
            }
        }
        CallSiteNode::EnumConstant { .. } => {
            // Enum-constant call sites are handled once at the declaration
            // (`process_enum_constant`); a bare occurrence inside a body is
            // not meaningful in this language model.
        }
        CallSiteNode::QualifiedName { token_range, .. } => {
            handle_qualified_name(ctx, caller, token_range);
        }
    }
}

/// Resolves a virtual-dispatch call site and emits edges to every candidate
/// override, falling back to known source subclasses of a library receiver
/// type when ordinary resolution finds nothing (§4.4).
fn resolve_and_emit_virtual(
    ctx: &AnalysisContext,
    class_id: &ClassId,
    caller: MethodIndex,
    token_range: &TokenRange,
    identity: &crate::model::MethodIdentity,
    receiver_type: Option<&dyn TypeDescriptor>,
) {
    let no_receiver = receiver_type.is_none();
    let search_start = receiver_type
        .and_then(|t| t.class_id())
        .unwrap_or_else(|| class_id.clone());

    if let Some(m0) = resolve_servicing(ctx, &search_start, identity, no_receiver) {
        let refined = parametric_refinement(ctx, &search_start, receiver_type, m0);
        emit_virtual_edges(ctx, caller, token_range, m0, refined.as_ref());
        return;
    }

    if let Some(t) = receiver_type {
        if t.is_library() {
            library_fallback(ctx, caller, token_range, t, identity);
        }
    }
}

/// Servicing-method lookup (§4.4): own class first, then the super chain
/// (superclass before interfaces at each level), then — for a call with no
/// receiver expression — the lexically enclosing class and its own chain.
fn resolve_servicing(
    ctx: &AnalysisContext,
    start_class: &ClassId,
    identity: &crate::model::MethodIdentity,
    try_enclosing: bool,
) -> Option<MethodIndex> {
    resolve_servicing_visited(ctx, start_class, identity, try_enclosing, &mut BTreeSet::new())
}

fn resolve_servicing_visited(
    ctx: &AnalysisContext,
    start_class: &ClassId,
    identity: &crate::model::MethodIdentity,
    try_enclosing: bool,
    visited_enclosing: &mut BTreeSet<ClassId>,
) -> Option<MethodIndex> {
    if let Some(m) = best_in_class(ctx, start_class, identity) {
        return Some(m);
    }
    if let Some(m) = search_super_chain(ctx, start_class, identity, &mut BTreeSet::new()) {
        return Some(m);
    }
    if try_enclosing && visited_enclosing.insert(start_class.clone()) {
        if let Some(enclosing) = ctx.class_graph.enclosing_class.get(start_class).map(|v| v.clone()) {
            return resolve_servicing_visited(ctx, &enclosing, identity, true, visited_enclosing);
        }
    }
    None
}

fn search_super_chain(
    ctx: &AnalysisContext,
    class_id: &ClassId,
    identity: &crate::model::MethodIdentity,
    visited: &mut BTreeSet<ClassId>,
) -> Option<MethodIndex> {
    if !visited.insert(class_id.clone()) {
        return None;
    }

    if let Some(super_id) = ctx.class_graph.immediate_super.get(class_id).map(|v| v.clone()) {
        if let Some(m) = best_in_class(ctx, &super_id, identity) {
            return Some(m);
        }
        if let Some(m) = search_super_chain(ctx, &super_id, identity, visited) {
            return Some(m);
        }
    }

    if let Some(interfaces) = ctx.class_graph.direct_interfaces.get(class_id).map(|v| v.clone()) {
        for iface in interfaces.iter() {
            if let Some(m) = best_in_class(ctx, iface, identity) {
                return Some(m);
            }
            if let Some(m) = search_super_chain(ctx, iface, identity, visited) {
                return Some(m);
            }
        }
    }

    None
}

/// Best non-constructor match for `identity` among `class_id`'s own declared
/// methods (§4.4 "Signature matching" / "Best-match selection").
fn best_in_class(ctx: &AnalysisContext, class_id: &ClassId, identity: &crate::model::MethodIdentity) -> Option<MethodIndex> {
    let candidates: Vec<Candidate<MethodIndex>> = ctx
        .methods
        .declared_in(class_id)
        .into_iter()
        .filter(|b| !b.modifiers().contains(MethodModifiers::CONSTRUCTOR) && b.identity.name == identity.name)
        .map(|b| {
            let is_varargs = ctx.methods.is_varargs(b.index);
            let verdict = overload::best_match(identity, &b.identity, is_varargs);
            Candidate {
                item: b.index,
                verdict,
                formal_types: b.identity.param_types.clone(),
                is_varargs,
            }
        })
        .collect();
    overload::select_best(candidates).map(|c| c.item)
}

fn resolve_constructor(
    ctx: &AnalysisContext,
    class_id: &ClassId,
    identity: &crate::model::MethodIdentity,
) -> Option<(MethodIndex, BTreeSet<MethodIndex>)> {
    let candidates: Vec<Candidate<MethodIndex>> = ctx
        .methods
        .declared_in(class_id)
        .into_iter()
        .filter(|b| b.modifiers().contains(MethodModifiers::CONSTRUCTOR))
        .map(|b| {
            let is_varargs = ctx.methods.is_varargs(b.index);
            let verdict = overload::best_match(identity, &b.identity, is_varargs);
            Candidate {
                item: b.index,
                verdict,
                formal_types: b.identity.param_types.clone(),
                is_varargs,
            }
        })
        .collect();
    overload::select_best(candidates).map(|c| (c.item, std::iter::once(c.item).collect()))
}

/// Emits the virtual-dispatch fan-out for a resolved servicing method: static
/// methods emit a single edge, instance methods emit one edge per candidate
/// override and mark every emitted candidate `POSSIBLY_POLYMORPHIC` once more
/// than one remains (§4.4 point 4 and "invocation-type propagation").
///
/// `refined_identity`, when present, is the receiver's parametric-refinement
/// identity (§4.4 "Parametric-type refinement"): candidates other than `m0`
/// itself are dropped unless they are an exact override of it, so a subclass
/// that re-specializes a generic method for an incompatible type argument
/// never gets wired as a callee of a site whose receiver pins a different one.
fn emit_virtual_edges(
    ctx: &AnalysisContext,
    caller: MethodIndex,
    token_range: &TokenRange,
    m0: MethodIndex,
    refined_identity: Option<&crate::model::MethodIdentity>,
) {
    let Some(m0_bundle) = ctx.methods.get(m0) else {
        return;
    };

    if m0_bundle.modifiers().contains(MethodModifiers::STATIC) {
        emit_edge(ctx, caller, m0);
        ctx.record_invocation_candidates(token_range.clone(), m0, std::iter::once(m0).collect());
        return;
    }

    let candidates = invocation::candidates_for(ctx, m0);
    let mut emitted = BTreeSet::new();
    for &candidate in candidates.iter() {
        if let Some(bundle) = ctx.methods.get(candidate) {
            if candidate != m0 {
                if let Some(refined) = refined_identity {
                    if !bundle.identity.is_exact_override_of(refined) {
                        continue;
                    }
                }
            }
            if !bundle.modifiers().contains(MethodModifiers::BODYLESS) {
                emit_edge(ctx, caller, candidate);
            }
            emitted.insert(candidate);
        }
    }
    if emitted.len() > 1 {
        for &candidate in &emitted {
            if let Some(bundle) = ctx.methods.get(candidate) {
                bundle.set_possibly_polymorphic();
            }
        }
    }
    ctx.record_invocation_candidates(token_range.clone(), m0, emitted);
}

/// Parametric-type refinement (§4.4): when the receiver's proper type is a
/// parameterized specialization of a declared generic container, recovers
/// the symbol substitution and rebuilds `m0`'s identity with it applied, so
/// callers downstream can filter candidate overrides to the ones consistent
/// with the pinned type argument.
fn parametric_refinement(
    ctx: &AnalysisContext,
    declared_class: &ClassId,
    receiver_type: Option<&dyn TypeDescriptor>,
    m0: MethodIndex,
) -> Option<crate::model::MethodIdentity> {
    let receiver_type = receiver_type?;
    let declared = ctx.class_graph.parametric_classes.get(declared_class)?.clone();
    let mapping = declared.parse_and_map_symbols(receiver_type)?;
    let m0_bundle = ctx.methods.get(m0)?;
    Some(crate::model::refine_identity(&m0_bundle.identity, &mapping))
}

/// Library super-type fallback (§4.4): when resolution at the receiver's
/// (library) declared type fails, try every known source subclass; the
/// first one that matches becomes the recorded servicing method.
fn library_fallback(
    ctx: &AnalysisContext,
    caller: MethodIndex,
    token_range: &TokenRange,
    receiver_type: &dyn TypeDescriptor,
    identity: &crate::model::MethodIdentity,
) {
    let Some(lib_class) = receiver_type.class_id() else {
        return;
    };
    let subs = ctx.class_graph.reachable_subs.get(&lib_class).map(|v| v.clone()).unwrap_or_default();

    let mut servicing: Option<MethodIndex> = None;
    let mut emitted = BTreeSet::new();
    for sub in &subs {
        if let Some(m) = best_in_class(ctx, sub, identity) {
            emit_edge(ctx, caller, m);
            emitted.insert(m);
            if servicing.is_none() {
                servicing = Some(m);
            }
        }
    }
    if let Some(servicing) = servicing {
        ctx.record_invocation_candidates(token_range.clone(), servicing, emitted);
    }
}

fn handle_instance_creation(
    ctx: &AnalysisContext,
    caller: MethodIndex,
    token_range: &TokenRange,
    class_name: &str,
    args: &[TokenRange],
    anonymous_body: Option<&TokenRange>,
) {
    if let Some(anon_token) = anonymous_body {
        handle_anonymous_instance_creation(ctx, caller, token_range, class_name, args, anon_token);
        return;
    }

    let Some(target_id) = resolve_instance_creation_target(ctx, token_range) else {
        return;
    };
    let site = CallSiteNode::InstanceCreation {
        token_range: token_range.clone(),
        class_name: class_name.to_string(),
        args: args.to_vec(),
        anonymous_body: None,
    };
    let identity = method_identity::identity_of_call_site(ctx, &site, None, None);
    if let Some((servicing, candidates)) = resolve_constructor(ctx, &target_id, &identity) {
        emit_edge(ctx, caller, servicing);
        ctx.record_invocation_candidates(token_range.clone(), servicing, candidates);
    }
}

/// An anonymous-class instance creation links the caller to the anonymous
/// class's own synthetic default constructor, and that default constructor
/// to whichever constructor of the named parent type the creation's
/// argument list selects (§4.4 "Constructor chaining").
fn handle_anonymous_instance_creation(
    ctx: &AnalysisContext,
    caller: MethodIndex,
    token_range: &TokenRange,
    class_name: &str,
    args: &[TokenRange],
    anon_token: &TokenRange,
) {
    let Some(anon_class) = ctx.class_graph.anonymous_class_by_token.get(anon_token).map(|v| v.clone()) else {
        return;
    };
    let Some(anon_info) = ctx.class_graph.classes.get(&anon_class) else {
        return;
    };
    let anon_default = anon_info.default_constructor;
    if !anon_default.is_valid() {
        return;
    }
    emit_edge(ctx, caller, anon_default);
    ctx.record_invocation_candidates(token_range.clone(), anon_default, std::iter::once(anon_default).collect());

    if let Some(parent_id) = resolve_instance_creation_target(ctx, token_range) {
        let site = CallSiteNode::InstanceCreation {
            token_range: token_range.clone(),
            class_name: class_name.to_string(),
            args: args.to_vec(),
            anonymous_body: None,
        };
        let identity = method_identity::identity_of_call_site(ctx, &site, None, None);
        if let Some((servicing, _)) = resolve_constructor(ctx, &parent_id, &identity) {
            emit_edge(ctx, anon_default, servicing);
        }
    }
}

/// `token_range` on an `InstanceCreation` site names the type reference
/// itself (the `Foo` in `new Foo(...)`), so it resolves through the binder
/// exactly like any other type reference.
fn resolve_instance_creation_target(ctx: &AnalysisContext, token_range: &TokenRange) -> Option<ClassId> {
    ctx.binder.resolve_type(token_range).and_then(|b| b.class).map(|c| c.class_id)
}

/// A qualified name resolving to a static field of class `X` induces an edge
/// to `X`'s static constructor, reflecting static-initialization order.
fn handle_qualified_name(ctx: &AnalysisContext, caller: MethodIndex, token_range: &TokenRange) {
    let Some(owner) = ctx.binder.resolve_type(token_range).and_then(|b| b.class).map(|c| c.class_id) else {
        return;
    };
    let Some(info) = ctx.class_graph.classes.get(&owner) else {
        return;
    };
    if let Some(static_ctor) = info.static_constructor {
        if static_ctor.is_valid() {
            emit_edge(ctx, caller, static_ctor);
        }
    }
}

/// Adds a primary edge and, when both endpoints have a known qualified name,
/// its export-only extended-call-graph counterpart (§4.5).
fn emit_edge(ctx: &AnalysisContext, caller: MethodIndex, callee: MethodIndex) {
    ctx.call_graph.add_edge(caller, callee);
    if let (Some(cq), Some(eq)) = (ctx.method_qname(caller), ctx.method_qname(callee)) {
        ctx.call_graph.add_extended_edge(&cq, &eq);
    }
}

/// Links every class's synthetic default constructor to its super's zero-arg
/// constructor — implemented if one exists, otherwise the super's own
/// synthetic default (§4.4). Runs once after all files finish Stage 4's
/// per-call-site pass, since it depends only on the finished class graph.
fn link_constructors_structurally(ctx: &AnalysisContext) {
    for entry in ctx.class_graph.classes.iter() {
        let class_id = entry.key().clone();
        let info = entry.value().clone();
        if ctx.class_graph.is_class_excluded(&class_id) {
            continue;
        }
        if !info.default_constructor.is_valid() {
            continue;
        }
        let Some(super_id) = ctx.class_graph.immediate_super.get(&class_id).map(|v| v.clone()) else {
            continue;
        };
        if ctx.class_graph.is_class_excluded(&super_id) {
            continue;
        }
        let Some(super_info) = ctx.class_graph.classes.get(&super_id) else {
            continue;
        };
        let zero_arg_identity = crate::model::MethodIdentity {
            name: super_info.simple_name.clone(),
            return_type: None,
            param_types: Vec::new(),
        };
        let target = resolve_constructor(ctx, &super_id, &zero_arg_identity)
            .map(|(m, _)| m)
            .unwrap_or(super_info.default_constructor);
        if target.is_valid() && target != info.default_constructor {
            emit_edge(ctx, info.default_constructor, target);
        }
    }
}
