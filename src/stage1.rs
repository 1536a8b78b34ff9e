//! Stage 1 (§4.2): parallel, per-file class/field skeleton construction and
//! test/auto-generated exclusion detection.

use rayon::prelude::*;

use crate::ast::{FieldDeclNode, MemberNode, SyntaxTree, TypeDeclKind, TypeDeclNode};
use crate::context::AnalysisContext;
use crate::excluded;
use crate::ids::ClassId;
use crate::model::class::ClassFlags;
use crate::model::method::{MethodIdentity, MethodModifiers};
use crate::model::{ClassInfo, FieldRecord, MethodInfoBundle};

pub fn run(ctx: &AnalysisContext, trees: &[std::sync::Arc<dyn SyntaxTree>]) -> anyhow::Result<()> {
    trees.par_iter().try_for_each(|tree| process_file(ctx, tree.as_ref()))
}

fn process_file(ctx: &AnalysisContext, tree: &dyn SyntaxTree) -> anyhow::Result<()> {
    let file = tree.file().clone();
    let excluded_file = excluded::is_excluded_file(&ctx.config, &file, tree.imports());
    if excluded_file {
        ctx.class_graph.excluded_files.insert(file.clone());
    }

    for decl in tree.type_declarations() {
        walk_decl(ctx, &file, decl, excluded_file, false);
    }
    Ok(())
}

fn walk_decl(
    ctx: &AnalysisContext,
    file: &crate::ast::FilePath,
    node: &TypeDeclNode,
    excluded_file: bool,
    nested: bool,
) {
    if node.is_annotation {
        // Annotation types are not walked (§4.2: "for every non-annotation
        // type declaration"); their members are not registered either.
        return;
    }
    register_type_decl(ctx, file, node, excluded_file, nested);

    for member in &node.members {
        if let MemberNode::Nested(inner) = member {
            walk_decl(ctx, file, inner, excluded_file, true);
        }
    }
}

fn register_type_decl(
    ctx: &AnalysisContext,
    file: &crate::ast::FilePath,
    node: &TypeDeclNode,
    excluded_file: bool,
    nested: bool,
) {
    let class_id = match ctx
        .binder
        .resolve_type(&node.token_range)
        .and_then(|b| b.class)
    {
        Some(binding) if !matches!(node.kind, TypeDeclKind::AnonymousClass) => binding.class_id,
        _ => {
            // Anonymous classes are identified by their own token-range,
            // never by binding, since the binder may collapse distinct
            // anonymous classes onto the same id (§3).
            let id = ClassId::new(format!("{}#{}:{}", file, node.token_range.offset, node.name));
            if matches!(node.kind, TypeDeclKind::AnonymousClass) {
                ctx.class_graph
                    .anonymous_class_by_token
                    .insert(node.token_range.clone(), id.clone());
            }
            id
        }
    };

    let is_auto_generated = {
        let super_name = node
            .super_type
            .as_ref()
            .and_then(|r| ctx.binder.resolve_type(r))
            .and_then(|b| b.class)
            .map(|c| c.class_id.as_str().to_string());
        let interface_names: Vec<String> = node
            .interfaces
            .iter()
            .filter_map(|r| ctx.binder.resolve_type(r))
            .filter_map(|b| b.class)
            .map(|c| c.class_id.as_str().to_string())
            .collect();
        excluded::is_auto_generated(&ctx.config, super_name.as_deref(), &interface_names)
    };

    ctx.class_graph.class_file.insert(class_id.clone(), file.clone());

    if excluded_file {
        ctx.class_graph
            .excluded_classes
            .insert(class_id.clone(), file.clone());
    }
    if is_auto_generated {
        ctx.class_graph
            .auto_generated_excluded_classes
            .insert(class_id.clone());
        ctx.class_graph
            .auto_generated_excluded_files
            .insert(file.clone());
    }

    // Excluded classes still record declarations (so Stage 2 can propagate
    // exclusion to subclasses) but never get a bit-index: they cannot
    // participate in method resolution (§4.2).
    let is_excluded = excluded_file || is_auto_generated;

    let mut flags = ClassFlags::empty();
    if nested {
        flags.insert(ClassFlags::NESTED);
    }
    if node.enclosing_method.is_some() {
        flags.insert(ClassFlags::NESTED);
    }
    if excluded_file {
        flags.insert(ClassFlags::EXCLUDED);
    }
    if is_auto_generated {
        flags.insert(ClassFlags::AUTO_GENERATED_EXCLUDED);
    }

    let has_static_field = node.members.iter().any(|m| match m {
        MemberNode::Field(f) => f.modifiers.is_static,
        _ => false,
    });
    if has_static_field {
        flags.insert(ClassFlags::STATIC);
    }

    let signature = format!("{}::{}", file, node.name);

    let simple_name = if matches!(node.kind, TypeDeclKind::AnonymousClass) {
        String::new()
    } else {
        node.name.clone()
    };

    let index = if is_excluded {
        crate::ids::ClassIndex::INVALID
    } else {
        ctx.ids.intern_class(&class_id, &signature)
    };

    // Register declared fields before constructing the record so the
    // default/static synthetic constructor creation below can see whether
    // any static field exists.
    for member in &node.members {
        if let MemberNode::Field(field) = member {
            register_field(ctx, &class_id, field);
        }
    }

    // The default constructor's identity name follows the class's simple
    // name, matching the convention `new Foo(...)`/`this(...)`/`super(...)`
    // call sites synthesize (§4.3); the `<init>` marker survives only in the
    // hash/signature string. The static initializer is never a servicing-
    // lookup target, so its identity name can stay the raw marker.
    let default_ctor_name = if simple_name.is_empty() {
        "<init>"
    } else {
        simple_name.as_str()
    };
    let default_ctor = synthetic_constructor(
        ctx,
        &class_id,
        "<init>",
        default_ctor_name,
        MethodModifiers::BODYLESS | MethodModifiers::CONSTRUCTOR,
    );
    let static_ctor = if has_static_field {
        Some(synthetic_constructor(
            ctx,
            &class_id,
            "<clinit>",
            "<clinit>",
            MethodModifiers::BODYLESS | MethodModifiers::CONSTRUCTOR | MethodModifiers::STATIC,
        ))
    } else {
        None
    };

    if let Some(qname) = ctx.type_calculator.qualified_name_of(&node.token_range, false) {
        ctx.record_method_qname(default_ctor, format!("{}.<init>", qname));
        if let Some(static_ctor) = static_ctor {
            ctx.record_method_qname(static_ctor, format!("{}.<clinit>", qname));
        }
    }

    if let Some(super_range) = &node.super_type {
        if let Some(super_id) = resolve_class_id(ctx, super_range) {
            ctx.class_graph
                .immediate_super
                .insert(class_id.clone(), super_id);
        }
    } else if !matches!(node.kind, TypeDeclKind::Interface) {
        // No explicit super: the universal top type. Left unrecorded as an
        // explicit super here; the class-graph closure in Stage 2 treats a
        // missing `immediate_super` entry as "roots at the universal top"
        // without ever adding it to `reachable_subs` (§3 invariant).
    }

    let mut interfaces = std::collections::BTreeSet::new();
    for interface_range in &node.interfaces {
        if let Some(id) = resolve_class_id(ctx, interface_range) {
            interfaces.insert(id);
        }
    }
    if !interfaces.is_empty() {
        ctx.class_graph
            .direct_interfaces
            .insert(class_id.clone(), interfaces);
    }

    if let Some(enclosing_method) = &node.enclosing_method {
        if let Some(method_binding) = ctx.binder.resolve_method(enclosing_method) {
            ctx.class_graph
                .enclosing_method
                .insert(class_id.clone(), method_binding.hash);
            ctx.class_graph
                .enclosing_class
                .insert(class_id.clone(), method_binding.owner.class_id.clone());
            ctx.class_graph
                .inner_of
                .entry(method_binding.owner.class_id)
                .or_default()
                .insert(class_id.clone());
        }
    }

    let type_parameters = node.type_parameters.clone();
    let soft_type: std::sync::Arc<dyn crate::typedesc::TypeDescriptor> =
        std::sync::Arc::new(DeclaredSoftType {
            class_id: class_id.clone(),
            name: signature.clone(),
            type_parameters: type_parameters.clone(),
        });
    if !type_parameters.is_empty() {
        ctx.class_graph
            .parametric_classes
            .insert(class_id.clone(), soft_type.clone());
    }
    ctx.class_graph.soft_types.insert(class_id.clone(), soft_type);

    let info = ClassInfo::new(
        index,
        signature,
        simple_name,
        flags,
        Some(node.token_range.clone()),
        false,
        type_parameters,
        default_ctor,
        static_ctor,
    );
    ctx.class_graph.classes.insert(class_id, std::sync::Arc::new(info));
}

fn resolve_class_id(ctx: &AnalysisContext, range: &crate::ast::TokenRange) -> Option<ClassId> {
    ctx.binder.resolve_type(range).and_then(|b| b.class).map(|c| c.class_id)
}

fn register_field(ctx: &AnalysisContext, class_id: &ClassId, field: &FieldDeclNode) {
    let record = FieldRecord::new(
        field.name.clone(),
        class_id.clone(),
        field.modifiers,
        field.token_range.clone(),
    );
    if let Some(soft) = ctx.type_calculator.type_of(&field.token_range) {
        record.set_soft_type(soft);
    }
    ctx.fields.register(record);
}

fn synthetic_constructor(
    ctx: &AnalysisContext,
    class_id: &ClassId,
    marker: &str,
    identity_name: &str,
    modifiers: MethodModifiers,
) -> crate::ids::MethodIndex {
    let hash = crate::ids::MethodHash::new(format!("{}::{}", class_id.as_str(), marker));
    let identity = MethodIdentity {
        name: identity_name.to_string(),
        return_type: None,
        param_types: Vec::new(),
    };
    let index = ctx.ids.intern_method(&hash, hash.as_str());
    let bundle = MethodInfoBundle::new(hash, index, class_id.clone(), marker.to_string(), identity, modifiers);
    ctx.methods.register(bundle);
    ctx.call_graph.mark_synthetic(index);
    index
}

/// Soft type for a declared class: only `name` and `type_parameters` are
/// meaningful before the method/field registries are complete.
#[derive(Debug)]
struct DeclaredSoftType {
    class_id: ClassId,
    name: String,
    type_parameters: Vec<String>,
}

impl crate::typedesc::TypeDescriptor for DeclaredSoftType {
    fn name(&self) -> &str {
        &self.name
    }

    fn erasure(&self) -> std::sync::Arc<dyn crate::typedesc::TypeDescriptor> {
        std::sync::Arc::new(DeclaredSoftType {
            class_id: self.class_id.clone(),
            name: self.name.clone(),
            type_parameters: Vec::new(),
        })
    }

    fn matches(&self, other: &dyn crate::typedesc::TypeDescriptor) -> bool {
        self.name == other.name()
    }

    fn class_id(&self) -> Option<ClassId> {
        Some(self.class_id.clone())
    }

    fn type_parameters(&self) -> Vec<String> {
        self.type_parameters.clone()
    }
}
