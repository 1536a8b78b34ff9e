//! Stage 3 (§4.2): parallel per-file method registration and proper-type
//! recomputation for fields, once the class and field skeletons are
//! complete and closed over (Stage 2 finished for every file).

use rayon::prelude::*;

use crate::ast::{MemberNode, MethodDeclNode, SyntaxTree, TypeDeclKind, TypeDeclNode};
use crate::context::AnalysisContext;
use crate::ids::{ClassId, MethodHash};
use crate::method_identity;
use crate::model::MethodInfoBundle;

pub fn run(ctx: &AnalysisContext, trees: &[std::sync::Arc<dyn SyntaxTree>]) -> anyhow::Result<()> {
    trees.par_iter().try_for_each(|tree| process_file(ctx, tree.as_ref()))
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
            let is_interface = matches!(node.kind, TypeDeclKind::Interface);
            for member in &node.members {
                if let MemberNode::Method(method) = member {
                    register_method(ctx, &class_id, method, is_interface);
                }
            }
            recompute_field_proper_types(ctx, &class_id);
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

fn register_method(ctx: &AnalysisContext, class_id: &ClassId, node: &MethodDeclNode, is_interface: bool) {
    let (identity, modifiers) = method_identity::identity_of_declaration(ctx, node, is_interface);

    let param_signature: String = identity
        .param_types
        .iter()
        .map(|t| t.erasure().name().to_string())
        .collect::<Vec<_>>()
        .join(",");
    let hash = MethodHash::new(format!(
        "{}::{}({})",
        class_id.as_str(),
        identity.name,
        param_signature
    ));
    let signature = format!("{}.{}({})", class_id.as_str(), identity.name, param_signature);
    let index = ctx.ids.intern_method(&hash, &signature);

    let bundle = MethodInfoBundle::new(hash, index, class_id.clone(), signature, identity, modifiers);
    ctx.methods.register(bundle);
    ctx.methods.record_token(node.token_range.clone(), index);

    if node.params.last().map(|p| p.is_variadic).unwrap_or(false) {
        ctx.methods.mark_varargs(index);
    }

    if let Some(qname) = ctx.type_calculator.qualified_name_of(&node.token_range, false) {
        ctx.record_method_qname(index, qname);
    }
}

fn recompute_field_proper_types(ctx: &AnalysisContext, class_id: &ClassId) {
    for field in ctx.fields.declared_fields(class_id) {
        if let Some(proper) = ctx.type_calculator.proper_field_type(&field.declaration) {
            field.set_proper_type(proper);
        }
    }
}
