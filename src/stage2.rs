//! Stage 2 (§4.2): single-threaded closure over the class graph built by
//! Stage 1 — reachable supers/subs, exclusion propagation, and inherited
//! field lists.

use std::collections::BTreeSet;

use crate::context::AnalysisContext;
use crate::ids::ClassId;
use crate::model::class::ClassFlags;

pub fn run(ctx: &AnalysisContext) {
    let all_classes: Vec<ClassId> = ctx
        .class_graph
        .classes
        .iter()
        .map(|entry| entry.key().clone())
        .collect();

    for class in &all_classes {
        close_supers(ctx, class, &mut BTreeSet::new());
    }
    for class in &all_classes {
        propagate_subs(ctx, class);
    }
    for class in &all_classes {
        compute_inherited_fields(ctx, class, &mut BTreeSet::new());
    }
}

/// Computes `reachable_supers[c]` and marks `c` excluded if any ancestor's
/// file is excluded. `visited` bounds tolerated cycles.
fn close_supers(ctx: &AnalysisContext, class: &ClassId, visited: &mut BTreeSet<ClassId>) -> (BTreeSet<ClassId>, BTreeSet<ClassId>) {
    if let Some(existing) = ctx.class_graph.reachable_supers.get(class) {
        return existing.clone();
    }
    if !visited.insert(class.clone()) {
        return (BTreeSet::new(), BTreeSet::new());
    }

    let mut supers = BTreeSet::new();
    let mut interfaces: BTreeSet<ClassId> = ctx
        .class_graph
        .direct_interfaces
        .get(class)
        .map(|v| v.clone())
        .unwrap_or_default();

    if let Some(super_id) = ctx.class_graph.immediate_super.get(class).map(|v| v.clone()) {
        supers.insert(super_id.clone());
        let (super_supers, super_interfaces) = close_supers(ctx, &super_id, visited);
        supers.extend(super_supers);
        interfaces.extend(super_interfaces);

        if is_ancestor_excluded(ctx, &super_id) {
            mark_excluded(ctx, class);
        }
    }

    let direct_interfaces: Vec<ClassId> = interfaces.iter().cloned().collect();
    for interface in &direct_interfaces {
        let (iface_supers, iface_interfaces) = close_supers(ctx, interface, visited);
        interfaces.extend(iface_supers);
        interfaces.extend(iface_interfaces);
        if is_ancestor_excluded(ctx, interface) {
            mark_excluded(ctx, class);
        }
    }

    let result = (supers, interfaces);
    ctx.class_graph
        .reachable_supers
        .insert(class.clone(), result.clone());
    result
}

fn is_ancestor_excluded(ctx: &AnalysisContext, ancestor: &ClassId) -> bool {
    ctx.class_graph.is_class_excluded(ancestor)
}

fn mark_excluded(ctx: &AnalysisContext, class: &ClassId) {
    if let Some(info) = ctx.class_graph.classes.get(class) {
        info.insert_flag(ClassFlags::EXCLUDED);
    }
}

fn propagate_subs(ctx: &AnalysisContext, class: &ClassId) {
    let (supers, interfaces) = ctx
        .class_graph
        .reachable_supers
        .get(class)
        .map(|v| v.clone())
        .unwrap_or_default();

    for ancestor in supers.iter().chain(interfaces.iter()) {
        if is_universal_top(ctx, ancestor) {
            // Invariant (§3): the universal top type never accumulates
            // subclasses in `reachable_subs`.
            continue;
        }
        ctx.class_graph
            .reachable_subs
            .entry(ancestor.clone())
            .or_default()
            .insert(class.clone());
    }
}

fn is_universal_top(ctx: &AnalysisContext, class: &ClassId) -> bool {
    if *class == ClassId::library(&ctx.config.universal_top_type) {
        return true;
    }
    ctx.class_graph
        .soft_types
        .get(class)
        .map(|t| t.is_universal_top())
        .unwrap_or(false)
}

fn compute_inherited_fields(ctx: &AnalysisContext, class: &ClassId, visited: &mut BTreeSet<ClassId>) -> Vec<std::sync::Arc<crate::model::FieldRecord>> {
    if !ctx.fields.inherited_list(class).is_empty() {
        return ctx.fields.inherited_list(class);
    }
    if !visited.insert(class.clone()) {
        return Vec::new();
    }

    let mut list = Vec::new();
    if let Some(super_id) = ctx.class_graph.immediate_super.get(class).map(|v| v.clone()) {
        let super_fields = compute_inherited_fields(ctx, &super_id, visited);
        list.extend(super_fields.into_iter().filter(|f| !f.is_private()));
    }
    list.extend(ctx.fields.declared_fields(class));

    ctx.fields.set_inherited_list(class.clone(), list.clone());
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildConfig;
    use crate::context::AnalysisContext;
    use crate::reference_impl::{InMemoryBinder, InMemoryTypeCalculator, NoopProgress};

    #[test]
    fn reachable_subs_excludes_universal_top_and_includes_transitive_subs() {
        let binder = InMemoryBinder::new();
        let a = binder.declare_class("A", None, &[]);
        let b = binder.declare_class("B", Some(a.clone()), &[]);
        let c = binder.declare_class("C", Some(b.clone()), &[]);

        let ctx = AnalysisContext::initialize(
            BuildConfig::default(),
            std::sync::Arc::new(binder),
            std::sync::Arc::new(InMemoryTypeCalculator::default()),
            std::sync::Arc::new(NoopProgress),
        );

        for id in [&a, &b, &c] {
            let index = ctx.ids.intern_class(id, id.as_str());
            ctx.class_graph.classes.insert(
                id.clone(),
                std::sync::Arc::new(crate::model::ClassInfo::new(
                    index,
                    id.as_str().to_string(),
                    id.as_str().to_string(),
                    ClassFlags::empty(),
                    None,
                    false,
                    Vec::new(),
                    crate::ids::MethodIndex::INVALID,
                    None,
                )),
            );
        }
        ctx.class_graph.immediate_super.insert(b.clone(), a.clone());
        ctx.class_graph.immediate_super.insert(c.clone(), b.clone());

        run(&ctx);

        let a_subs = ctx.class_graph.reachable_subs.get(&a).unwrap().clone();
        assert!(a_subs.contains(&b));
        assert!(a_subs.contains(&c));
    }
}
