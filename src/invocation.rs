//! Invocation-type propagation (§4.4): given a servicing method `m0`
//! declared in class `c0`, computes the set of overriding methods a
//! virtual call at a given receiver type could actually dispatch to, and
//! for each candidate, which classes can reach it.
//!
//! The specification describes this as a contender/purge worklist walk
//! over the subclass lattice: an override at `c` creates a scratch pad
//! that is carried upward through supers, purging subscriber classes in
//! `c`'s own dominated subtree as it passes them, and absorbing
//! "contender" classes with no override of their own into the nearest
//! ancestor's scratch pad. That walk computes, for every class in `subs`,
//! the nearest ancestor-or-self that declares an exact override of `m0` —
//! a "nearest dominating override" assignment. The same assignment falls
//! out of plain set algebra once every override's subtree is known, which
//! is what this module computes instead: for candidate `c`, the classes it
//! services are its own dominated subtree minus the dominated subtrees of
//! every other candidate nested inside it. This is equivalent to the
//! worklist walk (same nearest-override assignment) and does not require
//! mutable scratch pads or a purge pass.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::context::AnalysisContext;
use crate::ids::{ClassId, MethodIndex};
use crate::model::InvocationType;

/// The full set of methods a virtual call resolving to `m0` could dispatch
/// to, including `m0` itself. Memoized per `m0` since the class/method
/// registries are stable for the lifetime of Stage 4.
pub fn candidates_for(ctx: &AnalysisContext, m0: MethodIndex) -> Arc<Vec<MethodIndex>> {
    if let Some(cached) = ctx.methods.candidate_cache.get(&m0) {
        return cached.clone();
    }

    let Some(m0_bundle) = ctx.methods.get(m0) else {
        let empty = Arc::new(Vec::new());
        ctx.methods.candidate_cache.insert(m0, empty.clone());
        return empty;
    };

    if m0_bundle.modifiers().contains(crate::model::MethodModifiers::STATIC) {
        // Static methods never dispatch polymorphically (§4.4 point 4): the
        // only candidate is `m0` itself.
        let result = Arc::new(vec![m0]);
        ctx.methods.candidate_cache.insert(m0, result.clone());
        return result;
    }

    let c0 = m0_bundle.container_class.clone();
    // Excluded classes (test/example/auto-generated files) never contribute
    // an edge on either endpoint (invariant #4): a subclass marked excluded
    // during Stage 2's downward propagation must not surface as a candidate
    // override here, even though it is still present in `reachable_subs` for
    // the benefit of that same propagation.
    let subs: BTreeSet<ClassId> = ctx
        .class_graph
        .reachable_subs_or_self(&c0)
        .into_iter()
        .filter(|c| !ctx.class_graph.is_class_excluded(c))
        .collect();

    let mut overrides: Vec<(ClassId, MethodIndex)> = Vec::new();
    for class in &subs {
        if let Some(method) = find_exact_override(ctx, class, &m0_bundle) {
            overrides.push((class.clone(), method));
        }
    }

    if overrides.is_empty() {
        let result = Arc::new(vec![m0]);
        ctx.methods.candidate_cache.insert(m0, result.clone());
        return result;
    }

    let dominated = |c: &ClassId| -> BTreeSet<ClassId> {
        ctx.class_graph
            .reachable_subs_or_self(c)
            .intersection(&subs)
            .cloned()
            .collect()
    };

    let mut candidate_indices = Vec::with_capacity(overrides.len());
    for (class, method) in &overrides {
        let own = dominated(class);
        let mut callers = own.clone();
        for (other_class, _) in &overrides {
            if other_class == class {
                continue;
            }
            if own.contains(other_class) {
                for shadowed in dominated(other_class) {
                    callers.remove(&shadowed);
                }
            }
        }
        ctx.methods.get(*method).unwrap().set_invocation_type(InvocationType {
            callee: *method,
            callers_in_classes: callers,
        });
        candidate_indices.push(*method);
    }

    m0_bundle.set_subclass_invocation_indices(candidate_indices.iter().copied().collect());

    let result = Arc::new(candidate_indices);
    ctx.methods.candidate_cache.insert(m0, result.clone());
    result
}

fn find_exact_override(
    ctx: &AnalysisContext,
    class: &ClassId,
    m0_bundle: &crate::model::MethodInfoBundle,
) -> Option<MethodIndex> {
    ctx.methods
        .declared_in(class)
        .into_iter()
        .find(|candidate| candidate.identity.is_exact_override_of(&m0_bundle.identity))
        .map(|candidate| candidate.index)
}
