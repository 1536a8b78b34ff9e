//! The call graph (§3, §4.5, §6): two dual maps (`caller → callees`,
//! `callee → callers`) kept in sync on every insert, a monotonically
//! growing size counter, and an auxiliary qualified-name-keyed map used
//! only for export (§4.5) — it never participates in analysis.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::{DashMap, DashSet};

use crate::ids::MethodIndex;

/// Bidirectional, duplicate-suppressing method-level call graph.
///
/// Edge insertion is atomic at the map-entry granularity (§5): each side of
/// an edge lives in its own `DashMap` entry, and a `BTreeSet` tolerates
/// concurrent duplicate-suppressing inserts once the entry lock is held.
#[derive(Default)]
pub struct CallGraph {
    callers_to_callees: DashMap<MethodIndex, BTreeSet<MethodIndex>>,
    callees_to_callers: DashMap<MethodIndex, BTreeSet<MethodIndex>>,
    size: AtomicUsize,
    /// `qname → {qname}`, populated alongside the primary graph whenever
    /// both endpoints have a known qualified name (§4.5). Export-only.
    extended: DashMap<String, BTreeSet<String>>,
    /// Synthetic default/static constructors (§4.2), recorded so callers can
    /// ask `callees_of`/`callers_of`/`root_methods` to exclude them (§6):
    /// they exist purely to carry constructor-chaining and initializer
    /// edges, not as program entry points or callable targets.
    synthetic: DashSet<MethodIndex>,
}

impl CallGraph {
    /// Marks `method` as a synthetic link-method (a synthetic default or
    /// static constructor), for `include_synthetic = false` filtering.
    pub fn mark_synthetic(&self, method: MethodIndex) {
        self.synthetic.insert(method);
    }

    pub fn is_synthetic(&self, method: MethodIndex) -> bool {
        self.synthetic.contains(&method)
    }

    /// Adds `caller → callee`, deduplicating against an existing edge.
    /// Returns `true` if this was a genuinely new edge.
    pub fn add_edge(&self, caller: MethodIndex, callee: MethodIndex) -> bool {
        let inserted_forward = self
            .callers_to_callees
            .entry(caller)
            .or_default()
            .insert(callee);
        self.callees_to_callers
            .entry(callee)
            .or_default()
            .insert(caller);
        if inserted_forward {
            self.size.fetch_add(1, Ordering::SeqCst);
        }
        inserted_forward
    }

    /// Adds the qualified-name-keyed edge used only for export (§4.5); does
    /// not affect `size` or any analysis query.
    pub fn add_extended_edge(&self, caller_qname: &str, callee_qname: &str) {
        self.extended
            .entry(caller_qname.to_string())
            .or_default()
            .insert(callee_qname.to_string());
    }

    pub fn callees_of(&self, method: MethodIndex, include_synthetic: bool) -> BTreeSet<MethodIndex> {
        let callees = self
            .callers_to_callees
            .get(&method)
            .map(|v| v.clone())
            .unwrap_or_default();
        if include_synthetic {
            callees
        } else {
            callees.into_iter().filter(|c| !self.is_synthetic(*c)).collect()
        }
    }

    pub fn callers_of(&self, method: MethodIndex, include_synthetic: bool) -> BTreeSet<MethodIndex> {
        let callers = self
            .callees_to_callers
            .get(&method)
            .map(|v| v.clone())
            .unwrap_or_default();
        if include_synthetic {
            callers
        } else {
            callers.into_iter().filter(|c| !self.is_synthetic(*c)).collect()
        }
    }

    pub fn size(&self) -> usize {
        self.size.load(Ordering::SeqCst)
    }

    /// Methods with no recorded callers: entry points into the analyzed
    /// program (§6), excluding synthetic link-methods. Computed by scanning
    /// the caller map for indices never seen as a callee, consistent with
    /// "the core inserts these at the end by scanning the caller map".
    pub fn root_methods(&self) -> BTreeSet<MethodIndex> {
        self.callers_to_callees
            .iter()
            .map(|entry| *entry.key())
            .filter(|caller| !self.callees_to_callers.contains_key(caller))
            .filter(|caller| !self.is_synthetic(*caller))
            .collect()
    }

    pub fn extended_callees_of(&self, caller_qname: &str) -> BTreeSet<String> {
        self.extended
            .get(caller_qname)
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    pub fn extended_edge_count(&self) -> usize {
        self.extended.iter().map(|e| e.value().len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_edges_are_suppressed() {
        let graph = CallGraph::default();
        assert!(graph.add_edge(MethodIndex(0), MethodIndex(1)));
        assert!(!graph.add_edge(MethodIndex(0), MethodIndex(1)));
        assert_eq!(graph.size(), 1);
        assert_eq!(graph.callees_of(MethodIndex(0), true).len(), 1);
    }

    #[test]
    fn caller_and_callee_maps_stay_symmetric() {
        let graph = CallGraph::default();
        graph.add_edge(MethodIndex(0), MethodIndex(1));
        graph.add_edge(MethodIndex(2), MethodIndex(1));
        assert!(graph.callers_of(MethodIndex(1), true).contains(&MethodIndex(0)));
        assert!(graph.callers_of(MethodIndex(1), true).contains(&MethodIndex(2)));
        assert!(graph.callees_of(MethodIndex(0), true).contains(&MethodIndex(1)));
    }

    #[test]
    fn root_methods_are_callers_never_seen_as_callees() {
        let graph = CallGraph::default();
        graph.add_edge(MethodIndex(0), MethodIndex(1));
        graph.add_edge(MethodIndex(1), MethodIndex(2));
        let roots = graph.root_methods();
        assert!(roots.contains(&MethodIndex(0)));
        assert!(!roots.contains(&MethodIndex(1)));
    }

    #[test]
    fn synthetic_methods_excluded_when_requested() {
        let graph = CallGraph::default();
        graph.add_edge(MethodIndex(0), MethodIndex(1));
        graph.mark_synthetic(MethodIndex(1));
        assert!(graph.callees_of(MethodIndex(0), true).contains(&MethodIndex(1)));
        assert!(!graph.callees_of(MethodIndex(0), false).contains(&MethodIndex(1)));
    }
}
