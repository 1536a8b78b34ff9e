//! The owned `AnalysisContext` value (§9): every registry the four stages
//! read and write, created by [`AnalysisContext::initialize`] and torn down
//! by [`AnalysisContext::deinitialize`]. `initialize`/`deinitialize`
//! replace what the modeled system expressed as process-wide global state;
//! here a build owns its context outright, so concurrent builds (e.g. in
//! tests) never interfere with each other.

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::{DashMap, DashSet};

use crate::ast::FilePath;
use crate::binder::Binder;
use crate::config::BuildConfig;
use crate::ids::{ClassId, ClassIndex, IdentifierRegistry, MethodHash, MethodIndex};
use crate::model::{ClassInfo, FieldRecord, MethodInfoBundle};
use crate::ast::ProgressReporter;
use crate::typedesc::{TypeCalculator, TypeDescriptor};

/// Class relationships and per-file exclusion bookkeeping (§3's
/// "Class relationships", built by the class-graph builder, §4.2).
#[derive(Default)]
pub struct ClassGraph {
    pub classes: DashMap<ClassId, Arc<ClassInfo>>,
    pub immediate_super: DashMap<ClassId, ClassId>,
    pub direct_interfaces: DashMap<ClassId, BTreeSet<ClassId>>,
    /// `(ordinary supers, interfaces)`, populated by Stage 2's closure.
    pub reachable_supers: DashMap<ClassId, (BTreeSet<ClassId>, BTreeSet<ClassId>)>,
    pub reachable_subs: DashMap<ClassId, BTreeSet<ClassId>>,
    pub inner_of: DashMap<ClassId, BTreeSet<ClassId>>,
    pub enclosing_class: DashMap<ClassId, ClassId>,
    pub enclosing_method: DashMap<ClassId, MethodHash>,
    pub class_file: DashMap<ClassId, FilePath>,
    pub excluded_files: DashSet<FilePath>,
    pub auto_generated_excluded_files: DashSet<FilePath>,
    /// Classes recorded during Stage 1 whose file turned out to be
    /// test/example code. Kept distinct from `classes` because excluded
    /// classes are never assigned a bit-index (§4.2) yet must still
    /// participate in Stage 2's downward exclusion propagation.
    pub excluded_classes: DashMap<ClassId, FilePath>,
    pub auto_generated_excluded_classes: DashSet<ClassId>,
    /// Soft (pre-registry) types for classes, for Stage 4's parametric
    /// refinement to consume; parametric classes are also recorded
    /// separately for that same consumer.
    pub soft_types: DashMap<ClassId, Arc<dyn TypeDescriptor>>,
    pub parametric_classes: DashMap<ClassId, Arc<dyn TypeDescriptor>>,
    /// Anonymous-class declarations, keyed by their own token-range rather
    /// than by binding, since the binder may collapse distinct anonymous
    /// classes onto the same id (§3).
    pub anonymous_class_by_token: DashMap<crate::ast::TokenRange, ClassId>,
}

impl ClassGraph {
    pub fn reachable_subs_or_self(&self, class: &ClassId) -> BTreeSet<ClassId> {
        let mut set = self
            .reachable_subs
            .get(class)
            .map(|v| v.clone())
            .unwrap_or_default();
        set.insert(class.clone());
        set
    }

    pub fn is_file_excluded(&self, file: &FilePath) -> bool {
        self.excluded_files.contains(file) || self.auto_generated_excluded_files.contains(file)
    }

    pub fn is_class_excluded(&self, class: &ClassId) -> bool {
        self.excluded_classes.contains_key(class)
            || self.auto_generated_excluded_classes.contains(class)
            || self
                .classes
                .get(class)
                .map(|c| c.is_excluded())
                .unwrap_or(false)
    }
}

/// Declared fields per class, plus the inherited-field lists computed after
/// Stage 2's super closure (§4.2).
#[derive(Default)]
pub struct FieldRegistry {
    fields: DashMap<(ClassId, String), Arc<FieldRecord>>,
    declared_order: DashMap<ClassId, Vec<String>>,
    /// "super fields first, then own fields", computed once per class after
    /// Stage 2.
    inherited_lists: DashMap<ClassId, Vec<Arc<FieldRecord>>>,
    has_static_field: DashSet<ClassId>,
}

impl FieldRegistry {
    pub fn register(&self, record: FieldRecord) -> Arc<FieldRecord> {
        let key = (record.container_class.clone(), record.name.clone());
        if record.is_static() {
            self.has_static_field.insert(record.container_class.clone());
        }
        let record = Arc::new(record);
        self.declared_order
            .entry(key.0.clone())
            .or_default()
            .push(key.1.clone());
        self.fields.insert(key, record.clone());
        record
    }

    pub fn get(&self, class: &ClassId, name: &str) -> Option<Arc<FieldRecord>> {
        self.fields.get(&(class.clone(), name.to_string())).map(|v| v.clone())
    }

    pub fn declared_fields(&self, class: &ClassId) -> Vec<Arc<FieldRecord>> {
        self.declared_order
            .get(class)
            .map(|names| {
                names
                    .iter()
                    .filter_map(|name| self.get(class, name))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn has_static_field(&self, class: &ClassId) -> bool {
        self.has_static_field.contains(class)
    }

    pub fn set_inherited_list(&self, class: ClassId, fields: Vec<Arc<FieldRecord>>) {
        self.inherited_lists.insert(class, fields);
    }

    pub fn inherited_list(&self, class: &ClassId) -> Vec<Arc<FieldRecord>> {
        self.inherited_lists
            .get(class)
            .map(|v| v.clone())
            .unwrap_or_default()
    }
}

/// All declared methods (and synthetic constructors), keyed by hash and
/// grouped by container class (§4.2 Stage 3).
#[derive(Default)]
pub struct MethodRegistry {
    methods: DashMap<MethodIndex, Arc<MethodInfoBundle>>,
    by_class: DashMap<ClassId, Vec<MethodIndex>>,
    /// Declaration token-range → index, so Stage 4 can recover "which method
    /// am I inside of" without recomputing the identity hash a second time.
    by_token: DashMap<crate::ast::TokenRange, MethodIndex>,
    /// Memoized candidate sets per servicing method (§4.4 invocation-type
    /// propagation); a pure function of the finished class/method
    /// registries, so safe to cache for the lifetime of the context.
    pub(crate) candidate_cache: DashMap<MethodIndex, Arc<Vec<MethodIndex>>>,
    /// Methods whose last declared parameter is variadic (§4.4 varargs
    /// matching).
    varargs: DashSet<MethodIndex>,
}

impl MethodRegistry {
    pub fn register(&self, bundle: MethodInfoBundle) -> Arc<MethodInfoBundle> {
        let index = bundle.index;
        let container = bundle.container_class.clone();
        let bundle = Arc::new(bundle);
        self.methods.insert(index, bundle.clone());
        self.by_class.entry(container).or_default().push(index);
        bundle
    }

    pub fn record_token(&self, token: crate::ast::TokenRange, index: MethodIndex) {
        self.by_token.insert(token, index);
    }

    pub fn index_for_token(&self, token: &crate::ast::TokenRange) -> Option<MethodIndex> {
        self.by_token.get(token).map(|v| *v)
    }

    pub fn mark_varargs(&self, index: MethodIndex) {
        self.varargs.insert(index);
    }

    pub fn is_varargs(&self, index: MethodIndex) -> bool {
        self.varargs.contains(&index)
    }

    pub fn get(&self, index: MethodIndex) -> Option<Arc<MethodInfoBundle>> {
        self.methods.get(&index).map(|v| v.clone())
    }

    pub fn declared_in(&self, class: &ClassId) -> Vec<Arc<MethodInfoBundle>> {
        self.by_class
            .get(class)
            .map(|indices| indices.iter().filter_map(|i| self.get(*i)).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

/// Every registry populated by the four stages, plus the external
/// collaborators the pipeline reads from.
pub struct AnalysisContext {
    pub config: BuildConfig,
    pub ids: IdentifierRegistry,
    pub class_graph: ClassGraph,
    pub fields: FieldRegistry,
    pub methods: MethodRegistry,
    pub call_graph: crate::callgraph::CallGraph,
    pub binder: Arc<dyn Binder>,
    pub type_calculator: Arc<dyn TypeCalculator>,
    pub progress: Arc<dyn ProgressReporter>,
    /// Per-call-site `(servicing method, candidate set)`, populated by Stage
    /// 4 as it resolves each call site, and exposed read-only via §6's
    /// `invocation_candidates` query.
    invocation_candidates: DashMap<crate::ast::TokenRange, (MethodIndex, BTreeSet<MethodIndex>)>,
    /// Best-effort fully qualified name per method index, recorded at
    /// declaration time (Stage 1/3) from the type calculator, feeding the
    /// export-only extended call graph (§4.5).
    method_qnames: DashMap<MethodIndex, String>,
}

impl AnalysisContext {
    /// Constructor for a fresh, empty build. Pairs with [`Self::deinitialize`].
    pub fn initialize(
        config: BuildConfig,
        binder: Arc<dyn Binder>,
        type_calculator: Arc<dyn TypeCalculator>,
        progress: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            config,
            ids: IdentifierRegistry::new(),
            class_graph: ClassGraph::default(),
            fields: FieldRegistry::default(),
            methods: MethodRegistry::default(),
            call_graph: crate::callgraph::CallGraph::default(),
            binder,
            type_calculator,
            progress,
            invocation_candidates: DashMap::new(),
            method_qnames: DashMap::new(),
        }
    }

    pub fn record_method_qname(&self, method: MethodIndex, qname: String) {
        self.method_qnames.insert(method, qname);
    }

    pub fn method_qname(&self, method: MethodIndex) -> Option<String> {
        self.method_qnames.get(&method).map(|v| v.clone())
    }

    /// Records the resolved `(servicing, candidates)` pair for a call site,
    /// for later retrieval via [`Self::invocation_candidates`] (§6).
    pub fn record_invocation_candidates(
        &self,
        call_site: crate::ast::TokenRange,
        servicing: MethodIndex,
        candidates: BTreeSet<MethodIndex>,
    ) {
        self.invocation_candidates.insert(call_site, (servicing, candidates));
    }

    pub fn invocation_candidates(
        &self,
        call_site: &crate::ast::TokenRange,
    ) -> Option<(MethodIndex, BTreeSet<MethodIndex>)> {
        self.invocation_candidates.get(call_site).map(|v| v.clone())
    }

    /// Tears down a context, clearing the Stage-4 scratch structures that do
    /// not need to survive, and handing back everything §6's external query
    /// surface is built on: the call graph, the identifier registry, the
    /// per-call-site candidate sets, and the method qualified-name table.
    pub fn deinitialize(self) -> BuildArtifacts {
        self.class_graph.parametric_classes.clear();
        self.methods.candidate_cache.clear();
        BuildArtifacts {
            call_graph: self.call_graph,
            ids: self.ids,
            invocation_candidates: self.invocation_candidates,
            method_qnames: self.method_qnames,
        }
    }

    pub fn class_index(&self, id: &ClassId) -> ClassIndex {
        self.ids.index_from_class(id)
    }
}

/// What survives a finished build (§6's external query surface), handed back
/// by [`AnalysisContext::deinitialize`] once the four stages are done.
pub struct BuildArtifacts {
    pub call_graph: crate::callgraph::CallGraph,
    pub ids: IdentifierRegistry,
    invocation_candidates: DashMap<crate::ast::TokenRange, (MethodIndex, BTreeSet<MethodIndex>)>,
    method_qnames: DashMap<MethodIndex, String>,
}

impl BuildArtifacts {
    /// The servicing method and candidate set recorded for a call site
    /// during Stage 4 (§6's `invocation_candidates` query).
    pub fn invocation_candidates(
        &self,
        call_site: &crate::ast::TokenRange,
    ) -> Option<(MethodIndex, BTreeSet<MethodIndex>)> {
        self.invocation_candidates.get(call_site).map(|v| v.clone())
    }

    pub fn method_qname(&self, method: MethodIndex) -> Option<String> {
        self.method_qnames.get(&method).map(|v| v.clone())
    }
}
