//! Minimal in-memory implementations of the external collaborator traits
//! (§6), sufficient to exercise the pipeline end to end without a real
//! parser, binder, or type calculator. Not a production integration: no
//! generics, arrays, or varargs resolution beyond what the unit and scenario
//! tests below exercise — a host application is expected to supply its own
//! `SourceFileProvider`/`Binder`/`TypeCalculator` backed by a real front end.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::ast::{
    DeclaredModifiers, FilePath, ProgressReporter, SourceFileProvider, SyntaxTree, TokenRange,
    TypeDeclNode,
};
use crate::binder::{Binder, ClassBinding, MethodBinding, TypeBinding};
use crate::ids::{ClassId, MethodHash};
use crate::typedesc::{TypeCalculator, TypeDescriptor};

/// A `ProgressReporter` that discards every message, for tests that don't
/// care about progress output.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _message: &str) {}
}

/// An in-memory `SourceFileProvider` + `SyntaxTree` backed by a fixed list of
/// trees built directly in Rust, skipping any real parsing step.
#[derive(Default)]
pub struct InMemorySourceFileProvider {
    trees: Vec<Arc<dyn SyntaxTree>>,
}

impl InMemorySourceFileProvider {
    pub fn new(trees: Vec<Arc<dyn SyntaxTree>>) -> Self {
        Self { trees }
    }
}

impl SourceFileProvider for InMemorySourceFileProvider {
    fn list_source_files(&self) -> Vec<FilePath> {
        self.trees.iter().map(|t| t.file().clone()).collect()
    }

    fn load_unit(&self, file: &FilePath) -> Option<Arc<dyn SyntaxTree>> {
        self.trees.iter().find(|t| t.file() == file).cloned()
    }
}

/// A single compilation unit: one top-level type declaration per file, kept
/// simple since the scenarios below never need multiple top-level types per
/// file.
pub struct InMemorySyntaxTree {
    pub file: FilePath,
    pub declarations: Vec<TypeDeclNode>,
    pub imports: Vec<String>,
}

impl SyntaxTree for InMemorySyntaxTree {
    fn file(&self) -> &FilePath {
        &self.file
    }

    fn type_declarations(&self) -> &[TypeDeclNode] {
        &self.declarations
    }

    fn imports(&self) -> &[String] {
        &self.imports
    }
}

/// An in-memory binder keyed by name: every class is "declared" up front
/// with its super and interfaces, then `resolve_type`/`resolve_method`
/// recover a binding from a `TokenRange` whose `offset` doubles as an index
/// into an internal table built by [`InMemoryBinder::declare_class`] and
/// [`InMemoryBinder::declare_method`]. Real binders resolve from AST
/// structure; this one resolves from a registration the test set up ahead
/// of time, which is enough to drive the resolution logic under test.
#[derive(Default)]
pub struct InMemoryBinder {
    inner: Mutex<InMemoryBinderState>,
}

#[derive(Default)]
struct InMemoryBinderState {
    classes: HashMap<ClassId, ClassRecord>,
    /// `TokenRange -> ClassId`, populated by `bind_type_ref`.
    type_refs: HashMap<TokenRange, ClassId>,
    /// `TokenRange -> MethodHash`, populated by `bind_method_ref`.
    method_refs: HashMap<TokenRange, (MethodHash, ClassId, bool)>,
    modifiers: HashMap<TokenRange, DeclaredModifiers>,
}

struct ClassRecord {
    super_class: Option<ClassId>,
    interfaces: Vec<ClassId>,
    is_library: bool,
}

impl InMemoryBinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a class with its super and direct interfaces, returning its
    /// id. Does not register any members; call [`Self::bind_type_ref`]
    /// separately to make a given `TokenRange` resolve to it.
    pub fn declare_class(&self, name: &str, super_class: Option<ClassId>, interfaces: &[ClassId]) -> ClassId {
        let id = ClassId::new(name.to_string());
        self.inner.lock().unwrap().classes.insert(
            id.clone(),
            ClassRecord {
                super_class,
                interfaces: interfaces.to_vec(),
                is_library: false,
            },
        );
        id
    }

    pub fn declare_library_class(&self, qualified_name: &str) -> ClassId {
        let id = ClassId::library(qualified_name);
        self.inner.lock().unwrap().classes.insert(
            id.clone(),
            ClassRecord {
                super_class: None,
                interfaces: Vec::new(),
                is_library: true,
            },
        );
        id
    }

    /// Makes `node` resolve to `class` via [`Binder::resolve_type`].
    pub fn bind_type_ref(&self, node: TokenRange, class: ClassId) {
        self.inner.lock().unwrap().type_refs.insert(node, class);
    }

    /// Makes `node` resolve to a method binding via [`Binder::resolve_method`].
    pub fn bind_method_ref(&self, node: TokenRange, hash: MethodHash, owner: ClassId, is_library: bool) {
        self.inner
            .lock()
            .unwrap()
            .method_refs
            .insert(node, (hash, owner, is_library));
    }

    pub fn set_modifiers(&self, node: TokenRange, modifiers: DeclaredModifiers) {
        self.inner.lock().unwrap().modifiers.insert(node, modifiers);
    }

    fn class_binding(&self, id: &ClassId) -> Option<ClassBinding> {
        let guard = self.inner.lock().unwrap();
        guard.classes.get(id).map(|record| ClassBinding {
            class_id: id.clone(),
            is_library: record.is_library,
        })
    }
}

impl Binder for InMemoryBinder {
    fn resolve_type(&self, node: &TokenRange) -> Option<TypeBinding> {
        let class_id = self.inner.lock().unwrap().type_refs.get(node).cloned()?;
        Some(TypeBinding {
            class: self.class_binding(&class_id),
        })
    }

    fn resolve_method(&self, node: &TokenRange) -> Option<MethodBinding> {
        let (hash, owner, is_library) = self.inner.lock().unwrap().method_refs.get(node).cloned()?;
        Some(MethodBinding {
            owner: self.class_binding(&owner)?,
            hash,
            is_library,
        })
    }

    fn declared_methods(&self, _class: &ClassBinding) -> Vec<MethodBinding> {
        // The reference pipeline recovers declared methods through
        // `MethodRegistry` (populated by Stage 3), never through the binder
        // directly, so this in-memory stub never needs a real answer.
        Vec::new()
    }

    fn super_of(&self, class: &ClassBinding) -> Option<ClassBinding> {
        let guard = self.inner.lock().unwrap();
        let super_id = guard.classes.get(&class.class_id)?.super_class.clone()?;
        drop(guard);
        self.class_binding(&super_id)
    }

    fn interfaces_of(&self, class: &ClassBinding) -> Vec<ClassBinding> {
        let interfaces = {
            let guard = self.inner.lock().unwrap();
            guard
                .classes
                .get(&class.class_id)
                .map(|r| r.interfaces.clone())
                .unwrap_or_default()
        };
        interfaces
            .into_iter()
            .filter_map(|id| self.class_binding(&id))
            .collect()
    }

    fn modifiers(&self, node: &TokenRange) -> DeclaredModifiers {
        self.inner
            .lock()
            .unwrap()
            .modifiers
            .get(node)
            .copied()
            .unwrap_or_default()
    }
}

/// An in-memory named type descriptor: equal by name, subtype by a declared
/// parent chain, with a handful of fixed descriptors for primitives/void/null.
#[derive(Clone, Debug)]
pub struct NamedType {
    name: String,
    class_id: Option<ClassId>,
    is_library: bool,
    is_universal_top: bool,
    supers: Vec<String>,
}

impl NamedType {
    pub fn new(name: impl Into<String>, class_id: Option<ClassId>) -> Self {
        Self {
            name: name.into(),
            class_id,
            is_library: false,
            is_universal_top: false,
            supers: Vec::new(),
        }
    }

    pub fn library(name: impl Into<String>, class_id: ClassId) -> Self {
        Self {
            name: name.into(),
            class_id: Some(class_id),
            is_library: true,
            is_universal_top: false,
            supers: Vec::new(),
        }
    }

    pub fn universal_top(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class_id: None,
            is_library: false,
            is_universal_top: true,
            supers: Vec::new(),
        }
    }

    pub fn with_super(mut self, name: impl Into<String>) -> Self {
        self.supers.push(name.into());
        self
    }
}

impl TypeDescriptor for NamedType {
    fn name(&self) -> &str {
        &self.name
    }

    fn erasure(&self) -> Arc<dyn TypeDescriptor> {
        Arc::new(self.clone())
    }

    fn matches(&self, other: &dyn TypeDescriptor) -> bool {
        self.name == other.name() || self.supers.iter().any(|s| s == other.name())
    }

    fn is_library(&self) -> bool {
        self.is_library
    }

    fn is_universal_top(&self) -> bool {
        self.is_universal_top
    }

    fn class_id(&self) -> Option<ClassId> {
        self.class_id.clone()
    }
}

/// An in-memory type calculator keyed entirely by `TokenRange`: tests
/// register the descriptor they want a given node to resolve to, rather
/// than computing one from real type inference.
#[derive(Default)]
pub struct InMemoryTypeCalculator {
    types: Mutex<HashMap<TokenRange, Arc<dyn TypeDescriptor>>>,
    field_proper_types: Mutex<HashMap<TokenRange, Arc<dyn TypeDescriptor>>>,
    qnames: Mutex<HashMap<TokenRange, String>>,
}

impl InMemoryTypeCalculator {
    pub fn set_type(&self, node: TokenRange, ty: Arc<dyn TypeDescriptor>) {
        self.types.lock().unwrap().insert(node, ty);
    }

    pub fn set_proper_field_type(&self, declaration: TokenRange, ty: Arc<dyn TypeDescriptor>) {
        self.field_proper_types.lock().unwrap().insert(declaration, ty);
    }

    pub fn set_qualified_name(&self, node: TokenRange, qname: impl Into<String>) {
        self.qnames.lock().unwrap().insert(node, qname.into());
    }
}

impl TypeCalculator for InMemoryTypeCalculator {
    fn type_of(&self, node: &TokenRange) -> Option<Arc<dyn TypeDescriptor>> {
        self.types.lock().unwrap().get(node).cloned()
    }

    fn proper_field_type(&self, declaration: &TokenRange) -> Option<Arc<dyn TypeDescriptor>> {
        self.field_proper_types
            .lock()
            .unwrap()
            .get(declaration)
            .cloned()
            .or_else(|| self.type_of(declaration))
    }

    fn qualified_name_of(&self, node: &TokenRange, _strict: bool) -> Option<String> {
        self.qnames.lock().unwrap().get(node).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binder_resolves_declared_super_and_interfaces() {
        let binder = InMemoryBinder::new();
        let object = binder.declare_class("Object", None, &[]);
        let runnable = binder.declare_class("Runnable", None, &[]);
        let worker = binder.declare_class("Worker", Some(object.clone()), &[runnable.clone()]);

        let worker_binding = ClassBinding {
            class_id: worker,
            is_library: false,
        };
        let super_binding = binder.super_of(&worker_binding).unwrap();
        assert_eq!(super_binding.class_id, object);

        let interfaces = binder.interfaces_of(&worker_binding);
        assert_eq!(interfaces.len(), 1);
        assert_eq!(interfaces[0].class_id, runnable);
    }

    #[test]
    fn named_type_matches_through_declared_super_chain() {
        let widget = NamedType::new("Widget", None).with_super("Base");
        let base = NamedType::new("Base", None);
        assert!(widget.matches(&base));
        assert!(!base.matches(&widget));
    }
}
