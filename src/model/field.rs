//! Field registry records (§3).

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::ast::{DeclaredModifiers, TokenRange};
use crate::ids::ClassId;
use crate::typedesc::TypeDescriptor;

/// A declared field. Mutation (new initializer locations, or filling in the
/// proper type once the field registry is complete) uses per-object locking
/// because a single field can accept additions from multiple stages
/// running concurrently across files (§5).
pub struct FieldRecord {
    pub name: String,
    pub container_class: ClassId,
    pub modifiers: DeclaredModifiers,
    pub declaration: TokenRange,
    soft_type: RwLock<Option<Arc<dyn TypeDescriptor>>>,
    proper_type: RwLock<Option<Arc<dyn TypeDescriptor>>>,
    /// Keyed by class id because the same field may have distinct
    /// initializers visible from different subclasses after inheritance.
    initializer_locations: Mutex<BTreeMap<ClassId, BTreeSet<TokenRange>>>,
}

impl FieldRecord {
    pub fn new(name: String, container_class: ClassId, modifiers: DeclaredModifiers, declaration: TokenRange) -> Self {
        Self {
            name,
            container_class,
            modifiers,
            declaration,
            soft_type: RwLock::new(None),
            proper_type: RwLock::new(None),
            initializer_locations: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn soft_type(&self) -> Option<Arc<dyn TypeDescriptor>> {
        self.soft_type.read().clone()
    }

    pub fn set_soft_type(&self, ty: Arc<dyn TypeDescriptor>) {
        *self.soft_type.write() = Some(ty);
    }

    pub fn proper_type(&self) -> Option<Arc<dyn TypeDescriptor>> {
        self.proper_type.read().clone()
    }

    pub fn set_proper_type(&self, ty: Arc<dyn TypeDescriptor>) {
        *self.proper_type.write() = Some(ty);
    }

    /// The best type known so far: proper type once computed, else soft type.
    pub fn best_type(&self) -> Option<Arc<dyn TypeDescriptor>> {
        self.proper_type().or_else(|| self.soft_type())
    }

    pub fn add_initializer_location(&self, visible_from: ClassId, location: TokenRange) {
        self.initializer_locations
            .lock()
            .entry(visible_from)
            .or_default()
            .insert(location);
    }

    pub fn initializer_locations_for(&self, visible_from: &ClassId) -> BTreeSet<TokenRange> {
        self.initializer_locations
            .lock()
            .get(visible_from)
            .cloned()
            .unwrap_or_default()
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.is_static
    }

    pub fn is_private(&self) -> bool {
        self.modifiers.is_private
    }
}
