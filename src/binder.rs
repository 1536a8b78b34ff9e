//! The `Binder` external interface (§6): resolves AST nodes, identified by
//! [`TokenRange`], to name-resolution bindings. The core treats every
//! return value as optional — a missing binding degrades to a `Maybe`/skip
//! path (§7), never an error.

use crate::ast::{DeclaredModifiers, TokenRange};
use crate::ids::{ClassId, MethodHash};

/// A resolved reference to a class or interface, source or library.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassBinding {
    pub class_id: ClassId,
    pub is_library: bool,
}

/// A resolved reference to a method or constructor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodBinding {
    pub owner: ClassBinding,
    pub hash: MethodHash,
    pub is_library: bool,
}

/// A resolved reference to a type (class, interface, primitive, or array).
/// Kept separate from [`ClassBinding`] because not every type binding names
/// a class (e.g. primitives, arrays of primitives).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeBinding {
    pub class: Option<ClassBinding>,
}

/// Name-resolution interface consumed from the external binder (§6). Every
/// method takes the AST node's stable identity ([`TokenRange`]) rather than
/// a borrowed node reference, since that identity is what the rest of the
/// pipeline keys on.
pub trait Binder: Send + Sync {
    fn resolve_type(&self, node: &TokenRange) -> Option<TypeBinding>;
    fn resolve_method(&self, node: &TokenRange) -> Option<MethodBinding>;
    fn declared_methods(&self, class: &ClassBinding) -> Vec<MethodBinding>;
    fn super_of(&self, class: &ClassBinding) -> Option<ClassBinding>;
    fn interfaces_of(&self, class: &ClassBinding) -> Vec<ClassBinding>;
    fn modifiers(&self, node: &TokenRange) -> DeclaredModifiers;
}
