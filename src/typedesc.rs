//! Type descriptor interface (§4, glue component): the opaque handle
//! obtained from the external type calculator. The core never constructs
//! one of these itself; it only queries them.

use std::collections::HashMap;
use std::sync::Arc;

use crate::ast::TokenRange;
use crate::ids::ClassId;

/// JLS widening-primitive-conversion source kinds relevant to overload
/// resolution (§4.4 `NUMERIC_AUTOCONVERT`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveNumeric {
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveNumeric {
    /// Whether a value of `self` widens to `target` per JLS 5.1.2, without
    /// narrowing or boxing. `byte`, `short`, and `char` each widen directly
    /// to `int`; they are not mutually convertible with each other.
    pub fn widens_to(self, target: PrimitiveNumeric) -> bool {
        use PrimitiveNumeric::*;
        if self == target {
            return false;
        }
        let rank = |k: PrimitiveNumeric| -> &'static [PrimitiveNumeric] {
            match k {
                Byte => &[Short, Int, Long, Float, Double],
                Short => &[Int, Long, Float, Double],
                Char => &[Int, Long, Float, Double],
                Int => &[Long, Float, Double],
                Long => &[Float, Double],
                Float => &[Double],
                Double => &[],
            }
        };
        rank(self).contains(&target)
    }
}

/// Opaque type handle. Implementations are provided by the external type
/// calculator (§6); the core only ever queries through this trait.
///
/// Equality and the subtype check `matches` are asymmetric on purpose:
/// `a.matches(b)` asks "is `a` usable where `b` is expected", i.e. "is `a`
/// a subtype of `b`" — matching the signature-matching rule "actual's
/// declared class is a sub of formal's".
pub trait TypeDescriptor: Send + Sync {
    fn name(&self) -> &str;

    fn erasure(&self) -> Arc<dyn TypeDescriptor>;

    /// Subtype check: does a value typed `self` flow into something typed
    /// `other` (`self <: other`)?
    fn matches(&self, other: &dyn TypeDescriptor) -> bool;

    fn equals(&self, other: &dyn TypeDescriptor) -> bool {
        self.name() == other.name()
    }

    fn is_library(&self) -> bool {
        false
    }

    fn is_void(&self) -> bool {
        false
    }

    fn is_null_type(&self) -> bool {
        false
    }

    /// The universal top type (`java.lang.Object` or equivalent). Per §9's
    /// design notes, this class is recorded as an immediate super but never
    /// accumulates subclasses in `reachable_subs` — preserved intentionally.
    fn is_universal_top(&self) -> bool {
        false
    }

    fn is_array(&self) -> bool {
        false
    }

    fn array_element(&self) -> Option<Arc<dyn TypeDescriptor>> {
        None
    }

    fn primitive_numeric_kind(&self) -> Option<PrimitiveNumeric> {
        None
    }

    /// The class id backing this descriptor, when it names a class/interface
    /// (source or library). `None` for primitives, arrays of primitives,
    /// `void`, and the null type.
    fn class_id(&self) -> Option<ClassId> {
        None
    }

    /// Symbolic type parameters (e.g. `["T", "E"]`) for a generic
    /// declaration's own type, before substitution.
    fn type_parameters(&self) -> Vec<String> {
        Vec::new()
    }

    /// Given a concrete specialization of this (possibly generic) type,
    /// compute the symbol → concrete-type substitution (§4.4 parametric
    /// refinement). Returns `None` when `self` carries no symbolic
    /// parameters or `concrete` does not specialize it.
    fn parse_and_map_symbols(
        &self,
        _concrete: &dyn TypeDescriptor,
    ) -> Option<HashMap<String, Arc<dyn TypeDescriptor>>> {
        None
    }

    /// Rebuilds this type with symbolic parameters replaced per `mapping`.
    /// Returns `None` when `self` carries no symbolic parameters, in which
    /// case the caller keeps using the original descriptor unchanged.
    fn substitute(&self, _mapping: &HashMap<String, Arc<dyn TypeDescriptor>>) -> Option<Arc<dyn TypeDescriptor>> {
        None
    }
}

/// True when `actual`'s array element type equals `formal`'s after
/// stripping `[]` noise, per the signature-matching array rule.
pub fn array_element_types_equal(actual: &dyn TypeDescriptor, formal: &dyn TypeDescriptor) -> bool {
    match (actual.array_element(), formal.array_element()) {
        (Some(a), Some(f)) => a.equals(f.as_ref()) || a.erasure().equals(f.erasure().as_ref()),
        _ => false,
    }
}

/// External interface consumed from the type calculator (§6): computes the
/// static type of an expression or declaration node, identified by its
/// stable [`TokenRange`]. A `None` result degrades to a `Maybe` match
/// rather than an error (§7).
pub trait TypeCalculator: Send + Sync {
    fn type_of(&self, node: &TokenRange) -> Option<Arc<dyn TypeDescriptor>>;

    /// The proper (fully resolved, as opposed to soft/syntactic) type of a
    /// field, once the field registry is stable enough to compute it (§4.2).
    fn proper_field_type(&self, declaration: &TokenRange) -> Option<Arc<dyn TypeDescriptor>>;

    /// The fully qualified name of whatever `node` refers to (a type, a
    /// field, a method), used only for the export-only extended call graph
    /// (§4.5) and for resolving a qualified-name call site to the class
    /// that owns the static field it names (§4.4). `strict` asks for a
    /// binding-backed name only, never a best-effort guess.
    fn qualified_name_of(&self, node: &TokenRange, strict: bool) -> Option<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_short_char_widen_to_int_but_not_each_other() {
        assert!(PrimitiveNumeric::Byte.widens_to(PrimitiveNumeric::Int));
        assert!(PrimitiveNumeric::Short.widens_to(PrimitiveNumeric::Int));
        assert!(PrimitiveNumeric::Char.widens_to(PrimitiveNumeric::Int));
        assert!(!PrimitiveNumeric::Char.widens_to(PrimitiveNumeric::Short));
        assert!(!PrimitiveNumeric::Short.widens_to(PrimitiveNumeric::Char));
        assert!(!PrimitiveNumeric::Byte.widens_to(PrimitiveNumeric::Char));
    }

    #[test]
    fn widening_chain_is_transitive_by_table_not_recursion() {
        assert!(PrimitiveNumeric::Int.widens_to(PrimitiveNumeric::Double));
        assert!(PrimitiveNumeric::Long.widens_to(PrimitiveNumeric::Float));
        assert!(!PrimitiveNumeric::Double.widens_to(PrimitiveNumeric::Int));
    }

    #[test]
    fn no_self_widening() {
        assert!(!PrimitiveNumeric::Int.widens_to(PrimitiveNumeric::Int));
    }
}
