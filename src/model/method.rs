//! Method identity and the per-method record (§3, §4.1).

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use bitflags::bitflags;
use parking_lot::Mutex;

use crate::ids::{ClassId, MethodHash, MethodIndex};
use crate::typedesc::TypeDescriptor;

bitflags! {
    /// Modifier bits computed by the method handler (§4.3), not a direct
    /// copy of the declared modifiers — e.g. `POSSIBLY_POLYMORPHIC` is set
    /// for interface/abstract methods during registration and again, on a
    /// per-candidate basis, during Stage 4 (§4.4).
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
    pub struct MethodModifiers: u16 {
        const BODYLESS             = 0b0000_0001;
        const CONSTRUCTOR          = 0b0000_0010;
        const STATIC               = 0b0000_0100;
        const POSSIBLY_POLYMORPHIC = 0b0000_1000;
        const VIRTUAL              = 0b0001_0000;
        const DEFAULT_IN_INTERFACE = 0b0010_0000;
    }
}

/// Immutable tuple `(name, return type, ordered parameter types)` that
/// identifies a method independent of where it is declared.
#[derive(Clone)]
pub struct MethodIdentity {
    pub name: String,
    pub return_type: Option<Arc<dyn TypeDescriptor>>,
    pub param_types: Vec<Arc<dyn TypeDescriptor>>,
}

impl std::fmt::Debug for MethodIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodIdentity")
            .field("name", &self.name)
            .field(
                "return_type",
                &self.return_type.as_ref().map(|t| t.name().to_string()),
            )
            .field(
                "param_types",
                &self
                    .param_types
                    .iter()
                    .map(|t| t.name().to_string())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl MethodIdentity {
    /// Exact override match (§4.4): parameters must be equal type-for-type
    /// after erasure; return type is ignored. Used only to decide
    /// overriding, never for call-site resolution.
    pub fn is_exact_override_of(&self, other: &MethodIdentity) -> bool {
        if self.name != other.name || self.param_types.len() != other.param_types.len() {
            return false;
        }
        self.param_types
            .iter()
            .zip(other.param_types.iter())
            .all(|(a, b)| a.equals(b.as_ref()) || a.erasure().equals(b.erasure().as_ref()))
    }
}

/// Rebuilds `identity` with every symbolic type parameter in its return and
/// parameter types replaced per `mapping` (§4.4 "Parametric-type
/// refinement"). Types with nothing to substitute pass through unchanged.
pub fn refine_identity(identity: &MethodIdentity, mapping: &HashMap<String, Arc<dyn TypeDescriptor>>) -> MethodIdentity {
    MethodIdentity {
        name: identity.name.clone(),
        return_type: identity
            .return_type
            .as_ref()
            .map(|t| t.substitute(mapping).unwrap_or_else(|| t.clone())),
        param_types: identity
            .param_types
            .iter()
            .map(|t| t.substitute(mapping).unwrap_or_else(|| t.clone()))
            .collect(),
    }
}

/// The set of classes that can legally invoke a given candidate method via
/// a receiver of that class (§3). Computed lazily and cached once the
/// class/method registries are stable (Stage 4 only begins once Stage 3
/// has finished for every file).
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct InvocationType {
    pub callee: MethodIndex,
    pub callers_in_classes: BTreeSet<ClassId>,
}

/// Per-method record (§3's `MethodInfoBundle`).
pub struct MethodInfoBundle {
    pub hash: MethodHash,
    pub index: MethodIndex,
    pub container_class: ClassId,
    pub signature: String,
    pub identity: MethodIdentity,
    modifiers: Mutex<MethodModifiers>,
    invocation_type: Mutex<Option<InvocationType>>,
    subclass_invocation_indices: Mutex<BTreeSet<MethodIndex>>,
}

impl MethodInfoBundle {
    pub fn new(
        hash: MethodHash,
        index: MethodIndex,
        container_class: ClassId,
        signature: String,
        identity: MethodIdentity,
        modifiers: MethodModifiers,
    ) -> Self {
        Self {
            hash,
            index,
            container_class,
            signature,
            identity,
            modifiers: Mutex::new(modifiers),
            invocation_type: Mutex::new(None),
            subclass_invocation_indices: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn modifiers(&self) -> MethodModifiers {
        *self.modifiers.lock()
    }

    pub fn set_possibly_polymorphic(&self) {
        self.modifiers.lock().insert(MethodModifiers::POSSIBLY_POLYMORPHIC);
    }

    pub fn invocation_type(&self) -> Option<InvocationType> {
        self.invocation_type.lock().clone()
    }

    pub fn set_invocation_type(&self, invocation_type: InvocationType) {
        *self.invocation_type.lock() = Some(invocation_type);
    }

    pub fn subclass_invocation_indices(&self) -> BTreeSet<MethodIndex> {
        self.subclass_invocation_indices.lock().clone()
    }

    pub fn set_subclass_invocation_indices(&self, indices: BTreeSet<MethodIndex>) {
        *self.subclass_invocation_indices.lock() = indices;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifier_flags_combine() {
        let bits = MethodModifiers::BODYLESS | MethodModifiers::CONSTRUCTOR;
        assert!(bits.contains(MethodModifiers::BODYLESS));
        assert!(bits.contains(MethodModifiers::CONSTRUCTOR));
        assert!(!bits.contains(MethodModifiers::STATIC));
    }

    #[derive(Clone, Debug)]
    struct Named(&'static str);

    impl TypeDescriptor for Named {
        fn name(&self) -> &str {
            self.0
        }
        fn erasure(&self) -> Arc<dyn TypeDescriptor> {
            Arc::new(self.clone())
        }
        fn matches(&self, other: &dyn TypeDescriptor) -> bool {
            self.0 == other.name()
        }
    }

    #[derive(Clone, Debug)]
    struct Symbolic(&'static str);

    impl TypeDescriptor for Symbolic {
        fn name(&self) -> &str {
            self.0
        }
        fn erasure(&self) -> Arc<dyn TypeDescriptor> {
            Arc::new(self.clone())
        }
        fn matches(&self, other: &dyn TypeDescriptor) -> bool {
            self.0 == other.name()
        }
        fn substitute(&self, mapping: &HashMap<String, Arc<dyn TypeDescriptor>>) -> Option<Arc<dyn TypeDescriptor>> {
            mapping.get(self.0).cloned()
        }
    }

    #[test]
    fn refine_identity_substitutes_symbolic_params_and_leaves_others() {
        let mut mapping: HashMap<String, Arc<dyn TypeDescriptor>> = HashMap::new();
        mapping.insert("T".to_string(), Arc::new(Named("String")));

        let identity = MethodIdentity {
            name: "get".to_string(),
            return_type: Some(Arc::new(Symbolic("T"))),
            param_types: vec![Arc::new(Named("int")), Arc::new(Symbolic("T"))],
        };

        let refined = refine_identity(&identity, &mapping);
        assert_eq!(refined.name, "get");
        assert_eq!(refined.return_type.unwrap().name(), "String");
        assert_eq!(refined.param_types[0].name(), "int");
        assert_eq!(refined.param_types[1].name(), "String");
    }
}
