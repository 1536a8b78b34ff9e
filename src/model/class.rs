//! Class record (§3). The relationship maps (`immediate_super`,
//! `reachable_subs`, ...) live on [`crate::context::ClassGraph`] rather than
//! on this struct, so cross-references stay index/id-keyed instead of
//! becoming owning pointers between records (§9).

use bitflags::bitflags;
use parking_lot::Mutex;

use crate::ast::TokenRange;
use crate::ids::{ClassIndex, MethodIndex};

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
    pub struct ClassFlags: u8 {
        const NESTED                   = 0b0000_0001;
        const STATIC                   = 0b0000_0010;
        const EXCLUDED                 = 0b0000_0100;
        const AUTO_GENERATED_EXCLUDED  = 0b0000_1000;
    }
}

/// A registered class, interface, enum, or anonymous class.
///
/// `flags` is the only mutable field: `NESTED`/`STATIC` are fixed at
/// creation in Stage 1, but `EXCLUDED` can be set later, during Stage 2's
/// exclusion-propagation closure, once an ancestor turns out to live in an
/// excluded file.
pub struct ClassInfo {
    pub index: ClassIndex,
    pub signature: String,
    /// Simple (unqualified) declared name, empty for anonymous classes. Used
    /// to build the constructor-identity name convention shared by `new
    /// Foo(...)`, `this(...)`, and `super(...)` call sites and the
    /// synthetic default constructor (§4.3, §4.4).
    pub simple_name: String,
    flags: Mutex<ClassFlags>,
    /// Anonymous classes are identified by their declaration's token-range,
    /// not only by their binding, since the binder may collapse anonymous
    /// bindings onto the same id.
    pub token_range: Option<TokenRange>,
    pub is_library: bool,
    pub type_parameters: Vec<String>,
    pub default_constructor: MethodIndex,
    pub static_constructor: Option<MethodIndex>,
}

impl ClassInfo {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        index: ClassIndex,
        signature: String,
        simple_name: String,
        flags: ClassFlags,
        token_range: Option<TokenRange>,
        is_library: bool,
        type_parameters: Vec<String>,
        default_constructor: MethodIndex,
        static_constructor: Option<MethodIndex>,
    ) -> Self {
        Self {
            index,
            signature,
            simple_name,
            flags: Mutex::new(flags),
            token_range,
            is_library,
            type_parameters,
            default_constructor,
            static_constructor,
        }
    }

    pub fn flags(&self) -> ClassFlags {
        *self.flags.lock()
    }

    pub fn insert_flag(&self, flag: ClassFlags) {
        self.flags.lock().insert(flag);
    }

    pub fn is_excluded(&self) -> bool {
        self.flags()
            .intersects(ClassFlags::EXCLUDED | ClassFlags::AUTO_GENERATED_EXCLUDED)
    }
}
