//! The method handler (§4.3): derives a [`MethodIdentity`] from a single
//! AST node, using only soft types (no method registry needed yet).

use std::sync::Arc;

use crate::ast::{CallSiteNode, MethodDeclNode, TokenRange};
use crate::context::AnalysisContext;
use crate::ids::ClassId;
use crate::model::method::{MethodIdentity, MethodModifiers};
use crate::typedesc::TypeDescriptor;

/// Synthesizes the identity of a declared method, plus the modifier bits
/// the declaration itself determines (§4.3's table, "method declaration"
/// row). `POSSIBLY_POLYMORPHIC` additionally gets set later, per candidate,
/// during Stage 4's invocation-type propagation.
pub fn identity_of_declaration(
    ctx: &AnalysisContext,
    node: &MethodDeclNode,
    is_interface_member: bool,
) -> (MethodIdentity, MethodModifiers) {
    let return_type = if node.is_constructor {
        None
    } else {
        node.return_type
            .as_ref()
            .and_then(|range| ctx.type_calculator.type_of(range))
    };
    let param_types = node
        .params
        .iter()
        .map(|p| {
            p.type_ref
                .as_ref()
                .and_then(|range| ctx.type_calculator.type_of(range))
                .unwrap_or_else(unresolved_type)
        })
        .collect();

    let mut bits = MethodModifiers::empty();
    if node.body.is_none() {
        bits.insert(MethodModifiers::BODYLESS);
    }
    if node.is_constructor {
        bits.insert(MethodModifiers::CONSTRUCTOR);
    }
    if node.modifiers.is_static {
        bits.insert(MethodModifiers::STATIC);
    }
    if node.modifiers.is_default && is_interface_member {
        bits.insert(MethodModifiers::DEFAULT_IN_INTERFACE);
    }
    if !node.is_constructor
        && !node.modifiers.is_native
        && ((is_interface_member && !node.modifiers.is_default && !node.modifiers.is_static)
            || node.modifiers.is_abstract)
    {
        bits.insert(MethodModifiers::POSSIBLY_POLYMORPHIC);
    }
    if !node.modifiers.is_static && !node.is_constructor {
        bits.insert(MethodModifiers::VIRTUAL);
    }

    (
        MethodIdentity {
            name: node.name.clone(),
            return_type,
            param_types,
        },
        bits,
    )
}

/// Synthesizes the identity of a call site (§4.3's remaining table rows),
/// used by Stage 4 to match against `servicing`'s declared candidates.
/// `enclosing_method_name` and `enclosing_super` supply the context a this()
/// or super()-invocation needs since those sites name no method themselves.
pub fn identity_of_call_site(
    ctx: &AnalysisContext,
    site: &CallSiteNode,
    enclosing_method_name: Option<&str>,
    enclosing_super: Option<&ClassId>,
) -> MethodIdentity {
    let args_soft_types = |args: &[TokenRange]| -> Vec<Arc<dyn TypeDescriptor>> {
        args.iter()
            .map(|a| ctx.type_calculator.type_of(a).unwrap_or_else(unresolved_type))
            .collect()
    };

    match site {
        CallSiteNode::MethodInvocation {
            token_range, name, args, ..
        } => {
            let return_type = ctx
                .binder
                .resolve_method(token_range)
                .and_then(|_| ctx.type_calculator.type_of(token_range))
                .or_else(|| Some(unresolved_type()));
            MethodIdentity {
                name: name.clone(),
                return_type,
                param_types: args_soft_types(args),
            }
        }
        CallSiteNode::InstanceCreation {
            class_name, args, ..
        } => MethodIdentity {
            name: strip_type_arguments(class_name),
            return_type: Some(void_type()),
            param_types: args_soft_types(args),
        },
        CallSiteNode::ThisInvocation { args, .. } => MethodIdentity {
            name: enclosing_method_name.unwrap_or_default().to_string(),
            return_type: Some(void_type()),
            param_types: args_soft_types(args),
        },
        CallSiteNode::SuperInvocation { args, .. } => MethodIdentity {
            name: enclosing_super
                .map(|c| c.as_str().to_string())
                .unwrap_or_default(),
            return_type: Some(void_type()),
            param_types: args_soft_types(args),
        },
        CallSiteNode::SuperMethodInvocation {
            token_range, name, args, ..
        } => {
            let return_type = ctx
                .binder
                .resolve_method(token_range)
                .and_then(|_| ctx.type_calculator.type_of(token_range));
            MethodIdentity {
                name: name.clone(),
                return_type,
                param_types: args_soft_types(args),
            }
        }
        CallSiteNode::EnumConstant { name, args, .. } => MethodIdentity {
            name: name.clone(),
            return_type: Some(void_type()),
            param_types: args_soft_types(args),
        },
        CallSiteNode::QualifiedName { token_range, name } => MethodIdentity {
            name: name.clone(),
            return_type: ctx.type_calculator.type_of(token_range),
            param_types: Vec::new(),
        },
    }
}

fn strip_type_arguments(name: &str) -> String {
    name.split('<').next().unwrap_or(name).to_string()
}

/// A sentinel "unresolved" descriptor standing in for a type the soft-type
/// calculator could not compute. Matches anything as `Maybe(NullType*)`
/// through [`crate::overload::match_type`] rather than blocking resolution.
fn unresolved_type() -> Arc<dyn TypeDescriptor> {
    Arc::new(SentinelType { is_null: true, is_void: false })
}

fn void_type() -> Arc<dyn TypeDescriptor> {
    Arc::new(SentinelType { is_null: false, is_void: true })
}

#[derive(Debug)]
struct SentinelType {
    is_null: bool,
    is_void: bool,
}

impl TypeDescriptor for SentinelType {
    fn name(&self) -> &str {
        if self.is_void {
            "void"
        } else {
            "<unresolved>"
        }
    }

    fn erasure(&self) -> Arc<dyn TypeDescriptor> {
        Arc::new(SentinelType {
            is_null: self.is_null,
            is_void: self.is_void,
        })
    }

    fn matches(&self, _other: &dyn TypeDescriptor) -> bool {
        false
    }

    fn is_null_type(&self) -> bool {
        self.is_null
    }

    fn is_void(&self) -> bool {
        self.is_void
    }
}
