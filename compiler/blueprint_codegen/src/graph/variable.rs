use blueprint_schema::TypeId;

use crate::graph::frame::FrameId;

pub type VarId = la_arena::Idx<Variable>;

/// A named, typed value available in a generated method.
///
/// Invariant (spec.md §3): every variable used inside a method is either
/// (a) a method parameter of the enclosing method, (b) an injected field on
/// the enclosing type, or (c) the output of exactly one frame earlier in
/// that method. `creator` distinguishes case (c) from (a)/(b): it is `None`
/// for parameters and injected fields.
#[derive(Debug, Clone)]
pub struct Variable {
    pub type_id: TypeId,
    /// An identifier safe to emit into generated source.
    pub name: syn::Ident,
    pub creator: Option<FrameId>,
    /// An optional dependency on another variable — set when this variable
    /// is a derived view of another (e.g. a borrowed reference), so the
    /// resolver knows to place that dependency no later than this one.
    pub dependency: Option<VarId>,
}

impl Variable {
    pub fn parameter(type_id: TypeId, name: syn::Ident) -> Self {
        Self {
            type_id,
            name,
            creator: None,
            dependency: None,
        }
    }

    pub fn produced_by(type_id: TypeId, name: syn::Ident, creator: FrameId) -> Self {
        Self {
            type_id,
            name,
            creator: Some(creator),
            dependency: None,
        }
    }

    pub fn is_parameter_or_field(&self) -> bool {
        self.creator.is_none()
    }
}

/// What a frame's [`find_variables`](super::frame::FrameBody::find_variables)
/// hook asks the resolver for.
#[derive(Debug, Clone)]
pub enum VariableRead {
    /// A read of a variable the caller already knows the id of — e.g. the
    /// Execution stage's result variable, handed to PostExecute builders
    /// through the [`crate::middleware::MiddlewareBuilderContext`].
    ById(VarId),
    /// A read expressed by type only — the frame doesn't know (and
    /// shouldn't need to know) whether this will resolve to an injected
    /// field, a per-call scope lookup, or another frame's output. The
    /// resolver and, transitively, the DI-aware instance frame provider
    /// (C6) decide.
    ByType(TypeId),
}
