//! C6 — DI-aware instance frame provider.
//!
//! Bridges a [`VariableRead::ByType`](crate::graph::variable::VariableRead)
//! the resolver can't satisfy from the variable chain to the host's service
//! catalog: singletons become a constructor-injected field, scoped and
//! transient services become a per-call `scope.get_required_service::<T>()`
//! frame, and unregistered types are a fatal [`BlueprintError::UnresolvedService`].

mod instance_provider;

pub use instance_provider::InstanceFrameProvider;

use blueprint_schema::TypeId;
use la_arena::Arena;

use crate::diagnostic::BlueprintError;
use crate::graph::frame::FrameSlot;
use crate::graph::variable::{VarId, Variable};

/// What resolving a [`VariableRead::ByType`](crate::graph::variable::VariableRead)
/// against the service catalog produced.
pub enum ResolvedService {
    /// An existing or newly-minted injected field — already present in the
    /// variable chain, no frame to place.
    Field(VarId),
    /// A newly-minted frame (and the variable it produces) that the
    /// resolver still needs to place.
    Frame(crate::graph::frame::FrameId, VarId),
}

/// The interface the resolver (`crate::graph::resolver`) depends on, kept
/// separate from [`InstanceFrameProvider`] so tests can stub it out without
/// constructing a real service catalog.
pub trait ServiceLookup {
    fn resolve(
        &mut self,
        type_id: &TypeId,
        operation: &str,
        variables: &mut Arena<Variable>,
        frames: &mut Arena<FrameSlot>,
    ) -> Result<ResolvedService, BlueprintError>;
}
