use blueprint_schema::MiddlewareStage;
use proc_macro2::TokenStream;

use crate::graph::variable::{VarId, VariableRead};

pub type FrameId = la_arena::Idx<FrameSlot>;

/// What a [`FrameSlot`] actually does: read some variables, write some
/// code, and report which variables it reads so the resolver can find
/// their producers.
///
/// Frames form a DAG keyed by producer→consumer relationships (spec.md
/// §3); cycles are an invariant violation, not something this trait needs
/// to worry about — that's the resolver's job (`crate::graph::resolver`).
pub trait FrameBody: Send + Sync {
    /// The variables this frame reads, given the chain of variables that
    /// are in scope at this point in the method (parameters, injected
    /// fields, and the outputs of frames placed earlier).
    fn find_variables(&self, chain: &VariableChain) -> Vec<VariableRead>;

    /// Emit this frame's body, given the already-resolved identifiers for
    /// every variable it reads (see [`VariableBindings`]).
    fn emit(&self, bindings: &VariableBindings) -> TokenStream;
}

/// A unit of generated code contributing zero or more variables and
/// consuming zero or more variables.
pub struct FrameSlot {
    /// Whether this frame introduces a suspension point (spec.md §5).
    pub is_async: bool,
    /// The variables this frame produces, in emission order.
    pub creates: Vec<VarId>,
    /// Where in the stage order this frame was contributed — used for
    /// tie-breaking (spec.md §4.3: "the one contributed earlier (lower
    /// stage, then lower insertion index within stage) wins").
    pub stage: MiddlewareStage,
    pub insertion_index: usize,
    pub body: Box<dyn FrameBody>,
}

impl std::fmt::Debug for FrameSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSlot")
            .field("is_async", &self.is_async)
            .field("creates", &self.creates)
            .field("stage", &self.stage)
            .field("insertion_index", &self.insertion_index)
            .finish_non_exhaustive()
    }
}

/// The ordered list of variables visible at some point in a method's
/// resolution: parameters and injected fields first, then the outputs of
/// every frame placed so far, in placement order.
#[derive(Debug, Default, Clone)]
pub struct VariableChain {
    pub placed: Vec<VarId>,
}

impl VariableChain {
    pub fn contains(&self, id: VarId) -> bool {
        self.placed.contains(&id)
    }

    pub fn push(&mut self, id: VarId) {
        self.placed.push(id);
    }
}

/// Maps each variable a frame reads to the identifier it should emit to
/// reference it — built by the method builder right before calling
/// [`FrameBody::emit`].
#[derive(Debug, Default)]
pub struct VariableBindings {
    pub names: ahash::HashMap<VarId, syn::Ident>,
}

impl VariableBindings {
    pub fn get(&self, id: VarId) -> &syn::Ident {
        self.names
            .get(&id)
            .expect("resolver invariant violated: frame emitted before its dependency was bound")
    }
}
