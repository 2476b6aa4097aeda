//! The stateless middleware capability interface (spec.md §4.7).

use blueprint_schema::{MiddlewareStage, OperationDescriptor};

use crate::graph::{FrameBody, VarId};

/// What a [`MiddlewareBuilder`] needs to decide whether it applies, and to
/// build its frame if it does.
pub struct MiddlewareBuilderContext<'a> {
    pub operation: &'a OperationDescriptor,
    /// The insertion index this frame will be given if built — already
    /// monotonic across the whole pipeline, not just this stage.
    pub insertion_index: usize,
    /// The Execution stage's result variable, once one has been minted —
    /// handed to PostExecute builders the way [`crate::graph::VariableRead::ById`]'s
    /// doc comment describes. `None` for every stage up to and including the
    /// handler that actually produces it.
    pub result_var: Option<VarId>,
}

/// One reusable piece of pipeline behaviour. Builders are stateless and
/// registered once with the [`super::composer::PipelineComposer`]; they're
/// asked, for every operation and every stage they're registered against,
/// whether they apply (`matches`) and, if so, to produce the frame that
/// implements them (`build`).
///
/// Deliberately two methods rather than one `Option<FrameSlot>`-returning
/// method: `matches` is also used by the Execution stage's handler-selection
/// logic (`super::composer::PipelineComposer::select_execution_handlers`)
/// without needing to build a frame just to find out.
pub trait MiddlewareBuilder: Send + Sync {
    fn stage(&self) -> MiddlewareStage;

    fn matches(&self, operation: &OperationDescriptor) -> bool;

    fn build(&self, ctx: &MiddlewareBuilderContext) -> Box<dyn FrameBody>;

    /// Whether the frame this builder produces introduces a suspension
    /// point (spec.md §5). Most middleware is synchronous; handlers and I/O
    /// bound builders override this.
    fn is_async(&self) -> bool {
        false
    }

    /// Whether this builder's frame, once built, actually produces the
    /// operation's result value (spec.md §4.7: "The return value of the
    /// last matching handler that *does* return a value becomes the
    /// method's result"). Most Execution-stage handlers are side-effecting
    /// only and leave this `false`; value-returning handlers override it.
    fn produces_result(&self, _operation: &OperationDescriptor) -> bool {
        false
    }
}
