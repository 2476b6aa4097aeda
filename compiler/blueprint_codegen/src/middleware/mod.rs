//! C7 — Middleware Pipeline Composer.

mod builder;
mod composer;
mod stage;

pub use builder::{MiddlewareBuilder, MiddlewareBuilderContext};
pub use composer::PipelineComposer;
pub use stage::sort_by_contribution_order;
