//! A toolkit to accumulate and report generation-time failures.
pub use kind::BlueprintError;
pub use sink::DiagnosticSink;

mod kind;
mod sink;
