use thiserror::Error;

use blueprint_schema::MiddlewareStage;

/// The closed set of generation-time failures described in spec.md §7.
///
/// Every variant here is fatal at build time: the driver never attempts to
/// recover from one, it records it in the [`super::DiagnosticSink`] and, once
/// the whole catalog has been walked, refuses to enter the `Compiled` state
/// (see `crate::app::BuildState`).
#[derive(Debug, Error)]
pub enum BlueprintError {
    #[error(
        "`{service_type}` is required by operation `{operation}` but no implementation was registered for it"
    )]
    UnresolvedService {
        service_type: String,
        operation: String,
    },

    #[error("operation `{operation}` has no handler registered for its Execution stage")]
    MissingHandler { operation: String },

    #[error(
        "operation `{operation}` requires a return value but the handler chain never produced one (last handler considered: `{handler}`)"
    )]
    MissingReturnValue { operation: String, handler: String },

    #[error(
        "two injected fields of type `{type_name}` were requested for the same executor; one was a concrete type, the other the interface it implements — this is a duplicate constructor argument"
    )]
    DuplicateInjectedField { type_name: String },

    #[error("the frame graph for operation `{operation}` contains a cycle: {frame_path}")]
    PipelineCycle {
        operation: String,
        frame_path: String,
    },

    #[error("the compiler rejected the generated source for `{type_name}`:\n{diagnostics}")]
    CompilationError {
        type_name: String,
        diagnostics: String,
        /// The full generated source, attached verbatim for diagnosis
        /// (spec.md §4.8: "surface a `CompilationError`... with the *full*
        /// generated source attached").
        offending_source: String,
    },

    #[error(
        "middleware stage `{stage}` has no registered builder, but operation `{operation}` matched one in an earlier generation pass"
    )]
    StaleStageRegistration {
        stage: MiddlewareStage,
        operation: String,
    },
}

impl BlueprintError {
    /// A short, stable tag for the error kind, independent of the formatted
    /// message. Used by tests asserting on *which* failure occurred without
    /// pattern-matching the enum.
    pub fn kind(&self) -> &'static str {
        match self {
            BlueprintError::UnresolvedService { .. } => "unresolved_service",
            BlueprintError::MissingHandler { .. } => "missing_handler",
            BlueprintError::MissingReturnValue { .. } => "missing_return_value",
            BlueprintError::DuplicateInjectedField { .. } => "duplicate_injected_field",
            BlueprintError::PipelineCycle { .. } => "pipeline_cycle",
            BlueprintError::CompilationError { .. } => "compilation_error",
            BlueprintError::StaleStageRegistration { .. } => "stale_stage_registration",
        }
    }
}
