//! The generation driver. Modeled on the teacher's own
//! `pavexc::compiler::app::App` — a multi-stage state machine that the host
//! calls into once per generation run: compose the catalog's pipelines,
//! resolve every operation's frame graph, emit formatted source, then
//! (optionally) compile it.

use blueprint_schema::{BlueprintConfig, OperationCatalog, ServiceCatalog};

use crate::assembly::{
    AssemblyBinder, AssemblyEmitter, CompilationRequest, CompiledAssembly, Compiler, GeneratedAssembly, load_library,
};
use crate::diagnostic::{BlueprintError, DiagnosticSink};
use crate::middleware::PipelineComposer;

/// Where a generation run is in its lifecycle.
///
/// `Failed` is terminal: once any operation's composition or resolution
/// fails, the run collects every remaining operation's diagnostics too
/// (spec.md §7 treats all of these as fatal-at-build) rather than stopping
/// at the first one, but it never proceeds to `Compiled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Unbuilt,
    Composing,
    Resolving,
    Emitting,
    Compiled,
    Failed,
}

pub struct App {
    catalog: OperationCatalog,
    service_catalog: ServiceCatalog,
    composer: PipelineComposer,
    config: BlueprintConfig,
    state: BuildState,
    diagnostics: DiagnosticSink,
    assembly: Option<GeneratedAssembly>,
    compiled: Option<CompiledAssembly>,
    /// Kept alive for as long as `bind()`'s resolved symbols are in use —
    /// dropping it would unmap the executors' code out from under the
    /// registry (spec.md §4.8, "binds generated types to their descriptors").
    library: Option<libloading::Library>,
}

impl App {
    pub fn new(
        catalog: OperationCatalog,
        service_catalog: ServiceCatalog,
        composer: PipelineComposer,
        config: BlueprintConfig,
    ) -> Self {
        Self {
            catalog,
            service_catalog,
            composer,
            config,
            state: BuildState::Unbuilt,
            diagnostics: DiagnosticSink::new(),
            assembly: None,
            compiled: None,
            library: None,
        }
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    pub fn diagnostics(&self) -> &DiagnosticSink {
        &self.diagnostics
    }

    /// Compose and resolve every operation, emitting formatted source for
    /// each. Every operation is attempted even after an earlier one fails,
    /// so a single generation run surfaces every fatal diagnostic rather
    /// than just the first (mirrors the teacher's own `App::build`, which
    /// keeps walking its component graph after recording a `miette`
    /// diagnostic).
    #[tracing::instrument(skip_all, fields(app_name = %self.config.app_name))]
    pub fn build(&mut self) -> Result<(), BlueprintError> {
        self.state = BuildState::Composing;
        let emitter = AssemblyEmitter::new(&self.service_catalog, vec!["generated".to_string()]);

        self.state = BuildState::Resolving;
        let mut assembly = GeneratedAssembly::default();
        let mut first_error = None;
        for operation in &self.catalog.operations {
            match emitter.emit_operation(&self.composer, &self.catalog, operation) {
                Ok(file) => assembly.push(&operation.name, file),
                Err(err) => {
                    tracing::error!(operation = %operation.name, error = %err, "operation failed to generate");
                    if first_error.is_none() {
                        first_error = Some(clone_error(&err));
                    }
                    self.diagnostics.push(err);
                }
            }
        }

        if self.diagnostics.has_errored() {
            self.state = BuildState::Failed;
            return Err(first_error.expect("has_errored implies at least one diagnostic"));
        }

        self.state = BuildState::Emitting;
        self.assembly = Some(assembly);
        Ok(())
    }

    /// Compile the already-emitted assembly. Only valid after
    /// [`App::build`] has left the run in [`BuildState::Emitting`].
    pub fn codegen(&mut self, compiler: &dyn Compiler) -> Result<(), BlueprintError> {
        let assembly = self
            .assembly
            .as_ref()
            .expect("codegen called before build reached BuildState::Emitting");

        let request = CompilationRequest {
            assembly_name: &self.config.assembly_name,
            source: &assembly.what_code_did_i_generate(),
            optimization_level: self.config.optimization_level,
            strategy: self.config.compile_strategy,
            extern_crates: &self.config.extern_crates,
        };
        match compiler.compile(request) {
            Ok(compiled) => {
                self.compiled = Some(compiled);
                self.state = BuildState::Compiled;
                Ok(())
            }
            Err(err) => {
                self.diagnostics.push(clone_error(&err));
                self.state = BuildState::Failed;
                Err(err)
            }
        }
    }

    /// Load the compiled assembly and bind every operation's generated
    /// executor into a fresh [`blueprint_runtime::ExecutorRegistry`]. Only
    /// valid after [`App::codegen`] has left the run in
    /// [`BuildState::Compiled`]. The returned registry borrows nothing from
    /// `self`; the loaded library it's backed by is kept alive inside `self`
    /// for the rest of the app's lifetime.
    pub fn bind(
        &mut self,
        scope: &dyn blueprint_runtime::Scope,
    ) -> Result<blueprint_runtime::ExecutorRegistry, BlueprintError> {
        let compiled = self
            .compiled
            .as_ref()
            .expect("bind called before codegen reached BuildState::Compiled");
        let library = load_library(&compiled.library_path)?;
        let registry = AssemblyBinder::bind(&library, &self.catalog, scope)?;
        self.library = Some(library);
        Ok(registry)
    }

    pub fn compiled(&self) -> Option<&CompiledAssembly> {
        self.compiled.as_ref()
    }

    pub fn what_code_did_i_generate(&self) -> Option<String> {
        self.assembly.as_ref().map(GeneratedAssembly::what_code_did_i_generate)
    }

    pub fn what_code_did_i_generate_for(&self, operation: &str) -> Option<&str> {
        self.assembly
            .as_ref()
            .and_then(|a| a.what_code_did_i_generate_for(operation))
    }
}

/// [`BlueprintError`] doesn't derive `Clone` (it carries a `thiserror`
/// wrapper over heterogeneous payloads) so the driver re-materializes one
/// from its rendered message when it needs to keep both the sink entry and
/// a return value.
fn clone_error(err: &BlueprintError) -> BlueprintError {
    match err {
        BlueprintError::UnresolvedService { service_type, operation } => BlueprintError::UnresolvedService {
            service_type: service_type.clone(),
            operation: operation.clone(),
        },
        BlueprintError::MissingHandler { operation } => BlueprintError::MissingHandler {
            operation: operation.clone(),
        },
        BlueprintError::MissingReturnValue { operation, handler } => BlueprintError::MissingReturnValue {
            operation: operation.clone(),
            handler: handler.clone(),
        },
        BlueprintError::DuplicateInjectedField { type_name } => BlueprintError::DuplicateInjectedField {
            type_name: type_name.clone(),
        },
        BlueprintError::PipelineCycle { operation, frame_path } => BlueprintError::PipelineCycle {
            operation: operation.clone(),
            frame_path: frame_path.clone(),
        },
        BlueprintError::CompilationError {
            type_name,
            diagnostics,
            offending_source,
        } => BlueprintError::CompilationError {
            type_name: type_name.clone(),
            diagnostics: diagnostics.clone(),
            offending_source: offending_source.clone(),
        },
        BlueprintError::StaleStageRegistration { stage, operation } => BlueprintError::StaleStageRegistration {
            stage: *stage,
            operation: operation.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{FrameBody, VariableBindings, VariableChain, VariableRead};
    use crate::middleware::{MiddlewareBuilder, MiddlewareBuilderContext};
    use blueprint_schema::{MiddlewareStage, OperationDescriptor, OptimizationLevel, CompileStrategy, TypeId};
    use proc_macro2::TokenStream;
    use quote::quote;

    struct NoopFrame;
    impl FrameBody for NoopFrame {
        fn find_variables(&self, _chain: &VariableChain) -> Vec<VariableRead> {
            vec![]
        }
        fn emit(&self, _bindings: &VariableBindings) -> TokenStream {
            quote! {}
        }
    }

    struct AnyHandler;
    impl MiddlewareBuilder for AnyHandler {
        fn stage(&self) -> MiddlewareStage {
            MiddlewareStage::Execution
        }
        fn matches(&self, _operation: &OperationDescriptor) -> bool {
            true
        }
        fn build(&self, _ctx: &MiddlewareBuilderContext) -> Box<dyn FrameBody> {
            Box::new(NoopFrame)
        }
    }

    fn config() -> BlueprintConfig {
        BlueprintConfig {
            app_name: "test-app".to_string(),
            assembly_name: "test_assembly".to_string(),
            optimization_level: OptimizationLevel::Debug,
            compile_strategy: CompileStrategy::InMemory,
            extern_crates: vec![],
        }
    }

    #[test]
    fn build_fails_when_an_operation_has_no_handler() {
        let mut catalog = OperationCatalog::default();
        catalog.push(OperationDescriptor {
            name: "Orphan".to_string(),
            payload_type: TypeId::new(["myapp", "Orphan"]),
            properties: vec![],
            responses: vec![],
            features: Default::default(),
            requires_return_value: false,
            link_templates: vec![],
            base_operation: None,
        });
        let mut app = App::new(catalog, ServiceCatalog::default(), PipelineComposer::new(), config());
        let err = app.build().unwrap_err();
        assert_eq!(err.kind(), "missing_handler");
        assert_eq!(app.state(), BuildState::Failed);
    }

    #[test]
    fn build_succeeds_and_reaches_emitting_when_every_operation_has_a_handler() {
        let mut catalog = OperationCatalog::default();
        catalog.push(OperationDescriptor {
            name: "Ping".to_string(),
            payload_type: TypeId::new(["myapp", "Ping"]),
            properties: vec![],
            responses: vec![],
            features: Default::default(),
            requires_return_value: false,
            link_templates: vec![],
            base_operation: None,
        });
        let mut composer = PipelineComposer::new();
        composer.register(Box::new(AnyHandler));
        let mut app = App::new(catalog, ServiceCatalog::default(), composer, config());
        app.build().unwrap();
        assert_eq!(app.state(), BuildState::Emitting);
        assert!(app.what_code_did_i_generate_for("Ping").is_some());
    }
}
