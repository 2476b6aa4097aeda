//! C7 — Middleware Pipeline Composer.

use blueprint_schema::{MiddlewareStage, OperationCatalog, OperationDescriptor};

use crate::diagnostic::BlueprintError;
use crate::graph::{FrameGraph, FrameId, FrameSlot, VarId, Variable};

use super::builder::{MiddlewareBuilder, MiddlewareBuilderContext};

/// Composes the fixed nine-stage pipeline (spec.md §4.7) for one operation
/// out of whatever [`MiddlewareBuilder`]s are registered and match it.
///
/// Registration order is preserved within a stage; frames are allocated in
/// `(stage, insertion_index)` order directly, so the list this returns is
/// already in the order [`crate::graph::resolver::resolve`] expects.
pub struct PipelineComposer {
    builders: Vec<Box<dyn MiddlewareBuilder>>,
}

impl PipelineComposer {
    pub fn new() -> Self {
        Self { builders: Vec::new() }
    }

    pub fn register(&mut self, builder: Box<dyn MiddlewareBuilder>) -> &mut Self {
        self.builders.push(builder);
        self
    }

    /// Build every matching frame for `operation`, across all nine stages,
    /// in contribution order. Returns the contributed frames plus, if one
    /// was minted, the operation's result variable — the one produced by
    /// the *last* Execution-stage handler that actually produces a value,
    /// not simply the last handler that ran.
    pub fn compose(
        &self,
        graph: &mut FrameGraph,
        catalog: &OperationCatalog,
        operation: &OperationDescriptor,
    ) -> Result<(Vec<FrameId>, Option<VarId>), BlueprintError> {
        let mut contributed = Vec::new();
        let mut insertion_index = 0usize;
        let mut minted_result_var: Option<VarId> = None;

        for stage in MiddlewareStage::ALL {
            if stage == MiddlewareStage::Execution {
                let handlers = self.select_execution_handlers(operation, catalog)?;

                // spec.md §4.7: "the return value of the *last* matching
                // handler that does return a value becomes the method's
                // result" — so only the last producer among the handlers we
                // run gets a result variable to create.
                let last_producer = handlers
                    .iter()
                    .enumerate()
                    .filter(|(_, h)| h.produces_result(operation))
                    .map(|(i, _)| i)
                    .next_back();

                let result_var = if operation.requires_return_value {
                    last_producer.map(|_| {
                        let result_type = operation
                            .success_response_type()
                            .unwrap_or_else(|| blueprint_schema::TypeId::new(["blueprint_runtime", "OperationResult"]));
                        graph
                            .variables
                            .alloc(Variable::parameter(result_type, syn::Ident::new("result", proc_macro2::Span::call_site())))
                    })
                } else {
                    None
                };

                for (i, handler) in handlers.into_iter().enumerate() {
                    let ctx = MiddlewareBuilderContext {
                        operation,
                        insertion_index,
                        result_var: None,
                    };
                    let body = handler.build(&ctx);
                    let creates: Vec<_> = if Some(i) == last_producer {
                        result_var.into_iter().collect()
                    } else {
                        Vec::new()
                    };
                    let frame_id = graph.frames.alloc(FrameSlot {
                        is_async: handler.is_async(),
                        creates: creates.clone(),
                        stage,
                        insertion_index,
                        body,
                    });
                    if let Some(var_id) = creates.first() {
                        graph.variables[*var_id].creator = Some(frame_id);
                        minted_result_var = Some(*var_id);
                    }
                    contributed.push(frame_id);
                    insertion_index += 1;
                }
                continue;
            }

            // PostExecute and Teardown builders run after the Execution
            // stage has (possibly) minted a result variable — earlier
            // stages never see one, since it doesn't exist yet.
            let result_var = if stage > MiddlewareStage::Execution {
                minted_result_var
            } else {
                None
            };

            for builder in self
                .builders
                .iter()
                .filter(|b| b.stage() == stage && b.matches(operation))
            {
                let ctx = MiddlewareBuilderContext {
                    operation,
                    insertion_index,
                    result_var,
                };
                let frame_id = graph.frames.alloc(FrameSlot {
                    is_async: builder.is_async(),
                    creates: vec![],
                    stage,
                    insertion_index,
                    body: builder.build(&ctx),
                });
                contributed.push(frame_id);
                insertion_index += 1;
            }
        }

        Ok((contributed, minted_result_var))
    }

    /// Pick every Execution-stage handler that applies to `operation`
    /// (spec.md §4.9, "Polymorphic handler order"): the operation's base
    /// handler first (if this operation declares a `base_operation` and one
    /// is registered for it), then the operation's own handler (if one is
    /// registered), in that order — "Multiple handlers (base + concrete) are
    /// emitted in declaration order (base first), each awaited in sequence."
    /// Neither found is a [`BlueprintError::MissingHandler`].
    ///
    /// No type-test or cast guards: the choice is made once, here, at
    /// compose time, against the static catalog — never re-checked at
    /// dispatch time against a runtime type.
    fn select_execution_handlers<'a>(
        &'a self,
        operation: &OperationDescriptor,
        catalog: &OperationCatalog,
    ) -> Result<Vec<&'a dyn MiddlewareBuilder>, BlueprintError> {
        let execution_builders: Vec<&dyn MiddlewareBuilder> = self
            .builders
            .iter()
            .filter(|b| b.stage() == MiddlewareStage::Execution)
            .map(|b| b.as_ref())
            .collect();

        let mut handlers = Vec::new();

        if let Some(base_name) = &operation.base_operation {
            if let Some(base_op) = catalog.operations.iter().find(|o| &o.name == base_name) {
                if let Some(b) = execution_builders.iter().find(|b| b.matches(base_op)) {
                    handlers.push(*b);
                }
            }
        }

        if let Some(b) = execution_builders.iter().find(|b| b.matches(operation)) {
            handlers.push(*b);
        }

        if handlers.is_empty() {
            return Err(BlueprintError::MissingHandler {
                operation: operation.name.clone(),
            });
        }

        Ok(handlers)
    }
}

impl Default for PipelineComposer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{FrameBody, VariableBindings, VariableChain, VariableRead};
    use blueprint_schema::{OperationDescriptor, TypeId};
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

    struct HandlerFor(&'static str);
    impl MiddlewareBuilder for HandlerFor {
        fn stage(&self) -> MiddlewareStage {
            MiddlewareStage::Execution
        }
        fn matches(&self, operation: &OperationDescriptor) -> bool {
            operation.name == self.0
        }
        fn build(&self, _ctx: &MiddlewareBuilderContext) -> Box<dyn FrameBody> {
            Box::new(NoopFrame)
        }
    }

    fn operation(name: &str, base: Option<&str>) -> OperationDescriptor {
        OperationDescriptor {
            name: name.to_string(),
            payload_type: TypeId::new(["myapp", name]),
            properties: vec![],
            responses: vec![],
            features: Default::default(),
            requires_return_value: false,
            link_templates: vec![],
            base_operation: base.map(str::to_string),
        }
    }

    #[test]
    fn missing_handler_is_reported_when_nothing_matches() {
        let composer = PipelineComposer::new();
        let mut graph = FrameGraph::new();
        let catalog = OperationCatalog::default();
        let op = operation("CreateUser", None);
        let err = composer.compose(&mut graph, &catalog, &op).unwrap_err();
        assert_eq!(err.kind(), "missing_handler");
    }

    #[test]
    fn subtype_falls_back_to_base_operations_handler() {
        let mut composer = PipelineComposer::new();
        composer.register(Box::new(HandlerFor("BaseOp")));
        let mut graph = FrameGraph::new();
        let mut catalog = OperationCatalog::default();
        catalog.push(operation("BaseOp", None));
        let subtype = operation("SubOp", Some("BaseOp"));
        catalog.push(subtype.clone());

        let (frames, result_var) = composer.compose(&mut graph, &catalog, &subtype).unwrap();
        assert_eq!(frames.len(), 1);
        assert!(result_var.is_none());
    }

    #[test]
    fn both_base_and_own_handlers_run_base_first_when_both_match() {
        let mut composer = PipelineComposer::new();
        composer.register(Box::new(HandlerFor("BaseOp")));
        composer.register(Box::new(HandlerFor("SubOp")));
        let mut graph = FrameGraph::new();
        let mut catalog = OperationCatalog::default();
        catalog.push(operation("BaseOp", None));
        let subtype = operation("SubOp", Some("BaseOp"));
        catalog.push(subtype.clone());

        let (frames, result_var) = composer.compose(&mut graph, &catalog, &subtype).unwrap();
        assert_eq!(frames.len(), 2);
        assert!(result_var.is_none());
        assert_eq!(graph.frames[frames[0]].stage, MiddlewareStage::Execution);
        assert_eq!(graph.frames[frames[1]].stage, MiddlewareStage::Execution);
    }

    /// The literal spec.md §8 polymorphic dispatch scenario: handlers
    /// registered for `OperationBase`, `OperationChild1`, `OperationChild2`;
    /// dispatching `OperationChild2` runs both `OperationBase`'s and
    /// `OperationChild2`'s handlers, base first, and `OperationChild1`'s
    /// handler never runs.
    #[test]
    fn polymorphic_dispatch_runs_base_and_matching_child_handler_only() {
        let mut composer = PipelineComposer::new();
        composer.register(Box::new(HandlerFor("OperationBase")));
        composer.register(Box::new(HandlerFor("OperationChild1")));
        composer.register(Box::new(HandlerFor("OperationChild2")));

        let mut catalog = OperationCatalog::default();
        catalog.push(operation("OperationBase", None));
        catalog.push(operation("OperationChild1", Some("OperationBase")));
        let child2 = operation("OperationChild2", Some("OperationBase"));
        catalog.push(child2.clone());

        let mut graph = FrameGraph::new();
        let (frames, _) = composer.compose(&mut graph, &catalog, &child2).unwrap();
        assert_eq!(frames.len(), 2);
    }

    struct ValueHandlerFor(&'static str);
    impl MiddlewareBuilder for ValueHandlerFor {
        fn stage(&self) -> MiddlewareStage {
            MiddlewareStage::Execution
        }
        fn matches(&self, operation: &OperationDescriptor) -> bool {
            operation.name == self.0
        }
        fn build(&self, _ctx: &MiddlewareBuilderContext) -> Box<dyn FrameBody> {
            Box::new(NoopFrame)
        }
        fn produces_result(&self, _operation: &OperationDescriptor) -> bool {
            true
        }
    }

    #[test]
    fn only_the_last_producing_handler_mints_a_result_variable() {
        let mut composer = PipelineComposer::new();
        composer.register(Box::new(HandlerFor("BaseOp")));
        composer.register(Box::new(ValueHandlerFor("SubOp")));
        let mut graph = FrameGraph::new();
        let mut catalog = OperationCatalog::default();
        catalog.push(operation("BaseOp", None));
        let mut subtype = operation("SubOp", Some("BaseOp"));
        subtype.requires_return_value = true;
        subtype.responses.push(blueprint_schema::ResponseDescriptor {
            status_code: 200,
            payload_type: TypeId::new(["myapp", "SubOpResponse"]),
            category: blueprint_schema::ResponseCategory::Success,
        });
        catalog.push(subtype.clone());

        let (frames, result_var) = composer.compose(&mut graph, &catalog, &subtype).unwrap();
        assert_eq!(frames.len(), 2);
        assert!(graph.frames[frames[0]].creates.is_empty());
        assert_eq!(graph.frames[frames[1]].creates.len(), 1);
        assert_eq!(result_var, graph.frames[frames[1]].creates.first().copied());
        assert!(result_var.is_some());
    }
}
