use ahash::HashMap;
use blueprint_schema::{Lifecycle, ServiceCatalog, TypeId};
use la_arena::Arena;
use proc_macro2::TokenStream;
use quote::quote;

use crate::diagnostic::BlueprintError;
use crate::graph::frame::{FrameBody, FrameId, FrameSlot, VariableBindings, VariableChain};
use crate::graph::variable::{VarId, Variable, VariableRead};
use crate::type_shim::TypeShim;

use super::{ResolvedService, ServiceLookup};

/// Emits `{scope}.get_required_service::<{concrete_type}>()` for a
/// request-scoped or transient dependency.
struct ScopeGetFrame {
    scope: VarId,
    concrete_type: TypeId,
}

impl FrameBody for ScopeGetFrame {
    fn find_variables(&self, _chain: &VariableChain) -> Vec<VariableRead> {
        vec![VariableRead::ById(self.scope)]
    }

    fn emit(&self, bindings: &VariableBindings) -> TokenStream {
        let scope_ident = bindings.get(self.scope);
        let ty = TypeShim::syn_type(&self.concrete_type);
        quote! { #scope_ident.get_required_service::<#ty>() }
    }
}

/// C6: resolves [`VariableRead::ByType`](crate::graph::variable::VariableRead)
/// reads against a [`ServiceCatalog`], per spec.md §4.6:
///
/// - singleton, exactly one impl → a constructor-injected field, no
///   `get_required_service` call in the method body;
/// - scoped or transient → a per-call `scope.get_required_service::<T>()`
///   frame;
/// - zero impls → [`BlueprintError::UnresolvedService`];
/// - more than one impl → delegated to the runtime `get_required_service`
///   call regardless of lifecycle, since the ambiguity can only be broken at
///   the point of use.
pub struct InstanceFrameProvider<'a> {
    catalog: &'a ServiceCatalog,
    scope_var: VarId,
    /// concrete_type -> (requested_type that first produced it, its field variable).
    fields: HashMap<TypeId, (TypeId, VarId)>,
}

impl<'a> InstanceFrameProvider<'a> {
    pub fn new(catalog: &'a ServiceCatalog, scope_var: VarId) -> Self {
        Self {
            catalog,
            scope_var,
            fields: HashMap::default(),
        }
    }

    /// The fields minted for singleton dependencies over this provider's
    /// lifetime, in first-use order — consumed by the type builder (C5) to
    /// emit struct fields and constructor parameters.
    pub fn into_fields(self) -> Vec<(TypeId, VarId)> {
        self.fields.into_values().collect()
    }

    fn resolve_singleton_field(
        &mut self,
        requested_type: &TypeId,
        concrete_type: &TypeId,
        variables: &mut Arena<Variable>,
    ) -> Result<VarId, BlueprintError> {
        if let Some((existing_requested, var_id)) = self.fields.get(concrete_type) {
            if existing_requested != requested_type {
                return Err(BlueprintError::DuplicateInjectedField {
                    type_name: concrete_type.to_string(),
                });
            }
            return Ok(*var_id);
        }
        let name = TypeShim::local_identifier(concrete_type);
        let var_id = variables.alloc(Variable::parameter(concrete_type.clone(), name));
        self.fields
            .insert(concrete_type.clone(), (requested_type.clone(), var_id));
        Ok(var_id)
    }
}

impl ServiceLookup for InstanceFrameProvider<'_> {
    fn resolve(
        &mut self,
        type_id: &TypeId,
        operation: &str,
        variables: &mut Arena<Variable>,
        frames: &mut Arena<FrameSlot>,
    ) -> Result<ResolvedService, BlueprintError> {
        let registrations = self.catalog.lookup(type_id);
        match registrations {
            [] => Err(BlueprintError::UnresolvedService {
                service_type: type_id.to_string(),
                operation: operation.to_string(),
            }),
            [single] if single.lifecycle == Lifecycle::Singleton => {
                let var_id = self.resolve_singleton_field(type_id, &single.concrete_type, variables)?;
                Ok(ResolvedService::Field(var_id))
            }
            [single] => {
                let var_id = variables.alloc(Variable::parameter(
                    single.concrete_type.clone(),
                    TypeShim::local_identifier(&single.concrete_type),
                ));
                let frame_id = frames.alloc(FrameSlot {
                    is_async: false,
                    creates: vec![var_id],
                    stage: blueprint_schema::MiddlewareStage::PreExecute,
                    insertion_index: usize::MAX,
                    body: Box::new(ScopeGetFrame {
                        scope: self.scope_var,
                        concrete_type: single.concrete_type.clone(),
                    }),
                });
                variables[var_id].creator = Some(frame_id);
                Ok(ResolvedService::Frame(frame_id, var_id))
            }
            many => {
                // Multiple impls: delegate to the runtime call regardless of
                // lifecycle — there's no single concrete type to lift into a
                // field, so the ambiguity has to be broken at the call site.
                let name = TypeShim::local_identifier(type_id);
                let var_id = variables.alloc(Variable::parameter(type_id.clone(), name));
                let frame_id = frames.alloc(FrameSlot {
                    is_async: false,
                    creates: vec![var_id],
                    stage: blueprint_schema::MiddlewareStage::PreExecute,
                    insertion_index: usize::MAX,
                    body: Box::new(ScopeGetFrame {
                        scope: self.scope_var,
                        concrete_type: many[0].concrete_type.clone(),
                    }),
                });
                variables[var_id].creator = Some(frame_id);
                Ok(ResolvedService::Frame(frame_id, var_id))
            }
        }
    }
}
