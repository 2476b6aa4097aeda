//! C9 — turning a payload into a call against the executor registry, with
//! guaranteed scope disposal on every exit path.

use std::any::Any;

use crate::context::ApiOperationContext;
use crate::registry::{ExecutorRegistry, Payload};
use crate::result::OperationResult;
use crate::scope::Scope;

/// Builds a fresh [`Scope`] for one call. The host implements this once,
/// wiring it to whatever request-scoped state (a connection, a request ID)
/// its framework hands it per request.
pub trait ScopeFactory: Send + Sync {
    type Scope: Scope;

    fn new_scope(&self, context: &ApiOperationContext) -> Self::Scope;
}

/// Owns the registry and knows how to build scopes; doesn't own contexts or
/// payloads, those arrive per call.
pub struct Dispatcher<F: ScopeFactory> {
    registry: ExecutorRegistry,
    scope_factory: F,
}

impl<F: ScopeFactory> Dispatcher<F> {
    pub fn new(registry: ExecutorRegistry, scope_factory: F) -> Self {
        Self {
            registry,
            scope_factory,
        }
    }

    /// Dispatch against an existing scope, e.g. one a parent operation
    /// already built and wants child operations to share.
    pub async fn execute(
        &self,
        payload: Box<dyn Payload>,
        scope: &dyn Scope,
    ) -> OperationResult<Box<dyn Any + Send>> {
        self.registry.dispatch(payload, scope).await
    }

    /// Build a scope for this call, dispatch against it, and let it drop
    /// when this function returns. There's no explicit dispose or finally:
    /// `scope` is a local owned value, so Rust drops it on every exit path —
    /// success, error variant, or a panic unwinding through `.await` — the
    /// same guarantee a try/finally would give, for free.
    #[tracing::instrument(skip_all, fields(operation = %context.operation_name()))]
    pub async fn execute_with_new_scope(
        &self,
        payload: Box<dyn Payload>,
        context: &ApiOperationContext,
    ) -> OperationResult<Box<dyn Any + Send>> {
        let scope = self.scope_factory.new_scope(context);
        self.registry.dispatch(payload, &scope).await
    }
}
