//! C9 — Executor registry.
//!
//! Maps an operation's payload to the executor `blueprint_codegen` emitted
//! for it. Payloads are type-erased on the way in — registration is the one
//! place that's still generic, via [`ExecutorRegistry::register`] — so the
//! registry itself can hold executors for operations with unrelated payload
//! and output types in one collection.

use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use ahash::HashMap;

use crate::result::OperationResult;
use crate::scope::Scope;

/// A payload that knows its own operation name and, for polymorphic
/// dispatch (spec.md §4.9), the operation it's a specialisation of.
///
/// Downcasting support (`as_any`/`into_any`) stands in for the trait
/// upcasting a payload hierarchy would otherwise need — generated payload
/// types implement this by hand, the same way they'd implement any other
/// marker trait the host's DI container needs.
pub trait Payload: Send + 'static {
    fn operation_name(&self) -> &'static str;

    fn base_operation_name(&self) -> Option<&'static str> {
        None
    }

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type Thunk = Arc<dyn for<'a> Fn(Box<dyn Any + Send>, &'a dyn Scope) -> BoxFuture<'a, OperationResult<Box<dyn Any + Send>>> + Send + Sync>;

/// What generated code (and anything else implementing an operation)
/// conforms to.
pub trait Executor<P: Send + 'static>: Send + Sync {
    type Output: Send + 'static;

    fn execute<'a>(&'a self, payload: P, scope: &'a dyn Scope) -> BoxFuture<'a, OperationResult<Self::Output>>;
}

#[derive(Default)]
pub struct ExecutorRegistry {
    thunks: HashMap<&'static str, Thunk>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `executor` for `operation_name`. Most callers won't name
    /// `P`/`E` explicitly — they're inferred from `executor`.
    pub fn register<P, E>(&mut self, operation_name: &'static str, executor: E)
    where
        P: Send + 'static,
        E: Executor<P> + 'static,
    {
        let executor = Arc::new(executor);
        let thunk: Thunk = Arc::new(move |payload, scope| {
            let executor = Arc::clone(&executor);
            Box::pin(async move {
                let payload = *payload
                    .downcast::<P>()
                    .unwrap_or_else(|_| panic!("payload type mismatch for operation `{operation_name}`"));
                executor
                    .execute(payload, scope)
                    .await
                    .map(|output| Box::new(output) as Box<dyn Any + Send>)
            })
        });
        self.thunks.insert(operation_name, thunk);
    }

    /// Resolve the executor for `payload`, falling back to its
    /// `base_operation_name` when no exact registration exists — the
    /// runtime side of the "most-specific match wins" rule spec.md §4.9
    /// describes; the hard cases (is there a handler at all, declaration
    /// order among ties) are already settled at generation time by
    /// `blueprint_codegen`'s pipeline composer.
    fn resolve(&self, payload: &dyn Payload) -> Option<&Thunk> {
        self.thunks
            .get(payload.operation_name())
            .or_else(|| payload.base_operation_name().and_then(|name| self.thunks.get(name)))
    }

    pub async fn dispatch(
        &self,
        payload: Box<dyn Payload>,
        scope: &dyn Scope,
    ) -> OperationResult<Box<dyn Any + Send>> {
        let Some(thunk) = self.resolve(payload.as_ref()) else {
            return OperationResult::UnhandledException(anyhow::anyhow!(
                "no executor registered for operation `{}`",
                payload.operation_name()
            ));
        };
        let thunk = Arc::clone(thunk);
        thunk(payload.into_any_payload(), scope).await
    }
}

/// Bridges `Box<dyn Payload>` to the `Box<dyn Any + Send>` the thunk
/// expects, without making `into_any` itself part of the public API twice.
trait IntoAnyPayload {
    fn into_any_payload(self) -> Box<dyn Any + Send>;
}

impl IntoAnyPayload for Box<dyn Payload> {
    fn into_any_payload(self) -> Box<dyn Any + Send> {
        Payload::into_any(self)
    }
}
