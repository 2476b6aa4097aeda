//! Runtime support for code `blueprint_codegen` emits: DI scopes, the
//! executor registry and polymorphic dispatch, cancellation-aware call
//! contexts, and retry policies. Generated assemblies are compiled against
//! this crate, not against `blueprint_codegen` itself.

pub mod context;
pub mod dispatch;
pub mod registry;
pub mod result;
pub mod retry;
pub mod scope;

pub use context::ApiOperationContext;
pub use dispatch::{Dispatcher, ScopeFactory};
pub use registry::{Executor, ExecutorRegistry, Payload};
pub use result::OperationResult;
pub use retry::{run_with_retries, RetryPolicy};
pub use scope::{Scope, ServiceFactory, ServiceProviderScope};
