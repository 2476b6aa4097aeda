use tokio_util::sync::CancellationToken;

/// Per-call ambient context handed to a [`crate::dispatch::Dispatcher`]
/// alongside an operation's payload: which operation is running and the
/// token used to cancel it (spec.md's "Cancellation token propagation").
///
/// Cheap to clone — cloning shares the same underlying token, it doesn't
/// fork a new one.
#[derive(Debug, Clone)]
pub struct ApiOperationContext {
    operation_name: String,
    cancellation: CancellationToken,
}

impl ApiOperationContext {
    pub fn new(operation_name: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            cancellation: CancellationToken::new(),
        }
    }

    /// A context linked to `parent`'s cancellation: cancelling `parent`
    /// cancels every context derived from it, but cancelling a child leaves
    /// the parent (and its other children) unaffected.
    pub fn child(&self, operation_name: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            cancellation: self.cancellation.child_token(),
        }
    }

    pub fn operation_name(&self) -> &str {
        &self.operation_name
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }
}
