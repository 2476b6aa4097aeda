//! The runtime half of spec.md §7's failure taxonomy — the generation-time
//! half lives in `blueprint_codegen::diagnostic::BlueprintError`.

/// What an executor's `execute` call produced.
///
/// Unlike the generation-time `BlueprintError` taxonomy, nothing here is
/// fatal to the process: a `ValidationFailed` or `Cancelled` result is an
/// ordinary, expected outcome the caller branches on.
#[derive(Debug)]
pub enum OperationResult<T> {
    Success(T),
    ValidationFailed { errors: Vec<String> },
    Unauthorized,
    Forbidden,
    /// The handler chain ran but raised an error Blueprint didn't have a
    /// more specific result variant for.
    UnhandledException(anyhow::Error),
    Cancelled,
}

impl<T> OperationResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, OperationResult::Success(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> OperationResult<U> {
        match self {
            OperationResult::Success(value) => OperationResult::Success(f(value)),
            OperationResult::ValidationFailed { errors } => OperationResult::ValidationFailed { errors },
            OperationResult::Unauthorized => OperationResult::Unauthorized,
            OperationResult::Forbidden => OperationResult::Forbidden,
            OperationResult::UnhandledException(err) => OperationResult::UnhandledException(err),
            OperationResult::Cancelled => OperationResult::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_only_transforms_the_success_variant() {
        let result: OperationResult<u8> = OperationResult::Success(1);
        assert!(matches!(result.map(|n| n + 1), OperationResult::Success(2)));

        let result: OperationResult<u8> = OperationResult::Cancelled;
        assert!(matches!(result.map(|n| n + 1), OperationResult::Cancelled));
    }
}
