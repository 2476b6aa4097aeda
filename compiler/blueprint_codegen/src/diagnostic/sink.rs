use std::ops::DerefMut;
use std::sync::{Arc, Mutex};

use super::BlueprintError;

/// An accumulator for generation-time diagnostics.
///
/// The sink can be cheaply cloned, since it's a wrapper around a
/// reference-counted vector — every component in the compilation driver
/// (C7's composer, C6's DI provider, C5's type builder) holds its own clone
/// and pushes into the same underlying list, so the driver can report every
/// operation that failed instead of stopping at the first (spec.md §7:
/// "Generation-time errors are *never* swallowed").
#[derive(Clone, Default)]
pub struct DiagnosticSink {
    errors: Arc<Mutex<Vec<BlueprintError>>>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, error: BlueprintError) {
        self.errors
            .lock()
            .expect("the diagnostic sink's lock was poisoned")
            .push(error);
    }

    /// Drain the sink, retrieving every diagnostic accumulated so far.
    pub fn drain(&self) -> Vec<BlueprintError> {
        std::mem::take(
            self.errors
                .lock()
                .expect("the diagnostic sink's lock was poisoned")
                .deref_mut(),
        )
    }

    pub fn has_errored(&self) -> bool {
        !self
            .errors
            .lock()
            .expect("the diagnostic sink's lock was poisoned")
            .is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors
            .lock()
            .expect("the diagnostic sink's lock was poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_empties_the_sink() {
        let sink = DiagnosticSink::new();
        sink.push(BlueprintError::MissingHandler {
            operation: "CreateUser".into(),
        });
        assert!(sink.has_errored());
        assert_eq!(sink.len(), 1);

        let drained = sink.drain();
        assert_eq!(drained.len(), 1);
        assert!(!sink.has_errored());
        assert!(sink.is_empty());
    }
}
