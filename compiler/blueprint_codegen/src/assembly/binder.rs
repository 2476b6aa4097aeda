//! C9, continued — binds generated executors back into a fresh
//! `ExecutorRegistry` (spec.md §4.8: "binds generated types to their
//! descriptors").
//!
//! Each operation's generated file exports a `blueprint_register_<Name>`
//! `extern "C"` function (emitted by [`super::emitter::AssemblyEmitter`])
//! that knows how to construct its own executor and register it against
//! whatever registry it's handed. [`AssemblyBinder`] resolves one such
//! symbol per catalog operation out of the dlopen'd library and calls it —
//! the same dance `libloading`'s own docs walk through for a plain
//! `extern "C" fn` symbol.

use blueprint_runtime::{ExecutorRegistry, Scope};
use blueprint_schema::OperationCatalog;

use crate::diagnostic::BlueprintError;

/// The symbol name `blueprint_codegen` emits a registration function under
/// for `operation`. Shared between the emitter, which names the function,
/// and the binder, which looks it up, so the two halves can't drift apart.
pub fn registration_symbol(operation: &str) -> String {
    format!("blueprint_register_{operation}")
}

type RegisterFn = unsafe extern "C" fn(&mut ExecutorRegistry, &dyn Scope);

pub struct AssemblyBinder;

impl AssemblyBinder {
    /// Resolve and call every operation's registration symbol against
    /// `library`, populating a fresh [`ExecutorRegistry`].
    pub fn bind(
        library: &libloading::Library,
        catalog: &OperationCatalog,
        scope: &dyn Scope,
    ) -> Result<ExecutorRegistry, BlueprintError> {
        let mut registry = ExecutorRegistry::new();
        for operation in &catalog.operations {
            let symbol_name = registration_symbol(&operation.name);
            let register: libloading::Symbol<RegisterFn> =
                unsafe { library.get(symbol_name.as_bytes()) }.map_err(|e| BlueprintError::CompilationError {
                    type_name: operation.name.clone(),
                    diagnostics: format!("could not resolve registration symbol `{symbol_name}`: {e}"),
                    offending_source: String::new(),
                })?;
            unsafe { register(&mut registry, scope) };
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_symbol_names_are_namespaced_per_operation() {
        assert_eq!(registration_symbol("CreateUser"), "blueprint_register_CreateUser");
    }
}
