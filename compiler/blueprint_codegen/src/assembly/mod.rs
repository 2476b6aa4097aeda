//! C8 — Assembly Emitter and the `Compiler (in)` external collaborator.

mod binder;
mod compiler;
mod emitter;
mod generated;

pub use binder::{AssemblyBinder, registration_symbol};
pub use compiler::{CompilationRequest, CompiledAssembly, Compiler, RustcSubprocessCompiler, load_library};
pub use emitter::AssemblyEmitter;
pub use generated::{GeneratedAssembly, GeneratedFile};
