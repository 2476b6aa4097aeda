//! C8, continued — the `Compiler (in)` external collaborator (spec.md §6).
//!
//! Blueprint has no in-process compiler the way the system this was
//! modeled on does; the closest real equivalent is what `trybuild` does to
//! compile-check generated test cases — shell out to `rustc`, parse its
//! `--error-format=json` diagnostics, and load the artifact back in. That's
//! the reference implementation here: [`RustcSubprocessCompiler`] stages the
//! formatted source (persisted to disk or a throwaway tempdir, depending on
//! [`CompileStrategy`]), invokes `rustc` as a `cdylib`, and on success hands
//! back a [`libloading::Library`] the executor registry (`blueprint_runtime`)
//! binds descriptors against.

use std::process::Command;

use camino::{Utf8Path, Utf8PathBuf};

use blueprint_schema::{CompileStrategy, ExternCrate, OptimizationLevel};

use crate::diagnostic::BlueprintError;

pub struct CompilationRequest<'a> {
    pub assembly_name: &'a str,
    pub source: &'a str,
    pub optimization_level: OptimizationLevel,
    pub strategy: CompileStrategy,
    /// The closure of assemblies generated source needs linked in (spec.md
    /// §4.8) — `blueprint_runtime` at minimum, since every generated
    /// executor implements its `Executor` trait and takes a `&dyn Scope`.
    pub extern_crates: &'a [ExternCrate],
}

/// The compiled artifact. Keeps its staging directory alive (when one was
/// created just for this compile) so `library_path` stays valid for the
/// lifetime of the returned value.
pub struct CompiledAssembly {
    pub library_path: Utf8PathBuf,
    _tempdir: Option<tempfile::TempDir>,
}

/// The interface the assembly emitter compiles against (spec §6: an
/// external collaborator, deliberately not part of this crate's closed
/// dependency graph).
pub trait Compiler: Send + Sync {
    fn compile(&self, request: CompilationRequest<'_>) -> Result<CompiledAssembly, BlueprintError>;
}

/// Compiles generated source by shelling out to `rustc`, the way
/// `trybuild` compile-checks its UI test cases.
pub struct RustcSubprocessCompiler {
    pub persist_dir: Utf8PathBuf,
}

impl RustcSubprocessCompiler {
    pub fn new(persist_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            persist_dir: persist_dir.into(),
        }
    }

    fn stage(&self, request: &CompilationRequest<'_>) -> Result<(Utf8PathBuf, Option<tempfile::TempDir>), BlueprintError> {
        match request.strategy {
            CompileStrategy::ToDisk => {
                let dir = self.persist_dir.join(request.assembly_name);
                fs_err::create_dir_all(&dir).map_err(|e| io_as_compilation_error(request, e))?;
                let source_path = dir.join(format!("{}.rs", request.assembly_name));
                persist_if_changed::persist_if_changed(source_path.as_std_path(), request.source.as_bytes())
                    .map_err(|e| anyhow_as_compilation_error(request, e))?;
                Ok((dir, None))
            }
            CompileStrategy::InMemory => {
                let tempdir = tempfile::tempdir().map_err(|e| io_as_compilation_error(request, e))?;
                let dir = Utf8PathBuf::from_path_buf(tempdir.path().to_path_buf())
                    .expect("tempdir path must be valid UTF-8");
                let source_path = dir.join(format!("{}.rs", request.assembly_name));
                fs_err::write(&source_path, request.source).map_err(|e| io_as_compilation_error(request, e))?;
                Ok((dir, Some(tempdir)))
            }
        }
    }
}

impl Compiler for RustcSubprocessCompiler {
    fn compile(&self, request: CompilationRequest<'_>) -> Result<CompiledAssembly, BlueprintError> {
        let (dir, tempdir) = self.stage(&request)?;
        let source_path = dir.join(format!("{}.rs", request.assembly_name));
        let library_path = dir.join(format!(
            "{}{}.{}",
            std::env::consts::DLL_PREFIX,
            request.assembly_name,
            std::env::consts::DLL_EXTENSION
        ));

        let mut cmd = Command::new("rustc");
        cmd.arg("--edition").arg("2024");
        cmd.arg("--crate-type").arg("cdylib");
        cmd.arg("--error-format").arg("json");
        if request.optimization_level == OptimizationLevel::Release {
            cmd.arg("-O");
        }
        for extern_crate in request.extern_crates {
            cmd.arg("--extern").arg(format!("{}={}", extern_crate.name, extern_crate.rlib_path));
        }
        cmd.arg("-o").arg(library_path.as_std_path());
        cmd.arg(source_path.as_std_path());

        let output = cmd.output().map_err(|e| io_as_compilation_error(&request, e))?;
        if !output.status.success() {
            let diagnostics = parse_rustc_json_diagnostics(&String::from_utf8_lossy(&output.stderr));
            return Err(BlueprintError::CompilationError {
                type_name: request.assembly_name.to_string(),
                diagnostics,
                offending_source: request.source.to_string(),
            });
        }

        Ok(CompiledAssembly {
            library_path,
            _tempdir: tempdir,
        })
    }
}

/// Load a compiled assembly back into the process. A dlopen failure here
/// means the artifact `rustc` just produced can't actually be used, which is
/// just as fatal as a compilation error.
pub fn load_library(path: &Utf8Path) -> Result<libloading::Library, BlueprintError> {
    unsafe { libloading::Library::new(path) }.map_err(|e| BlueprintError::CompilationError {
        type_name: path.to_string(),
        diagnostics: e.to_string(),
        offending_source: String::new(),
    })
}

fn parse_rustc_json_diagnostics(stderr: &str) -> String {
    let messages: Vec<String> = stderr
        .lines()
        .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
        .filter_map(|value| value.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .collect();
    if messages.is_empty() {
        stderr.to_string()
    } else {
        messages.join("\n")
    }
}

fn io_as_compilation_error(request: &CompilationRequest<'_>, error: std::io::Error) -> BlueprintError {
    BlueprintError::CompilationError {
        type_name: request.assembly_name.to_string(),
        diagnostics: error.to_string(),
        offending_source: request.source.to_string(),
    }
}

fn anyhow_as_compilation_error(request: &CompilationRequest<'_>, error: anyhow::Error) -> BlueprintError {
    BlueprintError::CompilationError {
        type_name: request.assembly_name.to_string(),
        diagnostics: error.to_string(),
        offending_source: request.source.to_string(),
    }
}
