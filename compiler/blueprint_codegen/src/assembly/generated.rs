//! The in-memory view of everything this generation run produced — what
//! spec.md §6 calls `WhatCodeDidIGenerate()` / `WhatCodeDidIGenerateFor()`.

use ahash::HashMap;

/// One emitted source file, already formatted (a `prettyplease` pass has
/// already run over it by the time it ends up here — see
/// [`super::emitter::AssemblyEmitter::emit_operation`]).
pub struct GeneratedFile {
    pub module_path: Vec<String>,
    pub source: String,
}

/// Everything produced for one [`blueprint_schema::BlueprintConfig`] run.
#[derive(Default)]
pub struct GeneratedAssembly {
    files: Vec<GeneratedFile>,
    per_operation: HashMap<String, String>,
}

impl GeneratedAssembly {
    pub fn push(&mut self, operation: &str, file: GeneratedFile) {
        self.per_operation.insert(operation.to_string(), file.source.clone());
        self.files.push(file);
    }

    pub fn files(&self) -> &[GeneratedFile] {
        &self.files
    }

    /// The concatenation of every generated file, in emission order —
    /// spec.md's `WhatCodeDidIGenerate()`.
    pub fn what_code_did_i_generate(&self) -> String {
        self.files
            .iter()
            .map(|f| f.source.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The source generated for one operation's executor, if any —
    /// spec.md's `WhatCodeDidIGenerateFor(operation)`.
    pub fn what_code_did_i_generate_for(&self, operation: &str) -> Option<&str> {
        self.per_operation.get(operation).map(String::as_str)
    }
}
