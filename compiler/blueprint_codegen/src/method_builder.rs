//! C4 — Method Builder.
//!
//! Turns a resolved [`Resolution`](crate::graph::Resolution) (an ordered list
//! of frames plus their variable bindings) into a method's source text: a
//! signature line, one emitted statement per frame in resolution order, and
//! the closing brace. Async propagation (spec.md §5) just means choosing
//! `async fn` when [`Resolution::is_async`] is set.

use blueprint_schema::TypeId;
use quote::ToTokens;

use crate::diagnostic::BlueprintError;
use crate::graph::{FrameGraph, Resolution, VarId};
use crate::source_writer::SourceWriter;
use crate::type_shim::TypeShim;

/// A method's signature, independent of its body — built by the middleware
/// composer (C7) from the operation descriptor and the DI parameters it
/// decided the method needs.
pub struct MethodSignature {
    pub name: syn::Ident,
    pub visibility: &'static str,
    pub parameters: Vec<(syn::Ident, TypeId)>,
    pub return_type: Option<TypeId>,
}

impl MethodSignature {
    fn render(&self, is_async: bool) -> String {
        let params: Vec<String> = self
            .parameters
            .iter()
            .map(|(name, ty)| format!("{name}: {}", TypeShim::emitted_name(ty)))
            .collect();
        let asyncness = if is_async { "async " } else { "" };
        let ret = match &self.return_type {
            Some(ty) => format!(" -> {}", TypeShim::emitted_name(ty)),
            None => String::new(),
        };
        format!(
            "{} {asyncness}fn {}({}){ret}",
            self.visibility,
            self.name,
            params.join(", ")
        )
    }
}

pub struct MethodBuilder;

impl MethodBuilder {
    /// Write one method into `writer`.
    ///
    /// `result_var` is the variable the Execution stage produced, if any —
    /// `None` when the operation's handler chain never assigned one. If the
    /// signature declares a return type and `result_var` is `None`, that's a
    /// [`BlueprintError::MissingReturnValue`] (spec.md §4.4, §7): the handler
    /// chain ran to completion without ever producing the value the
    /// operation's contract requires.
    pub fn build(
        writer: &mut SourceWriter,
        signature: &MethodSignature,
        resolution: &Resolution,
        graph: &FrameGraph,
        operation: &str,
        last_handler: &str,
        result_var: Option<VarId>,
    ) -> Result<(), BlueprintError> {
        if signature.return_type.is_some() && result_var.is_none() {
            return Err(BlueprintError::MissingReturnValue {
                operation: operation.to_string(),
                handler: last_handler.to_string(),
            });
        }

        writer.open_block(signature.render(resolution.is_async));
        for frame_id in &resolution.order {
            let tokens = graph.frames[*frame_id].body.emit(&resolution.bindings);
            if tokens.is_empty() {
                continue;
            }
            writer.write_line(format!("{};", tokens.to_token_stream()));
        }
        if let Some(result_var) = result_var {
            let ident = resolution.bindings.get(result_var);
            writer.write_line(format!("{ident}"));
        }
        writer.finish_block();
        Ok(())
    }
}
