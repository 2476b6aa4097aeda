//! C5 — Type Builder.
//!
//! Assembles the generated executor type for one operation: a struct
//! carrying its injected singleton fields, a constructor, and one `impl`
//! block per trait it implements (spec.md §4.5). The C#-flavoured
//! "`class TypeName : BaseType, IInterface`" shape in the distilled spec
//! becomes a plain struct plus however many trait `impl` blocks the
//! operation needs — Rust has no base classes, only traits.
//!
//! Field deduplication happens one layer down, in the DI-aware instance
//! frame provider (`crate::di`): by the time a [`GeneratedField`] reaches
//! this module, [`crate::diagnostic::BlueprintError::DuplicateInjectedField`]
//! has already been ruled out.

use blueprint_schema::TypeId;

use crate::source_writer::SourceWriter;
use crate::type_shim::TypeShim;

/// One constructor-injected singleton field.
pub struct GeneratedField {
    pub name: syn::Ident,
    pub type_id: TypeId,
}

/// One trait implementation on the generated type, with its method bodies
/// already rendered to source text by the method builder (C4).
pub struct GeneratedImpl {
    /// `None` for the type's own inherent `impl` block.
    pub trait_type: Option<TypeId>,
    pub methods: String,
}

pub struct TypeBuilder;

impl TypeBuilder {
    /// Emit the struct definition, its constructor, and every `impl` block
    /// into `writer`.
    pub fn build(
        writer: &mut SourceWriter,
        type_name: &syn::Ident,
        fields: &[GeneratedField],
        impls: &[GeneratedImpl],
    ) {
        writer.open_block(format!("pub struct {type_name}"));
        for field in fields {
            writer.write_line(format!("{}: {},", field.name, TypeShim::emitted_name(&field.type_id)));
        }
        writer.finish_block();
        writer.blank_line();

        writer.open_block(format!("impl {type_name}"));
        Self::write_constructor(writer, fields);
        writer.finish_block();
        writer.blank_line();

        for generated_impl in impls {
            let header = match &generated_impl.trait_type {
                Some(trait_type) => format!("impl {} for {type_name}", TypeShim::emitted_name(trait_type)),
                None => format!("impl {type_name}"),
            };
            writer.open_block(header);
            writer.write_line(generated_impl.methods.trim_end());
            writer.finish_block();
            writer.blank_line();
        }
    }

    fn write_constructor(writer: &mut SourceWriter, fields: &[GeneratedField]) {
        let params: Vec<String> = fields
            .iter()
            .map(|f| format!("{}: {}", f.name, TypeShim::emitted_name(&f.type_id)))
            .collect();
        writer.open_block(format!("pub fn new({}) -> Self", params.join(", ")));
        if fields.is_empty() {
            writer.write_line("Self {}");
        } else {
            writer.open_block("Self");
            for field in fields {
                writer.write_line(format!("{},", field.name));
            }
            writer.finish_block();
        }
        writer.finish_block();
    }
}
