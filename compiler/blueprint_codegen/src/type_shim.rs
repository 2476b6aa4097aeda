//! C2 — Type System Shim.
//!
//! Given a [`TypeId`] (opaque to the [source writer][crate::source_writer]),
//! render (a) its fully-qualified emitted name, with generic arguments
//! rendered recursively, (b) a safe local identifier, and (c) the set of
//! module paths that must be `use`d to reference it.
//!
//! Fully-qualified names and generic instantiations are built as real
//! `syn::Type` values via `quote!`, the same machinery the teacher's own
//! `ResolvedType::syn_type` uses (see
//! `compiler/analyses/call_graph/codegen.rs` in the pavexc sources this
//! crate is modeled on) — that guarantees every rendered reference
//! round-trips through `syn::parse2` as a syntactically valid type.

use std::collections::BTreeSet;

use convert_case::{Case, Casing};
use proc_macro2::TokenStream;
use quote::{ToTokens, quote};
use syn::Ident;

use blueprint_schema::TypeId;

pub struct TypeShim;

impl TypeShim {
    /// Render `type_id` as a `syn::Type`, recursing into generic arguments.
    pub fn syn_type(type_id: &TypeId) -> syn::Type {
        let tokens = Self::type_tokens(type_id);
        syn::parse2(tokens).expect("generated type path failed to parse as a valid syn::Type")
    }

    /// The fully-qualified name as it will appear in the generated source,
    /// e.g. `myapp::operations::CreateUser`.
    pub fn emitted_name(type_id: &TypeId) -> String {
        Self::syn_type(type_id).to_token_stream().to_string()
    }

    /// A safe, snake_case local identifier derived from the type's simple
    /// name — e.g. `CreateUserOperation` becomes `create_user_operation`.
    /// Any non-identifier characters left behind by generic arguments are
    /// stripped before casing.
    pub fn local_identifier(type_id: &TypeId) -> Ident {
        let stripped: String = type_id
            .simple_name()
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        let snake = stripped.to_case(Case::Snake);
        let safe = if snake.is_empty() || snake.chars().next().unwrap().is_ascii_digit() {
            format!("value_{snake}")
        } else {
            snake
        };
        Ident::new(&safe, proc_macro2::Span::call_site())
    }

    /// The set of module paths required to reference `type_id` — the
    /// type's own enclosing module, plus the enclosing modules of every
    /// generic argument, recursively.
    pub fn required_namespaces(type_id: &TypeId) -> BTreeSet<String> {
        let mut namespaces = BTreeSet::new();
        Self::collect_namespaces(type_id, &mut namespaces);
        namespaces
    }

    fn collect_namespaces(type_id: &TypeId, out: &mut BTreeSet<String>) {
        if type_id.path.len() > 1 {
            out.insert(type_id.path[..type_id.path.len() - 1].join("::"));
        }
        for generic in &type_id.generic_arguments {
            Self::collect_namespaces(generic, out);
        }
    }

    fn type_tokens(type_id: &TypeId) -> TokenStream {
        let segments: Vec<Ident> = type_id
            .path
            .iter()
            .map(|s| Ident::new(s, proc_macro2::Span::call_site()))
            .collect();
        let path = quote! { #(#segments)::* };
        if type_id.generic_arguments.is_empty() {
            path
        } else {
            let generics = type_id.generic_arguments.iter().map(Self::type_tokens);
            quote! { #path<#(#generics),*> }
        }
    }
}
