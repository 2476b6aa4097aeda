//! C1 — Source Writer.
//!
//! A pure, semantics-free indented text buffer. It knows nothing about
//! variables, frames, or middleware: every other component in this crate
//! feeds it lines of already-valid Rust text and it worries only about
//! indentation and brace bookkeeping.
//!
//! The spec calls for `namespace`/`using` primitives — in idiomatic Rust
//! those are `mod` blocks and `use` declarations, so that's what they emit
//! here, but the writer's actual contract (`write_line`, the `BLOCK:`
//! sentinel, `finish_block`) is unchanged from the literal description: a
//! line starting with the sentinel opens a brace block and bumps the
//! indent, and deviating from this would break every snapshot test built on
//! top of it (spec.md §6).

const BLOCK_SENTINEL: &str = "BLOCK:";
const INDENT_UNIT: &str = "    ";

#[derive(Debug, Default)]
pub struct SourceWriter {
    buffer: String,
    indent: usize,
}

impl SourceWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit `line` at the current indent depth.
    ///
    /// If `line` starts with the `BLOCK:` sentinel, the remainder of the
    /// line is emitted followed by an opening brace, and the indent depth
    /// for every subsequent line increases by one until the matching
    /// [`SourceWriter::finish_block`].
    pub fn write_line(&mut self, line: impl AsRef<str>) -> &mut Self {
        let line = line.as_ref();
        if let Some(rest) = line.strip_prefix(BLOCK_SENTINEL) {
            self.push_indented(&format!("{rest} {{"));
            self.indent += 1;
        } else {
            self.push_indented(line);
        }
        self
    }

    /// Convenience wrapper around the `BLOCK:` sentinel for callers that
    /// don't want to know the literal prefix.
    pub fn open_block(&mut self, line: impl AsRef<str>) -> &mut Self {
        self.write_line(format!("{BLOCK_SENTINEL}{}", line.as_ref()))
    }

    /// Close one block opened via the `BLOCK:` sentinel.
    pub fn finish_block(&mut self) -> &mut Self {
        assert!(self.indent > 0, "finish_block called with no open block");
        self.indent -= 1;
        self.push_indented("}");
        self
    }

    /// Emit a `mod <name> { ... }` block, calling `body` with the indent
    /// bumped inside it.
    pub fn namespace(&mut self, name: &str, body: impl FnOnce(&mut Self)) -> &mut Self {
        self.write_line(format!("{BLOCK_SENTINEL}pub mod {name}"));
        body(self);
        self.finish_block()
    }

    /// Emit a `use <path>;` declaration.
    pub fn using_namespace(&mut self, path: &str) -> &mut Self {
        self.push_indented(&format!("use {path};"));
        self
    }

    pub fn comment(&mut self, text: &str) -> &mut Self {
        self.push_indented(&format!("// {text}"));
        self
    }

    pub fn blank_line(&mut self) -> &mut Self {
        self.buffer.push('\n');
        self
    }

    /// Consume the writer, returning the buffered source text.
    pub fn into_source(self) -> String {
        assert_eq!(self.indent, 0, "source writer finalized with open blocks");
        self.buffer
    }

    fn push_indented(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.buffer.push_str(INDENT_UNIT);
        }
        self.buffer.push_str(text);
        self.buffer.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_sentinel_opens_and_closes_a_brace() {
        let mut w = SourceWriter::new();
        w.write_line("BLOCK:pub fn handler()")
            .write_line("let x = 1;")
            .finish_block();
        assert_eq!(w.into_source(), "pub fn handler() {\n    let x = 1;\n}\n");
    }

    #[test]
    fn namespace_nests_using_declarations_and_a_block() {
        let mut w = SourceWriter::new();
        w.using_namespace("std::fmt");
        w.namespace("generated", |w| {
            w.write_line("BLOCK:pub struct Foo")
                .write_line("bar: u8,")
                .finish_block();
        });
        let src = w.into_source();
        assert_eq!(
            src,
            "use std::fmt;\npub mod generated {\n    pub struct Foo {\n        bar: u8,\n    }\n}\n"
        );
    }

    #[test]
    #[should_panic(expected = "open blocks")]
    fn unclosed_block_panics_on_finalize() {
        let mut w = SourceWriter::new();
        w.write_line("BLOCK:pub fn oops()");
        w.into_source();
    }
}
