//! High-level compile facade: grammar source in, Rust source out.

use crate::Result;
use crate::ast::File;
use crate::emit;
use crate::parser;

/// The grammar compiler.
pub struct Compiler;

impl Compiler {
    /// Compile grammar source into an equivalent Rust program against the
    /// engine DSL.
    pub fn compile(source: &str) -> Result<String> {
        let file = Self::parse(source)?;
        Ok(emit::emit_file(&file)?)
    }

    /// Parse grammar source into its AST without emitting.
    pub fn parse(source: &str) -> Result<File> {
        parser::parse(source)
    }
}
