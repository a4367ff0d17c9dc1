//! Parsing of `.peg` grammar files.
//!
//! The source language is recognised by the meta-grammar in `meta`, which
//! is built from the engine's own combinators; this module only adds the
//! entry point and the end-of-input accounting.

mod meta;

#[cfg(test)]
mod meta_tests;

use crate::Error;
use crate::ast::File;
use crate::engine::cursor::Cursor;
use crate::engine::interpreter::Parser;
use crate::engine::pattern::Pattern;

thread_local! {
    static META: Parser = meta::toplevel_parser();
    static TRAILING: Pattern = Pattern::new(r"(?:\s+|#[^\n]*)+")
        .expect("trailing-trivia pattern is valid");
}

/// Parse a grammar file into its AST.
///
/// The grammar proper must cover the input up to trailing whitespace and
/// comments; anything else left over is reported with its position.
pub fn parse(source: &str) -> Result<File, Error> {
    let (advance, value) = META.with(|parser| parser.partial_parse(source))?;

    let mut end = advance;
    if end < source.len() {
        // The top rule gives trailing trivia back to the input; consume it
        // here before deciding whether the parse covered the file.
        if let Some(matched) = TRAILING.with(|p| p.find_at(source, end)) {
            end += matched.len();
        }
    }
    if end < source.len() {
        let mut cursor = Cursor::new(source);
        cursor.seek(end);
        return Err(Error::UnconsumedInput {
            line: cursor.line(),
            column: cursor.column(),
            tail: truncate(cursor.rest(), 40).to_string(),
        });
    }

    let file = value
        .downcast::<File>()
        .expect("the meta-grammar's top rule yields a File");
    Ok((*file).clone())
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
