//! Pegwork: a PEG combinator engine and grammar compiler.
//!
//! The engine (`engine`) evaluates combinator rules against text; the
//! compiler side (`parser`, `ast`, `emit`) reads `.peg` grammar files with
//! a meta-grammar built from those same combinators and emits equivalent
//! Rust source against the engine's DSL.
//!
//! # Example
//!
//! ```
//! use pegwork_lib::engine::interpreter::Parser;
//! use pegwork_lib::engine::rule::{choice, lit};
//!
//! let parser = Parser::new(choice([lit("a"), lit("b")]));
//! let value = parser.parse("b").expect("one letter");
//! assert_eq!(value.as_str(), Some("b"));
//! ```

pub mod ast;
pub mod compiler;
pub mod diagnostics;
pub mod emit;
pub mod engine;
mod escape;
pub mod parser;

pub use compiler::Compiler;
pub use diagnostics::ParseErrorPrinter;
pub use emit::EmitError;
pub use engine::error::{ActionError, GrammarError, ParseError};

/// Errors that can reach a caller of the public API.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The input did not match the grammar.
    #[error("{0}")]
    Parse(#[from] ParseError),

    /// The grammar itself is misconfigured.
    #[error(transparent)]
    Grammar(#[from] GrammarError),

    /// The grammar AST could not be emitted.
    #[error(transparent)]
    Emit(#[from] EmitError),

    /// The top-level rule matched, but input remained.
    #[error("Line {line}, column {column}: input not fully consumed: {tail:?}")]
    UnconsumedInput { line: u32, column: u32, tail: String },
}

/// Result type for parsing and compilation.
pub type Result<T> = std::result::Result<T, Error>;

/// Build an [`engine::rule::Action`] from a closure over named values.
///
/// The closure's parameters are bound positionally from the rule's
/// collected results (missing positions become `Value::Absent`) and the
/// body's value is converted with `Into<Value>`:
///
/// ```
/// use pegwork_lib::action;
/// use pegwork_lib::engine::interpreter::Parser;
/// use pegwork_lib::engine::rule::{lit, seq};
///
/// let rule = seq([lit("a"), lit("b")])
///     .with_action(action!("join", |a, b| format!("{}{}", a.flatten_text(), b.flatten_text())));
/// let value = Parser::new(rule).parse("ab").expect("matches");
/// assert_eq!(value.as_str(), Some("ab"));
/// ```
#[macro_export]
macro_rules! action {
    ($name:expr, || $body:expr) => {{
        $crate::engine::rule::Action::new($name, move |_vals: &[$crate::engine::value::Value]| {
            ::std::result::Result::Ok($crate::engine::value::Value::from($body))
        })
    }};
    ($name:expr, | $($arg:ident),* $(,)? | $body:expr) => {{
        $crate::engine::rule::Action::new($name, move |__vals: &[$crate::engine::value::Value]| {
            let mut __iter = __vals.iter();
            $(let $arg = __iter.next().cloned().unwrap_or_default();)*
            ::std::result::Result::Ok($crate::engine::value::Value::from($body))
        })
    }};
}

/// Everything an emitted grammar needs in scope.
pub mod prelude {
    pub use crate::action;
    pub use crate::engine::error::{ActionError, GrammarError, ParseError};
    pub use crate::engine::grammar::Grammar;
    pub use crate::engine::helpers::{
        all_but, balanced, delimited, indented_block, one_or_more_separated,
        repeating_separated, zero_or_more_separated,
    };
    pub use crate::engine::interpreter::Parser;
    pub use crate::engine::rule::{
        Action, Factory, Forward, Rule, ahead, any_char, call, choice, exactly, lit, memo,
        not_ahead, one_or_more, optional, pred, r, regex, regex_flags, repetition, seq,
        zero_or_more,
    };
    pub use crate::engine::value::Value;
}
