//! Emission of Rust source from a grammar AST.

mod emitter;

#[cfg(test)]
mod emitter_tests;

pub use emitter::emit_file;

/// Errors raised while emitting a grammar.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EmitError {
    /// Two declarations share a name.
    #[error("rule `{0}` is defined more than once")]
    Redefined(String),

    /// A call to a name with no declaration, no parameter, and no builtin.
    #[error("unknown rule `{name}` referenced in `{context}`")]
    Unknown { name: String, context: String },

    /// A grammar pattern that does not compile.
    #[error("invalid pattern `{pattern}` in `{context}`: {message}")]
    InvalidRegex {
        pattern: String,
        context: String,
        message: String,
    },

    /// A declaration or alternative with nothing to match.
    #[error("rule `{0}` has an empty body")]
    EmptyBody(String),
}
