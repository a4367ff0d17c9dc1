//! Parse failures and grammar configuration errors.
//!
//! The two families propagate differently: a [`ParseError`] travels up to
//! the nearest ordered choice, which records it and tries the next
//! alternative; a [`GrammarError`] is a programmer error and crosses every
//! choice on its way to the top of the parse.

use std::fmt::Write;

use super::cursor::Cursor;

/// A structured parse failure with the position of deepest progress and the
/// failures of every alternative that was tried on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub line: u32,
    pub column: u32,
    pub offset: usize,
    pub causes: Vec<ParseError>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, cursor: &Cursor<'_>) -> Self {
        Self {
            message: message.into(),
            line: cursor.line(),
            column: cursor.column(),
            offset: cursor.offset(),
            causes: Vec::new(),
        }
    }

    pub fn with_causes(mut self, causes: Vec<ParseError>) -> Self {
        self.causes = causes;
        self
    }

    pub fn with_cause(mut self, cause: ParseError) -> Self {
        self.causes.push(cause);
        self
    }

    /// The deepest point reached across this error and all nested causes.
    pub fn deepest(&self) -> &ParseError {
        let mut best = self;
        for cause in &self.causes {
            let candidate = cause.deepest();
            if candidate.offset > best.offset {
                best = candidate;
            }
        }
        best
    }

    fn format_tree(&self, f: &mut std::fmt::Formatter<'_>, depth: usize) -> std::fmt::Result {
        for _ in 0..depth {
            f.write_str("  ")?;
        }
        write!(
            f,
            "Line {}, column {}: {}",
            self.line, self.column, self.message
        )?;
        for cause in &self.causes {
            f.write_char('\n')?;
            cause.format_tree(f, depth + 1)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.format_tree(f, 0)
    }
}

impl std::error::Error for ParseError {}

/// Misconfigured grammars: these are bugs in the grammar, not properties of
/// the input, so ordered choice never swallows them.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GrammarError {
    /// A by-name reference with no binding in the grammar environment.
    #[error("reference to unknown rule `{0}`")]
    UnboundReference(String),

    /// A forward rule evaluated before it was bound.
    #[error("forward rule `{0}` was never bound")]
    UnresolvedForward(String),

    /// A name bound by a parameterless reference where a factory lives, or
    /// instantiated where a plain rule lives.
    #[error("`{name}` is a {actual}, not a {wanted}")]
    WrongBinding {
        name: String,
        wanted: &'static str,
        actual: &'static str,
    },

    /// `define` on a name that already has a resolved binding.
    #[error("rule `{0}` is already defined")]
    Redefined(String),

    /// A rule constructed with nothing to match.
    #[error("rule `{0}` has an empty body")]
    EmptyRule(String),

    /// An action raised; unrecoverable by ordered choice.
    #[error("action `{name}` failed: {message}")]
    Action { name: String, message: String },

    /// A pattern failed to compile.
    #[error("invalid pattern `{pattern}`: {message}")]
    Pattern { pattern: String, message: String },
}

/// Error raised by a user action.
#[derive(Debug, Clone)]
pub struct ActionError(pub String);

impl ActionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl std::fmt::Display for ActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ActionError {}

/// Internal evaluation outcome: syntax failures are recoverable by ordered
/// choice, fatal failures are not.
#[derive(Debug, Clone)]
pub(crate) enum Failure {
    Syntax(ParseError),
    Fatal(GrammarError),
}

impl From<ParseError> for Failure {
    fn from(e: ParseError) -> Self {
        Failure::Syntax(e)
    }
}

impl From<GrammarError> for Failure {
    fn from(e: GrammarError) -> Self {
        Failure::Fatal(e)
    }
}
