//! Compiled regular expressions for pattern leaves.
//!
//! Patterns always match anchored at the current offset, and an empty-width
//! match counts as a failure: a pattern that consumes nothing would let a
//! greedy repetition spin without progress.

use regex_automata::meta::Regex;
use regex_automata::util::syntax;
use regex_automata::{Anchored, Input};

use super::error::GrammarError;

/// A compiled, offset-anchored regular expression.
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
    source: String,
    flags: String,
}

impl Pattern {
    /// Compile `pattern` with no flags.
    pub fn new(pattern: &str) -> Result<Self, GrammarError> {
        Self::with_flags(pattern, "")
    }

    /// Compile `pattern` with single-letter flags in the grammar-source
    /// style: `i` (case-insensitive), `m` (multi-line), `s` (dot matches
    /// newline), `x` (ignore whitespace). `u` is the default and `l`/`d`
    /// have no effect here; they are accepted so grammars written against
    /// other hosts still compile.
    pub fn with_flags(pattern: &str, flags: &str) -> Result<Self, GrammarError> {
        let mut config = syntax::Config::new();
        for flag in flags.chars() {
            config = match flag {
                'i' => config.case_insensitive(true),
                'm' => config.multi_line(true),
                's' => config.dot_matches_new_line(true),
                'x' => config.ignore_whitespace(true),
                'u' | 'l' | 'd' => config,
                other => {
                    return Err(GrammarError::Pattern {
                        pattern: pattern.to_string(),
                        message: format!("unknown flag {other:?}"),
                    });
                }
            };
        }

        let regex = Regex::builder()
            .syntax(config)
            .build(pattern)
            .map_err(|e| GrammarError::Pattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            regex,
            source: pattern.to_string(),
            flags: flags.to_string(),
        })
    }

    /// The pattern text as written.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    #[inline]
    pub fn flags(&self) -> &str {
        &self.flags
    }

    /// Match anchored at `offset`; `None` for no match or an empty match.
    pub fn find_at<'s>(&self, text: &'s str, offset: usize) -> Option<&'s str> {
        let input = Input::new(text).range(offset..).anchored(Anchored::Yes);
        let m = self.regex.find(input)?;
        if m.start() == m.end() {
            return None;
        }
        Some(&text[m.start()..m.end()])
    }
}
