//! The recursive rule evaluator and the [`Parser`] facade.
//!
//! Evaluation is trial and error: a rule either pushes its value and leaves
//! the cursor advanced, or restores the cursor to where it entered and
//! returns a failure. Syntax failures travel up to the nearest ordered
//! choice; grammar configuration failures cross every choice on their way
//! to the top.

use std::collections::HashMap;

use std::rc::Rc;

use super::cursor::Cursor;
use super::error::{Failure, GrammarError, ParseError};
use super::grammar::Grammar;
use super::rule::{FactoryRef, Rule, RuleKind, SkipMode};
use super::value::Value;
use crate::Error;

/// Parse state threaded through evaluation: the cursor, the read-only
/// grammar environment, and the stack of memo scopes (one per parse, plus
/// one per parametrised-call invocation in flight).
struct Ctx<'s, 'g> {
    cursor: Cursor<'s>,
    grammar: &'g Grammar,
    memo: Vec<HashMap<u64, String>>,
}

impl<'s> Ctx<'s, '_> {
    /// Evaluate `rule`, appending zero or one value to `out`.
    ///
    /// `inherited` is the skip rule in force between sequence items; a rule
    /// with its own skip mode overrides it for its subtree.
    fn eval(
        &mut self,
        rule: &Rule,
        out: &mut Vec<Value>,
        inherited: Option<&Rc<Rule>>,
    ) -> Result<(), Failure> {
        match rule.kind() {
            RuleKind::Literal(text) => {
                if self.cursor.starts_with(text) {
                    out.push(Value::Str(text.clone()));
                    Ok(())
                } else {
                    Err(expected(rule, &self.cursor).into())
                }
            }

            RuleKind::Pattern(pattern) => match self.cursor.match_pattern(pattern) {
                Some(matched) => {
                    out.push(Value::Str(matched.to_string()));
                    Ok(())
                }
                None => Err(expected(rule, &self.cursor).into()),
            },

            RuleKind::AnyChar => match self.cursor.next_char() {
                Some(c) => {
                    out.push(Value::Str(c.to_string()));
                    Ok(())
                }
                None => Err(ParseError::new(
                    "expected any character, found end of input",
                    &self.cursor,
                )
                .into()),
            },

            RuleKind::Sequence {
                items,
                skip,
                action,
            } => {
                let effective = resolve_skip(skip, inherited);
                let entry = self.cursor.mark();
                let mut results: Vec<Value> = Vec::new();
                // Position around the most recent successful skip, so a
                // skip with nothing after it can be given back.
                let mut skip_span: Option<(super::cursor::Mark, usize)> = None;

                for item in items {
                    if let Some(sk) = &effective {
                        let before = self.cursor.mark();
                        let mut scratch = Vec::new();
                        match self.eval(sk, &mut scratch, None) {
                            Ok(()) => skip_span = Some((before, self.cursor.offset())),
                            Err(Failure::Syntax(_)) => self.cursor.rewind_to(before),
                            Err(fatal) => return Err(fatal),
                        }
                    }

                    let len_before = results.len();
                    match self.eval(item, &mut results, effective.as_ref()) {
                        Ok(()) => {
                            if results.len() > len_before
                                && results.last().is_some_and(Value::is_ignored)
                            {
                                results.pop();
                            }
                        }
                        Err(failure) => {
                            self.cursor.rewind_to(entry);
                            return Err(failure);
                        }
                    }
                }

                // Trailing whitespace belongs to whatever comes next, not
                // to this rule.
                if let Some((before, after)) = skip_span {
                    if self.cursor.offset() == after {
                        self.cursor.rewind_to(before);
                    }
                }

                let value = match action {
                    Some(act) => act
                        .call(&results)
                        .map_err(|e| action_failure(act.name(), e))?,
                    None => collapse(results),
                };
                out.push(value);
                Ok(())
            }

            RuleKind::Choice { alts, skip, action } => {
                let effective = resolve_skip(skip, inherited);
                let entry = self.cursor.mark();
                let mut causes = Vec::new();

                for alt in alts {
                    let mut attempt = Vec::new();
                    match self.eval(alt, &mut attempt, effective.as_ref()) {
                        Ok(()) => {
                            let value = attempt.into_iter().next().unwrap_or(Value::Absent);
                            let value = match action {
                                Some(act) => act
                                    .call(std::slice::from_ref(&value))
                                    .map_err(|e| action_failure(act.name(), e))?,
                                None => value,
                            };
                            out.push(value);
                            return Ok(());
                        }
                        Err(Failure::Syntax(e)) => {
                            self.cursor.rewind_to(entry);
                            causes.push(e);
                        }
                        Err(fatal) => {
                            self.cursor.rewind_to(entry);
                            return Err(fatal);
                        }
                    }
                }

                Err(ParseError::new("all alternatives failed", &self.cursor)
                    .with_causes(causes)
                    .into())
            }

            RuleKind::Repeat {
                min,
                max,
                body,
                skip,
                action,
            } => {
                let effective = resolve_skip(skip, inherited);
                let entry = self.cursor.mark();
                let mut items: Vec<Value> = Vec::new();
                let mut times: u32 = 0;
                let mut last_error: Option<ParseError> = None;

                while self.cursor.has_next() && max.is_none_or(|m| times < m) {
                    let iteration = self.cursor.mark();

                    if let Some(sk) = &effective {
                        let before = self.cursor.mark();
                        let mut scratch = Vec::new();
                        match self.eval(sk, &mut scratch, None) {
                            Ok(()) => {}
                            Err(Failure::Syntax(_)) => self.cursor.rewind_to(before),
                            Err(fatal) => return Err(fatal),
                        }
                    }

                    let mut attempt = Vec::new();
                    match self.eval(body, &mut attempt, effective.as_ref()) {
                        Ok(()) => {
                            let advanced = self.cursor.offset() > iteration.offset;
                            if let Some(value) = attempt.into_iter().next() {
                                if !value.is_ignored() {
                                    items.push(value);
                                }
                            }
                            times += 1;
                            if !advanced {
                                // A zero-width iteration would repeat
                                // forever; count it once and stop.
                                self.cursor.rewind_to(iteration);
                                break;
                            }
                        }
                        Err(Failure::Syntax(e)) => {
                            self.cursor.rewind_to(iteration);
                            last_error = Some(e);
                            break;
                        }
                        Err(fatal) => {
                            self.cursor.rewind_to(iteration);
                            return Err(fatal);
                        }
                    }
                }

                if times < *min {
                    self.cursor.rewind_to(entry);
                    let mut err = ParseError::new(
                        format!(
                            "{} must be repeated at least {} times, matched {}",
                            body.label(),
                            min,
                            times
                        ),
                        &self.cursor,
                    );
                    if let Some(cause) = last_error {
                        err = err.with_cause(cause);
                    }
                    return Err(err.into());
                }

                let value = match action {
                    Some(act) => act
                        .call(std::slice::from_ref(&Value::Seq(items)))
                        .map_err(|e| action_failure(act.name(), e))?,
                    None => Value::Seq(items),
                };
                out.push(value);
                Ok(())
            }

            RuleKind::Optional(body) => {
                let entry = self.cursor.mark();
                let mut attempt = Vec::new();
                match self.eval(body, &mut attempt, inherited) {
                    Ok(()) => {
                        out.push(attempt.into_iter().next().unwrap_or(Value::Absent));
                        Ok(())
                    }
                    Err(Failure::Syntax(_)) => {
                        self.cursor.rewind_to(entry);
                        out.push(Value::Absent);
                        Ok(())
                    }
                    Err(fatal) => {
                        self.cursor.rewind_to(entry);
                        Err(fatal)
                    }
                }
            }

            RuleKind::Lookahead { body, positive } => {
                let entry = self.cursor.mark();
                let mut scratch = Vec::new();
                let result = self.eval(body, &mut scratch, inherited);
                self.cursor.rewind_to(entry);
                match (*positive, result) {
                    (true, Ok(())) => {
                        out.push(Value::Ignored);
                        Ok(())
                    }
                    (true, Err(Failure::Syntax(e))) => Err(ParseError::new(
                        format!("lookahead failed: expected {}", body.label()),
                        &self.cursor,
                    )
                    .with_cause(e)
                    .into()),
                    (false, Ok(())) => Err(ParseError::new(
                        format!("matched {} where it must not appear", body.label()),
                        &self.cursor,
                    )
                    .into()),
                    (false, Err(Failure::Syntax(_))) => {
                        out.push(Value::Ignored);
                        Ok(())
                    }
                    (_, Err(fatal)) => Err(fatal),
                }
            }

            RuleKind::Predicate(predicate) => {
                if predicate.check(out) {
                    out.push(Value::Ignored);
                    Ok(())
                } else {
                    Err(ParseError::new(
                        format!("predicate {} not satisfied", predicate.name()),
                        &self.cursor,
                    )
                    .into())
                }
            }

            RuleKind::Reference(name) => {
                let target = self.grammar.resolve(name).map_err(Failure::Fatal)?;
                self.eval(&target, out, inherited)
            }

            RuleKind::Forward(fwd) => {
                let target = fwd.get().ok_or_else(|| {
                    Failure::Fatal(GrammarError::UnresolvedForward(fwd.name().to_string()))
                })?;
                self.eval(&target, out, inherited)
            }

            RuleKind::ParamCall(pc) => {
                let factory = match &pc.target {
                    FactoryRef::Direct(factory) => factory.clone(),
                    FactoryRef::Named(name) => {
                        self.grammar.resolve_factory(name).map_err(Failure::Fatal)?
                    }
                };
                let instance = pc.materialise(&factory);
                // Each invocation gets a fresh memo scope so memoised
                // sub-rules lock per call, not per parse.
                self.memo.push(HashMap::new());
                let result = self.eval(&instance, out, inherited);
                self.memo.pop();
                result
            }

            RuleKind::Memo { key, body } => {
                let locked = self
                    .memo
                    .last()
                    .and_then(|scope| scope.get(key).cloned());
                match locked {
                    Some(text) => {
                        if self.cursor.starts_with(&text) {
                            out.push(Value::Str(text));
                            Ok(())
                        } else {
                            Err(expected_text(&text, &self.cursor).into())
                        }
                    }
                    None => {
                        let start = self.cursor.offset();
                        self.eval(body, out, inherited)?;
                        let matched = self.cursor.consumed_since(start).to_string();
                        if let Some(scope) = self.memo.last_mut() {
                            scope.insert(*key, matched);
                        }
                        Ok(())
                    }
                }
            }
        }
    }
}

/// A parser running a top-level rule against text inputs.
pub struct Parser {
    grammar: Grammar,
    top: Rc<Rule>,
}

impl Parser {
    /// A parser for a standalone rule with an empty grammar environment.
    pub fn new(top: Rule) -> Self {
        Self {
            grammar: Grammar::new(),
            top: Rc::new(top),
        }
    }

    /// A parser for the named rule of a grammar environment.
    pub fn with_grammar(grammar: Grammar, top: &str) -> Result<Self, GrammarError> {
        let top_rule = grammar.resolve(top)?;
        Ok(Self {
            grammar,
            top: top_rule,
        })
    }

    #[inline]
    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Parse `text` completely. Fails if the top rule does not consume the
    /// entire input.
    pub fn parse(&self, text: &str) -> Result<Value, Error> {
        let (cursor, value) = self.run(text)?;
        if cursor.has_next() {
            return Err(Error::UnconsumedInput {
                line: cursor.line(),
                column: cursor.column(),
                tail: truncate(cursor.rest(), 40).to_string(),
            });
        }
        Ok(value)
    }

    /// Parse a prefix of `text`, returning how far the top rule advanced
    /// together with its value.
    pub fn partial_parse(&self, text: &str) -> Result<(usize, Value), Error> {
        let (cursor, value) = self.run(text)?;
        Ok((cursor.offset(), value))
    }

    fn run<'s>(&self, text: &'s str) -> Result<(Cursor<'s>, Value), Error> {
        let mut cx = Ctx {
            cursor: Cursor::new(text),
            grammar: &self.grammar,
            memo: vec![HashMap::new()],
        };
        let mut out = Vec::new();
        match cx.eval(&self.top, &mut out, None) {
            Ok(()) => Ok((cx.cursor, out.into_iter().next().unwrap_or(Value::Absent))),
            Err(Failure::Syntax(e)) => Err(Error::Parse(e)),
            Err(Failure::Fatal(e)) => Err(Error::Grammar(e)),
        }
    }
}

fn resolve_skip(mode: &SkipMode, inherited: Option<&Rc<Rule>>) -> Option<Rc<Rule>> {
    match mode {
        SkipMode::Inherit => inherited.cloned(),
        SkipMode::Disabled => None,
        SkipMode::Explicit(rule) => Some(rule.clone()),
    }
}

/// A sequence yielding a single non-ignored value returns it directly.
fn collapse(mut results: Vec<Value>) -> Value {
    if results.len() == 1 {
        results.pop().expect("length checked")
    } else {
        Value::Seq(results)
    }
}

fn action_failure(name: &str, error: super::error::ActionError) -> Failure {
    Failure::Fatal(GrammarError::Action {
        name: name.to_string(),
        message: error.0,
    })
}

fn expected(rule: &Rule, cursor: &Cursor<'_>) -> ParseError {
    let found = if cursor.has_next() {
        format!("{:?}", truncate(cursor.rest(), 16))
    } else {
        "end of input".to_string()
    };
    ParseError::new(format!("expected {}, found {}", rule.label(), found), cursor)
}

fn expected_text(text: &str, cursor: &Cursor<'_>) -> ParseError {
    let found = if cursor.has_next() {
        format!("{:?}", truncate(cursor.rest(), 16))
    } else {
        "end of input".to_string()
    };
    ParseError::new(format!("expected {text:?}, found {found}"), cursor)
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
