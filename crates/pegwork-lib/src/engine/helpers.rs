//! Reusable rule constructors for common grammar shapes.
//!
//! These cover the shapes the meta-grammar itself needs: balanced
//! brackets, delimited runs with escapes, separated lists, and indented
//! blocks that lock their leading whitespace.

use super::grammar::Grammar;
use super::rule::{
    Action, Factory, Forward, Rule, RuleKind, any_char, choice, lit, memo, not_ahead, one_or_more,
    optional, regex, repetition, seq, zero_or_more,
};
use super::value::Value;

/// Matches everything up to (but not including) `stop`, one code point at a
/// time. With an `escape` rule, an escaped `stop` is consumed and kept.
///
/// Character-at-a-time matching is slow next to a pattern; reach for this
/// when the stop is a rule a pattern cannot express.
pub fn all_but(stop: Rule, escape: Option<Rule>) -> Rule {
    let step = match escape {
        Some(esc) => choice([
            seq([esc, stop.clone()]).with_action(Action::new("all_but_escaped", |vals| {
                Ok(vals.get(1).cloned().unwrap_or_default())
            })),
            seq([not_ahead(stop), any_char()]),
        ]),
        None => seq([not_ahead(stop), any_char()]),
    };
    one_or_more(step)
        .no_skip()
        .with_action(Action::new("all_but", |vals| {
            Ok(Value::Str(
                vals.first().map(Value::flatten_text).unwrap_or_default(),
            ))
        }))
        .with_name("all_but")
}

/// A bracketed run permitting nested brackets and backslash escapes.
///
/// Yields `Seq[open, inside, close]` so callers can take the inside text
/// without re-splitting.
pub fn balanced(open: &str, close: &str) -> Rule {
    let inside = Forward::new("balanced_inside");

    // Non-bracket, non-backslash runs, with escapes allowed to cross
    // anything (including newlines).
    let chunk = regex(&format!(
        r"(?s)(?:\\.|[^{}{}\\])+",
        regex_syntax::escape(open),
        regex_syntax::escape(close)
    ));

    let nested = seq([lit(open), optional(inside.rule()), lit(close)])
        .no_skip()
        .with_action(Action::new("balanced_nested", |vals| {
            Ok(Value::Str(Value::Seq(vals.to_vec()).flatten_text()))
        }));

    inside.bind(
        one_or_more(choice([nested, chunk]))
            .no_skip()
            .with_action(Action::new("balanced_inside", |vals| {
                Ok(Value::Str(
                    vals.first().map(Value::flatten_text).unwrap_or_default(),
                ))
            })),
    );

    seq([lit(open), optional(inside.rule()), lit(close)])
        .no_skip()
        .with_action(Action::new("balanced", |vals| {
            let open = vals.first().map(Value::flatten_text).unwrap_or_default();
            let inner = vals.get(1).map(Value::flatten_text).unwrap_or_default();
            let close = vals.get(2).map(Value::flatten_text).unwrap_or_default();
            Ok(Value::Seq(vec![
                Value::Str(open),
                Value::Str(inner),
                Value::Str(close),
            ]))
        }))
        .with_name(format!("balanced {open}{close}"))
}

/// A run delimited by `delim` on both sides, with backslash escapes.
/// Yields the raw content between the delimiters, escapes intact.
pub fn delimited(delim: char) -> Rule {
    let escaped = regex_syntax::escape(&delim.to_string());
    let content = regex(&format!(r"(?s)(?:\\.|[^{escaped}\\])+"));
    seq([
        lit(delim.to_string()),
        optional(content),
        lit(delim.to_string()),
    ])
    .no_skip()
    .with_action(Action::new("delimited", |vals| {
        Ok(Value::Str(
            vals.get(1).map(Value::flatten_text).unwrap_or_default(),
        ))
    }))
    .with_name(format!("{delim}-delimited"))
}

/// `item` repeated with `sep` between occurrences, between `min` and `max`
/// items. Yields a flat `Seq` of the item values, separators dropped.
pub fn repeating_separated(item: Rule, sep: Rule, min: u32, max: Option<u32>) -> Rule {
    let tail = repetition(
        min.saturating_sub(1),
        max.map(|m| m.saturating_sub(1)),
        seq([sep, item.clone()]).with_action(Action::new("separated_item", |vals| {
            Ok(vals.get(1).cloned().unwrap_or_default())
        })),
    );

    let core = seq([item, tail]).with_action(Action::new("separated", |vals| {
        let mut items = vec![vals.first().cloned().unwrap_or_default()];
        if let Some(Value::Seq(rest)) = vals.get(1) {
            items.extend(rest.iter().cloned());
        }
        Ok(Value::Seq(items))
    }));

    if min == 0 {
        optional(core).with_action(Action::new("separated_opt", |vals| {
            match vals.first() {
                Some(Value::Seq(items)) => Ok(Value::Seq(items.clone())),
                _ => Ok(Value::Seq(Vec::new())),
            }
        }))
    } else {
        core
    }
}

/// `item (sep item)*`
pub fn one_or_more_separated(item: Rule, sep: Rule) -> Rule {
    repeating_separated(item, sep, 1, None)
}

/// `(item (sep item)*)?` — yields an empty `Seq` when absent.
pub fn zero_or_more_separated(item: Rule, sep: Rule) -> Rule {
    repeating_separated(item, sep, 0, None)
}

/// The helper names grammar files may call without declaring them.
pub const BUILTIN_NAMES: &[&str] = &[
    "all_but",
    "balanced",
    "delimited",
    "indented_block",
    "one_or_more_separated",
    "repeating_separated",
    "zero_or_more_separated",
];

impl Grammar {
    /// A grammar pre-populated with the helper factories under the names
    /// grammar files call them by. Emitted grammars build on this.
    pub fn with_builtins() -> Self {
        let mut g = Grammar::new();
        let defined = [
            g.define_factory("balanced", |args| {
                balanced(&literal_text(args.first()), &literal_text(args.get(1)))
            }),
            g.define_factory("delimited", |args| {
                let delim = literal_text(args.first()).chars().next().unwrap_or('\'');
                delimited(delim)
            }),
            g.define_factory("all_but", |args| {
                let stop = args.first().cloned().unwrap_or_else(|| lit(""));
                all_but(stop, args.get(1).cloned())
            }),
            g.define_factory("one_or_more_separated", |args| {
                one_or_more_separated(rule_arg(args.first()), rule_arg(args.get(1)))
            }),
            g.define_factory("zero_or_more_separated", |args| {
                zero_or_more_separated(rule_arg(args.first()), rule_arg(args.get(1)))
            }),
            g.define_factory("repeating_separated", |args| {
                let min = int_arg(args.get(2)).unwrap_or(0).max(0) as u32;
                let max = match int_arg(args.get(3)) {
                    Some(n) if n >= 0 => Some(n as u32),
                    _ => None,
                };
                repeating_separated(rule_arg(args.first()), rule_arg(args.get(1)), min, max)
            }),
            g.define_factory("indented_block", |args| {
                indented_block(args.first().cloned().unwrap_or_else(|| regex("[^\n]+")))
            }),
        ];
        for result in defined {
            result.expect("builtin names are distinct");
        }
        g
    }
}

/// The text of a literal argument; numeric and textual parameters of the
/// builtin factories travel as literal rules.
fn literal_text(arg: Option<&Rule>) -> String {
    match arg.map(Rule::kind) {
        Some(RuleKind::Literal(s)) => s.clone(),
        _ => String::new(),
    }
}

fn int_arg(arg: Option<&Rule>) -> Option<i64> {
    literal_text(arg).parse().ok()
}

fn rule_arg(arg: Option<&Rule>) -> Rule {
    arg.cloned().unwrap_or_else(|| lit(""))
}

/// A block of consecutive lines sharing one leading-whitespace prefix.
///
/// The first line locks the prefix (via a memoised indent rule); following
/// lines belong to the block iff they start with the same prefix. Each
/// line's content is matched by `line`; blank lines between block lines are
/// swallowed. Yields the line contents joined with newlines.
///
/// Built as a parametrised rule so every occurrence in the input locks its
/// own prefix.
pub fn indented_block(line: Rule) -> Rule {
    let factory = Factory::new("indented_block", |args| {
        let line = args
            .first()
            .cloned()
            .unwrap_or_else(|| regex("[^\n]+"));
        let lead = memo(regex("[ \t]+")).with_name("leading indent");
        let indented_line = seq([lead, line, optional(regex(r"(?:[ \t]*\n)+"))])
            .no_skip()
            .with_action(Action::new("indented_line", |vals| {
                Ok(vals.get(1).cloned().unwrap_or_default())
            }));
        seq([indented_line.clone(), zero_or_more(indented_line)])
            .no_skip()
            .with_action(Action::new("indented_block", |vals| {
                let mut lines = vec![vals.first().map(Value::flatten_text).unwrap_or_default()];
                if let Some(Value::Seq(rest)) = vals.get(1) {
                    lines.extend(rest.iter().map(Value::flatten_text));
                }
                Ok(Value::Str(lines.join("\n")))
            }))
    });
    factory.instantiate([line])
}
