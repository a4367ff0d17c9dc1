//! The meta-grammar: the PEG source language, expressed in the engine's
//! own combinators.
//!
//! Rule by rule this mirrors the concrete syntax: `%% … %%` code blocks,
//! declarations with optional parameters and `skip` clauses, productions
//! with labels and repetition suffixes, lookahead, semantic predicates,
//! strings, regexps, externals, inline choices, and the three action
//! forms. Whitespace and `#` comments are skipped between tokens except
//! inside strings, regexps, actions and balanced constructs.

use crate::ast::{
    ActionCode, ActionKind, Atom, File, Item, LookAhead, Predicate, Production,
    ProductionChoices, ProductionGroup, Repeat, RuleDecl,
};
use crate::engine::error::ActionError;
use crate::engine::helpers::{all_but, balanced, delimited, indented_block, one_or_more_separated};
use crate::engine::interpreter::Parser;
use crate::engine::rule::{
    Action, Forward, choice, lit, not_ahead, one_or_more, optional, regex, seq,
};
use crate::engine::value::Value;
use crate::escape::decode_escapes;

/// A rule head: `name` or `name(raw args)`. Shared between declarations
/// (where the parens hold formal parameters) and calls (where they hold
/// argument code).
#[derive(Debug, Clone)]
struct RuleName {
    name: String,
    parens: Option<String>,
}

/// Build the parser for whole grammar files.
pub(crate) fn toplevel_parser() -> Parser {
    let skip = regex(r"(?:\s+|#[^\n]*)+").with_name("whitespace and comments");

    let identifier = regex("[a-zA-Z_][a-zA-Z0-9_]*").with_name("identifier");

    let number = regex("-?[0-9]+")
        .with_action(Action::new("number", |vals| {
            let text = vals.first().map(Value::flatten_text).unwrap_or_default();
            let n: i64 = text
                .parse()
                .map_err(|e| ActionError::new(format!("bad number {text:?}: {e}")))?;
            Ok(Value::Int(n))
        }))
        .with_name("number");

    // %% raw host code %%
    let code_block = seq([lit("%%"), optional(all_but(lit("%%"), None)), lit("%%")])
    .with_action(Action::new("code_block", |vals| {
        Ok(Value::Str(
            vals.get(1).map(Value::flatten_text).unwrap_or_default(),
        ))
    }))
    .with_name("code block");

    // 'single', "double" or \bare
    //
    // Attaching an action to `delimited` replaces its own, so the raw
    // [quote, content, quote] values arrive here; the content is index 1.
    let string = choice([
        delimited('\'').with_action(Action::new("single_quoted", |vals| {
            Ok(Value::Str(decode_escapes(
                &vals.get(1).map(Value::flatten_text).unwrap_or_default(),
            )))
        })),
        delimited('"').with_action(Action::new("double_quoted", |vals| {
            Ok(Value::Str(decode_escapes(
                &vals.get(1).map(Value::flatten_text).unwrap_or_default(),
            )))
        })),
        regex(r"\\[^ \t\n\[\]|)]+").with_action(Action::new("bare_string", |vals| {
            let raw = vals.first().map(Value::flatten_text).unwrap_or_default();
            let body = raw.strip_prefix('\\').unwrap_or(&raw);
            Ok(Value::Str(decode_escapes(body)))
        })),
    ])
    .no_skip()
    .with_name("string");

    // /pattern/flags
    let regexp = seq([delimited('/'), optional(regex("[idsmlux]+"))])
        .no_skip()
        .with_action(Action::new("regexp", |vals| {
            let pattern = vals
                .first()
                .map(Value::flatten_text)
                .unwrap_or_default()
                .replace("\\/", "/");
            let flags = vals.get(1).map(Value::flatten_text).unwrap_or_default();
            Ok(Value::node(Atom::Regexp { pattern, flags }))
        }))
        .with_name("regexp");

    // { code }
    let brace_action = balanced("{", "}")
        .with_action(Action::new("brace_action", |vals| {
            let code = vals.get(1).map(Value::flatten_text).unwrap_or_default();
            Ok(Value::node(ActionCode {
                code: code.trim().to_string(),
                kind: ActionKind::Brace,
            }))
        }))
        .with_name("brace action");

    // ->
    //     indented code
    let arrow_block_action = seq([
        optional(regex(r"\s+")),
        lit("->"),
        optional(regex("[ \t]+")),
        lit("\n"),
        indented_block(regex("[^\n]+")),
    ])
    .no_skip()
    .with_action(Action::new("arrow_block_action", |vals| {
        let code = vals.get(4).map(Value::flatten_text).unwrap_or_default();
        Ok(Value::node(ActionCode {
            code,
            kind: ActionKind::ArrowBlock,
        }))
    }))
    .with_name("multi line action");

    // -> code to end of line
    let arrow_line_action = seq([lit("->"), regex("[^\n]+")])
        .no_skip()
        .with_action(Action::new("arrow_line_action", |vals| {
            let code = vals.get(1).map(Value::flatten_text).unwrap_or_default();
            Ok(Value::node(ActionCode {
                code: code.trim().to_string(),
                kind: ActionKind::ArrowLine,
            }))
        }))
        .with_name("single line action");

    let action_rule = choice([brace_action, arrow_block_action, arrow_line_action])
        .with_name("action");

    // $name or $(host expression)
    let external = choice([
        seq([lit("$"), identifier.clone()])
            .no_skip()
            .with_action(Action::new("external_name", |vals| {
                let name = vals.get(1).map(Value::flatten_text).unwrap_or_default();
                Ok(Value::node(Atom::External(name)))
            })),
        seq([lit("$"), balanced("(", ")")])
            .no_skip()
            .with_action(Action::new("external_expr", |vals| {
                let code = vals.get(1).map(Value::flatten_text).unwrap_or_default();
                Ok(Value::node(Atom::External(code)))
            })),
    ])
    .no_skip()
    .with_name("external");

    // &{ test } — and !{ test }, which negates the test
    let predicate = seq([choice([lit("&"), lit("!")]), balanced("{", "}")])
        .with_action(Action::new("predicate", |vals| {
            let op = vals.first().map(Value::flatten_text).unwrap_or_default();
            let code = balanced_inner(vals.get(1));
            let code = code.trim();
            let code = if op == "!" {
                format!("!({code})")
            } else {
                code.to_string()
            };
            Ok(Value::node(Item::Predicate(Predicate { code })))
        }))
        .with_name("predicate");

    // name or name(raw)
    let rulename = seq([identifier.clone(), optional(balanced("(", ")"))])
        .with_action(Action::new("rulename", |vals| {
            let name = vals.first().map(Value::flatten_text).unwrap_or_default();
            let parens = match vals.get(1) {
                Some(Value::Absent) | None => None,
                Some(v) => Some(balanced_inner(Some(v))),
            };
            Ok(Value::node(RuleName { name, parens }))
        }))
        .with_name("rule name");

    let label = seq([identifier.clone(), lit(":")])
        .with_action(Action::new("label", |vals| {
            Ok(Value::Str(
                vals.first().map(Value::flatten_text).unwrap_or_default(),
            ))
        }))
        .with_name("label");

    // * + ? <n> <a,b>
    let rep_suffix = choice([
        lit("*").with_action(rep_action("rep_star", 0, -1)),
        lit("+").with_action(rep_action("rep_plus", 1, -1)),
        lit("?").with_action(rep_action("rep_opt", 0, 1)),
        seq([lit("<"), number.clone(), lit(">")]).with_action(Action::new(
            "rep_exact",
            |vals| {
                let n = vals.get(1).and_then(Value::as_int).unwrap_or(0) as i32;
                Ok(Value::node(Repeat { min: n, max: n }))
            },
        )),
        seq([
            lit("<"),
            optional(number.clone()),
            lit(","),
            optional(number.clone()),
            lit(">"),
        ])
        .with_action(Action::new("rep_range", |vals| {
            let min = vals.get(1).and_then(Value::as_int).unwrap_or(-1) as i32;
            let max = vals.get(3).and_then(Value::as_int).unwrap_or(-1) as i32;
            Ok(Value::node(Repeat { min, max }))
        })),
    ])
    .with_name("repetition");

    let either_fw = Forward::new("inline choice");
    let ruledecl_fw = Forward::new("rule declaration");
    let rules_fw = Forward::new("choices");

    // The matchable core of a production.
    let atom = choice([
        regexp,
        seq([string]).with_action(Action::new("string_atom", |vals| {
            let text = vals.first().map(Value::flatten_text).unwrap_or_default();
            Ok(Value::node(Atom::Str(text)))
        })),
        seq([rulename.clone()]).with_action(Action::new("rule_call", |vals| {
            let rn = take::<RuleName>(vals.first(), "rule name")?;
            Ok(Value::node(Atom::RuleCall {
                name: rn.name,
                args: rn.parens,
            }))
        })),
        external,
        either_fw.rule(),
    ])
    .with_name("atom");

    // label? !ruledecl atom rep?
    let full_rule = seq([
        optional(label),
        not_ahead(ruledecl_fw.rule()),
        atom.clone(),
        optional(rep_suffix.clone()),
    ])
    .with_action(Action::new("production", |vals| {
        let label = match vals.first() {
            Some(Value::Str(s)) => Some(s.clone()),
            _ => None,
        };
        let atom = take::<Atom>(vals.get(1), "atom")?;
        let repeat = vals.get(2).and_then(Value::downcast::<Repeat>).map(|r| *r);
        Ok(Value::node(Item::Production(Production {
            atom,
            label,
            repeat,
        })))
    }))
    .with_name("production");

    // The skip clause takes a bare atom (no label, no declaration
    // lookahead): its production is followed by `=`, which would otherwise
    // look like the head of the next declaration.
    let skip_production = seq([atom.clone(), optional(rep_suffix.clone())])
        .with_action(Action::new("skip_production", |vals| {
            let atom = take::<Atom>(vals.first(), "atom")?;
            let repeat = vals.get(1).and_then(Value::downcast::<Repeat>).map(|r| *r);
            Ok(Value::node(Production {
                atom,
                label: None,
                repeat,
            }))
        }))
        .with_name("skip production");

    // !atom rep? / &atom rep?
    let match_rule = seq([
        choice([lit("!"), lit("&")]),
        atom.clone(),
        optional(rep_suffix),
    ])
    .with_action(Action::new("lookahead", |vals| {
        let op = vals.first().map(Value::flatten_text).unwrap_or_default();
        let atom = take::<Atom>(vals.get(1), "atom")?;
        let repeat = vals.get(2).and_then(Value::downcast::<Repeat>).map(|r| *r);
        Ok(Value::node(Item::LookAhead(LookAhead {
            production: Production {
                atom,
                label: None,
                repeat,
            },
            negative: op == "!",
        })))
    }))
    .with_name("lookahead");

    either_fw.bind(
        seq([lit("["), rules_fw.rule(), lit("]")])
            .with_action(Action::new("inline_choice", |vals| {
                let choices = take::<ProductionChoices>(vals.get(1), "choices")?;
                Ok(Value::node(Atom::Choices(choices)))
            }))
            .with_name("inline choice"),
    );

    let item = choice([match_rule, full_rule.clone(), predicate]).with_name("item");

    let rule_repeat = seq([one_or_more(item), optional(action_rule)])
        .with_action(Action::new("production_group", |vals| {
            let mut items = Vec::new();
            if let Some(Value::Seq(raw)) = vals.first() {
                for value in raw {
                    items.push(take::<Item>(Some(value), "item")?);
                }
            }
            let action = vals
                .get(1)
                .and_then(Value::downcast::<ActionCode>)
                .map(|a| (*a).clone());
            Ok(Value::node(ProductionGroup { items, action }))
        }))
        .with_name("production group");

    rules_fw.bind(
        seq([one_or_more_separated(rule_repeat, lit("|"))])
            .with_action(Action::new("choices", |vals| {
                let mut groups = Vec::new();
                if let Some(Value::Seq(raw)) = vals.first() {
                    for value in raw {
                        groups.push(take::<ProductionGroup>(Some(value), "production group")?);
                    }
                }
                Ok(Value::node(ProductionChoices { groups }))
            }))
            .with_name("choices"),
    );

    let skip_clause = seq([lit("skip"), skip_production])
        .with_action(Action::new("skip_clause", |vals| {
            Ok(vals.get(1).cloned().unwrap_or_default())
        }))
        .with_name("skip clause");

    // name skip? '=' — also used as a lookahead to keep productions from
    // eating the next declaration's head.
    ruledecl_fw.bind(
        seq([rulename, optional(skip_clause), lit("=")]).with_name("rule declaration"),
    );

    let grammarrule = seq([ruledecl_fw.rule(), rules_fw.rule()])
        .with_action(Action::new("grammar_rule", |vals| {
            let decl = match vals.first() {
                Some(Value::Seq(parts)) => parts.clone(),
                _ => return Err(ActionError::new("malformed rule declaration")),
            };
            let rn = take::<RuleName>(decl.first(), "rule name")?;
            let skip = match decl.get(1) {
                Some(Value::Absent) | None => None,
                Some(v) => Some(take::<Production>(Some(v), "skip production")?),
            };
            let choices = take::<ProductionChoices>(vals.get(1), "choices")?;
            let params = rn.parens.map(|raw| {
                raw.split(',')
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect()
            });
            Ok(Value::node(RuleDecl {
                name: rn.name,
                params,
                skip,
                choices,
            }))
        }))
        .with_name("grammar rule");

    let toplevel = seq([
        optional(code_block.clone()),
        one_or_more(grammarrule),
        optional(code_block),
    ])
    .with_skip(skip)
    .with_action(Action::new("grammar_file", |vals| {
        let header = match vals.first() {
            Some(Value::Str(s)) => Some(s.clone()),
            _ => None,
        };
        let mut rules = Vec::new();
        if let Some(Value::Seq(raw)) = vals.get(1) {
            for value in raw {
                rules.push(take::<RuleDecl>(Some(value), "rule declaration")?);
            }
        }
        let footer = match vals.get(2) {
            Some(Value::Str(s)) => Some(s.clone()),
            _ => None,
        };
        Ok(Value::node(File {
            header,
            rules,
            footer,
        }))
    }))
    .with_name("grammar file");

    Parser::new(toplevel)
}

fn rep_action(name: &str, min: i32, max: i32) -> Action {
    Action::new(name, move |_vals| Ok(Value::node(Repeat { min, max })))
}

/// The inside of a `balanced` result (`Seq[open, inside, close]`).
fn balanced_inner(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_seq)
        .and_then(|parts| parts.get(1))
        .map(Value::flatten_text)
        .unwrap_or_default()
}

fn take<T: Clone + 'static>(value: Option<&Value>, what: &str) -> Result<T, ActionError> {
    value
        .and_then(Value::downcast::<T>)
        .map(|rc| (*rc).clone())
        .ok_or_else(|| ActionError::new(format!("expected a {what} node")))
}
