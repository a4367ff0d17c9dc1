use indoc::indoc;

use crate::emit::{EmitError, emit_file};
use crate::parser::parse;

fn emit(source: &str) -> String {
    emit_file(&parse(source).expect("grammar parses")).expect("grammar emits")
}

fn emit_err(source: &str) -> EmitError {
    emit_file(&parse(source).expect("grammar parses")).expect_err("emission fails")
}

#[test]
fn simple_rule_emits_a_define() {
    let out = emit("ab = 'a' 'b'");
    assert!(out.contains(r#"g.define("ab", seq([lit("a"), lit("b")]))?;"#));
    assert!(out.contains("Grammar::with_builtins()"));
}

#[test]
fn whole_file_shape() {
    let out = emit("greeting = 'hello' /\\s+/ name:'world' -> greet(name)");
    insta::assert_snapshot!(out, @r#"
    // @generated by pegwork.

    use pegwork_lib::prelude::*;

    pub fn grammar() -> Result<Grammar, GrammarError> {
        let mut g = Grammar::with_builtins();
        g.define("greeting", seq([lit("hello"), regex("\\s+"), lit("world")]).with_action(action!("greeting_0", |_0, _1, name| greet(name))))?;
        Ok(g)
    }
    "#);
}

#[test]
fn repetition_suffixes_map_to_constructors() {
    let out = emit("r = 'x'* 'y'+ 'z'? 'w'<3> 'v'<2,5> 'u'<2,>");
    assert!(out.contains(r#"zero_or_more(lit("x"))"#));
    assert!(out.contains(r#"one_or_more(lit("y"))"#));
    assert!(out.contains(r#"optional(lit("z"))"#));
    assert!(out.contains(r#"exactly(3, lit("w"))"#));
    assert!(out.contains(r#"repetition(2, 5, lit("v"))"#));
    assert!(out.contains(r#"repetition(2, None, lit("u"))"#));
}

#[test]
fn lookahead_wrappers() {
    let out = emit("word = !'-' /[a-z]+/ &'!'");
    assert!(out.contains(r#"not_ahead(lit("-"))"#));
    assert!(out.contains(r#"ahead(lit("!"))"#));
}

#[test]
fn references_are_by_name() {
    let out = emit("a = b 'x'\nb = 'y'");
    assert!(out.contains(r#"g.define("a", seq([r("b"), lit("x")]))?;"#));
}

#[test]
fn multi_group_choice_emits_alternatives() {
    let out = emit(indoc! {"
        c = 'a' { pick(_0) }
          | 'b'
    "});
    assert!(out.contains("choice(["));
    assert!(out.contains(r#"lit("a").with_action(action!("c_0", |_0| pick(_0)))"#));
    assert!(out.contains(r#"lit("b"),"#));
}

#[test]
fn multi_line_action_becomes_a_named_function() {
    let out = emit(indoc! {"
        m = v:'a' {
            let out = wrap(v);
            return Ok(out);
        }
    "});
    assert!(out.contains("fn action_0(vals: &[Value]) -> Result<Value, ActionError> {"));
    assert!(out.contains("let v = iter.next().cloned().unwrap_or_default();"));
    assert!(out.contains(r#".with_action(Action::new("action_0", action_0))"#));
}

#[test]
fn single_line_action_with_return_is_not_inlined() {
    let out = emit("m = v:'a' { return Ok(v) }");
    assert!(out.contains("fn action_0"));
    assert!(!out.contains("action!("));
}

#[test]
fn predicates_bind_preceding_labels() {
    let out = emit("guard = num:/[0-9]+/ &{ is_small(&num) }");
    assert!(out.contains(
        r#"pred("guard predicate", |vals: &[Value]| { let num = vals.get(0).cloned().unwrap_or_default(); is_small(&num) })"#
    ));
}

#[test]
fn parametrised_declarations_become_factories() {
    let out = emit(indoc! {"
        pair(item, sep) = item sep item
        use_pair = pair('a', ',')
    "});
    assert!(out.contains(r#"g.define_factory("pair", move |args| {"#));
    assert!(out.contains("let item = args[0].clone();"));
    assert!(out.contains("let sep = args[1].clone();"));
    assert!(out.contains("seq([item.clone(), sep.clone(), item.clone()])"));
    assert!(out.contains(r#"g.define("use_pair", call("pair", [lit("a"), lit(",")]))?;"#));
}

#[test]
fn helper_calls_go_through_the_builtin_registry() {
    let out = emit("braced = balanced('{', '}')");
    assert!(out.contains(r#"call("balanced", [lit("{"), lit("}")])"#));
}

#[test]
fn regex_arguments_in_calls_are_rewritten() {
    let out = emit("names = one_or_more_separated(/[a-z]+/, ',')");
    assert!(out.contains(r#"call("one_or_more_separated", [regex("[a-z]+"), lit(",")])"#));
}

#[test]
fn externals_emit_host_calls() {
    let out = emit("x = $helper $(make_rule())");
    assert!(out.contains("helper()"));
    assert!(out.contains("(make_rule())"));
}

#[test]
fn header_and_footer_are_copied_verbatim() {
    let out = emit(indoc! {"
        %%use crate::nodes::*;%%
        a = 'x'
        %%fn post() {}%%
    "});
    assert!(out.contains("use crate::nodes::*;"));
    assert!(out.contains("fn post() {}"));
    let header_at = out.find("use crate::nodes::*;").expect("header present");
    let grammar_at = out.find("pub fn grammar").expect("grammar fn present");
    assert!(header_at < grammar_at);
}

#[test]
fn skip_clauses_attach_to_the_definition() {
    let out = emit(r"s skip /\s+/ = 'a' 'b'");
    assert!(out.contains(r#".with_skip(regex("\\s+"))"#));
}

#[test]
fn inline_choices_nest() {
    let out = emit("e = ['a' | 'b'] 'c'");
    assert!(out.contains("choice(["));
    assert!(out.contains(r#"lit("c")"#));
}

#[test]
fn strings_requote_safely() {
    let out = emit(r#"q = 'it\'s' "a\"b""#);
    assert!(out.contains(r#"lit("it's")"#));
    assert!(out.contains(r#"lit("a\"b")"#));
}

#[test]
fn duplicate_declarations_are_rejected() {
    match emit_err("a = 'x'\na = 'y'") {
        EmitError::Redefined(name) => assert_eq!(name, "a"),
        other => panic!("expected Redefined, got {other:?}"),
    }
}

#[test]
fn unknown_references_are_rejected() {
    match emit_err("a = nope") {
        EmitError::Unknown { name, context } => {
            assert_eq!(name, "nope");
            assert_eq!(context, "a");
        }
        other => panic!("expected Unknown, got {other:?}"),
    }
}

#[test]
fn invalid_patterns_are_rejected_at_emission() {
    match emit_err("b = /(/ 'x'") {
        EmitError::InvalidRegex { pattern, .. } => assert_eq!(pattern, "("),
        other => panic!("expected InvalidRegex, got {other:?}"),
    }
}

#[test]
fn emission_is_deterministic() {
    let source = "a = 'x' | b\nb = /[0-9]+/i";
    assert_eq!(emit(source), emit(source));
}

#[test]
fn flagged_regexes_recover_their_flags() {
    let out = emit("n = /[0-9]+/i");
    assert!(out.contains(r#"regex_flags("[0-9]+", "i")"#));
}
