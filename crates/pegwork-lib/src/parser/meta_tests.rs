use indoc::indoc;

use crate::Error;
use crate::ast::{ActionKind, Atom, Item, Repeat};
use crate::parser::parse;

#[test]
fn single_rule_with_repetition_and_action() {
    let file = parse("foo = 'x'+ -> len(_0)").expect("parses");

    assert_eq!(file.header, None);
    assert_eq!(file.footer, None);
    assert_eq!(file.rules.len(), 1);

    let decl = &file.rules[0];
    assert_eq!(decl.name, "foo");
    assert_eq!(decl.params, None);
    assert!(decl.skip.is_none());

    let group = &decl.choices.groups[0];
    assert_eq!(group.items.len(), 1);
    let Item::Production(p) = &group.items[0] else {
        panic!("expected a production");
    };
    assert_eq!(p.atom, Atom::Str("x".to_string()));
    assert_eq!(p.repeat, Some(Repeat { min: 1, max: -1 }));

    let action = group.action.as_ref().expect("has an action");
    assert_eq!(action.code, "len(_0)");
    assert_eq!(action.kind, ActionKind::ArrowLine);
}

#[test]
fn header_and_footer_code_blocks() {
    let input = indoc! {"
        %%use crate::nodes::*;%%

        word = /[a-z]+/

        %%fn helper() {}%%
    "};
    let file = parse(input).expect("parses");
    assert_eq!(file.header.as_deref(), Some("use crate::nodes::*;"));
    assert_eq!(file.footer.as_deref(), Some("fn helper() {}"));
    assert_eq!(file.rules.len(), 1);
}

#[test]
fn labels_attach_to_productions() {
    let file = parse("pair = first:'a' second:'b' -> join(first, second)").expect("parses");
    let group = &file.rules[0].choices.groups[0];
    let labels: Vec<Option<&str>> = group
        .items
        .iter()
        .map(|item| match item {
            Item::Production(p) => p.label.as_deref(),
            _ => None,
        })
        .collect();
    assert_eq!(labels, vec![Some("first"), Some("second")]);
}

#[test]
fn skip_clause_is_recorded() {
    let file = parse(r"spaced skip /\s+/ = 'a' 'b'").expect("parses");
    let decl = &file.rules[0];
    let skip = decl.skip.as_ref().expect("has a skip");
    assert_eq!(
        skip.atom,
        Atom::Regexp {
            pattern: r"\s+".to_string(),
            flags: String::new(),
        }
    );
}

#[test]
fn regexp_atom_keeps_flags_and_unescapes_the_delimiter() {
    let file = parse(r"frac = /[0-9]+\/[0-9]+/i").expect("parses");
    let Item::Production(p) = &file.rules[0].choices.groups[0].items[0] else {
        panic!("expected a production");
    };
    assert_eq!(
        p.atom,
        Atom::Regexp {
            pattern: "[0-9]+/[0-9]+".to_string(),
            flags: "i".to_string(),
        }
    );
}

#[test]
fn string_forms_decode() {
    let file = parse(indoc! {r#"
        a = 'it\'s'
        b = "say \"hi\""
        c = \word
    "#})
    .expect("parses");
    let atom = |i: usize| match &file.rules[i].choices.groups[0].items[0] {
        Item::Production(p) => p.atom.clone(),
        _ => panic!("expected a production"),
    };
    assert_eq!(atom(0), Atom::Str("it's".to_string()));
    assert_eq!(atom(1), Atom::Str("say \"hi\"".to_string()));
    assert_eq!(atom(2), Atom::Str("word".to_string()));
}

#[test]
fn lookahead_items() {
    let file = parse("word = !'-' /[a-z]+/ &'!'").expect("parses");
    let items = &file.rules[0].choices.groups[0].items;
    assert_eq!(items.len(), 3);
    let Item::LookAhead(neg) = &items[0] else {
        panic!("expected a lookahead");
    };
    assert!(neg.negative);
    assert_eq!(neg.production.atom, Atom::Str("-".to_string()));
    let Item::LookAhead(pos) = &items[2] else {
        panic!("expected a lookahead");
    };
    assert!(!pos.negative);
}

#[test]
fn predicates_capture_their_code() {
    let file = parse("guard = num:/[0-9]+/ &{ num_small(num) }").expect("parses");
    let items = &file.rules[0].choices.groups[0].items;
    let Item::Predicate(p) = &items[1] else {
        panic!("expected a predicate");
    };
    assert_eq!(p.code, "num_small(num)");
}

#[test]
fn negated_predicate_wraps_its_test() {
    let file = parse("guard = 'a' !{ too_long() }").expect("parses");
    let Item::Predicate(p) = &file.rules[0].choices.groups[0].items[1] else {
        panic!("expected a predicate");
    };
    assert_eq!(p.code, "!(too_long())");
}

#[test]
fn choices_and_inline_choices() {
    let file = parse("e = ['a' | 'b'] 'c' | 'd'").expect("parses");
    let choices = &file.rules[0].choices;
    assert_eq!(choices.groups.len(), 2);
    let Item::Production(p) = &choices.groups[0].items[0] else {
        panic!("expected a production");
    };
    let Atom::Choices(inner) = &p.atom else {
        panic!("expected an inline choice");
    };
    assert_eq!(inner.groups.len(), 2);
}

#[test]
fn parametrised_declarations_and_calls() {
    let input = indoc! {"
        pair(item, sep) = item sep item
        use_pair = pair('a', ',')
    "};
    let file = parse(input).expect("parses");

    let decl = &file.rules[0];
    assert_eq!(
        decl.params,
        Some(vec!["item".to_string(), "sep".to_string()])
    );

    let Item::Production(p) = &file.rules[1].choices.groups[0].items[0] else {
        panic!("expected a production");
    };
    assert_eq!(
        p.atom,
        Atom::RuleCall {
            name: "pair".to_string(),
            args: Some("'a', ','".to_string()),
        }
    );
}

#[test]
fn externals() {
    let file = parse("x = $helper $(make_rule())").expect("parses");
    let items = &file.rules[0].choices.groups[0].items;
    let atoms: Vec<&Atom> = items
        .iter()
        .map(|item| match item {
            Item::Production(p) => &p.atom,
            _ => panic!("expected a production"),
        })
        .collect();
    assert_eq!(atoms[0], &Atom::External("helper".to_string()));
    assert_eq!(atoms[1], &Atom::External("(make_rule())".to_string()));
}

#[test]
fn repetition_suffix_forms() {
    let file = parse("r = 'a'* 'b'+ 'c'? 'd'<3> 'e'<2,5> 'f'<,4>").expect("parses");
    let reps: Vec<Option<Repeat>> = file.rules[0].choices.groups[0]
        .items
        .iter()
        .map(|item| match item {
            Item::Production(p) => p.repeat,
            _ => None,
        })
        .collect();
    assert_eq!(
        reps,
        vec![
            Some(Repeat { min: 0, max: -1 }),
            Some(Repeat { min: 1, max: -1 }),
            Some(Repeat { min: 0, max: 1 }),
            Some(Repeat { min: 3, max: 3 }),
            Some(Repeat { min: 2, max: 5 }),
            Some(Repeat { min: -1, max: 4 }),
        ]
    );
}

#[test]
fn brace_action() {
    let file = parse("sum = a:'1' b:'2' { add(a, b) }").expect("parses");
    let action = file.rules[0].choices.groups[0]
        .action
        .as_ref()
        .expect("has an action");
    assert_eq!(action.code, "add(a, b)");
    assert_eq!(action.kind, ActionKind::Brace);
}

#[test]
fn arrow_block_action_joins_its_lines() {
    let input = indoc! {"
        foo = 'x' ->
            first();
            second();
        bar = 'y'
    "};
    let file = parse(input).expect("parses");
    assert_eq!(file.rules.len(), 2);
    let action = file.rules[0].choices.groups[0]
        .action
        .as_ref()
        .expect("has an action");
    assert_eq!(action.kind, ActionKind::ArrowBlock);
    assert_eq!(action.code, "first();\nsecond();");
}

#[test]
fn shallower_line_ends_the_block() {
    let input = indoc! {"
        a = 'x' ->
            first();
          b = 'y'
    "};
    let file = parse(input).expect("parses");
    assert_eq!(file.rules.len(), 2);
    assert_eq!(
        file.rules[0].choices.groups[0]
            .action
            .as_ref()
            .expect("has an action")
            .code,
        "first();"
    );
    assert_eq!(file.rules[1].name, "b");
}

#[test]
fn comments_are_skipped_between_tokens() {
    let input = indoc! {"
        # leading comment
        a = 'x' # trailing comment
        # between rules
        b = 'y'
    "};
    let file = parse(input).expect("parses");
    assert_eq!(file.rules.len(), 2);
}

#[test]
fn forward_references_between_declarations() {
    let file = parse("a = b 'x'\nb = 'y'").expect("parses");
    let Item::Production(p) = &file.rules[0].choices.groups[0].items[0] else {
        panic!("expected a production");
    };
    assert_eq!(
        p.atom,
        Atom::RuleCall {
            name: "b".to_string(),
            args: None,
        }
    );
}

#[test]
fn whitespace_only_layout_differences_are_equal() {
    let compact = parse("a = 'x' 'y' | 'z'").expect("parses");
    let spread = parse("a   =\n  'x'   'y'\n  | 'z'\n").expect("parses");
    assert_eq!(compact, spread);
}

#[test]
fn garbage_tail_is_reported_with_its_position() {
    let err = parse("a = 'x'\n@@@").expect_err("garbage remains");
    match err {
        Error::UnconsumedInput { line, tail, .. } => {
            assert_eq!(line, 2);
            assert!(tail.starts_with("@@@"));
        }
        other => panic!("expected UnconsumedInput, got {other:?}"),
    }
}

#[test]
fn empty_input_is_an_error() {
    assert!(parse("").is_err());
}

#[test]
fn ast_serializes_to_json() {
    let file = parse("a = 'x'+").expect("parses");
    let json = serde_json::to_value(&file).expect("serializes");
    assert_eq!(json["rules"][0]["name"], "a");
}
