use super::pattern::Pattern;

#[test]
fn matches_are_anchored_at_the_offset() {
    let pattern = Pattern::new("b+").expect("valid");
    assert_eq!(pattern.find_at("abbb", 0), None);
    assert_eq!(pattern.find_at("abbb", 1), Some("bbb"));
}

#[test]
fn empty_width_match_fails() {
    let pattern = Pattern::new("a*").expect("valid");
    assert_eq!(pattern.find_at("bbb", 0), None);
    assert_eq!(pattern.find_at("aab", 0), Some("aa"));
}

#[test]
fn case_insensitive_flag() {
    let pattern = Pattern::with_flags("abc", "i").expect("valid");
    assert_eq!(pattern.find_at("ABC", 0), Some("ABC"));
}

#[test]
fn dotall_flag_crosses_newlines() {
    let pattern = Pattern::with_flags("a.b", "s").expect("valid");
    assert_eq!(pattern.find_at("a\nb", 0), Some("a\nb"));
    let plain = Pattern::new("a.b").expect("valid");
    assert_eq!(plain.find_at("a\nb", 0), None);
}

#[test]
fn ignored_host_flags_are_accepted() {
    // `l`, `u` and `d` exist in grammars written for other hosts.
    assert!(Pattern::with_flags("x", "lud").is_ok());
}

#[test]
fn unknown_flag_is_rejected() {
    assert!(Pattern::with_flags("x", "q").is_err());
}

#[test]
fn invalid_pattern_is_rejected() {
    assert!(Pattern::new("(").is_err());
}

#[test]
fn source_and_flags_are_kept() {
    let pattern = Pattern::with_flags("[0-9]+", "i").expect("valid");
    assert_eq!(pattern.as_str(), "[0-9]+");
    assert_eq!(pattern.flags(), "i");
}
