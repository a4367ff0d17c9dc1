use super::cursor::Cursor;
use super::pattern::Pattern;

#[test]
fn advance_tracks_line_and_column() {
    let mut cursor = Cursor::new("ab\ncd");
    assert!(cursor.starts_with("ab\nc"));
    assert_eq!(cursor.offset(), 4);
    assert_eq!(cursor.line(), 2);
    assert_eq!(cursor.column(), 2);
}

#[test]
fn advance_without_newline_adds_columns() {
    let mut cursor = Cursor::new("hello");
    assert!(cursor.starts_with("hel"));
    assert_eq!(cursor.line(), 1);
    assert_eq!(cursor.column(), 4);
}

#[test]
fn columns_count_code_points() {
    let mut cursor = Cursor::new("héllo");
    assert!(cursor.starts_with("hé"));
    assert_eq!(cursor.offset(), 3); // é is two bytes
    assert_eq!(cursor.column(), 3); // but one column
}

#[test]
fn starts_with_mismatch_does_not_advance() {
    let mut cursor = Cursor::new("abc");
    assert!(!cursor.starts_with("abd"));
    assert_eq!(cursor.offset(), 0);
    assert_eq!(cursor.column(), 1);
}

#[test]
fn mark_and_rewind_restore_all_fields() {
    let mut cursor = Cursor::new("a\nb\nc");
    let mark = cursor.mark();
    assert!(cursor.starts_with("a\nb\n"));
    assert_eq!(cursor.line(), 3);
    cursor.rewind_to(mark);
    assert_eq!(cursor.offset(), 0);
    assert_eq!(cursor.line(), 1);
    assert_eq!(cursor.column(), 1);
}

#[test]
fn seek_recomputes_from_offset() {
    let mut cursor = Cursor::new("one\ntwo\nthree");
    cursor.seek(9);
    assert_eq!(cursor.line(), 3);
    assert_eq!(cursor.column(), 2);
    cursor.seek(3);
    assert_eq!(cursor.line(), 1);
    assert_eq!(cursor.column(), 4);
}

#[test]
fn current_and_next_char() {
    let mut cursor = Cursor::new("xy");
    assert_eq!(cursor.current(), Some('x'));
    assert_eq!(cursor.next_char(), Some('x'));
    assert_eq!(cursor.next_char(), Some('y'));
    assert_eq!(cursor.next_char(), None);
    assert!(!cursor.has_next());
}

#[test]
fn match_pattern_advances_over_match() {
    let pattern = Pattern::new("[a-z]+").expect("valid");
    let mut cursor = Cursor::new("abc123");
    assert_eq!(cursor.match_pattern(&pattern), Some("abc"));
    assert_eq!(cursor.offset(), 3);
    assert_eq!(cursor.match_pattern(&pattern), None);
    assert_eq!(cursor.offset(), 3);
}

#[test]
fn consumed_since_slices_the_input() {
    let mut cursor = Cursor::new("abcdef");
    assert!(cursor.starts_with("ab"));
    let from = cursor.offset();
    assert!(cursor.starts_with("cd"));
    assert_eq!(cursor.consumed_since(from), "cd");
}
