use mieliepit::lexer::Lexer;

#[test]
fn test_scans_space_separated_tokens() {
    let mut lexer = Lexer::new("1 2 +");
    assert_eq!(lexer.advance_token().map(|t| t.text), Some("1"));
    assert_eq!(lexer.advance_token().map(|t| t.text), Some("2"));
    assert_eq!(lexer.advance_token().map(|t| t.text), Some("+"));
    assert_eq!(lexer.advance_token(), None);
}

#[test]
fn test_records_byte_offsets() {
    let mut lexer = Lexer::new("  dup  swap");
    let token = lexer.advance_token().unwrap();
    assert_eq!((token.text, token.offset), ("dup", 2));
    let token = lexer.advance_token().unwrap();
    assert_eq!((token.text, token.offset), ("swap", 7));
}

#[test]
fn test_current_returns_the_same_token_until_handled() {
    let mut lexer = Lexer::new("a b");
    assert_eq!(lexer.current().unwrap().text, "a");
    assert_eq!(lexer.current().unwrap().text, "a");
    lexer.mark_handled();
    assert_eq!(lexer.current().unwrap().text, "b");
}

#[test]
fn test_advance_always_scans_a_fresh_token() {
    let mut lexer = Lexer::new("a b");
    assert_eq!(lexer.advance_token().unwrap().text, "a");
    assert_eq!(lexer.advance_token().unwrap().text, "b");
    assert_eq!(lexer.advance_token(), None);
}

#[test]
fn test_blank_line_has_no_tokens() {
    let mut lexer = Lexer::new("   ");
    assert_eq!(lexer.current(), None);
    assert_eq!(lexer.last_token(), None);
}

#[test]
fn test_only_the_space_byte_separates() {
    let mut lexer = Lexer::new("a\tb c");
    assert_eq!(lexer.advance_token().unwrap().text, "a\tb");
    assert_eq!(lexer.advance_token().unwrap().text, "c");
}

#[test]
fn test_last_token_reports_the_most_recent_scan() {
    let mut lexer = Lexer::new("one two");
    lexer.advance_token();
    lexer.advance_token();
    assert_eq!(lexer.last_token(), Some((4, "two")));
}
