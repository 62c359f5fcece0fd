use mieliepit::bootstrap::Machine;
use mieliepit::primitives::Primitive;
use mieliepit::value::Value;

#[test]
fn test_numbers_are_pushed() {
    let mut machine = Machine::new();
    machine.eval_line("1 2 3").unwrap();
    assert_eq!(machine.state.stack.as_slice(), &[1, 2, 3]);
}

#[test]
fn test_primitives_execute_immediately() {
    let mut machine = Machine::new();
    machine.eval_line("1 2 +").unwrap();
    assert_eq!(machine.state.stack.as_slice(), &[3]);
}

#[test]
fn test_undefined_word_reports_its_location() {
    let mut machine = Machine::new();
    let err = machine.eval_line("1 frob").unwrap_err();
    assert_eq!(err.message, "Error: undefined word");
    assert_eq!(err.token, Some((2, "frob".to_string())));
    assert_eq!(machine.state.stack.as_slice(), &[1]);
}

#[test]
fn test_number_overflow_is_an_error() {
    let mut machine = Machine::new();
    let err = machine.eval_line("99999999999999999999999").unwrap_err();
    assert_eq!(err.message, "Error: number too large");
}

#[test]
fn test_definition_installs_a_word() {
    let mut machine = Machine::new();
    machine.eval_line(": sq ( a -- a*a ) dup * ;").unwrap();

    assert_eq!(machine.state.words.len(), 1);
    let word = &machine.state.words[0];
    assert_eq!(word.name, "sq");
    assert_eq!(word.desc, "a -- a*a");
    assert_eq!(
        &machine.state.code[word.code_pos..word.code_pos + word.code_len],
        &[
            Value::Primitive(Primitive::Dup),
            Value::Primitive(Primitive::Mul)
        ]
    );

    machine.eval_line("5 sq").unwrap();
    assert_eq!(machine.state.stack.as_slice(), &[25]);
}

#[test]
fn test_definition_grows_the_code_buffer_exactly() {
    let mut machine = Machine::new();
    machine.eval_line(": sq dup * ;").unwrap();
    assert_eq!(machine.state.code.len(), 2);
}

#[test]
fn test_failed_definition_rolls_back() {
    let mut machine = Machine::new();
    let err = machine.eval_line(": bad ( x ) nonexistent ;").unwrap_err();
    assert_eq!(err.message, "Error: undefined word");
    assert!(machine.state.words.is_empty());
    assert!(machine.state.code.is_empty());
}

#[test]
fn test_latest_definition_shadows_earlier_ones() {
    let mut machine = Machine::new();
    machine.eval_line(": f 1 ;").unwrap();
    machine.eval_line(": f 2 ;").unwrap();
    machine.eval_line("f").unwrap();
    assert_eq!(machine.state.stack.as_slice(), &[2]);
}

#[test]
fn test_word_shadows_a_primitive() {
    let mut machine = Machine::new();
    machine.eval_line(": dup 7 ;").unwrap();
    machine.eval_line("1 dup").unwrap();
    assert_eq!(machine.state.stack.as_slice(), &[1, 7]);
}

#[test]
fn test_word_shadows_a_number() {
    let mut machine = Machine::new();
    machine.eval_line(": 5 ( five, apparently ) 42 ;").unwrap();
    machine.eval_line("5").unwrap();
    assert_eq!(machine.state.stack.as_slice(), &[42]);
}

#[test]
fn test_redefinition_can_use_the_shadowed_word() {
    let mut machine = Machine::new();
    machine.eval_line(": f 1 ;").unwrap();
    machine.eval_line(": f f inc ;").unwrap();
    machine.eval_line("f").unwrap();
    assert_eq!(machine.state.stack.as_slice(), &[2]);
}

#[test]
fn test_definition_and_use_on_one_line() {
    let mut machine = Machine::new();
    machine.eval_line(": f 1 ; f f +").unwrap();
    assert_eq!(machine.state.stack.as_slice(), &[2]);
}

#[test]
fn test_recursion_limit_is_reported() {
    let mut machine = Machine::new();
    machine.state.set_recursion_limit(3);
    machine.eval_line(": w0 1 ;").unwrap();
    machine.eval_line(": w1 w0 ;").unwrap();
    machine.eval_line(": w2 w1 ;").unwrap();
    machine.eval_line(": w3 w2 ;").unwrap();

    machine.eval_line("w2").unwrap();
    assert_eq!(machine.state.stack.as_slice(), &[1]);

    let err = machine.eval_line("w3").unwrap_err();
    assert_eq!(err.message, "Error: recursion too deep");
}

#[test]
fn test_quit_sets_the_flag() {
    let mut machine = Machine::new();
    machine.eval_line("quit").unwrap();
    assert!(machine.quit_requested());

    let mut machine = Machine::new();
    machine.eval_line("exit").unwrap();
    assert!(machine.quit_requested());
}

#[test]
fn test_errors_do_not_leak_into_the_next_line() {
    let mut machine = Machine::new();
    machine.eval_line("frob").unwrap_err();
    machine.eval_line("1 1 +").unwrap();
    assert_eq!(machine.state.stack.as_slice(), &[2]);
}

#[test]
fn test_error_stops_the_rest_of_the_line() {
    let mut machine = Machine::new();
    machine.eval_line("1 frob 2 3").unwrap_err();
    assert_eq!(machine.state.stack.as_slice(), &[1]);
}
