// interpreter.rs - tri-modal token dispatcher

use crate::lexer::Lexer;
use crate::primitives::Primitive;
use crate::runner::run_word;
use crate::state::ProgramState;
use crate::syntax::SyntaxOp;
use crate::value::Value;

/// What the interpreter does with each resolved token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Execute immediately
    Run,
    /// Append to the code buffer
    Compile,
    /// Advance past the token, with side effects only where a syntax
    /// operator demands them
    Ignore,
}

/// Driver over one input line. Syntax operators receive the interpreter and
/// are free to consume further tokens or re-enter the dispatcher.
pub struct Interpreter<'a, 's> {
    pub lexer: Lexer<'a>,
    pub mode: Mode,
    pub state: &'s mut ProgramState,
}

impl<'a, 's> Interpreter<'a, 's> {
    pub fn new(line: &'a str, state: &'s mut ProgramState) -> Self {
        Interpreter {
            lexer: Lexer::new(line),
            mode: Mode::Run,
            state,
        }
    }

    /// Resolve the current token: user word, then primitive, then syntax,
    /// then decimal number. Returns `None` at end of line or on error; the
    /// error channel tells the two apart.
    pub fn read_value(&mut self) -> Option<Value> {
        let token = self.lexer.current()?;
        if let Some(idx) = self.state.find_word(token.text) {
            self.lexer.mark_handled();
            return Some(Value::Word(idx));
        }
        if let Some(prim) = Primitive::from_name(token.text) {
            self.lexer.mark_handled();
            return Some(Value::Primitive(prim));
        }
        if let Some(op) = SyntaxOp::from_name(token.text) {
            self.lexer.mark_handled();
            return Some(Value::Syntax(op));
        }
        match parse_decimal(token.text) {
            Ok(number) => {
                self.lexer.mark_handled();
                Some(Value::Number(number))
            }
            Err(NumberError::Overflow) => {
                self.state.fail("Error: number too large");
                None
            }
            Err(NumberError::NotANumber) => {
                self.state.fail("Error: undefined word");
                None
            }
        }
    }

    pub fn run_value(&mut self, value: Value) {
        match value {
            Value::Word(idx) => run_word(self.state, idx),
            Value::Primitive(prim) => self.state.run_primitive(prim),
            Value::Syntax(op) => self.run_syntax(op),
            Value::Number(number) => self.state.stack.push(number),
            Value::RawFn(_) => self.state.fail("Error: cannot interpret a raw function"),
        }
    }

    pub fn run_next(&mut self) -> bool {
        match self.read_value() {
            Some(value) => {
                self.run_value(value);
                true
            }
            None => false,
        }
    }

    /// Returns the number of values appended to the code buffer, so callers
    /// can back-patch and roll back. `None` signals a parse failure or an
    /// already-recorded error.
    pub fn compile_value(&mut self, value: Value) -> Option<usize> {
        match value {
            Value::Word(idx) => {
                self.state.code.push(Value::Word(idx));
                Some(1)
            }
            Value::Primitive(prim) => {
                self.state.code.push(Value::Primitive(prim));
                Some(1)
            }
            Value::Syntax(op) => self.compile_syntax(op),
            Value::Number(number) => {
                self.state.code.push(Value::Number(number));
                Some(1)
            }
            Value::RawFn(_) => {
                self.state.fail("Error: cannot interpret a raw function");
                None
            }
        }
    }

    pub fn compile_next(&mut self) -> Option<usize> {
        let value = self.read_value()?;
        self.compile_value(value)
    }

    pub fn ignore_value(&mut self, value: Value) {
        match value {
            Value::Syntax(op) => self.ignore_syntax(op),
            Value::RawFn(_) => self.state.fail("Error: cannot interpret a raw function"),
            Value::Word(_) | Value::Primitive(_) | Value::Number(_) => {}
        }
    }

    pub fn ignore_next(&mut self) -> bool {
        match self.read_value() {
            Some(value) => {
                self.ignore_value(value);
                true
            }
            None => false,
        }
    }

    pub fn advance(&mut self) -> bool {
        match self.mode {
            Mode::Run => self.run_next(),
            Mode::Compile => self.compile_next().is_some(),
            Mode::Ignore => self.ignore_next(),
        }
    }

    /// Drive the whole line in the current mode.
    pub fn run(&mut self) {
        while self.state.error.is_none() && self.advance() {}
    }
}

enum NumberError {
    NotANumber,
    Overflow,
}

// Unsigned decimal digits only; overflow is an error, not a wrap.
fn parse_decimal(text: &str) -> Result<u64, NumberError> {
    let mut number: u64 = 0;
    for byte in text.bytes() {
        if !byte.is_ascii_digit() {
            return Err(NumberError::NotANumber);
        }
        number = number
            .checked_mul(10)
            .and_then(|n| n.checked_add((byte - b'0') as u64))
            .ok_or(NumberError::Overflow)?;
    }
    Ok(number)
}
